use std::{
    env,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::{fs::File, io::AsyncReadExt};

#[derive(Debug, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub login: Option<String>,
}

pub const DEFAULT_BASE_URL: &str = "https://hh.ru";

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            login: None,
        }
    }
}

impl Config {
    /// Loads the user's config file, falling back to defaults if it does not
    /// exist
    pub async fn load() -> Result<Self> {
        let path = get_config_home()?.join("hh-updater").join("config.json");

        match File::open(path).await {
            Ok(mut file) => Self::load_from_file(&mut file).await,
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).context("open config file"),
        }
    }

    /// Loads an explicitly named config file, which must exist
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        let mut file = File::open(path)
            .await
            .with_context(|| format!("open config file {}", path.display()))?;
        Self::load_from_file(&mut file).await
    }

    async fn load_from_file(file: &mut File) -> Result<Self> {
        let mut dest = Vec::new();
        file.read_to_end(&mut dest).await?;
        Self::parse(&dest)
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        let config_file: ConfigFile = serde_json::from_slice(bytes).context("parse config file")?;

        Ok(Config {
            base_url: config_file
                .base_url
                .unwrap_or(DEFAULT_BASE_URL.to_string()),

            login: config_file.login.filter(|login| !login.is_empty()),
        })
    }
}

fn get_config_home() -> Result<PathBuf> {
    match env::var("XDG_CONFIG_HOME") {
        Ok(path) => Ok(Path::new(&path).to_path_buf()),
        Err(_) => Ok(homedir::my_home()?.context("home dir")?.join(".config")),
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    base_url: Option<String>,
    login: Option<String>,
}
