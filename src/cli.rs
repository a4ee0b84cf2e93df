use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::flow::{self, Status};
use crate::parser::parse_resume_ref;
use crate::session::Credentials;

/// Keep resumes on hh.ru near the top of recruiter search
#[derive(Parser, Debug)]
#[command(name = "hh-updater", version, about, long_about = None)]
pub struct CLI {
    /// Print progress details and full error chains
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base URL of the site
    #[arg(long, env = "HH_UPDATER_URL", global = true)]
    url: Option<String>,

    /// Account login (email or phone); prompted for if not given
    #[arg(long, env = "HH_UPDATER_LOGIN", global = true)]
    login: Option<String>,

    /// Account password; prompted for with hidden input if not given
    #[arg(long, env = "HH_UPDATER_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh the given resumes
    Update {
        /// Resume ids or resume page URLs
        #[arg(required = true)]
        resumes: Vec<String>,
    },

    /// Check that the site is reachable and hands out a token
    Check {
        /// Base URL to probe, overriding --url
        #[arg(long)]
        base_url: Option<String>,
    },
}

/// Runs the parsed command and returns its final status
///
/// Errors raised before a flow starts (config, prompts, bad resume
/// references) are reported here and turn into a failure status.
pub async fn run(cli: CLI) -> Status {
    let verbose = cli.verbose;

    match dispatch(cli).await {
        Ok(status) => status,
        Err(err) => {
            flow::report_fault(&err, verbose);
            Status::Failure
        }
    }
}

async fn dispatch(cli: CLI) -> Result<Status> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await?,
    };

    let base_url = resolve_base_url(cli.url, &config);

    match cli.command {
        Command::Update { resumes } => {
            let resume_ids = resumes
                .iter()
                .map(|input| parse_resume_ref(input))
                .collect::<Result<Vec<String>>>()?;

            let credentials = resolve_credentials(cli.login, cli.password, &config)?;

            Ok(flow::update_flow(&base_url, credentials, &resume_ids, cli.verbose).await)
        }

        Command::Check {
            base_url: check_url,
        } => {
            let base_url = check_url.unwrap_or(base_url);
            Ok(flow::check_flow(&base_url, cli.verbose).await)
        }
    }
}

fn resolve_base_url(flag: Option<String>, config: &Config) -> String {
    flag.unwrap_or_else(|| config.base_url.clone())
}

fn resolve_credentials(
    login: Option<String>,
    password: Option<String>,
    config: &Config,
) -> Result<Credentials> {
    let login = match login.or_else(|| config.login.clone()) {
        Some(login) => login,
        None => prompt_line("Login: ")?,
    };

    if login.is_empty() {
        bail!("login is required");
    }

    let password = match password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ").context("read password")?,
    };

    Ok(Credentials::new(login, password))
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read login")?;

    Ok(line.trim().to_string())
}
