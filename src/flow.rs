use std::{
    fmt,
    process::ExitCode,
    time::{Duration, Instant},
};

use anyhow::Result;
use tracing::debug;

use crate::{
    output,
    session::{Credentials, Session},
};

/// How many characters of the token the availability check shows
const TOKEN_PREVIEW_LEN: usize = 10;

/// Final status of a command, mapped onto the process exit code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failure => ExitCode::FAILURE,
        }
    }
}

/// Tally of one update run
#[derive(Debug)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Updated {} of {} resumes in {:.2}s",
            self.succeeded,
            self.total,
            self.elapsed.as_secs_f64()
        )
    }
}

#[derive(Debug)]
pub enum UpdateRun {
    AuthenticationFailed,
    Completed(RunSummary),
}

/// Logs in and touches every resume in order, reporting each one as it goes
///
/// A failed touch does not stop the batch. Transport errors do, and are
/// turned into a failure status here.
pub async fn update_flow(
    base_url: &str,
    credentials: Credentials,
    resume_ids: &[String],
    verbose: bool,
) -> Status {
    if verbose {
        output::info(&format!("Updating {} resumes", resume_ids.len()));
        output::info(&format!("Using base URL {}", base_url));
        output::info(&format!("Resumes: {}", resume_ids.join(", ")));
    }

    match run_update(base_url, credentials, resume_ids, verbose).await {
        Ok(UpdateRun::AuthenticationFailed) => {
            output::error("Authentication failed. Check login and password.");
            Status::Failure
        }

        Ok(UpdateRun::Completed(summary)) => {
            output::tally(&summary.to_string(), summary.all_succeeded());

            if summary.all_succeeded() {
                Status::Success
            } else {
                Status::Failure
            }
        }

        Err(err) => {
            report_fault(&err, verbose);
            Status::Failure
        }
    }
}

/// Does the work of [`update_flow`] without turning errors into a status
pub async fn run_update(
    base_url: &str,
    credentials: Credentials,
    resume_ids: &[String],
    verbose: bool,
) -> Result<UpdateRun> {
    let started = Instant::now();

    // The session and its connections are dropped on every return path.
    let mut session = Session::new(base_url)?;
    debug!(base_url = session.base_url(), "session opened");

    if verbose {
        output::info("Fetching XSRF token...");
        output::info("Authenticating...");
    }

    if !session.authenticate(credentials).await? {
        return Ok(UpdateRun::AuthenticationFailed);
    }

    output::success("Authenticated");

    let mut succeeded = 0;

    for resume_id in resume_ids {
        if verbose {
            output::info(&format!("Updating resume {}...", resume_id));
        }

        if session.update_resource(resume_id).await? {
            output::success(&format!("Resume {} updated", resume_id));
            succeeded += 1;
        } else {
            output::error(&format!("Failed to update resume {}", resume_id));
        }
    }

    let summary = RunSummary {
        total: resume_ids.len(),
        succeeded,
        elapsed: started.elapsed(),
    };

    debug!(?summary, "update run finished");

    Ok(UpdateRun::Completed(summary))
}

/// Probes the site by fetching a fresh token from the login page
pub async fn check_flow(base_url: &str, verbose: bool) -> Status {
    output::info(&format!("Checking {}...", base_url));

    match run_check(base_url).await {
        Ok(Some(token)) => {
            output::success(&format!(
                "{} is reachable, token: {}...",
                base_url,
                token_preview(&token)
            ));
            Status::Success
        }

        Ok(None) => {
            output::error("Could not obtain an XSRF token");
            Status::Failure
        }

        Err(err) => {
            report_fault(&err, verbose);
            Status::Failure
        }
    }
}

/// The first few characters of a token, safe to print
fn token_preview(token: &str) -> String {
    token.chars().take(TOKEN_PREVIEW_LEN).collect()
}

async fn run_check(base_url: &str) -> Result<Option<String>> {
    let mut session = Session::new(base_url)?;
    session.fetch_token().await
}

/// Prints an error that ended a command, with the full cause chain in
/// verbose mode
pub fn report_fault(err: &anyhow::Error, verbose: bool) {
    output::error(&format!("{:#}", err));

    if verbose {
        eprintln!("{:?}", err);
    }
}
