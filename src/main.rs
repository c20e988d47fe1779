//! # ocs_jobs_bin
//! Command line front end for `ocs_jobs`.
//!
//! The server and credentials come from a JSON config file (`--config`) or from
//! `OCS_SERVER_URL`, `OCS_USERNAME` and `OCS_PASSWORD` (a `.env` file works too).
//!
//! ```text
//! ocs_jobs_bin status
//! ocs_jobs_bin user tester
//! ocs_jobs_bin --async users
//! ```

#![deny(missing_docs)]
#![cfg_attr(not(test),
            forbid(missing_copy_implementations,
                   missing_debug_implementations,
                   unreachable_pub,
                   unsafe_code))]

use std::{env, path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use ocs_jobs::{api,
               config::{self, Configuration, JsonFile, MemConfig},
               error::Result,
               job::{Endpoint, Job},
               model::{ServerStatus, User}};
use serde_json::Value;

/// Talk to an OCS server
#[derive(Debug, Parser)]
struct Cli {
  /// JSON file with server and credentials
  #[arg(long)]
  config: Option<PathBuf>,

  /// Drive the job on a tokio runtime instead of blocking on it
  #[arg(long = "async")]
  asynchronous: bool,

  /// Request timeout in seconds, 0 for none
  #[arg(long, default_value_t = ocs_jobs::job::DEFAULT_REQUEST_TIMEOUT)]
  timeout: u16,

  #[command(subcommand)]
  command: Command,
}

/// Requests
#[derive(Debug, Subcommand)]
enum Command {
  /// Installation state and version
  Status,
  /// Account data of one user
  User {
    /// Login name
    id: String,
  },
  /// Ids of all users
  Users,
  /// Convert the configured password into an application password
  AppPassword,
  /// Revoke the configured application password
  DeleteAppPassword,
  /// Whether this client has to wipe its data
  WipeStatus {
    /// Token to check instead of the configured password
    token: Option<String>,
  },
}

/// Entry point
fn main() -> ExitCode {
  init_logger();

  let cli = Cli::parse();

  let config = match load_config(&cli) {
    | Ok(config) => config,
    | Err(e) => {
      log::error!("{}", e);
      return ExitCode::FAILURE;
    },
  };

  ocs_jobs::set_default_configuration(Some(config));

  let out = match &cli.command {
    | Command::Status => {
      exec(&cli, Job::new(api::GetServerStatus)).map(|json| ServerStatus::from_json(&json).to_json())
    },
    | Command::User { id } => {
      exec(&cli, Job::new(api::GetUser { id: id.clone() })).map(|json| User::from_json(&json).to_json())
    },
    | Command::Users => exec(&cli, Job::new(api::GetUserList)),
    | Command::AppPassword => exec(&cli, Job::new(api::GetAppPassword)),
    | Command::DeleteAppPassword => exec(&cli, Job::new(api::DeleteAppPassword)),
    | Command::WipeStatus { token } => {
      exec(&cli,
           Job::new(api::GetWipeStatus { token: token.clone().unwrap_or_default() }))
    },
  };

  match out {
    | Ok(json) => {
      println!("{:#}", json);
      ExitCode::SUCCESS
    },
    | Err(e) => {
      eprintln!("{}", e);
      ExitCode::FAILURE
    },
  }
}

fn load_config(cli: &Cli) -> config::Result<Arc<dyn Configuration>> {
  let config = match &cli.config {
    | Some(path) => MemConfig::from_reader(&JsonFile(path.clone()))?,
    | None => MemConfig::from_env()?,
  };

  Ok(Arc::new(config))
}

/// Run `job` blocking, or on a fresh runtime with `--async`
fn exec<E: Endpoint>(cli: &Cli, job: Job<E>) -> Result<Value> {
  job.set_request_timeout(cli.timeout);
  job.on(|event| log::debug!("{:?}", event));

  if !cli.asynchronous {
    job.run();
    return job.outcome().unwrap_or(Ok(Value::Null));
  }

  let rt = tokio::runtime::Builder::new_current_thread().enable_all()
                                                         .build();

  match rt {
    | Ok(rt) => rt.block_on(async {
                    job.start();
                    job.join().await
                  }),
    | Err(e) => Err(ocs_jobs::error::Error::with_text(ocs_jobs::error::ErrorCode::NetworkError, e)),
  }
}

fn init_logger() {
  if env::var_os("RUST_LOG").is_none() {
    env::set_var("RUST_LOG", "ocs_jobs=info,ocs_jobs_bin=info");
  }

  pretty_env_logger::init();
}
