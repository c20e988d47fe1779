//! # ocs-jobs
//! Jobs for the OCS REST API of Nextcloud-compatible servers.
//!
//! Every request is a [`job::Job`] over an [`job::Endpoint`]: the endpoint says
//! what to send and how to read the reply, the job sends it once (in the
//! background with `start`, blocking with `run`) and reports through events
//! and a typed [`error::Error`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ocs_jobs::{config::MemConfig, model::User};
//!
//! let config = MemConfig::from_server_url("https://cloud.example.net", "tester", "app-password").unwrap();
//! ocs_jobs::set_default_configuration(Some(Arc::new(config)));
//!
//! let user = User::get("tester", None).unwrap();
//! println!("{} <{}>", user.display_name, user.email);
//! ```

#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]

use std::sync::Arc;

/// Helper result methods
pub mod result_extra;

/// Helper mutex functions
pub mod mutex_extra;

/// Helper functions
pub mod extra;

/// Error codes and messages
pub mod error;

/// Server connection settings
pub mod config;

/// Process-wide defaults and HTTP client creation
pub mod context;

/// Job lifecycle and request flow
pub mod job;

/// OCS endpoints
pub mod api;

/// Domain objects read from replies
pub mod model;

use config::Configuration;
use context::{ClientFactory, Context};

/// Version of this crate
pub fn version() -> &'static str {
  env!("CARGO_PKG_VERSION")
}

/// `User-Agent` used unless a configuration says otherwise
pub fn default_user_agent() -> String {
  format!("{} {}", env!("CARGO_PKG_NAME"), version())
}

/// Set the configuration jobs of the process-wide context fall back to
pub fn set_default_configuration(config: Option<Arc<dyn Configuration>>) {
  Context::global().set_default_configuration(config)
}

/// Configuration jobs of the process-wide context fall back to
pub fn default_configuration() -> Option<Arc<dyn Configuration>> {
  Context::global().default_configuration()
}

/// Set the HTTP client factory of the process-wide context
pub fn set_client_factory(factory: Option<Arc<dyn ClientFactory>>) {
  Context::global().set_client_factory(factory)
}

/// HTTP client factory of the process-wide context
pub fn client_factory() -> Option<Arc<dyn ClientFactory>> {
  Context::global().client_factory()
}
