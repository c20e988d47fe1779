use std::sync::Arc;

use serde_json::{json, Value};

use super::{bool_of, str_of};
use crate::{api::{GetServerStatus, GetServerStatusJob},
            config::Configuration,
            error::Result,
            job::Job};

/// What `status.php` reports about an installation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerStatus {
  /// Installation finished
  pub installed: bool,
  /// Maintenance mode is on
  pub maintenance: bool,
  /// The database needs an upgrade
  pub needs_db_upgrade: bool,
  /// e.g. `20.0.5.2`
  pub version: String,
  /// e.g. `20.0.5`
  pub version_string: String,
  /// Edition, usually empty
  pub edition: String,
  /// e.g. `Nextcloud`
  pub product_name: String,
  /// Extended support subscription is active
  pub extended_support: bool,
}

impl ServerStatus {
  /// Read a `status.php` reply
  pub fn from_json(json: &Value) -> Self {
    Self { installed: bool_of(json, "installed"),
           maintenance: bool_of(json, "maintenance"),
           needs_db_upgrade: bool_of(json, "needsDbUpgrade"),
           version: str_of(json, "version"),
           version_string: str_of(json, "versionstring"),
           edition: str_of(json, "edition"),
           product_name: str_of(json, "productname"),
           extended_support: bool_of(json, "extendedSupport") }
  }

  /// JSON shaped like a `status.php` reply
  pub fn to_json(&self) -> Value {
    json!({
      "installed": self.installed,
      "maintenance": self.maintenance,
      "needsDbUpgrade": self.needs_db_upgrade,
      "version": self.version,
      "versionstring": self.version_string,
      "edition": self.edition,
      "productname": self.product_name,
      "extendedSupport": self.extended_support,
    })
  }

  /// No version means no status
  pub fn is_empty(&self) -> bool {
    self.version.is_empty()
  }

  fn job(config: Option<Arc<dyn Configuration>>) -> GetServerStatusJob {
    let job = Job::new(GetServerStatus);
    if let Some(config) = config {
      job.set_configuration(config);
    }

    job
  }

  /// Request the status, blocking. Uses the default configuration if `config` is `None`.
  pub fn get(config: Option<Arc<dyn Configuration>>) -> Result<Self> {
    let job = Self::job(config);
    job.run();
    job.settled_outcome().map(|json| Self::from_json(&json))
  }

  /// Request the status
  pub async fn get_async(config: Option<Arc<dyn Configuration>>) -> Result<Self> {
    let job = Self::job(config);
    job.start();
    job.join().await.map(|json| Self::from_json(&json))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn json_round_trip() {
    let src = json!({
      "installed": true,
      "maintenance": false,
      "needsDbUpgrade": false,
      "version": "20.0.5.2",
      "versionstring": "20.0.5",
      "edition": "",
      "productname": "Nextcloud",
      "extendedSupport": false,
    });

    let status = ServerStatus::from_json(&src);
    assert!(!status.is_empty());
    assert_eq!(status.product_name, "Nextcloud");
    assert_eq!(status.to_json(), src);
  }

  #[test]
  fn lenient_fields() {
    let status = ServerStatus::from_json(&json!({"installed": "yes", "version": 20}));
    assert!(!status.installed);
    assert!(status.is_empty());
  }
}
