use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use super::{bool_of, i64_of, str_of, strings_of, Quota};
use crate::{api::{GetUser, GetUserJob},
            config::Configuration,
            error::Result,
            job::Job};

/// Which account properties the user backend lets clients change
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackendCapabilities {
  /// Display name can be changed
  pub set_display_name: bool,
  /// Password can be changed
  pub set_password: bool,
}

/// A user account as the provisioning API reports it
#[derive(Clone, Debug, Default, PartialEq)]
pub struct User {
  /// Login name; empty for "no user"
  pub id: String,
  /// Account is enabled
  pub enabled: bool,
  /// Data directory on the server
  pub storage_location: String,
  /// Last login
  pub last_login: Option<DateTime<Utc>>,
  /// User backend, e.g. `Database`
  pub backend: String,
  /// Groups the user administrates
  pub subadmin: Vec<String>,
  /// Storage quota
  pub quota: Option<Quota>,
  /// E-mail address
  pub email: String,
  /// Display name
  pub display_name: String,
  /// Phone number
  pub phone: String,
  /// Postal address
  pub address: String,
  /// Website URL
  pub website: String,
  /// Twitter handle
  pub twitter: String,
  /// Group memberships
  pub groups: Vec<String>,
  /// Language code
  pub language: String,
  /// Locale code
  pub locale: String,
  /// Backend capabilities
  pub backend_capabilities: BackendCapabilities,
}

impl User {
  /// Read a user from a full reply (`{"ocs": {"data": ..}}`), a `{"data": ..}`
  /// object or the bare data object. No id yields an empty user.
  pub fn from_json(json: &Value) -> Self {
    let data = json.pointer("/ocs/data")
                   .or_else(|| json.get("data"))
                   .unwrap_or(json);

    let id = str_of(data, "id");
    if id.is_empty() {
      return Self::default();
    }

    static NONE: Value = Value::Null;
    let caps = data.get("backendCapabilities").unwrap_or(&NONE);

    Self { id,
           enabled: bool_of(data, "enabled"),
           storage_location: str_of(data, "storageLocation"),
           last_login: match i64_of(data, "lastLogin") {
             | 0 => None,
             | ms => Utc.timestamp_millis_opt(ms).single(),
           },
           backend: str_of(data, "backend"),
           subadmin: strings_of(data, "subadmin"),
           quota: data.get("quota").and_then(Quota::from_json),
           email: str_of(data, "email"),
           display_name: str_of(data, "displayname"),
           phone: str_of(data, "phone"),
           address: str_of(data, "address"),
           website: str_of(data, "website"),
           twitter: str_of(data, "twitter"),
           groups: strings_of(data, "groups"),
           language: str_of(data, "language"),
           locale: str_of(data, "locale"),
           backend_capabilities: BackendCapabilities { set_display_name: bool_of(caps, "setDisplayName"),
                                                       set_password: bool_of(caps, "setPassword") } }
  }

  /// The data object, shaped like the server's
  pub fn to_json(&self) -> Value {
    json!({
      "enabled": self.enabled,
      "storageLocation": self.storage_location,
      "id": self.id,
      "lastLogin": self.last_login.map(|t| t.timestamp_millis()).unwrap_or(0),
      "backend": self.backend,
      "subadmin": self.subadmin,
      "quota": self.quota.map(|q| q.to_json()).unwrap_or_else(|| json!({})),
      "email": self.email,
      "displayname": self.display_name,
      "phone": self.phone,
      "address": self.address,
      "website": self.website,
      "twitter": self.twitter,
      "groups": self.groups,
      "language": self.language,
      "locale": self.locale,
      "backendCapabilities": {
        "setDisplayName": self.backend_capabilities.set_display_name,
        "setPassword": self.backend_capabilities.set_password,
      },
    })
  }

  /// No id means no user
  pub fn is_empty(&self) -> bool {
    self.id.is_empty()
  }

  fn job(id: &str, config: Option<Arc<dyn Configuration>>) -> GetUserJob {
    let job = Job::new(GetUser { id: id.into() });
    if let Some(config) = config {
      job.set_configuration(config);
    }

    job
  }

  /// Request user `id`, blocking. Uses the default configuration if `config` is `None`.
  pub fn get(id: &str, config: Option<Arc<dyn Configuration>>) -> Result<Self> {
    let job = Self::job(id, config);
    job.run();
    job.settled_outcome().map(|json| Self::from_json(&json))
  }

  /// Request user `id`
  pub async fn get_async(id: &str, config: Option<Arc<dyn Configuration>>) -> Result<Self> {
    let job = Self::job(id, config);
    job.start();
    job.join().await.map(|json| Self::from_json(&json))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reply() -> Value {
    json!({
      "ocs": {
        "meta": {"status": "ok", "statuscode": 100, "message": "OK", "totalitems": "", "itemsperpage": ""},
        "data": {
          "enabled": true,
          "storageLocation": "/srv/www/nextcloud/data/tester",
          "id": "tester",
          "lastLogin": 1611134157000i64,
          "backend": "Database",
          "subadmin": ["group1"],
          "quota": {"free": 209639130, "used": 76070, "total": 209715200, "relative": 0.04, "quota": 209715200},
          "email": "tester@example.net",
          "displayname": "Tester",
          "phone": "+49123456789",
          "address": "Somewhere over the rainbow",
          "website": "https://example.net",
          "twitter": "@tester",
          "groups": ["group1", "group2"],
          "language": "de_DE",
          "locale": "de_DE",
          "backendCapabilities": {"setDisplayName": false, "setPassword": true}
        }
      }
    })
  }

  #[test]
  fn reads_every_shape() {
    let full = reply();
    let data = full.pointer("/ocs/data").unwrap().clone();

    let user = User::from_json(&full);
    assert_eq!(user.id, "tester");
    assert_eq!(user.last_login.map(|t| t.timestamp()), Some(1611134157));
    assert_eq!(user.quota.map(|q| q.used()), Some(76070));
    assert!(user.backend_capabilities.set_password);
    assert!(!user.backend_capabilities.set_display_name);

    assert_eq!(User::from_json(&data), user);
    assert_eq!(User::from_json(&json!({ "data": data })), user);
  }

  #[test]
  fn to_json_reproduces_data() {
    let full = reply();
    let user = User::from_json(&full);
    assert_eq!(&user.to_json(), full.pointer("/ocs/data").unwrap());
  }

  #[test]
  fn no_id_no_user() {
    assert!(User::from_json(&json!({"ocs": {"data": {"email": "a@b.c"}}})).is_empty());
    assert!(User::from_json(&Value::Null).is_empty());
  }
}
