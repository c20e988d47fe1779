use std::{env,
          path::PathBuf,
          sync::RwLock};

use serde::{Deserialize as De, Serialize as Ser};

use super::{Configuration, Error, Result};
use crate::{extra::str::StrExtra,
            mutex_extra::{read_discard_poison, write_discard_poison}};

/// Plain configuration values, (de)serializable for config files
#[derive(Clone, Debug, PartialEq, Eq, Ser, De)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigData {
  /// Remote host name
  pub host: String,
  /// Remote port, `0` for the scheme's default
  pub port: u16,
  /// `https` when set
  pub use_ssl: bool,
  /// Accept invalid certificates
  pub ignore_ssl_errors: bool,
  /// Path the server is installed under
  pub install_path: String,
  /// Login name
  pub username: String,
  /// Password or application password
  pub password: String,
  /// Overrides the default `User-Agent`
  pub user_agent: Option<String>,
}

impl Default for ConfigData {
  fn default() -> Self {
    Self { host: String::new(),
           port: 0,
           use_ssl: true,
           ignore_ssl_errors: false,
           install_path: String::new(),
           username: String::new(),
           password: String::new(),
           user_agent: None }
  }
}

/// Something configuration data can be read from
pub trait Reader {
  /// Read configuration data from some source
  fn read(&self) -> Result<ConfigData>;
}

/// Implements Reader for a JSON file shaped like `ConfigData`
#[derive(Debug, Clone)]
pub struct JsonFile(pub PathBuf);

impl Reader for JsonFile {
  fn read(&self) -> Result<ConfigData> {
    let path = self.0.display().to_string();

    std::fs::read_to_string(&self.0).map_err(|e| Error::Io(path, e))
                                    .and_then(|json| serde_json::from_str(&json).map_err(Error::Json))
  }
}

/// Configuration kept in memory
#[derive(Debug, Default)]
pub struct MemConfig {
  data: RwLock<ConfigData>,
}

impl MemConfig {
  /// Empty configuration
  pub fn new() -> Self {
    Self::default()
  }

  /// Configuration holding `data`
  pub fn from_data(data: ConfigData) -> Self {
    Self { data: RwLock::new(data) }
  }

  /// Configuration for a server URL and credentials
  pub fn from_server_url(url: &str, username: &str, password: &str) -> Result<Self> {
    let config = Self::new();
    config.set_server_url(url)?;
    config.set_username(username);
    config.set_password(password);
    Ok(config)
  }

  /// Configuration read through a `Reader`
  pub fn from_reader(reader: &dyn Reader) -> Result<Self> {
    reader.read().map(Self::from_data)
  }

  /// Configuration from the environment (a `.env` file is honoured):
  ///
  /// - `OCS_SERVER_URL` (required)
  /// - `OCS_USERNAME`
  /// - `OCS_PASSWORD`
  /// - `OCS_IGNORE_SSL_ERRORS` (`1` or `true`)
  /// - `OCS_USER_AGENT`
  pub fn from_env() -> Result<Self> {
    dotenv::dotenv().ok();

    let url = env::var("OCS_SERVER_URL").map_err(|_| Error::MissingEnv("OCS_SERVER_URL"))?;
    let config = Self::new();
    config.set_server_url(&url)?;

    if let Ok(username) = env::var("OCS_USERNAME") {
      config.set_username(&username);
    }

    if let Ok(password) = env::var("OCS_PASSWORD") {
      config.set_password(&password);
    }

    if let Ok(ignore) = env::var("OCS_IGNORE_SSL_ERRORS") {
      config.set_ignore_ssl_errors(ignore.loose_eq("1") || ignore.loose_eq("true"));
    }

    if let Ok(agent) = env::var("OCS_USER_AGENT") {
      write_discard_poison(&config.data).user_agent = Some(agent);
    }

    Ok(config)
  }

  /// Snapshot of the current values
  pub fn data(&self) -> ConfigData {
    read_discard_poison(&self.data).clone()
  }

  fn get<T>(&self, f: impl FnOnce(&ConfigData) -> T) -> T {
    f(&read_discard_poison(&self.data))
  }

  fn set(&self, f: impl FnOnce(&mut ConfigData)) {
    f(&mut write_discard_poison(&self.data))
  }
}

impl Configuration for MemConfig {
  fn host(&self) -> String {
    self.get(|d| d.host.clone())
  }

  fn port(&self) -> u16 {
    self.get(|d| d.port)
  }

  fn use_ssl(&self) -> bool {
    self.get(|d| d.use_ssl)
  }

  fn ignore_ssl_errors(&self) -> bool {
    self.get(|d| d.ignore_ssl_errors)
  }

  fn install_path(&self) -> String {
    self.get(|d| d.install_path.clone())
  }

  fn username(&self) -> String {
    self.get(|d| d.username.clone())
  }

  fn password(&self) -> String {
    self.get(|d| d.password.clone())
  }

  fn user_agent(&self) -> String {
    self.get(|d| d.user_agent.clone()).unwrap_or_else(crate::default_user_agent)
  }

  fn set_host(&self, host: &str) {
    self.set(|d| d.host = host.into())
  }

  fn set_port(&self, port: u16) {
    self.set(|d| d.port = port)
  }

  fn set_use_ssl(&self, use_ssl: bool) {
    self.set(|d| d.use_ssl = use_ssl)
  }

  fn set_ignore_ssl_errors(&self, ignore: bool) {
    self.set(|d| d.ignore_ssl_errors = ignore)
  }

  fn set_install_path(&self, path: &str) {
    self.set(|d| d.install_path = path.into())
  }

  fn set_username(&self, username: &str) {
    self.set(|d| d.username = username.into())
  }

  fn set_password(&self, password: &str) {
    self.set(|d| d.password = password.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let config = MemConfig::new();
    assert!(config.use_ssl());
    assert!(!config.ignore_ssl_errors());
    assert_eq!(config.port(), 0);
    assert_eq!(config.user_agent(), crate::default_user_agent());
  }

  #[test]
  fn data_deserializes_with_defaults() {
    let data: ConfigData = serde_json::from_str(r#"{"host": "cloud.example.net", "username": "tester"}"#).unwrap();
    assert_eq!(data.host, "cloud.example.net");
    assert!(data.use_ssl);
    assert_eq!(data.password, "");
  }
}
