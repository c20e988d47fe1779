use reqwest::Url;
use serde_json::Value;

mod mem;
pub use mem::{ConfigData, JsonFile, MemConfig, Reader};

/// Configuration result
pub type Result<T> = core::result::Result<T, self::Error>;

/// Reasons a configuration refuses new values
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The server URL is empty
  #[error("the server URL is empty")]
  EmptyUrl,

  /// The server URL can not be parsed
  #[error("the server URL {0:?} is not valid: {1}")]
  InvalidUrl(String, String),

  /// Only `http` and `https` are supported
  #[error("the server URL scheme {0:?} is not supported")]
  InvalidScheme(String),

  /// The server URL has no host name
  #[error("the server URL {0:?} has no host")]
  EmptyHost(String),

  /// Bytes handed over as login flow credentials are not JSON
  #[error("the login flow credentials are not valid JSON: {0}")]
  Json(#[from] serde_json::Error),

  /// Login flow credentials have to be a JSON object
  #[error("the login flow credentials are not a JSON object")]
  NotAnObject,

  /// A login flow field is absent or empty
  #[error("the login flow credentials lack {0:?}")]
  MissingField(&'static str),

  /// The app password reply holds no password
  #[error("the reply does not contain an application password")]
  EmptyAppPassword,

  /// A required environment variable is not set
  #[error("the environment variable {0} is not set")]
  MissingEnv(&'static str),

  /// A configuration file can not be read
  #[error("can not read {0}: {1}")]
  Io(String, std::io::Error),
}

fn rejected(e: Error) -> Error {
  log::error!("configuration: {}", e);
  e
}

/// Connection settings and credentials of one remote server.
///
/// Jobs hold configurations by shared reference, so setters take `&self`;
/// implementors use interior mutability. The setters default to no-ops
/// for read-only configurations.
pub trait Configuration: 'static + Send + Sync + std::fmt::Debug {
  /// Remote host name
  fn host(&self) -> String;

  /// Remote port, `0` for the scheme's default
  fn port(&self) -> u16 {
    0
  }

  /// Whether requests go over `https`
  fn use_ssl(&self) -> bool {
    true
  }

  /// Whether TLS certificate errors are ignored
  fn ignore_ssl_errors(&self) -> bool {
    false
  }

  /// Path the server is installed under, without trailing slash
  fn install_path(&self) -> String {
    String::new()
  }

  /// Login name
  fn username(&self) -> String;

  /// Password or application password
  fn password(&self) -> String;

  /// `User-Agent` sent with every request
  fn user_agent(&self) -> String {
    crate::default_user_agent()
  }

  /// Set the host name
  fn set_host(&self, _host: &str) {}
  /// Set the port
  fn set_port(&self, _port: u16) {}
  /// Switch between `https` and `http`
  fn set_use_ssl(&self, _use_ssl: bool) {}
  /// Ignore TLS certificate errors
  fn set_ignore_ssl_errors(&self, _ignore: bool) {}
  /// Set the install path
  fn set_install_path(&self, _path: &str) {}
  /// Set the login name
  fn set_username(&self, _username: &str) {}
  /// Set the password
  fn set_password(&self, _password: &str) {}

  /// Populate scheme, host, port and install path from a server URL.
  ///
  /// A URL without scheme is treated as `https`.
  fn set_server_url(&self, url: &str) -> Result<()> {
    let server = parse_server_url(url).map_err(rejected)?;

    self.set_use_ssl(server.use_ssl);
    self.set_host(&server.host);
    self.set_port(server.port);
    self.set_install_path(&server.install_path);

    Ok(())
  }

  /// Populate server and credentials from the JSON object a login flow yields:
  /// `{"server": .., "loginName": .., "appPassword": ..}`
  fn set_login_flow_credentials(&self, creds: &Value) -> Result<()> {
    let obj = creds.as_object().ok_or(Error::NotAnObject).map_err(rejected)?;

    let field = |name: &'static str| {
      obj.get(name)
         .and_then(Value::as_str)
         .map(str::trim)
         .filter(|s| !s.is_empty())
         .ok_or(Error::MissingField(name))
         .map_err(rejected)
    };

    let server = field("server")?;
    let login = field("loginName")?;
    let password = field("appPassword")?;

    self.set_server_url(server)?;
    self.set_username(login);
    self.set_password(password);

    Ok(())
  }

  /// Like `set_login_flow_credentials`, from raw reply bytes
  fn set_login_flow_credentials_from_slice(&self, bytes: &[u8]) -> Result<()> {
    let creds: Value = serde_json::from_slice(bytes).map_err(|e| rejected(e.into()))?;
    self.set_login_flow_credentials(&creds)
  }

  /// Store the password from a `getapppassword` reply: `{"ocs": {"data": {"apppassword": ..}}}`
  fn set_application_password(&self, reply: &Value) -> Result<()> {
    let password = reply.pointer("/ocs/data/apppassword")
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .ok_or(Error::EmptyAppPassword)
                        .map_err(rejected)?;

    self.set_password(password);
    Ok(())
  }
}

/// The parts of a server URL a configuration cares about
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerUrl {
  /// `https` or `http`
  pub use_ssl: bool,
  /// Host name
  pub host: String,
  /// Explicit port or `0`
  pub port: u16,
  /// Path without trailing slash
  pub install_path: String,
}

/// Split a server URL into its configuration parts
pub fn parse_server_url(url: &str) -> Result<ServerUrl> {
  let url = url.trim();
  if url.is_empty() {
    return Err(Error::EmptyUrl);
  }

  let full = match url.contains("://") {
    | true => url.to_string(),
    | false => format!("https://{}", url),
  };

  let parsed = Url::parse(&full).map_err(|e| Error::InvalidUrl(url.into(), e.to_string()))?;

  let use_ssl = match parsed.scheme() {
    | "https" => true,
    | "http" => false,
    | other => return Err(Error::InvalidScheme(other.into())),
  };

  let host = parsed.host_str().unwrap_or_default();
  if host.is_empty() {
    return Err(Error::EmptyHost(url.into()));
  }

  Ok(ServerUrl { use_ssl,
                 host: host.into(),
                 port: parsed.port().unwrap_or(0),
                 install_path: parsed.path().trim_end_matches('/').into() })
}
