use std::collections::BTreeMap;

use reqwest::Url;

use super::{event::Description,
            lifecycle::Output,
            request::{Failure, FailureKind}};
use crate::{config::Configuration,
            error::{Error, ErrorCode, Result}};

/// Request headers, sorted by name
pub type Headers = BTreeMap<String, String>;

/// HTTP method of a request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
  /// HEAD
  Head,
  /// GET
  Get,
  /// PUT
  Put,
  /// POST
  Post,
  /// DELETE
  Delete,
}

impl From<Operation> for reqwest::Method {
  fn from(op: Operation) -> Self {
    match op {
      | Operation::Head => Self::HEAD,
      | Operation::Get => Self::GET,
      | Operation::Put => Self::PUT,
      | Operation::Post => Self::POST,
      | Operation::Delete => Self::DELETE,
    }
  }
}

/// Content a reply is expected to carry
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContentType {
  /// Nothing
  Empty,
  /// A JSON array
  JsonArray,
  /// A JSON object
  JsonObject,
  /// An HTML page
  Html,
  /// An image
  Image,
}

impl ContentType {
  /// `Accept` header value asking for this content
  pub fn accept(self) -> Option<&'static str> {
    match self {
      | Self::Empty => None,
      | Self::JsonArray | Self::JsonObject => Some("application/json"),
      | Self::Html => Some("text/html,application/xhtml+xml,application/xml"),
      | Self::Image => Some("image/png,image/gif,image/vnd.microsoft.icon"),
    }
  }

  /// JSON array or object
  pub fn is_json(self) -> bool {
    matches!(self, Self::JsonArray | Self::JsonObject)
  }
}

/// Request body and its content type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
  /// `Content-Type` header value
  pub content_type: String,
  /// Encoded body
  pub body: Vec<u8>,
}

/// What one REST endpoint contributes to a job.
///
/// The job drives the request; the endpoint decides what to send and how
/// to read the reply. Every hook has a default, and the defaults are also
/// exposed as free functions so overrides can extend them.
pub trait Endpoint: 'static + Send + Sync + std::fmt::Debug {
  /// HTTP method
  fn operation(&self) -> Operation;

  /// Content the reply should carry
  fn expected_content(&self) -> ContentType {
    ContentType::JsonObject
  }

  /// Whether the request carries Basic authentication
  fn requires_auth(&self) -> bool {
    true
  }

  /// Summary fired as `Event::Description` when the job starts
  fn describe(&self) -> Description;

  /// Path below the install path, e.g. `/status.php`
  fn path(&self) -> String;

  /// Full request path
  fn build_path(&self, config: &dyn Configuration) -> String {
    format!("{}{}", config.install_path(), self.path())
  }

  /// Query parameters
  fn build_query(&self) -> Vec<(String, String)> {
    default_query()
  }

  /// Headers besides `Accept`, `Content-Type` and `Authorization`
  fn build_headers(&self, config: &dyn Configuration) -> Headers {
    default_headers(config)
  }

  /// Request body
  fn build_payload(&self, _config: &dyn Configuration) -> Option<Payload> {
    None
  }

  /// Validate configuration and endpoint parameters before anything is sent
  fn check_input(&self, config: &dyn Configuration) -> Result<()> {
    check_input(self.requires_auth(), config)
  }

  /// Interpret a reply that passed the generic content checks
  fn check_output(&self, _output: &Output) -> Result<()> {
    Ok(())
  }

  /// Turn an HTTP error status or transport failure into a job error.
  /// `Ok(())` treats the failure as success with an empty result.
  fn extract_error(&self, failure: &Failure) -> Result<()> {
    extract_error(failure)
  }

  /// Human readable message for an error of this endpoint
  fn error_string(&self, error: &Error) -> String {
    error.to_string()
  }
}

/// `format=json`
pub fn default_query() -> Vec<(String, String)> {
  vec![("format".into(), "json".into())]
}

/// `segment` percent-encoded for use as one path segment, `/` included
pub fn path_segment(segment: &str) -> String {
  let mut url = match Url::parse("http://localhost/") {
    | Ok(url) => url,
    | Err(_) => return segment.to_string(),
  };

  if let Ok(mut segments) = url.path_segments_mut() {
    segments.clear().push(segment);
  }

  url.path().trim_start_matches('/').to_string()
}

/// `OCS-APIRequest: true` and the configured `User-Agent`
pub fn default_headers(config: &dyn Configuration) -> Headers {
  let mut headers = Headers::new();
  headers.insert("OCS-APIRequest".into(), "true".into());
  headers.insert("User-Agent".into(), config.user_agent());
  headers
}

/// Host is required; user name and password are too if `requires_auth`
pub fn check_input(requires_auth: bool, config: &dyn Configuration) -> Result<()> {
  if config.host().is_empty() {
    return Err(ErrorCode::MissingHost.into());
  }

  if requires_auth && config.username().is_empty() {
    return Err(ErrorCode::MissingUser.into());
  }

  if requires_auth && config.password().is_empty() {
    return Err(ErrorCode::MissingPassword.into());
  }

  Ok(())
}

/// 401 and 403 are auth failures, everything else is a network error
pub fn extract_error(failure: &Failure) -> Result<()> {
  let error = match (failure.kind, failure.status) {
    | (FailureKind::TimedOut(secs), _) => Error::with_text(ErrorCode::RequestTimedOut, secs),
    | (FailureKind::Tls, _) => Error::with_text(ErrorCode::SslError, &failure.message),
    | (FailureKind::Http, 401) => Error::new(ErrorCode::AuthNFailed),
    | (FailureKind::Http, 403) => Error::new(ErrorCode::AuthZFailed),
    | _ => Error::with_text(ErrorCode::NetworkError, &failure.message),
  };

  Err(error)
}
