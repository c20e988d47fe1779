use std::{error::Error as StdError,
          fmt,
          time::Duration};

use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, StatusCode, Url};

use super::endpoint::{Endpoint, Headers, Operation, Payload};
use crate::{config::Configuration,
            error::{Error, ErrorCode, Result}};

const MASKED: &str = "**************";

/// Lowercase fragments TLS backends put in their error messages
const TLS_MARKERS: [&str; 5] = ["certificate", "ssl", "tls", "handshake", "x509"];

/// How a request went wrong before a usable reply arrived
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
  /// The server replied with an error status
  Http,
  /// Connection, protocol or body failure
  Transport,
  /// No reply within the timeout (seconds)
  TimedOut(u16),
  /// TLS handshake or certificate failure
  Tls,
}

/// A failed request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
  /// What went wrong
  pub kind: FailureKind,
  /// HTTP status, `0` if none was received
  pub status: u16,
  /// Description of the failure
  pub message: String,
}

impl Failure {
  /// The server answered `url` with error status `status`
  pub fn http(url: &Url, status: u16) -> Self {
    let reason = StatusCode::from_u16(status).ok()
                                             .and_then(|s| s.canonical_reason())
                                             .unwrap_or("Unknown error");

    Self { kind: FailureKind::Http,
           status,
           message: format!("Error transferring {} - server replied: {}", url, reason) }
  }

  fn from_reqwest(err: &reqwest::Error, timeout: u16) -> Self {
    let status = err.status().map(|s| s.as_u16()).unwrap_or(0);

    if err.is_timeout() {
      return Self { kind: FailureKind::TimedOut(timeout),
                    status,
                    message: chain(err) };
    }

    match err.source().and_then(tls_failure) {
      | Some(message) => Self { kind: FailureKind::Tls,
                                status,
                                message },
      | None => Self { kind: FailureKind::Transport,
                       status,
                       message: chain(err) },
    }
  }
}

/// `err` and its sources, joined
fn chain(err: &(dyn StdError + 'static)) -> String {
  let mut msgs = vec![err.to_string()];
  let mut source = err.source();
  while let Some(e) = source {
    msgs.push(e.to_string());
    source = e.source();
  }

  msgs.join(": ")
}

/// Message of the first error in the chain that looks like a TLS failure
fn tls_failure(err: &(dyn StdError + 'static)) -> Option<String> {
  let mut source = Some(err);
  while let Some(e) = source {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if TLS_MARKERS.iter().any(|k| lower.contains(k)) {
      return Some(msg);
    }

    source = e.source();
  }

  None
}

/// What the server sent back
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
  /// Requested URL
  pub url: Url,
  /// HTTP status
  pub status: u16,
  /// `Content-Type` header, empty if absent
  pub content_type: String,
  /// `Content-Length` header
  pub content_length: Option<u64>,
  /// Body
  pub body: Bytes,
}

impl Reply {
  /// 2xx status
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// A request ready to be sent
#[derive(Clone)]
pub struct Request {
  /// HTTP method
  pub operation: Operation,
  /// Full URL including query
  pub url: Url,
  /// Every header, including `Authorization`
  pub headers: Headers,
  /// Body
  pub payload: Option<Payload>,
  /// Timeout in seconds, `0` for none
  pub timeout: u16,
}

impl fmt::Debug for Request {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let headers = self.headers
                      .iter()
                      .map(|(k, v)| match k.eq_ignore_ascii_case("authorization") {
                        | true => (k.as_str(), MASKED),
                        | false => (k.as_str(), v.as_str()),
                      })
                      .collect::<Vec<_>>();

    f.debug_struct("Request")
     .field("operation", &self.operation)
     .field("url", &self.url.as_str())
     .field("headers", &headers)
     .field("payload", &self.payload.as_ref().map(|p| &p.content_type))
     .field("timeout", &self.timeout)
     .finish()
  }
}

impl Request {
  /// Validate input and assemble URL, headers and body
  pub fn prepare(endpoint: &dyn Endpoint, config: &dyn Configuration, timeout: u16) -> Result<Self> {
    endpoint.check_input(config)?;

    let url = Self::build_url(endpoint, config)?;

    let mut headers = Headers::new();
    if let Some(accept) = endpoint.expected_content().accept() {
      headers.insert("Accept".into(), accept.into());
    }

    headers.extend(endpoint.build_headers(config));

    let payload = endpoint.build_payload(config);
    if let Some(payload) = &payload {
      headers.insert("Content-Type".into(), payload.content_type.clone());
    }

    if endpoint.requires_auth() {
      let basic = base64::encode(format!("{}:{}", config.username(), config.password()));
      headers.insert("Authorization".into(), format!("Basic {}", basic));
    }

    Ok(Self { operation: endpoint.operation(),
              url,
              headers,
              payload,
              timeout })
  }

  /// `http[s]://host[:port]<install path><path>?<query>`
  pub fn build_url(endpoint: &dyn Endpoint, config: &dyn Configuration) -> Result<Url> {
    let scheme = match config.use_ssl() {
      | true => "https",
      | false => "http",
    };

    let origin = match config.port() {
      | 0 => format!("{}://{}", scheme, config.host()),
      | port => format!("{}://{}:{}", scheme, config.host(), port),
    };

    let path = endpoint.build_path(config);
    let invalid = || Error::with_text(ErrorCode::InvalidRequestUrl, format!("{}{}", origin, path));

    let mut url = Url::parse(&origin).map_err(|_| invalid())?;
    if url.cannot_be_a_base() || url.host_str().unwrap_or_default().is_empty() {
      return Err(invalid());
    }

    url.set_path(&path);

    let query = endpoint.build_query();
    if !query.is_empty() {
      url.query_pairs_mut()
         .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    Ok(url)
  }

  /// Send the request once
  pub async fn send(self, client: &reqwest::Client) -> core::result::Result<Reply, Failure> {
    let Self { operation,
               url,
               headers,
               payload,
               timeout, } = self;

    let mut builder = client.request(operation.into(), url.clone());

    for (name, value) in &headers {
      builder = builder.header(name.as_str(), value.as_str());
    }

    if let Some(payload) = payload {
      builder = builder.body(payload.body);
    }

    if timeout > 0 {
      builder = builder.timeout(Duration::from_secs(timeout.into()));
    }

    let rep = builder.send().await.map_err(|e| Failure::from_reqwest(&e, timeout))?;

    let status = rep.status().as_u16();
    let content_type = rep.headers()
                          .get(CONTENT_TYPE)
                          .and_then(|v| v.to_str().ok())
                          .unwrap_or_default()
                          .to_string();
    let content_length = rep.content_length();

    let body = rep.bytes().await.map_err(|e| Failure::from_reqwest(&e, timeout))?;

    Ok(Reply { url,
               status,
               content_type,
               content_length,
               body })
  }
}
