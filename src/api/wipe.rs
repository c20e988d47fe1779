use serde_json::Value;

use crate::{config::Configuration,
            error::{Error, ErrorCode, Result},
            job::{endpoint::{self, Endpoint, Headers, Operation, Payload},
                  request::{Failure, FailureKind},
                  Description, Job},
            result_extra::ResultExtra};

/// `POST /index.php/core/wipe/check`: ask whether this client has to wipe its data.
///
/// Authenticates with the application password (or an explicit token) in the
/// form body instead of Basic auth. The server answers 404 when no wipe is
/// pending, which counts as success with an empty result.
#[derive(Clone, Debug, Default)]
pub struct GetWipeStatus {
  /// Token to check; the configured password is used when empty
  pub token: String,
}

/// Job checking the remote wipe status
pub type GetWipeStatusJob = Job<GetWipeStatus>;

impl GetWipeStatus {
  fn token_for(&self, config: &dyn Configuration) -> String {
    match self.token.is_empty() {
      | true => config.password(),
      | false => self.token.clone(),
    }
  }
}

impl Endpoint for GetWipeStatus {
  fn operation(&self) -> Operation {
    Operation::Post
  }

  fn requires_auth(&self) -> bool {
    false
  }

  fn describe(&self) -> Description {
    Description::new("Requesting wipe status")
  }

  fn path(&self) -> String {
    "/index.php/core/wipe/check".into()
  }

  fn build_query(&self) -> Vec<(String, String)> {
    Vec::new()
  }

  fn build_headers(&self, config: &dyn Configuration) -> Headers {
    let mut headers = endpoint::default_headers(config);
    headers.remove("OCS-APIRequest");
    headers
  }

  fn build_payload(&self, config: &dyn Configuration) -> Option<Payload> {
    let body = serde_urlencoded::to_string(&[("token", self.token_for(config))]).ok()?;

    Some(Payload { content_type: "application/x-www-form-urlencoded".into(),
                   body: body.into_bytes() })
  }

  fn check_input(&self, config: &dyn Configuration) -> Result<()> {
    endpoint::check_input(false, config)?;

    match self.token_for(config).is_empty() {
      | true => Err(ErrorCode::MissingPassword.into()),
      | false => Ok(()),
    }
  }

  fn extract_error(&self, failure: &Failure) -> Result<()> {
    endpoint::extract_error(failure).and_then_err(|e| match (failure.kind, failure.status) {
                                      | (FailureKind::Http, 404) => Ok(()),
                                      | _ => Err(e),
                                    })
  }

  fn error_string(&self, error: &Error) -> String {
    match error.code {
      | ErrorCode::MissingPassword => "Can not get wipe status with empty application password/token.".into(),
      | _ => error.to_string(),
    }
  }
}

impl GetWipeStatusJob {
  /// Wipe status job for `token`
  pub fn for_token(token: impl ToString) -> Self {
    Job::new(GetWipeStatus { token: token.to_string() })
  }

  /// Token to check
  pub fn token(&self) -> String {
    self.endpoint().token.clone()
  }

  /// Change the token to check
  pub fn set_token(&self, token: impl ToString) {
    let token = token.to_string();
    log::debug!("job {}: wipe token changed", self.id());
    self.endpoint_mut().token = token;
  }

  /// Whether the server asked this client to wipe its data
  pub fn wipe_requested(&self) -> bool {
    self.result()
        .as_ref()
        .and_then(|json| json.get("wipe"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
  }
}
