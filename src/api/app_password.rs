use serde_json::Value;

use crate::{error::{Error, ErrorCode, Result},
            job::{endpoint::{self, Endpoint, Operation},
                  request::{Failure, FailureKind},
                  Description, Job}};

/// `GET /ocs/v2.php/core/getapppassword`: trade login credentials for an application password
#[derive(Clone, Copy, Debug, Default)]
pub struct GetAppPassword;

/// Job converting the configured credentials into an application password
pub type GetAppPasswordJob = Job<GetAppPassword>;

impl Endpoint for GetAppPassword {
  fn operation(&self) -> Operation {
    Operation::Get
  }

  fn describe(&self) -> Description {
    Description::new("Check for possibility to convert to application password")
  }

  fn path(&self) -> String {
    "/ocs/v2.php/core/getapppassword".into()
  }

  fn extract_error(&self, failure: &Failure) -> Result<()> {
    match (failure.kind, failure.status) {
      | (FailureKind::Http, 403) => Err(ErrorCode::AlreadyAppPassword.into()),
      | _ => endpoint::extract_error(failure),
    }
  }

  fn error_string(&self, error: &Error) -> String {
    match error.code {
      | ErrorCode::AlreadyAppPassword => "The password used is already an application password.".into(),
      | _ => error.to_string(),
    }
  }
}

impl GetAppPasswordJob {
  /// The issued application password, once the job succeeded
  pub fn app_password(&self) -> Option<String> {
    self.result()
        .as_ref()
        .and_then(|json| json.pointer("/ocs/data/apppassword"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
  }
}

/// `DELETE /ocs/v2.php/core/apppassword`: revoke the application password in use
#[derive(Clone, Copy, Debug, Default)]
pub struct DeleteAppPassword;

/// Job revoking the configured application password
pub type DeleteAppPasswordJob = Job<DeleteAppPassword>;

impl Endpoint for DeleteAppPassword {
  fn operation(&self) -> Operation {
    Operation::Delete
  }

  fn describe(&self) -> Description {
    Description::new("Deleting application password")
  }

  fn path(&self) -> String {
    "/ocs/v2.php/core/apppassword".into()
  }
}
