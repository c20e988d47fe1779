use serde_json::Value;

use crate::{config::Configuration,
            error::{Error, ErrorCode, Result},
            job::{endpoint::{self, Endpoint, Operation},
                  request::{Failure, FailureKind},
                  Description, Job, Output}};

/// `GET /ocs/v1.php/cloud/users/{id}`: one user's account data
#[derive(Clone, Debug, Default)]
pub struct GetUser {
  /// User to look up
  pub id: String,
}

/// Job requesting a user's data
pub type GetUserJob = Job<GetUser>;

impl GetUser {
  fn not_found(&self) -> Error {
    Error::with_text(ErrorCode::NotFound, &self.id)
  }
}

impl Endpoint for GetUser {
  fn operation(&self) -> Operation {
    Operation::Get
  }

  fn describe(&self) -> Description {
    Description::new("Requesting user data").field("User name", &self.id)
  }

  fn path(&self) -> String {
    format!("/ocs/v1.php/cloud/users/{}", endpoint::path_segment(&self.id))
  }

  fn check_input(&self, config: &dyn Configuration) -> Result<()> {
    endpoint::check_input(self.requires_auth(), config)?;

    match self.id.as_str() {
      | "" => Err(ErrorCode::EmptyUser.into()),
      | "." | ".." => Err(Error::with_text(ErrorCode::InvalidRequestUrl, &self.id)),
      | _ => Ok(()),
    }
  }

  fn check_output(&self, output: &Output) -> Result<()> {
    match output.meta_status {
      | 0 => Ok(()),
      | 404 => Err(self.not_found()),
      | status => Err(Error::with_text(ErrorCode::UnknownError, status)),
    }
  }

  fn extract_error(&self, failure: &Failure) -> Result<()> {
    match (failure.kind, failure.status) {
      | (FailureKind::Http, 404) => Err(self.not_found()),
      | _ => endpoint::extract_error(failure),
    }
  }

  fn error_string(&self, error: &Error) -> String {
    match error.code {
      | ErrorCode::EmptyUser => "Can not get user data for empty user name.".into(),
      | ErrorCode::NotFound => format!("Cannot get user information for {}. The user was not found.", error.text),
      | _ => error.to_string(),
    }
  }
}

impl GetUserJob {
  /// User data job for `id` against the process-wide context
  pub fn for_id(id: impl ToString) -> Self {
    Job::new(GetUser { id: id.to_string() })
  }

  /// User to look up
  pub fn user_id(&self) -> String {
    self.endpoint().id.clone()
  }

  /// Change the user to look up
  pub fn set_user_id(&self, id: impl ToString) {
    let id = id.to_string();
    log::debug!("job {}: user id changed to {:?}", self.id(), id);
    self.endpoint_mut().id = id;
  }
}

/// `GET /ocs/v1.php/cloud/users`: ids of all users
#[derive(Clone, Copy, Debug, Default)]
pub struct GetUserList;

/// Job requesting the user list
pub type GetUserListJob = Job<GetUserList>;

impl Endpoint for GetUserList {
  fn operation(&self) -> Operation {
    Operation::Get
  }

  fn describe(&self) -> Description {
    Description::new("Requesting user list")
  }

  fn path(&self) -> String {
    "/ocs/v1.php/cloud/users".into()
  }
}

impl GetUserListJob {
  /// User ids from `ocs.data.users`, once the job succeeded
  pub fn user_ids(&self) -> Vec<String> {
    self.result()
        .as_ref()
        .and_then(|json| json.pointer("/ocs/data/users"))
        .and_then(Value::as_array)
        .map(|users| users.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{config::MemConfig, job::request::Request};

  fn config() -> MemConfig {
    MemConfig::from_server_url("https://cloud.example.net", "tester", "s3cr3t").unwrap()
  }

  #[test]
  fn user_id_stays_one_segment() {
    let url = |id: &str| Request::build_url(&GetUser { id: id.into() }, &config()).unwrap();

    assert_eq!(url("alice").path(), "/ocs/v1.php/cloud/users/alice");
    assert_eq!(url("../groups").path(), "/ocs/v1.php/cloud/users/..%2Fgroups");
    assert_eq!(url("a b?c#d").path(), "/ocs/v1.php/cloud/users/a%20b%3Fc%23d");
    assert_eq!(url("%2e%2e").path(), "/ocs/v1.php/cloud/users/%252e%252e");
  }

  #[test]
  fn dot_ids_are_rejected() {
    for id in &[".", ".."] {
      let err = GetUser { id: id.to_string() }.check_input(&config()).unwrap_err();
      assert_eq!(err, Error::with_text(ErrorCode::InvalidRequestUrl, id));
    }

    assert!(GetUser { id: "...".into() }.check_input(&config()).is_ok());
  }
}
