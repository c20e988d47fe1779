use crate::{config::Configuration,
            job::{endpoint::{Endpoint, Headers, Operation},
                  Description, Job}};

/// `GET /status.php`: installation state and version, no authentication
#[derive(Clone, Copy, Debug, Default)]
pub struct GetServerStatus;

/// Job requesting the server status
pub type GetServerStatusJob = Job<GetServerStatus>;

impl Endpoint for GetServerStatus {
  fn operation(&self) -> Operation {
    Operation::Get
  }

  fn requires_auth(&self) -> bool {
    false
  }

  fn describe(&self) -> Description {
    Description::new("Requesting server status information")
  }

  fn path(&self) -> String {
    "/status.php".into()
  }

  fn build_query(&self) -> Vec<(String, String)> {
    Vec::new()
  }

  fn build_headers(&self, config: &dyn Configuration) -> Headers {
    let mut headers = crate::job::endpoint::default_headers(config);
    headers.remove("OCS-APIRequest");
    headers
  }
}
