/// `status.php`
pub mod status;

/// Application password issuance and revocation
pub mod app_password;

/// Remote wipe check
pub mod wipe;

/// User provisioning API
pub mod user;

pub use app_password::{DeleteAppPassword, DeleteAppPasswordJob, GetAppPassword, GetAppPasswordJob};
pub use status::{GetServerStatus, GetServerStatusJob};
pub use user::{GetUser, GetUserJob, GetUserList, GetUserListJob};
pub use wipe::{GetWipeStatus, GetWipeStatusJob};
