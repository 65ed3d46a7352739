// Google Workspace infra layer.
// - `service_account.rs` handles the OAuth2 JWT bearer flow.
// - `drive_client.rs` lists documents and stores the checkpoint artifact.
// - `slides_client.rs` and `sheets_client.rs` perform the actual refreshes.

#[path = "service_account.rs"]
pub mod service_account;

#[path = "drive_client.rs"]
pub mod drive_client;

#[path = "slides_client.rs"]
pub mod slides_client;

#[path = "sheets_client.rs"]
pub mod sheets_client;

pub use drive_client::DriveApiClient;
pub use service_account::{AuthError, ServiceAccountAuth, WORKSPACE_SCOPES};
pub use sheets_client::SheetsApiClient;
pub use slides_client::SlidesApiClient;
