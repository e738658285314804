//! Admin-side client: HTTP calls, the explicit [`Session`] value, the
//! protected-route [`Guard`] and the login page flow.

pub mod api;
pub mod config;
pub mod errors;
pub mod guard;
pub mod login;
pub mod session;

pub use api::{AuthApi, HttpAuthClient};
pub use config::ClientConfig;
pub use errors::{AuthFailure, ClientError};
pub use guard::{Guard, GuardOptions, GuardState, Navigation};
pub use login::{LoginFlow, LoginResume, logout};
pub use session::Session;
