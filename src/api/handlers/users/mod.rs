//! User account handlers: registration, login, token lifecycle, and profile
//! management.
//!
//! Layout mirrors the request flow: `session` resolves who is calling,
//! `tokens` mints and rotates the JWT pair, `storage` owns every SQL
//! statement, and the per-endpoint modules stay thin.

pub mod login;
pub mod logout;
pub mod password;
pub mod profile;
pub mod refresh;
pub mod register;
pub(crate) mod session;
mod state;
pub(crate) mod storage;
pub(crate) mod tokens;
pub mod types;
pub(crate) mod utils;

pub use state::{AuthConfig, AuthState};
pub(crate) use storage::ensure_schema;
