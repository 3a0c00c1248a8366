#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! API key authentication and per-call usage logging

mod error;
mod keyring;
pub mod usage;

pub use error::AuthError;
pub use keyring::{KeyContext, Keyring};
pub use usage::{UsageLogger, UsageRecord};
