#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod rpc;

pub use error::HttpError;
pub use rpc::{RpcId, AUTH_REQUIRED, INVALID_REQUEST, METHOD_NOT_FOUND, PROTOCOL_VERSION};
