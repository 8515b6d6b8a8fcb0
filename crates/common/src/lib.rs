//! Common types shared by the session-token workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
