pub mod password;
mod phi_audit;

pub use password::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    /// Stored credential carries the hash prefix but cannot be parsed.
    #[error("Malformed password hash: {0}")]
    MalformedHash(&'static str),
}
