use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug)]
pub enum ConfigTreeError {
    /// A tree or update could not be encoded into its canonical form
    #[error("Failed to encode: {0}")]
    EncodeFailed(String),

    /// Bytes could not be decoded into a tree or update
    #[error("Failed to decode: {0}")]
    DecodeFailed(String),
}
