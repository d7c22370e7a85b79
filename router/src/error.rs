//! Error types for the router.

/// Errors that can occur when registering a subscription.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The subscription pattern was not a valid regular expression.
    #[error("invalid topic pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
