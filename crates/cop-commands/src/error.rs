//! Error types for the command processors.
//!
//! Every variant is a processing failure reported to the caller of the
//! command. None of them is ever broadcast.

use cop_db::DbError;
use cop_types::TopicKey;

/// Errors that abort a command before anything is published.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// A required field is missing or out of range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation has no default chat channel.
    #[error("no default chat channel for operation {0}")]
    ChannelNotFound(TopicKey),

    /// No unit carries the given call sign.
    #[error("unit not found: {0}")]
    UnitNotFound(String),

    /// The persistence layer rejected the read or write.
    #[error("persistence failure: {0}")]
    Persistence(#[from] DbError),
}

impl From<validator::ValidationErrors> for CommandError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
                })
            })
            .collect();
        fields.sort();
        Self::Validation(fields.join(", "))
    }
}
