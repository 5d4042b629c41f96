//! Proposal failures.

use thiserror::Error;
use tuneforge_options::SchemaError;

/// Why a proposer produced no usable proposal.
///
/// Every variant counts as a null proposal: the control loop spends one
/// attempt and asks again.
#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("reasoning service request failed: {0}")]
    Transport(String),

    #[error("reasoning service returned no message content")]
    NoContent,

    #[error("malformed proposal: {0}")]
    Malformed(String),

    #[error("proposal changes no settings")]
    EmptyDelta,

    #[error("proposal fails schema checks: {0}")]
    InvalidDelta(#[from] SchemaError),

    #[error("no further adjustment available")]
    Exhausted,
}

impl ProposalError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProposalError::Transport(_) => "transport",
            ProposalError::NoContent => "no_content",
            ProposalError::Malformed(_) => "malformed",
            ProposalError::EmptyDelta => "empty_delta",
            ProposalError::InvalidDelta(_) => "invalid_delta",
            ProposalError::Exhausted => "exhausted",
        }
    }
}
