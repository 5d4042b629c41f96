//! Configuration change proposers.
//!
//! A proposer looks at the tuning history, the current configuration and
//! the machine it runs on, and suggests a sparse delta for the next
//! benchmark run. A failed proposal is an error value, never a partial
//! configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ ProposalContext │────▶│  Proposer        │────▶│  Proposal       │
//! │ (history, host) │     │  (LLM/Heuristic) │     │  (delta + args) │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! # Key Components
//!
//! - [`proposer::Proposer`]: trait for proposing configuration deltas
//! - [`llm::LlmProposer`]: OpenAI-compatible chat completion client
//! - [`heuristic::HeuristicProposer`]: deterministic offline proposer
//! - [`response::parse_response`]: response text to schema-checked proposal
//! - [`context`]: host and trace descriptions fed into prompts

pub mod context;
pub mod error;
pub mod heuristic;
pub mod llm;
pub mod proposer;
pub mod response;

pub use context::{SystemContext, TraceContext};
pub use error::ProposalError;
pub use heuristic::HeuristicProposer;
pub use llm::LlmProposer;
pub use proposer::{Proposal, ProposalContext, Proposer, ResourceUsage};
