//! External text service for the monthly analyses: the [`TextService`]
//! capability, a chat-completions implementation, prompts, reply parsing, and
//! retry with back-off.

pub mod client;
pub mod error;
pub mod parse;
pub mod prompts;
pub mod retry;
pub mod service;
pub mod stub;
pub mod types;

pub use client::{ChatClient, ChatSettings};
pub use error::LlmError;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use service::{ChatTextService, TextService};
pub use stub::StubTextService;
pub use types::{
    Advantage, AffinityCriterion, BrandRank, BrandShortlist, Candidate, Persona, Pick, Pillar,
    ShortlistEntry, TaxonomyEntry, MAX_AFFINITY_SCORE, NEUTRAL_AFFINITY_SCORE,
};
