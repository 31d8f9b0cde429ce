//! Records exchanged between agents. LLM-produced ones implement
//! `StructuredOutput` so the completion client can validate them.

mod email;
mod intel;
mod profile;

pub use email::{EmailDraft, McqAnswers, McqQuestions, RecipientType};
pub use intel::{CompanyProfile, IntelBrief, PersonProfile, Signals, TalkingPoints, MAX_TALKING_POINTS};
pub use profile::{ConfidenceLevel, MatchAnalysis, MatchResult, UserProfile};
