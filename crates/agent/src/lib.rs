//! Answer generation for Lectern.
//!
//! A query goes through at most two LLM rounds:
//!
//! 1. **Round 1**: system prompt (+ history) and the question, with the
//!    course tools on offer
//! 2. **Tool round** (optional): every requested call runs concurrently
//! 3. **Round 2**: the model synthesizes an answer from the tool output,
//!    with no tools on offer
//!
//! [`CourseAssistant`] ties the index, the sessions and the orchestrator
//! together behind the operations the CLI and HTTP gateway call.

pub mod assistant;
pub mod orchestrator;
pub mod prompt;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assistant::{CourseAnalytics, CourseAssistant, FolderReport, QueryResponse};
pub use orchestrator::{Generation, Orchestrator};
pub use session::SessionStore;
