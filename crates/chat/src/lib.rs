#![deny(unsafe_code)]

//! Chat domain for the sous widget, independent of any UI framework.
//!
//! Holds the conversation model, the request-lifecycle state machine and
//! the request pipeline ([`ChatSession`]). The presentation layer drives a
//! session through its two-phase API and renders the resulting messages.

/// Domain entities for conversation state.
pub mod message;
/// Fixed prompt and message text plus request composition.
pub mod prompt;
pub mod session;
/// Deterministic request-lifecycle state machine.
pub mod state;

pub use message::{Conversation, Message, Sender};
pub use prompt::{
    PERSONA_INSTRUCTION, PROBE_FAILURE_TEXT, PROBE_PROMPT, SEND_FAILURE_TEXT, WELCOME_TEXT,
    probe_request, question_request,
};
pub use session::{
    ChatSession, PendingExchange, ProbeOutcome, ReplyError, ReplyOutcome, SubmitRejection,
};
pub use state::{RequestState, RequestTransition, TransitionRejection, TransitionResult};
