use sous_llm::GenerateRequest;

/// Fixed prompt for the mount-time connectivity probe.
pub const PROBE_PROMPT: &str = "You are a cooking assistant. Reply with a brief greeting.";

/// Persona instruction prepended to every user question.
pub const PERSONA_INSTRUCTION: &str =
    "You are a cooking assistant. Answer the following question about cooking or recipes:";

/// Seed message shown after a successful probe.
pub const WELCOME_TEXT: &str = "Hello! I'm your Recipe Assistant. Ask me anything about cooking!";

/// Seed message shown when the probe fails.
pub const PROBE_FAILURE_TEXT: &str =
    "Connection Error: Please make sure you have the correct API configuration and permissions.";

/// Static reply shown when an exchange fails for any reason.
pub const SEND_FAILURE_TEXT: &str =
    "I'm having trouble connecting to the recipe service. Please try again in a moment.";

/// Composes the probe call: the fixed prompt alone, no persona preamble.
pub fn probe_request() -> GenerateRequest {
    GenerateRequest::new(PROBE_PROMPT)
}

/// Composes a question call: persona instruction plus the raw user text.
///
/// Prior conversation turns are deliberately not included; every exchange
/// stands alone.
pub fn question_request(text: impl Into<String>) -> GenerateRequest {
    GenerateRequest::new(text).with_preamble(PERSONA_INSTRUCTION)
}
