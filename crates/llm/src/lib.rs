#![deny(unsafe_code)]

//! Generation-capability seam for the sous widget.
//!
//! The widget talks to one external text-generation service through the
//! [`GenerationCapability`] trait; [`GeminiCapability`] is the production
//! adapter built on rig's Gemini provider. Tests inject fakes at the trait.

use std::sync::Arc;

mod capability;
mod gemini;

pub use capability::{
    BoxFuture, CapabilityConfig, CapabilityError, CapabilityResult, DEFAULT_GEMINI_MODEL,
    GenerateRequest, GenerationCapability, GenerationConfig,
};
pub use gemini::{GEMINI_PROVIDER_ID, GeminiCapability};

/// Builds the capability named by the configuration's provider id.
///
/// An empty provider id resolves to Gemini. A missing API key is not an
/// error here; that failure is deferred to the first generate call.
pub fn create_capability(
    mut config: CapabilityConfig,
) -> CapabilityResult<Arc<dyn GenerationCapability>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = GEMINI_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        "gemini" | "google" => {
            config.provider_id = GEMINI_PROVIDER_ID.to_string();
            Ok(Arc::new(GeminiCapability::new(config)))
        }
        _ => Err(CapabilityError::UnsupportedProvider {
            stage: "create-capability",
            provider_id: config.provider_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_provider_id_resolves_to_gemini() {
        let capability = create_capability(CapabilityConfig::new("", "secret", ""))
            .expect("default provider should resolve");

        assert_eq!(capability.id(), GEMINI_PROVIDER_ID);
    }

    #[test]
    fn google_alias_resolves_to_gemini() {
        let capability = create_capability(CapabilityConfig::new("google", "secret", ""))
            .expect("alias should resolve");

        assert_eq!(capability.id(), GEMINI_PROVIDER_ID);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let error = create_capability(CapabilityConfig::new("acme", "secret", ""))
            .err()
            .expect("unknown provider must fail");

        assert!(matches!(
            error,
            CapabilityError::UnsupportedProvider { provider_id, .. } if provider_id == "acme"
        ));
    }
}
