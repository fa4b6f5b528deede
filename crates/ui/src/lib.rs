#![deny(unsafe_code)]

//! GPUI presentation layer for the sous recipe-assistant widget.
//!
//! The widget is a floating toggle plus an expandable chat panel; all
//! conversation and request-lifecycle state lives in `sous-chat`, and the
//! generation backend is reached through the `sous-llm` capability seam.

/// Application shell that mounts the floating widget.
pub mod app;
/// Settings persistence and environment fallback.
pub mod settings;
/// The chat widget and its components.
pub mod widget;
