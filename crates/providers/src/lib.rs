//! Completion service clients for BizPilot.
//!
//! All providers implement the `bizpilot_core::Provider` trait.

pub mod anthropic;

pub use anthropic::AnthropicProvider;
