//! Provider module for chatrelay
//!
//! This module contains the completion provider abstraction, the
//! OpenAI-compatible implementation and a scripted fake.

pub mod base;
pub mod fake;
pub mod openai;

pub use base::{Message, Provider, TokenStream};
pub use fake::{FakeBehavior, FakeProvider};
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the provider described by the configuration
///
/// # Errors
///
/// Returns error if the provider cannot be initialized
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    if config.api_key.is_none() {
        tracing::warn!("No provider API key configured; every prompt will use the fallback");
    }
    Ok(Arc::new(OpenAiProvider::new(config.clone())?))
}
