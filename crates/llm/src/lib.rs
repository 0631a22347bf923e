//! Provider routing for Lectern.
//!
//! This crate hides the generation backends behind one [`LlmClient`] trait
//! and routes each request to the provider that is allowed, cheapest and
//! healthiest, falling back when a provider fails or produces weak output.
//!
//! # Example
//! ```no_run
//! use lectern_llm::{ChatMessage, GenerationRequest, HealthTracker, RouteContext};
//! use std::sync::Arc;
//!
//! # async fn example(config: lectern_core::AppConfig) -> lectern_core::AppResult<()> {
//! let router = lectern_llm::create_router(&config, Arc::new(HealthTracker::new()))?;
//! let request = GenerationRequest::new(
//!     "You are a careful writer.",
//!     vec![ChatMessage::user("Outline Psalm 23.")],
//!     RouteContext::new("outline"),
//! );
//! let result = router.generate(&request).await?;
//! println!("{} via {}", result.output, result.provider);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod client;
pub mod cost;
pub mod credentials;
pub mod factory;
pub mod health;
pub mod providers;
pub mod quality;
pub mod router;
pub mod types;

#[cfg(test)]
mod tests;

pub use cancel::CancelSignal;
pub use client::{LlmClient, LlmRequest, LlmResponse};
pub use credentials::{resolve_key, PlatformKeys, ResolvedKey};
pub use factory::{create_client, create_router};
pub use health::{HealthTracker, ProviderHealth};
pub use quality::quality_score;
pub use router::ProviderRouter;
pub use types::{
    ChatMessage, GenerationRequest, KeySource, ProviderAvailability, ProviderExecutionResult,
    ProviderId, ProviderMode, Role, RouteContext,
};
