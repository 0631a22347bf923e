//! Cost-, quality- and health-aware provider routing.
//!
//! The router decides which providers a caller may use, orders them and
//! walks the list until one produces acceptable output. In automatic mode
//! provider failures and low-quality output are absorbed and the next
//! candidate is tried; in forced mode the single provider's outcome is
//! returned as-is.

use lectern_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::client::{LlmClient, LlmRequest, DEFAULT_MAX_OUTPUT_TOKENS};
use crate::cost::{base_cost_rank, estimate_cost_usd, estimate_tokens};
use crate::credentials::{resolve_key, PlatformKeys};
use crate::health::HealthTracker;
use crate::quality::quality_score;
use crate::types::{
    GenerationRequest, KeySource, ProviderAvailability, ProviderExecutionResult, ProviderId,
    ProviderMode,
};

/// Default automatic-mode quality floor.
pub const DEFAULT_QUALITY_FLOOR: f64 = 0.65;

pub const REASON_HIGH_COST_PLATFORM: &str =
    "Available with BYO key only under low-cost platform policy.";
pub const REASON_BYO_REQUIRED: &str = "BYO key required.";
pub const REASON_NO_KEY: &str = "No API key configured.";
pub const REASON_PLATFORM_HALTED: &str = "Platform-funded routing is currently halted.";

/// Routes generation requests across provider backends.
pub struct ProviderRouter {
    clients: BTreeMap<ProviderId, Arc<dyn LlmClient>>,
    platform_keys: PlatformKeys,
    health: Arc<HealthTracker>,
    quality_floor: f64,
}

impl ProviderRouter {
    /// Create a router with no backends registered.
    pub fn new(platform_keys: PlatformKeys, health: Arc<HealthTracker>) -> Self {
        Self {
            clients: BTreeMap::new(),
            platform_keys,
            health,
            quality_floor: DEFAULT_QUALITY_FLOOR,
        }
    }

    /// Register the backend serving `provider`.
    pub fn with_client(mut self, provider: ProviderId, client: Arc<dyn LlmClient>) -> Self {
        self.clients.insert(provider, client);
        self
    }

    /// Floor used when the route context does not override it.
    pub fn with_quality_floor(mut self, floor: f64) -> Self {
        self.quality_floor = floor;
        self
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub fn platform_keys(&self) -> &PlatformKeys {
        &self.platform_keys
    }

    /// Availability of every provider for a caller.
    ///
    /// A caller key always makes a provider available. Otherwise high-cost
    /// providers are refused unless the platform may fund them, providers
    /// without any key are refused, and platform keys are refused while
    /// platform routing is disabled.
    pub fn availability(
        &self,
        user_keys: &BTreeMap<ProviderId, String>,
        platform_keys_enabled: bool,
        allow_high_cost_on_platform: bool,
    ) -> Vec<ProviderAvailability> {
        ProviderId::ALL
            .iter()
            .map(|&provider| {
                let resolved = resolve_key(provider, user_keys, &self.platform_keys);
                match resolved.using {
                    KeySource::ByoKey => ProviderAvailability::usable(provider, KeySource::ByoKey),
                    _ if provider.is_high_cost() && !allow_high_cost_on_platform => {
                        if resolved.using == KeySource::PlatformKey {
                            ProviderAvailability::blocked(provider, REASON_HIGH_COST_PLATFORM)
                        } else {
                            ProviderAvailability::blocked(provider, REASON_BYO_REQUIRED)
                        }
                    }
                    KeySource::Unavailable => {
                        ProviderAvailability::blocked(provider, REASON_NO_KEY)
                    }
                    KeySource::PlatformKey if !platform_keys_enabled => {
                        ProviderAvailability::blocked(provider, REASON_PLATFORM_HALTED)
                    }
                    KeySource::PlatformKey => {
                        ProviderAvailability::usable(provider, KeySource::PlatformKey)
                    }
                }
            })
            .collect()
    }

    /// Order available providers for automatic mode.
    ///
    /// The preferred provider goes first when present; the rest are sorted
    /// by `4 * failure_ratio + avg_latency_ms / 4000 + cost_rank / 10`,
    /// ties broken by cost rank.
    pub fn candidate_order(&self, available: &[ProviderId]) -> Vec<ProviderId> {
        let mut unique: Vec<ProviderId> = Vec::new();
        for provider in available {
            if !unique.contains(provider) {
                unique.push(*provider);
            }
        }

        let has_preferred = unique.contains(&ProviderId::PREFERRED);
        let mut rest: Vec<(ProviderId, f64)> = unique
            .into_iter()
            .filter(|p| *p != ProviderId::PREFERRED)
            .map(|p| (p, self.composite_score(p)))
            .collect();
        rest.sort_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then_with(|| base_cost_rank(a.0).total_cmp(&base_cost_rank(b.0)))
        });

        let mut order = Vec::with_capacity(rest.len() + 1);
        if has_preferred {
            order.push(ProviderId::PREFERRED);
        }
        order.extend(rest.into_iter().map(|(p, _)| p));
        order
    }

    fn composite_score(&self, provider: ProviderId) -> f64 {
        let health = self.health.get(provider).unwrap_or_default();
        health.failure_ratio() * 4.0
            + health.avg_latency_ms as f64 / 4000.0
            + base_cost_rank(provider) / 10.0
    }

    /// Generate with the first acceptable provider.
    ///
    /// # Errors
    /// * `NoProviderAvailable` when no provider can be used
    /// * `ProviderUnavailable` carrying the reason when a forced provider is unusable
    /// * the forced provider's own error in forced mode
    /// * in automatic mode, once every candidate failed: the first call
    ///   error, or `QualityBelowFloor` when every failure was on quality
    pub async fn generate(&self, request: &GenerationRequest) -> AppResult<ProviderExecutionResult> {
        let ctx = &request.context;
        let floor = ctx.quality_floor.unwrap_or(self.quality_floor);
        let availability = self.availability(
            &ctx.user_keys,
            ctx.platform_keys_enabled,
            ctx.allow_high_cost_on_platform,
        );

        let order = match ctx.mode {
            ProviderMode::Auto => {
                let available: Vec<ProviderId> = availability
                    .iter()
                    .filter(|a| a.available)
                    .map(|a| a.provider)
                    .collect();
                self.candidate_order(&available)
            }
            ProviderMode::Forced(provider) => {
                let entry = availability.iter().find(|a| a.provider == provider);
                match entry {
                    Some(a) if a.available => vec![provider],
                    other => {
                        return Err(AppError::ProviderUnavailable {
                            provider: provider.to_string(),
                            reason: other
                                .and_then(|a| a.reason.clone())
                                .unwrap_or_else(|| {
                                    "Selected provider is currently unavailable.".to_string()
                                }),
                        })
                    }
                }
            }
        };

        if order.is_empty() {
            return Err(AppError::NoProviderAvailable);
        }

        tracing::info!(
            "Routing task '{}' in {} mode across [{}]",
            ctx.task,
            ctx.mode,
            order.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
        );

        let mut first_call_error: Option<AppError> = None;
        let mut first_quality_error: Option<AppError> = None;

        for provider in order {
            let resolved = resolve_key(provider, &ctx.user_keys, &self.platform_keys);
            let Some(api_key) = resolved.key else {
                continue;
            };

            let started = Instant::now();
            let outcome = self.execute(provider, &api_key, resolved.using, request).await;
            let latency_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) if ctx.mode == ProviderMode::Auto && result.quality_score < floor => {
                    self.health.record(provider, false, latency_ms);
                    tracing::warn!(
                        "{} output quality {:.3} below floor {:.3}; trying next provider",
                        provider,
                        result.quality_score,
                        floor
                    );
                    first_quality_error.get_or_insert(AppError::QualityBelowFloor {
                        provider: provider.to_string(),
                        score: result.quality_score,
                        floor,
                    });
                }
                Ok(result) => {
                    self.health.record(provider, true, latency_ms);
                    tracing::info!(
                        "{} answered in {}ms (quality {:.3}, cost ${:.8}, {:?})",
                        provider,
                        latency_ms,
                        result.quality_score,
                        result.estimated_cost_usd,
                        result.using
                    );
                    return Ok(result);
                }
                Err(e) => {
                    self.health.record(provider, false, latency_ms);
                    if let ProviderMode::Forced(_) = ctx.mode {
                        return Err(e);
                    }
                    tracing::warn!("{} failed: {}; trying next provider", provider, e);
                    first_call_error.get_or_insert(e);
                }
            }
        }

        Err(first_call_error
            .or(first_quality_error)
            .unwrap_or(AppError::NoProviderAvailable))
    }

    /// One attempt against one provider, honouring timeout and cancellation.
    async fn execute(
        &self,
        provider: ProviderId,
        api_key: &str,
        using: KeySource,
        request: &GenerationRequest,
    ) -> AppResult<ProviderExecutionResult> {
        let client = self.clients.get(&provider).ok_or_else(|| AppError::ProviderCallFailed {
            provider: provider.to_string(),
            message: "no backend registered".to_string(),
        })?;

        let ctx = &request.context;
        let llm_request = LlmRequest::new(request.system.clone(), request.messages.clone())
            .with_max_tokens(ctx.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS));

        let cancelled = || AppError::Cancelled {
            provider: provider.to_string(),
        };

        let call = async {
            match ctx.timeout {
                Some(limit) => tokio::time::timeout(limit, client.complete(api_key, &llm_request))
                    .await
                    .unwrap_or_else(|_| Err(cancelled())),
                None => client.complete(api_key, &llm_request).await,
            }
        };

        let response = match ctx.cancel {
            Some(ref signal) => {
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => Err(cancelled()),
                    result = call => result,
                }
            }
            None => call.await,
        }?;

        let input_tokens = estimate_tokens(&llm_request.concatenated_input());
        let output_tokens = estimate_tokens(&response.content);

        Ok(ProviderExecutionResult {
            provider,
            estimated_cost_usd: estimate_cost_usd(provider, input_tokens, output_tokens),
            quality_score: quality_score(&response.content),
            output: response.content,
            input_tokens,
            output_tokens,
            using,
        })
    }
}
