use std::sync::Arc;
use std::time::Duration;

use lectern_core::AppError;

use crate::cancel::CancelSignal;
use crate::credentials::PlatformKeys;
use crate::health::HealthTracker;
use crate::providers::{ScriptedClient, ScriptedReply};
use crate::router::{
    ProviderRouter, REASON_BYO_REQUIRED, REASON_HIGH_COST_PLATFORM, REASON_NO_KEY,
    REASON_PLATFORM_HALTED,
};
use crate::types::{ChatMessage, GenerationRequest, KeySource, ProviderId, ProviderMode, RouteContext};

fn strong_text() -> String {
    format!(
        "{}\n\nThe shepherd image in Psalm 23:1 frames the whole passage.",
        "Rest and provision run through the opening lines. ".repeat(5)
    )
}

fn weak_text() -> String {
    "Too short.".to_string()
}

fn request(context: RouteContext) -> GenerationRequest {
    GenerationRequest::new(
        "You write sermon outlines.",
        vec![ChatMessage::user("Outline Psalm 23.")],
        context,
    )
}

fn router(keys: PlatformKeys) -> ProviderRouter {
    ProviderRouter::new(keys, Arc::new(HealthTracker::new()))
}

fn all_platform_keys() -> PlatformKeys {
    PlatformKeys::new()
        .with_key(ProviderId::OpenAi, "sk-platform-openai")
        .with_key(ProviderId::Google, "platform-google")
        .with_key(ProviderId::Minimax, "platform-minimax")
        .with_key(ProviderId::NvidiaKimi, "platform-kimi")
}

#[tokio::test]
async fn test_no_keys_means_no_provider() {
    let router = router(PlatformKeys::new())
        .with_client(ProviderId::OpenAi, Arc::new(ScriptedClient::always("openai", strong_text())));

    let err = router.generate(&request(RouteContext::new("outline"))).await.unwrap_err();
    assert!(matches!(err, AppError::NoProviderAvailable));
    assert_eq!(err.to_string(), "No available generation providers configured.");
}

#[test]
fn test_availability_reasons() {
    let router = router(
        PlatformKeys::new()
            .with_key(ProviderId::OpenAi, "sk-platform")
            .with_key(ProviderId::Minimax, "platform-minimax"),
    );
    let listing = router.availability(&Default::default(), true, false);

    assert_eq!(listing.len(), 4);
    assert!(listing[0].available);
    assert_eq!(listing[0].using, KeySource::PlatformKey);
    assert_eq!(listing[1].reason.as_deref(), Some(REASON_NO_KEY));
    assert_eq!(listing[2].reason.as_deref(), Some(REASON_HIGH_COST_PLATFORM));
    assert_eq!(listing[3].reason.as_deref(), Some(REASON_BYO_REQUIRED));
}

#[test]
fn test_platform_halt_blocks_platform_keys_only() {
    let router = router(PlatformKeys::new().with_key(ProviderId::Google, "platform-google"));
    let mut user_keys = std::collections::BTreeMap::new();
    user_keys.insert(ProviderId::OpenAi, "sk-user".to_string());

    let listing = router.availability(&user_keys, false, false);
    assert!(listing[0].available);
    assert_eq!(listing[0].using, KeySource::ByoKey);
    assert!(!listing[1].available);
    assert_eq!(listing[1].reason.as_deref(), Some(REASON_PLATFORM_HALTED));
}

#[test]
fn test_high_cost_override_allows_platform_funding() {
    let router = router(all_platform_keys());
    let listing = router.availability(&Default::default(), true, true);
    assert!(listing.iter().all(|a| a.available));
}

#[tokio::test]
async fn test_forced_unavailable_returns_reason() {
    let router = router(PlatformKeys::new().with_key(ProviderId::Minimax, "platform-minimax"))
        .with_client(ProviderId::Minimax, Arc::new(ScriptedClient::always("minimax", strong_text())));

    let ctx = RouteContext::new("outline").with_mode(ProviderMode::Forced(ProviderId::Minimax));
    let err = router.generate(&request(ctx)).await.unwrap_err();
    match err {
        AppError::ProviderUnavailable { provider, reason } => {
            assert_eq!(provider, "minimax");
            assert_eq!(reason, REASON_HIGH_COST_PLATFORM);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_byo_key_unlocks_high_cost_provider() {
    let minimax = Arc::new(ScriptedClient::always("minimax", strong_text()));
    let router = router(PlatformKeys::new()).with_client(ProviderId::Minimax, minimax.clone());

    let ctx = RouteContext::new("outline").with_user_key(ProviderId::Minimax, "user-minimax");
    let result = router.generate(&request(ctx)).await.unwrap();

    assert_eq!(result.provider, ProviderId::Minimax);
    assert_eq!(result.using, KeySource::ByoKey);
    assert_eq!(minimax.calls()[0].api_key, "user-minimax");
    assert!(result.estimated_cost_usd > 0.0);
    assert!(result.input_tokens >= 1);
}

#[tokio::test]
async fn test_low_quality_falls_back_in_auto_mode() {
    let openai = Arc::new(ScriptedClient::always("openai", weak_text()));
    let google = Arc::new(ScriptedClient::always("google", strong_text()));
    let router = router(all_platform_keys())
        .with_client(ProviderId::OpenAi, openai.clone())
        .with_client(ProviderId::Google, google.clone());

    let result = router.generate(&request(RouteContext::new("outline"))).await.unwrap();

    assert_eq!(result.provider, ProviderId::Google);
    assert_eq!(result.quality_score, 1.0);
    assert_eq!(openai.calls().len(), 1);
    let health = router.health().get(ProviderId::OpenAi).unwrap();
    assert_eq!(health.failures, 1);
    assert_eq!(router.health().get(ProviderId::Google).unwrap().successes, 1);
}

#[tokio::test]
async fn test_forced_mode_ignores_quality_floor() {
    let router = router(all_platform_keys())
        .with_client(ProviderId::OpenAi, Arc::new(ScriptedClient::always("openai", weak_text())));

    let ctx = RouteContext::new("outline").with_mode(ProviderMode::Forced(ProviderId::OpenAi));
    let result = router.generate(&request(ctx)).await.unwrap();
    assert_eq!(result.output, weak_text());
    assert!(result.quality_score < 0.65);
}

#[tokio::test]
async fn test_all_quality_failures_report_floor() {
    let router = router(all_platform_keys())
        .with_client(ProviderId::OpenAi, Arc::new(ScriptedClient::always("openai", weak_text())))
        .with_client(ProviderId::Google, Arc::new(ScriptedClient::always("google", weak_text())));

    let err = router.generate(&request(RouteContext::new("outline"))).await.unwrap_err();
    match err {
        AppError::QualityBelowFloor { provider, floor, .. } => {
            assert_eq!(provider, "openai");
            assert_eq!(floor, 0.65);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_call_failures_return_first_error() {
    let router = router(all_platform_keys())
        .with_client(ProviderId::OpenAi, Arc::new(ScriptedClient::failing("openai", "boom")))
        .with_client(ProviderId::Google, Arc::new(ScriptedClient::always("google", weak_text())));

    let err = router.generate(&request(RouteContext::new("outline"))).await.unwrap_err();
    match err {
        AppError::ProviderCallFailed { provider, message } => {
            assert_eq!(provider, "openai");
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_forced_call_failure_is_not_absorbed() {
    let google = Arc::new(ScriptedClient::always("google", strong_text()));
    let router = router(all_platform_keys())
        .with_client(ProviderId::OpenAi, Arc::new(ScriptedClient::failing("openai", "boom")))
        .with_client(ProviderId::Google, google.clone());

    let ctx = RouteContext::new("outline").with_mode(ProviderMode::Forced(ProviderId::OpenAi));
    assert!(router.generate(&request(ctx)).await.is_err());
    assert!(google.calls().is_empty());
}

#[tokio::test]
async fn test_cancelled_request_stops() {
    let slow = ScriptedClient::new(
        "openai",
        vec![ScriptedReply::Delayed(Duration::from_secs(30), strong_text())],
    );
    let router = router(all_platform_keys()).with_client(ProviderId::OpenAi, Arc::new(slow));

    let signal = CancelSignal::new();
    signal.cancel();
    let ctx = RouteContext::new("outline")
        .with_mode(ProviderMode::Forced(ProviderId::OpenAi))
        .with_cancel(signal);

    let err = router.generate(&request(ctx)).await.unwrap_err();
    assert!(matches!(err, AppError::Cancelled { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_maps_to_cancelled() {
    let slow = ScriptedClient::new(
        "google",
        vec![ScriptedReply::Delayed(Duration::from_secs(30), strong_text())],
    );
    let router = router(all_platform_keys()).with_client(ProviderId::Google, Arc::new(slow));

    let ctx = RouteContext::new("outline")
        .with_mode(ProviderMode::Forced(ProviderId::Google))
        .with_timeout(Duration::from_secs(1));

    let err = router.generate(&request(ctx)).await.unwrap_err();
    assert!(matches!(err, AppError::Cancelled { ref provider } if provider == "google"));
}

#[tokio::test(start_paused = true)]
async fn test_auto_timeout_falls_through_to_next_provider() {
    let slow = ScriptedClient::new(
        "openai",
        vec![ScriptedReply::Delayed(Duration::from_secs(30), strong_text())],
    );
    let router = router(all_platform_keys())
        .with_client(ProviderId::OpenAi, Arc::new(slow))
        .with_client(ProviderId::Google, Arc::new(ScriptedClient::always("google", strong_text())));

    let ctx = RouteContext::new("outline").with_timeout(Duration::from_secs(1));
    let result = router.generate(&request(ctx)).await.unwrap();
    assert_eq!(result.provider, ProviderId::Google);

    let openai = router.health().get(ProviderId::OpenAi).unwrap();
    assert_eq!(openai.failures, 1);
    assert_eq!(openai.successes, 0);
}

#[tokio::test]
async fn test_cancelled_auto_request_exhausts_candidates() {
    let router = router(all_platform_keys())
        .with_client(
            ProviderId::OpenAi,
            Arc::new(ScriptedClient::new(
                "openai",
                vec![ScriptedReply::Delayed(Duration::from_secs(30), strong_text())],
            )),
        )
        .with_client(
            ProviderId::Google,
            Arc::new(ScriptedClient::new(
                "google",
                vec![ScriptedReply::Delayed(Duration::from_secs(30), strong_text())],
            )),
        );

    let signal = CancelSignal::new();
    signal.cancel();
    let ctx = RouteContext::new("outline").with_cancel(signal);

    let err = router.generate(&request(ctx)).await.unwrap_err();
    assert!(matches!(err, AppError::Cancelled { ref provider } if provider == "openai"));
    assert_eq!(router.health().get(ProviderId::OpenAi).unwrap().failures, 1);
    assert_eq!(router.health().get(ProviderId::Google).unwrap().failures, 1);
}

#[test]
fn test_candidate_order_prefers_openai_then_cheap_and_healthy() {
    let router = router(all_platform_keys());
    let available = [
        ProviderId::Minimax,
        ProviderId::Google,
        ProviderId::NvidiaKimi,
        ProviderId::OpenAi,
    ];

    assert_eq!(
        router.candidate_order(&available),
        vec![
            ProviderId::OpenAi,
            ProviderId::Google,
            ProviderId::NvidiaKimi,
            ProviderId::Minimax
        ]
    );

    router.health().record(ProviderId::Google, false, 2000);
    assert_eq!(
        router.candidate_order(&available),
        vec![
            ProviderId::OpenAi,
            ProviderId::NvidiaKimi,
            ProviderId::Minimax,
            ProviderId::Google
        ]
    );
}

#[test]
fn test_candidate_order_without_openai() {
    let router = router(PlatformKeys::new());
    let order = router.candidate_order(&[ProviderId::Minimax, ProviderId::Google, ProviderId::Google]);
    assert_eq!(order, vec![ProviderId::Google, ProviderId::Minimax]);
}
