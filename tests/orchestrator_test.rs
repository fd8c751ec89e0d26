//! Tests for provider selection, retry, fallback and caching in the orchestrator.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockAdapter;
use consilium::providers::{CircuitState, FallbackTable, RetryPolicy};
use consilium::{
    ConsiliumError, Orchestrator, OverallStatus, ProviderFailure, ProviderId, RequestOptions,
};
use tokio::time::Instant;

const A: ProviderId = ProviderId::OpenAi;
const B: ProviderId = ProviderId::Anthropic;

fn no_cache() -> RequestOptions {
    RequestOptions::new().use_cache(false)
}

// =========================================================================
// Selection
// =========================================================================

#[tokio::test]
async fn uses_first_registered_provider_by_default() {
    let cohere = MockAdapter::ok(ProviderId::Cohere, "from cohere");
    let openai = MockAdapter::ok(A, "from openai");
    let orchestrator = Orchestrator::builder()
        .adapter(cohere.clone())
        .adapter(openai.clone())
        .build()
        .unwrap();

    let response = orchestrator.generate_text("hello", &no_cache()).await.unwrap();
    assert_eq!(response.provider, ProviderId::Cohere);
    assert_eq!(response.content, "from cohere");
    assert!(!response.cached);
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn honours_preferred_provider() {
    let a = MockAdapter::ok(A, "a");
    let b = MockAdapter::ok(B, "b");
    let orchestrator = Orchestrator::builder()
        .adapter(a.clone())
        .adapter(b.clone())
        .build()
        .unwrap();

    let response = orchestrator
        .generate_text("hello", &no_cache().provider(B))
        .await
        .unwrap();
    assert_eq!(response.provider, B);
    assert_eq!(a.calls(), 0);
}

#[tokio::test]
async fn unregistered_preference_falls_back_to_registered_provider() {
    let a = MockAdapter::ok(A, "a");
    let orchestrator = Orchestrator::builder().adapter(a).build().unwrap();

    let response = orchestrator
        .generate_text("hello", &no_cache().provider(ProviderId::Mistral))
        .await
        .unwrap();
    assert_eq!(response.provider, A);
}

#[tokio::test]
async fn no_providers_means_no_provider_available() {
    let orchestrator = Orchestrator::builder().build().unwrap();
    let err = orchestrator
        .generate_text("hello", &RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsiliumError::NoProviderAvailable));
}

#[tokio::test]
async fn unhealthy_providers_are_skipped() {
    let a = MockAdapter::ok_with_failing_probe(A, "a");
    let b = MockAdapter::ok(B, "b");
    let orchestrator = Orchestrator::builder()
        .adapter(a.clone())
        .adapter(b)
        .build()
        .unwrap();
    orchestrator.initialize().await;

    let response = orchestrator
        .generate_text("hello", &no_cache().provider(A))
        .await
        .unwrap();
    assert_eq!(response.provider, B);
    assert_eq!(a.calls(), 0);
}

#[tokio::test]
async fn all_unhealthy_means_no_provider_available() {
    let a = MockAdapter::ok_with_failing_probe(A, "a");
    let orchestrator = Orchestrator::builder().adapter(a).build().unwrap();
    orchestrator.initialize().await;

    let err = orchestrator
        .generate_text("hello", &no_cache())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsiliumError::NoProviderAvailable));
}

#[tokio::test]
async fn invalid_prompt_never_reaches_a_provider() {
    let a = MockAdapter::ok(A, "a");
    let orchestrator = Orchestrator::builder().adapter(a.clone()).build().unwrap();

    let err = orchestrator
        .generate_text("  <!-- only a comment -->  ", &no_cache())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsiliumError::InvalidInput(_)));
    assert_eq!(a.calls(), 0);
}

// =========================================================================
// Retry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn exhausts_retry_count_and_returns_last_error() {
    let a = MockAdapter::failing(A);
    let orchestrator = Orchestrator::builder().adapter(a.clone()).build().unwrap();

    let err = orchestrator
        .generate_text("hello", &no_cache().retry_count(3))
        .await
        .unwrap_err();

    assert_eq!(a.calls(), 3);
    match err {
        ConsiliumError::Provider { provider, cause } => {
            assert_eq!(provider, A);
            assert_eq!(
                cause,
                ProviderFailure::Api {
                    status: 500,
                    message: "internal error".into()
                }
            );
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_retry_count_still_makes_one_attempt() {
    let a = MockAdapter::failing(A);
    let orchestrator = Orchestrator::builder().adapter(a.clone()).build().unwrap();

    let _ = orchestrator
        .generate_text("hello", &no_cache().retry_count(0))
        .await;
    assert_eq!(a.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn retries_same_provider_after_fixed_delay() {
    let a = MockAdapter::fail_then_ok(A, 2, "third time lucky");
    let orchestrator = Orchestrator::builder().adapter(a.clone()).build().unwrap();

    let start = Instant::now();
    let response = orchestrator
        .generate_text("hello", &no_cache())
        .await
        .unwrap();

    assert_eq!(response.content, "third time lucky");
    assert_eq!(a.calls(), 3);
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3),
        "two 1s retry delays, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn breaker_opening_mid_request_returns_circuit_open() {
    let a = MockAdapter::failing(A);
    let orchestrator = Orchestrator::builder().adapter(a.clone()).build().unwrap();

    let err = orchestrator
        .generate_text("hello", &no_cache().retry_count(7))
        .await
        .unwrap_err();

    assert_eq!(a.calls(), 5, "breaker stops calls after the threshold");
    assert!(matches!(err, ConsiliumError::CircuitOpen { provider } if provider == A));
}

// =========================================================================
// Fallback
// =========================================================================

#[tokio::test(start_paused = true)]
async fn failure_switches_to_fallback_after_backoff() {
    let a = MockAdapter::failing(A);
    let b = MockAdapter::ok(B, "from b");
    let orchestrator = Orchestrator::builder()
        .adapter(a.clone())
        .adapter(b.clone())
        .build()
        .unwrap();

    let start = Instant::now();
    let response = orchestrator
        .generate_text("hello", &no_cache().provider(A))
        .await
        .unwrap();

    assert_eq!(response.provider, B);
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2),
        "2^0 second backoff, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn requested_model_is_not_sent_to_fallback_provider() {
    let a = MockAdapter::failing(A);
    let b = MockAdapter::ok(B, "from b");
    let orchestrator = Orchestrator::builder()
        .adapter(a)
        .adapter(b)
        .retry_policy(RetryPolicy::immediate())
        .build()
        .unwrap();

    let response = orchestrator
        .generate_text("hello", &no_cache().provider(A).model("gpt-4o"))
        .await
        .unwrap();
    assert_eq!(response.provider, B);
    assert_ne!(response.model, "gpt-4o");
    assert_eq!(response.model, "mock-model");
}

#[tokio::test]
async fn requested_model_reaches_the_named_provider() {
    let a = MockAdapter::ok(A, "a");
    let orchestrator = Orchestrator::builder().adapter(a).build().unwrap();

    let response = orchestrator
        .generate_text("hello", &no_cache().provider(A).model("gpt-4o"))
        .await
        .unwrap();
    assert_eq!(response.model, "gpt-4o");
}

#[tokio::test(start_paused = true)]
async fn open_breaker_routes_preferred_traffic_to_other_provider() {
    let a = MockAdapter::failing(A);
    let b = MockAdapter::ok(B, "from b");
    let orchestrator = Orchestrator::builder()
        .adapter(a.clone())
        .adapter(b.clone())
        .build()
        .unwrap();

    // Five pinned failures open A's breaker.
    let pinned = no_cache().provider(A).no_fallback().retry_count(5);
    assert!(orchestrator.generate_text("hello", &pinned).await.is_err());
    assert_eq!(a.calls(), 5);
    assert_eq!(orchestrator.breakers().state(A), CircuitState::Open);

    let response = orchestrator
        .generate_text("hello", &no_cache().provider(A))
        .await
        .unwrap();
    assert_eq!(response.provider, B);
    assert_eq!(a.calls(), 5, "open breaker blocks further calls to A");
}

#[tokio::test(start_paused = true)]
async fn pinned_request_with_open_breaker_is_circuit_open() {
    let a = MockAdapter::ok(A, "a");
    let b = MockAdapter::ok(B, "b");
    let orchestrator = Orchestrator::builder()
        .adapter(a.clone())
        .adapter(b)
        .build()
        .unwrap();
    for _ in 0..5 {
        orchestrator.breakers().record_failure(A);
    }

    let err = orchestrator
        .generate_text("hello", &no_cache().provider(A).no_fallback())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsiliumError::CircuitOpen { provider } if provider == A));
    assert_eq!(a.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn half_open_trial_success_closes_breaker() {
    let a = MockAdapter::ok(A, "recovered");
    let orchestrator = Orchestrator::builder().adapter(a.clone()).build().unwrap();
    for _ in 0..5 {
        orchestrator.breakers().record_failure(A);
    }
    tokio::time::advance(Duration::from_secs(61)).await;

    let response = orchestrator
        .generate_text("hello", &no_cache())
        .await
        .unwrap();
    assert_eq!(response.content, "recovered");
    assert_eq!(orchestrator.breakers().state(A), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn outstanding_half_open_trial_turns_other_requests_away() {
    let a = MockAdapter::ok(A, "a");
    let b = MockAdapter::ok(B, "b");
    let orchestrator = Orchestrator::builder()
        .adapter(a.clone())
        .adapter(b.clone())
        .build()
        .unwrap();
    for _ in 0..5 {
        orchestrator.breakers().record_failure(A);
    }
    tokio::time::advance(Duration::from_secs(61)).await;
    // Another request holds the trial.
    assert!(orchestrator.breakers().can_execute(A));

    let err = orchestrator
        .generate_text("hello", &no_cache().provider(A).no_fallback())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsiliumError::CircuitOpen { provider } if provider == A));

    let response = orchestrator
        .generate_text("hello", &no_cache().provider(A))
        .await
        .unwrap();
    assert_eq!(response.provider, B);
    assert_eq!(a.calls(), 0);
    assert_eq!(orchestrator.breakers().state(A), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn custom_fallback_table_is_followed() {
    let a = MockAdapter::failing(A);
    let google = MockAdapter::ok(ProviderId::Google, "google");
    let cohere = MockAdapter::ok(ProviderId::Cohere, "cohere");
    let orchestrator = Orchestrator::builder()
        .adapter(a)
        .adapter(google.clone())
        .adapter(cohere.clone())
        .fallbacks(FallbackTable::empty().with(A, [ProviderId::Cohere]))
        .retry_policy(RetryPolicy::immediate())
        .build()
        .unwrap();

    let response = orchestrator
        .generate_text("hello", &no_cache().provider(A))
        .await
        .unwrap();
    assert_eq!(response.provider, ProviderId::Cohere);
    assert_eq!(google.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn no_fallback_keeps_retrying_the_same_provider() {
    let a = MockAdapter::failing(A);
    let b = MockAdapter::ok(B, "b");
    let orchestrator = Orchestrator::builder()
        .adapter(a.clone())
        .adapter(b.clone())
        .build()
        .unwrap();

    let err = orchestrator
        .generate_text("hello", &no_cache().provider(A).no_fallback())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsiliumError::Provider { provider, .. } if provider == A));
    assert_eq!(a.calls(), 3);
    assert_eq!(b.calls(), 0);
}

// =========================================================================
// Caching
// =========================================================================

#[tokio::test]
async fn identical_request_is_served_from_cache() {
    let a = MockAdapter::ok(A, "cached answer");
    let orchestrator = Orchestrator::builder().adapter(a.clone()).build().unwrap();
    let options = RequestOptions::default();

    let first = orchestrator.generate_text("hello", &options).await.unwrap();
    let second = orchestrator.generate_text("hello", &options).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.content, second.content);
    assert_eq!(first.request_id, second.request_id);
    assert_eq!(a.calls(), 1);
    assert_eq!(orchestrator.cache().len(), 1);
}

#[tokio::test]
async fn prompts_differing_only_in_stripped_markup_share_a_cache_entry() {
    let a = MockAdapter::ok(A, "answer");
    let orchestrator = Orchestrator::builder().adapter(a.clone()).build().unwrap();
    let options = RequestOptions::default();

    orchestrator.generate_text("summarise", &options).await.unwrap();
    let hit = orchestrator
        .generate_text("  summarise <!-- note -->", &options)
        .await
        .unwrap();
    assert!(hit.cached);
    assert_eq!(a.calls(), 1);
}

#[tokio::test]
async fn use_cache_false_bypasses_cache() {
    let a = MockAdapter::ok(A, "fresh");
    let orchestrator = Orchestrator::builder().adapter(a.clone()).build().unwrap();

    orchestrator.generate_text("hello", &no_cache()).await.unwrap();
    let second = orchestrator.generate_text("hello", &no_cache()).await.unwrap();
    assert!(!second.cached);
    assert_eq!(a.calls(), 2);
    assert!(orchestrator.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failures_are_never_cached() {
    let a = MockAdapter::fail_then_ok(A, 1, "eventually");
    let orchestrator = Orchestrator::builder()
        .adapter(a.clone())
        .build()
        .unwrap();
    let options = RequestOptions::default().retry_count(1);

    assert!(orchestrator.generate_text("hello", &options).await.is_err());
    assert!(orchestrator.cache().is_empty());

    let response = orchestrator.generate_text("hello", &options).await.unwrap();
    assert!(!response.cached);
    assert_eq!(a.calls(), 2);
}

#[tokio::test]
async fn shared_cache_is_visible_across_orchestrators() {
    let cache = Arc::new(consilium::ResponseCache::default());
    let first = Orchestrator::builder()
        .adapter(MockAdapter::ok(A, "one"))
        .cache(cache.clone())
        .build()
        .unwrap();
    let second_adapter = MockAdapter::ok(A, "two");
    let second = Orchestrator::builder()
        .adapter(second_adapter.clone())
        .cache(cache)
        .build()
        .unwrap();

    first.generate_text("hello", &RequestOptions::default()).await.unwrap();
    let hit = second
        .generate_text("hello", &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(hit.content, "one");
    assert_eq!(second_adapter.calls(), 0);
}

// =========================================================================
// Health report
// =========================================================================

#[tokio::test(start_paused = true)]
async fn health_report_tracks_counters_and_breakers() {
    let a = MockAdapter::failing(A);
    let b = MockAdapter::ok(B, "b");
    let orchestrator = Orchestrator::builder()
        .adapter(a)
        .adapter(b)
        .build()
        .unwrap();

    orchestrator
        .generate_text("hello", &RequestOptions::default().provider(A))
        .await
        .unwrap();

    let report = orchestrator.health_status();
    assert_eq!(report.overall_status, OverallStatus::Healthy);
    assert_eq!(report.total_requests, 2);
    assert_eq!(report.total_errors, 1);
    assert_eq!(report.cache_size, 1);

    let a_health = &report.providers[&A];
    assert_eq!(a_health.request_count, 1);
    assert_eq!(a_health.error_count, 1);
    assert_eq!(a_health.failure_count, 1);
    assert_eq!(a_health.circuit_state, CircuitState::Closed);
    assert!(a_health.healthy, "live failures do not flip health");
}

#[tokio::test]
async fn health_report_overall_status() {
    let empty = Orchestrator::builder().build().unwrap();
    assert_eq!(empty.health_status().overall_status, OverallStatus::Unhealthy);

    let degraded = Orchestrator::builder()
        .adapter(MockAdapter::ok_with_failing_probe(A, "a"))
        .adapter(MockAdapter::ok(B, "b"))
        .build()
        .unwrap();
    degraded.initialize().await;
    assert_eq!(degraded.health_status().overall_status, OverallStatus::Degraded);

    let down = Orchestrator::builder()
        .adapter(MockAdapter::ok_with_failing_probe(A, "a"))
        .build()
        .unwrap();
    down.initialize().await;
    assert_eq!(down.health_status().overall_status, OverallStatus::Unhealthy);
}

#[tokio::test]
async fn health_report_serializes_lowercase() {
    let orchestrator = Orchestrator::builder()
        .adapter(MockAdapter::ok(A, "a"))
        .build()
        .unwrap();
    let json = serde_json::to_value(orchestrator.health_status()).unwrap();
    assert_eq!(json["overall_status"], "healthy");
    assert_eq!(json["providers"]["openai"]["circuit_state"], "closed");
}
