//! Retry behaviour under a paused tokio clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use nebula_sage::{
    Classify, ErrorClass, FeedbackCollaborator, FeedbackRequest, LlmError, LlmErrorKind,
    RetryPolicy, TurnController, fallback_message, with_retry,
};
use reqwest::StatusCode;
use tokio::time::Instant;

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(2000), Duration::from_millis(1000))
}

#[test]
fn test_status_classification() {
    let cases = [
        (StatusCode::TOO_MANY_REQUESTS, ErrorClass::RateLimited),
        (StatusCode::INTERNAL_SERVER_ERROR, ErrorClass::Transient),
        (StatusCode::BAD_GATEWAY, ErrorClass::Transient),
        (StatusCode::SERVICE_UNAVAILABLE, ErrorClass::Transient),
        (StatusCode::GATEWAY_TIMEOUT, ErrorClass::Transient),
        (StatusCode::BAD_REQUEST, ErrorClass::Fatal),
        (StatusCode::UNAUTHORIZED, ErrorClass::Fatal),
    ];
    for (status, class) in cases {
        let err = LlmError::from_status("test", status, "body");
        assert_eq!(err.classify(), class, "{status}");
        assert_eq!(err.status, Some(status.as_u16()));
    }
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_then_success() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: Result<&str, LlmError> = policy()
        .run(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(LlmError::from_status("test", StatusCode::TOO_MANY_REQUESTS, ""))
            } else {
                Ok("ok")
            }
        })
        .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 2000 ms after the first failure, 4000 ms after the second.
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(6000), "{waited:?}");
    assert!(waited < Duration::from_millis(6100), "{waited:?}");
}

#[tokio::test(start_paused = true)]
async fn test_fatal_is_not_retried() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: Result<(), LlmError> = policy()
        .run(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::from_status("test", StatusCode::BAD_REQUEST, "nope"))
        })
        .await;

    assert_eq!(result.unwrap_err().kind, LlmErrorKind::Rejected);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_returns_last_error() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: Result<(), String> = with_retry(
        3,
        || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(format!("failure {n}"))
        },
        |_| ErrorClass::Transient,
        |class, attempt| policy().delay_for(class, attempt),
    )
    .await;

    assert_eq!(result.unwrap_err(), "failure 2");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(1000 + 2000), "{waited:?}");
    assert!(waited < Duration::from_millis(3100), "{waited:?}");
}

/// Fails with a 503 a set number of times before answering.
struct FlakySage {
    failures: u32,
    calls: AtomicU32,
    policy: RetryPolicy,
}

#[async_trait::async_trait]
impl FeedbackCollaborator for FlakySage {
    async fn feedback(&self, _request: &FeedbackRequest) -> Result<String, LlmError> {
        self.policy
            .run(|| async {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n < self.failures {
                    Err(LlmError::from_status(
                        "test",
                        StatusCode::SERVICE_UNAVAILABLE,
                        "",
                    ))
                } else {
                    Ok("The veil parts.".to_string())
                }
            })
            .await
    }
}

#[tokio::test(start_paused = true)]
async fn test_turn_survives_transient_outage() {
    let sage = FlakySage {
        failures: 2,
        calls: AtomicU32::new(0),
        policy: policy(),
    };
    let mut game = TurnController::new(60, 10);
    let report = game.play_turn("20", &sage).await.unwrap();
    assert!(!*report.used_fallback());
    assert_eq!(report.message(), "The veil parts.");

    let down = FlakySage {
        failures: u32::MAX,
        calls: AtomicU32::new(0),
        policy: policy(),
    };
    let report = game.play_turn("90", &down).await.unwrap();
    assert!(*report.used_fallback());
    assert_eq!(down.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        report.message(),
        fallback_message(Some(nebula_sage::Direction::High))
    );
    assert_eq!(game.state().guesses().len(), 2);
}
