use crate::models::error::{GatewayError, Result};
use std::time::{Duration, Instant};

/// Run a blocking backend call on the blocking pool, bounded by `limit`.
///
/// A call that overruns is reported as `BackendTimeout`; the blocking task
/// itself is not cancelled and may still complete afterwards. Only use this
/// for calls with no side effects.
pub async fn call_with_timeout<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(GatewayError::BackendTask {
            operation,
            cause: join_error.to_string(),
        }),
        Err(_) => Err(GatewayError::BackendTimeout {
            operation,
            after: limit,
        }),
    }
}

/// Run a blocking backend call that enforces its own deadline and wait for
/// its outcome.
///
/// Used for writes: the caller reports exactly what the backend did, so the
/// call must give up (and undo its work) once the deadline passes.
pub async fn call_before_deadline<T, F>(operation: &'static str, call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|join_error| GatewayError::BackendTask {
            operation,
            cause: join_error.to_string(),
        })?
}

/// Time left before `deadline`, or `DeadlineExceeded` once it has passed.
pub fn time_left(operation: &'static str, deadline: Instant) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(GatewayError::DeadlineExceeded { operation });
    }
    Ok(left)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn test_returns_call_result() {
        let result = call_with_timeout("lookup", Duration::from_secs(1), || Ok(7)).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[rocket::async_test]
    async fn test_passes_call_error_through() {
        let result: Result<()> = call_with_timeout("lookup", Duration::from_secs(1), || {
            Err(GatewayError::InvalidConfig("broken".to_string()))
        })
        .await;
        assert!(matches!(result, Err(GatewayError::InvalidConfig(_))));
    }

    #[rocket::async_test]
    async fn test_times_out_slow_call() {
        let result = call_with_timeout("lookup", Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .await;
        assert!(matches!(
            result,
            Err(GatewayError::BackendTimeout { operation: "lookup", .. })
        ));
    }

    #[rocket::async_test]
    async fn test_reports_panicked_call() {
        let result: Result<()> = call_with_timeout("lookup", Duration::from_secs(1), || {
            panic!("backend client panicked")
        })
        .await;
        assert!(matches!(result, Err(GatewayError::BackendTask { .. })));
    }

    #[rocket::async_test]
    async fn test_call_before_deadline_waits_for_outcome() {
        let result = call_before_deadline("append", || {
            std::thread::sleep(Duration::from_millis(50));
            Ok("committed")
        })
        .await;
        assert_eq!(result.unwrap(), "committed");
    }

    #[rocket::async_test]
    async fn test_call_before_deadline_reports_panicked_call() {
        let result: Result<()> =
            call_before_deadline("append", || panic!("backend client panicked")).await;
        assert!(matches!(
            result,
            Err(GatewayError::BackendTask { operation: "append", .. })
        ));
    }

    #[test]
    fn test_time_left() {
        let left = time_left("append", Instant::now() + Duration::from_secs(10)).unwrap();
        assert!(left > Duration::from_secs(9));

        let passed = Instant::now() - Duration::from_millis(1);
        assert!(matches!(
            time_left("append", passed),
            Err(GatewayError::DeadlineExceeded { operation: "append" })
        ));
    }
}
