//! Test helper functions

use std::time::Duration;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const WAIT_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `condition` until it holds, panicking after a few seconds
///
/// Works under paused tokio time as well: each sleep auto-advances the clock.
pub async fn wait_for<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let polls = WAIT_TIMEOUT.as_millis() / WAIT_INTERVAL.as_millis();
    for _ in 0..polls {
        if condition() {
            return;
        }
        tokio::time::sleep(WAIT_INTERVAL).await;
    }
    panic!("timed out waiting for {}", what);
}

/// Topic name that cannot collide with other tests
pub fn unique_topic(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_topic_has_prefix() {
        let a = unique_topic("orders");
        let b = unique_topic("orders");
        assert!(a.starts_with("orders-"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_wait_for_returns_once_condition_holds() {
        let mut calls = 0;
        wait_for("third call", || {
            calls += 1;
            calls >= 3
        })
        .await;
        assert_eq!(calls, 3);
    }
}
