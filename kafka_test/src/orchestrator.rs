//! Consumption orchestrator E2E tests
//!
//! Collection, background consumption and subscription growth against a
//! live broker.

use kafka_sessions::kafka::{CollectOptions, ConsumerState};
use kafka_sessions::SessionError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::common::{TestResult, TEST_TIMEOUT};
use crate::fixtures::generate_payloads;
use crate::setup::TestContext;

/// Collect every message published to one topic
pub async fn test_collect_from_topic() -> TestResult {
    let ctx = TestContext::new()?;
    let topic = ctx.create_topic("collect-one").await?;
    let other = ctx.create_topic("collect-other").await?;

    let payloads = generate_payloads(3, "collect");
    for payload in &payloads {
        ctx.service.publish(Some(&topic), Some(payload)).await?;
    }
    ctx.service.publish(Some(&other), Some("elsewhere")).await?;

    let collected = ctx
        .service
        .collect_from_topic(
            &topic,
            CollectOptions::new()
                .limit(payloads.len())
                .deadline(TEST_TIMEOUT),
        )
        .await?;

    let mut collected: Vec<String> = collected
        .iter()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .collect();
    collected.sort();
    let mut expected = payloads.clone();
    expected.sort();
    assert_eq!(collected, expected);
    assert_eq!(ctx.service.consumer_state(), ConsumerState::Idle);

    ctx.cleanup().await?;
    Ok(())
}

/// A second read of a topic starts from the beginning again
///
/// Both collections run under the same group id, so committed offsets from
/// the first read must not move the start of the second.
pub async fn test_collect_same_topic_twice() -> TestResult {
    let ctx = TestContext::new()?;
    let topic = ctx.create_topic("collect-twice").await?;

    let payloads = generate_payloads(3, "twice");
    for payload in &payloads {
        ctx.service.publish(Some(&topic), Some(payload)).await?;
    }

    let options = CollectOptions::new()
        .limit(payloads.len())
        .deadline(TEST_TIMEOUT);
    let first = ctx
        .service
        .collect_from_topic(&topic, options.clone())
        .await?;
    let second = ctx.service.collect_from_topic(&topic, options).await?;

    assert_eq!(first.len(), payloads.len());
    let mut first: Vec<_> = first.iter().map(|p| p.to_vec()).collect();
    let mut second: Vec<_> = second.iter().map(|p| p.to_vec()).collect();
    first.sort();
    second.sort();
    assert_eq!(first, second, "second read should see every message again");

    ctx.cleanup().await?;
    Ok(())
}

/// Collect across topics tags each payload with its source
pub async fn test_collect_from_all_topics() -> TestResult {
    let ctx = TestContext::new()?;
    let topic = ctx.create_topic("collect-all").await?;
    ctx.service.publish(Some(&topic), Some("tagged")).await?;

    let tagged = ctx
        .service
        .collect_from_all_topics(CollectOptions::new().deadline(Duration::from_secs(15)))
        .await?;

    assert!(
        tagged
            .iter()
            .any(|t| t.topic == topic && t.payload.as_ref() == b"tagged"),
        "payload should be tagged with its topic"
    );
    assert!(tagged.iter().all(|t| !t.topic.starts_with("__")));

    ctx.cleanup().await?;
    Ok(())
}

/// Background consumption follows newly created topics and blocks collections
pub async fn test_background_follows_new_topics() -> TestResult {
    let ctx = TestContext::new()?;
    let first = ctx.create_topic("background-a").await?;

    let cancel = CancellationToken::new();
    let handle = ctx
        .service
        .start_if_available(cancel.clone())
        .await?
        .ok_or("broker should be reachable")?;
    assert_eq!(ctx.service.consumer_state(), ConsumerState::Running);

    let second = ctx.create_topic("background-b").await?;
    let subscriptions = ctx.service.orchestrator().subscriptions();
    assert!(subscriptions.contains(&first));
    assert!(subscriptions.contains(&second));

    match ctx
        .service
        .collect_from_topic(&first, CollectOptions::new().limit(1))
        .await
    {
        Err(SessionError::ConsumerBusy { .. }) => {}
        other => return Err(format!("expected ConsumerBusy, got {:?}", other).into()),
    }

    cancel.cancel();
    tokio::time::timeout(TEST_TIMEOUT, handle).await??;
    assert_eq!(ctx.service.consumer_state(), ConsumerState::Idle);

    ctx.cleanup().await?;
    Ok(())
}
