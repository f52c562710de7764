//! Topic registry E2E tests
//!
//! Create, list and delete against a live broker through the service facade.

use kafka_sessions::SessionError;

use crate::assertions::{assert_no_internal_topics, assert_topic_absent, assert_topic_listed};
use crate::common::{TestResult, TEST_TIMEOUT};
use crate::fixtures::wait_until;
use crate::setup::TestContext;

/// Created topics show up in the listing
pub async fn test_create_then_list() -> TestResult {
    let ctx = TestContext::new()?;
    let topic = ctx.create_topic("registry-create").await?;

    let topics = ctx.service.list_topics().await?;
    assert_topic_listed(&topics, &topic)?;
    assert_no_internal_topics(&topics)?;

    println!("    Created and listed '{}'", topic);
    ctx.cleanup().await?;
    Ok(())
}

/// Creating the same topic twice is a conflict
pub async fn test_create_duplicate() -> TestResult {
    let ctx = TestContext::new()?;
    let topic = ctx.create_topic("registry-dup").await?;

    match ctx.service.create_topic(Some(&topic)).await {
        Err(SessionError::TopicExists(name)) => assert_eq!(name, topic),
        other => return Err(format!("expected TopicExists, got {:?}", other).into()),
    }

    ctx.cleanup().await?;
    Ok(())
}

/// Deleting a topic removes it; deleting it again reports false
pub async fn test_delete_topic() -> TestResult {
    let ctx = TestContext::new()?;
    let topic = ctx.create_topic("registry-delete").await?;

    assert!(ctx.service.delete_topic(&topic).await, "delete should succeed");

    let service = &ctx.service;
    let name = topic.as_str();
    let gone = wait_until(TEST_TIMEOUT, || async move {
        service
            .list_topics()
            .await
            .map(|topics| assert_topic_absent(&topics, name).is_ok())
            .unwrap_or(false)
    })
    .await;
    assert!(gone, "topic should disappear from the listing");

    assert!(
        !ctx.service.delete_topic(&topic).await,
        "second delete should report false"
    );

    ctx.cleanup().await?;
    Ok(())
}

/// Missing topic names never reach the broker
pub async fn test_create_requires_name() -> TestResult {
    let ctx = TestContext::new()?;

    let err = ctx
        .service
        .create_topic(None)
        .await
        .err()
        .ok_or("create without a name should fail")?;
    assert_eq!(err.http_status(), 400);

    Ok(())
}
