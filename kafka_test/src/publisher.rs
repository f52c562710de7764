//! Publisher E2E tests
//!
//! Messages published through the session layer are read back with an
//! independent rdkafka consumer.

use crate::common::{create_verification_consumer, TestResult};
use crate::fixtures::{consume_payloads, generate_payloads};
use crate::setup::TestContext;

/// Published messages arrive intact
pub async fn test_publish_and_verify() -> TestResult {
    let ctx = TestContext::new()?;
    let topic = ctx.create_topic("publish-basic").await?;

    let payloads = generate_payloads(5, "publish");
    for payload in &payloads {
        let confirmation = ctx.service.publish(Some(&topic), Some(payload)).await?;
        assert_eq!(confirmation, "Message sent successfully");
    }

    let consumer = create_verification_consumer(&format!("verify-{}", ctx.test_id))?;
    let mut received = consume_payloads(&consumer, &topic, payloads.len()).await?;
    received.sort();

    let mut expected = payloads.clone();
    expected.sort();
    assert_eq!(received, expected);

    println!("    Published and verified {} messages", payloads.len());
    ctx.cleanup().await?;
    Ok(())
}

/// A request without a message publishes a null value
pub async fn test_publish_null_value() -> TestResult {
    let ctx = TestContext::new()?;
    let topic = ctx.create_topic("publish-null").await?;

    ctx.service.publish(Some(&topic), None).await?;

    let consumer = create_verification_consumer(&format!("verify-null-{}", ctx.test_id))?;
    let received = consume_payloads(&consumer, &topic, 1).await?;
    assert_eq!(received, vec![String::new()]);

    ctx.cleanup().await?;
    Ok(())
}
