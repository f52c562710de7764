// Broker session layer
//
// Everything that talks to the Kafka broker lives here:
// - Connection factory (rdkafka clients behind the session traits)
// - Topic registry (list/create/delete with internal-topic filtering)
// - Publisher (one scoped producer session per message)
// - Consumption orchestrator (the one shared consumer group identity)
// - Availability prober
// - Service facade used by the HTTP front end and the bootstrap binary
//
// Session discipline:
// ===================
//
// Admin and producer sessions are scoped to a single operation: opened right
// before it, closed right after, on every exit path (`with_admin`,
// `with_producer`). The consumer session is long-lived and shared; at most one
// consumption activity holds it at a time, and a second one is rejected with
// `ConsumerBusy` rather than queued.

pub mod connection;
pub mod constants;
pub mod error;
pub mod orchestrator;
pub mod prober;
pub mod publisher;
pub mod service;
pub mod session;
pub mod subscription;
pub mod topics;

// Re-export commonly used types for convenience
pub use connection::RdKafkaConnector;
pub use error::{Result, SessionError};
pub use orchestrator::{
    CollectOptions, ConsumerState, ConsumptionOrchestrator, MessageStream, TaggedPayload,
};
pub use prober::AvailabilityProber;
pub use publisher::Publisher;
pub use service::BrokerService;
pub use session::{
    AdminSession, BrokerConnector, ConsumerSession, DeliveryReport, Message, ProducerSession,
    TopicSpec,
};
pub use subscription::SubscriptionSet;
pub use topics::{is_internal_topic, TopicRegistry};
