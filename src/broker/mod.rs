//! The `broker` module is the routing core of the relay: topic repositories,
//! the status registry, the message model and the `Broker` engine that ties
//! them together.

pub mod engine;
pub mod message;
pub mod registry;
pub mod topic;

pub use engine::Broker;
pub use registry::TopicStatusRegistry;
