//! Queue consumers and process wiring.
//!
//! [`wiring`] builds the live [`MediaPipeline`](mediatag_pipeline::MediaPipeline)
//! from the environment; [`consumer`] drains the job-completion and
//! image-detection queues into it. The API server reuses both when it runs
//! the consumers in-process.

pub mod consumer;
pub mod wiring;

pub use consumer::{ConsumerKind, QueueConsumer};
