//! AWS adapters for the face-recognition and message-queue ports.
//!
//! [`RekognitionService`] implements `FaceRecognition`; [`SqsQueue`]
//! implements `MessageQueue` for one queue URL. Both are built from a shared
//! [`aws_config::SdkConfig`] loaded by [`config::load_sdk_config`].

pub mod config;
pub mod rekognition;
pub mod sqs;

pub use config::{AwsSettings, ConfigError};
pub use rekognition::RekognitionService;
pub use sqs::SqsQueue;

pub use aws_config::SdkConfig;
pub use aws_sdk_sqs::Client as SqsClient;
