pub mod jobs;
pub mod media;
pub mod rekognition;
pub mod sqs;
