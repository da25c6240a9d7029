use mediatag_core::vision::NotificationChannel;

/// Errors raised while reading AWS settings from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{set} is set but {missing} is not; both are required for job notifications")]
    Incomplete {
        set: &'static str,
        missing: &'static str,
    },
}

/// AWS resource identifiers loaded from environment variables.
///
/// | Env Var                     | Default                        |
/// |-----------------------------|--------------------------------|
/// | `AWS_REGION`                | provider chain                 |
/// | `AWS_ENDPOINT_URL`          | none (real AWS endpoints)      |
/// | `DETECTION_QUEUE_URL`       | required                       |
/// | `COMPLETION_QUEUE_URL`      | required                       |
/// | `REKOGNITION_SNS_TOPIC_ARN` | none (no completion notices)   |
/// | `REKOGNITION_ROLE_ARN`      | none, required with topic ARN  |
#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub region: Option<String>,
    /// Override for local stacks (e.g. LocalStack).
    pub endpoint_url: Option<String>,
    pub detection_queue_url: String,
    pub completion_queue_url: String,
    pub notification_channel: Option<NotificationChannel>,
}

impl AwsSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let detection_queue_url =
            get("DETECTION_QUEUE_URL").ok_or(ConfigError::Missing("DETECTION_QUEUE_URL"))?;
        let completion_queue_url =
            get("COMPLETION_QUEUE_URL").ok_or(ConfigError::Missing("COMPLETION_QUEUE_URL"))?;

        let notification_channel = match (
            get("REKOGNITION_SNS_TOPIC_ARN"),
            get("REKOGNITION_ROLE_ARN"),
        ) {
            (Some(sns_topic_arn), Some(role_arn)) => Some(NotificationChannel {
                sns_topic_arn,
                role_arn,
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    set: "REKOGNITION_SNS_TOPIC_ARN",
                    missing: "REKOGNITION_ROLE_ARN",
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    set: "REKOGNITION_ROLE_ARN",
                    missing: "REKOGNITION_SNS_TOPIC_ARN",
                })
            }
            (None, None) => None,
        };

        Ok(Self {
            region: get("AWS_REGION"),
            endpoint_url: get("AWS_ENDPOINT_URL"),
            detection_queue_url,
            completion_queue_url,
            notification_channel,
        })
    }
}

/// Load the shared SDK configuration (credentials and region come from the
/// standard provider chain unless overridden).
pub async fn load_sdk_config(settings: &AwsSettings) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = &settings.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    if let Some(endpoint) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}
