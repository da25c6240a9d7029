//! Face collection management.

use mediatag_core::error::CoreResult;
use mediatag_core::validation::validate_collection_id;
use mediatag_core::vision::{CollectionCreated, CollectionStats};
use serde::Serialize;

use crate::MediaPipeline;

/// Result of dropping and re-creating a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReset {
    pub collection_arn: Option<String>,
    /// Whether a previous collection existed and was removed.
    pub deleted: bool,
}

impl MediaPipeline {
    pub async fn create_collection(&self, collection_id: &str) -> CoreResult<CollectionCreated> {
        validate_collection_id(collection_id)?;
        self.recognition.create_collection(collection_id).await
    }

    pub async fn collection_stats(&self, collection_id: &str) -> CoreResult<CollectionStats> {
        validate_collection_id(collection_id)?;
        self.recognition.describe_collection(collection_id).await
    }

    /// Delete the collection (a missing one is fine) and create it again
    /// empty.
    pub async fn reset_collection(&self, collection_id: &str) -> CoreResult<CollectionReset> {
        validate_collection_id(collection_id)?;
        let deleted = self.recognition.delete_collection(collection_id).await?;
        let created = self.recognition.create_collection(collection_id).await?;

        tracing::info!(collection_id, deleted, "Face collection reset");
        Ok(CollectionReset {
            collection_arn: created.collection_arn,
            deleted,
        })
    }
}
