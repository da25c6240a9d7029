//! Amazon Rekognition adapter.

use async_trait::async_trait;
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::types::{Image, NotificationChannel, S3Object, Video};
use aws_sdk_rekognition::Client;
use mediatag_core::error::{CoreError, CoreResult};
use mediatag_core::media::{BoundingBox, DetectedFace};
use mediatag_core::ports::FaceRecognition;
use mediatag_core::vision::{
    CollectionCreated, CollectionStats, FaceSearchJob, IndexFacesRequest,
};

const SERVICE: &str = "Rekognition";

/// Keep the provider's full error chain; it is passed through to callers.
fn upstream<E: std::error::Error>(err: E) -> CoreError {
    CoreError::Upstream {
        service: SERVICE,
        message: DisplayErrorContext(err).to_string(),
    }
}

fn s3_object(bucket: &str, key: &str) -> S3Object {
    S3Object::builder().bucket(bucket).name(key).build()
}

/// [`FaceRecognition`] backed by Amazon Rekognition.
#[derive(Clone)]
pub struct RekognitionService {
    client: Client,
}

impl RekognitionService {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    /// Reuse an existing client (e.g. one configured for a test endpoint).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FaceRecognition for RekognitionService {
    async fn create_collection(&self, collection_id: &str) -> CoreResult<CollectionCreated> {
        let output = self
            .client
            .create_collection()
            .collection_id(collection_id)
            .send()
            .await
            .map_err(|err| {
                let already_exists = err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_already_exists_exception());
                if already_exists {
                    CoreError::Conflict(format!("Collection '{collection_id}' already exists"))
                } else {
                    upstream(err)
                }
            })?;

        tracing::info!(collection_id, "Face collection created");
        Ok(CollectionCreated {
            collection_arn: output.collection_arn().map(str::to_string),
            status_code: output.status_code(),
        })
    }

    async fn describe_collection(&self, collection_id: &str) -> CoreResult<CollectionStats> {
        let output = self
            .client
            .describe_collection()
            .collection_id(collection_id)
            .send()
            .await
            .map_err(|err| {
                let missing = err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception());
                if missing {
                    CoreError::NotFound {
                        entity: "Collection",
                        id: collection_id.to_string(),
                    }
                } else {
                    upstream(err)
                }
            })?;

        Ok(CollectionStats {
            face_count: output.face_count().unwrap_or(0),
        })
    }

    async fn delete_collection(&self, collection_id: &str) -> CoreResult<bool> {
        match self
            .client
            .delete_collection()
            .collection_id(collection_id)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!(collection_id, "Face collection deleted");
                Ok(true)
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                tracing::debug!(collection_id, "Face collection did not exist");
                Ok(false)
            }
            Err(err) => Err(upstream(err)),
        }
    }

    async fn start_face_search(&self, job: &FaceSearchJob) -> CoreResult<String> {
        let video = Video::builder()
            .s3_object(s3_object(&job.bucket_name, &job.video_name))
            .build();

        let channel = job
            .notification
            .as_ref()
            .map(|channel| {
                NotificationChannel::builder()
                    .sns_topic_arn(&channel.sns_topic_arn)
                    .role_arn(&channel.role_arn)
                    .build()
            })
            .transpose()
            .map_err(|e| CoreError::Internal(format!("Invalid notification channel: {e}")))?;

        let output = self
            .client
            .start_face_search()
            .video(video)
            .collection_id(&job.collection_id)
            .set_notification_channel(channel)
            .set_job_tag(job.job_tag.clone())
            .set_client_request_token(job.client_request_token.clone())
            .send()
            .await
            .map_err(upstream)?;

        output.job_id().map(str::to_string).ok_or_else(|| CoreError::Upstream {
            service: SERVICE,
            message: "StartFaceSearch returned no JobId".into(),
        })
    }

    async fn index_faces(&self, request: &IndexFacesRequest) -> CoreResult<Vec<DetectedFace>> {
        let image = Image::builder()
            .s3_object(s3_object(&request.bucket_name, &request.s3_key))
            .build();

        let output = self
            .client
            .index_faces()
            .collection_id(&request.collection_id)
            .image(image)
            .external_image_id(&request.external_image_id)
            .max_faces(request.max_faces)
            .send()
            .await
            .map_err(upstream)?;

        let faces = output
            .face_records()
            .iter()
            .filter_map(|record| record.face())
            .filter_map(|face| {
                let external_face_id = face.face_id()?.to_string();
                let bounding_box = face
                    .bounding_box()
                    .map(|b| BoundingBox {
                        left: b.left().unwrap_or_default(),
                        top: b.top().unwrap_or_default(),
                        width: b.width().unwrap_or_default(),
                        height: b.height().unwrap_or_default(),
                    })
                    .unwrap_or_default();
                Some(DetectedFace {
                    external_face_id,
                    confidence: face.confidence().unwrap_or_default(),
                    bounding_box,
                })
            })
            .collect();

        Ok(faces)
    }
}
