//! Users and events. The orchestration layer only references them
//! by id; these models exist for seeding and foreign-key setup.

use mediatag_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub id: Option<String>,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub rekognition_collection_id: Option<String>,
    pub is_archived: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvent {
    pub id: Option<String>,
    pub user_id: String,
    pub name: String,
    pub rekognition_collection_id: Option<String>,
}
