//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod delivery_repo;
pub mod event_repo;
pub mod face_repo;
pub mod media_repo;
pub mod user_repo;

pub use delivery_repo::DeliveryRepo;
pub use event_repo::EventRepo;
pub use face_repo::FaceRepo;
pub use media_repo::MediaRepo;
pub use user_repo::UserRepo;
