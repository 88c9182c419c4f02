//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod chat_message_repo;
pub mod notification_repo;
pub mod project_repo;

pub use chat_message_repo::ChatMessageRepo;
pub use notification_repo::NotificationRepo;
pub use project_repo::ProjectRepo;
