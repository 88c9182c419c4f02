pub mod error;
pub mod notification;
pub mod project_id;
pub mod roles;
pub mod subscription;
pub mod types;
pub mod usage;
