pub mod chat;
pub mod maintenance;
pub mod notification;
pub mod project;
pub mod stats;
pub mod subscription;
