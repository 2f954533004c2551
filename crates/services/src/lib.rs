pub mod activity;
pub mod attribution;
pub mod auth;
pub mod customer;
pub mod dao;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod lead;
pub mod leave;
pub mod memory;
pub mod notification;
pub mod query;
pub mod reporting;
pub mod repo;
pub mod target;
pub mod task;
pub mod time;
pub mod users;
pub mod views;
pub mod visibility;

#[cfg(test)]
pub(crate) mod fixtures;

pub use auth::AuthService;
pub use engine::Engine;
pub use error::{ServiceError, ServiceResult};
pub use hierarchy::{HierarchyResolver, RequesterContext};
pub use notification::{NoopPushSender, PushSender, RecordingPushSender};
pub use repo::Repositories;
