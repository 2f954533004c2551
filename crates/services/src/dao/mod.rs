pub mod activity;
pub mod base;
pub mod customer;
pub mod lead;
pub mod leave;
pub mod notification;
pub mod target;
pub mod task;
pub mod user;

pub use activity::ActivityDao;
pub use base::BaseDao;
pub use customer::CustomerDao;
pub use lead::LeadDao;
pub use leave::LeaveDao;
pub use notification::NotificationDao;
pub use target::TargetDao;
pub use task::TaskDao;
pub use user::UserDao;
