use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{
    Activity, CallStatus, Customer, Lead, Leave, LeaveStatus, Notification, Target, Task, User,
};
use mongodb::Database;

use crate::dao::base::{DaoResult, PaginatedResult, PaginationParams};
use crate::dao::{
    ActivityDao, CustomerDao, LeadDao, LeaveDao, NotificationDao, TargetDao, TaskDao, UserDao,
};
use crate::memory::MemoryStore;
use crate::query::{ActivityQuery, LeadQuery, LeaveQuery, TaskQuery, UserQuery};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert(&self, user: User) -> DaoResult<User>;
    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> DaoResult<Option<User>>;
    async fn find_many(&self, query: &UserQuery) -> DaoResult<Vec<User>>;
    async fn set_active(&self, id: ObjectId, active: bool) -> DaoResult<bool>;
    async fn set_fcm_token(&self, id: ObjectId, token: Option<String>) -> DaoResult<bool>;
}

#[async_trait]
pub trait CustomerRepo: Send + Sync {
    async fn insert(&self, customer: Customer) -> DaoResult<Customer>;
    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Customer>>;
    async fn find_by_phone(&self, phone: &str) -> DaoResult<Option<Customer>>;
    async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<Customer>>;
    /// Case-insensitive substring match on name or phone.
    async fn search(&self, text: &str) -> DaoResult<Vec<Customer>>;
}

#[async_trait]
pub trait LeadRepo: Send + Sync {
    async fn insert(&self, lead: Lead) -> DaoResult<Lead>;
    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Lead>>;
    /// Persists every field of `lead` in one write.
    async fn save(&self, lead: &Lead) -> DaoResult<()>;
    /// Flags the lead as having had a task. `save` never clears the flag.
    async fn mark_has_task(&self, id: ObjectId) -> DaoResult<()>;
    async fn find_page(
        &self,
        query: &LeadQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Lead>>;
    async fn count(&self, query: &LeadQuery) -> DaoResult<u64>;
    async fn find_all(&self, query: &LeadQuery) -> DaoResult<Vec<Lead>>;
}

#[async_trait]
pub trait TaskRepo: Send + Sync {
    /// Fails with `DuplicateKey` when the lead already has an open task.
    async fn insert(&self, task: Task) -> DaoResult<Task>;
    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Task>>;
    async fn find_open_for_lead(&self, lead: ObjectId) -> DaoResult<Option<Task>>;
    /// Completes the task if it is still open; `None` when it was not.
    async fn complete(
        &self,
        id: ObjectId,
        by: Option<ObjectId>,
        call_status: Option<CallStatus>,
    ) -> DaoResult<Option<Task>>;
    async fn complete_all_for_lead(&self, lead: ObjectId) -> DaoResult<u64>;
    async fn set_follow_up(&self, id: ObjectId, follow_up: ObjectId) -> DaoResult<()>;
    async fn find_page(
        &self,
        query: &TaskQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Task>>;
    async fn find_all(&self, query: &TaskQuery) -> DaoResult<Vec<Task>>;
}

#[async_trait]
pub trait ActivityRepo: Send + Sync {
    async fn insert(&self, activity: Activity) -> DaoResult<Activity>;
    async fn find_page(
        &self,
        query: &ActivityQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Activity>>;
    async fn find_all(&self, query: &ActivityQuery) -> DaoResult<Vec<Activity>>;
}

#[async_trait]
pub trait TargetRepo: Send + Sync {
    /// Atomically adds one to `achieved`, creating the row with `total = 0`
    /// when absent.
    async fn increment_achieved(&self, assigned: ObjectId, month: DateTime) -> DaoResult<Target>;
    /// Upserts `total`, keeping `achieved`.
    async fn set_total(&self, assigned: ObjectId, month: DateTime, total: i64)
    -> DaoResult<Target>;
    async fn find(&self, assigned: ObjectId, month: DateTime) -> DaoResult<Option<Target>>;
    async fn find_for_users(&self, users: &[ObjectId], month: DateTime) -> DaoResult<Vec<Target>>;
}

#[async_trait]
pub trait LeaveRepo: Send + Sync {
    async fn insert(&self, leave: Leave) -> DaoResult<Leave>;
    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Leave>>;
    async fn set_status(
        &self,
        id: ObjectId,
        status: LeaveStatus,
        reviewer: ObjectId,
    ) -> DaoResult<Option<Leave>>;
    async fn find_page(
        &self,
        query: &LeaveQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Leave>>;
}

#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn insert(&self, notification: Notification) -> DaoResult<Notification>;
    async fn find_page(
        &self,
        assigned: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Notification>>;
}

/// One handle per collection, shared by every engine component.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepo>,
    pub customers: Arc<dyn CustomerRepo>,
    pub leads: Arc<dyn LeadRepo>,
    pub tasks: Arc<dyn TaskRepo>,
    pub activities: Arc<dyn ActivityRepo>,
    pub targets: Arc<dyn TargetRepo>,
    pub leaves: Arc<dyn LeaveRepo>,
    pub notifications: Arc<dyn NotificationRepo>,
}

impl Repositories {
    pub fn mongo(db: &Database) -> Self {
        Self {
            users: Arc::new(UserDao::new(db)),
            customers: Arc::new(CustomerDao::new(db)),
            leads: Arc::new(LeadDao::new(db)),
            tasks: Arc::new(TaskDao::new(db)),
            activities: Arc::new(ActivityDao::new(db)),
            targets: Arc::new(TargetDao::new(db)),
            leaves: Arc::new(LeaveDao::new(db)),
            notifications: Arc::new(NotificationDao::new(db)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            users: store.clone(),
            customers: store.clone(),
            leads: store.clone(),
            tasks: store.clone(),
            activities: store.clone(),
            targets: store.clone(),
            leaves: store.clone(),
            notifications: store,
        }
    }
}
