//! In-process storage backend used by tests and the `memory` database
//! backend. Uniqueness rules mirror the MongoDB indexes.

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use leadflow_db::models::{
    Activity, CallStatus, Customer, Lead, Leave, LeaveStatus, Notification, Target, Task, User,
};

use crate::dao::base::{DaoError, DaoResult, PaginatedResult, PaginationParams};
use crate::query::{ActivityQuery, LeadQuery, LeaveQuery, TaskQuery, UserQuery};
use crate::repo::{
    ActivityRepo, CustomerRepo, LeadRepo, LeaveRepo, NotificationRepo, TargetRepo, TaskRepo,
    UserRepo,
};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<ObjectId, User>,
    usernames: DashMap<String, ObjectId>,
    customers: DashMap<ObjectId, Customer>,
    phones: DashMap<String, ObjectId>,
    leads: DashMap<ObjectId, Lead>,
    tasks: DashMap<ObjectId, Task>,
    /// lead -> its single open task
    open_tasks: DashMap<ObjectId, ObjectId>,
    activities: DashMap<ObjectId, Activity>,
    targets: DashMap<(ObjectId, DateTime), Target>,
    leaves: DashMap<ObjectId, Leave>,
    notifications: DashMap<ObjectId, Notification>,
}

fn paginate<T>(items: Vec<T>, params: &PaginationParams) -> PaginatedResult<T> {
    let total = items.len() as u64;
    let page = items
        .into_iter()
        .skip(params.skip() as usize)
        .take(params.per_page() as usize)
        .collect();
    PaginatedResult::new(page, total, params)
}

fn duplicate(what: &str, key: impl std::fmt::Display) -> DaoError {
    DaoError::DuplicateKey(format!("{what} '{key}' already exists"))
}

impl MemoryStore {
    fn leads_matching(&self, query: &LeadQuery) -> Vec<Lead> {
        let mut leads: Vec<Lead> = self
            .leads
            .iter()
            .filter(|l| query.matches(l.value()))
            .map(|l| l.value().clone())
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        leads
    }

    fn tasks_matching(&self, query: &TaskQuery) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| query.matches(t.value()))
            .map(|t| t.value().clone())
            .collect();
        tasks.sort_by(|a, b| a.due.cmp(&b.due).then(a.id.cmp(&b.id)));
        tasks
    }

    fn activities_matching(&self, query: &ActivityQuery) -> Vec<Activity> {
        let mut activities: Vec<Activity> = self
            .activities
            .iter()
            .filter(|a| query.matches(a.value()))
            .map(|a| a.value().clone())
            .collect();
        activities.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        activities
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert(&self, mut user: User) -> DaoResult<User> {
        let id = ObjectId::new();
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => return Err(duplicate("username", &user.username)),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        user.id = Some(id);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> DaoResult<Option<User>> {
        let id = self.usernames.get(username).map(|id| *id.value());
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.value().clone())))
    }

    async fn find_many(&self, query: &UserQuery) -> DaoResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| query.matches(u.value()))
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn set_active(&self, id: ObjectId, active: bool) -> DaoResult<bool> {
        match self.users.get_mut(&id) {
            Some(mut user) => {
                let changed = user.is_active != active;
                user.is_active = active;
                user.updated_at = DateTime::now();
                Ok(changed)
            }
            None => Ok(false),
        }
    }

    async fn set_fcm_token(&self, id: ObjectId, token: Option<String>) -> DaoResult<bool> {
        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.fcm_token = token;
                user.updated_at = DateTime::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CustomerRepo for MemoryStore {
    async fn insert(&self, mut customer: Customer) -> DaoResult<Customer> {
        let id = ObjectId::new();
        match self.phones.entry(customer.phone.clone()) {
            Entry::Occupied(_) => return Err(duplicate("phone", &customer.phone)),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        customer.id = Some(id);
        self.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Customer>> {
        Ok(self.customers.get(&id).map(|c| c.value().clone()))
    }

    async fn find_by_phone(&self, phone: &str) -> DaoResult<Option<Customer>> {
        let id = self.phones.get(phone).map(|id| *id.value());
        Ok(id.and_then(|id| self.customers.get(&id).map(|c| c.value().clone())))
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<Customer>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.customers.get(id).map(|c| c.value().clone()))
            .collect())
    }

    async fn search(&self, text: &str) -> DaoResult<Vec<Customer>> {
        let needle = text.to_lowercase();
        Ok(self
            .customers
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle) || c.phone.to_lowercase().contains(&needle)
            })
            .map(|c| c.value().clone())
            .collect())
    }
}

#[async_trait]
impl LeadRepo for MemoryStore {
    async fn insert(&self, mut lead: Lead) -> DaoResult<Lead> {
        let id = ObjectId::new();
        lead.id = Some(id);
        self.leads.insert(id, lead.clone());
        Ok(lead)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Lead>> {
        Ok(self.leads.get(&id).map(|l| l.value().clone()))
    }

    async fn save(&self, lead: &Lead) -> DaoResult<()> {
        let id = lead.id.ok_or(DaoError::NotFound)?;
        match self.leads.get_mut(&id) {
            Some(mut stored) => {
                let has_task = stored.has_task;
                *stored = lead.clone();
                stored.has_task = has_task;
                Ok(())
            }
            None => Err(DaoError::NotFound),
        }
    }

    async fn mark_has_task(&self, id: ObjectId) -> DaoResult<()> {
        match self.leads.get_mut(&id) {
            Some(mut stored) => {
                stored.has_task = true;
                Ok(())
            }
            None => Err(DaoError::NotFound),
        }
    }

    async fn find_page(
        &self,
        query: &LeadQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Lead>> {
        Ok(paginate(self.leads_matching(query), params))
    }

    async fn count(&self, query: &LeadQuery) -> DaoResult<u64> {
        Ok(self.leads.iter().filter(|l| query.matches(l.value())).count() as u64)
    }

    async fn find_all(&self, query: &LeadQuery) -> DaoResult<Vec<Lead>> {
        Ok(self.leads_matching(query))
    }
}

#[async_trait]
impl TaskRepo for MemoryStore {
    async fn insert(&self, mut task: Task) -> DaoResult<Task> {
        let id = ObjectId::new();
        task.id = Some(id);
        if task.is_completed {
            self.tasks.insert(id, task.clone());
            return Ok(task);
        }
        match self.open_tasks.entry(task.lead) {
            Entry::Occupied(_) => Err(duplicate("open task for lead", task.lead)),
            Entry::Vacant(slot) => {
                self.tasks.insert(id, task.clone());
                slot.insert(id);
                Ok(task)
            }
        }
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Task>> {
        Ok(self.tasks.get(&id).map(|t| t.value().clone()))
    }

    async fn find_open_for_lead(&self, lead: ObjectId) -> DaoResult<Option<Task>> {
        let id = self.open_tasks.get(&lead).map(|id| *id.value());
        Ok(id.and_then(|id| self.tasks.get(&id).map(|t| t.value().clone())))
    }

    async fn complete(
        &self,
        id: ObjectId,
        by: Option<ObjectId>,
        call_status: Option<CallStatus>,
    ) -> DaoResult<Option<Task>> {
        let completed = match self.tasks.get_mut(&id) {
            Some(mut task) if !task.is_completed => {
                let now = DateTime::now();
                task.is_completed = true;
                task.completed_at = Some(now);
                task.completed_by = by;
                if call_status.is_some() {
                    task.call_status = call_status;
                }
                task.updated_at = now;
                Some(task.clone())
            }
            _ => None,
        };
        if let Some(task) = &completed {
            self.open_tasks.remove_if(&task.lead, |_, open| *open == id);
        }
        Ok(completed)
    }

    async fn complete_all_for_lead(&self, lead: ObjectId) -> DaoResult<u64> {
        let now = DateTime::now();
        let mut count = 0;
        for mut task in self.tasks.iter_mut() {
            if task.lead == lead && !task.is_completed {
                task.is_completed = true;
                task.completed_at = Some(now);
                task.updated_at = now;
                count += 1;
            }
        }
        self.open_tasks.remove(&lead);
        Ok(count)
    }

    async fn set_follow_up(&self, id: ObjectId, follow_up: ObjectId) -> DaoResult<()> {
        if let Some(mut task) = self.tasks.get_mut(&id) {
            task.follow_up = Some(follow_up);
            task.updated_at = DateTime::now();
        }
        Ok(())
    }

    async fn find_page(
        &self,
        query: &TaskQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Task>> {
        Ok(paginate(self.tasks_matching(query), params))
    }

    async fn find_all(&self, query: &TaskQuery) -> DaoResult<Vec<Task>> {
        Ok(self.tasks_matching(query))
    }
}

#[async_trait]
impl ActivityRepo for MemoryStore {
    async fn insert(&self, mut activity: Activity) -> DaoResult<Activity> {
        let id = ObjectId::new();
        activity.id = Some(id);
        self.activities.insert(id, activity.clone());
        Ok(activity)
    }

    async fn find_page(
        &self,
        query: &ActivityQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Activity>> {
        let mut activities = self.activities_matching(query);
        activities.reverse();
        Ok(paginate(activities, params))
    }

    async fn find_all(&self, query: &ActivityQuery) -> DaoResult<Vec<Activity>> {
        Ok(self.activities_matching(query))
    }
}

#[async_trait]
impl TargetRepo for MemoryStore {
    async fn increment_achieved(&self, assigned: ObjectId, month: DateTime) -> DaoResult<Target> {
        let now = DateTime::now();
        let mut entry = self.targets.entry((assigned, month)).or_insert_with(|| Target {
            id: Some(ObjectId::new()),
            assigned,
            month,
            total: 0,
            achieved: 0,
            created_at: now,
            updated_at: now,
        });
        entry.achieved += 1;
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn set_total(
        &self,
        assigned: ObjectId,
        month: DateTime,
        total: i64,
    ) -> DaoResult<Target> {
        let now = DateTime::now();
        let mut entry = self.targets.entry((assigned, month)).or_insert_with(|| Target {
            id: Some(ObjectId::new()),
            assigned,
            month,
            total: 0,
            achieved: 0,
            created_at: now,
            updated_at: now,
        });
        entry.total = total;
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn find(&self, assigned: ObjectId, month: DateTime) -> DaoResult<Option<Target>> {
        Ok(self.targets.get(&(assigned, month)).map(|t| t.value().clone()))
    }

    async fn find_for_users(&self, users: &[ObjectId], month: DateTime) -> DaoResult<Vec<Target>> {
        Ok(users
            .iter()
            .filter_map(|user| self.targets.get(&(*user, month)).map(|t| t.value().clone()))
            .collect())
    }
}

#[async_trait]
impl LeaveRepo for MemoryStore {
    async fn insert(&self, mut leave: Leave) -> DaoResult<Leave> {
        let id = ObjectId::new();
        leave.id = Some(id);
        self.leaves.insert(id, leave.clone());
        Ok(leave)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Leave>> {
        Ok(self.leaves.get(&id).map(|l| l.value().clone()))
    }

    async fn set_status(
        &self,
        id: ObjectId,
        status: LeaveStatus,
        reviewer: ObjectId,
    ) -> DaoResult<Option<Leave>> {
        Ok(self.leaves.get_mut(&id).map(|mut leave| {
            leave.status = status;
            leave.reviewed_by = Some(reviewer);
            leave.updated_at = DateTime::now();
            leave.clone()
        }))
    }

    async fn find_page(
        &self,
        query: &LeaveQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Leave>> {
        let mut leaves: Vec<Leave> = self
            .leaves
            .iter()
            .filter(|l| query.matches(l.value()))
            .map(|l| l.value().clone())
            .collect();
        leaves.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(paginate(leaves, params))
    }
}

#[async_trait]
impl NotificationRepo for MemoryStore {
    async fn insert(&self, mut notification: Notification) -> DaoResult<Notification> {
        let id = ObjectId::new();
        notification.id = Some(id);
        self.notifications.insert(id, notification.clone());
        Ok(notification)
    }

    async fn find_page(
        &self,
        assigned: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Notification>> {
        let mut notifications: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.assigned == assigned)
            .map(|n| n.value().clone())
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(notifications, params))
    }
}
