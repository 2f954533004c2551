use std::sync::Arc;

use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{
    CallStatus, EnquireSource, EnquireStatus, Lead, Privilege, Purpose, Task, TaskCategory,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::activity::{ActivityEvent, ActivityLog};
use crate::dao::base::{DaoError, PaginatedResult, PaginationParams};
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::{HierarchyResolver, RequesterContext};
use crate::lead::{LeadStateMachine, StatusSource, StatusUpdate};
use crate::query::TaskQuery;
use crate::repo::{CustomerRepo, LeadRepo, TaskRepo};
use crate::time::{ist_day_start, DateRange, DAY_MILLIS};
use crate::visibility::{ScopeFilter, ScopeView};

#[derive(Debug, Clone)]
pub struct CreateTaskInput {
    pub lead: ObjectId,
    pub assigned: Option<ObjectId>,
    pub category: TaskCategory,
    pub due: DateTime,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompleteTaskInput {
    pub enquire_status: Option<EnquireStatus>,
    pub source: Option<EnquireSource>,
    pub purpose: Option<Purpose>,
    pub call_status: Option<CallStatus>,
    pub note: Option<String>,
    pub follow_up: Option<DateTime>,
}

impl CompleteTaskInput {
    fn status_update(&self) -> Option<StatusUpdate> {
        let update = StatusUpdate {
            enquire_status: self.enquire_status,
            source: self.source,
            purpose: self.purpose,
            call_status: self.call_status,
            transfer_to: None,
        };
        (!update.is_empty()).then_some(update)
    }
}

#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub task: Task,
    pub lead: Option<Lead>,
    pub follow_up: Option<Task>,
    /// Set when a requested follow-up was not scheduled.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum TaskSelector {
    Task(ObjectId),
    Lead(ObjectId),
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub scope: ScopeFilter,
    pub lead: Option<ObjectId>,
    pub assigned: Option<ObjectId>,
    pub category: Option<TaskCategory>,
    pub completed: Option<bool>,
    pub due: DateRange,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodayTaskStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub overdue: u64,
}

/// Owns task creation and completion, keeping at most one open task per
/// lead.
#[derive(Clone)]
pub struct TaskLinkage {
    tasks: Arc<dyn TaskRepo>,
    leads: Arc<dyn LeadRepo>,
    customers: Arc<dyn CustomerRepo>,
    hierarchy: HierarchyResolver,
    activity: ActivityLog,
}

impl TaskLinkage {
    pub fn new(
        tasks: Arc<dyn TaskRepo>,
        leads: Arc<dyn LeadRepo>,
        customers: Arc<dyn CustomerRepo>,
        hierarchy: HierarchyResolver,
        activity: ActivityLog,
    ) -> Self {
        Self {
            tasks,
            leads,
            customers,
            hierarchy,
            activity,
        }
    }

    pub async fn create_task(
        &self,
        ctx: &RequesterContext,
        input: CreateTaskInput,
    ) -> ServiceResult<Task> {
        let lead = self.visible_lead(ctx, input.lead).await?;
        let lead_id = input.lead;

        if self.tasks.find_open_for_lead(lead_id).await?.is_some() {
            return Err(open_task_conflict());
        }

        let assigned = self.resolve_assignee(ctx, input.assigned).await?;
        let (title, description) = self
            .default_texts(&lead, input.category, input.title, input.description)
            .await?;

        let now = DateTime::now();
        let task = Task {
            id: None,
            lead: lead_id,
            assigned,
            created_by: ctx.user_id,
            category: input.category,
            title,
            description,
            due: input.due,
            is_completed: false,
            completed_at: None,
            completed_by: None,
            call_status: None,
            follow_up: None,
            created_at: now,
            updated_at: now,
        };
        let task = self.insert_open(task).await?;
        self.activity
            .record(
                ctx.user_id,
                lead_id,
                task.id,
                ActivityEvent::TaskAdded {
                    category: task.category,
                    title: task.title.clone(),
                },
                None,
            )
            .await?;
        info!(lead = %lead_id, assigned = %assigned, "Task created");
        Ok(task)
    }

    pub async fn complete_task(
        &self,
        ctx: &RequesterContext,
        task_id: ObjectId,
        input: CompleteTaskInput,
        leads: &LeadStateMachine,
    ) -> ServiceResult<CompletionOutcome> {
        let task = self.visible_task(ctx, task_id).await?;
        if task.is_completed {
            return Err(ServiceError::conflict("Task is already completed"));
        }

        let task = self
            .tasks
            .complete(task_id, Some(ctx.user_id), input.call_status)
            .await?
            .ok_or_else(|| ServiceError::conflict("Task is already completed"))?;

        let mut lead = None;
        if let Some(update) = input.status_update() {
            let current = self.load_lead(task.lead).await?;
            lead = Some(
                leads
                    .apply_update(ctx, current, update, StatusSource::Task(task_id))
                    .await?,
            );
        }

        if let Some(note) = input.note.filter(|n| !n.trim().is_empty()) {
            self.activity
                .record(ctx.user_id, task.lead, Some(task_id), ActivityEvent::NoteAdded, Some(note))
                .await?;
        }
        self.activity
            .record(
                ctx.user_id,
                task.lead,
                Some(task_id),
                ActivityEvent::Completed {
                    title: task.title.clone(),
                },
                None,
            )
            .await?;
        info!(task = %task_id, lead = %task.lead, "Task completed");

        let (follow_up, warning) = match input.follow_up {
            Some(due) => self.schedule_follow_up(ctx, &task, due).await?,
            None => (None, None),
        };
        let task = match follow_up.as_ref().and_then(|f| f.id) {
            Some(follow_up_id) => Task {
                follow_up: Some(follow_up_id),
                ..task
            },
            None => task,
        };

        Ok(CompletionOutcome {
            task,
            lead,
            follow_up,
            warning,
        })
    }

    /// Completes one task, or every open task of a lead, without recording
    /// activity. Returns whether anything changed.
    pub async fn force_complete(&self, selector: TaskSelector) -> ServiceResult<bool> {
        match selector {
            TaskSelector::Task(id) => Ok(self.tasks.complete(id, None, None).await?.is_some()),
            TaskSelector::Lead(lead) => Ok(self.tasks.complete_all_for_lead(lead).await? > 0),
        }
    }

    pub async fn get(&self, ctx: &RequesterContext, task_id: ObjectId) -> ServiceResult<Task> {
        self.visible_task(ctx, task_id).await
    }

    pub async fn list(
        &self,
        ctx: &RequesterContext,
        filter: &TaskFilter,
        params: &PaginationParams,
    ) -> ServiceResult<PaginatedResult<Task>> {
        let scope = self
            .hierarchy
            .resolve_scope(ctx, ScopeView::Work, &filter.scope)
            .await?;
        let mut query = TaskQuery::new(scope);
        query.lead = filter.lead;
        query.assigned = filter.assigned;
        query.category = filter.category;
        query.completed = filter.completed;
        query.due = filter.due;
        Ok(self.tasks.find_page(&query, params).await?)
    }

    /// Tasks due on the current IST day, within the requester's scope.
    pub async fn today_stats(&self, ctx: &RequesterContext) -> ServiceResult<TodayTaskStats> {
        let now = DateTime::now();
        let start = ist_day_start(now);
        let end = DateTime::from_millis(start.timestamp_millis() + DAY_MILLIS - 1);
        let scope = self
            .hierarchy
            .resolve_scope(ctx, ScopeView::Work, &ScopeFilter::default())
            .await?;
        let mut query = TaskQuery::new(scope);
        query.due = DateRange::new(Some(start), Some(end));

        let tasks = self.tasks.find_all(&query).await?;
        let mut stats = TodayTaskStats {
            total: tasks.len() as u64,
            ..Default::default()
        };
        for task in &tasks {
            if task.is_completed {
                stats.completed += 1;
            } else {
                stats.pending += 1;
                if task.due < now {
                    stats.overdue += 1;
                }
            }
        }
        Ok(stats)
    }

    async fn schedule_follow_up(
        &self,
        ctx: &RequesterContext,
        completed: &Task,
        due: DateTime,
    ) -> ServiceResult<(Option<Task>, Option<String>)> {
        let lead = self.load_lead(completed.lead).await?;
        if lead.enquire_status.is_terminal() {
            warn!(lead = %completed.lead, status = %lead.enquire_status, "Follow-up skipped for closed lead");
            return Ok((
                None,
                Some(format!(
                    "Lead is {}; follow-up not scheduled",
                    lead.enquire_status
                )),
            ));
        }

        let (title, description) = self
            .default_texts(&lead, completed.category, None, None)
            .await?;
        let now = DateTime::now();
        let follow_up = Task {
            id: None,
            lead: completed.lead,
            assigned: completed.assigned,
            created_by: ctx.user_id,
            category: completed.category,
            title,
            description,
            due,
            is_completed: false,
            completed_at: None,
            completed_by: None,
            call_status: None,
            follow_up: None,
            created_at: now,
            updated_at: now,
        };

        let follow_up = match self.tasks.insert(follow_up).await {
            Ok(task) => task,
            Err(DaoError::DuplicateKey(_)) => {
                warn!(lead = %completed.lead, "Open task already exists, follow-up not scheduled");
                return Ok((
                    None,
                    Some("Lead already has an open task; follow-up not scheduled".to_string()),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if let (Some(completed_id), Some(follow_up_id)) = (completed.id, follow_up.id) {
            self.tasks.set_follow_up(completed_id, follow_up_id).await?;
        }
        self.activity
            .record(
                ctx.user_id,
                completed.lead,
                follow_up.id,
                ActivityEvent::FollowupAdded {
                    category: follow_up.category,
                    due,
                },
                None,
            )
            .await?;
        Ok((Some(follow_up), None))
    }

    async fn insert_open(&self, task: Task) -> ServiceResult<Task> {
        let task = match self.tasks.insert(task).await {
            Ok(task) => task,
            Err(DaoError::DuplicateKey(_)) => return Err(open_task_conflict()),
            Err(e) => return Err(e.into()),
        };
        self.leads.mark_has_task(task.lead).await?;
        Ok(task)
    }

    /// Staff always assign to themselves; managers default to themselves and
    /// may pick their own staff; admins must name a non-admin assignee.
    async fn resolve_assignee(
        &self,
        ctx: &RequesterContext,
        requested: Option<ObjectId>,
    ) -> ServiceResult<ObjectId> {
        let assigned = match ctx.privilege {
            Privilege::Staff => return Ok(ctx.user_id),
            Privilege::Manager => requested.unwrap_or(ctx.user_id),
            Privilege::Admin => requested
                .ok_or_else(|| ServiceError::validation("assigned", "Assignee is required"))?,
        };
        if assigned == ctx.user_id && ctx.is_manager() {
            return Ok(assigned);
        }

        let assignee = self.hierarchy.user(assigned).await?;
        if !assignee.is_active {
            return Err(ServiceError::validation("assigned", "Assignee is deactivated"));
        }
        if assignee.privilege == Privilege::Admin {
            return Err(ServiceError::forbidden("Tasks cannot be assigned to admins"));
        }
        if ctx.is_manager() && assignee.manager != Some(ctx.user_id) {
            return Err(ServiceError::forbidden(
                "Managers can only assign tasks to their own staff",
            ));
        }
        Ok(assigned)
    }

    async fn default_texts(
        &self,
        lead: &Lead,
        category: TaskCategory,
        title: Option<String>,
        description: Option<String>,
    ) -> ServiceResult<(String, String)> {
        let title = title.filter(|t| !t.trim().is_empty());
        let description = description.filter(|d| !d.trim().is_empty());
        if let (Some(title), Some(description)) = (&title, &description) {
            return Ok((title.clone(), description.clone()));
        }
        let customer = self
            .customers
            .find_by_id(lead.customer)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer"))?;
        let verb = match category {
            TaskCategory::Call => "Call",
            TaskCategory::Sales => "Sales visit with",
            TaskCategory::Meeting => "Meeting with",
        };
        let title = title.unwrap_or_else(|| format!("{verb} {}", customer.name));
        let description = description.unwrap_or_else(|| {
            format!(
                "{verb} {} ({}) regarding {}",
                customer.name, customer.phone, lead.product
            )
        });
        Ok((title, description))
    }

    async fn load_lead(&self, id: ObjectId) -> ServiceResult<Lead> {
        self.leads
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Lead"))
    }

    async fn visible_lead(&self, ctx: &RequesterContext, id: ObjectId) -> ServiceResult<Lead> {
        let lead = self.load_lead(id).await?;
        let scope = self
            .hierarchy
            .resolve_scope(ctx, ScopeView::Work, &ScopeFilter::default())
            .await?;
        if !scope.permits(lead.handled_by, Some(lead.manager)) {
            return Err(ServiceError::forbidden("Not authorized to access this lead"));
        }
        Ok(lead)
    }

    async fn visible_task(&self, ctx: &RequesterContext, id: ObjectId) -> ServiceResult<Task> {
        let task = self
            .tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task"))?;
        let scope = self
            .hierarchy
            .resolve_scope(ctx, ScopeView::Work, &ScopeFilter::default())
            .await?;
        if !scope.permits(task.assigned, None) {
            return Err(ServiceError::forbidden("Not authorized to access this task"));
        }
        Ok(task)
    }
}

fn open_task_conflict() -> ServiceError {
    ServiceError::conflict("Lead already has an open task")
}
