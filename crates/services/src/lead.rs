use std::sync::Arc;

use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{
    Activity, CallStatus, EnquireSource, EnquireStatus, Lead, LeadType, Privilege, Purpose, User,
};
use serde::Serialize;
use tracing::info;

use crate::activity::{ActivityEvent, ActivityLog};
use crate::customer::{CustomerBook, CustomerData};
use crate::dao::base::{PaginatedResult, PaginationParams};
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::{HierarchyResolver, RequesterContext};
use crate::notification::Notifier;
use crate::query::LeadQuery;
use crate::repo::LeadRepo;
use crate::target::TargetLedger;
use crate::task::{TaskLinkage, TaskSelector};
use crate::time::{ist_day_start, ist_month_start, ist_week_start, DateRange};
use crate::visibility::{ScopeFilter, ScopeView};

#[derive(Debug, Clone)]
pub struct CreateLeadInput {
    pub phone: String,
    pub customer: CustomerData,
    pub source: EnquireSource,
    pub enquire_status: Option<EnquireStatus>,
    pub purpose: Purpose,
    pub call_status: Option<CallStatus>,
    pub lead_type: LeadType,
    pub product: String,
    /// Owning branch. Required from admins and call-center agents without a
    /// manager; ignored for managers.
    pub manager: Option<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub enquire_status: Option<EnquireStatus>,
    pub source: Option<EnquireSource>,
    pub purpose: Option<Purpose>,
    pub call_status: Option<CallStatus>,
    /// Username of the new handler.
    pub transfer_to: Option<String>,
}

impl StatusUpdate {
    pub fn is_empty(&self) -> bool {
        self.enquire_status.is_none()
            && self.source.is_none()
            && self.purpose.is_none()
            && self.call_status.is_none()
            && self.transfer_to.is_none()
    }
}

/// Where a status change originates. A task-driven change carries the task
/// id into every activity it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    Direct,
    Task(ObjectId),
}

impl StatusSource {
    fn task(&self) -> Option<ObjectId> {
        match self {
            StatusSource::Direct => None,
            StatusSource::Task(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub scope: ScopeFilter,
    /// Free text over customer name and phone.
    pub search: Option<String>,
    pub statuses: Vec<EnquireStatus>,
    pub sources: Vec<EnquireSource>,
    pub purposes: Vec<Purpose>,
    pub types: Vec<LeadType>,
    pub created: DateRange,
    /// Only leads that never had a task.
    pub spotlight: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CreationCounts {
    pub today: u64,
    pub week: u64,
    pub month: u64,
}

#[derive(Debug, Clone)]
pub struct LeadPage {
    pub leads: PaginatedResult<Lead>,
    pub counts: CreationCounts,
}

/// Owns lead creation, field transitions and transfer.
#[derive(Clone)]
pub struct LeadStateMachine {
    leads: Arc<dyn LeadRepo>,
    customers: CustomerBook,
    hierarchy: HierarchyResolver,
    tasks: TaskLinkage,
    targets: TargetLedger,
    activity: ActivityLog,
    notifier: Notifier,
}

impl LeadStateMachine {
    pub fn new(
        leads: Arc<dyn LeadRepo>,
        customers: CustomerBook,
        hierarchy: HierarchyResolver,
        tasks: TaskLinkage,
        targets: TargetLedger,
        activity: ActivityLog,
        notifier: Notifier,
    ) -> Self {
        Self {
            leads,
            customers,
            hierarchy,
            tasks,
            targets,
            activity,
            notifier,
        }
    }

    pub async fn create(&self, ctx: &RequesterContext, input: CreateLeadInput) -> ServiceResult<Lead> {
        if input.product.trim().is_empty() {
            return Err(ServiceError::validation("product", "Product is required"));
        }
        let manager = self.owning_manager(ctx, input.manager).await?;
        let customer = self
            .customers
            .find_or_create(&input.phone, input.customer)
            .await?;
        let customer_id = customer
            .id
            .ok_or_else(|| ServiceError::Internal("customer without id".to_string()))?;

        // Admins never handle leads; the branch manager does.
        let handled_by = if ctx.is_admin() { manager } else { ctx.user_id };
        let now = DateTime::now();
        let lead = Lead {
            id: None,
            customer: customer_id,
            source: input.source,
            enquire_status: input.enquire_status.unwrap_or(EnquireStatus::New),
            purpose: input.purpose,
            call_status: input.call_status,
            lead_type: input.lead_type,
            product: input.product.trim().to_string(),
            created_by: ctx.user_id,
            handled_by,
            manager,
            has_task: false,
            created_at: now,
            updated_at: now,
        };
        let lead = self.leads.insert(lead).await?;
        let lead_id = lead
            .id
            .ok_or_else(|| ServiceError::Internal("lead without id".to_string()))?;
        self.activity
            .record(ctx.user_id, lead_id, None, ActivityEvent::LeadAdded, None)
            .await?;
        info!(lead = %lead_id, manager = %manager, "Lead created");
        Ok(lead)
    }

    pub async fn update_status(
        &self,
        ctx: &RequesterContext,
        lead_id: ObjectId,
        update: StatusUpdate,
    ) -> ServiceResult<Lead> {
        if update.is_empty() {
            return Err(ServiceError::validation(
                "enquire_status",
                "At least one of enquire_status, source, purpose, call_status or transfer_to is required",
            ));
        }
        let lead = self.get(ctx, lead_id).await?;
        self.apply_update(ctx, lead, update, StatusSource::Direct).await
    }

    pub async fn transfer(
        &self,
        ctx: &RequesterContext,
        lead_id: ObjectId,
        username: &str,
    ) -> ServiceResult<Lead> {
        let lead = self.get(ctx, lead_id).await?;
        let target = self.hierarchy.find_by_username(username).await?;
        if target.id == Some(lead.handled_by) {
            return Err(ServiceError::validation(
                "transfer_to",
                "Lead is already handled by this user",
            ));
        }
        let update = StatusUpdate {
            transfer_to: Some(username.to_string()),
            ..Default::default()
        };
        self.apply_update(ctx, lead, update, StatusSource::Direct).await
    }

    /// Applies `update` to `lead` in memory, persists it once, then emits one
    /// activity per changed field and runs the terminal-status side effects.
    /// Access to the lead must already be established.
    pub(crate) async fn apply_update(
        &self,
        ctx: &RequesterContext,
        mut lead: Lead,
        update: StatusUpdate,
        source: StatusSource,
    ) -> ServiceResult<Lead> {
        let lead_id = lead
            .id
            .ok_or_else(|| ServiceError::Internal("lead without id".to_string()))?;
        let mut events = Vec::new();

        let mut new_handler = None;
        if let Some(username) = update.transfer_to.as_deref() {
            let moved = self.transfer_in_place(ctx, &mut lead, username).await?;
            if let Some((event, target)) = moved {
                events.push(event);
                new_handler = Some(target);
            }
        }

        let mut status_change = None;
        if let Some(to) = update.enquire_status {
            if to != lead.enquire_status {
                events.push(ActivityEvent::StatusUpdated {
                    from: lead.enquire_status,
                    to,
                });
                status_change = Some(to);
                lead.enquire_status = to;
            }
        }
        if let Some(to) = update.source {
            if to != lead.source {
                events.push(ActivityEvent::SourceUpdated {
                    from: lead.source,
                    to,
                });
                lead.source = to;
            }
        }
        if let Some(to) = update.purpose {
            if to != lead.purpose {
                events.push(ActivityEvent::PurposeUpdated {
                    from: lead.purpose,
                    to,
                });
                lead.purpose = to;
            }
        }
        if let Some(to) = update.call_status {
            if Some(to) != lead.call_status {
                events.push(ActivityEvent::CallStatusUpdated {
                    from: lead.call_status,
                    to,
                });
                lead.call_status = Some(to);
            }
        }

        if events.is_empty() {
            return Ok(lead);
        }

        lead.updated_at = DateTime::now();
        self.leads.save(&lead).await?;

        for event in events {
            self.activity
                .record(ctx.user_id, lead_id, source.task(), event, None)
                .await?;
        }

        match status_change {
            Some(EnquireStatus::Won) => {
                self.targets.credit(ctx.user_id, &lead).await?;
                self.tasks.force_complete(TaskSelector::Lead(lead_id)).await?;
                info!(lead = %lead_id, "Lead won");
            }
            Some(EnquireStatus::Lost) => {
                self.tasks.force_complete(TaskSelector::Lead(lead_id)).await?;
                info!(lead = %lead_id, "Lead lost");
            }
            _ => {}
        }

        if let Some(target) = new_handler {
            self.notify_transfer(ctx, &lead, &target).await;
        }
        Ok(lead)
    }

    /// Moves `lead` to the user named `username`. Transfers to a manager also
    /// move the lead into that manager's branch. Naming the current handler
    /// leaves the lead untouched and yields `None`.
    async fn transfer_in_place(
        &self,
        ctx: &RequesterContext,
        lead: &mut Lead,
        username: &str,
    ) -> ServiceResult<Option<(ActivityEvent, User)>> {
        let target = self.hierarchy.find_by_username(username).await?;
        let target_id = target
            .id
            .ok_or_else(|| ServiceError::Internal("user without id".to_string()))?;
        if target.privilege == Privilege::Admin {
            return Err(ServiceError::forbidden("Leads cannot be transferred to admins"));
        }
        if !target.is_active {
            return Err(ServiceError::validation("transfer_to", "User is deactivated"));
        }
        if target_id == lead.handled_by {
            return Ok(None);
        }
        if !transfer_allowed(ctx, &target) {
            return Err(ServiceError::forbidden(
                "Not allowed to transfer leads to this user",
            ));
        }

        let previous = self.hierarchy.user(lead.handled_by).await?;
        lead.handled_by = target_id;
        if target.privilege == Privilege::Manager {
            lead.manager = target_id;
        }
        info!(lead = ?lead.id, from = %previous.username, to = %target.username, "Lead transferred");
        Ok(Some((
            ActivityEvent::Transferred {
                from: previous.display_name,
                to: target.display_name.clone(),
            },
            target,
        )))
    }

    async fn notify_transfer(&self, ctx: &RequesterContext, lead: &Lead, target: &User) {
        let (Some(lead_id), Some(target_id)) = (lead.id, target.id) else {
            return;
        };
        let by = match self.hierarchy.user(ctx.user_id).await {
            Ok(user) => user.display_name,
            Err(_) => "Someone".to_string(),
        };
        let customer = match self.customers.find_by_id(lead.customer).await {
            Ok(customer) => customer.name,
            Err(_) => "a customer".to_string(),
        };
        self.notifier
            .notify(
                target_id,
                lead_id,
                format!("{by} transferred a lead to you"),
                format!("{customer} is interested in {}", lead.product),
            )
            .await;
    }

    /// Admin must name a manager; a manager owns its own leads; staff inherit
    /// their manager, and call-center agents may pick any branch.
    async fn owning_manager(
        &self,
        ctx: &RequesterContext,
        requested: Option<ObjectId>,
    ) -> ServiceResult<ObjectId> {
        let manager = match ctx.privilege {
            Privilege::Admin => requested.ok_or_else(|| {
                ServiceError::forbidden("Admins must choose a manager for the lead")
            })?,
            Privilege::Manager => return Ok(ctx.user_id),
            Privilege::Staff if ctx.is_call_center() => requested
                .or(ctx.manager_id)
                .ok_or_else(|| ServiceError::validation("manager", "Manager is required"))?,
            Privilege::Staff => ctx
                .manager_id
                .ok_or_else(|| ServiceError::forbidden("Staff user has no manager"))?,
        };
        self.hierarchy.manager(manager).await?;
        Ok(manager)
    }

    /// Loads a lead the requester may act on.
    pub async fn get(&self, ctx: &RequesterContext, lead_id: ObjectId) -> ServiceResult<Lead> {
        let lead = self
            .leads
            .find_by_id(lead_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Lead"))?;
        let scope = self
            .hierarchy
            .resolve_scope(ctx, ScopeView::Work, &ScopeFilter::default())
            .await?;
        if !scope.permits(lead.handled_by, Some(lead.manager)) {
            return Err(ServiceError::forbidden("Not authorized to access this lead"));
        }
        Ok(lead)
    }

    pub async fn add_note(
        &self,
        ctx: &RequesterContext,
        lead_id: ObjectId,
        note: String,
    ) -> ServiceResult<Activity> {
        if note.trim().is_empty() {
            return Err(ServiceError::validation("note", "Note must not be empty"));
        }
        self.get(ctx, lead_id).await?;
        self.activity
            .record(ctx.user_id, lead_id, None, ActivityEvent::NoteAdded, Some(note))
            .await
    }

    /// Builds the typed query for `filter` within the requester's scope.
    pub async fn build_query(
        &self,
        ctx: &RequesterContext,
        filter: &LeadFilter,
    ) -> ServiceResult<LeadQuery> {
        let scope = self
            .hierarchy
            .resolve_scope(ctx, ScopeView::Leads, &filter.scope)
            .await?;
        let mut query = LeadQuery::new(scope);
        if let Some(text) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
            query.customers = Some(self.customers.search_ids(text).await?);
        }
        if filter.spotlight {
            query.without_tasks = true;
        }
        query.statuses = filter.statuses.clone();
        query.sources = filter.sources.clone();
        query.purposes = filter.purposes.clone();
        query.types = filter.types.clone();
        query.created = filter.created;
        Ok(query)
    }

    pub async fn list(
        &self,
        ctx: &RequesterContext,
        filter: &LeadFilter,
        params: &PaginationParams,
    ) -> ServiceResult<LeadPage> {
        let query = self.build_query(ctx, filter).await?;
        let leads = self.leads.find_page(&query, params).await?;

        let now = DateTime::now();
        let count_since = |start: DateTime| {
            let created = DateRange::new(
                Some(match query.created.start {
                    Some(s) if s > start => s,
                    _ => start,
                }),
                Some(match query.created.end {
                    Some(e) if e < now => e,
                    _ => now,
                }),
            );
            query.with_created(created)
        };
        let counts = CreationCounts {
            today: self.leads.count(&count_since(ist_day_start(now))).await?,
            week: self.leads.count(&count_since(ist_week_start(now))).await?,
            month: self.leads.count(&count_since(ist_month_start(now))).await?,
        };
        Ok(LeadPage { leads, counts })
    }

    pub async fn find_all(&self, query: &LeadQuery) -> ServiceResult<Vec<Lead>> {
        Ok(self.leads.find_all(query).await?)
    }
}

/// Transfer rights: admins may pick anyone but admins; managers any manager
/// or their own staff; call-center agents any manager or their own team;
/// other staff their own manager or teammates.
pub fn transfer_allowed(ctx: &RequesterContext, target: &User) -> bool {
    let Some(target_id) = target.id else {
        return false;
    };
    match (ctx.privilege, target.privilege) {
        (_, Privilege::Admin) => false,
        (Privilege::Admin, _) => true,
        (Privilege::Manager, Privilege::Manager) => true,
        (Privilege::Manager, Privilege::Staff) => target.manager == Some(ctx.user_id),
        (Privilege::Staff, Privilege::Manager) => {
            ctx.is_call_center() || ctx.manager_id == Some(target_id)
        }
        (Privilege::Staff, Privilege::Staff) => {
            ctx.manager_id.is_some() && target.manager == ctx.manager_id
        }
    }
}
