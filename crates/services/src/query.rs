//! Typed filters for the list operations. Each renders to a MongoDB filter
//! document and evaluates against a single record, so both storage backends
//! answer the same question.

use bson::{doc, oid::ObjectId, Bson, Document};
use leadflow_db::models::{
    Activity, ActivityKind, EnquireSource, EnquireStatus, Lead, LeadType, Leave, LeaveStatus,
    Privilege, Purpose, Task, TaskCategory, User,
};

use crate::time::DateRange;
use crate::visibility::Scope;

fn in_list<T: Copy + Into<Bson>>(values: &[T]) -> Document {
    let values: Vec<Bson> = values.iter().map(|v| (*v).into()).collect();
    doc! { "$in": values }
}

fn set_allows<T: PartialEq>(set: &[T], value: &T) -> bool {
    set.is_empty() || set.contains(value)
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub ids: Option<Vec<ObjectId>>,
    pub privilege: Option<Privilege>,
    pub manager: Option<ObjectId>,
    pub created_by: Option<ObjectId>,
    /// Only users without a manager.
    pub unmanaged: bool,
    pub active_only: bool,
}

impl UserQuery {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(ids) = &self.ids {
            filter.insert("_id", doc! { "$in": ids.clone() });
        }
        if let Some(privilege) = self.privilege {
            filter.insert("privilege", privilege);
        }
        if let Some(manager) = self.manager {
            filter.insert("manager", manager);
        }
        if let Some(created_by) = self.created_by {
            filter.insert("created_by", created_by);
        }
        if self.unmanaged {
            filter.insert("manager", Bson::Null);
        }
        if self.active_only {
            filter.insert("is_active", true);
        }
        filter
    }

    pub fn matches(&self, user: &User) -> bool {
        self.ids
            .as_ref()
            .is_none_or(|ids| user.id.is_some_and(|id| ids.contains(&id)))
            && self.privilege.is_none_or(|p| user.privilege == p)
            && self.manager.is_none_or(|m| user.manager == Some(m))
            && self.created_by.is_none_or(|c| user.created_by == Some(c))
            && (!self.unmanaged || user.manager.is_none())
            && (!self.active_only || user.is_active)
    }
}

#[derive(Debug, Clone)]
pub struct LeadQuery {
    pub scope: Scope,
    /// Restricts to leads of these customers (free-text search result).
    pub customers: Option<Vec<ObjectId>>,
    /// Only leads that never had a task (spotlight mode).
    pub without_tasks: bool,
    pub statuses: Vec<EnquireStatus>,
    pub sources: Vec<EnquireSource>,
    pub purposes: Vec<Purpose>,
    pub types: Vec<LeadType>,
    pub created_by: Option<ObjectId>,
    pub created: DateRange,
}

impl LeadQuery {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            customers: None,
            without_tasks: false,
            statuses: Vec::new(),
            sources: Vec::new(),
            purposes: Vec::new(),
            types: Vec::new(),
            created_by: None,
            created: DateRange::default(),
        }
    }

    /// Same filter with a different creation window.
    pub fn with_created(&self, created: DateRange) -> Self {
        let mut query = self.clone();
        query.created = created;
        query
    }

    pub fn to_document(&self) -> Document {
        let mut filter = self
            .scope
            .to_document("handled_by", Some("manager"))
            .unwrap_or_default();
        if let Some(customers) = &self.customers {
            filter.insert("customer", doc! { "$in": customers.clone() });
        }
        if self.without_tasks {
            filter.insert("has_task", doc! { "$ne": true });
        }
        if !self.statuses.is_empty() {
            filter.insert("enquire_status", in_list(&self.statuses));
        }
        if !self.sources.is_empty() {
            filter.insert("source", in_list(&self.sources));
        }
        if !self.purposes.is_empty() {
            filter.insert("purpose", in_list(&self.purposes));
        }
        if !self.types.is_empty() {
            filter.insert("type", in_list(&self.types));
        }
        if let Some(created_by) = self.created_by {
            filter.insert("created_by", created_by);
        }
        if let Some(range) = self.created.to_document() {
            filter.insert("created_at", range);
        }
        filter
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        self.scope.permits(lead.handled_by, Some(lead.manager))
            && self
                .customers
                .as_ref()
                .is_none_or(|c| c.contains(&lead.customer))
            && (!self.without_tasks || !lead.has_task)
            && set_allows(&self.statuses, &lead.enquire_status)
            && set_allows(&self.sources, &lead.source)
            && set_allows(&self.purposes, &lead.purpose)
            && set_allows(&self.types, &lead.lead_type)
            && self.created_by.is_none_or(|c| lead.created_by == c)
            && self.created.contains(lead.created_at)
    }
}

#[derive(Debug, Clone)]
pub struct TaskQuery {
    pub scope: Scope,
    pub lead: Option<ObjectId>,
    pub assigned: Option<ObjectId>,
    pub category: Option<TaskCategory>,
    pub completed: Option<bool>,
    pub due: DateRange,
}

impl TaskQuery {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            lead: None,
            assigned: None,
            category: None,
            completed: None,
            due: DateRange::default(),
        }
    }

    pub fn to_document(&self) -> Document {
        let mut filter = self.scope.to_document("assigned", None).unwrap_or_default();
        if let Some(lead) = self.lead {
            filter.insert("lead", lead);
        }
        if let Some(assigned) = self.assigned {
            // Combined with the scope's `$in` on the same field.
            let scoped = filter.remove("assigned");
            match scoped {
                Some(scoped) => {
                    filter.insert("$and", vec![doc! { "assigned": scoped }, doc! { "assigned": assigned }]);
                }
                None => {
                    filter.insert("assigned", assigned);
                }
            }
        }
        if let Some(category) = self.category {
            filter.insert("category", category);
        }
        if let Some(completed) = self.completed {
            filter.insert("is_completed", completed);
        }
        if let Some(range) = self.due.to_document() {
            filter.insert("due", range);
        }
        filter
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.scope.permits(task.assigned, None)
            && self.lead.is_none_or(|l| task.lead == l)
            && self.assigned.is_none_or(|a| task.assigned == a)
            && self.category.is_none_or(|c| task.category == c)
            && self.completed.is_none_or(|c| task.is_completed == c)
            && self.due.contains(task.due)
    }
}

#[derive(Debug, Clone)]
pub struct ActivityQuery {
    pub scope: Scope,
    pub lead: Option<ObjectId>,
    pub kinds: Vec<ActivityKind>,
    pub created: DateRange,
}

impl ActivityQuery {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            lead: None,
            kinds: Vec::new(),
            created: DateRange::default(),
        }
    }

    /// Full history of one lead.
    pub fn for_lead(lead: ObjectId) -> Self {
        let mut query = Self::new(Scope::All);
        query.lead = Some(lead);
        query
    }

    pub fn to_document(&self) -> Document {
        let mut filter = self.scope.to_document("activator", None).unwrap_or_default();
        if let Some(lead) = self.lead {
            filter.insert("lead", lead);
        }
        if !self.kinds.is_empty() {
            filter.insert("type", in_list(&self.kinds));
        }
        if let Some(range) = self.created.to_document() {
            filter.insert("created_at", range);
        }
        filter
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        self.scope.permits(activity.activator, None)
            && self.lead.is_none_or(|l| activity.lead == l)
            && set_allows(&self.kinds, &activity.kind)
            && self.created.contains(activity.created_at)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeaveQuery {
    pub requester: Option<ObjectId>,
    pub status: Option<LeaveStatus>,
    pub date: DateRange,
}

impl LeaveQuery {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(requester) = self.requester {
            filter.insert("requester", requester);
        }
        if let Some(status) = self.status {
            filter.insert("status", status);
        }
        if let Some(range) = self.date.to_document() {
            filter.insert("date", range);
        }
        filter
    }

    pub fn matches(&self, leave: &Leave) -> bool {
        self.requester.is_none_or(|r| leave.requester == r)
            && self.status.is_none_or(|s| leave.status == s)
            && self.date.contains(leave.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime;
    use leadflow_db::models::CallStatus;

    fn lead(handler: ObjectId, manager: ObjectId) -> Lead {
        let now = DateTime::now();
        Lead {
            id: Some(ObjectId::new()),
            customer: ObjectId::new(),
            source: EnquireSource::Walkin,
            enquire_status: EnquireStatus::New,
            purpose: Purpose::Purchase,
            call_status: Some(CallStatus::Connected),
            lead_type: LeadType::Fresh,
            product: "Scooter".to_string(),
            created_by: handler,
            handled_by: handler,
            manager,
            has_task: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn lead_query_renders_set_filters() {
        let mut query = LeadQuery::new(Scope::All);
        query.statuses = vec![EnquireStatus::Won, EnquireStatus::QuotationShared];
        query.sources = vec![EnquireSource::PreviousCustomer];
        let filter = query.to_document();

        let statuses = filter
            .get_document("enquire_status")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(
            statuses,
            &vec![Bson::String("won".into()), Bson::String("quotation shared".into())]
        );
        assert!(filter.get("handled_by").is_none());
    }

    #[test]
    fn lead_query_matches_in_memory() {
        let handler = ObjectId::new();
        let manager = ObjectId::new();
        let record = lead(handler, manager);

        let mut query = LeadQuery::new(Scope::handlers(vec![handler]));
        assert!(query.matches(&record));

        query.statuses = vec![EnquireStatus::Won];
        assert!(!query.matches(&record));

        let mut spotlight = LeadQuery::new(Scope::All);
        spotlight.without_tasks = true;
        assert!(spotlight.matches(&record));
        let mut worked = record.clone();
        worked.has_task = true;
        assert!(!spotlight.matches(&worked));
        assert_eq!(
            spotlight.to_document().get_document("has_task").unwrap(),
            &doc! { "$ne": true }
        );
    }

    #[test]
    fn task_query_assigned_respects_scope() {
        let mine = ObjectId::new();
        let mut query = TaskQuery::new(Scope::handlers(vec![mine]));
        query.assigned = Some(mine);
        let filter = query.to_document();
        assert!(filter.get_array("$and").is_ok());
        assert!(filter.get("assigned").is_none());
    }

    #[test]
    fn activity_lead_query_ignores_scope() {
        let lead = ObjectId::new();
        let query = ActivityQuery::for_lead(lead);
        let filter = query.to_document();
        assert_eq!(filter, doc! { "lead": lead });
    }
}
