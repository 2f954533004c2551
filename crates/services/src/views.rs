//! Read-side joins: leads, tasks and activities rendered with the customer
//! and user names a client displays, ids as hex and times as epoch millis.

use std::collections::HashMap;
use std::sync::Arc;

use bson::oid::ObjectId;
use leadflow_db::models::{Activity, Customer, Lead, Task, User};
use serde::Serialize;

use crate::error::ServiceResult;
use crate::hierarchy::HierarchyResolver;
use crate::reporting::UserRef;
use crate::repo::{CustomerRepo, LeadRepo};

#[derive(Debug, Clone, Serialize)]
pub struct CustomerView {
    pub id: String,
    pub phone: String,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub dob: Option<i64>,
}

impl CustomerView {
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            id: hex(customer.id),
            phone: customer.phone.clone(),
            name: customer.name.clone(),
            email: customer.email.clone(),
            address: customer.address.clone(),
            dob: customer.dob.map(|d| d.timestamp_millis()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadView {
    pub id: String,
    pub customer: Option<CustomerView>,
    pub source: String,
    pub enquire_status: String,
    pub purpose: String,
    pub call_status: Option<String>,
    #[serde(rename = "type")]
    pub lead_type: String,
    pub product: String,
    pub created_by: Option<UserRef>,
    pub handled_by: Option<UserRef>,
    pub manager: Option<UserRef>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadSummary {
    pub id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub enquire_status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: String,
    pub lead: LeadSummary,
    pub assigned: Option<UserRef>,
    pub created_by: Option<UserRef>,
    pub category: String,
    pub title: String,
    pub description: String,
    pub due: i64,
    pub is_completed: bool,
    pub completed_at: Option<i64>,
    pub completed_by: Option<UserRef>,
    pub call_status: Option<String>,
    pub follow_up: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityChangeView {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub id: String,
    pub activator: Option<UserRef>,
    pub lead: String,
    pub task: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub action: String,
    pub optional_message: Option<String>,
    pub change: Option<ActivityChangeView>,
    pub created_at: i64,
}

fn hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

fn user_ref(users: &HashMap<ObjectId, User>, id: ObjectId) -> Option<UserRef> {
    users.get(&id).map(UserRef::from_user)
}

/// Batch-loads the users and customers referenced by a page of records.
#[derive(Clone)]
pub struct ViewBuilder {
    hierarchy: HierarchyResolver,
    customers: Arc<dyn CustomerRepo>,
    leads: Arc<dyn LeadRepo>,
}

impl ViewBuilder {
    pub fn new(
        hierarchy: HierarchyResolver,
        customers: Arc<dyn CustomerRepo>,
        leads: Arc<dyn LeadRepo>,
    ) -> Self {
        Self {
            hierarchy,
            customers,
            leads,
        }
    }

    async fn customers_by_id(&self, ids: Vec<ObjectId>) -> ServiceResult<HashMap<ObjectId, Customer>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .customers
            .find_by_ids(&dedup(ids))
            .await?
            .into_iter()
            .filter_map(|c| c.id.map(|id| (id, c)))
            .collect())
    }

    pub async fn leads(&self, leads: &[Lead]) -> ServiceResult<Vec<LeadView>> {
        let customers = self
            .customers_by_id(leads.iter().map(|l| l.customer).collect())
            .await?;
        let user_ids = leads
            .iter()
            .flat_map(|l| [l.created_by, l.handled_by, l.manager])
            .collect();
        let users = self.hierarchy.users_by_id(&dedup(user_ids)).await?;

        Ok(leads
            .iter()
            .map(|lead| LeadView {
                id: hex(lead.id),
                customer: customers.get(&lead.customer).map(CustomerView::from_customer),
                source: lead.source.to_string(),
                enquire_status: lead.enquire_status.to_string(),
                purpose: lead.purpose.to_string(),
                call_status: lead.call_status.map(|s| s.to_string()),
                lead_type: lead.lead_type.to_string(),
                product: lead.product.clone(),
                created_by: user_ref(&users, lead.created_by),
                handled_by: user_ref(&users, lead.handled_by),
                manager: user_ref(&users, lead.manager),
                created_at: lead.created_at.timestamp_millis(),
                updated_at: lead.updated_at.timestamp_millis(),
            })
            .collect())
    }

    pub async fn lead(&self, lead: &Lead) -> ServiceResult<LeadView> {
        let mut views = self.leads(std::slice::from_ref(lead)).await?;
        Ok(views.remove(0))
    }

    pub async fn tasks(&self, tasks: &[Task]) -> ServiceResult<Vec<TaskView>> {
        let lead_ids = dedup(tasks.iter().map(|t| t.lead).collect());
        let mut leads = HashMap::new();
        for id in lead_ids {
            if let Some(lead) = self.leads.find_by_id(id).await? {
                leads.insert(id, lead);
            }
        }
        let customers = self
            .customers_by_id(leads.values().map(|l| l.customer).collect())
            .await?;
        let user_ids = tasks
            .iter()
            .flat_map(|t| [Some(t.assigned), Some(t.created_by), t.completed_by])
            .flatten()
            .collect();
        let users = self.hierarchy.users_by_id(&dedup(user_ids)).await?;

        Ok(tasks
            .iter()
            .map(|task| {
                let lead = leads.get(&task.lead);
                let customer = lead.and_then(|l| customers.get(&l.customer));
                TaskView {
                    id: hex(task.id),
                    lead: LeadSummary {
                        id: task.lead.to_hex(),
                        customer_name: customer.map(|c| c.name.clone()),
                        customer_phone: customer.map(|c| c.phone.clone()),
                        enquire_status: lead.map(|l| l.enquire_status.to_string()),
                    },
                    assigned: user_ref(&users, task.assigned),
                    created_by: user_ref(&users, task.created_by),
                    category: task.category.to_string(),
                    title: task.title.clone(),
                    description: task.description.clone(),
                    due: task.due.timestamp_millis(),
                    is_completed: task.is_completed,
                    completed_at: task.completed_at.map(|d| d.timestamp_millis()),
                    completed_by: task.completed_by.and_then(|id| user_ref(&users, id)),
                    call_status: task.call_status.map(|s| s.to_string()),
                    follow_up: task.follow_up.map(|id| id.to_hex()),
                    created_at: task.created_at.timestamp_millis(),
                }
            })
            .collect())
    }

    pub async fn activities(&self, activities: &[Activity]) -> ServiceResult<Vec<ActivityView>> {
        let user_ids = dedup(activities.iter().map(|a| a.activator).collect());
        let users = self.hierarchy.users_by_id(&user_ids).await?;
        Ok(activities
            .iter()
            .map(|a| ActivityView {
                id: hex(a.id),
                activator: user_ref(&users, a.activator),
                lead: a.lead.to_hex(),
                task: a.task.map(|id| id.to_hex()),
                kind: a.kind.to_string(),
                action: a.action.clone(),
                optional_message: a.optional_message.clone(),
                change: a.change.as_ref().map(|c| ActivityChangeView {
                    field: c.field.clone(),
                    from: c.from.clone(),
                    to: c.to.clone(),
                }),
                created_at: a.created_at.timestamp_millis(),
            })
            .collect())
    }
}

fn dedup(mut ids: Vec<ObjectId>) -> Vec<ObjectId> {
    ids.sort();
    ids.dedup();
    ids
}
