use std::sync::Arc;

use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{
    Activity, ActivityChange, ActivityKind, CallStatus, EnquireSource, EnquireStatus, Purpose,
    TaskCategory,
};
use tracing::debug;

use crate::dao::base::{PaginatedResult, PaginationParams};
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::{HierarchyResolver, RequesterContext};
use crate::query::ActivityQuery;
use crate::repo::{ActivityRepo, LeadRepo};
use crate::time::DateRange;
use crate::visibility::{ScopeFilter, ScopeView};

/// A single mutation, carrying the old and new values it narrates.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    LeadAdded,
    SourceUpdated {
        from: EnquireSource,
        to: EnquireSource,
    },
    StatusUpdated {
        from: EnquireStatus,
        to: EnquireStatus,
    },
    PurposeUpdated {
        from: Purpose,
        to: Purpose,
    },
    CallStatusUpdated {
        from: Option<CallStatus>,
        to: CallStatus,
    },
    Transferred {
        from: String,
        to: String,
    },
    TaskAdded {
        category: TaskCategory,
        title: String,
    },
    NoteAdded,
    Completed {
        title: String,
    },
    FollowupAdded {
        category: TaskCategory,
        due: DateTime,
    },
}

impl ActivityEvent {
    pub fn kind(&self) -> ActivityKind {
        match self {
            ActivityEvent::LeadAdded => ActivityKind::LeadAdded,
            ActivityEvent::SourceUpdated { .. } => ActivityKind::LeadUpdated,
            ActivityEvent::StatusUpdated { .. } => ActivityKind::StatusUpdated,
            ActivityEvent::PurposeUpdated { .. } => ActivityKind::PurposeUpdated,
            ActivityEvent::CallStatusUpdated { .. } => ActivityKind::CallStatusUpdated,
            ActivityEvent::Transferred { .. } => ActivityKind::LeadTransfer,
            ActivityEvent::TaskAdded { .. } => ActivityKind::TaskAdded,
            ActivityEvent::NoteAdded => ActivityKind::NoteAdded,
            ActivityEvent::Completed { .. } => ActivityKind::Completed,
            ActivityEvent::FollowupAdded { .. } => ActivityKind::FollowupAdded,
        }
    }

    pub fn change(&self) -> Option<ActivityChange> {
        let change = |field: &str, from: Option<String>, to: String| ActivityChange {
            field: field.to_string(),
            from,
            to: Some(to),
        };
        match self {
            ActivityEvent::SourceUpdated { from, to } => {
                Some(change("source", Some(from.to_string()), to.to_string()))
            }
            ActivityEvent::StatusUpdated { from, to } => Some(change(
                "enquire_status",
                Some(from.to_string()),
                to.to_string(),
            )),
            ActivityEvent::PurposeUpdated { from, to } => {
                Some(change("purpose", Some(from.to_string()), to.to_string()))
            }
            ActivityEvent::CallStatusUpdated { from, to } => Some(change(
                "call_status",
                from.map(|c| c.to_string()),
                to.to_string(),
            )),
            ActivityEvent::Transferred { from, to } => {
                Some(change("handled_by", Some(from.clone()), to.clone()))
            }
            _ => None,
        }
    }

    /// Human-readable narration, fixed at write time.
    pub fn action(&self, activator: &str) -> String {
        match self {
            ActivityEvent::LeadAdded => format!("{activator} added the lead"),
            ActivityEvent::SourceUpdated { from, to } => {
                format!("{activator} updated source from {from} to {to}")
            }
            ActivityEvent::StatusUpdated { from, to } => {
                format!("{activator} updated status from {from} to {to}")
            }
            ActivityEvent::PurposeUpdated { from, to } => {
                format!("{activator} updated purpose from {from} to {to}")
            }
            ActivityEvent::CallStatusUpdated { from: Some(from), to } => {
                format!("{activator} updated call status from {from} to {to}")
            }
            ActivityEvent::CallStatusUpdated { from: None, to } => {
                format!("{activator} set call status to {to}")
            }
            ActivityEvent::Transferred { from, to } => {
                format!("{activator} transferred the lead from {from} to {to}")
            }
            ActivityEvent::TaskAdded { category, title } => {
                format!("{activator} added a {category} task: {title}")
            }
            ActivityEvent::NoteAdded => format!("{activator} added a note"),
            ActivityEvent::Completed { title } => format!("{activator} completed task: {title}"),
            ActivityEvent::FollowupAdded { category, due } => {
                let due = due
                    .try_to_rfc3339_string()
                    .unwrap_or_else(|_| due.timestamp_millis().to_string());
                format!("{activator} scheduled a {category} follow-up for {due}")
            }
        }
    }
}

/// Caller-supplied narrowing of the activity list.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// When set, the lead's full history is returned and every other filter
    /// is ignored.
    pub lead: Option<ObjectId>,
    pub scope: ScopeFilter,
    pub kinds: Vec<ActivityKind>,
    pub created: DateRange,
}

/// Append-only audit log.
#[derive(Clone)]
pub struct ActivityLog {
    activities: Arc<dyn ActivityRepo>,
    leads: Arc<dyn LeadRepo>,
    hierarchy: HierarchyResolver,
}

impl ActivityLog {
    pub fn new(
        activities: Arc<dyn ActivityRepo>,
        leads: Arc<dyn LeadRepo>,
        hierarchy: HierarchyResolver,
    ) -> Self {
        Self {
            activities,
            leads,
            hierarchy,
        }
    }

    pub async fn record(
        &self,
        activator: ObjectId,
        lead: ObjectId,
        task: Option<ObjectId>,
        event: ActivityEvent,
        note: Option<String>,
    ) -> ServiceResult<Activity> {
        let name = self.hierarchy.user(activator).await?.display_name;
        let activity = Activity {
            id: None,
            activator,
            lead,
            task,
            kind: event.kind(),
            action: event.action(&name),
            optional_message: note,
            change: event.change(),
            created_at: DateTime::now(),
        };
        let activity = self.activities.insert(activity).await?;
        debug!(lead = %lead, kind = %activity.kind, "Activity recorded");
        Ok(activity)
    }

    pub async fn query(
        &self,
        ctx: &RequesterContext,
        filter: &ActivityFilter,
        params: &PaginationParams,
    ) -> ServiceResult<PaginatedResult<Activity>> {
        let query = match filter.lead {
            Some(lead_id) => {
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
                    return Err(ServiceError::forbidden(
                        "Not authorized to view this lead's activity",
                    ));
                }
                ActivityQuery::for_lead(lead_id)
            }
            None => {
                let scope = self
                    .hierarchy
                    .resolve_scope(ctx, ScopeView::Work, &filter.scope)
                    .await?;
                let mut query = ActivityQuery::new(scope);
                query.kinds = filter.kinds.clone();
                query.created = filter.created;
                query
            }
        };
        Ok(self.activities.find_page(&query, params).await?)
    }

    /// Full history of one lead, oldest first, without access checks.
    pub async fn history(&self, lead: ObjectId) -> ServiceResult<Vec<Activity>> {
        Ok(self
            .activities
            .find_all(&ActivityQuery::for_lead(lead))
            .await?)
    }

    /// Every activity matching `query`, oldest first.
    pub async fn find_all(&self, query: &ActivityQuery) -> ServiceResult<Vec<Activity>> {
        Ok(self.activities.find_all(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_change_narrates_old_and_new_values() {
        let event = ActivityEvent::StatusUpdated {
            from: EnquireStatus::New,
            to: EnquireStatus::QuotationShared,
        };
        assert_eq!(event.kind(), ActivityKind::StatusUpdated);
        assert_eq!(
            event.action("Asha"),
            "Asha updated status from new to quotation shared"
        );
        let change = event.change().unwrap();
        assert_eq!(change.field, "enquire_status");
        assert_eq!(change.from.as_deref(), Some("new"));
        assert_eq!(change.to.as_deref(), Some("quotation shared"));
    }

    #[test]
    fn source_change_is_a_lead_update() {
        let event = ActivityEvent::SourceUpdated {
            from: EnquireSource::Call,
            to: EnquireSource::Walkin,
        };
        assert_eq!(event.kind(), ActivityKind::LeadUpdated);
    }

    #[test]
    fn transfer_names_both_parties() {
        let event = ActivityEvent::Transferred {
            from: "Ravi".to_string(),
            to: "Meena".to_string(),
        };
        assert_eq!(
            event.action("Ravi"),
            "Ravi transferred the lead from Ravi to Meena"
        );
    }

    #[test]
    fn first_call_status_has_no_previous_value() {
        let event = ActivityEvent::CallStatusUpdated {
            from: None,
            to: CallStatus::NotConnected,
        };
        assert_eq!(event.action("Kiran"), "Kiran set call status to not connected");
        assert!(event.change().unwrap().from.is_none());
    }
}
