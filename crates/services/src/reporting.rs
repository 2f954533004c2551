//! Read-only rollups over activities, leads and tasks.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{
    Activity, ActivityKind, CallStatus, EnquireSource, EnquireStatus, Privilege, Purpose,
    TaskCategory, User,
};
use serde::Serialize;

use crate::attribution::credited_users;
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::{HierarchyResolver, RequesterContext};
use crate::query::{ActivityQuery, LeadQuery, TaskQuery};
use crate::repo::{ActivityRepo, LeadRepo, TaskRepo};
use crate::time::{bucket_series, DateRange, Granularity, ProgressPoint, DAY_MILLIS};
use crate::visibility::{ScopeFilter, ScopeView};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
    pub scope: ScopeFilter,
    pub range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRef {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

impl UserRef {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityCounts {
    /// Activity count per type, keyed by the wire value.
    pub by_type: BTreeMap<String, u64>,
    pub won: u64,
    pub visited: u64,
}

impl ActivityCounts {
    fn empty() -> Self {
        Self {
            by_type: ActivityKind::ALL
                .iter()
                .map(|k| (k.as_str().to_string(), 0))
                .collect(),
            won: 0,
            visited: 0,
        }
    }

    fn add(&mut self, other: &ActivityCounts) {
        for (kind, count) in &other.by_type {
            *self.by_type.entry(kind.clone()).or_default() += count;
        }
        self.won += other.won;
        self.visited += other.visited;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffActivityRow {
    pub user: UserRef,
    pub counts: ActivityCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerGroup {
    /// `None` groups users outside any branch (admins, unassigned agents).
    pub manager: Option<UserRef>,
    pub users: Vec<StaffActivityRow>,
    pub totals: ActivityCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffReport {
    pub groups: Vec<ManagerGroup>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallOutcomes {
    pub connected: u64,
    pub not_connected: u64,
    pub follow_up_scheduled: u64,
    pub call_back_requested: u64,
    pub not_updated: u64,
    pub total: u64,
}

impl CallOutcomes {
    fn record(&mut self, outcome: Option<CallStatus>) {
        match outcome {
            Some(CallStatus::Connected) => self.connected += 1,
            Some(CallStatus::NotConnected) => self.not_connected += 1,
            Some(CallStatus::FollowUpScheduled) => self.follow_up_scheduled += 1,
            Some(CallStatus::CallBackRequested) => self.call_back_requested += 1,
            None => self.not_updated += 1,
        }
        self.total += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallReportRow {
    pub user: UserRef,
    pub outcomes: CallOutcomes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallReport {
    pub overall: CallOutcomes,
    pub by_user: Vec<CallReportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadStatistics {
    pub enquire_status: BTreeMap<String, u64>,
    pub source: BTreeMap<String, u64>,
    pub purpose: BTreeMap<String, u64>,
    pub total: u64,
    pub granularity: Granularity,
    pub progress: Vec<ProgressPoint>,
}

fn zeroed<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<String, u64> {
    values.map(|v| (v.to_string(), 0)).collect()
}

/// A status transition activity that reports count as a "won" or "visited"
/// outcome.
fn transition_to(activity: &Activity, status: EnquireStatus) -> bool {
    activity.kind == ActivityKind::StatusUpdated
        && activity
            .change
            .as_ref()
            .and_then(|c| c.to.as_deref())
            .is_some_and(|to| to == status.as_str())
}

#[derive(Clone)]
pub struct ReportingAggregator {
    hierarchy: HierarchyResolver,
    leads: Arc<dyn LeadRepo>,
    tasks: Arc<dyn TaskRepo>,
    activities: Arc<dyn ActivityRepo>,
}

impl ReportingAggregator {
    pub fn new(
        hierarchy: HierarchyResolver,
        leads: Arc<dyn LeadRepo>,
        tasks: Arc<dyn TaskRepo>,
        activities: Arc<dyn ActivityRepo>,
    ) -> Self {
        Self {
            hierarchy,
            leads,
            tasks,
            activities,
        }
    }

    fn ensure_allowed(ctx: &RequesterContext) -> ServiceResult<()> {
        if ctx.is_staff() {
            return Err(ServiceError::forbidden("Staff are not allowed to access analytics"));
        }
        Ok(())
    }

    /// Per-user activity counts grouped by manager. Won and visited outcomes
    /// are credited with the same rule as targets.
    pub async fn staff_report(
        &self,
        ctx: &RequesterContext,
        filter: &ReportFilter,
    ) -> ServiceResult<StaffReport> {
        Self::ensure_allowed(ctx)?;
        let scope = self
            .hierarchy
            .resolve_scope(ctx, ScopeView::Work, &filter.scope)
            .await?;
        let mut query = ActivityQuery::new(scope);
        query.created = filter.range;
        let activities = self.activities.find_all(&query).await?;

        // Creators of leads with a won/visited transition.
        let lead_ids: Vec<ObjectId> = activities
            .iter()
            .filter(|a| {
                transition_to(a, EnquireStatus::Won) || transition_to(a, EnquireStatus::VisitStore)
            })
            .map(|a| a.lead)
            .collect();
        let mut creators: HashMap<ObjectId, ObjectId> = HashMap::new();
        for lead_id in lead_ids {
            if creators.contains_key(&lead_id) {
                continue;
            }
            if let Some(lead) = self.leads.find_by_id(lead_id).await? {
                creators.insert(lead_id, lead.created_by);
            }
        }
        let creator_ids: Vec<ObjectId> = creators.values().copied().collect();
        let creator_users = self.hierarchy.users_by_id(&creator_ids).await?;

        let mut per_user: HashMap<ObjectId, ActivityCounts> = HashMap::new();
        for activity in &activities {
            let counts = per_user
                .entry(activity.activator)
                .or_insert_with(ActivityCounts::empty);
            *counts
                .by_type
                .entry(activity.kind.as_str().to_string())
                .or_default() += 1;

            let won = transition_to(activity, EnquireStatus::Won);
            let visited = transition_to(activity, EnquireStatus::VisitStore);
            if !won && !visited {
                continue;
            }
            let credited = creators
                .get(&activity.lead)
                .and_then(|creator| creator_users.get(creator))
                .map(|creator| credited_users(activity.activator, creator))
                .unwrap_or_else(|| vec![activity.activator]);
            for user in credited {
                let counts = per_user.entry(user).or_insert_with(ActivityCounts::empty);
                if won {
                    counts.won += 1;
                }
                if visited {
                    counts.visited += 1;
                }
            }
        }

        let user_ids: Vec<ObjectId> = per_user.keys().copied().collect();
        let users = self.hierarchy.users_by_id(&user_ids).await?;
        let mut grouped: BTreeMap<Option<ObjectId>, Vec<StaffActivityRow>> = BTreeMap::new();
        for (user_id, counts) in per_user {
            let Some(user) = users.get(&user_id) else {
                continue;
            };
            let branch = match user.privilege {
                Privilege::Manager => Some(user_id),
                _ => user.manager,
            };
            grouped.entry(branch).or_default().push(StaffActivityRow {
                user: UserRef::from_user(user),
                counts,
            });
        }

        let manager_ids: Vec<ObjectId> = grouped.keys().flatten().copied().collect();
        let managers = self.hierarchy.users_by_id(&manager_ids).await?;
        let groups = grouped
            .into_iter()
            .map(|(branch, mut rows)| {
                rows.sort_by(|a, b| a.user.username.cmp(&b.user.username));
                let mut totals = ActivityCounts::empty();
                for row in &rows {
                    totals.add(&row.counts);
                }
                ManagerGroup {
                    manager: branch
                        .and_then(|id| managers.get(&id))
                        .map(UserRef::from_user),
                    users: rows,
                    totals,
                }
            })
            .collect();
        Ok(StaffReport { groups })
    }

    /// Outcomes of call tasks due in the range, per assignee.
    pub async fn call_report(
        &self,
        ctx: &RequesterContext,
        filter: &ReportFilter,
    ) -> ServiceResult<CallReport> {
        Self::ensure_allowed(ctx)?;
        let scope = self
            .hierarchy
            .resolve_scope(ctx, ScopeView::Work, &filter.scope)
            .await?;
        let mut query = TaskQuery::new(scope);
        query.category = Some(TaskCategory::Call);
        query.due = filter.range;
        let tasks = self.tasks.find_all(&query).await?;

        let mut overall = CallOutcomes::default();
        let mut per_user: HashMap<ObjectId, CallOutcomes> = HashMap::new();
        for task in &tasks {
            let outcome = if task.is_completed { task.call_status } else { None };
            overall.record(outcome);
            per_user.entry(task.assigned).or_default().record(outcome);
        }

        let user_ids: Vec<ObjectId> = per_user.keys().copied().collect();
        let users = self.hierarchy.users_by_id(&user_ids).await?;
        let mut by_user: Vec<CallReportRow> = per_user
            .into_iter()
            .filter_map(|(id, outcomes)| {
                users.get(&id).map(|user| CallReportRow {
                    user: UserRef::from_user(user),
                    outcomes,
                })
            })
            .collect();
        by_user.sort_by(|a, b| a.user.username.cmp(&b.user.username));
        Ok(CallReport { overall, by_user })
    }

    /// Counts by status, source and purpose plus a zero-filled creation
    /// series over the visible leads.
    pub async fn lead_statistics(
        &self,
        ctx: &RequesterContext,
        filter: &ReportFilter,
    ) -> ServiceResult<LeadStatistics> {
        Self::ensure_allowed(ctx)?;
        let scope = self
            .hierarchy
            .resolve_scope(ctx, ScopeView::Leads, &filter.scope)
            .await?;
        let mut query = LeadQuery::new(scope);
        query.created = filter.range;
        let leads = self.leads.find_all(&query).await?;

        let mut enquire_status = zeroed(EnquireStatus::ALL.iter().map(|s| s.as_str()));
        let mut source = zeroed(EnquireSource::ALL.iter().map(|s| s.as_str()));
        let mut purpose = zeroed(Purpose::ALL.iter().map(|s| s.as_str()));
        for lead in &leads {
            *enquire_status
                .entry(lead.enquire_status.as_str().to_string())
                .or_default() += 1;
            *source.entry(lead.source.as_str().to_string()).or_default() += 1;
            *purpose.entry(lead.purpose.as_str().to_string()).or_default() += 1;
        }

        let end = filter.range.end.unwrap_or_else(DateTime::now);
        let start = filter.range.start.unwrap_or_else(|| {
            leads
                .iter()
                .map(|l| l.created_at)
                .min()
                .unwrap_or_else(|| DateTime::from_millis(end.timestamp_millis() - 30 * DAY_MILLIS))
        });
        let granularity = Granularity::for_range(start, end);
        let progress = bucket_series(granularity, start, end, leads.iter().map(|l| l.created_at))?;

        Ok(LeadStatistics {
            enquire_status,
            source,
            purpose,
            total: leads.len() as u64,
            granularity,
            progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{lead_input, Org};
    use crate::lead::StatusUpdate;
    use crate::task::{CompleteTaskInput, CreateTaskInput};

    fn won() -> StatusUpdate {
        StatusUpdate {
            enquire_status: Some(EnquireStatus::Won),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn staff_cannot_read_reports() {
        let org = Org::seed().await;
        let ctx = org.ctx(&org.s1);
        let filter = ReportFilter::default();
        assert!(matches!(
            org.engine.reports.staff_report(&ctx, &filter).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.engine.reports.call_report(&ctx, &filter).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.engine.reports.lead_statistics(&ctx, &filter).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn won_outcome_credits_updater_and_call_center_creator() {
        let org = Org::seed().await;
        let mut input = lead_input("9300000001", "Uma");
        input.manager = org.manager_a.id;
        let lead = org
            .engine
            .leads
            .create(&org.ctx(&org.call_center), input)
            .await
            .unwrap();
        org.engine
            .leads
            .update_status(&org.ctx(&org.manager_a), lead.id.unwrap(), won())
            .await
            .unwrap();

        let report = org
            .engine
            .reports
            .staff_report(&org.ctx(&org.super_admin), &ReportFilter::default())
            .await
            .unwrap();
        let row = |username: &str| {
            report
                .groups
                .iter()
                .flat_map(|g| g.users.iter())
                .find(|r| r.user.username == username)
                .cloned()
                .unwrap()
        };
        let manager = row("managerA");
        assert_eq!(manager.counts.won, 1);
        assert_eq!(manager.counts.by_type["status_updated"], 1);
        let agent = row("agent");
        assert_eq!(agent.counts.won, 1);
        assert_eq!(agent.counts.by_type["lead_added"], 1);

        let branch = report
            .groups
            .iter()
            .find(|g| g.manager.as_ref().is_some_and(|m| m.username == "managerA"))
            .unwrap();
        assert_eq!(branch.totals.won, 1);
    }

    #[tokio::test]
    async fn open_call_tasks_count_as_not_updated() {
        let org = Org::seed().await;
        let ctx = org.ctx(&org.s1);
        let mut task_ids = Vec::new();
        for phone in ["9300000002", "9300000003"] {
            let lead = org.engine.leads.create(&ctx, lead_input(phone, "Vijay")).await.unwrap();
            let task = org
                .engine
                .tasks
                .create_task(
                    &ctx,
                    CreateTaskInput {
                        lead: lead.id.unwrap(),
                        assigned: None,
                        category: TaskCategory::Call,
                        due: DateTime::now(),
                        title: None,
                        description: None,
                    },
                )
                .await
                .unwrap();
            task_ids.push(task.id.unwrap());
        }
        org.engine
            .complete_task(
                &ctx,
                task_ids[0],
                CompleteTaskInput {
                    call_status: Some(CallStatus::Connected),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let report = org
            .engine
            .reports
            .call_report(&org.ctx(&org.manager_a), &ReportFilter::default())
            .await
            .unwrap();
        assert_eq!(report.overall.connected, 1);
        assert_eq!(report.overall.not_updated, 1);
        assert_eq!(report.overall.total, 2);
        assert_eq!(report.by_user.len(), 1);
        assert_eq!(report.by_user[0].user.username, "s1");

        let other_branch = org
            .engine
            .reports
            .call_report(&org.ctx(&org.manager_b), &ReportFilter::default())
            .await
            .unwrap();
        assert_eq!(other_branch.overall.total, 0);
    }

    #[tokio::test]
    async fn statistics_cover_every_status() {
        let org = Org::seed().await;
        let ctx = org.ctx(&org.manager_a);
        let first = org.engine.leads.create(&ctx, lead_input("9300000004", "Wasim")).await.unwrap();
        org.engine.leads.create(&ctx, lead_input("9300000005", "Yash")).await.unwrap();
        org.engine
            .leads
            .update_status(&ctx, first.id.unwrap(), won())
            .await
            .unwrap();

        let stats = org
            .engine
            .reports
            .lead_statistics(&ctx, &ReportFilter::default())
            .await
            .unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.enquire_status["won"], 1);
        assert_eq!(stats.enquire_status["new"], 1);
        assert_eq!(stats.enquire_status["lost"], 0);
        assert_eq!(stats.source["walkin"], 2);
        assert_eq!(stats.granularity, Granularity::Day);
        assert_eq!(stats.progress.iter().map(|p| p.count).sum::<u64>(), 2);
    }
}
