use std::sync::Arc;

use bson::oid::ObjectId;

use crate::activity::ActivityLog;
use crate::auth::AuthService;
use crate::customer::CustomerBook;
use crate::error::ServiceResult;
use crate::hierarchy::{HierarchyResolver, RequesterContext};
use crate::lead::LeadStateMachine;
use crate::leave::LeaveBook;
use crate::notification::{Notifier, PushSender};
use crate::reporting::ReportingAggregator;
use crate::repo::Repositories;
use crate::target::TargetLedger;
use crate::task::{CompleteTaskInput, CompletionOutcome, TaskLinkage};
use crate::users::UserDirectory;
use crate::views::ViewBuilder;

/// Every engine component wired over one set of repositories.
#[derive(Clone)]
pub struct Engine {
    pub hierarchy: HierarchyResolver,
    pub customers: CustomerBook,
    pub activity: ActivityLog,
    pub notifier: Notifier,
    pub tasks: TaskLinkage,
    pub targets: TargetLedger,
    pub leads: LeadStateMachine,
    pub reports: ReportingAggregator,
    pub leaves: LeaveBook,
    pub users: UserDirectory,
    pub views: ViewBuilder,
}

impl Engine {
    pub fn new(repos: Repositories, push: Arc<dyn PushSender>, auth: Arc<AuthService>) -> Self {
        let hierarchy = HierarchyResolver::new(repos.users.clone());
        let customers = CustomerBook::new(repos.customers.clone());
        let activity = ActivityLog::new(
            repos.activities.clone(),
            repos.leads.clone(),
            hierarchy.clone(),
        );
        let notifier = Notifier::new(repos.notifications.clone(), hierarchy.clone(), push);
        let tasks = TaskLinkage::new(
            repos.tasks.clone(),
            repos.leads.clone(),
            repos.customers.clone(),
            hierarchy.clone(),
            activity.clone(),
        );
        let targets = TargetLedger::new(repos.targets.clone(), hierarchy.clone());
        let leads = LeadStateMachine::new(
            repos.leads.clone(),
            customers.clone(),
            hierarchy.clone(),
            tasks.clone(),
            targets.clone(),
            activity.clone(),
            notifier.clone(),
        );
        let reports = ReportingAggregator::new(
            hierarchy.clone(),
            repos.leads.clone(),
            repos.tasks.clone(),
            repos.activities.clone(),
        );
        let leaves = LeaveBook::new(repos.leaves.clone());
        let users = UserDirectory::new(repos.users.clone(), hierarchy.clone(), auth);
        let views = ViewBuilder::new(hierarchy.clone(), repos.customers, repos.leads);

        Self {
            hierarchy,
            customers,
            activity,
            notifier,
            tasks,
            targets,
            leads,
            reports,
            leaves,
            users,
            views,
        }
    }

    /// Task completion drives lead transitions, so it needs both halves.
    pub async fn complete_task(
        &self,
        ctx: &RequesterContext,
        task_id: ObjectId,
        input: CompleteTaskInput,
    ) -> ServiceResult<CompletionOutcome> {
        self.tasks
            .complete_task(ctx, task_id, input, &self.leads)
            .await
    }
}
