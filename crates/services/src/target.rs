use std::collections::HashMap;
use std::sync::Arc;

use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{Lead, Privilege, Target, User};
use serde::Serialize;
use tracing::info;

use crate::attribution::credited_users;
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::{HierarchyResolver, RequesterContext};
use crate::repo::TargetRepo;
use crate::time::month_key;

#[derive(Debug, Clone)]
pub struct SetTargetInput {
    pub assigned: ObjectId,
    /// Any instant in the target month.
    pub month: DateTime,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TargetStatsFilter {
    /// Any instant in the month to report; defaults to the current month.
    pub month: Option<DateTime>,
    /// Admin only: restrict the tree to one manager.
    pub manager: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TargetTotals {
    pub total: i64,
    pub achieved: i64,
}

impl TargetTotals {
    fn add(&mut self, other: TargetTotals) {
        self.total += other.total;
        self.achieved += other.achieved;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetNode {
    pub user: String,
    pub username: String,
    pub display_name: String,
    pub privilege: Privilege,
    pub total: i64,
    pub achieved: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TargetNode>,
}

impl TargetNode {
    fn leaf(user: &User, totals: TargetTotals) -> Self {
        Self {
            user: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            privilege: user.privilege,
            total: totals.total,
            achieved: totals.achieved,
            children: Vec::new(),
        }
    }

    pub fn totals(&self) -> TargetTotals {
        TargetTotals {
            total: self.total,
            achieved: self.achieved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetStats {
    /// Month key, UTC millis.
    pub month: i64,
    pub overall: TargetTotals,
    pub breakdown: Vec<TargetNode>,
}

/// Monthly per-user goal and achievement counters.
#[derive(Clone)]
pub struct TargetLedger {
    targets: Arc<dyn TargetRepo>,
    hierarchy: HierarchyResolver,
}

impl TargetLedger {
    pub fn new(targets: Arc<dyn TargetRepo>, hierarchy: HierarchyResolver) -> Self {
        Self { targets, hierarchy }
    }

    /// Credits one achievement for the current month to every user the
    /// attribution rule names. Missing rows are created with `total = 0`.
    pub async fn credit(&self, updater: ObjectId, lead: &Lead) -> ServiceResult<Vec<Target>> {
        let creator = self.hierarchy.user(lead.created_by).await?;
        let month = month_key(DateTime::now());
        let mut credited = Vec::new();
        for user in credited_users(updater, &creator) {
            let target = self.targets.increment_achieved(user, month).await?;
            info!(user = %user, achieved = target.achieved, "Target credited");
            credited.push(target);
        }
        Ok(credited)
    }

    pub async fn set_target(
        &self,
        ctx: &RequesterContext,
        input: SetTargetInput,
    ) -> ServiceResult<Target> {
        if input.total < 0 {
            return Err(ServiceError::validation("total", "Target must not be negative"));
        }
        let assignee = self.hierarchy.user(input.assigned).await?;
        if !assignee.is_active {
            return Err(ServiceError::validation("assigned", "User is deactivated"));
        }
        match ctx.privilege {
            Privilege::Admin => {
                if assignee.privilege == Privilege::Admin {
                    return Err(ServiceError::forbidden("Admins do not carry targets"));
                }
            }
            Privilege::Manager => {
                if assignee.privilege != Privilege::Staff || assignee.manager != Some(ctx.user_id) {
                    return Err(ServiceError::forbidden(
                        "Managers can only set targets for their own staff",
                    ));
                }
            }
            Privilege::Staff => {
                return Err(ServiceError::forbidden("Staff cannot set targets"));
            }
        }
        let target = self
            .targets
            .set_total(input.assigned, month_key(input.month), input.total)
            .await?;
        info!(user = %input.assigned, total = input.total, "Target set");
        Ok(target)
    }

    pub async fn target_for(&self, user: ObjectId, month: DateTime) -> ServiceResult<Option<Target>> {
        Ok(self.targets.find(user, month_key(month)).await?)
    }

    pub async fn stats(
        &self,
        ctx: &RequesterContext,
        filter: TargetStatsFilter,
    ) -> ServiceResult<TargetStats> {
        let month = month_key(filter.month.unwrap_or_else(DateTime::now));
        let breakdown = match ctx.privilege {
            Privilege::Staff => {
                let me = self.hierarchy.user(ctx.user_id).await?;
                let totals = self.totals_for(&[ctx.user_id], month).await?;
                vec![TargetNode::leaf(&me, lookup(&totals, ctx.user_id))]
            }
            Privilege::Manager => {
                let me = self.hierarchy.user(ctx.user_id).await?;
                vec![self.manager_node(&me, month).await?]
            }
            Privilege::Admin => {
                let created_by = if ctx.is_super_admin() {
                    None
                } else {
                    Some(ctx.user_id)
                };
                let mut managers = self.hierarchy.managers(created_by).await?;
                if let Some(manager) = filter.manager {
                    managers.retain(|m| m.id == Some(manager));
                    if managers.is_empty() {
                        return Err(ServiceError::forbidden(
                            "Manager is not visible to this admin",
                        ));
                    }
                }
                let mut nodes = Vec::with_capacity(managers.len());
                for manager in &managers {
                    nodes.push(self.manager_node(manager, month).await?);
                }
                if filter.manager.is_none() {
                    nodes.extend(self.unassigned_nodes(created_by, month).await?);
                }
                nodes
            }
        };

        let mut overall = TargetTotals::default();
        for node in &breakdown {
            overall.add(node.totals());
        }
        Ok(TargetStats {
            month: month.timestamp_millis(),
            overall,
            breakdown,
        })
    }

    /// Manager total comes from its own row; achieved adds the staff's
    /// achievements to its own.
    async fn manager_node(&self, manager: &User, month: DateTime) -> ServiceResult<TargetNode> {
        let manager_id = manager
            .id
            .ok_or_else(|| ServiceError::Internal("manager without id".to_string()))?;
        let staff = self.hierarchy.staff_of(manager_id).await?;
        let mut ids: Vec<ObjectId> = staff.iter().filter_map(|s| s.id).collect();
        ids.push(manager_id);
        let totals = self.totals_for(&ids, month).await?;

        let children: Vec<TargetNode> = staff
            .iter()
            .filter_map(|s| s.id.map(|id| TargetNode::leaf(s, lookup(&totals, id))))
            .collect();
        let own = lookup(&totals, manager_id);
        let mut node = TargetNode::leaf(manager, own);
        node.achieved = own.achieved + children.iter().map(|c| c.achieved).sum::<i64>();
        node.children = children;
        Ok(node)
    }

    /// Staff outside any branch sit at the top level next to the managers.
    async fn unassigned_nodes(
        &self,
        created_by: Option<ObjectId>,
        month: DateTime,
    ) -> ServiceResult<Vec<TargetNode>> {
        let agents = self.hierarchy.unassigned_staff(created_by).await?;
        let ids: Vec<ObjectId> = agents.iter().filter_map(|a| a.id).collect();
        let totals = self.totals_for(&ids, month).await?;
        Ok(agents
            .iter()
            .filter_map(|a| a.id.map(|id| TargetNode::leaf(a, lookup(&totals, id))))
            .collect())
    }

    async fn totals_for(
        &self,
        users: &[ObjectId],
        month: DateTime,
    ) -> ServiceResult<HashMap<ObjectId, TargetTotals>> {
        let rows = self.targets.find_for_users(users, month).await?;
        Ok(rows
            .into_iter()
            .map(|t| {
                (
                    t.assigned,
                    TargetTotals {
                        total: t.total,
                        achieved: t.achieved,
                    },
                )
            })
            .collect())
    }
}

fn lookup(totals: &HashMap<ObjectId, TargetTotals>, user: ObjectId) -> TargetTotals {
    totals.get(&user).copied().unwrap_or_default()
}
