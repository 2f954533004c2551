use std::sync::Arc;

use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{Leave, LeaveStatus};
use tracing::info;

use crate::dao::base::{PaginatedResult, PaginationParams};
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::RequesterContext;
use crate::query::LeaveQuery;
use crate::repo::LeaveRepo;
use crate::time::DateRange;

#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    /// Super admin only.
    pub user: Option<ObjectId>,
    pub status: Option<LeaveStatus>,
    pub date: DateRange,
}

#[derive(Clone)]
pub struct LeaveBook {
    leaves: Arc<dyn LeaveRepo>,
}

impl LeaveBook {
    pub fn new(leaves: Arc<dyn LeaveRepo>) -> Self {
        Self { leaves }
    }

    pub async fn apply(
        &self,
        ctx: &RequesterContext,
        reason: String,
        date: DateTime,
    ) -> ServiceResult<Leave> {
        let reason = reason.trim().to_string();
        if reason.chars().count() < 4 {
            return Err(ServiceError::validation("reason", "Minimum 4 characters required"));
        }
        let now = DateTime::now();
        let leave = self
            .leaves
            .insert(Leave {
                id: None,
                requester: ctx.user_id,
                reason,
                date,
                status: LeaveStatus::Pending,
                reviewed_by: None,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(user = %ctx.user_id, "Leave applied");
        Ok(leave)
    }

    /// Everyone sees their own leaves; only a super admin sees others'.
    pub async fn list(
        &self,
        ctx: &RequesterContext,
        filter: &LeaveFilter,
        params: &PaginationParams,
    ) -> ServiceResult<PaginatedResult<Leave>> {
        let requester = if ctx.is_super_admin() {
            filter.user
        } else {
            Some(ctx.user_id)
        };
        let query = LeaveQuery {
            requester,
            status: filter.status,
            date: filter.date,
        };
        Ok(self.leaves.find_page(&query, params).await?)
    }

    pub async fn update_status(
        &self,
        ctx: &RequesterContext,
        leave_id: ObjectId,
        status: LeaveStatus,
    ) -> ServiceResult<Leave> {
        if !ctx.is_super_admin() {
            return Err(ServiceError::forbidden(
                "Only a super admin can update leave status",
            ));
        }
        let leave = self
            .leaves
            .set_status(leave_id, status, ctx.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Leave"))?;
        info!(leave = %leave_id, status = %status, "Leave status updated");
        Ok(leave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{id, Org};

    #[tokio::test]
    async fn short_reasons_are_rejected() {
        let org = Org::seed().await;
        let err = org
            .engine
            .leaves
            .apply(&org.ctx(&org.s1), "  flu ".to_string(), DateTime::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "reason"));
    }

    #[tokio::test]
    async fn only_super_admin_sees_and_reviews_others() {
        let org = Org::seed().await;
        let leave = org
            .engine
            .leaves
            .apply(&org.ctx(&org.s1), "Family function".to_string(), DateTime::now())
            .await
            .unwrap();
        org.engine
            .leaves
            .apply(&org.ctx(&org.manager_a), "Medical visit".to_string(), DateTime::now())
            .await
            .unwrap();
        let params = PaginationParams::default();

        let own = org
            .engine
            .leaves
            .list(&org.ctx(&org.s1), &LeaveFilter::default(), &params)
            .await
            .unwrap();
        assert_eq!(own.total, 1);

        let admin_view = org
            .engine
            .leaves
            .list(&org.ctx(&org.admin), &LeaveFilter::default(), &params)
            .await
            .unwrap();
        assert_eq!(admin_view.total, 0);

        let root = org.ctx(&org.super_admin);
        let everything = org.engine.leaves.list(&root, &LeaveFilter::default(), &params).await.unwrap();
        assert_eq!(everything.total, 2);
        let filter = LeaveFilter {
            user: org.s1.id,
            ..Default::default()
        };
        let one = org.engine.leaves.list(&root, &filter, &params).await.unwrap();
        assert_eq!(one.total, 1);

        let denied = org
            .engine
            .leaves
            .update_status(&org.ctx(&org.manager_a), leave.id.unwrap(), LeaveStatus::Approved)
            .await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        let approved = org
            .engine
            .leaves
            .update_status(&root, leave.id.unwrap(), LeaveStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(id(&org.super_admin)));
    }
}
