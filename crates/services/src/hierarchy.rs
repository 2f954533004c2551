use std::collections::HashMap;
use std::sync::Arc;

use bson::oid::ObjectId;
use leadflow_db::models::{Privilege, SecondPrivilege, User};
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};
use crate::query::UserQuery;
use crate::repo::UserRepo;
use crate::visibility::{self, Scope, ScopeFilter, ScopeView};

/// Identity of the caller, passed explicitly into every engine operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequesterContext {
    pub user_id: ObjectId,
    pub privilege: Privilege,
    pub second_privilege: SecondPrivilege,
    /// Set for staff only.
    pub manager_id: Option<ObjectId>,
}

impl RequesterContext {
    pub fn from_user(user: &User) -> ServiceResult<Self> {
        let user_id = user
            .id
            .ok_or_else(|| ServiceError::Internal("user without id".to_string()))?;
        Ok(Self {
            user_id,
            privilege: user.privilege,
            second_privilege: user.second_privilege,
            manager_id: user.manager,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.privilege == Privilege::Admin
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_admin() && self.second_privilege == SecondPrivilege::Super
    }

    pub fn is_manager(&self) -> bool {
        self.privilege == Privilege::Manager
    }

    pub fn is_staff(&self) -> bool {
        self.privilege == Privilege::Staff
    }

    pub fn is_call_center(&self) -> bool {
        self.second_privilege == SecondPrivilege::CallCenter
    }
}

/// A manager and the active staff reporting to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub manager: ObjectId,
    pub staff: Vec<ObjectId>,
}

impl Team {
    pub fn contains(&self, user: ObjectId) -> bool {
        self.staff.contains(&user)
    }

    /// Staff plus the manager itself.
    pub fn members(&self) -> Vec<ObjectId> {
        let mut members = self.staff.clone();
        members.push(self.manager);
        members
    }
}

/// Resolves users, roles and manager/staff membership.
#[derive(Clone)]
pub struct HierarchyResolver {
    users: Arc<dyn UserRepo>,
}

impl HierarchyResolver {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    /// Builds the context of an authenticated user. Deactivated users are
    /// rejected.
    pub async fn context_for(&self, user_id: ObjectId) -> ServiceResult<RequesterContext> {
        let user = self.user(user_id).await?;
        if !user.is_active {
            return Err(ServiceError::forbidden("User is deactivated"));
        }
        RequesterContext::from_user(&user)
    }

    pub async fn user(&self, id: ObjectId) -> ServiceResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn find_by_username(&self, username: &str) -> ServiceResult<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("User '{username}'")))
    }

    /// Loads `id` and checks it is an active manager.
    pub async fn manager(&self, id: ObjectId) -> ServiceResult<User> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Manager"))?;
        if user.privilege != Privilege::Manager {
            return Err(ServiceError::validation("manager", "User is not a manager"));
        }
        if !user.is_active {
            return Err(ServiceError::validation("manager", "Manager is deactivated"));
        }
        Ok(user)
    }

    pub async fn staff_of(&self, manager: ObjectId) -> ServiceResult<Vec<User>> {
        Ok(self
            .users
            .find_many(&UserQuery {
                privilege: Some(Privilege::Staff),
                manager: Some(manager),
                active_only: true,
                ..Default::default()
            })
            .await?)
    }

    pub async fn team(&self, manager: ObjectId) -> ServiceResult<Team> {
        let staff = self
            .staff_of(manager)
            .await?
            .into_iter()
            .filter_map(|u| u.id)
            .collect();
        Ok(Team { manager, staff })
    }

    pub async fn admins(&self) -> ServiceResult<Vec<User>> {
        Ok(self
            .users
            .find_many(&UserQuery {
                privilege: Some(Privilege::Admin),
                active_only: true,
                ..Default::default()
            })
            .await?)
    }

    /// Active managers, optionally only those created by `created_by`.
    pub async fn managers(&self, created_by: Option<ObjectId>) -> ServiceResult<Vec<User>> {
        Ok(self
            .users
            .find_many(&UserQuery {
                privilege: Some(Privilege::Manager),
                created_by,
                active_only: true,
                ..Default::default()
            })
            .await?)
    }

    /// Active staff without a branch (call-center agents), optionally only
    /// those created by `created_by`.
    pub async fn unassigned_staff(&self, created_by: Option<ObjectId>) -> ServiceResult<Vec<User>> {
        Ok(self
            .users
            .find_many(&UserQuery {
                privilege: Some(Privilege::Staff),
                created_by,
                unmanaged: true,
                active_only: true,
                ..Default::default()
            })
            .await?)
    }

    pub async fn users_by_id(&self, ids: &[ObjectId]) -> ServiceResult<HashMap<ObjectId, User>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = self
            .users
            .find_many(&UserQuery {
                ids: Some(ids.to_vec()),
                ..Default::default()
            })
            .await?;
        Ok(users
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, u)))
            .collect())
    }

    /// Loads whatever team the scope computation needs and applies it.
    pub async fn resolve_scope(
        &self,
        ctx: &RequesterContext,
        view: ScopeView,
        filter: &ScopeFilter,
    ) -> ServiceResult<Scope> {
        let team = match ctx.privilege {
            Privilege::Admin if filter.staff.is_none() => match filter.manager {
                Some(manager) => Some(self.team(manager).await?),
                None => None,
            },
            Privilege::Manager => Some(self.team(ctx.user_id).await?),
            _ => None,
        };
        visibility::scope(ctx, view, filter, team.as_ref())
    }
}
