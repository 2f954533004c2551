use std::sync::Arc;

use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{Privilege, SecondPrivilege, User};
use tracing::info;

use crate::auth::AuthService;
use crate::dao::base::DaoError;
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::{HierarchyResolver, RequesterContext};
use crate::lead::transfer_allowed;
use crate::query::UserQuery;
use crate::repo::UserRepo;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_PHONE_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub privilege: Privilege,
    pub second_privilege: SecondPrivilege,
    /// Required for regular staff created by an admin; ignored otherwise.
    pub manager: Option<ObjectId>,
    pub dob: Option<DateTime>,
}

/// User administration: creation rules, deactivation and the lists used to
/// pick managers, staff and transfer targets.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserRepo>,
    hierarchy: HierarchyResolver,
    auth: Arc<AuthService>,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserRepo>, hierarchy: HierarchyResolver, auth: Arc<AuthService>) -> Self {
        Self {
            users,
            hierarchy,
            auth,
        }
    }

    pub async fn create_user(
        &self,
        ctx: &RequesterContext,
        input: CreateUserInput,
    ) -> ServiceResult<User> {
        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(ServiceError::validation("username", "Username is required"));
        }
        if input.display_name.trim().is_empty() {
            return Err(ServiceError::validation("display_name", "Name is required"));
        }
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation(
                "password",
                format!("Minimum {MIN_PASSWORD_LEN} characters required"),
            ));
        }
        if input
            .phone
            .as_deref()
            .is_some_and(|p| p.trim().chars().count() < MIN_PHONE_LEN)
        {
            return Err(ServiceError::validation(
                "phone",
                format!("Minimum {MIN_PHONE_LEN} characters required"),
            ));
        }
        check_second_privilege(input.privilege, input.second_privilege)?;

        let manager = self.placement(ctx, &input).await?;

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(ServiceError::conflict("User already exists"));
        }

        let password_hash = self
            .auth
            .hash_password(&input.password)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let now = DateTime::now();
        let user = User {
            id: None,
            username,
            display_name: input.display_name.trim().to_string(),
            phone: input.phone.map(|p| p.trim().to_string()),
            email: input.email,
            password_hash: Some(password_hash),
            privilege: input.privilege,
            second_privilege: input.second_privilege,
            manager,
            created_by: Some(ctx.user_id),
            is_active: true,
            fcm_token: None,
            dob: input.dob,
            created_at: now,
            updated_at: now,
        };
        let user = match self.users.insert(user).await {
            Ok(user) => user,
            Err(DaoError::DuplicateKey(_)) => {
                return Err(ServiceError::conflict("User already exists"));
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            username = %user.username,
            privilege = %user.privilege,
            created_by = %ctx.user_id,
            "User created"
        );
        Ok(user)
    }

    /// Who may create whom, and the manager a new staff user lands under.
    async fn placement(
        &self,
        ctx: &RequesterContext,
        input: &CreateUserInput,
    ) -> ServiceResult<Option<ObjectId>> {
        match (ctx.privilege, input.privilege) {
            (Privilege::Staff, _) => Err(ServiceError::forbidden("Staff cannot create users")),
            (Privilege::Manager, Privilege::Staff) => {
                if input.second_privilege == SecondPrivilege::CallCenter {
                    return Err(ServiceError::forbidden(
                        "Only an admin can create call-center staff",
                    ));
                }
                Ok(Some(ctx.user_id))
            }
            (Privilege::Manager, _) => {
                Err(ServiceError::forbidden("A manager can only create staff"))
            }
            (Privilege::Admin, Privilege::Admin) => {
                if !ctx.is_super_admin() {
                    return Err(ServiceError::forbidden(
                        "Only a super admin can create admins",
                    ));
                }
                Ok(None)
            }
            (Privilege::Admin, Privilege::Manager) => Ok(None),
            (Privilege::Admin, Privilege::Staff) => match input.manager {
                Some(manager) => {
                    self.hierarchy.manager(manager).await?;
                    Ok(Some(manager))
                }
                None if input.second_privilege == SecondPrivilege::CallCenter => Ok(None),
                None => Err(ServiceError::validation(
                    "manager",
                    "Manager is required for staff",
                )),
            },
        }
    }

    /// Deactivates or reactivates a user. Users are never deleted.
    pub async fn set_active(
        &self,
        ctx: &RequesterContext,
        user_id: ObjectId,
        active: bool,
    ) -> ServiceResult<User> {
        if user_id == ctx.user_id {
            return Err(ServiceError::forbidden("Cannot change your own status"));
        }
        let mut user = self.hierarchy.user(user_id).await?;
        let allowed = match (ctx.privilege, user.privilege) {
            (Privilege::Admin, Privilege::Admin) => ctx.is_super_admin(),
            (Privilege::Admin, _) => true,
            (Privilege::Manager, Privilege::Staff) => user.manager == Some(ctx.user_id),
            _ => false,
        };
        if !allowed {
            return Err(ServiceError::forbidden("Not allowed to change this user's status"));
        }
        if !active
            && user.privilege == Privilege::Manager
            && !self.hierarchy.staff_of(user_id).await?.is_empty()
        {
            return Err(ServiceError::conflict(
                "Manager still has active staff reporting to it",
            ));
        }
        if active && user.privilege == Privilege::Staff {
            if let Some(manager) = user.manager {
                self.hierarchy.manager(manager).await?;
            }
        }

        self.users.set_active(user_id, active).await?;
        user.is_active = active;
        info!(user = %user_id, active, by = %ctx.user_id, "User status changed");
        Ok(user)
    }

    /// Stores the device token used for push delivery.
    pub async fn register_device(
        &self,
        ctx: &RequesterContext,
        token: Option<String>,
    ) -> ServiceResult<()> {
        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        if !self.users.set_fcm_token(ctx.user_id, token).await? {
            return Err(ServiceError::not_found("User"));
        }
        Ok(())
    }

    pub async fn me(&self, ctx: &RequesterContext) -> ServiceResult<User> {
        self.hierarchy.user(ctx.user_id).await
    }

    /// Managers see their own staff; admins all staff or one manager's.
    pub async fn list_staff(
        &self,
        ctx: &RequesterContext,
        manager: Option<ObjectId>,
    ) -> ServiceResult<Vec<User>> {
        let manager = match ctx.privilege {
            Privilege::Staff => {
                return Err(ServiceError::forbidden("Staff cannot list staff"));
            }
            Privilege::Manager => Some(ctx.user_id),
            Privilege::Admin => manager,
        };
        Ok(self
            .users
            .find_many(&UserQuery {
                privilege: Some(Privilege::Staff),
                manager,
                active_only: true,
                ..Default::default()
            })
            .await?)
    }

    pub async fn list_managers(&self, ctx: &RequesterContext) -> ServiceResult<Vec<User>> {
        if !ctx.is_admin() {
            return Err(ServiceError::forbidden("Only admins can list managers"));
        }
        self.hierarchy.managers(None).await
    }

    /// Active users the requester may hand a lead to.
    pub async fn list_transfer_targets(&self, ctx: &RequesterContext) -> ServiceResult<Vec<User>> {
        let users = self
            .users
            .find_many(&UserQuery {
                active_only: true,
                ..Default::default()
            })
            .await?;
        Ok(users
            .into_iter()
            .filter(|u| u.id != Some(ctx.user_id) && transfer_allowed(ctx, u))
            .collect())
    }
}

fn check_second_privilege(privilege: Privilege, second: SecondPrivilege) -> ServiceResult<()> {
    let valid = match second {
        SecondPrivilege::Regular => true,
        SecondPrivilege::Super => privilege == Privilege::Admin,
        SecondPrivilege::CallCenter => privilege == Privilege::Staff,
    };
    if valid {
        Ok(())
    } else {
        Err(ServiceError::validation(
            "second_privilege",
            format!("'{second}' is not valid for {privilege}"),
        ))
    }
}
