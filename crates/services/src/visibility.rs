use bson::{doc, oid::ObjectId, Document};
use leadflow_db::models::Privilege;

use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::{RequesterContext, Team};

/// Row-level visibility predicate for leads, tasks and activities.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    All,
    /// Visible when the handler is one of `handlers`, or when the item belongs
    /// to the `branch` manager.
    Restricted {
        handlers: Vec<ObjectId>,
        branch: Option<ObjectId>,
    },
}

impl Scope {
    pub fn handlers(handlers: Vec<ObjectId>) -> Self {
        Scope::Restricted {
            handlers,
            branch: None,
        }
    }

    /// Renders the predicate against `handler_field` and, for collections that
    /// carry one, `branch_field`.
    pub fn to_document(&self, handler_field: &str, branch_field: Option<&str>) -> Option<Document> {
        match self {
            Scope::All => None,
            Scope::Restricted { handlers, branch } => {
                let by_handler = doc! { handler_field: { "$in": handlers.clone() } };
                match (branch, branch_field) {
                    (Some(branch), Some(field)) => Some(doc! {
                        "$or": [by_handler, { field: *branch }]
                    }),
                    _ => Some(by_handler),
                }
            }
        }
    }

    pub fn permits(&self, handler: ObjectId, branch: Option<ObjectId>) -> bool {
        match self {
            Scope::All => true,
            Scope::Restricted {
                handlers,
                branch: scope_branch,
            } => {
                handlers.contains(&handler)
                    || matches!((scope_branch, branch), (Some(a), Some(b)) if *a == b)
            }
        }
    }
}

/// Which kind of rows a scope is computed for. Staff see branch-level work
/// (tasks and activities attributed to their manager) but only their own
/// leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeView {
    Leads,
    Work,
}

/// Explicit narrowing requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScopeFilter {
    pub manager: Option<ObjectId>,
    pub staff: Option<ObjectId>,
}

/// Computes the visibility scope of `ctx`.
///
/// `team` must be the requester's own team for a manager, and the team of
/// `filter.manager` for an admin narrowing by manager. It is ignored otherwise.
pub fn scope(
    ctx: &RequesterContext,
    view: ScopeView,
    filter: &ScopeFilter,
    team: Option<&Team>,
) -> ServiceResult<Scope> {
    match ctx.privilege {
        Privilege::Admin => {
            if let Some(staff) = filter.staff {
                return Ok(Scope::handlers(vec![staff]));
            }
            match (filter.manager, team) {
                (Some(manager), Some(team)) if team.manager == manager => Ok(Scope::Restricted {
                    handlers: team.members(),
                    branch: Some(manager),
                }),
                (Some(manager), _) => Ok(Scope::Restricted {
                    handlers: vec![manager],
                    branch: Some(manager),
                }),
                (None, _) => Ok(Scope::All),
            }
        }
        Privilege::Manager => {
            if let Some(manager) = filter.manager {
                if manager != ctx.user_id {
                    return Err(ServiceError::forbidden(
                        "Managers can only view their own branch",
                    ));
                }
            }
            let team = team.filter(|t| t.manager == ctx.user_id);
            if let Some(staff) = filter.staff {
                let in_team = staff == ctx.user_id || team.is_some_and(|t| t.contains(staff));
                if !in_team {
                    return Err(ServiceError::forbidden(
                        "Staff member does not belong to this branch",
                    ));
                }
                return Ok(Scope::handlers(vec![staff]));
            }
            let handlers = match team {
                Some(team) => team.members(),
                None => vec![ctx.user_id],
            };
            Ok(Scope::Restricted {
                handlers,
                branch: Some(ctx.user_id),
            })
        }
        Privilege::Staff => {
            if let Some(staff) = filter.staff {
                if staff != ctx.user_id {
                    return Err(ServiceError::forbidden(
                        "Staff can only view their own records",
                    ));
                }
            }
            let mut handlers = vec![ctx.user_id];
            if view == ScopeView::Work {
                if let Some(manager) = ctx.manager_id {
                    handlers.push(manager);
                }
            }
            Ok(Scope::handlers(handlers))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_db::models::SecondPrivilege;

    fn ctx(privilege: Privilege, manager: Option<ObjectId>) -> RequesterContext {
        RequesterContext {
            user_id: ObjectId::new(),
            privilege,
            second_privilege: SecondPrivilege::Regular,
            manager_id: manager,
        }
    }

    #[test]
    fn admin_is_unrestricted_without_filters() {
        let admin = ctx(Privilege::Admin, None);
        let scope = scope(&admin, ScopeView::Leads, &ScopeFilter::default(), None).unwrap();
        assert_eq!(scope, Scope::All);
        assert!(scope.to_document("handled_by", Some("manager")).is_none());
    }

    #[test]
    fn admin_manager_filter_covers_branch() {
        let admin = ctx(Privilege::Admin, None);
        let manager = ObjectId::new();
        let staff = ObjectId::new();
        let team = Team {
            manager,
            staff: vec![staff],
        };
        let filter = ScopeFilter {
            manager: Some(manager),
            staff: None,
        };
        let scope = scope(&admin, ScopeView::Leads, &filter, Some(&team)).unwrap();
        assert!(scope.permits(staff, None));
        assert!(scope.permits(manager, None));
        assert!(scope.permits(ObjectId::new(), Some(manager)));
        assert!(!scope.permits(ObjectId::new(), Some(ObjectId::new())));
    }

    #[test]
    fn manager_sees_team_and_branch() {
        let manager = ctx(Privilege::Manager, None);
        let staff = ObjectId::new();
        let team = Team {
            manager: manager.user_id,
            staff: vec![staff],
        };
        let scope = scope(&manager, ScopeView::Leads, &ScopeFilter::default(), Some(&team)).unwrap();
        assert!(scope.permits(staff, None));
        assert!(scope.permits(manager.user_id, None));
        assert!(scope.permits(ObjectId::new(), Some(manager.user_id)));
        assert!(!scope.permits(ObjectId::new(), None));

        let rendered = scope.to_document("handled_by", Some("manager")).unwrap();
        assert!(rendered.get_array("$or").is_ok());
    }

    #[test]
    fn manager_cannot_filter_foreign_staff() {
        let manager = ctx(Privilege::Manager, None);
        let team = Team {
            manager: manager.user_id,
            staff: vec![],
        };
        let filter = ScopeFilter {
            manager: None,
            staff: Some(ObjectId::new()),
        };
        let err = scope(&manager, ScopeView::Leads, &filter, Some(&team)).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn staff_leads_are_own_only_but_work_includes_manager() {
        let manager = ObjectId::new();
        let staff = ctx(Privilege::Staff, Some(manager));

        let leads = scope(&staff, ScopeView::Leads, &ScopeFilter::default(), None).unwrap();
        assert!(leads.permits(staff.user_id, Some(manager)));
        assert!(!leads.permits(manager, Some(manager)));
        assert!(!leads.permits(ObjectId::new(), Some(manager)));

        let work = scope(&staff, ScopeView::Work, &ScopeFilter::default(), None).unwrap();
        assert!(work.permits(manager, None));
        assert!(!work.permits(ObjectId::new(), Some(manager)));
    }
}
