//! Role-based visibility.
//!
//! A viewer sees a board because they own it, because they were added as a
//! member, or because the board's owner falls inside their organizational
//! scope. The scope depends on the viewer's user type:
//!
//! | user type | boards whose owner is...                               |
//! |-----------|--------------------------------------------------------|
//! | staff     | the viewer                                             |
//! | manager   | the viewer, or staff of the viewer's department        |
//! | boss      | anyone in the viewer's company                         |
//! | admin     | the viewer                                             |

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::types::{MemberRole, UserType};

/// The authenticated user as seen by visibility checks
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    pub id: Uuid,
    pub user_type: UserType,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

/// Organizational facts about a board owner
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerProfile {
    pub id: Uuid,
    pub user_type: UserType,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OwnerScope {
    Own(Uuid),
    OwnOrDepartmentStaff { viewer: Uuid, department_id: Uuid },
    Company { company_id: Uuid },
}

impl OwnerScope {
    pub fn for_viewer(viewer: &Viewer) -> Self {
        match (viewer.user_type, viewer.department_id, viewer.company_id) {
            (UserType::Manager, Some(department_id), _) => OwnerScope::OwnOrDepartmentStaff {
                viewer: viewer.id,
                department_id,
            },
            (UserType::Boss, _, Some(company_id)) => OwnerScope::Company { company_id },
            _ => OwnerScope::Own(viewer.id),
        }
    }

    /// Whether a board owned by `owner` falls inside this scope
    pub fn covers(&self, owner: &OwnerProfile) -> bool {
        match self {
            OwnerScope::Own(viewer) => owner.id == *viewer,
            OwnerScope::OwnOrDepartmentStaff { viewer, department_id } => {
                owner.id == *viewer
                    || (owner.user_type == UserType::Staff
                        && owner.department_id == Some(*department_id))
            }
            OwnerScope::Company { company_id } => owner.company_id == Some(*company_id),
        }
    }

    /// Append a parenthesized predicate over `owner_column`, e.g. `b.owner_id`.
    /// The column must be a constant.
    pub fn push_predicate(&self, query: &mut QueryBuilder<'_, Postgres>, owner_column: &'static str) {
        match self {
            OwnerScope::Own(viewer) => {
                query.push("(").push(owner_column).push(" = ").push_bind(*viewer).push(")");
            }
            OwnerScope::OwnOrDepartmentStaff { viewer, department_id } => {
                query
                    .push("(")
                    .push(owner_column)
                    .push(" = ")
                    .push_bind(*viewer)
                    .push(" OR ")
                    .push(owner_column)
                    .push(" IN (SELECT scope_u.id FROM users scope_u WHERE scope_u.deleted_at IS NULL AND scope_u.user_type = 'staff' AND scope_u.department_id = ")
                    .push_bind(*department_id)
                    .push("))");
            }
            OwnerScope::Company { company_id } => {
                query
                    .push("(")
                    .push(owner_column)
                    .push(" IN (SELECT scope_u.id FROM users scope_u WHERE scope_u.deleted_at IS NULL AND scope_u.company_id = ")
                    .push_bind(*company_id)
                    .push("))");
            }
        }
    }
}

/// What a viewer may do with one board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAccess {
    /// Owner, board owner/admin member, or owner within scope: everything
    Full,
    /// Plain board member: sees only their own cards
    Member(MemberRole),
    None,
}

impl BoardAccess {
    pub fn resolve(viewer: &Viewer, owner: &OwnerProfile, membership: Option<MemberRole>) -> Self {
        if viewer.id == owner.id || OwnerScope::for_viewer(viewer).covers(owner) {
            return BoardAccess::Full;
        }
        match membership {
            Some(role) if role.is_manager() => BoardAccess::Full,
            Some(role) => BoardAccess::Member(role),
            None => BoardAccess::None,
        }
    }

    pub fn can_view(&self) -> bool {
        !matches!(self, BoardAccess::None)
    }

    /// Create and change lists and cards
    pub fn can_edit(&self) -> bool {
        matches!(self, BoardAccess::Full | BoardAccess::Member(MemberRole::Member))
    }

    /// Change the board itself, its members and its configuration
    pub fn can_manage(&self) -> bool {
        matches!(self, BoardAccess::Full)
    }

    pub fn sees_all_cards(&self) -> bool {
        matches!(self, BoardAccess::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(user_type: UserType, company: Option<Uuid>, department: Option<Uuid>) -> Viewer {
        Viewer {
            id: Uuid::new_v4(),
            user_type,
            company_id: company,
            department_id: department,
        }
    }

    fn owner(user_type: UserType, company: Option<Uuid>, department: Option<Uuid>) -> OwnerProfile {
        OwnerProfile {
            id: Uuid::new_v4(),
            user_type,
            company_id: company,
            department_id: department,
        }
    }

    #[test]
    fn staff_sees_only_own_boards() {
        let dept = Some(Uuid::new_v4());
        let me = viewer(UserType::Staff, None, dept);
        let scope = OwnerScope::for_viewer(&me);
        assert_eq!(scope, OwnerScope::Own(me.id));
        assert!(!scope.covers(&owner(UserType::Staff, None, dept)));
    }

    #[test]
    fn manager_covers_department_staff_only() {
        let dept = Some(Uuid::new_v4());
        let me = viewer(UserType::Manager, None, dept);
        let scope = OwnerScope::for_viewer(&me);

        assert!(scope.covers(&owner(UserType::Staff, None, dept)));
        assert!(!scope.covers(&owner(UserType::Manager, None, dept)));
        assert!(!scope.covers(&owner(UserType::Staff, None, Some(Uuid::new_v4()))));
    }

    #[test]
    fn manager_without_department_falls_back_to_own() {
        let me = viewer(UserType::Manager, Some(Uuid::new_v4()), None);
        assert_eq!(OwnerScope::for_viewer(&me), OwnerScope::Own(me.id));
    }

    #[test]
    fn boss_covers_whole_company() {
        let company = Some(Uuid::new_v4());
        let me = viewer(UserType::Boss, company, None);
        let scope = OwnerScope::for_viewer(&me);

        assert!(scope.covers(&owner(UserType::Manager, company, Some(Uuid::new_v4()))));
        assert!(!scope.covers(&owner(UserType::Staff, Some(Uuid::new_v4()), None)));
    }

    #[test]
    fn predicate_binds_viewer_and_department() {
        let me = viewer(UserType::Manager, None, Some(Uuid::new_v4()));
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM boards b WHERE ");
        OwnerScope::for_viewer(&me).push_predicate(&mut query, "b.owner_id");
        let sql = query.sql();
        assert!(sql.contains("b.owner_id = $1"));
        assert!(sql.contains("scope_u.department_id = $2"));
    }

    #[test]
    fn access_levels() {
        let me = viewer(UserType::Staff, None, None);
        let stranger = owner(UserType::Staff, None, None);

        assert_eq!(BoardAccess::resolve(&me, &stranger, None), BoardAccess::None);
        assert_eq!(
            BoardAccess::resolve(&me, &stranger, Some(MemberRole::Admin)),
            BoardAccess::Full
        );

        let member = BoardAccess::resolve(&me, &stranger, Some(MemberRole::Member));
        assert!(member.can_view() && member.can_edit());
        assert!(!member.can_manage() && !member.sees_all_cards());

        let read_only = BoardAccess::resolve(&me, &stranger, Some(MemberRole::Viewer));
        assert!(read_only.can_view());
        assert!(!read_only.can_edit());

        let mine = OwnerProfile { id: me.id, ..stranger };
        assert_eq!(BoardAccess::resolve(&me, &mine, None), BoardAccess::Full);
    }
}
