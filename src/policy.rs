use crate::{auth::AuthUser, error::AppError, models::Role};

/// What an operation targets. Articles carry their owner so ownership can be checked
/// without another lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Article { owner_id: i32 },
    /// The article collection: listing and creating.
    Articles,
    Dashboard,
    Category,
    Country,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    View,
    Create,
    Edit,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// authorize
///
/// The single authorization gate of the admin surface.
/// - Admin: everything.
/// - Editor: the dashboard, the article collection, and individual articles it owns.
/// - No principal: nothing.
pub fn authorize(principal: Option<&AuthUser>, resource: Resource, _op: Operation) -> Decision {
    let Some(principal) = principal else {
        return Decision::Deny;
    };

    match (principal.role, resource) {
        (Role::Admin, _) => Decision::Allow,
        (Role::Editor, Resource::Article { owner_id }) if owner_id == principal.id => {
            Decision::Allow
        }
        (Role::Editor, Resource::Articles | Resource::Dashboard) => Decision::Allow,
        (Role::Editor, _) => Decision::Deny,
    }
}

/// Turns a denial into the matching error: 401 without a principal, 403 otherwise.
pub fn require(
    principal: Option<&AuthUser>,
    resource: Resource,
    op: Operation,
) -> Result<(), AppError> {
    match authorize(principal, resource, op) {
        Decision::Allow => Ok(()),
        Decision::Deny if principal.is_none() => Err(AppError::Unauthorized),
        Decision::Deny => {
            if let Some(user) = principal {
                tracing::warn!(
                    user_id = user.id,
                    role = %user.role,
                    ?resource,
                    ?op,
                    "authorization denied"
                );
            }
            Err(AppError::Forbidden)
        }
    }
}

/// Named route policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    AdminOnly,
    EditorOrAdmin,
}

impl Policy {
    pub fn allows(&self, role: Role) -> bool {
        match self {
            Policy::AdminOnly => role == Role::Admin,
            Policy::EditorOrAdmin => matches!(role, Role::Admin | Role::Editor),
        }
    }
}

pub fn require_policy(user: &AuthUser, policy: Policy) -> Result<(), AppError> {
    if policy.allows(user.role) {
        Ok(())
    } else {
        tracing::warn!(user_id = user.id, ?policy, "route policy denied");
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32, role: Role) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{id}"),
            role,
            session_id: None,
        }
    }

    const ALL_OPS: [Operation; 5] = [
        Operation::List,
        Operation::View,
        Operation::Create,
        Operation::Edit,
        Operation::Delete,
    ];

    #[test]
    fn admin_is_allowed_everything() {
        let admin = user(1, Role::Admin);
        let resources = [
            Resource::Article { owner_id: 99 },
            Resource::Articles,
            Resource::Dashboard,
            Resource::Category,
            Resource::Country,
            Resource::User,
        ];
        for resource in resources {
            for op in ALL_OPS {
                assert_eq!(authorize(Some(&admin), resource, op), Decision::Allow);
            }
        }
    }

    #[test]
    fn editor_only_touches_own_articles() {
        let editor = user(7, Role::Editor);
        for op in ALL_OPS {
            assert_eq!(
                authorize(Some(&editor), Resource::Article { owner_id: 7 }, op),
                Decision::Allow
            );
            assert_eq!(
                authorize(Some(&editor), Resource::Article { owner_id: 8 }, op),
                Decision::Deny
            );
        }
        assert_eq!(
            authorize(Some(&editor), Resource::Articles, Operation::Create),
            Decision::Allow
        );
    }

    #[test]
    fn editor_cannot_manage_reference_data_or_users() {
        let editor = user(7, Role::Editor);
        for resource in [Resource::Category, Resource::Country, Resource::User] {
            for op in ALL_OPS {
                assert_eq!(authorize(Some(&editor), resource, op), Decision::Deny);
            }
        }
    }

    #[test]
    fn missing_principal_is_unauthorized_not_forbidden() {
        assert_eq!(
            authorize(None, Resource::Articles, Operation::List),
            Decision::Deny
        );
        assert!(matches!(
            require(None, Resource::Articles, Operation::List),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            require(Some(&user(7, Role::Editor)), Resource::User, Operation::List),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn route_policies() {
        assert!(require_policy(&user(1, Role::Admin), Policy::AdminOnly).is_ok());
        assert!(require_policy(&user(2, Role::Editor), Policy::EditorOrAdmin).is_ok());
        assert!(matches!(
            require_policy(&user(2, Role::Editor), Policy::AdminOnly),
            Err(AppError::Forbidden)
        ));
    }
}
