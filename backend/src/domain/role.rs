//! Account roles and the permissions they grant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Raised when a role name is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{value}`")]
pub struct RoleParseError {
    /// Rejected input.
    pub value: String,
}

/// Closed set of account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator.
    Admin,
    /// Building contractor.
    Contractor,
    /// Product manufacturer.
    Manufacturer,
    /// Interior or architectural designer.
    Designer,
    /// Home owner.
    Homeowner,
}

/// Capabilities checked by callers before mutating shared data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Administrative actions.
    Admin,
    /// Baseline actions every account may perform.
    User,
    /// Contractor-only actions.
    Contractor,
    /// Manufacturer-only actions.
    Manufacturer,
    /// Designer-only actions.
    Designer,
    /// Homeowner-only actions.
    Homeowner,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Admin,
        Self::Contractor,
        Self::Manufacturer,
        Self::Designer,
        Self::Homeowner,
    ];

    /// Stored and wire name of the role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Contractor => "contractor",
            Self::Manufacturer => "manufacturer",
            Self::Designer => "designer",
            Self::Homeowner => "homeowner",
        }
    }

    /// Permissions held by this role.
    ///
    /// Admins hold everything; every other role holds `User` plus its own
    /// permission.
    pub const fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Admin => &[
                Permission::Admin,
                Permission::User,
                Permission::Contractor,
                Permission::Manufacturer,
                Permission::Designer,
                Permission::Homeowner,
            ],
            Self::Contractor => &[Permission::User, Permission::Contractor],
            Self::Manufacturer => &[Permission::User, Permission::Manufacturer],
            Self::Designer => &[Permission::User, Permission::Designer],
            Self::Homeowner => &[Permission::User, Permission::Homeowner],
        }
    }

    /// Whether this role grants `permission`.
    pub fn has_permission(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| RoleParseError {
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn admin_holds_every_permission() {
        for permission in [
            Permission::Admin,
            Permission::User,
            Permission::Contractor,
            Permission::Manufacturer,
            Permission::Designer,
            Permission::Homeowner,
        ] {
            assert!(Role::Admin.has_permission(permission));
        }
    }

    #[rstest]
    #[case(Role::Contractor, Permission::Contractor)]
    #[case(Role::Manufacturer, Permission::Manufacturer)]
    #[case(Role::Designer, Permission::Designer)]
    #[case(Role::Homeowner, Permission::Homeowner)]
    fn other_roles_hold_user_and_their_own(#[case] role: Role, #[case] own: Permission) {
        assert_eq!(role.permissions(), &[Permission::User, own]);
        assert!(!role.has_permission(Permission::Admin));
    }

    #[rstest]
    fn names_round_trip_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[rstest]
    #[case("Admin")]
    #[case("plumber")]
    #[case("")]
    fn unknown_names_are_rejected(#[case] raw: &str) {
        assert!(raw.parse::<Role>().is_err());
    }
}
