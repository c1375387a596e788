//! # Access Capabilities
//!
//! The signed-in user's role is turned into a [`Capabilities`] value once,
//! at the request boundary. Commands ask the capabilities, never the role.
//!
//! ```text
//! ┌───────────────────────┬─────────┬──────────┐
//! │ capability            │ owner   │ cashier  │
//! ├───────────────────────┼─────────┼──────────┤
//! │ select any outlet     │   ✔     │  own     │
//! │ manage discounts      │   ✔     │          │
//! │ manage catalog        │   ✔     │          │
//! │ view all sessions     │   ✔     │  own     │
//! └───────────────────────┴─────────┴──────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Cashier,
}

/// What an actor may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Capabilities {
    pub can_select_outlet: bool,
    pub can_manage_discounts: bool,
    pub can_manage_catalog: bool,
    pub can_view_all_sessions: bool,
}

impl Capabilities {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Owner => Capabilities {
                can_select_outlet: true,
                can_manage_discounts: true,
                can_manage_catalog: true,
                can_view_all_sessions: true,
            },
            Role::Cashier => Capabilities {
                can_select_outlet: false,
                can_manage_discounts: false,
                can_manage_catalog: false,
                can_view_all_sessions: false,
            },
        }
    }

    pub fn require_manage_discounts(&self) -> CoreResult<()> {
        require(self.can_manage_discounts, "manage discount rules")
    }

    pub fn require_manage_catalog(&self) -> CoreResult<()> {
        require(self.can_manage_catalog, "manage the catalog")
    }
}

fn require(allowed: bool, action: &str) -> CoreResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(CoreError::Forbidden {
            action: action.to_string(),
        })
    }
}

/// An authenticated user, as resolved by whatever sits in front of the
/// backoffice commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    /// Home outlet; cashiers are pinned to it.
    pub outlet_id: Option<String>,
}

impl Actor {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_role(self.role)
    }

    /// Outlet this actor operates on for a request.
    ///
    /// Actors who may select an outlet get the requested one (or their home
    /// outlet). Everyone else gets their home outlet, and asking for another
    /// one is forbidden.
    pub fn resolve_outlet(&self, requested: Option<&str>) -> CoreResult<String> {
        let requested = requested.map(str::trim).filter(|id| !id.is_empty());

        if self.capabilities().can_select_outlet {
            return requested
                .map(str::to_string)
                .or_else(|| self.outlet_id.clone())
                .ok_or_else(|| {
                    ValidationError::Required {
                        field: "outlet_id".to_string(),
                    }
                    .into()
                });
        }

        let home = self.outlet_id.clone().ok_or_else(|| CoreError::Forbidden {
            action: "sell without an assigned outlet".to_string(),
        })?;

        match requested {
            Some(other) if other != home => Err(CoreError::Forbidden {
                action: format!("operate on outlet {}", other),
            }),
            _ => Ok(home),
        }
    }

    /// Whether this actor may look at another cashier's session.
    pub fn can_view_session_of(&self, cashier_id: &str) -> bool {
        self.capabilities().can_view_all_sessions || self.user_id == cashier_id
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, outlet: Option<&str>) -> Actor {
        Actor {
            user_id: "u1".to_string(),
            name: "Budi".to_string(),
            role,
            outlet_id: outlet.map(str::to_string),
        }
    }

    #[test]
    fn test_role_capabilities() {
        let owner = actor(Role::Owner, None).capabilities();
        assert!(owner.can_select_outlet && owner.can_manage_discounts);
        assert!(owner.require_manage_discounts().is_ok());

        let cashier = actor(Role::Cashier, Some("o1")).capabilities();
        assert!(!cashier.can_manage_discounts);
        assert!(matches!(
            cashier.require_manage_discounts(),
            Err(CoreError::Forbidden { .. })
        ));
        assert!(cashier.require_manage_catalog().is_err());
    }

    #[test]
    fn test_cashier_pinned_to_own_outlet() {
        let cashier = actor(Role::Cashier, Some("o1"));
        assert_eq!(cashier.resolve_outlet(None).unwrap(), "o1");
        assert_eq!(cashier.resolve_outlet(Some("o1")).unwrap(), "o1");
        assert!(matches!(
            cashier.resolve_outlet(Some("o2")),
            Err(CoreError::Forbidden { .. })
        ));

        let homeless = actor(Role::Cashier, None);
        assert!(homeless.resolve_outlet(None).is_err());
    }

    #[test]
    fn test_owner_selects_outlet() {
        let owner = actor(Role::Owner, Some("o1"));
        assert_eq!(owner.resolve_outlet(Some("o2")).unwrap(), "o2");
        assert_eq!(owner.resolve_outlet(None).unwrap(), "o1");

        let roaming = actor(Role::Owner, None);
        assert!(matches!(
            roaming.resolve_outlet(Some(" ")),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_session_visibility() {
        let cashier = actor(Role::Cashier, Some("o1"));
        assert!(cashier.can_view_session_of("u1"));
        assert!(!cashier.can_view_session_of("u2"));
        assert!(actor(Role::Owner, None).can_view_session_of("u2"));
    }
}
