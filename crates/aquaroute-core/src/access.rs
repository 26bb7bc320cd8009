//! # Access Control
//!
//! One permission check at the domain boundary: `can(actor, action, resource)`.
//! Identity itself comes from the upstream auth service; this module only
//! decides what an already-identified role may do.
//!
//! ## Permission Matrix
//! ```text
//! ┌────────────┬─────────┬─────────┬─────────┬─────────┬───────────┬─────────┬────────┐
//! │ role       │customer │ product │  order  │  route  │ inventory │ finance │ report │
//! ├────────────┼─────────┼─────────┼─────────┼─────────┼───────────┼─────────┼────────┤
//! │ admin      │  CRUD   │  CRUD   │  CRUD   │  CRUD   │   CRUD    │  CRUD   │  CRUD  │
//! │ seller     │  CRU    │   R     │  CRU    │   R     │    R      │   -     │   R    │
//! │ delivery   │   R     │   R     │  CR     │   RU    │    R      │   -     │   -    │
//! │ collector  │   R     │   -     │   RU    │   R     │    -      │   CR    │   R    │
//! └────────────┴─────────┴─────────┴─────────┴─────────┴───────────┴─────────┴────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    Seller,
    Delivery,
    Collector,
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "seller" => Ok(Role::Seller),
            "delivery" => Ok(Role::Delivery),
            "collector" => Ok(Role::Collector),
            _ => Err(crate::error::ValidationError::invalid_format(
                "role",
                "expected admin, seller, delivery or collector",
            )
            .into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Resource {
    Customer,
    Product,
    Order,
    Route,
    Inventory,
    Finance,
    Report,
}

/// The identified user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Actor { id: id.into(), role }
    }

    /// Whether this actor may perform `action` on `resource`.
    pub fn can(&self, action: Action, resource: Resource) -> bool {
        can(self.role, action, resource)
    }

    /// Like [`Actor::can`] but as a `PermissionDenied` error.
    pub fn ensure(&self, action: Action, resource: Resource) -> CoreResult<()> {
        if self.can(action, resource) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                role: self.role,
                action,
                resource,
            })
        }
    }
}

/// The permission matrix above, as a function.
pub fn can(role: Role, action: Action, resource: Resource) -> bool {
    use Action::*;
    use Resource::*;

    match role {
        Role::Admin => true,
        Role::Seller => match resource {
            Customer | Order => matches!(action, Read | Create | Update),
            Product | Route | Inventory | Report => action == Read,
            Finance => false,
        },
        Role::Delivery => match resource {
            Customer | Product | Inventory => action == Read,
            Order => matches!(action, Read | Create),
            Route => matches!(action, Read | Update),
            Finance | Report => false,
        },
        Role::Collector => match resource {
            Customer | Route | Report => action == Read,
            Order => matches!(action, Read | Update),
            Finance => matches!(action, Read | Create),
            Product | Inventory => false,
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
