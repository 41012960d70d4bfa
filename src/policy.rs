//! Role-based authorization.
//!
//! Every permission is listed explicitly per role. Anything not matched below
//! is denied, so a new resource or action starts out forbidden for everyone.

use std::fmt;
use thiserror::Error;

use crate::domain::{MenuItem, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    MenuCatalog,
    CashierAccounts,
    AllOrders,
    OwnOrders,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::MenuCatalog => "menu catalog",
            Resource::CashierAccounts => "cashier accounts",
            Resource::AllOrders => "all orders",
            Resource::OwnOrders => "own orders",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    List,
    Create,
    Update,
    UpdateStock,
    Delete,
    AdvanceStatus,
    Cancel,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Read,
        Action::List,
        Action::Create,
        Action::Update,
        Action::UpdateStock,
        Action::Delete,
        Action::AdvanceStatus,
        Action::Cancel,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Read => "read",
            Action::List => "list",
            Action::Create => "create",
            Action::Update => "update",
            Action::UpdateStock => "update-stock",
            Action::Delete => "delete",
            Action::AdvanceStatus => "advance-status",
            Action::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

/// A denied `(role, resource, action)` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{role} may not {action} {resource}")]
pub struct Denied {
    pub role: Role,
    pub resource: Resource,
    pub action: Action,
}

pub fn can_access(role: Role, resource: Resource, action: Action) -> bool {
    use Action::*;

    match (role, resource) {
        (Role::Admin, Resource::MenuCatalog) => matches!(action, Read | List | Create | Update | Delete),
        (Role::Admin, Resource::CashierAccounts) => matches!(action, Read | List | Create),
        (Role::Admin, Resource::AllOrders | Resource::OwnOrders) => false,

        (Role::Kasir, Resource::MenuCatalog) => matches!(action, Read | List | UpdateStock),
        (Role::Kasir, Resource::AllOrders) => matches!(action, Read | List | AdvanceStatus),
        (Role::Kasir, Resource::CashierAccounts | Resource::OwnOrders) => false,

        // Customers only see items in stock; see `visible_menu`.
        (Role::Pembeli, Resource::MenuCatalog) => matches!(action, Read | List),
        // Cancel is further limited to AWAITING_PAYMENT by the order state machine.
        (Role::Pembeli, Resource::OwnOrders) => matches!(action, Create | Read | List | Cancel),
        (Role::Pembeli, Resource::CashierAccounts | Resource::AllOrders) => false,
    }
}

pub fn authorize(role: Role, resource: Resource, action: Action) -> Result<(), Denied> {
    if can_access(role, resource, action) {
        Ok(())
    } else {
        Err(Denied {
            role,
            resource,
            action,
        })
    }
}

/// Which orders a role works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Own,
    All,
}

impl OrderScope {
    pub fn resource(self) -> Resource {
        match self {
            OrderScope::Own => Resource::OwnOrders,
            OrderScope::All => Resource::AllOrders,
        }
    }
}

/// The order scope a role may list, or the denial when it has none.
pub fn order_scope(role: Role) -> Result<OrderScope, Denied> {
    match role {
        Role::Pembeli => Ok(OrderScope::Own),
        Role::Kasir => Ok(OrderScope::All),
        Role::Admin => Err(Denied {
            role,
            resource: Resource::AllOrders,
            action: Action::List,
        }),
    }
}

/// Whether a role gets to see a menu item. Customers only see what they
/// can order.
pub fn can_see_menu_item(role: Role, item: &MenuItem) -> bool {
    match role {
        Role::Pembeli => item.in_stock(),
        Role::Admin | Role::Kasir => true,
    }
}

/// Menu items a role gets to see.
pub fn visible_menu(role: Role, items: Vec<MenuItem>) -> Vec<MenuItem> {
    items
        .into_iter()
        .filter(|item| can_see_menu_item(role, item))
        .collect()
}
