use crate::actor_framework::{Caller, Entity, Operation};
use crate::domain::{MenuCreate, MenuItem, MenuQuery, MenuUpdate, MAX_PRICE_MINOR};
use crate::error::ApiError;
use crate::policy::{self, Action, Resource};
use super::actions::{MenuAction, MenuActionResult};

impl Entity for MenuItem {
    type Id = String;
    type CreatePayload = MenuCreate;
    type Patch = MenuUpdate;
    type Query = MenuQuery;
    type Action = MenuAction;
    type ActionResult = MenuActionResult;

    fn id(&self) -> &String {
        &self.id
    }

    fn from_create(id: String, payload: MenuCreate) -> Result<Self, ApiError> {
        if payload.name.trim().is_empty() {
            return Err(ApiError::Rejected("Menu name must not be empty".to_string()));
        }
        if payload.price_minor == 0 {
            return Err(ApiError::Rejected("Menu price must be greater than 0".to_string()));
        }
        check_price(payload.price_minor)?;
        Ok(Self {
            id,
            name: payload.name,
            description: payload.description,
            price_minor: payload.price_minor,
            stock: payload.stock,
            image_ref: payload.image_ref,
            retired: false,
        })
    }

    /// Stock reservation is reserved for the order service; everything else
    /// follows the menu catalog row of the policy table.
    fn authorize(caller: &Caller, operation: Operation<'_, MenuAction>) -> Result<(), ApiError> {
        let identity = match caller {
            Caller::Service => return Ok(()),
            Caller::User(identity) => identity,
        };
        let allowed = match operation {
            Operation::Create => policy::can_access(identity.role, Resource::MenuCatalog, Action::Create),
            Operation::Read => policy::can_access(identity.role, Resource::MenuCatalog, Action::Read),
            Operation::List => policy::can_access(identity.role, Resource::MenuCatalog, Action::List),
            Operation::Update => policy::can_access(identity.role, Resource::MenuCatalog, Action::Update),
            Operation::Delete => policy::can_access(identity.role, Resource::MenuCatalog, Action::Delete),
            Operation::Action(MenuAction::SetStock(_)) => {
                policy::can_access(identity.role, Resource::MenuCatalog, Action::UpdateStock)
                    || policy::can_access(identity.role, Resource::MenuCatalog, Action::Update)
            }
            Operation::Action(MenuAction::Reserve(_) | MenuAction::Restore(_)) => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "{} may not perform this menu operation",
                identity.role
            )))
        }
    }

    fn on_update(&mut self, patch: MenuUpdate) -> Result<(), ApiError> {
        if patch.name.trim().is_empty() {
            return Err(ApiError::Rejected("Menu name must not be empty".to_string()));
        }
        check_price(patch.price_minor)?;
        self.name = patch.name;
        self.description = patch.description;
        self.price_minor = patch.price_minor;
        self.stock = patch.stock;
        self.image_ref = patch.image_ref;
        Ok(())
    }

    /// Deleted items stay in the store so pending cancellations can still
    /// restore their stock.
    fn retire(&mut self) -> bool {
        self.retired = true;
        true
    }

    fn visible_to(&self, caller: &Caller) -> bool {
        match caller.identity() {
            None => true,
            Some(identity) => !self.retired && policy::can_see_menu_item(identity.role, self),
        }
    }

    fn matches(&self, query: &MenuQuery) -> bool {
        match query {
            MenuQuery::All => true,
            MenuQuery::InStock => self.in_stock(),
        }
    }

    fn handle_action(&mut self, action: MenuAction) -> Result<MenuActionResult, ApiError> {
        match action {
            MenuAction::SetStock(stock) => {
                self.stock = stock;
            }
            MenuAction::Reserve(amount) => {
                if self.retired {
                    return Err(ApiError::Rejected(format!("{} is no longer on the menu", self.name)));
                }
                if self.stock < amount {
                    return Err(ApiError::Rejected(format!(
                        "Insufficient stock for {}: {} available, {} requested",
                        self.name, self.stock, amount
                    )));
                }
                self.stock -= amount;
            }
            MenuAction::Restore(amount) => {
                self.stock = self.stock.saturating_add(amount);
            }
        }
        Ok(MenuActionResult::Stock(self.stock))
    }
}

fn check_price(price_minor: u64) -> Result<(), ApiError> {
    if price_minor > MAX_PRICE_MINOR {
        return Err(ApiError::Rejected(format!(
            "Menu price must not exceed {}",
            MAX_PRICE_MINOR
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Identity, Role};
    use chrono::Utc;

    fn latte(stock: u32) -> MenuItem {
        MenuItem::from_create(
            "menu_1".to_string(),
            MenuCreate {
                name: "Latte".to_string(),
                description: String::new(),
                price_minor: 25000,
                stock,
                image_ref: String::new(),
            },
        )
        .unwrap()
    }

    fn user(role: Role) -> Caller {
        Caller::User(Identity {
            subject: "someone".to_string(),
            name: None,
            role,
            expires_at: Utc::now(),
        })
    }

    #[test]
    fn reserve_fails_without_touching_stock() {
        let mut item = latte(2);
        assert!(matches!(
            item.handle_action(MenuAction::Reserve(3)),
            Err(ApiError::Rejected(_))
        ));
        assert_eq!(item.stock, 2);
        assert_eq!(
            item.handle_action(MenuAction::Reserve(2)),
            Ok(MenuActionResult::Stock(0))
        );
        assert_eq!(
            item.handle_action(MenuAction::Restore(2)),
            Ok(MenuActionResult::Stock(2))
        );
    }

    #[test]
    fn cashier_may_set_stock_but_not_edit_or_reserve() {
        let kasir = user(Role::Kasir);
        assert!(MenuItem::authorize(&kasir, Operation::Action(&MenuAction::SetStock(4))).is_ok());
        assert!(MenuItem::authorize(&kasir, Operation::Update).is_err());
        assert!(MenuItem::authorize(&kasir, Operation::Action(&MenuAction::Reserve(1))).is_err());
        assert!(MenuItem::authorize(&Caller::Service, Operation::Action(&MenuAction::Reserve(1))).is_ok());
    }

    #[test]
    fn admin_may_set_stock_and_customer_may_only_read() {
        assert!(MenuItem::authorize(&user(Role::Admin), Operation::Action(&MenuAction::SetStock(1))).is_ok());
        let pembeli = user(Role::Pembeli);
        assert!(MenuItem::authorize(&pembeli, Operation::List).is_ok());
        assert!(MenuItem::authorize(&pembeli, Operation::Create).is_err());
        assert!(MenuItem::authorize(&pembeli, Operation::Action(&MenuAction::SetStock(1))).is_err());
    }

    #[test]
    fn retired_items_still_take_back_stock_but_cannot_be_reserved() {
        let mut item = latte(1);
        assert!(item.retire());
        assert!(matches!(
            item.handle_action(MenuAction::Reserve(1)),
            Err(ApiError::Rejected(_))
        ));
        assert_eq!(
            item.handle_action(MenuAction::Restore(2)),
            Ok(MenuActionResult::Stock(3))
        );
        assert!(!item.visible_to(&user(Role::Admin)));
        assert!(item.visible_to(&Caller::Service));
    }

    #[test]
    fn customers_do_not_see_sold_out_items() {
        let sold_out = latte(0);
        assert!(!sold_out.visible_to(&user(Role::Pembeli)));
        assert!(sold_out.visible_to(&user(Role::Kasir)));
        assert!(latte(1).visible_to(&user(Role::Pembeli)));
    }

    #[test]
    fn prices_above_the_ceiling_are_rejected() {
        let payload = MenuCreate {
            name: "Gold".to_string(),
            description: String::new(),
            price_minor: MAX_PRICE_MINOR + 1,
            stock: 1,
            image_ref: String::new(),
        };
        assert!(matches!(
            MenuItem::from_create("menu_2".to_string(), payload),
            Err(ApiError::Rejected(_))
        ));
        let mut item = latte(1);
        let patch = MenuUpdate {
            name: "Latte".to_string(),
            description: String::new(),
            price_minor: u64::MAX,
            stock: 1,
            image_ref: String::new(),
        };
        assert!(item.on_update(patch).is_err());
        assert_eq!(item.price_minor, 25000);
    }
}
