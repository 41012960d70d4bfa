/// Highest accepted unit price, in minor units.
pub const MAX_PRICE_MINOR: u64 = 1_000_000_000_000;

/// A menu item as held by the Menu API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_minor: u64,
    pub stock: u32,
    pub image_ref: String,
    /// Deleted from the catalog. Kept so that cancelled orders can still
    /// give their stock back.
    pub retired: bool,
}

impl MenuItem {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Validated payload for creating a menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCreate {
    pub name: String,
    pub description: String,
    pub price_minor: u64,
    pub stock: u32,
    pub image_ref: String,
}

/// Validated full replacement of an existing menu item's editable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuUpdate {
    pub name: String,
    pub description: String,
    pub price_minor: u64,
    pub stock: u32,
    pub image_ref: String,
}

/// Which menu items a list request should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuQuery {
    #[default]
    All,
    InStock,
}

/// Raw menu form input, before validation.
///
/// Price and stock are signed so that a negative entry can be reported
/// instead of silently wrapping.
#[derive(Debug, Clone, Default)]
pub struct MenuDraft {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub image_ref: String,
}

impl MenuDraft {
    pub fn new(name: impl Into<String>, price: i64, stock: i64) -> Self {
        Self {
            name: name.into(),
            price,
            stock,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = image_ref.into();
        self
    }

    /// Validates the draft for creation. New items must have a positive price.
    pub fn into_create(self) -> Result<MenuCreate, String> {
        let (name, price_minor, stock) = self.checked_fields()?;
        if price_minor == 0 {
            return Err("Menu price must be greater than 0".to_string());
        }
        Ok(MenuCreate {
            name,
            description: self.description,
            price_minor,
            stock,
            image_ref: self.image_ref,
        })
    }

    pub fn into_update(self) -> Result<MenuUpdate, String> {
        let (name, price_minor, stock) = self.checked_fields()?;
        Ok(MenuUpdate {
            name,
            description: self.description,
            price_minor,
            stock,
            image_ref: self.image_ref,
        })
    }

    fn checked_fields(&self) -> Result<(String, u64, u32), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Menu name must not be empty".to_string());
        }
        let price_minor =
            u64::try_from(self.price).map_err(|_| "Menu price must not be negative".to_string())?;
        if price_minor > MAX_PRICE_MINOR {
            return Err(format!("Menu price must not exceed {}", MAX_PRICE_MINOR));
        }
        let stock = checked_stock(self.stock)?;
        Ok((name.to_string(), price_minor, stock))
    }
}

/// Validates a raw stock entry.
pub fn checked_stock(stock: i64) -> Result<u32, String> {
    if stock < 0 {
        return Err("Menu stock must not be negative".to_string());
    }
    u32::try_from(stock).map_err(|_| format!("Menu stock {} is too large", stock))
}
