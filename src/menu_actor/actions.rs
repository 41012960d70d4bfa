/// Stock operations on a menu item beyond plain CRUD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    /// Overwrites the stock level (cashier stock adjustment).
    SetStock(u32),
    /// Takes stock for an order line. Fails when not enough is left.
    Reserve(u32),
    /// Gives back stock taken by a cancelled order.
    Restore(u32),
}

/// Results from MenuActions: the stock level after the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuActionResult {
    Stock(u32),
}
