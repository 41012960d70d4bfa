//! Order status transitions.
//!
//! ```text
//! AWAITING_PAYMENT -> PREPARING -> READY -> COMPLETED
//!        |
//!        +--> CANCELLED
//! ```
//!
//! The machine itself does not know who is asking. Dispatching a transition
//! requires an [`AuthorizedTransition`], which only [`Transition::authorize`]
//! hands out after the policy check passes.

use thiserror::Error;

use crate::domain::{OrderStatus, Role};
use crate::policy::{self, Action, Denied, Resource};

impl OrderStatus {
    /// The next status along the fulfilment path, if any.
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::AwaitingPayment => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Completed),
            OrderStatus::Completed | OrderStatus::Cancelled => None,
        }
    }

    /// Cancellation is only possible before payment has been taken.
    pub fn cancel(self) -> Result<OrderStatus, TransitionError> {
        match self {
            OrderStatus::AwaitingPayment => Ok(OrderStatus::Cancelled),
            from => Err(TransitionError {
                from,
                transition: Transition::Cancel,
            }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Advance,
    Cancel,
}

impl Transition {
    pub fn apply(self, from: OrderStatus) -> Result<OrderStatus, TransitionError> {
        match self {
            Transition::Advance => from.next().ok_or(TransitionError {
                from,
                transition: self,
            }),
            Transition::Cancel => from.cancel(),
        }
    }

    /// The policy entry that grants this transition.
    pub fn permission(self) -> (Resource, Action) {
        match self {
            Transition::Advance => (Resource::AllOrders, Action::AdvanceStatus),
            Transition::Cancel => (Resource::OwnOrders, Action::Cancel),
        }
    }

    pub fn authorize(self, role: Role) -> Result<AuthorizedTransition, Denied> {
        let (resource, action) = self.permission();
        policy::authorize(role, resource, action)?;
        Ok(AuthorizedTransition {
            transition: self,
            role,
        })
    }
}

/// Proof that a role passed the policy check for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizedTransition {
    transition: Transition,
    role: Role,
}

impl AuthorizedTransition {
    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn apply(&self, from: OrderStatus) -> Result<OrderStatus, TransitionError> {
        self.transition.apply(from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {transition:?} an order that is {from}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub transition: Transition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_advances_complete_and_a_fourth_has_nowhere_to_go() {
        let mut status = OrderStatus::AwaitingPayment;
        for _ in 0..3 {
            status = status.next().unwrap();
        }
        assert_eq!(status, OrderStatus::Completed);
        assert_eq!(status.next(), None);
    }

    #[test]
    fn cancel_only_from_awaiting_payment() {
        for status in OrderStatus::ALL {
            let result = status.cancel();
            if status == OrderStatus::AwaitingPayment {
                assert_eq!(result, Ok(OrderStatus::Cancelled));
            } else {
                assert_eq!(
                    result,
                    Err(TransitionError {
                        from: status,
                        transition: Transition::Cancel
                    })
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_transitions() {
        for status in [OrderStatus::Completed, OrderStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(Transition::Advance.apply(status).is_err());
            assert!(Transition::Cancel.apply(status).is_err());
        }
    }

    #[test]
    fn ready_advances_to_completed() {
        assert_eq!(
            Transition::Advance.apply(OrderStatus::Ready),
            Ok(OrderStatus::Completed)
        );
    }

    #[test]
    fn only_the_right_role_gets_an_authorized_transition() {
        assert!(Transition::Advance.authorize(Role::Kasir).is_ok());
        assert!(Transition::Advance.authorize(Role::Pembeli).is_err());
        assert!(Transition::Advance.authorize(Role::Admin).is_err());
        assert!(Transition::Cancel.authorize(Role::Pembeli).is_ok());
        assert!(Transition::Cancel.authorize(Role::Kasir).is_err());

        let authorized = Transition::Cancel.authorize(Role::Pembeli).unwrap();
        assert_eq!(authorized.role(), Role::Pembeli);
        assert!(authorized.apply(OrderStatus::Preparing).is_err());
    }
}
