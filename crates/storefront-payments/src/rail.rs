//! Payment Rails
//!
//! The two checkout paths differ in currency, units and confirmation
//! artifact, so they are modelled as a closed enum rather than a shared
//! base type.

use serde::{Deserialize, Serialize};

/// Which provider path a checkout or webhook belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rail {
    /// Stripe, USD, cents-denominated
    Card,
    /// Mercado Pago, BRL, major units, installments
    Regional,
}

impl Rail {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Regional => "regional",
        }
    }

    /// ISO 4217 code of the currency this rail charges in
    pub const fn currency(self) -> &'static str {
        match self {
            Self::Card => "USD",
            Self::Regional => "BRL",
        }
    }

    pub const fn provider(self) -> &'static str {
        match self {
            Self::Card => "stripe",
            Self::Regional => "mercadopago",
        }
    }
}

impl std::fmt::Display for Rail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-agnostic payment status carried by webhook events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Failed,
    Cancelled,
    Refunded,
    /// Notification did not say; ask the provider
    Unknown,
}

impl PaymentStatus {
    /// No further transitions expected except a refund of an approved payment
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Failed | Self::Cancelled | Self::Refunded
        )
    }

    /// Whether an order currently in `self` may move to `next`
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (_, Self::Unknown) => false,
            (Self::Approved, Self::Refunded) => true,
            (current, _) if current.is_terminal() => false,
            _ => true,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rail_currency() {
        assert_eq!(Rail::Card.currency(), "USD");
        assert_eq!(Rail::Regional.currency(), "BRL");
    }

    #[test]
    fn test_status_transitions() {
        use PaymentStatus::{Approved, Failed, Pending, Refunded, Unknown};

        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Failed));
        assert!(Approved.can_transition_to(Refunded));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Unknown));
    }
}
