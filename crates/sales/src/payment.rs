use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::PartiallyPaid => "PARTIALLY_PAID",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    /// Status implied by the amount paid against the order total.
    pub fn for_amounts(amount_paid: Decimal, total: Decimal) -> Self {
        if amount_paid >= total {
            PaymentStatus::Paid
        } else if amount_paid > Decimal::ZERO {
            PaymentStatus::PartiallyPaid
        } else {
            PaymentStatus::Pending
        }
    }
}

impl core::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PARTIALLY_PAID" => Ok(PaymentStatus::PartiallyPaid),
            "PAID" => Ok(PaymentStatus::Paid),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::validation(format!("unknown payment status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Mobile,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Mobile => "MOBILE",
            PaymentMethod::Other => "OTHER",
        }
    }
}

impl core::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD" => Ok(PaymentMethod::Card),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "MOBILE" => Ok(PaymentMethod::Mobile),
            "OTHER" => Ok(PaymentMethod::Other),
            other => Err(DomainError::validation(format!("unknown payment method: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_follows_amount_paid() {
        assert_eq!(PaymentStatus::for_amounts(dec!(0), dec!(10)), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::for_amounts(dec!(4), dec!(10)), PaymentStatus::PartiallyPaid);
        assert_eq!(PaymentStatus::for_amounts(dec!(10), dec!(10)), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::for_amounts(dec!(0), dec!(0)), PaymentStatus::Paid);
    }
}
