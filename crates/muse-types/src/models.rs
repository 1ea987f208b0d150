use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string did not name any variant of a closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}', must be one of: {allowed}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub allowed: String,
}

/// Closed string enums stored as TEXT and sent over the wire verbatim.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                        allowed: $name::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Whether a product can currently be ordered.
    StockStatus as "stock status" {
        InStock => "IN_STOCK",
        OutOfStock => "OUT_OF_STOCK",
    }
}

string_enum! {
    PaymentType as "payment type" {
        CreditCard => "CREDIT_CARD",
        DebitCard => "DEBIT_CARD",
        Upi => "UPI",
        NetBanking => "NET_BANKING",
        CashOnDelivery => "CASH_ON_DELIVERY",
        Wallet => "WALLET",
    }
}

string_enum! {
    /// Order lifecycle. New orders start as `Pending`; the product owner may
    /// set any value, the sweeper only moves `Pending` to `Cancelled`.
    OrderStatus as "status" {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Shipped => "SHIPPED",
        Delivered => "DELIVERED",
        Cancelled => "CANCELLED",
    }
}

impl Default for StockStatus {
    fn default() -> Self {
        Self::InStock
    }
}

/// Price must be a finite, strictly positive number.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Discount is a percentage in `[0, 100]`.
pub fn is_valid_discount(discount: f64) -> bool {
    (0.0..=100.0).contains(&discount)
}

/// Price after discount, rounded to cents.
pub fn discounted_price(price: f64, discount: f64) -> f64 {
    let raw = price * (1.0 - discount / 100.0);
    let rounded = (raw * 100.0).round() / 100.0;
    // Past ~1e306 scaling to cents overflows; such values have no cents anyway.
    if rounded.is_finite() { rounded } else { raw }
}
