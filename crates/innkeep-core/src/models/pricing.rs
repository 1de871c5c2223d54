//! Booking pricing and extra-charge ledger models
//!
//! `BookingPricing` is the price snapshot stored on a booking. It owns the
//! append-only extra-charge ledger and keeps the derived totals consistent:
//!
//! - `subtotal = room_total + tax_amount + service_charge + Σ extras − discount` (≥ 0)
//! - `grand_total = subtotal`
//! - `amount_due = max(0, grand_total − amount_paid)`

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;
use crate::money::round_currency;
use crate::AppResult;

/// Extra charge category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraChargeCategory {
    Minibar,
    Damage,
    LateCheckout,
    RoomService,
    Restaurant,
    Laundry,
    Transport,
    Other,
    /// Offsetting entry for an earlier charge (may be negative)
    Correction,
}

impl fmt::Display for ExtraChargeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtraChargeCategory::Minibar => "minibar",
            ExtraChargeCategory::Damage => "damage",
            ExtraChargeCategory::LateCheckout => "late_checkout",
            ExtraChargeCategory::RoomService => "room_service",
            ExtraChargeCategory::Restaurant => "restaurant",
            ExtraChargeCategory::Laundry => "laundry",
            ExtraChargeCategory::Transport => "transport",
            ExtraChargeCategory::Other => "other",
            ExtraChargeCategory::Correction => "correction",
        };
        write!(f, "{}", s)
    }
}

impl ExtraChargeCategory {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "minibar" => Some(ExtraChargeCategory::Minibar),
            "damage" => Some(ExtraChargeCategory::Damage),
            "late_checkout" => Some(ExtraChargeCategory::LateCheckout),
            "room_service" => Some(ExtraChargeCategory::RoomService),
            "restaurant" => Some(ExtraChargeCategory::Restaurant),
            "laundry" => Some(ExtraChargeCategory::Laundry),
            "transport" => Some(ExtraChargeCategory::Transport),
            "other" => Some(ExtraChargeCategory::Other),
            "correction" => Some(ExtraChargeCategory::Correction),
            _ => None,
        }
    }
}

/// Input for a new ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExtraCharge {
    pub category: ExtraChargeCategory,
    pub description: String,
    /// Unit amount
    pub amount: Decimal,
    pub quantity: i32,
    pub date: NaiveDate,
    pub created_by: Option<String>,
}

impl NewExtraCharge {
    /// Check quantity and sign rules
    pub fn validate(&self) -> AppResult<()> {
        if self.quantity < 1 {
            return Err(AppError::Validation(
                "extra charge quantity must be at least 1".to_string(),
            ));
        }
        if self.amount < Decimal::ZERO {
            if self.category != ExtraChargeCategory::Correction {
                return Err(AppError::Validation(
                    "negative amounts are only allowed for corrections".to_string(),
                ));
            }
            if self.description.trim().is_empty() {
                return Err(AppError::Validation(
                    "corrections must explain what they correct".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Ledger entry
///
/// Never mutated or removed once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraCharge {
    pub id: Uuid,
    pub category: ExtraChargeCategory,
    pub description: String,
    pub amount: Decimal,
    pub quantity: i32,

    /// `amount × quantity`, rounded to the currency unit
    pub total: Decimal,

    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

/// Price snapshot of a booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingPricing {
    pub currency: String,
    pub room_total: Decimal,
    pub tax_percent: Decimal,
    pub tax_amount: Decimal,
    pub service_charge_percent: Decimal,
    pub service_charge: Decimal,
    pub discount: Decimal,
    pub discount_code: Option<String>,
    pub extra_charges: Vec<ExtraCharge>,
    pub subtotal: Decimal,
    pub grand_total: Decimal,
    pub amount_paid: Decimal,
    pub amount_due: Decimal,
}

impl BookingPricing {
    /// Room total plus tax and service charge, before discount and extras
    #[inline]
    pub fn charges_before_discount(&self) -> Decimal {
        self.room_total + self.tax_amount + self.service_charge
    }

    /// Sum of every ledger entry
    pub fn extra_charges_total(&self) -> Decimal {
        self.extra_charges.iter().map(|c| c.total).sum()
    }

    /// Recompute the derived totals from the components
    pub fn recompute(&mut self) {
        let subtotal =
            self.charges_before_discount() + self.extra_charges_total() - self.discount;
        self.subtotal = subtotal.max(Decimal::ZERO);
        self.grand_total = self.subtotal;
        self.amount_due = (self.grand_total - self.amount_paid).max(Decimal::ZERO);
    }

    /// Append a ledger entry and refresh totals
    pub fn add_extra_charge(&mut self, charge: NewExtraCharge) -> AppResult<ExtraCharge> {
        charge.validate()?;

        let entry = ExtraCharge {
            id: Uuid::new_v4(),
            total: round_currency(charge.amount * Decimal::from(charge.quantity), &self.currency),
            category: charge.category,
            description: charge.description,
            amount: charge.amount,
            quantity: charge.quantity,
            date: charge.date,
            created_at: Utc::now(),
            created_by: charge.created_by,
        };

        self.extra_charges.push(entry.clone());
        self.recompute();
        Ok(entry)
    }

    /// Record money received and refresh totals
    pub fn apply_payment(&mut self, amount: Decimal) {
        self.amount_paid += amount;
        self.recompute();
    }
}

impl Default for BookingPricing {
    fn default() -> Self {
        Self {
            currency: "NPR".to_string(),
            room_total: Decimal::ZERO,
            tax_percent: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            service_charge_percent: Decimal::ZERO,
            service_charge: Decimal::ZERO,
            discount: Decimal::ZERO,
            discount_code: None,
            extra_charges: Vec::new(),
            subtotal: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            amount_paid: Decimal::ZERO,
            amount_due: Decimal::ZERO,
        }
    }
}
