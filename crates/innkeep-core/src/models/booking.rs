//! Booking aggregate and its lifecycle
//!
//! A booking moves through a fixed set of states:
//!
//! ```text
//! pending ──confirm──▶ confirmed ──check-in──▶ checked-in ──check-out──▶ checked-out
//!    │                    │  │
//!    └──────cancel────────┤  └──no-show──▶ no-show
//!                         ▼
//!                     cancelled
//! ```
//!
//! State-specific data lives inside [`BookingState`], so a booking cannot
//! carry check-out details while pending or a cancellation while confirmed.
//! Every transition checks all of its guards before touching the booking:
//! a failed transition leaves the booking exactly as it was.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::cancellation::BookingCancellation;
use super::inventory::stay_dates;
use super::pricing::{BookingPricing, ExtraCharge, ExtraChargeCategory, NewExtraCharge};
use super::room::RoomRate;
use crate::error::AppError;
use crate::AppResult;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    NoShow,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked-in",
            BookingStatus::CheckedOut => "checked-out",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no-show",
        }
    }

    /// Parse from string (case-insensitive, `_` and `-` interchangeable)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "checked-in" => Some(BookingStatus::CheckedIn),
            "checked-out" => Some(BookingStatus::CheckedOut),
            "cancelled" => Some(BookingStatus::Cancelled),
            "no-show" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }

    /// No transition leaves a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::CheckedOut | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// Whether the booking still holds date inventory
    pub fn holds_inventory(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::CheckedIn
        )
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Refunded,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Partial => write!(f, "partial"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Refunded => write!(f, "refunded"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl PaymentStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "partial" => Some(PaymentStatus::Partial),
            "paid" => Some(PaymentStatus::Paid),
            "refunded" => Some(PaymentStatus::Refunded),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Where the booking came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    #[default]
    Direct,
    WalkIn,
    Phone,
    Ota,
    Corporate,
}

impl fmt::Display for BookingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingSource::Direct => write!(f, "direct"),
            BookingSource::WalkIn => write!(f, "walk_in"),
            BookingSource::Phone => write!(f, "phone"),
            BookingSource::Ota => write!(f, "ota"),
            BookingSource::Corporate => write!(f, "corporate"),
        }
    }
}

/// Lead guest contact details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub nationality: Option<String>,
    pub special_requests: Option<String>,
}

impl GuestDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Room type fields captured at booking time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomTypeSnapshot {
    pub id: Uuid,
    pub name: String,
    pub bed_configuration: String,
    pub max_occupancy: i32,
}

/// A booked line: room type and rate frozen at booking time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedRoom {
    pub room_type: RoomTypeSnapshot,
    pub rate: RoomRate,
    pub quantity: i32,
    pub price_per_night: Decimal,

    /// `price_per_night × quantity × nights`
    pub total_price: Decimal,
}

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Esewa,
    Khalti,
    BankTransfer,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Esewa => write!(f, "esewa"),
            PaymentMethod::Khalti => write!(f, "khalti"),
            PaymentMethod::BankTransfer => write!(f, "bank_transfer"),
            PaymentMethod::Other => write!(f, "other"),
        }
    }
}

/// Outcome of a payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Verified,
    Failed,
}

/// A recorded payment attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub outcome: PaymentOutcome,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Option<String>,
}

/// How the booking got confirmed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub confirmed_at: DateTime<Utc>,
    pub confirmed_by: Option<String>,

    /// Confirmed without a recorded payment
    pub manual_override: bool,
}

/// Front-desk input for check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CheckInDetails {
    pub id_verified: bool,
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    #[serde(default)]
    pub room_numbers: Vec<String>,
    pub checked_in_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub details: CheckInDetails,
    pub checked_in_at: DateTime<Utc>,
}

/// Front-desk input for check-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CheckOutDetails {
    pub room_inspected: bool,
    #[serde(default)]
    pub minibar_charges: Decimal,
    #[serde(default)]
    pub damage_charges: Decimal,
    #[serde(default)]
    pub late_checkout_fee: Decimal,
    pub checked_out_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutRecord {
    pub details: CheckOutDetails,
    pub checked_out_at: DateTime<Utc>,

    /// Amount still owed when the guest left
    pub balance_due: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoShowRecord {
    pub marked_at: DateTime<Utc>,
    pub marked_by: Option<String>,
}

/// Lifecycle state with the data each state owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum BookingState {
    Pending,
    Confirmed {
        confirmation: Confirmation,
    },
    CheckedIn {
        confirmation: Confirmation,
        check_in: CheckInRecord,
    },
    CheckedOut {
        confirmation: Confirmation,
        check_in: CheckInRecord,
        check_out: CheckOutRecord,
    },
    Cancelled {
        confirmation: Option<Confirmation>,
        cancellation: BookingCancellation,
    },
    NoShow {
        confirmation: Confirmation,
        no_show: NoShowRecord,
    },
}

impl BookingState {
    pub fn status(&self) -> BookingStatus {
        match self {
            BookingState::Pending => BookingStatus::Pending,
            BookingState::Confirmed { .. } => BookingStatus::Confirmed,
            BookingState::CheckedIn { .. } => BookingStatus::CheckedIn,
            BookingState::CheckedOut { .. } => BookingStatus::CheckedOut,
            BookingState::Cancelled { .. } => BookingStatus::Cancelled,
            BookingState::NoShow { .. } => BookingStatus::NoShow,
        }
    }
}

/// Compute nights for `[check_in, check_out)`
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> AppResult<i64> {
    let nights = (check_out - check_in).num_days();
    if nights < 1 {
        return Err(AppError::InvalidDateRange {
            check_in: check_in.to_string(),
            check_out: check_out.to_string(),
        });
    }
    Ok(nights)
}

/// Everything needed to open a booking in `pending`
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub hotel_id: Uuid,
    pub booking_number: String,
    pub idempotency_key: Option<String>,
    pub source: BookingSource,
    pub guest: GuestDetails,
    pub adults: i32,
    pub children: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: Vec<BookedRoom>,
    pub pricing: BookingPricing,
}

/// Booking aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub hotel_id: Uuid,

    /// Human-referenceable unique number
    pub booking_number: String,

    /// Client-supplied key making creation retry-safe
    pub idempotency_key: Option<String>,

    pub source: BookingSource,
    pub guest: GuestDetails,
    pub adults: i32,
    pub children: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,

    /// Always `check_out − check_in` in days, ≥ 1
    pub nights: i64,

    pub rooms: Vec<BookedRoom>,
    pub pricing: BookingPricing,
    pub payment_status: PaymentStatus,
    pub payments: Vec<PaymentRecord>,
    pub state: BookingState,

    /// Optimistic concurrency version, bumped on every save
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Open a booking in `pending`
    pub fn new(input: NewBooking, at: DateTime<Utc>) -> AppResult<Self> {
        let nights = nights_between(input.check_in, input.check_out)?;

        if input.rooms.is_empty() {
            return Err(AppError::Validation(
                "a booking needs at least one room".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::now_v7(),
            hotel_id: input.hotel_id,
            booking_number: input.booking_number,
            idempotency_key: input.idempotency_key,
            source: input.source,
            guest: input.guest,
            adults: input.adults,
            children: input.children,
            check_in: input.check_in,
            check_out: input.check_out,
            nights,
            rooms: input.rooms,
            pricing: input.pricing,
            payment_status: PaymentStatus::Pending,
            payments: Vec::new(),
            state: BookingState::Pending,
            version: 0,
            created_at: at,
            updated_at: at,
        })
    }

    #[inline]
    pub fn status(&self) -> BookingStatus {
        self.state.status()
    }

    /// Every stay date of the booking
    pub fn stay_dates(&self) -> Vec<NaiveDate> {
        stay_dates(self.check_in, self.check_out)
    }

    /// Stay dates from `from` onwards (nights not yet used)
    pub fn remaining_dates(&self, from: NaiveDate) -> Vec<NaiveDate> {
        stay_dates(from.max(self.check_in), self.check_out)
    }

    /// Booked quantity per room type
    pub fn room_quantities(&self) -> BTreeMap<Uuid, i32> {
        let mut quantities = BTreeMap::new();
        for room in &self.rooms {
            *quantities.entry(room.room_type.id).or_insert(0) += room.quantity;
        }
        quantities
    }

    pub fn cancellation(&self) -> Option<&BookingCancellation> {
        match &self.state {
            BookingState::Cancelled { cancellation, .. } => Some(cancellation),
            _ => None,
        }
    }

    fn transition_error(&self, to: BookingStatus) -> AppError {
        AppError::InvalidTransition {
            from: self.status().to_string(),
            to: to.to_string(),
        }
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    /// Derive payment status from the amounts, leaving `refunded` alone
    fn refresh_payment_status(&mut self) {
        if self.payment_status == PaymentStatus::Refunded {
            return;
        }
        if self.pricing.amount_paid > Decimal::ZERO {
            self.payment_status = if self.pricing.amount_due.is_zero() {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Partial
            };
        }
    }

    /// pending → confirmed
    ///
    /// Requires a partial or full payment unless `manual_override` is set.
    pub fn confirm(
        &mut self,
        confirmed_by: Option<String>,
        manual_override: bool,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.status() != BookingStatus::Pending {
            return Err(self.transition_error(BookingStatus::Confirmed));
        }

        let paid = matches!(
            self.payment_status,
            PaymentStatus::Partial | PaymentStatus::Paid
        );
        if !paid && !manual_override {
            return Err(AppError::PolicyViolation(format!(
                "booking {} has payment status {}; a payment or manual override is required to confirm",
                self.booking_number, self.payment_status
            )));
        }

        self.state = BookingState::Confirmed {
            confirmation: Confirmation {
                confirmed_at: at,
                confirmed_by,
                manual_override: manual_override && !paid,
            },
        };
        self.touch(at);
        Ok(())
    }

    /// confirmed → checked-in
    ///
    /// `today` is the hotel-local date. Arriving before the check-in date
    /// is refused unless `allow_early` is set.
    pub fn check_in(
        &mut self,
        details: CheckInDetails,
        today: NaiveDate,
        allow_early: bool,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let confirmation = match &self.state {
            BookingState::Confirmed { confirmation } => confirmation.clone(),
            _ => return Err(self.transition_error(BookingStatus::CheckedIn)),
        };

        if !details.id_verified {
            return Err(AppError::PolicyViolation(
                "guest identification must be verified before check-in".to_string(),
            ));
        }
        if details.checked_in_by.trim().is_empty() {
            return Err(AppError::MissingField("checked_in_by".to_string()));
        }
        if today < self.check_in && !allow_early {
            return Err(AppError::PrematureCheckIn {
                check_in: self.check_in.to_string(),
            });
        }
        if today >= self.check_out {
            return Err(AppError::PolicyViolation(format!(
                "stay ended on {}; the booking can only be marked no-show",
                self.check_out
            )));
        }

        self.state = BookingState::CheckedIn {
            confirmation,
            check_in: CheckInRecord {
                details,
                checked_in_at: at,
            },
        };
        self.touch(at);
        Ok(())
    }

    /// checked-in → checked-out
    ///
    /// Minibar, damage and late check-out amounts are appended to the
    /// extra-charge ledger before the booking is closed. Returns the new
    /// ledger entries.
    pub fn check_out(
        &mut self,
        details: CheckOutDetails,
        today: NaiveDate,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<ExtraCharge>> {
        let (confirmation, check_in) = match &self.state {
            BookingState::CheckedIn {
                confirmation,
                check_in,
            } => (confirmation.clone(), check_in.clone()),
            _ => return Err(self.transition_error(BookingStatus::CheckedOut)),
        };

        if !details.room_inspected {
            return Err(AppError::PolicyViolation(
                "rooms must be inspected before check-out".to_string(),
            ));
        }
        if details.checked_out_by.trim().is_empty() {
            return Err(AppError::MissingField("checked_out_by".to_string()));
        }

        let fees = [
            (ExtraChargeCategory::Minibar, details.minibar_charges, "Minibar consumption"),
            (ExtraChargeCategory::Damage, details.damage_charges, "Damage assessed at check-out"),
            (ExtraChargeCategory::LateCheckout, details.late_checkout_fee, "Late check-out fee"),
        ];
        if fees.iter().any(|(_, amount, _)| *amount < Decimal::ZERO) {
            return Err(AppError::Validation(
                "check-out charges must not be negative".to_string(),
            ));
        }

        // Apply to a copy so a failure leaves the ledger untouched
        let mut pricing = self.pricing.clone();
        let mut entries = Vec::new();
        for (category, amount, description) in fees {
            if amount.is_zero() {
                continue;
            }
            entries.push(pricing.add_extra_charge(NewExtraCharge {
                category,
                description: description.to_string(),
                amount,
                quantity: 1,
                date: today,
                created_by: Some(details.checked_out_by.clone()),
            })?);
        }

        self.pricing = pricing;
        self.refresh_payment_status();
        self.state = BookingState::CheckedOut {
            confirmation,
            check_in,
            check_out: CheckOutRecord {
                balance_due: self.pricing.amount_due,
                details,
                checked_out_at: at,
            },
        };
        self.touch(at);
        Ok(entries)
    }

    /// pending | confirmed → cancelled
    ///
    /// Payment status becomes `refunded` only when the whole paid amount is
    /// refunded; otherwise a paid booking is left `partial` for
    /// reconciliation.
    pub fn cancel(&mut self, cancellation: BookingCancellation) -> AppResult<()> {
        let confirmation = match &self.state {
            BookingState::Pending => None,
            BookingState::Confirmed { confirmation } => Some(confirmation.clone()),
            _ => return Err(self.transition_error(BookingStatus::Cancelled)),
        };

        if cancellation.refund_amount < Decimal::ZERO
            || cancellation.refund_amount > self.pricing.amount_paid
        {
            return Err(AppError::Internal(format!(
                "refund {} outside [0, {}]",
                cancellation.refund_amount, self.pricing.amount_paid
            )));
        }

        if self.pricing.amount_paid > Decimal::ZERO {
            self.payment_status = if cancellation.refund_amount == self.pricing.amount_paid {
                PaymentStatus::Refunded
            } else {
                PaymentStatus::Partial
            };
        }

        let at = cancellation.cancelled_at;
        self.state = BookingState::Cancelled {
            confirmation,
            cancellation,
        };
        self.touch(at);
        Ok(())
    }

    /// confirmed → no-show
    ///
    /// Only once the check-in day has fully passed at the hotel.
    pub fn mark_no_show(
        &mut self,
        marked_by: Option<String>,
        today: NaiveDate,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let confirmation = match &self.state {
            BookingState::Confirmed { confirmation } => confirmation.clone(),
            _ => return Err(self.transition_error(BookingStatus::NoShow)),
        };

        if today <= self.check_in {
            return Err(AppError::PolicyViolation(format!(
                "check-in day {} has not elapsed yet",
                self.check_in
            )));
        }

        self.state = BookingState::NoShow {
            confirmation,
            no_show: NoShowRecord {
                marked_at: at,
                marked_by,
            },
        };
        self.touch(at);
        Ok(())
    }

    /// Append an extra charge and refresh the totals
    pub fn add_extra_charge(
        &mut self,
        charge: NewExtraCharge,
        at: DateTime<Utc>,
    ) -> AppResult<ExtraCharge> {
        if matches!(
            self.status(),
            BookingStatus::Cancelled | BookingStatus::NoShow
        ) {
            return Err(AppError::PolicyViolation(format!(
                "cannot add charges to a {} booking",
                self.status()
            )));
        }

        let entry = self.pricing.add_extra_charge(charge)?;
        self.refresh_payment_status();
        self.touch(at);
        Ok(entry)
    }

    /// Record a payment attempt
    ///
    /// Verified payments raise `amount_paid`. A failed attempt is kept for
    /// audit and marks the booking `failed` while nothing has been paid.
    pub fn record_payment(&mut self, payment: PaymentRecord) -> AppResult<()> {
        if matches!(
            self.status(),
            BookingStatus::Cancelled | BookingStatus::NoShow
        ) {
            return Err(AppError::PolicyViolation(format!(
                "cannot take payments on a {} booking",
                self.status()
            )));
        }
        if payment.outcome == PaymentOutcome::Verified && payment.amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }

        let at = payment.recorded_at;
        match payment.outcome {
            PaymentOutcome::Verified => {
                self.pricing.apply_payment(payment.amount);
                self.refresh_payment_status();
            }
            PaymentOutcome::Failed => {
                if self.pricing.amount_paid.is_zero() {
                    self.payment_status = PaymentStatus::Failed;
                }
            }
        }

        self.payments.push(payment);
        self.touch(at);
        Ok(())
    }

    /// Record the gateway's refund outcome for a cancelled booking
    pub fn settle_refund(&mut self, processed: bool, at: DateTime<Utc>) -> AppResult<()> {
        match &mut self.state {
            BookingState::Cancelled { cancellation, .. } => {
                cancellation.settle_refund(processed, at)?;
            }
            _ => {
                return Err(AppError::PolicyViolation(format!(
                    "booking {} is {}; only cancelled bookings carry refunds",
                    self.booking_number,
                    self.status()
                )))
            }
        }
        self.touch(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cancellation::{CancellationPolicy, RefundStatus};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn booked_room(quantity: i32) -> BookedRoom {
        let room_type_id = Uuid::new_v4();
        BookedRoom {
            room_type: RoomTypeSnapshot {
                id: room_type_id,
                name: "Deluxe".to_string(),
                bed_configuration: "1 King".to_string(),
                max_occupancy: 2,
            },
            rate: RoomRate {
                room_type_id,
                price: dec!(9000),
                ..Default::default()
            },
            quantity,
            price_per_night: dec!(9000),
            total_price: dec!(9000) * Decimal::from(quantity) * dec!(3),
        }
    }

    fn pending_booking() -> Booking {
        let mut pricing = BookingPricing {
            room_total: dec!(54000),
            tax_amount: dec!(7020),
            service_charge: dec!(5400),
            ..Default::default()
        };
        pricing.recompute();

        Booking::new(
            NewBooking {
                hotel_id: Uuid::new_v4(),
                booking_number: "BK-260501-TEST0001".to_string(),
                idempotency_key: None,
                source: BookingSource::Direct,
                guest: GuestDetails {
                    first_name: "Asha".to_string(),
                    last_name: "Gurung".to_string(),
                    email: "asha@example.com".to_string(),
                    ..Default::default()
                },
                adults: 2,
                children: 0,
                check_in: date(2026, 5, 10),
                check_out: date(2026, 5, 13),
                rooms: vec![booked_room(2)],
                pricing,
            },
            now(),
        )
        .unwrap()
    }

    fn payment(amount: Decimal, outcome: PaymentOutcome) -> PaymentRecord {
        PaymentRecord {
            id: Uuid::new_v4(),
            amount,
            method: PaymentMethod::Esewa,
            reference: Some("ref-1".to_string()),
            outcome,
            recorded_at: now(),
            recorded_by: None,
        }
    }

    fn verified_id() -> CheckInDetails {
        CheckInDetails {
            id_verified: true,
            checked_in_by: "front-desk".to_string(),
            ..Default::default()
        }
    }

    fn inspected() -> CheckOutDetails {
        CheckOutDetails {
            room_inspected: true,
            checked_out_by: "front-desk".to_string(),
            ..Default::default()
        }
    }

    fn cancellation(refund: Decimal) -> BookingCancellation {
        BookingCancellation {
            reason: "plans changed".to_string(),
            cancelled_at: now(),
            cancelled_by: None,
            hours_before_check_in: 72,
            refund_percentage: dec!(100),
            refund_amount: refund,
            refund_status: RefundStatus::Pending,
            policy: CancellationPolicy::free(48),
            refund_settled_at: None,
        }
    }

    #[test]
    fn test_new_booking_derives_nights() {
        let booking = pending_booking();
        assert_eq!(booking.nights, 3);
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.stay_dates().len(), 3);
    }

    #[test]
    fn test_new_booking_rejects_bad_input() {
        let mut input = NewBooking {
            hotel_id: Uuid::new_v4(),
            booking_number: "BK".to_string(),
            idempotency_key: None,
            source: BookingSource::Direct,
            guest: GuestDetails::default(),
            adults: 1,
            children: 0,
            check_in: date(2026, 5, 10),
            check_out: date(2026, 5, 10),
            rooms: vec![booked_room(1)],
            pricing: BookingPricing::default(),
        };
        let err = Booking::new(input.clone(), now()).unwrap_err();
        assert_eq!(err.error_code(), "invalid_date_range");

        input.check_out = date(2026, 5, 11);
        input.rooms.clear();
        let err = Booking::new(input, now()).unwrap_err();
        assert_eq!(err.error_code(), "validation_error");
    }

    #[test]
    fn test_confirm_requires_payment_or_override() {
        let mut booking = pending_booking();
        let err = booking.confirm(None, false, now()).unwrap_err();
        assert_eq!(err.error_code(), "policy_violation");
        assert_eq!(booking.status(), BookingStatus::Pending);

        booking.confirm(Some("manager".to_string()), true, now()).unwrap();
        assert_eq!(booking.status(), BookingStatus::Confirmed);
    }

    #[test]
    fn test_confirm_after_partial_payment() {
        let mut booking = pending_booking();
        booking
            .record_payment(payment(dec!(20000), PaymentOutcome::Verified))
            .unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Partial);
        assert_eq!(booking.pricing.amount_due, dec!(46420));

        booking.confirm(None, false, now()).unwrap();
        match &booking.state {
            BookingState::Confirmed { confirmation } => assert!(!confirmation.manual_override),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_check_in_guards() {
        let mut booking = pending_booking();

        // Skipping confirmation
        let err = booking
            .check_in(verified_id(), date(2026, 5, 10), false, now())
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_transition");

        booking.confirm(None, true, now()).unwrap();

        let err = booking
            .check_in(CheckInDetails::default(), date(2026, 5, 10), false, now())
            .unwrap_err();
        assert_eq!(err.error_code(), "policy_violation");

        let err = booking
            .check_in(verified_id(), date(2026, 5, 9), false, now())
            .unwrap_err();
        assert_eq!(err.error_code(), "premature_check_in");
        assert_eq!(booking.status(), BookingStatus::Confirmed);

        booking
            .check_in(verified_id(), date(2026, 5, 9), true, now())
            .unwrap();
        assert_eq!(booking.status(), BookingStatus::CheckedIn);
    }

    #[test]
    fn test_check_out_folds_charges_into_ledger() {
        let mut booking = pending_booking();
        booking
            .record_payment(payment(dec!(66420), PaymentOutcome::Verified))
            .unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Paid);

        booking.confirm(None, false, now()).unwrap();
        booking
            .check_in(verified_id(), date(2026, 5, 10), false, now())
            .unwrap();

        let details = CheckOutDetails {
            minibar_charges: dec!(1200),
            late_checkout_fee: dec!(2000),
            ..inspected()
        };
        let entries = booking.check_out(details, date(2026, 5, 13), now()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(booking.pricing.grand_total, dec!(69620));
        assert_eq!(booking.pricing.amount_due, dec!(3200));
        assert_eq!(booking.payment_status, PaymentStatus::Partial);
        match &booking.state {
            BookingState::CheckedOut { check_out, .. } => {
                assert_eq!(check_out.balance_due, dec!(3200))
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_check_out_requires_inspection() {
        let mut booking = pending_booking();
        booking.confirm(None, true, now()).unwrap();
        booking
            .check_in(verified_id(), date(2026, 5, 10), false, now())
            .unwrap();

        let details = CheckOutDetails {
            minibar_charges: dec!(500),
            ..Default::default()
        };
        let err = booking.check_out(details, date(2026, 5, 13), now()).unwrap_err();
        assert_eq!(err.error_code(), "policy_violation");
        assert!(booking.pricing.extra_charges.is_empty());
        assert_eq!(booking.status(), BookingStatus::CheckedIn);
    }

    #[test]
    fn test_check_out_before_check_in_is_invalid() {
        let mut booking = pending_booking();
        booking.confirm(None, true, now()).unwrap();
        let err = booking
            .check_out(inspected(), date(2026, 5, 13), now())
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_transition");
    }

    #[test]
    fn test_cancel_full_refund_marks_refunded() {
        let mut booking = pending_booking();
        booking
            .record_payment(payment(dec!(20000), PaymentOutcome::Verified))
            .unwrap();
        booking.confirm(None, false, now()).unwrap();

        booking.cancel(cancellation(dec!(20000))).unwrap();
        assert_eq!(booking.status(), BookingStatus::Cancelled);
        assert_eq!(booking.payment_status, PaymentStatus::Refunded);
        assert_eq!(
            booking.cancellation().map(|c| c.refund_amount),
            Some(dec!(20000))
        );
    }

    #[test]
    fn test_cancel_partial_refund_stays_partial() {
        let mut booking = pending_booking();
        booking
            .record_payment(payment(dec!(20000), PaymentOutcome::Verified))
            .unwrap();

        booking.cancel(cancellation(dec!(10000))).unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Partial);
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut booking = pending_booking();
        booking.cancel(cancellation(Decimal::ZERO)).unwrap();

        assert_eq!(
            booking.confirm(None, true, now()).unwrap_err().error_code(),
            "invalid_transition"
        );
        assert_eq!(
            booking
                .cancel(cancellation(Decimal::ZERO))
                .unwrap_err()
                .error_code(),
            "invalid_transition"
        );
        assert_eq!(
            booking
                .mark_no_show(None, date(2026, 5, 12), now())
                .unwrap_err()
                .error_code(),
            "invalid_transition"
        );
    }

    #[test]
    fn test_no_show_after_check_in_day() {
        let mut booking = pending_booking();
        booking.confirm(None, true, now()).unwrap();

        let err = booking
            .mark_no_show(None, date(2026, 5, 10), now())
            .unwrap_err();
        assert_eq!(err.error_code(), "policy_violation");

        booking
            .mark_no_show(Some("night-audit".to_string()), date(2026, 5, 11), now())
            .unwrap();
        assert_eq!(booking.status(), BookingStatus::NoShow);
        assert!(booking.status().is_terminal());
    }

    #[test]
    fn test_failed_payment_recorded() {
        let mut booking = pending_booking();
        booking
            .record_payment(payment(dec!(66420), PaymentOutcome::Failed))
            .unwrap();

        assert_eq!(booking.payment_status, PaymentStatus::Failed);
        assert_eq!(booking.payments.len(), 1);
        assert_eq!(booking.pricing.amount_paid, Decimal::ZERO);
    }

    #[test]
    fn test_extra_charge_rejected_after_cancellation() {
        let mut booking = pending_booking();
        booking.cancel(cancellation(Decimal::ZERO)).unwrap();

        let err = booking
            .add_extra_charge(
                NewExtraCharge {
                    category: ExtraChargeCategory::Laundry,
                    description: String::new(),
                    amount: dec!(300),
                    quantity: 1,
                    date: date(2026, 5, 11),
                    created_by: None,
                },
                now(),
            )
            .unwrap_err();
        assert_eq!(err.error_code(), "policy_violation");
    }

    #[test]
    fn test_state_serialization_is_tagged() {
        let mut booking = pending_booking();
        booking.confirm(Some("desk".to_string()), true, now()).unwrap();

        let json = serde_json::to_value(&booking.state).unwrap();
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["confirmation"]["confirmed_by"], "desk");

        let back: BookingState = serde_json::from_value(json).unwrap();
        assert_eq!(back.status(), BookingStatus::Confirmed);
    }

    #[test]
    fn test_remaining_dates() {
        let booking = pending_booking();
        assert_eq!(booking.remaining_dates(date(2026, 5, 12)), vec![date(2026, 5, 12)]);
        assert_eq!(booking.remaining_dates(date(2026, 5, 1)).len(), 3);
        assert!(booking.remaining_dates(date(2026, 5, 13)).is_empty());
    }

    #[test]
    fn test_status_parse_roundtrip_names() {
        assert_eq!(
            BookingStatus::from_str("checked_in"),
            Some(BookingStatus::CheckedIn)
        );
        assert_eq!(BookingStatus::NoShow.to_string(), "no-show");
        assert_eq!(BookingStatus::from_str("archived"), None);
    }
}
