//! Booking DTOs
//!
//! Request and response types for the booking endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::models::{
    Booking, BookingSource, BookingStatus, CheckInDetails, CheckOutDetails, ExtraChargeCategory,
    GuestDetails, NewExtraCharge, PaymentMethod, PaymentStatus,
};
use innkeep_core::traits::BookingFilter;
use innkeep_core::AppError;
use innkeep_services::{CancelRequest, CreateBookingRequest, PaymentRequest, RoomSelection, StatusUpdate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Header carrying the client's idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Longest idempotency key accepted
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Room type and quantity in a booking request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoomSelectionBody {
    pub room_type_id: Uuid,

    /// Cheapest bookable rate when omitted
    #[serde(default)]
    pub rate_id: Option<Uuid>,

    #[validate(range(min = 1, max = 50, message = "Quantity must be between 1 and 50"))]
    pub quantity: i32,
}

/// Lead guest
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GuestBody {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(max = 100))]
    #[serde(default)]
    pub last_name: String,

    #[validate(email(message = "A valid email is required"))]
    pub email: String,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    pub nationality: Option<String>,

    #[validate(length(max = 1000))]
    pub special_requests: Option<String>,
}

impl From<GuestBody> for GuestDetails {
    fn from(body: GuestBody) -> Self {
        Self {
            first_name: body.first_name.trim().to_string(),
            last_name: body.last_name.trim().to_string(),
            email: body.email.trim().to_string(),
            phone: body.phone,
            nationality: body.nationality,
            special_requests: body.special_requests,
        }
    }
}

/// Booking creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBookingBody {
    pub hotel_id: Uuid,

    #[validate(length(min = 1, max = 20, message = "Between 1 and 20 room selections"), nested)]
    pub rooms: Vec<RoomSelectionBody>,

    pub check_in: NaiveDate,
    pub check_out: NaiveDate,

    #[validate(nested)]
    pub guest: GuestBody,

    #[validate(range(min = 1, message = "At least one adult is required"))]
    pub adults: i32,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub children: i32,

    #[validate(length(max = 50))]
    pub discount_code: Option<String>,

    #[serde(default)]
    pub source: BookingSource,
}

impl From<CreateBookingBody> for CreateBookingRequest {
    fn from(body: CreateBookingBody) -> Self {
        Self {
            hotel_id: body.hotel_id,
            rooms: body
                .rooms
                .into_iter()
                .map(|r| RoomSelection {
                    room_type_id: r.room_type_id,
                    rate_id: r.rate_id,
                    quantity: r.quantity,
                })
                .collect(),
            check_in: body.check_in,
            check_out: body.check_out,
            guest: body.guest.into(),
            adults: body.adults,
            children: body.children,
            discount_code: body.discount_code,
            source: body.source,
        }
    }
}

/// Booking list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilterParams {
    pub hotel_id: Option<Uuid>,
    pub status: Option<String>,
    pub check_in_from: Option<NaiveDate>,
    pub check_in_to: Option<NaiveDate>,
}

impl BookingFilterParams {
    pub fn to_filter(&self) -> Result<BookingFilter, AppError> {
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(
                BookingStatus::from_str(s)
                    .ok_or_else(|| AppError::Validation(format!("unknown status '{}'", s)))?,
            ),
            None => None,
        };

        Ok(BookingFilter {
            hotel_id: self.hotel_id,
            status,
            check_in_from: self.check_in_from,
            check_in_to: self.check_in_to,
        })
    }
}

/// Target status with the details that transition needs
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StatusUpdateBody {
    Confirmed {
        confirmed_by: Option<String>,
        #[serde(default)]
        manual_override: bool,
    },
    CheckedIn(CheckInDetails),
    CheckedOut(CheckOutDetails),
    Cancelled(CancelBody),
    NoShow {
        marked_by: Option<String>,
    },
}

impl From<StatusUpdateBody> for StatusUpdate {
    fn from(body: StatusUpdateBody) -> Self {
        match body {
            StatusUpdateBody::Confirmed {
                confirmed_by,
                manual_override,
            } => StatusUpdate::Confirm {
                confirmed_by,
                manual_override,
            },
            StatusUpdateBody::CheckedIn(details) => StatusUpdate::CheckIn(details),
            StatusUpdateBody::CheckedOut(details) => StatusUpdate::CheckOut(details),
            StatusUpdateBody::Cancelled(cancel) => StatusUpdate::Cancel(cancel.into()),
            StatusUpdateBody::NoShow { marked_by } => StatusUpdate::NoShow { marked_by },
        }
    }
}

/// Cancellation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelBody {
    #[validate(length(min = 1, max = 500, message = "A cancellation reason is required"))]
    pub reason: String,

    pub cancelled_by: Option<String>,

    /// Refund percentage replacing the hotel policy's
    #[serde(default)]
    pub refund_override_percent: Option<Decimal>,
}

impl From<CancelBody> for CancelRequest {
    fn from(body: CancelBody) -> Self {
        Self {
            reason: body.reason,
            cancelled_by: body.cancelled_by,
            refund_override_percent: body.refund_override_percent,
        }
    }
}

/// Extra charge request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExtraChargeBody {
    pub category: ExtraChargeCategory,

    #[validate(length(min = 1, max = 200, message = "Description is required"))]
    pub description: String,

    /// Unit amount; negative only for corrections
    pub amount: Decimal,

    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 1000))]
    pub quantity: i32,

    /// Service date, today when omitted
    pub date: Option<NaiveDate>,

    pub created_by: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

impl ExtraChargeBody {
    pub fn into_charge(self, today: NaiveDate) -> NewExtraCharge {
        NewExtraCharge {
            category: self.category,
            description: self.description,
            amount: self.amount,
            quantity: self.quantity,
            date: self.date.unwrap_or(today),
            created_by: self.created_by,
        }
    }
}

/// Front-desk payment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentBody {
    pub amount: Decimal,
    pub method: PaymentMethod,

    #[validate(length(max = 100))]
    pub reference: Option<String>,

    pub recorded_by: Option<String>,
}

impl From<PaymentBody> for PaymentRequest {
    fn from(body: PaymentBody) -> Self {
        Self {
            amount: body.amount,
            method: body.method,
            reference: body.reference,
            recorded_by: body.recorded_by,
        }
    }
}

/// Gateway payment start
#[derive(Debug, Clone, Deserialize)]
pub struct InitiatePaymentBody {
    pub method: PaymentMethod,
}

/// Gateway payment verification
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyPaymentBody {
    #[validate(length(min = 1, max = 256, message = "Token is required"))]
    pub token: String,
    pub method: PaymentMethod,
}

/// Refund outcome reported by the payment side
#[derive(Debug, Clone, Deserialize)]
pub struct RefundBody {
    pub processed: bool,
}

/// Rooms housekeeping has finished
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CleanRoomsBody {
    #[validate(range(min = 1, max = 500))]
    pub quantity: i32,
}

/// Booking row in listings
#[derive(Debug, Clone, Serialize)]
pub struct BookingSummary {
    pub id: Uuid,
    pub booking_number: String,
    pub hotel_id: Uuid,
    pub guest_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub currency: String,
    pub grand_total: Decimal,
    pub amount_due: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&Booking> for BookingSummary {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            booking_number: booking.booking_number.clone(),
            hotel_id: booking.hotel_id,
            guest_name: booking.guest.full_name(),
            check_in: booking.check_in,
            check_out: booking.check_out,
            nights: booking.nights,
            status: booking.status(),
            payment_status: booking.payment_status,
            currency: booking.pricing.currency.clone(),
            grand_total: booking.pricing.grand_total,
            amount_due: booking.pricing.amount_due,
            created_at: booking.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::validate_input;

    fn body() -> CreateBookingBody {
        serde_json::from_value(serde_json::json!({
            "hotel_id": Uuid::nil(),
            "rooms": [{"room_type_id": Uuid::nil(), "quantity": 2}],
            "check_in": "2026-05-10",
            "check_out": "2026-05-13",
            "guest": {"first_name": "Asha", "email": "asha@example.com"},
            "adults": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_create_body_defaults() {
        let body = body();
        assert!(validate_input(&body, "Booking").is_ok());
        assert_eq!(body.children, 0);
        assert_eq!(body.source, BookingSource::Direct);

        let request = CreateBookingRequest::from(body);
        assert_eq!(request.rooms[0].quantity, 2);
        assert!(request.rooms[0].rate_id.is_none());
    }

    #[test]
    fn test_create_body_rules() {
        let mut bad_email = body();
        bad_email.guest.email = "not-an-email".to_string();
        assert!(validate_input(&bad_email, "Booking").is_err());

        let mut too_many = body();
        too_many.rooms[0].quantity = 51;
        assert!(validate_input(&too_many, "Booking").is_err());

        let mut nobody = body();
        nobody.adults = 0;
        assert!(validate_input(&nobody, "Booking").is_err());
    }

    #[test]
    fn test_status_update_body() {
        let confirm: StatusUpdateBody =
            serde_json::from_str(r#"{"status":"confirmed","manual_override":true}"#).unwrap();
        assert!(matches!(
            StatusUpdate::from(confirm),
            StatusUpdate::Confirm {
                manual_override: true,
                ..
            }
        ));

        let check_in: StatusUpdateBody = serde_json::from_str(
            r#"{"status":"checked-in","id_verified":true,"checked_in_by":"desk","room_numbers":["101"]}"#,
        )
        .unwrap();
        match StatusUpdate::from(check_in) {
            StatusUpdate::CheckIn(details) => assert_eq!(details.room_numbers, vec!["101"]),
            other => panic!("unexpected {:?}", other),
        }

        assert!(serde_json::from_str::<StatusUpdateBody>(r#"{"status":"pending"}"#).is_err());
    }

    #[test]
    fn test_filter_status_parsing() {
        let params = BookingFilterParams {
            status: Some("checked-in".to_string()),
            ..Default::default()
        };
        assert_eq!(params.to_filter().unwrap().status, Some(BookingStatus::CheckedIn));

        let params = BookingFilterParams {
            status: Some("sleeping".to_string()),
            ..Default::default()
        };
        assert!(params.to_filter().is_err());
    }

    #[test]
    fn test_extra_charge_defaults() {
        let body: ExtraChargeBody = serde_json::from_str(
            r#"{"category":"laundry","description":"Express","amount":"450"}"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 5, 11).unwrap();
        let charge = body.into_charge(today);
        assert_eq!(charge.quantity, 1);
        assert_eq!(charge.date, today);
    }
}
