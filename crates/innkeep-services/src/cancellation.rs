//! Cancellation and refund resolver
//!
//! Applies a hotel's cancellation policy to a booking. The refund is a
//! percentage of what the guest has paid: the policy's refund percentage
//! when the cancellation is at least `deadline_hours` before the check-in
//! instant, the late percentage (0 unless configured) otherwise.

use chrono::{DateTime, Duration, Utc};
use innkeep_core::{
    models::{Booking, BookingCancellation, Hotel, RefundStatus},
    money::percent_of,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use tracing::debug;

/// Computes refunds for cancellations
pub struct CancellationResolver;

impl CancellationResolver {
    /// Build the cancellation record for `booking`
    ///
    /// `refund_override` replaces the policy's percentage (front-desk
    /// goodwill). The refund is clamped to `[0, amount_paid]` and a zero
    /// refund is settled immediately.
    pub fn resolve(
        booking: &Booking,
        hotel: &Hotel,
        reason: &str,
        cancelled_by: Option<String>,
        refund_override: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> AppResult<BookingCancellation> {
        if reason.trim().is_empty() {
            return Err(AppError::MissingField("reason".to_string()));
        }
        if let Some(percent) = refund_override {
            if !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&percent) {
                return Err(AppError::Validation(format!(
                    "refund override must be between 0 and 100, got {}",
                    percent
                )));
            }
        }

        let policy = hotel.cancellation_policy.clone();
        let check_in_at = hotel.check_in_instant(booking.check_in);
        let within_deadline = now + Duration::hours(policy.deadline_hours) <= check_in_at;

        let refund_percentage = refund_override.unwrap_or(if within_deadline {
            policy.refund_percentage
        } else {
            policy.late_refund_percentage
        });

        let paid = booking.pricing.amount_paid.max(Decimal::ZERO);
        let refund_amount = percent_of(paid, refund_percentage, &booking.pricing.currency)
            .clamp(Decimal::ZERO, paid);

        debug!(
            "Cancellation of {}: {}h before check-in, {} policy, refund {}% = {}",
            booking.booking_number,
            (check_in_at - now).num_hours(),
            policy.policy_type,
            refund_percentage,
            refund_amount
        );

        let (refund_status, refund_settled_at) = if refund_amount.is_zero() {
            (RefundStatus::Processed, Some(now))
        } else {
            (RefundStatus::Pending, None)
        };

        Ok(BookingCancellation {
            reason: reason.trim().to_string(),
            cancelled_at: now,
            cancelled_by,
            hours_before_check_in: (check_in_at - now).num_hours(),
            refund_percentage,
            refund_amount,
            refund_status,
            policy,
            refund_settled_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use innkeep_core::models::{
        BookedRoom, BookingPricing, BookingSource, CancellationPolicy, GuestDetails, NewBooking,
        RoomRate, RoomTypeSnapshot,
    };
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn hotel(policy: CancellationPolicy) -> Hotel {
        Hotel {
            utc_offset_minutes: 0,
            check_in_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            cancellation_policy: policy,
            ..Default::default()
        }
    }

    fn booking_paid(paid: Decimal) -> Booking {
        let room_type_id = Uuid::new_v4();
        let mut pricing = BookingPricing {
            room_total: dec!(54000),
            tax_amount: dec!(7020),
            service_charge: dec!(5400),
            ..Default::default()
        };
        pricing.recompute();
        pricing.apply_payment(paid);

        Booking::new(
            NewBooking {
                hotel_id: Uuid::new_v4(),
                booking_number: "BK-260510-TESTCASE".to_string(),
                idempotency_key: None,
                source: BookingSource::Direct,
                guest: GuestDetails::default(),
                adults: 2,
                children: 0,
                check_in: NaiveDate::from_ymd_opt(2026, 5, 10).unwrap(),
                check_out: NaiveDate::from_ymd_opt(2026, 5, 13).unwrap(),
                rooms: vec![BookedRoom {
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
                    quantity: 2,
                    price_per_night: dec!(9000),
                    total_price: dec!(54000),
                }],
                pricing,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn check_in_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_free_policy_inside_deadline_refunds_everything() {
        let hotel = hotel(CancellationPolicy::free(48));
        let booking = booking_paid(dec!(20000));
        let now = check_in_at() - Duration::hours(72);

        let c = CancellationResolver::resolve(&booking, &hotel, "Change of plans", None, None, now)
            .unwrap();
        assert_eq!(c.refund_amount, dec!(20000));
        assert_eq!(c.refund_percentage, dec!(100));
        assert_eq!(c.refund_status, RefundStatus::Pending);
        assert_eq!(c.hours_before_check_in, 72);
    }

    #[test]
    fn test_free_policy_past_deadline_refunds_nothing() {
        let hotel = hotel(CancellationPolicy::free(48));
        let booking = booking_paid(dec!(20000));
        let now = check_in_at() - Duration::hours(10);

        let c = CancellationResolver::resolve(&booking, &hotel, "Flight cancelled", None, None, now)
            .unwrap();
        assert_eq!(c.refund_amount, Decimal::ZERO);
        assert_eq!(c.refund_status, RefundStatus::Processed);
        assert_eq!(c.refund_settled_at, Some(now));
    }

    #[test]
    fn test_deadline_boundary_is_inclusive() {
        let hotel = hotel(CancellationPolicy::free(48));
        let booking = booking_paid(dec!(20000));

        let exactly = check_in_at() - Duration::hours(48);
        let c = CancellationResolver::resolve(&booking, &hotel, "x", None, None, exactly).unwrap();
        assert_eq!(c.refund_amount, dec!(20000));

        let just_late = exactly + Duration::seconds(1);
        let c = CancellationResolver::resolve(&booking, &hotel, "x", None, None, just_late).unwrap();
        assert_eq!(c.refund_amount, Decimal::ZERO);
    }

    #[test]
    fn test_partial_policy_and_late_percentage() {
        let mut policy = CancellationPolicy::partial(24, dec!(50));
        policy.late_refund_percentage = dec!(25);
        let hotel = hotel(policy);
        let booking = booking_paid(dec!(10001));

        let early = check_in_at() - Duration::days(3);
        let c = CancellationResolver::resolve(&booking, &hotel, "x", None, None, early).unwrap();
        // 5000.5 rounds to the nearest rupee
        assert_eq!(c.refund_amount, dec!(5001));

        let late = check_in_at() - Duration::hours(2);
        let c = CancellationResolver::resolve(&booking, &hotel, "x", None, None, late).unwrap();
        assert_eq!(c.refund_amount, dec!(2500));
    }

    #[test]
    fn test_non_refundable_with_override() {
        let hotel = hotel(CancellationPolicy::non_refundable());
        let booking = booking_paid(dec!(8000));
        let now = check_in_at() - Duration::days(30);

        let c = CancellationResolver::resolve(&booking, &hotel, "x", None, None, now).unwrap();
        assert_eq!(c.refund_amount, Decimal::ZERO);

        let c = CancellationResolver::resolve(
            &booking,
            &hotel,
            "Medical emergency",
            Some("manager".to_string()),
            Some(dec!(100)),
            now,
        )
        .unwrap();
        assert_eq!(c.refund_amount, dec!(8000));
        assert_eq!(c.cancelled_by.as_deref(), Some("manager"));
    }

    #[test]
    fn test_unpaid_booking_refunds_nothing() {
        let hotel = hotel(CancellationPolicy::free(48));
        let booking = booking_paid(Decimal::ZERO);
        let now = check_in_at() - Duration::days(10);

        let c = CancellationResolver::resolve(&booking, &hotel, "x", None, None, now).unwrap();
        assert_eq!(c.refund_amount, Decimal::ZERO);
    }

    #[test]
    fn test_rejects_bad_input() {
        let hotel = hotel(CancellationPolicy::free(48));
        let booking = booking_paid(dec!(100));
        let now = check_in_at() - Duration::days(10);

        assert!(matches!(
            CancellationResolver::resolve(&booking, &hotel, "  ", None, None, now),
            Err(AppError::MissingField(_))
        ));
        assert!(matches!(
            CancellationResolver::resolve(&booking, &hotel, "x", None, Some(dec!(120)), now),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_hotel_offset_moves_deadline() {
        // Kathmandu, UTC+05:45: check-in at 14:00 local is 08:15 UTC
        let mut nepal = hotel(CancellationPolicy::free(48));
        nepal.utc_offset_minutes = 345;
        let booking = booking_paid(dec!(1000));
        let local_check_in = Utc.with_ymd_and_hms(2026, 5, 10, 8, 15, 0).unwrap();

        let at_deadline = local_check_in - Duration::hours(48);
        let c = CancellationResolver::resolve(&booking, &nepal, "x", None, None, at_deadline)
            .unwrap();
        assert_eq!(c.refund_amount, dec!(1000));

        let c = CancellationResolver::resolve(
            &booking,
            &nepal,
            "x",
            None,
            None,
            at_deadline + Duration::minutes(1),
        )
        .unwrap();
        assert_eq!(c.refund_amount, Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn prop_refund_within_paid(
            paid in 0u32..1_000_000,
            refund_pct in 0u32..=100,
            late_pct in 0u32..=100,
            hours_before in -200i64..500,
        ) {
            let mut policy = CancellationPolicy::partial(48, Decimal::from(refund_pct));
            policy.late_refund_percentage = Decimal::from(late_pct);
            let hotel = hotel(policy);
            let booking = booking_paid(Decimal::from(paid));
            let now = check_in_at() - Duration::hours(hours_before);

            let c = CancellationResolver::resolve(&booking, &hotel, "x", None, None, now).unwrap();
            prop_assert!(c.refund_amount >= Decimal::ZERO);
            prop_assert!(c.refund_amount <= booking.pricing.amount_paid);
        }
    }
}
