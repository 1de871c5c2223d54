//! Pricing calculator
//!
//! Turns room/rate selections into a `BookingPricing` snapshot:
//! - `room_total = Σ(rate.price × quantity × nights)`
//! - tax and service charge are both taken off `room_total` (no tax-on-tax)
//! - the discount applies to room + tax + service charge, before extras
//! - every component is rounded to the currency unit as it is produced
//!
//! Everything here is a pure function of its inputs.

use chrono::NaiveDate;
use innkeep_core::{
    models::{
        BookedRoom, BookingPricing, DiscountCode, DiscountKind, NewExtraCharge, RoomRate,
        RoomType, RoomTypeSnapshot,
    },
    money::{percent_of, round_currency},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::constants::{MAX_DISCOUNT_PERCENT, MAX_ROOMS_PER_SELECTION};

/// A room type, the rate chosen for it and how many rooms
#[derive(Debug, Clone)]
pub struct PricedSelection {
    pub room_type: RoomType,
    pub rate: RoomRate,
    pub quantity: i32,
}

/// Result of pricing a stay
#[derive(Debug, Clone)]
pub struct PricingQuote {
    pub rooms: Vec<BookedRoom>,
    pub pricing: BookingPricing,
}

/// Pricing calculator
///
/// Holds the hotel-level percentages; one calculator prices any number of
/// stays for the same hotel.
#[derive(Debug, Clone)]
pub struct PricingCalculator {
    currency: String,
    tax_percent: Decimal,
    service_charge_percent: Decimal,
}

impl PricingCalculator {
    /// Create a calculator for a currency and the hotel's percentages
    pub fn new(currency: &str, tax_percent: Decimal, service_charge_percent: Decimal) -> Self {
        Self {
            currency: currency.to_uppercase(),
            tax_percent,
            service_charge_percent,
        }
    }

    /// Price a set of selections for `nights` nights
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A selection has no rooms or a rate of another room type (`Validation`)
    /// - A rate's min/max stay excludes `nights` (`RateNotApplicable`)
    /// - An extra charge is malformed (`Validation`)
    #[instrument(skip(self, selections, discount, extra_charges), fields(selections = selections.len()))]
    pub fn quote(
        &self,
        selections: &[PricedSelection],
        nights: i64,
        discount: Option<&DiscountCode>,
        extra_charges: Vec<NewExtraCharge>,
    ) -> AppResult<PricingQuote> {
        if selections.is_empty() {
            return Err(AppError::Validation(
                "at least one room must be selected".to_string(),
            ));
        }
        if nights < 1 {
            return Err(AppError::Validation(format!(
                "a stay needs at least one night, got {}",
                nights
            )));
        }

        let mut rooms = Vec::with_capacity(selections.len());
        for selection in selections {
            rooms.push(self.price_room(selection, nights)?);
        }

        let room_total: Decimal = rooms.iter().map(|r| r.total_price).sum();
        let tax_amount = percent_of(room_total, self.tax_percent, &self.currency);
        let service_charge = percent_of(room_total, self.service_charge_percent, &self.currency);
        let discountable = room_total + tax_amount + service_charge;
        let discount_amount = discount
            .map(|code| self.discount_amount(code, discountable))
            .unwrap_or(Decimal::ZERO);

        let mut pricing = BookingPricing {
            currency: self.currency.clone(),
            room_total,
            tax_percent: self.tax_percent,
            tax_amount,
            service_charge_percent: self.service_charge_percent,
            service_charge,
            discount: discount_amount,
            discount_code: discount.map(|code| code.code.to_uppercase()),
            ..Default::default()
        };
        pricing.recompute();

        for charge in extra_charges {
            pricing.add_extra_charge(charge)?;
        }

        debug!(
            "Priced {} nights: rooms {} tax {} service {} discount {} total {}",
            nights,
            pricing.room_total,
            pricing.tax_amount,
            pricing.service_charge,
            pricing.discount,
            pricing.grand_total
        );

        Ok(PricingQuote { rooms, pricing })
    }

    fn price_room(&self, selection: &PricedSelection, nights: i64) -> AppResult<BookedRoom> {
        let PricedSelection {
            room_type,
            rate,
            quantity,
        } = selection;

        if !(1..=MAX_ROOMS_PER_SELECTION).contains(quantity) {
            return Err(AppError::Validation(format!(
                "room quantity must be between 1 and {}, got {}",
                MAX_ROOMS_PER_SELECTION, quantity
            )));
        }
        if rate.room_type_id != room_type.id {
            return Err(AppError::Validation(format!(
                "rate {} does not belong to room type {}",
                rate.id, room_type.name
            )));
        }
        if !rate.admits_stay_length(nights) {
            return Err(AppError::RateNotApplicable(stay_length_message(rate, nights)));
        }

        let price_per_night = round_currency(rate.price, &self.currency);
        let total_price = round_currency(
            price_per_night * Decimal::from(*quantity) * Decimal::from(nights),
            &self.currency,
        );

        Ok(BookedRoom {
            room_type: RoomTypeSnapshot {
                id: room_type.id,
                name: room_type.name.clone(),
                bed_configuration: room_type.bed_configuration.clone(),
                max_occupancy: room_type.max_occupancy,
            },
            rate: rate.clone(),
            quantity: *quantity,
            price_per_night,
            total_price,
        })
    }

    /// Discount off `discountable`, never more than `discountable` itself
    fn discount_amount(&self, code: &DiscountCode, discountable: Decimal) -> Decimal {
        let amount = match code.kind {
            DiscountKind::Flat => round_currency(code.value, &self.currency),
            DiscountKind::Percentage => percent_of(
                discountable,
                code.value.min(MAX_DISCOUNT_PERCENT),
                &self.currency,
            ),
        };
        amount.clamp(Decimal::ZERO, discountable.max(Decimal::ZERO))
    }
}

fn stay_length_message(rate: &RoomRate, nights: i64) -> String {
    format!(
        "rate {} allows stays of {}..{} nights, requested {}",
        rate.name,
        rate.min_stay.map_or("1".to_string(), |n| n.to_string()),
        rate.max_stay.map_or("any".to_string(), |n| n.to_string()),
        nights
    )
}

/// Pick the rate for a room type
///
/// A named rate must belong to the room type, be active, cover every stay
/// date and admit the stay length. Without a name the cheapest rate that
/// does all of that is chosen.
pub fn select_rate(
    room_type: &RoomType,
    rates: &[RoomRate],
    rate_id: Option<Uuid>,
    dates: &[NaiveDate],
) -> AppResult<RoomRate> {
    let nights = dates.len() as i64;

    match rate_id {
        Some(id) => {
            let rate = rates
                .iter()
                .find(|r| r.id == id && r.room_type_id == room_type.id)
                .ok_or_else(|| {
                    AppError::RateNotApplicable(format!(
                        "rate {} is not offered for {}",
                        id, room_type.name
                    ))
                })?;

            if !rate.applies_to_stay(dates) {
                return Err(AppError::RateNotApplicable(format!(
                    "rate {} does not apply to every night of the stay",
                    rate.name
                )));
            }
            if !rate.admits_stay_length(nights) {
                return Err(AppError::RateNotApplicable(stay_length_message(rate, nights)));
            }
            Ok(rate.clone())
        }
        None => rates
            .iter()
            .filter(|r| r.room_type_id == room_type.id)
            .filter(|r| r.applies_to_stay(dates) && r.admits_stay_length(nights))
            .min_by(|a, b| a.price.cmp(&b.price))
            .cloned()
            .ok_or_else(|| {
                AppError::RateNotApplicable(format!(
                    "no bookable rate for {} over {} nights",
                    room_type.name, nights
                ))
            }),
    }
}

/// Validate a looked-up discount code for a stay
///
/// `found` is the catalog lookup for `code`; unknown, inactive,
/// out-of-window and too-short-stay codes are all `InvalidDiscountCode`.
pub fn check_discount(
    code: &str,
    found: Option<DiscountCode>,
    check_in: NaiveDate,
    nights: i64,
) -> AppResult<DiscountCode> {
    let discount = found.ok_or_else(|| AppError::InvalidDiscountCode(code.to_string()))?;

    if !discount.is_redeemable(check_in, nights) {
        return Err(AppError::InvalidDiscountCode(format!(
            "{} cannot be used for a {}-night stay from {}",
            code, nights, check_in
        )));
    }
    if discount.value < Decimal::ZERO {
        return Err(AppError::InvalidDiscountCode(format!(
            "{} has a negative value",
            code
        )));
    }
    Ok(discount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use innkeep_core::models::{stay_dates, ExtraChargeCategory};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn deluxe() -> RoomType {
        RoomType {
            name: "Deluxe".to_string(),
            max_occupancy: 2,
            total_rooms: 5,
            ..Default::default()
        }
    }

    fn rate(room_type: &RoomType, price: Decimal) -> RoomRate {
        RoomRate {
            room_type_id: room_type.id,
            name: "Rack".to_string(),
            price,
            ..Default::default()
        }
    }

    fn nepal() -> PricingCalculator {
        PricingCalculator::new("NPR", dec!(13), dec!(10))
    }

    fn code(kind: DiscountKind, value: Decimal) -> DiscountCode {
        DiscountCode {
            id: Uuid::new_v4(),
            hotel_id: Uuid::nil(),
            code: "spring".to_string(),
            kind,
            value,
            valid_from: None,
            valid_to: None,
            min_nights: None,
            is_active: true,
        }
    }

    #[test]
    fn test_two_rooms_three_nights() {
        let room_type = deluxe();
        let selection = PricedSelection {
            rate: rate(&room_type, dec!(9000)),
            room_type,
            quantity: 2,
        };

        let quote = nepal().quote(&[selection], 3, None, Vec::new()).unwrap();
        let p = &quote.pricing;

        assert_eq!(p.room_total, dec!(54000));
        assert_eq!(p.tax_amount, dec!(7020));
        assert_eq!(p.service_charge, dec!(5400));
        assert_eq!(p.grand_total, dec!(66420));
        assert_eq!(p.amount_due, dec!(66420));
        assert_eq!(quote.rooms[0].price_per_night, dec!(9000));
        assert_eq!(quote.rooms[0].total_price, dec!(54000));
    }

    #[test]
    fn test_each_component_rounded() {
        let room_type = deluxe();
        let selection = PricedSelection {
            rate: rate(&room_type, dec!(1234.5)),
            room_type,
            quantity: 1,
        };

        let quote = nepal().quote(&[selection], 1, None, Vec::new()).unwrap();
        let p = &quote.pricing;

        assert_eq!(p.room_total, dec!(1235));
        // 1235 × 13 % = 160.55
        assert_eq!(p.tax_amount, dec!(161));
        // 1235 × 10 % = 123.5
        assert_eq!(p.service_charge, dec!(124));
        assert_eq!(p.grand_total, dec!(1520));
    }

    #[test]
    fn test_flat_and_percentage_discounts() {
        let room_type = deluxe();
        let selection = PricedSelection {
            rate: rate(&room_type, dec!(9000)),
            room_type,
            quantity: 2,
        };
        let calc = nepal();

        let flat = code(DiscountKind::Flat, dec!(5000));
        let quote = calc
            .quote(&[selection.clone()], 3, Some(&flat), Vec::new())
            .unwrap();
        assert_eq!(quote.pricing.discount, dec!(5000));
        assert_eq!(quote.pricing.grand_total, dec!(61420));
        assert_eq!(quote.pricing.discount_code.as_deref(), Some("SPRING"));

        let pct = code(DiscountKind::Percentage, dec!(10));
        let quote = calc.quote(&[selection], 3, Some(&pct), Vec::new()).unwrap();
        assert_eq!(quote.pricing.discount, dec!(6642));
        assert_eq!(quote.pricing.grand_total, dec!(59778));
    }

    #[test]
    fn test_discount_clamped_to_charges() {
        let room_type = deluxe();
        let selection = PricedSelection {
            rate: rate(&room_type, dec!(1000)),
            room_type,
            quantity: 1,
        };

        let huge = code(DiscountKind::Flat, dec!(999999));
        let quote = nepal().quote(&[selection.clone()], 1, Some(&huge), Vec::new()).unwrap();
        assert_eq!(quote.pricing.discount, dec!(1230));
        assert_eq!(quote.pricing.grand_total, Decimal::ZERO);

        let over = code(DiscountKind::Percentage, dec!(150));
        let quote = nepal().quote(&[selection], 1, Some(&over), Vec::new()).unwrap();
        assert_eq!(quote.pricing.grand_total, Decimal::ZERO);
    }

    #[test]
    fn test_extra_charges_not_discounted() {
        let room_type = deluxe();
        let selection = PricedSelection {
            rate: rate(&room_type, dec!(1000)),
            room_type,
            quantity: 1,
        };
        let extra = NewExtraCharge {
            category: ExtraChargeCategory::Transport,
            description: "Airport pickup".to_string(),
            amount: dec!(1500),
            quantity: 2,
            date: date(2026, 5, 1),
            created_by: None,
        };

        let pct = code(DiscountKind::Percentage, dec!(100));
        let quote = nepal().quote(&[selection], 1, Some(&pct), vec![extra]).unwrap();
        assert_eq!(quote.pricing.discount, dec!(1230));
        assert_eq!(quote.pricing.extra_charges.len(), 1);
        assert_eq!(quote.pricing.grand_total, dec!(3000));
    }

    #[test]
    fn test_min_stay_violation() {
        let room_type = deluxe();
        let mut weekly = rate(&room_type, dec!(7000));
        weekly.min_stay = Some(7);
        let selection = PricedSelection {
            rate: weekly,
            room_type,
            quantity: 1,
        };

        let err = nepal().quote(&[selection], 3, None, Vec::new()).unwrap_err();
        assert_eq!(err.error_code(), "rate_not_applicable");
    }

    #[test]
    fn test_rate_of_other_room_type_rejected() {
        let room_type = deluxe();
        let stray = rate(&deluxe(), dec!(7000));
        let selection = PricedSelection {
            rate: stray,
            room_type,
            quantity: 1,
        };

        assert!(matches!(
            nepal().quote(&[selection], 1, None, Vec::new()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_selection_rejected() {
        assert!(matches!(
            nepal().quote(&[], 2, None, Vec::new()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_select_cheapest_applicable_rate() {
        let room_type = deluxe();
        let rack = rate(&room_type, dec!(9000));
        let mut promo = rate(&room_type, dec!(6000));
        promo.min_stay = Some(5);
        let mut weekend = rate(&room_type, dec!(7500));
        weekend.days_of_week = vec![chrono::Weekday::Sat, chrono::Weekday::Sun];
        let mut retired = rate(&room_type, dec!(100));
        retired.is_active = false;
        let rates = vec![rack.clone(), promo, weekend.clone(), retired];

        // Fri 2026-05-01 → Sun 2026-05-03: Friday is not a weekend night
        let dates = stay_dates(date(2026, 5, 1), date(2026, 5, 3));
        let picked = select_rate(&room_type, &rates, None, &dates).unwrap();
        assert_eq!(picked.id, rack.id);

        let saturday = stay_dates(date(2026, 5, 2), date(2026, 5, 4));
        let picked = select_rate(&room_type, &rates, None, &saturday).unwrap();
        assert_eq!(picked.id, weekend.id);
    }

    #[test]
    fn test_select_named_rate() {
        let room_type = deluxe();
        let mut seasonal = rate(&room_type, dec!(8000));
        seasonal.valid_to = Some(date(2026, 5, 2));
        let rates = vec![seasonal.clone()];

        let inside = stay_dates(date(2026, 5, 1), date(2026, 5, 3));
        assert!(select_rate(&room_type, &rates, Some(seasonal.id), &inside).is_ok());

        let outside = stay_dates(date(2026, 5, 2), date(2026, 5, 4));
        let err = select_rate(&room_type, &rates, Some(seasonal.id), &outside).unwrap_err();
        assert_eq!(err.error_code(), "rate_not_applicable");

        let err = select_rate(&room_type, &rates, Some(Uuid::new_v4()), &inside).unwrap_err();
        assert_eq!(err.error_code(), "rate_not_applicable");
    }

    #[test]
    fn test_check_discount() {
        let mut spring = code(DiscountKind::Percentage, dec!(10));
        spring.min_nights = Some(2);
        spring.valid_to = Some(date(2026, 5, 31));

        assert!(check_discount("SPRING", Some(spring.clone()), date(2026, 5, 1), 2).is_ok());
        assert!(matches!(
            check_discount("SPRING", Some(spring.clone()), date(2026, 5, 1), 1),
            Err(AppError::InvalidDiscountCode(_))
        ));
        assert!(matches!(
            check_discount("SPRING", Some(spring), date(2026, 6, 1), 3),
            Err(AppError::InvalidDiscountCode(_))
        ));
        assert!(matches!(
            check_discount("NOPE", None, date(2026, 5, 1), 3),
            Err(AppError::InvalidDiscountCode(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_amount_due_never_negative(
            price in 1u32..50_000,
            quantity in 1i32..5,
            nights in 1i64..30,
            paid in 0u32..5_000_000,
        ) {
            let room_type = deluxe();
            let selection = PricedSelection {
                rate: rate(&room_type, Decimal::from(price)),
                room_type,
                quantity,
            };

            let mut pricing = nepal()
                .quote(&[selection], nights, None, Vec::new())
                .unwrap()
                .pricing;
            pricing.apply_payment(Decimal::from(paid));

            let expected = (pricing.grand_total - pricing.amount_paid).max(Decimal::ZERO);
            prop_assert_eq!(pricing.amount_due, expected);
            prop_assert_eq!(pricing.grand_total, pricing.subtotal);
            prop_assert_eq!(
                pricing.room_total,
                Decimal::from(price) * Decimal::from(quantity) * Decimal::from(nights)
            );
        }

        #[test]
        fn prop_discount_keeps_subtotal_non_negative(
            price in 1u32..20_000,
            flat in 0u32..1_000_000,
        ) {
            let room_type = deluxe();
            let selection = PricedSelection {
                rate: rate(&room_type, Decimal::from(price)),
                room_type,
                quantity: 1,
            };
            let discount = code(DiscountKind::Flat, Decimal::from(flat));

            let pricing = nepal()
                .quote(&[selection], 1, Some(&discount), Vec::new())
                .unwrap()
                .pricing;
            prop_assert!(pricing.subtotal >= Decimal::ZERO);
            prop_assert!(pricing.discount <= pricing.charges_before_discount());
        }
    }
}
