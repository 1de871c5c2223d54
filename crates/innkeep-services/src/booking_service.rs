//! Booking service
//!
//! Drives bookings through their lifecycle:
//! - Create: re-validate and hold inventory for every night, then persist
//! - Confirm, check in, check out, cancel, mark no-show
//! - Extra charges, payments (front desk and gateway) and refund settlement
//!
//! The `Booking` aggregate enforces the transition rules; this service
//! loads it, applies the change, moves inventory and saves it back with a
//! version check. Inventory that must be taken (holds, check-in occupancy)
//! is taken before the save and given back if the save fails. Inventory
//! that is given back (cancellation, no-show, check-out) moves after the
//! save, so a failure there can only leave rooms unsold, never oversold.

use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    config::BookingConfig,
    models::{
        nights_between, stay_dates, Booking, BookingSource, BookingState, BookingStatus,
        CheckInDetails, CheckOutDetails, GuestDetails, Hotel, InventoryHold, NewBooking,
        NewExtraCharge, PaymentMethod, PaymentOutcome, PaymentRecord, RoomOccupancy,
    },
    money::round_currency,
    traits::{
        BookingEvent, BookingEventKind, BookingFilter, BookingNotifier, BookingRepository,
        CatalogRepository, CleaningRequest, GatewayPaymentStatus, HousekeepingNotifier,
        InventoryStore, OccupancyChange, PaginatedResponse, PaginationMeta, Pagination,
        PaymentGateway,
    },
    AppError, AppResult, Clock, SystemClock,
};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::availability::{AvailabilityQuery, AvailabilityResolver, RoomAvailability};
use crate::cancellation::CancellationResolver;
use crate::constants::{BOOKING_NUMBER_ATTEMPTS, BOOKING_NUMBER_SUFFIX_LEN, MAX_STAY_NIGHTS};
use crate::pricing::{check_discount, select_rate, PricedSelection, PricingCalculator};

/// Persistence the service works against
pub struct Stores {
    pub catalog: Arc<dyn CatalogRepository>,
    pub inventory: Arc<dyn InventoryStore>,
    pub bookings: Arc<dyn BookingRepository>,
}

/// External services the engine calls
pub struct Collaborators {
    pub gateway: Arc<dyn PaymentGateway>,
    pub housekeeping: Arc<dyn HousekeepingNotifier>,
    pub notifier: Arc<dyn BookingNotifier>,
}

/// A room type to book, optionally at a named rate
#[derive(Debug, Clone)]
pub struct RoomSelection {
    pub room_type_id: Uuid,
    /// Cheapest bookable rate when `None`
    pub rate_id: Option<Uuid>,
    pub quantity: i32,
}

/// Input of `create_booking`
#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub hotel_id: Uuid,
    pub rooms: Vec<RoomSelection>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest: GuestDetails,
    pub adults: i32,
    pub children: i32,
    pub discount_code: Option<String>,
    pub source: BookingSource,
}

/// Cancellation input
#[derive(Debug, Clone, Default)]
pub struct CancelRequest {
    pub reason: String,
    pub cancelled_by: Option<String>,
    /// Refund percentage replacing the policy's
    pub refund_override_percent: Option<Decimal>,
}

/// Front-desk payment
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub recorded_by: Option<String>,
}

/// Target of `update_status` with the details that transition needs
#[derive(Debug, Clone)]
pub enum StatusUpdate {
    Confirm {
        confirmed_by: Option<String>,
        manual_override: bool,
    },
    CheckIn(CheckInDetails),
    CheckOut(CheckOutDetails),
    Cancel(CancelRequest),
    NoShow {
        marked_by: Option<String>,
    },
}

impl StatusUpdate {
    pub fn target(&self) -> BookingStatus {
        match self {
            StatusUpdate::Confirm { .. } => BookingStatus::Confirmed,
            StatusUpdate::CheckIn(_) => BookingStatus::CheckedIn,
            StatusUpdate::CheckOut(_) => BookingStatus::CheckedOut,
            StatusUpdate::Cancel(_) => BookingStatus::Cancelled,
            StatusUpdate::NoShow { .. } => BookingStatus::NoShow,
        }
    }
}

/// Outcome of starting a gateway payment
#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitiation {
    pub booking: Booking,
    pub amount: Decimal,
    /// `None` when the gateway refused; the failure is on the booking
    pub redirect_url: Option<String>,
}

/// A booked room type with its catalog room count
#[derive(Debug, Clone)]
struct RoomLine {
    room_type_id: Uuid,
    name: String,
    total_rooms: i32,
    quantity: i32,
}

/// Outcome of storing a new booking
enum Inserted {
    Created(Booking),
    /// Same idempotency key already stored by a concurrent request
    Existing(Booking),
}

/// Booking lifecycle service
pub struct BookingService {
    catalog: Arc<dyn CatalogRepository>,
    inventory: Arc<dyn InventoryStore>,
    bookings: Arc<dyn BookingRepository>,
    gateway: Arc<dyn PaymentGateway>,
    housekeeping: Arc<dyn HousekeepingNotifier>,
    notifier: Arc<dyn BookingNotifier>,
    clock: Arc<dyn Clock>,
    availability: AvailabilityResolver,
    config: BookingConfig,
}

impl BookingService {
    /// Create a new booking service reading the system clock
    pub fn new(stores: Stores, collaborators: Collaborators, config: BookingConfig) -> Self {
        Self {
            availability: AvailabilityResolver::new(
                Arc::clone(&stores.catalog),
                Arc::clone(&stores.inventory),
            ),
            catalog: stores.catalog,
            inventory: stores.inventory,
            bookings: stores.bookings,
            gateway: collaborators.gateway,
            housekeeping: collaborators.housekeeping,
            notifier: collaborators.notifier,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Search free inventory for a stay
    pub async fn search_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> AppResult<Vec<RoomAvailability>> {
        self.availability.search(query).await
    }

    /// Create a pending booking
    ///
    /// # Arguments
    ///
    /// * `request` - Rooms, stay dates, guest and optional discount code
    /// * `idempotency_key` - Client key; a repeated key returns the booking
    ///   it created instead of booking again
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The dates, party or room list are invalid
    /// - A rate does not apply (`RateNotApplicable`) or the discount code
    ///   does not resolve (`InvalidDiscountCode`)
    /// - Any night of any room type no longer has enough free rooms
    ///   (`InventoryUnavailable`)
    #[instrument(skip(self, request), fields(hotel_id = %request.hotel_id))]
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
        idempotency_key: Option<String>,
    ) -> AppResult<Booking> {
        let idempotency_key = idempotency_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        if let Some(existing) = self
            .idempotent_winner(request.hotel_id, idempotency_key.as_deref())
            .await?
        {
            info!(
                "Idempotency key already produced booking {}",
                existing.booking_number
            );
            return Ok(existing);
        }

        let nights = nights_between(request.check_in, request.check_out)?;
        validate_request(&request, nights)?;

        let hotel = self.hotel(request.hotel_id).await?;
        let dates = stay_dates(request.check_in, request.check_out);

        let mut selections = Vec::with_capacity(request.rooms.len());
        for selection in &request.rooms {
            let room_type = self
                .catalog
                .find_room_type(selection.room_type_id)
                .await?
                .filter(|rt| rt.hotel_id == hotel.id)
                .ok_or_else(|| AppError::RoomTypeNotFound(selection.room_type_id.to_string()))?;

            if !room_type.is_active {
                return Err(AppError::Validation(format!(
                    "room type {} is not bookable",
                    room_type.name
                )));
            }

            let rates = self.catalog.list_rates(room_type.id).await?;
            let rate = select_rate(&room_type, &rates, selection.rate_id, &dates)?;
            selections.push(PricedSelection {
                room_type,
                rate,
                quantity: selection.quantity,
            });
        }

        let capacity: i64 = selections
            .iter()
            .map(|s| s.room_type.max_occupancy as i64 * s.quantity as i64)
            .sum();
        let party = (request.adults + request.children) as i64;
        if capacity < party {
            return Err(AppError::Validation(format!(
                "selected rooms sleep {} guests, party is {}",
                capacity, party
            )));
        }

        let discount = match request
            .discount_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(code) => {
                let found = self.catalog.find_discount_code(hotel.id, code).await?;
                Some(check_discount(code, found, request.check_in, nights)?)
            }
            None => None,
        };

        let quote = PricingCalculator::new(
            &hotel.currency,
            hotel.tax_percent,
            hotel.service_charge_percent,
        )
        .quote(&selections, nights, discount.as_ref(), Vec::new())?;

        let now = self.clock.now();
        let local_date = hotel.local_date(now);
        let mut booking = Booking::new(
            NewBooking {
                hotel_id: hotel.id,
                booking_number: self.booking_number(local_date),
                idempotency_key: idempotency_key.clone(),
                source: request.source,
                guest: request.guest,
                adults: request.adults,
                children: request.children,
                check_in: request.check_in,
                check_out: request.check_out,
                rooms: quote.rooms,
                pricing: quote.pricing,
            },
            now,
        )?;

        let totals: HashMap<Uuid, i32> = selections
            .iter()
            .map(|s| (s.room_type.id, s.room_type.total_rooms))
            .collect();
        let holds = inventory_holds(&booking, &dates, &totals);
        if let Err(e) = self.hold_with_retry(&holds).await {
            // The rooms may have gone to a concurrent request with the same key
            if let AppError::InventoryUnavailable(_) = e {
                if let Some(existing) = self
                    .idempotent_winner(hotel.id, idempotency_key.as_deref())
                    .await?
                {
                    info!(
                        "Concurrent request with the same key created {}",
                        existing.booking_number
                    );
                    return Ok(existing);
                }
            }
            return Err(e);
        }

        match self.insert_new(&mut booking, local_date).await {
            Ok(Inserted::Created(saved)) => {
                info!(
                    booking_number = %saved.booking_number,
                    "Booking {} created: {} nights, {} rooms, total {} {}",
                    saved.booking_number,
                    saved.nights,
                    saved.room_quantities().values().sum::<i32>(),
                    saved.pricing.grand_total,
                    saved.pricing.currency
                );
                Ok(saved)
            }
            Ok(Inserted::Existing(existing)) => {
                self.release_unsaved(&booking, &holds).await;
                info!(
                    "Concurrent request with the same key created {}",
                    existing.booking_number
                );
                Ok(existing)
            }
            Err(e) => {
                self.release_unsaved(&booking, &holds).await;
                Err(e)
            }
        }
    }

    /// Find booking by ID
    pub async fn get_booking(&self, id: Uuid) -> AppResult<Booking> {
        self.load(id).await
    }

    /// Find booking by booking number
    pub async fn get_booking_by_number(&self, booking_number: &str) -> AppResult<Booking> {
        self.bookings
            .find_by_number(booking_number.trim())
            .await?
            .ok_or_else(|| AppError::BookingNotFound(booking_number.to_string()))
    }

    /// List bookings, newest first
    pub async fn list_bookings(
        &self,
        filter: &BookingFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Booking>> {
        let (data, total) = self
            .bookings
            .list(filter, pagination.limit(), pagination.offset())
            .await?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(total, pagination.page, pagination.per_page),
        })
    }

    /// Move a booking to another status
    pub async fn update_status(&self, id: Uuid, update: StatusUpdate) -> AppResult<Booking> {
        debug!("Status update of {} to {}", id, update.target());

        match update {
            StatusUpdate::Confirm {
                confirmed_by,
                manual_override,
            } => self.confirm(id, confirmed_by, manual_override).await,
            StatusUpdate::CheckIn(details) => self.check_in(id, details).await,
            StatusUpdate::CheckOut(details) => self.check_out(id, details).await,
            StatusUpdate::Cancel(request) => self.cancel(id, request).await,
            StatusUpdate::NoShow { marked_by } => self.mark_no_show(id, marked_by).await,
        }
    }

    /// pending → confirmed
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        id: Uuid,
        confirmed_by: Option<String>,
        manual_override: bool,
    ) -> AppResult<Booking> {
        let mut booking = self.load(id).await?;
        let from = booking.status();

        booking.confirm(confirmed_by, manual_override, self.clock.now())?;
        let saved = self.save(&booking, from).await?;

        if manual_override {
            info!(
                "Booking {} confirmed by manual override",
                saved.booking_number
            );
        }
        self.notify(&saved, BookingEventKind::Confirmed, None).await;
        Ok(saved)
    }

    /// confirmed → checked-in; the booked rooms become occupied
    #[instrument(skip(self, details))]
    pub async fn check_in(&self, id: Uuid, details: CheckInDetails) -> AppResult<Booking> {
        let mut booking = self.load(id).await?;
        let hotel = self.hotel(booking.hotel_id).await?;
        let now = self.clock.now();
        let from = booking.status();

        booking.check_in(
            details,
            hotel.local_date(now),
            self.config.allow_early_check_in,
            now,
        )?;

        let lines = self.room_lines(&booking).await?;
        let mut occupied = Vec::with_capacity(lines.len());
        for line in &lines {
            let change = self
                .inventory
                .update_occupancy(
                    line.room_type_id,
                    line.total_rooms,
                    OccupancyChange::Occupy,
                    line.quantity,
                )
                .await;

            if let Err(e) = change {
                warn!(
                    "Check-in of {} blocked: {} has no {} ready rooms",
                    booking.booking_number, line.name, line.quantity
                );
                self.undo_occupancy(&occupied).await;
                return Err(e);
            }
            occupied.push(line.clone());
        }

        match self.save(&booking, from).await {
            Ok(saved) => Ok(saved),
            Err(e) => {
                self.undo_occupancy(&occupied).await;
                Err(e)
            }
        }
    }

    /// checked-in → checked-out
    ///
    /// Check-out charges land on the ledger, rooms go to housekeeping and
    /// nights not used (early departure) go back on sale.
    #[instrument(skip(self, details))]
    pub async fn check_out(&self, id: Uuid, details: CheckOutDetails) -> AppResult<Booking> {
        let mut booking = self.load(id).await?;
        let hotel = self.hotel(booking.hotel_id).await?;
        let now = self.clock.now();
        let today = hotel.local_date(now);
        let from = booking.status();

        let charges = booking.check_out(details, today, now)?;
        let saved = self.save(&booking, from).await?;

        if !charges.is_empty() {
            info!(
                "Booking {} closed with {} check-out charges, balance {}",
                saved.booking_number,
                charges.len(),
                saved.pricing.amount_due
            );
        }

        let lines = match self.room_lines(&saved).await {
            Ok(lines) => lines,
            Err(e) => {
                error!(
                    "Rooms of {} not returned to housekeeping: {}",
                    saved.booking_number, e
                );
                return Ok(saved);
            }
        };

        for line in &lines {
            if let Err(e) = self
                .inventory
                .update_occupancy(
                    line.room_type_id,
                    line.total_rooms,
                    OccupancyChange::Vacate,
                    line.quantity,
                )
                .await
            {
                error!(
                    "Failed to vacate {} rooms of {} for {}: {}",
                    line.quantity, line.name, saved.booking_number, e
                );
            }
        }

        let unused = saved.remaining_dates(today);
        if !unused.is_empty() {
            info!(
                "Early check-out of {}: releasing {} nights",
                saved.booking_number,
                unused.len()
            );
            self.release_lines(&saved, &lines, &unused).await;
        }

        self.request_cleaning(&saved, &lines, now);
        Ok(saved)
    }

    /// pending | confirmed → cancelled, computing the refund
    #[instrument(skip(self, request))]
    pub async fn cancel(&self, id: Uuid, request: CancelRequest) -> AppResult<Booking> {
        let mut booking = self.load(id).await?;
        let hotel = self.hotel(booking.hotel_id).await?;
        let now = self.clock.now();
        let from = booking.status();

        let cancellation = CancellationResolver::resolve(
            &booking,
            &hotel,
            &request.reason,
            request.cancelled_by,
            request.refund_override_percent,
            now,
        )?;
        let refund = cancellation.refund_amount;

        booking.cancel(cancellation)?;
        let saved = self.save(&booking, from).await?;

        info!(
            "Booking {} cancelled, refund {} of {} paid",
            saved.booking_number, refund, saved.pricing.amount_paid
        );

        self.release_nights(&saved, &saved.stay_dates()).await;
        self.notify(&saved, BookingEventKind::Cancelled, Some(refund))
            .await;
        Ok(saved)
    }

    /// confirmed → no-show once the check-in day has passed
    #[instrument(skip(self))]
    pub async fn mark_no_show(&self, id: Uuid, marked_by: Option<String>) -> AppResult<Booking> {
        let mut booking = self.load(id).await?;
        let hotel = self.hotel(booking.hotel_id).await?;
        let now = self.clock.now();
        let from = booking.status();

        booking.mark_no_show(marked_by, hotel.local_date(now), now)?;
        let saved = self.save(&booking, from).await?;

        self.release_nights(&saved, &saved.stay_dates()).await;
        Ok(saved)
    }

    /// Append an extra charge to the ledger
    #[instrument(skip(self, charge), fields(category = %charge.category))]
    pub async fn add_extra_charge(&self, id: Uuid, charge: NewExtraCharge) -> AppResult<Booking> {
        let mut booking = self.load(id).await?;
        let from = booking.status();

        let entry = booking.add_extra_charge(charge, self.clock.now())?;
        let saved = self.save(&booking, from).await?;

        info!(
            "Charged {} {} ({}) to {}, total now {}",
            entry.total,
            saved.pricing.currency,
            entry.category,
            saved.booking_number,
            saved.pricing.grand_total
        );
        Ok(saved)
    }

    /// Record a payment taken at the front desk
    #[instrument(skip(self, payment), fields(amount = %payment.amount))]
    pub async fn record_payment(&self, id: Uuid, payment: PaymentRequest) -> AppResult<Booking> {
        let mut booking = self.load(id).await?;
        let from = booking.status();
        let amount = round_currency(payment.amount, &booking.pricing.currency);

        booking.record_payment(PaymentRecord {
            id: Uuid::new_v4(),
            amount,
            method: payment.method,
            reference: payment.reference,
            outcome: PaymentOutcome::Verified,
            recorded_at: self.clock.now(),
            recorded_by: payment.recorded_by,
        })?;
        let saved = self.save(&booking, from).await?;

        info!(
            "Payment of {} recorded on {}: status {}, due {}",
            amount, saved.booking_number, saved.payment_status, saved.pricing.amount_due
        );
        Ok(saved)
    }

    /// Start a gateway payment for the amount due
    ///
    /// A gateway failure is recorded on the booking and returned without a
    /// redirect URL instead of as an error.
    #[instrument(skip(self))]
    pub async fn initiate_payment(
        &self,
        id: Uuid,
        method: PaymentMethod,
    ) -> AppResult<PaymentInitiation> {
        let mut booking = self.load(id).await?;
        ensure_payable(&booking)?;

        let amount = booking.pricing.amount_due;
        if amount <= Decimal::ZERO {
            return Err(AppError::PolicyViolation(format!(
                "booking {} has nothing due",
                booking.booking_number
            )));
        }

        match self
            .gateway
            .initiate_payment(amount, &booking.booking_number)
            .await
        {
            Ok(redirect_url) => {
                info!(
                    "Gateway payment of {} started for {}",
                    amount, booking.booking_number
                );
                Ok(PaymentInitiation {
                    booking,
                    amount,
                    redirect_url: Some(redirect_url),
                })
            }
            Err(e) => {
                warn!(
                    "Gateway refused payment for {}: {}",
                    booking.booking_number, e
                );
                let from = booking.status();
                booking.record_payment(self.failed_payment(amount, method, None))?;
                let saved = self.save(&booking, from).await?;
                Ok(PaymentInitiation {
                    booking: saved,
                    amount,
                    redirect_url: None,
                })
            }
        }
    }

    /// Record the outcome of a gateway payment by its token
    ///
    /// A token already recorded as verified is not counted twice. A
    /// payment the gateway still reports as pending leaves the booking
    /// untouched.
    #[instrument(skip(self, token))]
    pub async fn verify_payment(
        &self,
        id: Uuid,
        token: &str,
        method: PaymentMethod,
    ) -> AppResult<Booking> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::MissingField("token".to_string()));
        }

        let mut booking = self.load(id).await?;
        ensure_payable(&booking)?;

        let already_counted = booking.payments.iter().any(|p| {
            p.outcome == PaymentOutcome::Verified && p.reference.as_deref() == Some(token)
        });
        if already_counted {
            debug!(
                "Payment {} already recorded on {}",
                token, booking.booking_number
            );
            return Ok(booking);
        }

        let record = match self.gateway.verify_payment(token).await {
            Ok(verification) => match verification.status {
                GatewayPaymentStatus::Completed if verification.amount > Decimal::ZERO => {
                    info!(
                        "Gateway confirmed {} for {} (gateway ref {:?})",
                        verification.amount, booking.booking_number, verification.reference
                    );
                    PaymentRecord {
                        id: Uuid::new_v4(),
                        amount: round_currency(verification.amount, &booking.pricing.currency),
                        method,
                        reference: Some(token.to_string()),
                        outcome: PaymentOutcome::Verified,
                        recorded_at: self.clock.now(),
                        recorded_by: None,
                    }
                }
                GatewayPaymentStatus::Pending => {
                    info!(
                        "Payment {} for {} still pending at the gateway",
                        token, booking.booking_number
                    );
                    return Ok(booking);
                }
                status => {
                    warn!(
                        "Gateway reported {:?} with amount {} for {}",
                        status, verification.amount, booking.booking_number
                    );
                    self.failed_payment(verification.amount.max(Decimal::ZERO), method, Some(token))
                }
            },
            Err(e) => {
                warn!(
                    "Could not verify payment {} for {}: {}",
                    token, booking.booking_number, e
                );
                self.failed_payment(Decimal::ZERO, method, Some(token))
            }
        };

        let from = booking.status();
        booking.record_payment(record)?;
        self.save(&booking, from).await
    }

    /// Record whether the refund of a cancelled booking went through
    #[instrument(skip(self))]
    pub async fn settle_refund(&self, id: Uuid, processed: bool) -> AppResult<Booking> {
        let mut booking = self.load(id).await?;
        let from = booking.status();

        booking.settle_refund(processed, self.clock.now())?;
        let saved = self.save(&booking, from).await?;

        if processed {
            info!("Refund of {} processed", saved.booking_number);
        } else {
            warn!("Refund of {} failed at the gateway", saved.booking_number);
        }
        Ok(saved)
    }

    /// Housekeeping finished `quantity` rooms of a room type
    #[instrument(skip(self))]
    pub async fn mark_rooms_clean(
        &self,
        room_type_id: Uuid,
        quantity: i32,
    ) -> AppResult<RoomOccupancy> {
        if quantity < 1 {
            return Err(AppError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let room_type = self
            .catalog
            .find_room_type(room_type_id)
            .await?
            .ok_or_else(|| AppError::RoomTypeNotFound(room_type_id.to_string()))?;

        let occupancy = self
            .inventory
            .update_occupancy(
                room_type.id,
                room_type.total_rooms,
                OccupancyChange::MarkClean,
                quantity,
            )
            .await?;

        info!(
            "{} {} rooms cleaned: {} ready, {} occupied, {} cleaning",
            quantity, room_type.name, occupancy.ready, occupancy.occupied, occupancy.cleaning
        );
        Ok(occupancy)
    }

    /// Ready, occupied and cleaning room counts of a room type
    #[instrument(skip(self))]
    pub async fn room_occupancy(&self, room_type_id: Uuid) -> AppResult<RoomOccupancy> {
        let room_type = self
            .catalog
            .find_room_type(room_type_id)
            .await?
            .ok_or_else(|| AppError::RoomTypeNotFound(room_type_id.to_string()))?;

        self.inventory
            .occupancy(room_type.id, room_type.total_rooms)
            .await
    }

    async fn load(&self, id: Uuid) -> AppResult<Booking> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::BookingNotFound(id.to_string()))
    }

    async fn hotel(&self, hotel_id: Uuid) -> AppResult<Hotel> {
        self.catalog
            .find_hotel(hotel_id)
            .await?
            .ok_or_else(|| AppError::HotelNotFound(hotel_id.to_string()))
    }

    /// Save with a version check and log the transition
    async fn save(&self, booking: &Booking, from: BookingStatus) -> AppResult<Booking> {
        let saved = self.bookings.update(booking).await.map_err(|e| {
            warn!("Booking {} not saved: {}", booking.booking_number, e);
            e
        })?;

        let to = saved.status();
        if to != from {
            info!(
                booking_number = %saved.booking_number,
                from = %from,
                to = %to,
                "Booking {} moved from {} to {}",
                saved.booking_number,
                from,
                to
            );
        }
        Ok(saved)
    }

    fn booking_number(&self, local_date: NaiveDate) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(BOOKING_NUMBER_SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();

        format!(
            "{}-{}-{}",
            self.config.booking_number_prefix,
            local_date.format("%y%m%d"),
            suffix
        )
    }

    /// Booking already created under `key`, if any
    async fn idempotent_winner(
        &self,
        hotel_id: Uuid,
        key: Option<&str>,
    ) -> AppResult<Option<Booking>> {
        match key {
            Some(key) => self.bookings.find_by_idempotency_key(hotel_id, key).await,
            None => Ok(None),
        }
    }

    /// Store a new booking, drawing a fresh number if the first one is taken
    ///
    /// A uniqueness failure caused by a concurrent request with the same
    /// idempotency key yields that request's booking instead.
    async fn insert_new(
        &self,
        booking: &mut Booking,
        local_date: NaiveDate,
    ) -> AppResult<Inserted> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.bookings.insert(booking).await {
                Ok(saved) => return Ok(Inserted::Created(saved)),
                Err(e @ AppError::AlreadyExists(_)) => e,
                Err(e) => return Err(e),
            };

            if let Some(existing) = self
                .idempotent_winner(booking.hotel_id, booking.idempotency_key.as_deref())
                .await?
            {
                return Ok(Inserted::Existing(existing));
            }

            if attempt >= BOOKING_NUMBER_ATTEMPTS {
                return Err(err);
            }

            let fresh = self.booking_number(local_date);
            warn!(
                "Booking number {} already taken, retrying as {}",
                booking.booking_number, fresh
            );
            booking.booking_number = fresh;
        }
    }

    async fn release_unsaved(&self, booking: &Booking, holds: &[InventoryHold]) {
        if let Err(e) = self.inventory.release(holds).await {
            error!(
                "Failed to release holds of unsaved booking {}: {}",
                booking.booking_number, e
            );
        }
    }

    /// Hold inventory, retrying concurrency conflicts
    async fn hold_with_retry(&self, holds: &[InventoryHold]) -> AppResult<()> {
        let attempts = self.config.inventory_retry_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.inventory.hold(holds).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(
                        "Inventory hold conflict (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                }
                Err(e) if e.is_retryable() => {
                    warn!("Inventory hold gave up after {} attempts: {}", attempts, e);
                    return Err(AppError::InventoryUnavailable(
                        "rooms are being booked concurrently, try again".to_string(),
                    ));
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn room_lines(&self, booking: &Booking) -> AppResult<Vec<RoomLine>> {
        let mut lines = Vec::new();
        for (room_type_id, quantity) in booking.room_quantities() {
            let name = booking
                .rooms
                .iter()
                .find(|r| r.room_type.id == room_type_id)
                .map(|r| r.room_type.name.clone())
                .unwrap_or_default();

            let total_rooms = match self.catalog.find_room_type(room_type_id).await? {
                Some(room_type) => room_type.total_rooms,
                None => {
                    warn!("Room type {} of {} left the catalog", name, booking.booking_number);
                    0
                }
            };

            lines.push(RoomLine {
                room_type_id,
                name,
                total_rooms,
                quantity,
            });
        }
        Ok(lines)
    }

    async fn undo_occupancy(&self, lines: &[RoomLine]) {
        for line in lines {
            if let Err(e) = self
                .inventory
                .update_occupancy(
                    line.room_type_id,
                    line.total_rooms,
                    OccupancyChange::Unoccupy,
                    line.quantity,
                )
                .await
            {
                error!(
                    "Failed to return {} {} rooms to ready: {}",
                    line.quantity, line.name, e
                );
            }
        }
    }

    /// Give nights back after a saved cancellation or no-show
    async fn release_nights(&self, booking: &Booking, dates: &[NaiveDate]) {
        match self.room_lines(booking).await {
            Ok(lines) => self.release_lines(booking, &lines, dates).await,
            Err(e) => error!(
                "Nights of {} not released: {}",
                booking.booking_number, e
            ),
        }
    }

    async fn release_lines(&self, booking: &Booking, lines: &[RoomLine], dates: &[NaiveDate]) {
        let holds: Vec<InventoryHold> = lines
            .iter()
            .map(|line| InventoryHold {
                room_type_id: line.room_type_id,
                total_rooms: line.total_rooms,
                dates: dates.to_vec(),
                quantity: line.quantity,
            })
            .collect();

        match self.inventory.release(&holds).await {
            Ok(()) => debug!(
                "Released {} nights of {}",
                dates.len(),
                booking.booking_number
            ),
            Err(e) => error!(
                "Failed to release {} nights of {}: {}",
                dates.len(),
                booking.booking_number,
                e
            ),
        }
    }

    /// Tell housekeeping about vacated rooms without waiting
    fn request_cleaning(
        &self,
        booking: &Booking,
        lines: &[RoomLine],
        at: DateTime<Utc>,
    ) {
        let room_numbers = match &booking.state {
            BookingState::CheckedOut { check_in, .. } if lines.len() == 1 => {
                check_in.details.room_numbers.clone()
            }
            _ => Vec::new(),
        };

        let requests: Vec<CleaningRequest> = lines
            .iter()
            .map(|line| CleaningRequest {
                hotel_id: booking.hotel_id,
                room_type_id: line.room_type_id,
                room_type_name: line.name.clone(),
                quantity: line.quantity,
                room_numbers: room_numbers.clone(),
                booking_number: booking.booking_number.clone(),
                requested_at: at,
            })
            .collect();

        let housekeeping = Arc::clone(&self.housekeeping);
        tokio::spawn(async move {
            for request in requests {
                if let Err(e) = housekeeping.rooms_need_cleaning(&request).await {
                    warn!(
                        "Housekeeping not told about {} rooms of {}: {}",
                        request.quantity, request.booking_number, e
                    );
                }
            }
        });
    }

    /// Tell the guest; a failure is logged and never propagated
    async fn notify(&self, booking: &Booking, kind: BookingEventKind, refund: Option<Decimal>) {
        let event = BookingEvent {
            kind,
            booking_id: booking.id,
            booking_number: booking.booking_number.clone(),
            hotel_id: booking.hotel_id,
            guest_name: booking.guest.full_name(),
            guest_email: booking.guest.email.clone(),
            check_in: booking.check_in,
            check_out: booking.check_out,
            refund_amount: refund,
            occurred_at: self.clock.now(),
        };

        if let Err(e) = self.notifier.notify(&event).await {
            warn!(
                "Guest of {} not notified ({:?}): {}",
                booking.booking_number, kind, e
            );
        }
    }

    fn failed_payment(
        &self,
        amount: Decimal,
        method: PaymentMethod,
        reference: Option<&str>,
    ) -> PaymentRecord {
        PaymentRecord {
            id: Uuid::new_v4(),
            amount,
            method,
            reference: reference.map(str::to_string),
            outcome: PaymentOutcome::Failed,
            recorded_at: self.clock.now(),
            recorded_by: None,
        }
    }
}

fn validate_request(request: &CreateBookingRequest, nights: i64) -> AppResult<()> {
    if request.rooms.is_empty() {
        return Err(AppError::Validation(
            "a booking needs at least one room".to_string(),
        ));
    }
    if nights > MAX_STAY_NIGHTS {
        return Err(AppError::Validation(format!(
            "stays are limited to {} nights",
            MAX_STAY_NIGHTS
        )));
    }
    if request.adults < 1 {
        return Err(AppError::Validation(
            "at least one adult is required".to_string(),
        ));
    }
    if request.children < 0 {
        return Err(AppError::Validation(
            "children must not be negative".to_string(),
        ));
    }
    if request.guest.first_name.trim().is_empty() {
        return Err(AppError::MissingField("guest.first_name".to_string()));
    }
    if request.guest.email.trim().is_empty() {
        return Err(AppError::MissingField("guest.email".to_string()));
    }
    Ok(())
}

fn ensure_payable(booking: &Booking) -> AppResult<()> {
    if matches!(
        booking.status(),
        BookingStatus::Cancelled | BookingStatus::NoShow
    ) {
        return Err(AppError::PolicyViolation(format!(
            "cannot take payments on a {} booking",
            booking.status()
        )));
    }
    Ok(())
}

/// One hold per booked room type covering `dates`
fn inventory_holds(
    booking: &Booking,
    dates: &[NaiveDate],
    totals: &HashMap<Uuid, i32>,
) -> Vec<InventoryHold> {
    booking
        .room_quantities()
        .into_iter()
        .map(|(room_type_id, quantity)| InventoryHold {
            room_type_id,
            total_rooms: totals.get(&room_type_id).copied().unwrap_or(0),
            dates: dates.to_vec(),
            quantity,
        })
        .collect()
}
