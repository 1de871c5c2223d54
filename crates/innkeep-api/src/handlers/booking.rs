//! Booking handlers
//!
//! HTTP handlers for the booking lifecycle: creation, lookup, status
//! transitions, the extra-charge ledger, payments and refunds.

use crate::dto::{
    validate_input, ApiResponse, BookingFilterParams, BookingSummary, CancelBody,
    CreateBookingBody, ExtraChargeBody, InitiatePaymentBody, PaginationParams, PaymentBody,
    RefundBody, StatusUpdateBody, VerifyPaymentBody, IDEMPOTENCY_KEY_HEADER,
    MAX_IDEMPOTENCY_KEY_LEN,
};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use innkeep_core::traits::PaginatedResponse;
use innkeep_core::AppError;
use innkeep_services::{BookingService, StatusUpdate};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Read the optional `Idempotency-Key` header
fn idempotency_key(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let Some(value) = req.headers().get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key = value
        .to_str()
        .map_err(|_| AppError::Validation("Idempotency-Key must be ASCII".to_string()))?
        .trim();

    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(AppError::Validation(format!(
            "Idempotency-Key longer than {} characters",
            MAX_IDEMPOTENCY_KEY_LEN
        )));
    }
    Ok((!key.is_empty()).then(|| key.to_string()))
}

/// Create a booking
///
/// POST /api/v1/bookings
#[instrument(skip(service, req, body))]
pub async fn create_booking(
    service: web::Data<BookingService>,
    req: HttpRequest,
    body: web::Json<CreateBookingBody>,
) -> Result<HttpResponse, AppError> {
    validate_input(&*body, "Booking")?;
    let key = idempotency_key(&req)?;

    debug!(
        hotel_id = %body.hotel_id,
        check_in = %body.check_in,
        check_out = %body.check_out,
        idempotent = key.is_some(),
        "Creating booking"
    );

    let booking = service.create_booking(body.into_inner().into(), key).await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(booking, "Booking created")))
}

/// List bookings with pagination and filters
///
/// GET /api/v1/bookings
#[instrument(skip(service))]
pub async fn list_bookings(
    service: web::Data<BookingService>,
    query: web::Query<PaginationParams>,
    filters: web::Query<BookingFilterParams>,
) -> Result<HttpResponse, AppError> {
    validate_input(&*query, "Pagination")?;
    let filter = filters.to_filter()?;

    let page = service
        .list_bookings(&filter, &query.to_pagination())
        .await?;

    let response = PaginatedResponse {
        data: page.data.iter().map(BookingSummary::from).collect::<Vec<_>>(),
        pagination: page.pagination,
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Get a booking by ID
///
/// GET /api/v1/bookings/{id}
#[instrument(skip(service))]
pub async fn get_booking(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let booking = service.get_booking(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(booking)))
}

/// Get a booking by its booking number
///
/// GET /api/v1/bookings/number/{booking_number}
#[instrument(skip(service))]
pub async fn get_booking_by_number(
    service: web::Data<BookingService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let booking = service.get_booking_by_number(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(booking)))
}

/// Move a booking to another status
///
/// PUT /api/v1/bookings/{id}/status
#[instrument(skip(service, body))]
pub async fn update_status(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
    body: web::Json<StatusUpdateBody>,
) -> Result<HttpResponse, AppError> {
    if let StatusUpdateBody::Cancelled(cancel) = &*body {
        validate_input(cancel, "Cancellation")?;
    }

    let update = StatusUpdate::from(body.into_inner());
    let target = update.target();
    let booking = service.update_status(path.into_inner(), update).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        booking,
        format!("Booking is now {}", target),
    )))
}

/// Cancel a booking and compute its refund
///
/// POST /api/v1/bookings/{id}/cancel
#[instrument(skip(service, body))]
pub async fn cancel_booking(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
    body: web::Json<CancelBody>,
) -> Result<HttpResponse, AppError> {
    validate_input(&*body, "Cancellation")?;

    let booking = service
        .cancel(path.into_inner(), body.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(booking, "Booking cancelled")))
}

/// Append an extra charge to the ledger
///
/// POST /api/v1/bookings/{id}/extra-charges
#[instrument(skip(service, body))]
pub async fn add_extra_charge(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
    body: web::Json<ExtraChargeBody>,
) -> Result<HttpResponse, AppError> {
    validate_input(&*body, "Extra charge")?;

    let charge = body.into_inner().into_charge(Utc::now().date_naive());
    let booking = service.add_extra_charge(path.into_inner(), charge).await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(booking, "Charge added")))
}

/// Record a front-desk payment
///
/// POST /api/v1/bookings/{id}/payments
#[instrument(skip(service, body))]
pub async fn record_payment(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
    body: web::Json<PaymentBody>,
) -> Result<HttpResponse, AppError> {
    validate_input(&*body, "Payment")?;

    let booking = service
        .record_payment(path.into_inner(), body.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(booking, "Payment recorded")))
}

/// Start a gateway payment for the amount due
///
/// POST /api/v1/bookings/{id}/payments/initiate
#[instrument(skip(service, body))]
pub async fn initiate_payment(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
    body: web::Json<InitiatePaymentBody>,
) -> Result<HttpResponse, AppError> {
    let initiation = service
        .initiate_payment(path.into_inner(), body.method)
        .await?;

    let message = if initiation.redirect_url.is_some() {
        "Redirect the guest to the payment page"
    } else {
        "Payment gateway unavailable"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(initiation, message)))
}

/// Verify a gateway payment by token
///
/// POST /api/v1/bookings/{id}/payments/verify
#[instrument(skip(service, body))]
pub async fn verify_payment(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
    body: web::Json<VerifyPaymentBody>,
) -> Result<HttpResponse, AppError> {
    validate_input(&*body, "Payment verification")?;

    let booking = service
        .verify_payment(path.into_inner(), &body.token, body.method)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(booking)))
}

/// Record the refund outcome of a cancelled booking
///
/// POST /api/v1/bookings/{id}/refund
#[instrument(skip(service, body))]
pub async fn settle_refund(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
    body: web::Json<RefundBody>,
) -> Result<HttpResponse, AppError> {
    let booking = service
        .settle_refund(path.into_inner(), body.processed)
        .await?;

    info!(
        booking_number = %booking.booking_number,
        processed = body.processed,
        "Refund settled"
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(booking)))
}

/// Configure booking routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create_booking))
            .route("", web::get().to(list_bookings))
            .route("/number/{booking_number}", web::get().to(get_booking_by_number))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}/status", web::put().to(update_status))
            .route("/{id}/cancel", web::post().to(cancel_booking))
            .route("/{id}/extra-charges", web::post().to(add_extra_charge))
            .route("/{id}/payments", web::post().to(record_payment))
            .route("/{id}/payments/initiate", web::post().to(initiate_payment))
            .route("/{id}/payments/verify", web::post().to(verify_payment))
            .route("/{id}/refund", web::post().to(settle_refund)),
    );
}
