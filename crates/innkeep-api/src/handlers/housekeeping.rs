//! Housekeeping handlers
//!
//! Housekeeping reports cleaned rooms so they become ready for arrivals.

use crate::dto::{validate_input, ApiResponse, CleanRoomsBody};
use actix_web::{web, HttpResponse};
use innkeep_core::AppError;
use innkeep_services::BookingService;
use tracing::{info, instrument};
use uuid::Uuid;

/// Current ready, occupied and cleaning counts of a room type
///
/// GET /api/v1/room-types/{room_type_id}/housekeeping
#[instrument(skip(service))]
pub async fn room_occupancy(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let occupancy = service.room_occupancy(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(occupancy)))
}

/// Mark rooms of a room type as cleaned
///
/// POST /api/v1/room-types/{room_type_id}/housekeeping/clean
#[instrument(skip(service, body))]
pub async fn mark_rooms_clean(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
    body: web::Json<CleanRoomsBody>,
) -> Result<HttpResponse, AppError> {
    validate_input(&*body, "Housekeeping")?;

    let room_type_id = path.into_inner();
    let occupancy = service
        .mark_rooms_clean(room_type_id, body.quantity)
        .await?;

    info!(%room_type_id, quantity = body.quantity, "Rooms reported clean");
    Ok(HttpResponse::Ok().json(ApiResponse::success(occupancy)))
}

/// Configure housekeeping routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/room-types/{room_type_id}/housekeeping",
        web::get().to(room_occupancy),
    )
    .route(
        "/room-types/{room_type_id}/housekeeping/clean",
        web::post().to(mark_rooms_clean),
    );
}
