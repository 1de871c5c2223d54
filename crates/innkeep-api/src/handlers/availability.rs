//! Availability handlers

use crate::dto::{validate_input, ApiResponse, AvailabilityParams};
use actix_web::{web, HttpResponse};
use innkeep_core::AppError;
use innkeep_services::BookingService;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Search sellable room types for a stay
///
/// GET /api/v1/hotels/{hotel_id}/availability
#[instrument(skip(service))]
pub async fn search_availability(
    service: web::Data<BookingService>,
    path: web::Path<Uuid>,
    query: web::Query<AvailabilityParams>,
) -> Result<HttpResponse, AppError> {
    validate_input(&*query, "Availability")?;

    let hotel_id = path.into_inner();
    let results = service
        .search_availability(&query.to_query(hotel_id))
        .await?;

    debug!(%hotel_id, room_types = results.len(), "Availability computed");
    Ok(HttpResponse::Ok().json(ApiResponse::success(results)))
}

/// Configure availability routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/hotels/{hotel_id}/availability",
        web::get().to(search_availability),
    );
}
