//! HTTP request handlers

pub mod availability;
pub mod booking;
pub mod health;
pub mod housekeeping;

use actix_web::web;

pub use availability::configure as configure_availability;
pub use booking::configure as configure_bookings;
pub use health::configure as configure_health;
pub use housekeeping::configure as configure_housekeeping;

/// Mount every versioned API route under `/api/v1`
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(configure_availability)
            .configure(configure_bookings)
            .configure(configure_housekeeping),
    );
}
