//! Log-only collaborators
//!
//! Used when Redis pub/sub is disabled: housekeeping requests and guest
//! notifications are written to the log instead of being published.

use async_trait::async_trait;
use innkeep_core::{
    traits::{BookingEvent, BookingNotifier, CleaningRequest, HousekeepingNotifier},
    AppResult,
};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl HousekeepingNotifier for LogNotifier {
    async fn rooms_need_cleaning(&self, request: &CleaningRequest) -> AppResult<()> {
        info!(
            booking_number = %request.booking_number,
            "{} {} rooms need cleaning {:?}",
            request.quantity,
            request.room_type_name,
            request.room_numbers
        );
        Ok(())
    }
}

#[async_trait]
impl BookingNotifier for LogNotifier {
    async fn notify(&self, event: &BookingEvent) -> AppResult<()> {
        info!(
            booking_number = %event.booking_number,
            "Guest {} <{}>: booking {:?}",
            event.guest_name,
            event.guest_email,
            event.kind
        );
        Ok(())
    }
}
