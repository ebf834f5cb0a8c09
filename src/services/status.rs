//! Booking status transitions.
//!
//! Any status may move to any other status. Cancelling does not return the
//! seats to the movie's inventory.

use crate::{
    error::{AppError, AppResult},
    models::booking_model::{BookingDetail, BookingStatus},
    store::Store,
    utils::parse_id,
};

#[tracing::instrument(skip(store))]
pub async fn set_status(
    store: &dyn Store,
    booking_id: &str,
    admin_id: &str,
    new_status: &str,
) -> AppResult<BookingDetail> {
    let status: BookingStatus = new_status.trim().parse().map_err(AppError::Validation)?;
    let booking_id = parse_id(booking_id, "booking")?;

    let booking = store
        .find_booking(&booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking".into()))?;

    let owns_movie = store
        .find_movie(&booking.movie)
        .await?
        .is_some_and(|movie| movie.admin == admin_id);
    if !owns_movie {
        tracing::warn!("status change refused, caller does not own the movie");
        return Err(AppError::Forbidden("Unauthorized to update this booking".into()));
    }

    if !store.set_booking_status(&booking_id, status).await? {
        return Err(AppError::NotFound("Booking".into()));
    }
    tracing::info!(from = %booking.status, to = %status, "booking status changed");

    store
        .find_booking_detail(&booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking".into()))
}
