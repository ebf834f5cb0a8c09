//! Seat reservation.
//!
//! Each requested seat is claimed with a compare-and-set on the movie
//! document. The booking is written only after every claim succeeded; a
//! failed claim or a failed booking write releases the seats already taken
//! by this request before the error is returned.

use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::booking_model::{Booking, BookingStatus, CreateBooking},
    store::{SeatKey, Store},
    utils::{new_id, now_millis, parse_id},
};

fn validate(request: &CreateBooking) -> AppResult<()> {
    if request.theater.name.trim().is_empty() || request.theater.location.trim().is_empty() {
        return Err(AppError::Validation("Theater is required".into()));
    }
    if request.show_time.trim().is_empty() {
        return Err(AppError::Validation("Show time is required".into()));
    }
    if request.seats.is_empty() {
        return Err(AppError::Validation("At least one seat is required".into()));
    }

    let mut seen = HashSet::new();
    for seat in &request.seats {
        if seat.seat_number.trim().is_empty() {
            return Err(AppError::Validation("Seat number is required".into()));
        }
        if !seen.insert(seat.seat_number.as_str()) {
            return Err(AppError::Validation(format!(
                "Seat {} is requested more than once",
                seat.seat_number
            )));
        }
        if !seat.price.is_finite() || seat.price < 0.0 {
            return Err(AppError::Validation(format!(
                "Seat {} has an invalid price",
                seat.seat_number
            )));
        }
    }
    Ok(())
}

/// Releases claims made by this request. Failures are logged, not returned,
/// so the original error reaches the caller.
async fn roll_back(store: &dyn Store, keys: &[SeatKey<'_>], user_id: &str) {
    for key in keys {
        match store.release_seat(*key, user_id).await {
            Ok(true) => {}
            Ok(false) => tracing::error!(
                movie_id = key.movie_id,
                seat = key.seat_number,
                "rollback found seat no longer held by this request"
            ),
            Err(e) => tracing::error!(
                movie_id = key.movie_id,
                seat = key.seat_number,
                error = ?e,
                "failed to release seat during rollback"
            ),
        }
    }
}

#[tracing::instrument(skip(store, request), fields(movie_id = %request.movie_id, show_time = %request.show_time))]
pub async fn reserve(store: &dyn Store, user_id: &str, request: CreateBooking) -> AppResult<Booking> {
    validate(&request)?;
    let movie_id = parse_id(&request.movie_id, "movie")?;

    let movie = store
        .find_movie(&movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie".into()))?;
    let theater = movie
        .theater(&request.theater.name, &request.theater.location)
        .ok_or_else(|| AppError::NotFound("Theater".into()))?;
    let show_time = theater
        .show_time(&request.show_time)
        .ok_or_else(|| AppError::NotFound("Show time".into()))?;

    // Fast rejection from the snapshot; the claims below are authoritative.
    for seat in &request.seats {
        match show_time.seat(&seat.seat_number) {
            Some(s) if !s.is_booked => {}
            _ => {
                return Err(AppError::Conflict(format!(
                    "Seat {} is not available",
                    seat.seat_number
                )))
            }
        }
    }

    let mut claimed: Vec<SeatKey<'_>> = Vec::with_capacity(request.seats.len());
    for seat in &request.seats {
        let key = SeatKey {
            movie_id: &movie_id,
            theater: &request.theater,
            show_time: &request.show_time,
            seat_number: &seat.seat_number,
        };
        match store.claim_seat(key, user_id).await {
            Ok(true) => claimed.push(key),
            Ok(false) => {
                tracing::warn!(seat = %seat.seat_number, "seat taken concurrently, rolling back");
                roll_back(store, &claimed, user_id).await;
                return Err(AppError::Conflict(format!(
                    "Seat {} is not available",
                    seat.seat_number
                )));
            }
            Err(e) => {
                roll_back(store, &claimed, user_id).await;
                return Err(e.into());
            }
        }
    }

    let booking = Booking {
        id: new_id(),
        user: user_id.to_string(),
        movie: movie_id.clone(),
        theater: request.theater.clone(),
        show_time: request.show_time.clone(),
        total_amount: request.seats.iter().map(|s| s.price).sum(),
        seats: request.seats.clone(),
        booking_date: now_millis(),
        status: BookingStatus::Pending,
    };

    if let Err(e) = store.insert_booking(&booking).await {
        roll_back(store, &claimed, user_id).await;
        return Err(e.into());
    }

    tracing::info!(booking_id = %booking.id, seats = booking.seats.len(), "booking created");
    Ok(booking)
}
