//! Read side of the booking ledger.

use crate::{error::AppResult, models::booking_model::BookingDetail, store::Store};

pub async fn my_bookings(store: &dyn Store, user_id: &str) -> AppResult<Vec<BookingDetail>> {
    Ok(store.bookings_for_user(user_id).await?)
}

/// Bookings for every movie owned by `admin_id`, newest first.
pub async fn admin_bookings(store: &dyn Store, admin_id: &str) -> AppResult<Vec<BookingDetail>> {
    Ok(store.bookings_for_admin(admin_id).await?)
}
