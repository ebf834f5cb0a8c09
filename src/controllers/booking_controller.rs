use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path,
    },
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;

use crate::{
    auth::{AdminIdentity, Identity},
    error::AppError,
    models::booking_model::{Booking, BookingDetail, CreateBooking, StatusUpdate},
    services::{ledger, reservation, status},
    store::Store,
};

pub async fn create_booking(
    Extension(store): Extension<Arc<dyn Store>>,
    identity: Identity,
    payload: Result<Json<CreateBooking>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let Json(request) = payload?;
    let booking = reservation::reserve(store.as_ref(), &identity.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn load_my_bookings(
    Extension(store): Extension<Arc<dyn Store>>,
    identity: Identity,
) -> Result<Json<Vec<BookingDetail>>, AppError> {
    let bookings = ledger::my_bookings(store.as_ref(), &identity.user_id).await?;
    Ok(Json(bookings))
}

pub async fn load_admin_bookings(
    Extension(store): Extension<Arc<dyn Store>>,
    admin: AdminIdentity,
) -> Result<Json<Vec<BookingDetail>>, AppError> {
    let bookings = ledger::admin_bookings(store.as_ref(), admin.user_id()).await?;
    Ok(Json(bookings))
}

pub async fn update_booking_status(
    id: Result<Path<String>, PathRejection>,
    Extension(store): Extension<Arc<dyn Store>>,
    admin: AdminIdentity,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<BookingDetail>, AppError> {
    let Path(id_str) = id?;
    let Json(update) = payload?;
    let booking = status::set_status(store.as_ref(), &id_str, admin.user_id(), &update.status).await?;
    Ok(Json(booking))
}
