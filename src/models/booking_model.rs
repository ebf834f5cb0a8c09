use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::utils::rfc3339_millis;

use super::movie_model::MovieSummary;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!(
                "Status must be one of: pending, confirmed, cancelled (got {other:?})"
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TheaterRef {
    pub name: String,
    pub location: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookedSeat {
    pub seat_number: String,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub movie: String,
    pub theater: TheaterRef,
    pub show_time: String,
    pub seats: Vec<BookedSeat>,
    pub total_amount: f64,
    #[serde(with = "rfc3339_millis")]
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
}

/// A booking with its movie populated, as returned by the listing endpoints.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    #[serde(default)]
    pub movie: Option<MovieSummary>,
    pub theater: TheaterRef,
    pub show_time: String,
    pub seats: Vec<BookedSeat>,
    pub total_amount: f64,
    #[serde(with = "rfc3339_millis")]
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
}

impl BookingDetail {
    pub fn from_parts(booking: Booking, movie: Option<MovieSummary>) -> Self {
        BookingDetail {
            id: booking.id,
            user: booking.user,
            movie,
            theater: booking.theater,
            show_time: booking.show_time,
            seats: booking.seats,
            total_amount: booking.total_amount,
            booking_date: booking.booking_date,
            status: booking.status,
        }
    }
}

/// Body of `POST /api/bookings`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub movie_id: String,
    pub theater: TheaterRef,
    pub show_time: String,
    pub seats: Vec<BookedSeat>,
}

/// Body of `PATCH /api/bookings/:id/status`. The raw string is parsed by the
/// status service so an unknown value surfaces as a validation error.
#[derive(Debug, Deserialize, Clone)]
pub struct StatusUpdate {
    pub status: String,
}
