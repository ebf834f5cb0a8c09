use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::rfc3339_millis;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub seat_number: String,
    #[serde(default)]
    pub is_booked: bool,
    #[serde(default)]
    pub booked_by: Option<String>,
}

impl Seat {
    pub fn free(seat_number: impl Into<String>) -> Self {
        Seat {
            seat_number: seat_number.into(),
            is_booked: false,
            booked_by: None,
        }
    }

    /// A seat is consistent when the booked flag and the holder agree.
    pub fn is_consistent(&self) -> bool {
        self.is_booked == self.booked_by.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShowTime {
    pub time: String,
    #[serde(default)]
    pub seats: Vec<Seat>,
}

impl ShowTime {
    pub fn seat(&self, seat_number: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.seat_number == seat_number)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Theater {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub show_times: Vec<ShowTime>,
}

impl Theater {
    pub fn show_time(&self, time: &str) -> Option<&ShowTime> {
        self.show_times.iter().find(|st| st.time == time)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub duration: u32,
    #[serde(with = "rfc3339_millis")]
    pub release_date: DateTime<Utc>,
    pub poster: String,
    pub admin: String,
    #[serde(default)]
    pub theaters: Vec<Theater>,
    #[serde(with = "rfc3339_millis")]
    pub created_at: DateTime<Utc>,
}

impl Movie {
    /// Theater identity inside a movie is the exact (name, location) pair.
    pub fn theater(&self, name: &str, location: &str) -> Option<&Theater> {
        self.theaters
            .iter()
            .find(|t| t.name == name && t.location == location)
    }

    pub fn summary(&self) -> MovieSummary {
        MovieSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            genre: self.genre.clone(),
            duration: self.duration,
            release_date: self.release_date,
            poster: self.poster.clone(),
        }
    }
}

/// Movie metadata without the seat inventory, used when populating bookings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MovieSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub duration: u32,
    #[serde(with = "rfc3339_millis")]
    pub release_date: DateTime<Utc>,
    pub poster: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    pub title: String,
    pub description: String,
    pub genre: String,
    pub duration: u32,
    pub release_date: String,
    pub poster: String,
    #[serde(default)]
    pub theaters: Vec<Theater>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<u32>,
    pub release_date: Option<String>,
    pub poster: Option<String>,
    pub theaters: Option<Vec<Theater>>,
}

/// Optional listing filters, ANDed together.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MovieFilter {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub location: Option<String>,
    #[serde(skip)]
    pub admin: Option<String>,
}

impl MovieFilter {
    /// Drops blank query values so `?genre=` behaves like no filter.
    pub fn normalized(self) -> Self {
        fn keep(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        MovieFilter {
            search: keep(self.search),
            genre: keep(self.genre),
            location: keep(self.location),
            admin: self.admin,
        }
    }

    pub fn by_admin(admin: impl Into<String>) -> Self {
        MovieFilter {
            admin: Some(admin.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}
