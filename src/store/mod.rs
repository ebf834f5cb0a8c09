//! Persistence seam for the catalog and the booking ledger.
//!
//! Two backends implement [`Store`]: [`MongoStore`] for deployments and
//! [`MemoryStore`] for local runs and the test-suite. Both must apply
//! [`Store::claim_seat`] as a single compare-and-set on one embedded seat.

use async_trait::async_trait;

use crate::models::{
    booking_model::{Booking, BookingDetail, BookingStatus, TheaterRef},
    movie_model::{Movie, MovieFilter, MovieUpdate, Theater},
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Address of one seat inside a movie's theater/showtime tree.
#[derive(Debug, Clone, Copy)]
pub struct SeatKey<'a> {
    pub movie_id: &'a str,
    pub theater: &'a TheaterRef,
    pub show_time: &'a str,
    pub seat_number: &'a str,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_movie(&self, movie: &Movie) -> anyhow::Result<()>;

    async fn find_movie(&self, id: &str) -> anyhow::Result<Option<Movie>>;

    async fn list_movies(&self, filter: &MovieFilter) -> anyhow::Result<Vec<Movie>>;

    /// Applies the set fields of `update` if `admin` owns the movie.
    ///
    /// With `expected_theaters`, the write also requires the stored seat tree
    /// to still equal it, so a concurrent claim or release makes the update
    /// miss instead of being overwritten. Returns the updated movie, or `None`
    /// when nothing matched.
    async fn update_movie(
        &self,
        id: &str,
        admin: &str,
        update: &MovieUpdate,
        expected_theaters: Option<&[Theater]>,
    ) -> anyhow::Result<Option<Movie>>;

    /// Deletes the movie if `admin` owns it. Returns whether a movie was removed.
    async fn delete_movie(&self, id: &str, admin: &str) -> anyhow::Result<bool>;

    /// Marks the seat booked by `user` only if it is currently free.
    /// Returns `false` when the seat is missing or already taken.
    async fn claim_seat(&self, key: SeatKey<'_>, user: &str) -> anyhow::Result<bool>;

    /// Frees the seat only if it is booked by `user`. Compensates a claim.
    async fn release_seat(&self, key: SeatKey<'_>, user: &str) -> anyhow::Result<bool>;

    async fn insert_booking(&self, booking: &Booking) -> anyhow::Result<()>;

    async fn find_booking(&self, id: &str) -> anyhow::Result<Option<Booking>>;

    async fn find_booking_detail(&self, id: &str) -> anyhow::Result<Option<BookingDetail>>;

    async fn set_booking_status(&self, id: &str, status: BookingStatus) -> anyhow::Result<bool>;

    /// Bookings made by `user`, newest first.
    async fn bookings_for_user(&self, user: &str) -> anyhow::Result<Vec<BookingDetail>>;

    /// Bookings whose movie is owned by `admin`, newest first.
    async fn bookings_for_admin(&self, admin: &str) -> anyhow::Result<Vec<BookingDetail>>;
}
