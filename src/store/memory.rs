use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
    models::{
        booking_model::{Booking, BookingDetail, BookingStatus},
        movie_model::{Movie, MovieFilter, MovieUpdate, Seat, Theater},
    },
    utils::{contains_ci, parse_timestamp},
};

use super::{SeatKey, Store};

/// Process-local store. Every seat mutation runs under the movies write lock,
/// so a claim observes and flips `isBooked` in one step.
#[derive(Default)]
pub struct MemoryStore {
    movies: RwLock<HashMap<String, Movie>>,
    bookings: RwLock<HashMap<String, Booking>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(movie: &Movie, filter: &MovieFilter) -> bool {
    if let Some(admin) = &filter.admin {
        if &movie.admin != admin {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        if !contains_ci(&movie.title, search) && !contains_ci(&movie.description, search) {
            return false;
        }
    }
    if let Some(genre) = &filter.genre {
        if !contains_ci(&movie.genre, genre) {
            return false;
        }
    }
    if let Some(location) = &filter.location {
        if !movie.theaters.iter().any(|t| contains_ci(&t.location, location)) {
            return false;
        }
    }
    true
}

fn seat_mut<'m>(movies: &'m mut HashMap<String, Movie>, key: &SeatKey<'_>) -> Option<&'m mut Seat> {
    movies
        .get_mut(key.movie_id)?
        .theaters
        .iter_mut()
        .find(|t| t.name == key.theater.name && t.location == key.theater.location)?
        .show_times
        .iter_mut()
        .find(|st| st.time == key.show_time)?
        .seats
        .iter_mut()
        .find(|s| s.seat_number == key.seat_number)
}

fn newest_first(bookings: &mut [BookingDetail]) {
    bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_movie(&self, movie: &Movie) -> anyhow::Result<()> {
        let mut movies = self.movies.write().await;
        if movies.contains_key(&movie.id) {
            return Err(anyhow!("duplicate movie id {}", movie.id));
        }
        movies.insert(movie.id.clone(), movie.clone());
        Ok(())
    }

    async fn find_movie(&self, id: &str) -> anyhow::Result<Option<Movie>> {
        Ok(self.movies.read().await.get(id).cloned())
    }

    async fn list_movies(&self, filter: &MovieFilter) -> anyhow::Result<Vec<Movie>> {
        let movies = self.movies.read().await;
        let mut result: Vec<Movie> = movies
            .values()
            .filter(|m| matches_filter(m, filter))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    async fn update_movie(
        &self,
        id: &str,
        admin: &str,
        update: &MovieUpdate,
        expected_theaters: Option<&[Theater]>,
    ) -> anyhow::Result<Option<Movie>> {
        let mut movies = self.movies.write().await;
        let Some(movie) = movies.get_mut(id).filter(|m| m.admin == admin) else {
            return Ok(None);
        };
        if expected_theaters.is_some_and(|expected| movie.theaters != expected) {
            return Ok(None);
        }

        if let Some(title) = &update.title {
            movie.title = title.clone();
        }
        if let Some(description) = &update.description {
            movie.description = description.clone();
        }
        if let Some(genre) = &update.genre {
            movie.genre = genre.clone();
        }
        if let Some(duration) = update.duration {
            movie.duration = duration;
        }
        if let Some(release_date) = &update.release_date {
            movie.release_date = parse_timestamp(release_date).map_err(|e| anyhow!(e))?;
        }
        if let Some(poster) = &update.poster {
            movie.poster = poster.clone();
        }
        if let Some(theaters) = &update.theaters {
            movie.theaters = theaters.clone();
        }
        Ok(Some(movie.clone()))
    }

    async fn delete_movie(&self, id: &str, admin: &str) -> anyhow::Result<bool> {
        let mut movies = self.movies.write().await;
        let owned = movies.get(id).is_some_and(|m| m.admin == admin);
        if owned {
            movies.remove(id);
        }
        Ok(owned)
    }

    async fn claim_seat(&self, key: SeatKey<'_>, user: &str) -> anyhow::Result<bool> {
        let mut movies = self.movies.write().await;
        match seat_mut(&mut movies, &key) {
            Some(seat) if !seat.is_booked => {
                seat.is_booked = true;
                seat.booked_by = Some(user.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_seat(&self, key: SeatKey<'_>, user: &str) -> anyhow::Result<bool> {
        let mut movies = self.movies.write().await;
        match seat_mut(&mut movies, &key) {
            Some(seat) if seat.is_booked && seat.booked_by.as_deref() == Some(user) => {
                seat.is_booked = false;
                seat.booked_by = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_booking(&self, booking: &Booking) -> anyhow::Result<()> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(anyhow!("duplicate booking id {}", booking.id));
        }
        bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn find_booking(&self, id: &str) -> anyhow::Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(id).cloned())
    }

    async fn find_booking_detail(&self, id: &str) -> anyhow::Result<Option<BookingDetail>> {
        let Some(booking) = self.find_booking(id).await? else {
            return Ok(None);
        };
        let movie = self.movies.read().await.get(&booking.movie).map(Movie::summary);
        Ok(Some(BookingDetail::from_parts(booking, movie)))
    }

    async fn set_booking_status(&self, id: &str, status: BookingStatus) -> anyhow::Result<bool> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(id) {
            Some(booking) => {
                booking.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn bookings_for_user(&self, user: &str) -> anyhow::Result<Vec<BookingDetail>> {
        let bookings = self.bookings.read().await;
        let movies = self.movies.read().await;
        let mut result: Vec<BookingDetail> = bookings
            .values()
            .filter(|b| b.user == user)
            .map(|b| BookingDetail::from_parts(b.clone(), movies.get(&b.movie).map(Movie::summary)))
            .collect();
        newest_first(&mut result);
        Ok(result)
    }

    async fn bookings_for_admin(&self, admin: &str) -> anyhow::Result<Vec<BookingDetail>> {
        let bookings = self.bookings.read().await;
        let movies = self.movies.read().await;
        let mut result: Vec<BookingDetail> = bookings
            .values()
            .filter_map(|b| {
                let movie = movies.get(&b.movie).filter(|m| m.admin == admin)?;
                Some(BookingDetail::from_parts(b.clone(), Some(movie.summary())))
            })
            .collect();
        newest_first(&mut result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{booking_model::TheaterRef, movie_model::{ShowTime, Theater}},
        utils::{new_id, now_millis},
    };

    fn movie(admin: &str, title: &str, genre: &str, location: &str) -> Movie {
        Movie {
            id: new_id(),
            title: title.into(),
            description: format!("{title} description"),
            genre: genre.into(),
            duration: 120,
            release_date: now_millis(),
            poster: "poster.png".into(),
            admin: admin.into(),
            theaters: vec![Theater {
                name: "Cineplex".into(),
                location: location.into(),
                show_times: vec![ShowTime {
                    time: "18:00".into(),
                    seats: vec![Seat::free("A1"), Seat::free("A2")],
                }],
            }],
            created_at: now_millis(),
        }
    }

    #[tokio::test]
    async fn claim_is_compare_and_set() {
        let store = MemoryStore::new();
        let m = movie("admin", "Dune", "Sci-Fi", "Downtown");
        store.insert_movie(&m).await.unwrap();

        let theater = TheaterRef {
            name: "Cineplex".into(),
            location: "Downtown".into(),
        };
        let key = SeatKey {
            movie_id: &m.id,
            theater: &theater,
            show_time: "18:00",
            seat_number: "A1",
        };

        assert!(store.claim_seat(key, "u1").await.unwrap());
        assert!(!store.claim_seat(key, "u2").await.unwrap());

        // only the holder can release
        assert!(!store.release_seat(key, "u2").await.unwrap());
        assert!(store.release_seat(key, "u1").await.unwrap());
        assert!(store.claim_seat(key, "u2").await.unwrap());

        let stored = store.find_movie(&m.id).await.unwrap().unwrap();
        let seat = stored.theaters[0].show_times[0].seat("A1").unwrap();
        assert!(seat.is_booked);
        assert_eq!(seat.booked_by.as_deref(), Some("u2"));
    }

    #[tokio::test]
    async fn claim_of_unknown_seat_fails() {
        let store = MemoryStore::new();
        let m = movie("admin", "Dune", "Sci-Fi", "Downtown");
        store.insert_movie(&m).await.unwrap();

        let theater = TheaterRef {
            name: "Cineplex".into(),
            location: "Uptown".into(),
        };
        let key = SeatKey {
            movie_id: &m.id,
            theater: &theater,
            show_time: "18:00",
            seat_number: "A1",
        };
        assert!(!store.claim_seat(key, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_are_case_insensitive_substrings() {
        let store = MemoryStore::new();
        store.insert_movie(&movie("a1", "Dune", "Sci-Fi", "Downtown")).await.unwrap();
        store.insert_movie(&movie("a1", "Heat", "Crime", "Uptown")).await.unwrap();
        store.insert_movie(&movie("a2", "Alien", "Sci-Fi Horror", "Harbor")).await.unwrap();

        let sci_fi = MovieFilter {
            genre: Some("sci-fi".into()),
            ..Default::default()
        };
        assert_eq!(store.list_movies(&sci_fi).await.unwrap().len(), 2);

        let town = MovieFilter {
            location: Some("TOWN".into()),
            ..Default::default()
        };
        assert_eq!(store.list_movies(&town).await.unwrap().len(), 2);

        let search = MovieFilter {
            search: Some("heat desc".into()),
            ..Default::default()
        };
        let found = store.list_movies(&search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Heat");

        assert_eq!(store.list_movies(&MovieFilter::by_admin("a2")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_require_the_owner() {
        let store = MemoryStore::new();
        let m = movie("owner", "Dune", "Sci-Fi", "Downtown");
        store.insert_movie(&m).await.unwrap();

        let update = MovieUpdate {
            title: Some("Dune: Part Two".into()),
            ..Default::default()
        };
        assert!(store.update_movie(&m.id, "intruder", &update, None).await.unwrap().is_none());
        let updated = store.update_movie(&m.id, "owner", &update, None).await.unwrap().unwrap();
        assert_eq!(updated.title, "Dune: Part Two");
        assert_eq!(updated.genre, "Sci-Fi");

        assert!(!store.delete_movie(&m.id, "intruder").await.unwrap());
        assert!(store.delete_movie(&m.id, "owner").await.unwrap());
        assert!(store.find_movie(&m.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inventory_guard_rejects_a_stale_seat_tree() {
        let store = MemoryStore::new();
        let m = movie("owner", "Dune", "Sci-Fi", "Downtown");
        store.insert_movie(&m).await.unwrap();

        let theater = TheaterRef {
            name: "Cineplex".into(),
            location: "Downtown".into(),
        };
        let key = SeatKey {
            movie_id: &m.id,
            theater: &theater,
            show_time: "18:00",
            seat_number: "A1",
        };
        assert!(store.claim_seat(key, "u1").await.unwrap());

        let update = MovieUpdate {
            theaters: Some(m.theaters.clone()),
            ..Default::default()
        };
        assert!(store
            .update_movie(&m.id, "owner", &update, Some(m.theaters.as_slice()))
            .await
            .unwrap()
            .is_none());

        let stored = store.find_movie(&m.id).await.unwrap().unwrap();
        assert_eq!(stored.theaters[0].show_times[0].seat("A1").unwrap().booked_by.as_deref(), Some("u1"));
        assert!(store
            .update_movie(&m.id, "owner", &update, Some(stored.theaters.as_slice()))
            .await
            .unwrap()
            .is_some());
    }
}
