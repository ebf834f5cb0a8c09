//! Movie catalog: admin-owned movies with their theater/showtime/seat tree.

use chrono::SecondsFormat;
use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::movie_model::{Movie, MovieFilter, MovieUpdate, NewMovie, Seat, Theater},
    store::Store,
    utils::{new_id, now_millis, parse_id, parse_timestamp},
};

const INVENTORY_RETRIES: usize = 3;

fn require(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_theaters(theaters: &[Theater]) -> AppResult<()> {
    for theater in theaters {
        require(&theater.name, "Theater name")?;
        require(&theater.location, "Theater location")?;
        for show_time in &theater.show_times {
            require(&show_time.time, "Show time")?;
            let mut seen = HashSet::new();
            for seat in &show_time.seats {
                require(&seat.seat_number, "Seat number")?;
                if !seen.insert(seat.seat_number.as_str()) {
                    return Err(AppError::Validation(format!(
                        "Seat {} appears twice in show time {}",
                        seat.seat_number, show_time.time
                    )));
                }
                if !seat.is_consistent() {
                    return Err(AppError::Validation(format!(
                        "Seat {} must be booked exactly when it has a holder",
                        seat.seat_number
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Seats enter the inventory free; only a reservation may book them.
fn require_free_seats(theaters: &[Theater]) -> AppResult<()> {
    let booked = theaters
        .iter()
        .flat_map(|t| &t.show_times)
        .flat_map(|st| &st.seats)
        .find(|s| s.is_booked || s.booked_by.is_some());
    match booked {
        Some(seat) => Err(AppError::Validation(format!(
            "Seat {} cannot be created as booked",
            seat.seat_number
        ))),
        None => Ok(()),
    }
}

fn find_seat<'m>(
    theaters: &'m [Theater],
    name: &str,
    location: &str,
    time: &str,
    seat_number: &str,
) -> Option<&'m Seat> {
    theaters
        .iter()
        .find(|t| t.name == name && t.location == location)?
        .show_time(time)?
        .seat(seat_number)
}

/// Builds the seat tree to write from a submitted one. Booked state always
/// comes from `stored`, so a held seat keeps its holder even when resent free.
/// Booked seats that `stored` does not hold are rejected, as is dropping a held seat.
fn carry_seat_state(stored: &[Theater], mut incoming: Vec<Theater>) -> AppResult<Vec<Theater>> {
    for theater in &mut incoming {
        for show_time in &mut theater.show_times {
            for seat in &mut show_time.seats {
                let held = find_seat(
                    stored,
                    &theater.name,
                    &theater.location,
                    &show_time.time,
                    &seat.seat_number,
                )
                .filter(|s| s.is_booked);
                match held {
                    Some(held) => {
                        if seat.is_booked && seat.booked_by != held.booked_by {
                            return Err(AppError::Validation(format!(
                                "Seat {} is held by another booking",
                                seat.seat_number
                            )));
                        }
                        seat.is_booked = true;
                        seat.booked_by = held.booked_by.clone();
                    }
                    None if seat.is_booked => {
                        return Err(AppError::Validation(format!(
                            "Seat {} cannot be marked booked outside a reservation",
                            seat.seat_number
                        )))
                    }
                    None => {}
                }
            }
        }
    }

    for theater in stored {
        for show_time in &theater.show_times {
            for seat in show_time.seats.iter().filter(|s| s.is_booked) {
                let kept = find_seat(
                    &incoming,
                    &theater.name,
                    &theater.location,
                    &show_time.time,
                    &seat.seat_number,
                );
                if kept.is_none() {
                    return Err(AppError::Conflict(format!(
                        "Seat {} is booked and cannot be removed",
                        seat.seat_number
                    )));
                }
            }
        }
    }
    Ok(incoming)
}

fn validate_duration(duration: u32) -> AppResult<()> {
    if duration == 0 {
        return Err(AppError::Validation("Duration must be a positive number".into()));
    }
    Ok(())
}

fn release_date(raw: &str) -> AppResult<chrono::DateTime<chrono::Utc>> {
    parse_timestamp(raw.trim()).map_err(|_| AppError::Validation("Invalid release date".into()))
}

#[tracing::instrument(skip(store, new_movie), fields(title = %new_movie.title))]
pub async fn create_movie(store: &dyn Store, admin_id: &str, new_movie: NewMovie) -> AppResult<Movie> {
    require(&new_movie.title, "Title")?;
    require(&new_movie.description, "Description")?;
    require(&new_movie.genre, "Genre")?;
    require(&new_movie.poster, "Poster URL")?;
    validate_duration(new_movie.duration)?;
    validate_theaters(&new_movie.theaters)?;
    require_free_seats(&new_movie.theaters)?;

    let movie = Movie {
        id: new_id(),
        title: new_movie.title,
        description: new_movie.description,
        genre: new_movie.genre,
        duration: new_movie.duration,
        release_date: release_date(&new_movie.release_date)?,
        poster: new_movie.poster,
        admin: admin_id.to_string(),
        theaters: new_movie.theaters,
        created_at: now_millis(),
    };
    store.insert_movie(&movie).await?;

    tracing::info!(movie_id = %movie.id, "movie created");
    Ok(movie)
}

#[tracing::instrument(skip(store, update))]
pub async fn update_movie(
    store: &dyn Store,
    id: &str,
    admin_id: &str,
    mut update: MovieUpdate,
) -> AppResult<Movie> {
    let id = parse_id(id, "movie")?;

    for (value, field) in [
        (&update.title, "Title"),
        (&update.description, "Description"),
        (&update.genre, "Genre"),
        (&update.poster, "Poster URL"),
    ] {
        if let Some(value) = value {
            require(value, field)?;
        }
    }
    if let Some(duration) = update.duration {
        validate_duration(duration)?;
    }
    if let Some(theaters) = &update.theaters {
        validate_theaters(theaters)?;
    }
    if let Some(raw) = update.release_date.take() {
        let parsed = release_date(&raw)?;
        update.release_date = Some(parsed.to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    let Some(theaters) = update.theaters.take() else {
        return store
            .update_movie(&id, admin_id, &update, None)
            .await?
            .ok_or_else(|| AppError::NotFound("Movie".into()));
    };

    // A claim landing between the read and the write fails the guard; re-read and merge again.
    for _ in 0..INVENTORY_RETRIES {
        let current = store
            .find_movie(&id)
            .await?
            .filter(|m| m.admin == admin_id)
            .ok_or_else(|| AppError::NotFound("Movie".into()))?;

        let mut attempt = update.clone();
        attempt.theaters = Some(carry_seat_state(&current.theaters, theaters.clone())?);
        if let Some(movie) = store
            .update_movie(&id, admin_id, &attempt, Some(current.theaters.as_slice()))
            .await?
        {
            return Ok(movie);
        }
        tracing::debug!(movie_id = %id, "seat inventory changed during update, retrying");
    }

    Err(AppError::Conflict(
        "Seat inventory changed while updating, try again".into(),
    ))
}

#[tracing::instrument(skip(store))]
pub async fn delete_movie(store: &dyn Store, id: &str, admin_id: &str) -> AppResult<()> {
    let id = parse_id(id, "movie")?;
    if !store.delete_movie(&id, admin_id).await? {
        return Err(AppError::NotFound("Movie".into()));
    }
    tracing::info!(movie_id = %id, "movie deleted");
    Ok(())
}

pub async fn get_movie(store: &dyn Store, id: &str) -> AppResult<Movie> {
    let id = parse_id(id, "movie")?;
    store
        .find_movie(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie".into()))
}

pub async fn list_movies(store: &dyn Store, filter: MovieFilter) -> AppResult<Vec<Movie>> {
    let filter = filter.normalized();
    tracing::debug!(?filter, "listing movies");
    Ok(store.list_movies(&filter).await?)
}

/// Title/description search. Unlike the listing filters, the term is mandatory.
pub async fn search_movies(store: &dyn Store, q: Option<String>) -> AppResult<Vec<Movie>> {
    let q = q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("Search query is required".into()))?;

    let filter = MovieFilter {
        search: Some(q),
        ..Default::default()
    };
    let movies = store.list_movies(&filter).await?;
    tracing::debug!(results = movies.len(), "search finished");
    Ok(movies)
}

pub async fn admin_movies(store: &dyn Store, admin_id: &str) -> AppResult<Vec<Movie>> {
    Ok(store.list_movies(&MovieFilter::by_admin(admin_id)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            booking_model::{BookedSeat, CreateBooking, TheaterRef},
            movie_model::ShowTime,
        },
        services::reservation,
        store::MemoryStore,
    };

    const ADMIN: &str = "65f0000000000000000000aa";

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            title: title.into(),
            description: "A film".into(),
            genre: "Drama".into(),
            duration: 100,
            release_date: "2024-03-01".into(),
            poster: "poster.png".into(),
            theaters: vec![Theater {
                name: "Cineplex".into(),
                location: "Downtown".into(),
                show_times: vec![ShowTime {
                    time: "18:00".into(),
                    seats: vec![Seat::free("A1"), Seat::free("A2")],
                }],
            }],
        }
    }

    #[tokio::test]
    async fn create_assigns_owner_and_id() {
        let store = MemoryStore::new();
        let movie = create_movie(&store, ADMIN, new_movie("Tár")).await.unwrap();

        assert_eq!(movie.admin, ADMIN);
        assert_eq!(movie.id.len(), 24);
        assert_eq!(get_movie(&store, &movie.id).await.unwrap().title, "Tár");
        assert_eq!(admin_movies(&store, ADMIN).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_invalid_payloads() {
        let store = MemoryStore::new();

        let mut blank_title = new_movie("x");
        blank_title.title = "  ".into();
        let mut bad_date = new_movie("x");
        bad_date.release_date = "soon".into();
        let mut zero_duration = new_movie("x");
        zero_duration.duration = 0;
        let mut duplicate_seat = new_movie("x");
        duplicate_seat.theaters[0].show_times[0].seats.push(Seat::free("A1"));
        let mut inconsistent_seat = new_movie("x");
        inconsistent_seat.theaters[0].show_times[0].seats[0].is_booked = true;

        for bad in [blank_title, bad_date, zero_duration, duplicate_seat, inconsistent_seat] {
            let err = create_movie(&store, ADMIN, bad).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "unexpected {err:?}");
        }
        assert!(list_movies(&store, MovieFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_normalizes_release_date_and_checks_owner() {
        let store = MemoryStore::new();
        let movie = create_movie(&store, ADMIN, new_movie("Heat")).await.unwrap();

        let update = MovieUpdate {
            release_date: Some("1995-12-15".into()),
            ..Default::default()
        };
        let updated = update_movie(&store, &movie.id, ADMIN, update.clone()).await.unwrap();
        assert_eq!(
            updated.release_date.to_rfc3339_opts(SecondsFormat::Millis, true),
            "1995-12-15T00:00:00.000Z"
        );

        let err = update_movie(&store, &movie.id, "65f0000000000000000000bb", update)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn search_requires_a_term() {
        let store = MemoryStore::new();
        create_movie(&store, ADMIN, new_movie("Heat")).await.unwrap();

        assert!(matches!(
            search_movies(&store, None).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            search_movies(&store, Some("   ".into())).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert_eq!(search_movies(&store, Some("hEaT".into())).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_list_filters_are_ignored() {
        let store = MemoryStore::new();
        create_movie(&store, ADMIN, new_movie("Heat")).await.unwrap();

        let filter = MovieFilter {
            genre: Some("".into()),
            location: Some("down".into()),
            ..Default::default()
        };
        assert_eq!(list_movies(&store, filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_by_non_owner_is_not_found() {
        let store = MemoryStore::new();
        let movie = create_movie(&store, ADMIN, new_movie("Heat")).await.unwrap();

        let err = delete_movie(&store, &movie.id, "65f0000000000000000000bb").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        delete_movie(&store, &movie.id, ADMIN).await.unwrap();
        assert!(matches!(get_movie(&store, &movie.id).await.unwrap_err(), AppError::NotFound(_)));
    }

    const U1: &str = "65f000000000000000000001";
    const U2: &str = "65f000000000000000000002";

    fn booking_request(movie_id: &str, seat: &str) -> CreateBooking {
        CreateBooking {
            movie_id: movie_id.into(),
            theater: TheaterRef {
                name: "Cineplex".into(),
                location: "Downtown".into(),
            },
            show_time: "18:00".into(),
            seats: vec![BookedSeat {
                seat_number: seat.into(),
                price: 10.0,
            }],
        }
    }

    fn with_theaters(theaters: Vec<Theater>) -> MovieUpdate {
        MovieUpdate {
            theaters: Some(theaters),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_rejects_pre_booked_seats() {
        let store = MemoryStore::new();
        let mut ghost = new_movie("Heat");
        ghost.theaters[0].show_times[0].seats[0] = Seat {
            seat_number: "A1".into(),
            is_booked: true,
            booked_by: Some("ghost".into()),
        };

        let err = create_movie(&store, ADMIN, ghost).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "unexpected {err:?}");
        assert!(admin_movies(&store, ADMIN).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resending_seats_free_keeps_reserved_ones_booked() {
        let store = MemoryStore::new();
        let movie = create_movie(&store, ADMIN, new_movie("Heat")).await.unwrap();
        reservation::reserve(&store, U1, booking_request(&movie.id, "A1")).await.unwrap();

        let mut theaters = new_movie("Heat").theaters;
        theaters[0].show_times[0].seats.push(Seat::free("A3"));
        let updated = update_movie(&store, &movie.id, ADMIN, with_theaters(theaters))
            .await
            .unwrap();

        let seats = &updated.theaters[0].show_times[0].seats;
        assert_eq!(seats[0].booked_by.as_deref(), Some(U1));
        assert!(seats[0].is_booked);
        assert_eq!(seats[2], Seat::free("A3"));

        let err = reservation::reserve(&store, U2, booking_request(&movie.id, "A1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store.bookings_for_user(U2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_cannot_book_reassign_or_drop_seats() {
        let store = MemoryStore::new();
        let movie = create_movie(&store, ADMIN, new_movie("Heat")).await.unwrap();
        reservation::reserve(&store, U1, booking_request(&movie.id, "A1")).await.unwrap();

        let mut invented = new_movie("Heat").theaters;
        invented[0].show_times[0].seats[1] = Seat {
            seat_number: "A2".into(),
            is_booked: true,
            booked_by: Some("ghost".into()),
        };
        let err = update_movie(&store, &movie.id, ADMIN, with_theaters(invented))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "unexpected {err:?}");

        let mut reassigned = new_movie("Heat").theaters;
        reassigned[0].show_times[0].seats[0] = Seat {
            seat_number: "A1".into(),
            is_booked: true,
            booked_by: Some(U2.into()),
        };
        let err = update_movie(&store, &movie.id, ADMIN, with_theaters(reassigned))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "unexpected {err:?}");

        let mut dropped = new_movie("Heat").theaters;
        dropped[0].show_times[0].seats.remove(0);
        let err = update_movie(&store, &movie.id, ADMIN, with_theaters(dropped))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "unexpected {err:?}");

        let stored = get_movie(&store, &movie.id).await.unwrap();
        let seats = &stored.theaters[0].show_times[0].seats;
        assert_eq!(seats[0].booked_by.as_deref(), Some(U1));
        assert_eq!(seats[1], Seat::free("A2"));
    }
}
