use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, from_document, Bson, Document},
    options::{ClientOptions, FindOneAndUpdateOptions, FindOptions, ReturnDocument, UpdateOptions},
    Client, Collection, Database,
};
use serde_json::Value;

use crate::models::{
    booking_model::{Booking, BookingDetail, BookingStatus},
    movie_model::{Movie, MovieFilter, MovieUpdate, Theater},
};

use super::{SeatKey, Store};

const SEAT_PATH: &str = "theaters.$[t].showTimes.$[st].seats.$[s]";

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connects and pings the deployment so a bad URI fails at start-up.
    pub async fn connect(uri: &str, database: &str) -> anyhow::Result<Self> {
        let client_options = ClientOptions::parse(uri)
            .await
            .context("Failed to parse MongoDB connection string")?;
        let client = Client::with_options(client_options)
            .context("Failed to initialize MongoDB client")?;

        let db = client.database(database);
        db.run_command(doc! {"ping": 1}, None)
            .await
            .context("Failed to ping MongoDB deployment")?;
        tracing::info!(database, "connected to MongoDB");

        Ok(MongoStore { db })
    }

    fn movies(&self) -> Collection<Movie> {
        self.db.collection::<Movie>("movies")
    }

    fn bookings(&self) -> Collection<Booking> {
        self.db.collection::<Booking>("bookings")
    }

    async fn collect_details(&self, pipeline: Vec<Document>) -> anyhow::Result<Vec<BookingDetail>> {
        let mut cursor = self.bookings().aggregate(pipeline, None).await?;

        let mut result: Vec<BookingDetail> = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            let detail: BookingDetail =
                from_document(doc).context("Failed to decode booking aggregation")?;
            result.push(detail);
        }
        Ok(result)
    }
}

fn case_insensitive(needle: &str) -> Document {
    doc! { "$regex": regex::escape(needle), "$options": "i" }
}

pub(crate) fn movie_query(filter: &MovieFilter) -> Document {
    let mut query = Document::new();

    if let Some(admin) = &filter.admin {
        query.insert("admin", admin.as_str());
    }
    if let Some(search) = &filter.search {
        query.insert(
            "$or",
            vec![
                doc! { "title": case_insensitive(search) },
                doc! { "description": case_insensitive(search) },
            ],
        );
    }
    if let Some(genre) = &filter.genre {
        query.insert("genre", case_insensitive(genre));
    }
    if let Some(location) = &filter.location {
        query.insert("theaters.location", case_insensitive(location));
    }
    query
}

/// Array filters selecting one seat. `expected` pins the seat's current state,
/// which turns the update into a compare-and-set.
pub(crate) fn seat_array_filters(key: &SeatKey<'_>, expected: Document) -> Vec<Document> {
    let mut seat = doc! { "s.seatNumber": key.seat_number };
    for (field, value) in expected {
        seat.insert(format!("s.{field}"), value);
    }
    vec![
        doc! { "t.name": key.theater.name.as_str(), "t.location": key.theater.location.as_str() },
        doc! { "st.time": key.show_time },
        seat,
    ]
}

pub(crate) fn seat_update(is_booked: bool, booked_by: Option<&str>) -> Document {
    let mut set = Document::new();
    set.insert(format!("{SEAT_PATH}.isBooked"), is_booked);
    set.insert(
        format!("{SEAT_PATH}.bookedBy"),
        booked_by.map_or(Bson::Null, |user| Bson::String(user.to_string())),
    );
    doc! { "$set": set }
}

/// Converts a partial update into a `$set` body, skipping unset fields.
pub(crate) fn movie_set_document(update: &MovieUpdate) -> anyhow::Result<Document> {
    let json = serde_json::to_value(update)?;

    let mut update_doc = Document::new();
    if let Value::Object(obj) = json {
        for (key, value) in obj {
            if value.is_null() {
                continue;
            }
            let bson_value = Bson::try_from(value)
                .with_context(|| format!("Failed to convert field {key} to BSON"))?;
            update_doc.insert(key, bson_value);
        }
    }
    Ok(update_doc)
}

/// Owner filter for a movie update. Embedded arrays match by exact equality,
/// so pinning `theaters` fails the update if any seat moved since it was read.
pub(crate) fn movie_update_filter(
    id: &str,
    admin: &str,
    expected_theaters: Option<&[Theater]>,
) -> anyhow::Result<Document> {
    let mut filter = doc! { "_id": id, "admin": admin };
    if let Some(theaters) = expected_theaters {
        filter.insert("theaters", bson::to_bson(theaters)?);
    }
    Ok(filter)
}

fn populate_movie(preserve_missing: bool) -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": "movies",
                "localField": "movie",
                "foreignField": "_id",
                "as": "movie",
            }
        },
        doc! {
            "$unwind": {
                "path": "$movie",
                "preserveNullAndEmptyArrays": preserve_missing,
            }
        },
    ]
}

fn hide_inventory() -> Document {
    doc! {
        "$project": {
            "movie.theaters": 0,
            "movie.admin": 0,
            "movie.createdAt": 0,
        }
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_movie(&self, movie: &Movie) -> anyhow::Result<()> {
        self.movies().insert_one(movie, None).await?;
        Ok(())
    }

    async fn find_movie(&self, id: &str) -> anyhow::Result<Option<Movie>> {
        Ok(self.movies().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_movies(&self, filter: &MovieFilter) -> anyhow::Result<Vec<Movie>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": 1 }).build();
        let cursor = self.movies().find(movie_query(filter), options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_movie(
        &self,
        id: &str,
        admin: &str,
        update: &MovieUpdate,
        expected_theaters: Option<&[Theater]>,
    ) -> anyhow::Result<Option<Movie>> {
        let filter = movie_update_filter(id, admin, expected_theaters)?;
        let update_doc = movie_set_document(update)?;

        if update_doc.is_empty() {
            return Ok(self.movies().find_one(filter, None).await?);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .movies()
            .find_one_and_update(filter, doc! { "$set": update_doc }, options)
            .await?)
    }

    async fn delete_movie(&self, id: &str, admin: &str) -> anyhow::Result<bool> {
        let delete_result = self
            .movies()
            .delete_one(doc! { "_id": id, "admin": admin }, None)
            .await?;
        Ok(delete_result.deleted_count == 1)
    }

    async fn claim_seat(&self, key: SeatKey<'_>, user: &str) -> anyhow::Result<bool> {
        let options = UpdateOptions::builder()
            .array_filters(seat_array_filters(&key, doc! { "isBooked": false }))
            .build();
        let update_result = self
            .movies()
            .update_one(doc! { "_id": key.movie_id }, seat_update(true, Some(user)), options)
            .await?;
        Ok(update_result.modified_count == 1)
    }

    async fn release_seat(&self, key: SeatKey<'_>, user: &str) -> anyhow::Result<bool> {
        let options = UpdateOptions::builder()
            .array_filters(seat_array_filters(
                &key,
                doc! { "isBooked": true, "bookedBy": user },
            ))
            .build();
        let update_result = self
            .movies()
            .update_one(doc! { "_id": key.movie_id }, seat_update(false, None), options)
            .await?;
        Ok(update_result.modified_count == 1)
    }

    async fn insert_booking(&self, booking: &Booking) -> anyhow::Result<()> {
        self.bookings().insert_one(booking, None).await?;
        Ok(())
    }

    async fn find_booking(&self, id: &str) -> anyhow::Result<Option<Booking>> {
        Ok(self.bookings().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_booking_detail(&self, id: &str) -> anyhow::Result<Option<BookingDetail>> {
        let mut pipeline = vec![doc! { "$match": { "_id": id } }];
        pipeline.extend(populate_movie(true));
        pipeline.push(hide_inventory());

        Ok(self.collect_details(pipeline).await?.into_iter().next())
    }

    async fn set_booking_status(&self, id: &str, status: BookingStatus) -> anyhow::Result<bool> {
        let status = bson::to_bson(&status)?;
        let update_result = self
            .bookings()
            .update_one(doc! { "_id": id }, doc! { "$set": { "status": status } }, None)
            .await?;
        Ok(update_result.matched_count == 1)
    }

    async fn bookings_for_user(&self, user: &str) -> anyhow::Result<Vec<BookingDetail>> {
        let mut pipeline = vec![
            doc! { "$match": { "user": user } },
            doc! { "$sort": { "bookingDate": -1 } },
        ];
        pipeline.extend(populate_movie(true));
        pipeline.push(hide_inventory());

        self.collect_details(pipeline).await
    }

    async fn bookings_for_admin(&self, admin: &str) -> anyhow::Result<Vec<BookingDetail>> {
        let mut pipeline = populate_movie(false);
        pipeline.push(doc! { "$match": { "movie.admin": admin } });
        pipeline.push(doc! { "$sort": { "bookingDate": -1 } });
        pipeline.push(hide_inventory());

        self.collect_details(pipeline).await
    }
}
