use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::{
    auth::AuthKeys,
    controllers::{booking_controller::*, home_controller, movie_controller::*},
    store::Store,
};

pub fn cors_layer(app_url: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(app_url)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn build_router(store: Arc<dyn Store>, keys: Arc<AuthKeys>) -> Router {
    Router::new()
        .route("/", get(home_controller::index))
        .route("/api/movies", get(load_movies).post(add_movie))
        .route("/api/movies/search", get(search_movies))
        .route("/api/movies/admin", get(load_admin_movies))
        .route(
            "/api/movies/:id",
            get(load_movie).put(update_movie).delete(delete_movie),
        )
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/my-bookings", get(load_my_bookings))
        .route("/api/bookings/admin", get(load_admin_bookings))
        .route("/api/bookings/:id/status", patch(update_booking_status))
        .layer(Extension(store))
        .layer(Extension(keys))
}
