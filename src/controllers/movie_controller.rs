use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    auth::AdminIdentity,
    error::AppError,
    models::movie_model::{Movie, MovieFilter, MovieUpdate, NewMovie, SearchQuery},
    services::catalog,
    store::Store,
};

pub async fn load_movies(
    Extension(store): Extension<Arc<dyn Store>>,
    filter: Result<Query<MovieFilter>, QueryRejection>,
) -> Result<Json<Vec<Movie>>, AppError> {
    let Query(filter) = filter?;
    let movies = catalog::list_movies(store.as_ref(), filter).await?;
    Ok(Json(movies))
}

pub async fn search_movies(
    Extension(store): Extension<Arc<dyn Store>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Movie>>, AppError> {
    let Query(query) = query?;
    let movies = catalog::search_movies(store.as_ref(), query.q).await?;
    Ok(Json(movies))
}

pub async fn load_admin_movies(
    Extension(store): Extension<Arc<dyn Store>>,
    admin: AdminIdentity,
) -> Result<Json<Vec<Movie>>, AppError> {
    let movies = catalog::admin_movies(store.as_ref(), admin.user_id()).await?;
    Ok(Json(movies))
}

pub async fn load_movie(
    id: Result<Path<String>, PathRejection>,
    Extension(store): Extension<Arc<dyn Store>>,
) -> Result<Json<Movie>, AppError> {
    let Path(id_str) = id?;
    let movie = catalog::get_movie(store.as_ref(), &id_str).await?;
    Ok(Json(movie))
}

pub async fn add_movie(
    Extension(store): Extension<Arc<dyn Store>>,
    admin: AdminIdentity,
    payload: Result<Json<NewMovie>, JsonRejection>,
) -> Result<(StatusCode, Json<Movie>), AppError> {
    let Json(new_movie) = payload?;
    let movie = catalog::create_movie(store.as_ref(), admin.user_id(), new_movie).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn update_movie(
    id: Result<Path<String>, PathRejection>,
    Extension(store): Extension<Arc<dyn Store>>,
    admin: AdminIdentity,
    payload: Result<Json<MovieUpdate>, JsonRejection>,
) -> Result<Json<Movie>, AppError> {
    let Path(id_str) = id?;
    let Json(update_data) = payload?;
    let movie = catalog::update_movie(store.as_ref(), &id_str, admin.user_id(), update_data).await?;
    Ok(Json(movie))
}

pub async fn delete_movie(
    id: Result<Path<String>, PathRejection>,
    Extension(store): Extension<Arc<dyn Store>>,
    admin: AdminIdentity,
) -> Result<Json<Value>, AppError> {
    let Path(id_str) = id?;
    catalog::delete_movie(store.as_ref(), &id_str, admin.user_id()).await?;
    Ok(Json(json!({ "message": "Movie deleted successfully" })))
}
