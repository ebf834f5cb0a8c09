//! Movie ticket booking API.
//!
//! Admins publish movies with a theater/showtime/seat inventory, users
//! reserve seats, and admins move bookings through their status lifecycle.

pub mod auth;
pub mod config;
mod controllers;
pub mod error;
pub mod models;
pub mod router;
pub mod services;
pub mod store;
pub mod utils;
