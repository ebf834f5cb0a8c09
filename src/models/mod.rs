pub mod booking_model;
pub mod movie_model;
