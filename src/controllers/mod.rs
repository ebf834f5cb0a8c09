pub mod booking_controller;
pub mod home_controller;
pub mod movie_controller;
