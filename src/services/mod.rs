pub mod catalog;
pub mod ledger;
pub mod reservation;
pub mod status;
