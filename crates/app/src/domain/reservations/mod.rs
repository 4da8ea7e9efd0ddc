//! Reservations

pub mod errors;
pub mod position;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::ReservationsServiceError;
pub use service::*;
