//! Bazaar Domain Concerns

pub mod checkout;
pub mod products;
pub mod reservations;
pub mod want_lists;
