//! Reservation Records

use jiff::Timestamp;

use crate::{
    domain::{products::records::ProductUuid, want_lists::records::WantListUuid},
    uuids::TypedUuid,
};

/// Reservation UUID
pub type ReservationUuid = TypedUuid<ReservationRecord>;

/// Marker for buyer identities. Buyers are owned by the surrounding
/// identity layer and arrive here already verified.
pub struct Buyer;

/// Buyer UUID
pub type BuyerUuid = TypedUuid<Buyer>;

/// One buyer's claim on one product, ordered by arrival.
///
/// Entries are live only: a removed or completed entry has no tombstone,
/// and queue positions are derived from the surviving entries on read.
#[derive(Debug, Clone)]
pub struct ReservationRecord {
    pub uuid: ReservationUuid,
    pub product_uuid: ProductUuid,
    pub buyer_uuid: BuyerUuid,
    pub want_list_uuid: WantListUuid,
    pub queued_at: Timestamp,
}
