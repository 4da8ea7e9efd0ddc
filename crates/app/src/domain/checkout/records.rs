//! Checkout Records

use crate::domain::{
    products::records::ProductUuid, reservations::records::BuyerUuid,
    want_lists::records::WantListUuid,
};

/// Snapshot of a finalized completion, taken inside the completing
/// transaction. Prices captured here are the ones the sale closed at.
#[derive(Debug, Clone)]
pub struct CompletionSummary {
    pub want_list_uuid: WantListUuid,
    pub buyer_uuid: BuyerUuid,
    pub item_count: u64,
    pub total_cents: u64,
    /// Sold product ids, ascending.
    pub products: Vec<ProductUuid>,
}
