//! Want List Records

use jiff::Timestamp;

use crate::{
    domain::{
        products::records::ProductUuid,
        reservations::records::{BuyerUuid, ReservationUuid},
    },
    uuids::TypedUuid,
};

/// Want List UUID
pub type WantListUuid = TypedUuid<WantListRecord>;

/// Lifecycle of a buyer's working set.
///
/// Terminal lists are kept for history and never reused; the buyer's next
/// queue entry starts a fresh list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WantListStatus {
    Active,
    Completed,
    Cancelled,
}

impl WantListStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Want List Record
#[derive(Debug, Clone)]
pub struct WantListRecord {
    pub uuid: WantListUuid,
    pub buyer_uuid: BuyerUuid,
    pub status: WantListStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A buyer's live want list with derived totals.
///
/// Assembled fresh on every read, so prices, positions and queue lengths
/// reflect concurrent changes the moment they commit. Nothing in the view
/// is ever stored.
#[derive(Debug, Clone)]
pub struct WantListView {
    /// `None` when the buyer has no active want list.
    pub want_list_uuid: Option<WantListUuid>,
    pub buyer_uuid: BuyerUuid,
    pub items: Vec<WantListItemView>,
    pub item_count: u64,
    pub total_cents: u64,
}

impl WantListView {
    /// The uniform empty state for buyers with nothing queued.
    #[must_use]
    pub fn empty(buyer: BuyerUuid) -> Self {
        Self {
            want_list_uuid: None,
            buyer_uuid: buyer,
            items: Vec::new(),
            item_count: 0,
            total_cents: 0,
        }
    }
}

/// One queued product annotated with the buyer's live standing in its
/// queue.
#[derive(Debug, Clone)]
pub struct WantListItemView {
    pub reservation_uuid: ReservationUuid,
    pub product_uuid: ProductUuid,
    pub title: String,
    pub price_cents: u64,
    pub queued_at: Timestamp,
    /// 1-based rank of this buyer in the product's queue.
    pub position: u32,
    /// Total number of buyers currently queued on the product.
    pub queue_length: u32,
}
