//! Product Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Marker for seller identities. Sellers are owned by the surrounding
/// identity layer and arrive here already verified.
pub struct Seller;

/// Seller UUID
pub type SellerUuid = TypedUuid<Seller>;

/// Availability lifecycle of a single-unit product.
///
/// `draft` is the unpublished starting state, `available` and `reserved`
/// are the published states, and `sold` is terminal. The store flips
/// `available` and `reserved` as the product's queue empties and refills;
/// nothing else writes those two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    Draft,
    Available,
    Reserved,
    Sold,
}

impl ProductStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Sold => "sold",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "available" => Some(Self::Available),
            "reserved" => Some(Self::Reserved),
            "sold" => Some(Self::Sold),
            _ => None,
        }
    }

    /// `sold` is never exited.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sold)
    }

    /// Drafts are invisible to buyers.
    #[must_use]
    pub fn is_visible_to_buyers(self) -> bool {
        !matches!(self, Self::Draft)
    }

    /// Whether a buyer may join the queue of a product in this state.
    #[must_use]
    pub fn accepts_queue_entries(self) -> bool {
        matches!(self, Self::Available | Self::Reserved)
    }
}

/// Product Record
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub seller_uuid: SellerUuid,
    pub title: String,
    pub description: String,
    pub price_cents: u64,
    pub status: ProductStatus,
    pub photo_count: u32,
    pub category_count: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
