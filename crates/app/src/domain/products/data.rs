//! Products Data

use crate::domain::products::records::ProductUuid;

/// New Product Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub title: String,
    pub description: String,
    pub price_cents: u64,
}

/// Product Update Data
///
/// Listing fields stay editable until the product is sold, including while
/// buyers are queued.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub title: String,
    pub description: String,
    pub price_cents: u64,
}

/// Catalog Counts Data
///
/// Photo and category cardinality as reported by the media and taxonomy
/// collaborators. The publish checklist consults these counts; the engine
/// itself stores nothing else about photos or categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCounts {
    pub photos: u32,
    pub categories: u32,
}
