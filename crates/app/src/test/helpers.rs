//! Test Helpers

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    analytics::{AnalyticsError, AnalyticsSink, SaleRecord},
    domain::products::{
        ProductsService, ProductsServiceError,
        data::{CatalogCounts, NewProduct},
        records::{ProductRecord, ProductUuid, SellerUuid},
    },
    test::TestContext,
};

/// Analytics sink that keeps every record for later assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingAnalyticsSink {
    records: Mutex<Vec<SaleRecord>>,
}

impl RecordingAnalyticsSink {
    /// Drain the records seen so far.
    pub(crate) fn take(&self) -> Vec<SaleRecord> {
        std::mem::take(&mut self.records.lock().expect("sales mutex poisoned"))
    }
}

#[async_trait]
impl AnalyticsSink for RecordingAnalyticsSink {
    async fn record_sale(&self, sale: SaleRecord) -> Result<(), AnalyticsError> {
        self.records
            .lock()
            .expect("sales mutex poisoned")
            .push(sale);

        Ok(())
    }
}

/// Analytics sink that rejects every record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailingAnalyticsSink;

#[async_trait]
impl AnalyticsSink for FailingAnalyticsSink {
    async fn record_sale(&self, _sale: SaleRecord) -> Result<(), AnalyticsError> {
        Err(AnalyticsError::Rejected("sink offline".to_string()))
    }
}

/// A draft submission with plausible listing copy.
pub(crate) fn draft_product(price_cents: u64) -> NewProduct {
    NewProduct {
        uuid: ProductUuid::new(),
        title: "Olympus OM-1 35mm camera".to_string(),
        description: "Meter working, fresh light seals".to_string(),
        price_cents,
    }
}

/// Create a draft, satisfy the publish checklist, and publish it.
pub(crate) async fn create_published_product(
    ctx: &TestContext,
    seller: SellerUuid,
    price_cents: u64,
) -> Result<ProductRecord, ProductsServiceError> {
    let product = ctx
        .products
        .create_product(seller, draft_product(price_cents))
        .await?;

    ctx.products
        .set_catalog_counts(
            product.uuid,
            CatalogCounts {
                photos: 1,
                categories: 1,
            },
        )
        .await?;

    ctx.products.publish_product(seller, product.uuid).await
}
