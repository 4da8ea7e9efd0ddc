//! Sales analytics
//!
//! Completing a want list emits one [`SaleRecord`] per product sold.
//! Delivery is fire-and-forget: the coordinator commits first, then hands
//! records to the sink, and a failing sink never affects the sale itself.

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Analytics delivery errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("failed to encode sale record")]
    Encode(#[from] serde_json::Error),

    #[error("analytics sink rejected the record: {0}")]
    Rejected(String),
}

/// One product sold through a completed want list, with a snapshot of the
/// totals of the want list it was part of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleRecord {
    pub seller_uuid: Uuid,
    pub buyer_uuid: Uuid,
    pub want_list_uuid: Uuid,
    pub product_uuid: Uuid,
    pub price_cents: u64,
    pub want_list_total_cents: u64,
    pub want_list_item_count: u64,
}

/// Destination for finalized sales.
#[automock]
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Append one finalized sale.
    async fn record_sale(&self, sale: SaleRecord) -> Result<(), AnalyticsError>;
}

/// Sink that emits each sale as a JSON payload on the `bazaar::sales`
/// tracing target, leaving transport to the log pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalyticsSink;

#[async_trait]
impl AnalyticsSink for TracingAnalyticsSink {
    async fn record_sale(&self, sale: SaleRecord) -> Result<(), AnalyticsError> {
        let payload = serde_json::to_string(&sale)?;

        info!(target: "bazaar::sales", %payload, "sale recorded");

        Ok(())
    }
}
