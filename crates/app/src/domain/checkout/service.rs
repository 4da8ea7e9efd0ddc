//! Checkout service.
//!
//! Completion is all-or-nothing: one transaction takes the want-list row
//! lock, then every referenced product row lock in ascending UUID order,
//! re-reads the queues under those locks, and either finalizes everything
//! or changes nothing. Analytics records are emitted only after commit.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use sqlx::{Postgres, Transaction};
use tracing::error;

use crate::{
    analytics::{AnalyticsSink, SaleRecord},
    database::Db,
    domain::{
        checkout::{errors::CheckoutServiceError, records::CompletionSummary},
        products::{
            records::{ProductRecord, ProductUuid, SellerUuid},
            repository::PgProductsRepository,
        },
        reservations::{
            position,
            records::{BuyerUuid, ReservationRecord},
            repository::PgReservationsRepository,
        },
        want_lists::{
            records::{WantListRecord, WantListStatus, WantListUuid},
            repository::PgWantListsRepository,
        },
    },
};

#[derive(Clone)]
pub struct PgCheckoutService {
    db: Db,
    analytics: Arc<dyn AnalyticsSink>,
    want_lists: PgWantListsRepository,
    reservations: PgReservationsRepository,
    products: PgProductsRepository,
}

impl PgCheckoutService {
    #[must_use]
    pub fn new(db: Db, analytics: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            db,
            analytics,
            want_lists: PgWantListsRepository::new(),
            reservations: PgReservationsRepository::new(),
            products: PgProductsRepository::new(),
        }
    }

    /// Lock the products referenced by the want list and re-read its
    /// entries under those locks.
    ///
    /// The want-list row lock blocks new entries, so the re-read can only
    /// shrink relative to the first read: entries vanish when their
    /// product was sold or their buyer withdrew while we waited. The
    /// surviving set is the authoritative one.
    async fn lock_and_reread(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        want_list: &WantListRecord,
    ) -> Result<Option<(Vec<ReservationRecord>, Vec<ProductRecord>)>, CheckoutServiceError> {
        let entries = self
            .reservations
            .list_for_want_list(tx, want_list.uuid)
            .await?;

        if entries.is_empty() {
            return Ok(None);
        }

        let products: Vec<ProductUuid> = entries.iter().map(|entry| entry.product_uuid).collect();
        let locked = self.products.lock_products(tx, &products).await?;

        let entries = self
            .reservations
            .list_for_want_list(tx, want_list.uuid)
            .await?;

        if entries.is_empty() {
            return Ok(None);
        }

        let live: Vec<ProductUuid> = entries.iter().map(|entry| entry.product_uuid).collect();
        let locked = locked
            .into_iter()
            .filter(|product| live.contains(&product.uuid))
            .collect();

        Ok(Some((entries, locked)))
    }

    /// Terminal transition for a verified completion: products to `sold`,
    /// every queue entry for them dropped, the want list `completed`.
    async fn finalize(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        want_list: &WantListRecord,
        products: &[ProductRecord],
    ) -> Result<CompletionSummary, CheckoutServiceError> {
        let sold: Vec<ProductUuid> = products.iter().map(|product| product.uuid).collect();

        for product in products {
            let rows_affected = self.products.mark_sold(tx, product.uuid).await?;

            if rows_affected == 0 {
                return Err(CheckoutServiceError::Conflict);
            }
        }

        self.reservations.delete_queues(tx, &sold).await?;

        let rows_affected = self
            .want_lists
            .set_status(tx, want_list.uuid, WantListStatus::Completed)
            .await?;

        if rows_affected == 0 {
            return Err(CheckoutServiceError::Conflict);
        }

        Ok(CompletionSummary {
            want_list_uuid: want_list.uuid,
            buyer_uuid: want_list.buyer_uuid,
            item_count: products.len() as u64,
            total_cents: products.iter().map(|product| product.price_cents).sum(),
            products: sold,
        })
    }

    /// Hand the finalized sales to the analytics sink, one record per
    /// product. Runs after commit; failures are logged and swallowed.
    async fn emit_sales(&self, summary: &CompletionSummary, products: &[ProductRecord]) {
        for product in products {
            let sale = SaleRecord {
                seller_uuid: product.seller_uuid.into_uuid(),
                buyer_uuid: summary.buyer_uuid.into_uuid(),
                want_list_uuid: summary.want_list_uuid.into_uuid(),
                product_uuid: product.uuid.into_uuid(),
                price_cents: product.price_cents,
                want_list_total_cents: summary.total_cents,
                want_list_item_count: summary.item_count,
            };

            if let Err(err) = self.analytics.record_sale(sale).await {
                error!(%err, product = %product.uuid, "failed to record sale");
            }
        }
    }
}

#[async_trait]
impl CheckoutService for PgCheckoutService {
    async fn complete_as_buyer(
        &self,
        buyer: BuyerUuid,
    ) -> Result<CompletionSummary, CheckoutServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let Some(want_list) = self
            .want_lists
            .get_active_for_buyer_for_update(&mut tx, buyer)
            .await?
        else {
            return Err(CheckoutServiceError::NothingToComplete);
        };

        let Some((entries, products)) = self.lock_and_reread(&mut tx, &want_list).await? else {
            return Err(CheckoutServiceError::NothingToComplete);
        };

        // Every item must be front of its queue; one miss fails the whole
        // completion with nothing written.
        let live: Vec<ProductUuid> = entries.iter().map(|entry| entry.product_uuid).collect();
        let queues = self.reservations.list_queues(&mut tx, &live).await?;

        let mut queues_by_product: FxHashMap<ProductUuid, Vec<ReservationRecord>> =
            FxHashMap::default();

        for entry in queues {
            queues_by_product
                .entry(entry.product_uuid)
                .or_default()
                .push(entry);
        }

        for product in &live {
            let queue = queues_by_product
                .get(product)
                .map(Vec::as_slice)
                .unwrap_or_default();

            if !position::is_first(queue, buyer) {
                return Err(CheckoutServiceError::NotFirstInQueue);
            }
        }

        let summary = self.finalize(&mut tx, &want_list, &products).await?;

        tx.commit().await?;

        self.emit_sales(&summary, &products).await;

        Ok(summary)
    }

    async fn complete_as_seller(
        &self,
        seller: SellerUuid,
        want_list: WantListUuid,
    ) -> Result<CompletionSummary, CheckoutServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let Some(want_list) = self
            .want_lists
            .get_want_list_for_update(&mut tx, want_list)
            .await?
        else {
            return Err(CheckoutServiceError::NotFound);
        };

        if want_list.status.is_terminal() {
            return Err(CheckoutServiceError::NotActive);
        }

        let Some((_, products)) = self.lock_and_reread(&mut tx, &want_list).await? else {
            return Err(CheckoutServiceError::NothingToComplete);
        };

        // The seller vouches for the handover, so queue positions are not
        // re-verified; owning a product in the list is what authorizes the
        // call.
        if !products.iter().any(|product| product.seller_uuid == seller) {
            return Err(CheckoutServiceError::Forbidden);
        }

        let summary = self.finalize(&mut tx, &want_list, &products).await?;

        tx.commit().await?;

        self.emit_sales(&summary, &products).await;

        Ok(summary)
    }
}

#[automock]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Complete the buyer's active want list, selling every product in it.
    /// Succeeds only when the buyer is first in queue on every item.
    async fn complete_as_buyer(
        &self,
        buyer: BuyerUuid,
    ) -> Result<CompletionSummary, CheckoutServiceError>;

    /// Seller-driven completion of a want list containing at least one of
    /// the caller's products. Skips the first-in-queue verification.
    async fn complete_as_seller(
        &self,
        seller: SellerUuid,
        want_list: WantListUuid,
    ) -> Result<CompletionSummary, CheckoutServiceError>;
}
