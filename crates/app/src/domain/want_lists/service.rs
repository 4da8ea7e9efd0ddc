//! Want lists service.

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use tracing::info;

use crate::{
    database::Db,
    domain::{
        products::{
            records::{ProductStatus, ProductUuid, SellerUuid},
            repository::PgProductsRepository,
        },
        reservations::{
            position,
            records::{BuyerUuid, ReservationRecord},
            repository::PgReservationsRepository,
        },
        want_lists::{
            errors::WantListsServiceError,
            records::{WantListItemView, WantListRecord, WantListStatus, WantListUuid, WantListView},
            repository::{PgWantListsRepository, WantListItemRow},
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgWantListsService {
    db: Db,
    want_lists: PgWantListsRepository,
    reservations: PgReservationsRepository,
    products: PgProductsRepository,
}

impl PgWantListsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            want_lists: PgWantListsRepository::new(),
            reservations: PgReservationsRepository::new(),
            products: PgProductsRepository::new(),
        }
    }
}

#[async_trait]
impl WantListsService for PgWantListsService {
    async fn get_want_list(&self, buyer: BuyerUuid) -> Result<WantListView, WantListsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let Some(want_list) = self.want_lists.get_active_for_buyer(&mut tx, buyer).await? else {
            tx.commit().await?;

            return Ok(WantListView::empty(buyer));
        };

        let items = self.want_lists.list_items(&mut tx, want_list.uuid).await?;

        let products: Vec<ProductUuid> = items.iter().map(|item| item.product_uuid).collect();
        let queues = self.reservations.list_queues(&mut tx, &products).await?;

        tx.commit().await?;

        Ok(assemble_view(&want_list, items, queues))
    }

    async fn cancel_want_list(
        &self,
        seller: SellerUuid,
        want_list: WantListUuid,
    ) -> Result<(), WantListsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let Some(record) = self
            .want_lists
            .get_want_list_for_update(&mut tx, want_list)
            .await?
        else {
            return Err(WantListsServiceError::NotFound);
        };

        if record.status.is_terminal() {
            return Err(WantListsServiceError::NotActive);
        }

        let entries = self
            .reservations
            .list_for_want_list(&mut tx, record.uuid)
            .await?;

        let products: Vec<ProductUuid> = entries.iter().map(|entry| entry.product_uuid).collect();
        let locked = self.products.lock_products(&mut tx, &products).await?;

        // The caller must have a stake in the list: at least one queued
        // product of theirs. An empty list has no stake to show.
        if !locked.iter().any(|product| product.seller_uuid == seller) {
            return Err(WantListsServiceError::Forbidden);
        }

        self.reservations
            .delete_for_want_list(&mut tx, record.uuid)
            .await?;

        // Release every product this cancellation left without a queue.
        // Other buyers' entries keep their products reserved.
        for product in &locked {
            let remaining = self.reservations.queue_len(&mut tx, product.uuid).await?;

            if remaining == 0 {
                self.products
                    .transition_status(
                        &mut tx,
                        product.uuid,
                        ProductStatus::Reserved,
                        ProductStatus::Available,
                    )
                    .await?;
            }
        }

        self.want_lists
            .set_status(&mut tx, record.uuid, WantListStatus::Cancelled)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn cleanup_empty_want_lists(&self) -> Result<u64, WantListsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let candidates = self.want_lists.lock_empty_active(&mut tx).await?;

        if candidates.is_empty() {
            tx.commit().await?;

            return Ok(0);
        }

        let uuids: Vec<WantListUuid> = candidates.iter().map(|list| list.uuid).collect();

        // Re-checked under the locks: a list that gained an entry while we
        // waited is left alone.
        let cancelled = self.want_lists.cancel_if_still_empty(&mut tx, &uuids).await?;

        tx.commit().await?;

        info!(cancelled, "cancelled empty want lists");

        Ok(cancelled)
    }
}

/// Annotate each item with the buyer's standing in that product's queue.
///
/// The two reads behind this run in one transaction but separate
/// statements, so an item whose entry vanished in between is simply
/// dropped, the same as if the view had been read a moment later.
fn assemble_view(
    want_list: &WantListRecord,
    items: Vec<WantListItemRow>,
    queues: Vec<ReservationRecord>,
) -> WantListView {
    let mut queues_by_product: FxHashMap<ProductUuid, Vec<ReservationRecord>> =
        FxHashMap::default();

    for entry in queues {
        queues_by_product
            .entry(entry.product_uuid)
            .or_default()
            .push(entry);
    }

    let mut views = Vec::with_capacity(items.len());
    let mut total_cents: u64 = 0;

    for item in items {
        let queue = queues_by_product
            .get(&item.product_uuid)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let Some(position) = position::queue_position(queue, want_list.buyer_uuid) else {
            continue;
        };

        total_cents += item.price_cents;

        views.push(WantListItemView {
            reservation_uuid: item.reservation_uuid,
            product_uuid: item.product_uuid,
            title: item.title,
            price_cents: item.price_cents,
            queued_at: item.queued_at,
            position,
            queue_length: queue.len() as u32,
        });
    }

    WantListView {
        want_list_uuid: Some(want_list.uuid),
        buyer_uuid: want_list.buyer_uuid,
        item_count: views.len() as u64,
        items: views,
        total_cents,
    }
}

#[automock]
#[async_trait]
pub trait WantListsService: Send + Sync {
    /// The buyer's active want list as a live view: every entry with its
    /// current queue position and queue length, plus derived totals. A
    /// buyer with no active list gets the empty view, not an error.
    async fn get_want_list(&self, buyer: BuyerUuid) -> Result<WantListView, WantListsServiceError>;

    /// Seller-side cancellation of a want list containing at least one of
    /// the caller's products. Deletes the list's entries, releases
    /// products whose queues empty, and marks the list `cancelled`.
    async fn cancel_want_list(
        &self,
        seller: SellerUuid,
        want_list: WantListUuid,
    ) -> Result<(), WantListsServiceError>;

    /// Cancel every active want list that no longer holds any entries.
    /// Safe to run at any time and idempotent; returns the number of lists
    /// cancelled.
    async fn cleanup_empty_want_lists(&self) -> Result<u64, WantListsServiceError>;
}
