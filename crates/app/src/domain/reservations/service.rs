//! Reservations service.
//!
//! The queue store owns every `available ⇄ reserved` flip: an insert that
//! finds the product `available` flips it to `reserved`, and a delete that
//! empties the queue flips it back, each inside the same transaction as the
//! membership change, under the product's row lock.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        products::{
            records::{ProductStatus, ProductUuid, SellerUuid},
            repository::PgProductsRepository,
        },
        reservations::{
            errors::ReservationsServiceError,
            position,
            records::{BuyerUuid, ReservationRecord, ReservationUuid},
            repository::PgReservationsRepository,
        },
        want_lists::repository::PgWantListsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgReservationsService {
    db: Db,
    reservations: PgReservationsRepository,
    products: PgProductsRepository,
    want_lists: PgWantListsRepository,
}

impl PgReservationsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            reservations: PgReservationsRepository::new(),
            products: PgProductsRepository::new(),
            want_lists: PgWantListsRepository::new(),
        }
    }
}

#[async_trait]
impl ReservationsService for PgReservationsService {
    async fn add_entry(
        &self,
        buyer: BuyerUuid,
        product: ProductUuid,
    ) -> Result<ReservationRecord, ReservationsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        // Lock order shared with completion and the sweeper: the buyer's
        // want-list row first, then the product row.
        let want_list = self.want_lists.get_or_create_active(&mut tx, buyer).await?;

        let record = self.products.get_product_for_update(&mut tx, product).await?;

        match record.status {
            // Drafts are invisible to buyers.
            ProductStatus::Draft => return Err(ReservationsServiceError::ProductNotFound),
            ProductStatus::Sold => return Err(ReservationsServiceError::ProductSold),
            ProductStatus::Available | ProductStatus::Reserved => {}
        }

        if self.reservations.entry_exists(&mut tx, product, buyer).await? {
            return Err(ReservationsServiceError::AlreadyQueued);
        }

        let entry = self
            .reservations
            .create_reservation(&mut tx, ReservationUuid::new(), product, buyer, want_list.uuid)
            .await?;

        // First entry flips the product; the row lock makes the insert and
        // the flip one atomic unit.
        if record.status == ProductStatus::Available {
            self.products
                .transition_status(
                    &mut tx,
                    product,
                    ProductStatus::Available,
                    ProductStatus::Reserved,
                )
                .await?;
        }

        tx.commit().await?;

        Ok(entry)
    }

    async fn remove_entry(
        &self,
        reservation: ReservationUuid,
    ) -> Result<bool, ReservationsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let Some(record) = self.reservations.get_reservation(&mut tx, reservation).await? else {
            return Ok(false);
        };

        // The entry was read without a lock, so take the product lock and
        // let the delete's row count decide whether we actually removed it.
        let product = self
            .products
            .get_product_for_update(&mut tx, record.product_uuid)
            .await?;

        let deleted = self.reservations.delete_reservation(&mut tx, reservation).await? > 0;

        if deleted {
            let remaining = self.reservations.queue_len(&mut tx, record.product_uuid).await?;

            if remaining == 0 && product.status == ProductStatus::Reserved {
                self.products
                    .transition_status(
                        &mut tx,
                        record.product_uuid,
                        ProductStatus::Reserved,
                        ProductStatus::Available,
                    )
                    .await?;
            }
        }

        tx.commit().await?;

        Ok(deleted)
    }

    async fn product_queue(
        &self,
        seller: SellerUuid,
        product: ProductUuid,
    ) -> Result<Vec<ReservationRecord>, ReservationsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.products.get_product(&mut tx, product).await?;

        if record.seller_uuid != seller {
            return Err(ReservationsServiceError::Forbidden);
        }

        let queue = self.reservations.list_queue(&mut tx, product).await?;

        tx.commit().await?;

        Ok(queue)
    }

    async fn queue_position(
        &self,
        buyer: BuyerUuid,
        product: ProductUuid,
    ) -> Result<Option<u32>, ReservationsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.products.get_product(&mut tx, product).await?;

        if !record.status.is_visible_to_buyers() {
            return Err(ReservationsServiceError::ProductNotFound);
        }

        let queue = self.reservations.list_queue(&mut tx, product).await?;

        tx.commit().await?;

        Ok(position::queue_position(&queue, buyer))
    }
}

#[automock]
#[async_trait]
pub trait ReservationsService: Send + Sync {
    /// Join the queue for a product. Creates the buyer's active want list
    /// on first use, stamps the entry's arrival, and reserves the product
    /// when the queue was empty.
    async fn add_entry(
        &self,
        buyer: BuyerUuid,
        product: ProductUuid,
    ) -> Result<ReservationRecord, ReservationsServiceError>;

    /// Remove an entry if it is still present, releasing the product back
    /// to `available` when its queue empties. Returns whether a row was
    /// actually deleted.
    async fn remove_entry(
        &self,
        reservation: ReservationUuid,
    ) -> Result<bool, ReservationsServiceError>;

    /// The ordered queue of one of the seller's own products.
    async fn product_queue(
        &self,
        seller: SellerUuid,
        product: ProductUuid,
    ) -> Result<Vec<ReservationRecord>, ReservationsServiceError>;

    /// The buyer's 1-based rank in a product's queue, `None` when the
    /// buyer is not queued.
    async fn queue_position(
        &self,
        buyer: BuyerUuid,
        product: ProductUuid,
    ) -> Result<Option<u32>, ReservationsServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::{checkout::CheckoutService, products::ProductsService},
        test::{TestContext, create_published_product},
    };

    use super::*;

    #[tokio::test]
    async fn first_entry_flips_available_to_reserved() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();
        let buyer = BuyerUuid::new();

        let product = create_published_product(&ctx, seller, 10_00).await?;

        let entry = ctx.reservations.add_entry(buyer, product.uuid).await?;

        assert_eq!(entry.product_uuid, product.uuid);
        assert_eq!(entry.buyer_uuid, buyer);

        let record = ctx.products.get_product(product.uuid).await?;
        assert_eq!(record.status, ProductStatus::Reserved);

        Ok(())
    }

    #[tokio::test]
    async fn second_buyer_queues_behind_without_status_change() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();
        let first = BuyerUuid::new();
        let second = BuyerUuid::new();

        let product = create_published_product(&ctx, seller, 10_00).await?;

        ctx.reservations.add_entry(first, product.uuid).await?;
        ctx.reservations.add_entry(second, product.uuid).await?;

        let record = ctx.products.get_product(product.uuid).await?;
        assert_eq!(record.status, ProductStatus::Reserved);

        assert_eq!(
            ctx.reservations.queue_position(first, product.uuid).await?,
            Some(1)
        );
        assert_eq!(
            ctx.reservations.queue_position(second, product.uuid).await?,
            Some(2)
        );

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_add_returns_already_queued_and_keeps_the_entry() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();
        let buyer = BuyerUuid::new();

        let product = create_published_product(&ctx, seller, 10_00).await?;
        ctx.reservations.add_entry(buyer, product.uuid).await?;

        let result = ctx.reservations.add_entry(buyer, product.uuid).await;

        assert!(
            matches!(result, Err(ReservationsServiceError::AlreadyQueued)),
            "expected AlreadyQueued, got {result:?}"
        );

        let queue = ctx.reservations.product_queue(seller, product.uuid).await?;
        assert_eq!(queue.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn add_entry_to_draft_product_returns_not_found() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();

        let product = ctx
            .products
            .create_product(seller, crate::test::draft_product(10_00))
            .await?;

        let result = ctx
            .reservations
            .add_entry(BuyerUuid::new(), product.uuid)
            .await;

        assert!(
            matches!(result, Err(ReservationsServiceError::ProductNotFound)),
            "expected ProductNotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn add_entry_to_unknown_product_returns_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx
            .reservations
            .add_entry(BuyerUuid::new(), ProductUuid::new())
            .await;

        assert!(
            matches!(result, Err(ReservationsServiceError::ProductNotFound)),
            "expected ProductNotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn add_entry_to_sold_product_returns_product_sold() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();
        let winner = BuyerUuid::new();

        let product = create_published_product(&ctx, seller, 10_00).await?;
        ctx.reservations.add_entry(winner, product.uuid).await?;
        ctx.checkout.complete_as_buyer(winner).await?;

        let result = ctx
            .reservations
            .add_entry(BuyerUuid::new(), product.uuid)
            .await;

        assert!(
            matches!(result, Err(ReservationsServiceError::ProductSold)),
            "expected ProductSold, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn remove_unknown_entry_returns_false() -> TestResult {
        let ctx = TestContext::new().await;

        let deleted = ctx.reservations.remove_entry(ReservationUuid::new()).await?;

        assert!(!deleted);

        Ok(())
    }

    #[tokio::test]
    async fn removing_the_sole_entry_releases_the_product() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();
        let buyer = BuyerUuid::new();

        let product = create_published_product(&ctx, seller, 10_00).await?;
        let entry = ctx.reservations.add_entry(buyer, product.uuid).await?;

        let deleted = ctx.reservations.remove_entry(entry.uuid).await?;
        assert!(deleted);

        let record = ctx.products.get_product(product.uuid).await?;
        assert_eq!(record.status, ProductStatus::Available);

        Ok(())
    }

    #[tokio::test]
    async fn removal_promotes_the_next_buyer_and_releases_only_when_empty() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();
        let first = BuyerUuid::new();
        let second = BuyerUuid::new();

        let product = create_published_product(&ctx, seller, 10_00).await?;
        let front = ctx.reservations.add_entry(first, product.uuid).await?;
        let behind = ctx.reservations.add_entry(second, product.uuid).await?;

        // Front buyer leaves: the next buyer moves up, the product stays
        // reserved.
        ctx.reservations.remove_entry(front.uuid).await?;

        let record = ctx.products.get_product(product.uuid).await?;
        assert_eq!(record.status, ProductStatus::Reserved);
        assert_eq!(
            ctx.reservations.queue_position(second, product.uuid).await?,
            Some(1)
        );

        // Last buyer leaves: the queue is empty and the product is
        // available again.
        ctx.reservations.remove_entry(behind.uuid).await?;

        let record = ctx.products.get_product(product.uuid).await?;
        assert_eq!(record.status, ProductStatus::Available);

        Ok(())
    }

    #[tokio::test]
    async fn product_queue_lists_entries_in_arrival_order() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();
        let buyers = [BuyerUuid::new(), BuyerUuid::new(), BuyerUuid::new()];

        let product = create_published_product(&ctx, seller, 10_00).await?;

        for buyer in buyers {
            ctx.reservations.add_entry(buyer, product.uuid).await?;
        }

        let queue = ctx.reservations.product_queue(seller, product.uuid).await?;

        let queued: Vec<BuyerUuid> = queue.iter().map(|entry| entry.buyer_uuid).collect();
        assert_eq!(queued, buyers.to_vec());

        Ok(())
    }

    #[tokio::test]
    async fn product_queue_by_non_owner_returns_forbidden() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();

        let product = create_published_product(&ctx, seller, 10_00).await?;

        let result = ctx
            .reservations
            .product_queue(SellerUuid::new(), product.uuid)
            .await;

        assert!(
            matches!(result, Err(ReservationsServiceError::Forbidden)),
            "expected Forbidden, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn queue_position_for_unqueued_buyer_returns_none() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();

        let product = create_published_product(&ctx, seller, 10_00).await?;
        ctx.reservations
            .add_entry(BuyerUuid::new(), product.uuid)
            .await?;

        let position = ctx
            .reservations
            .queue_position(BuyerUuid::new(), product.uuid)
            .await?;

        assert_eq!(position, None);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_adds_produce_one_flip_and_dense_positions() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = SellerUuid::new();
        let buyer_a = BuyerUuid::new();
        let buyer_b = BuyerUuid::new();

        let product = create_published_product(&ctx, seller, 10_00).await?;

        let (a, b) = tokio::join!(
            ctx.reservations.add_entry(buyer_a, product.uuid),
            ctx.reservations.add_entry(buyer_b, product.uuid),
        );
        a?;
        b?;

        let record = ctx.products.get_product(product.uuid).await?;
        assert_eq!(record.status, ProductStatus::Reserved);

        let mut positions = vec![
            ctx.reservations.queue_position(buyer_a, product.uuid).await?,
            ctx.reservations.queue_position(buyer_b, product.uuid).await?,
        ];
        positions.sort_unstable();

        assert_eq!(positions, vec![Some(1), Some(2)]);

        Ok(())
    }
}
