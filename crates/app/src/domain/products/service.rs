//! Products service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::products::{
        data::{CatalogCounts, NewProduct, ProductUpdate},
        errors::{ProductsServiceError, PublishRequirement},
        records::{ProductRecord, ProductStatus, ProductUuid, SellerUuid},
        repository::PgProductsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgProductsService {
    db: Db,
    repository: PgProductsRepository,
}

impl PgProductsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProductsRepository::new(),
        }
    }
}

#[async_trait]
impl ProductsService for PgProductsService {
    async fn create_product(
        &self,
        seller: SellerUuid,
        product: NewProduct,
    ) -> Result<ProductRecord, ProductsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let created = self
            .repository
            .create_product(&mut tx, seller, &product)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, ProductsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let product = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn update_product(
        &self,
        seller: SellerUuid,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, ProductsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.repository.get_product_for_update(&mut tx, product).await?;

        if record.seller_uuid != seller {
            return Err(ProductsServiceError::Forbidden);
        }

        if record.status.is_terminal() {
            return Err(ProductsServiceError::AlreadySold);
        }

        let updated = self
            .repository
            .update_product(&mut tx, product, &update)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn set_catalog_counts(
        &self,
        product: ProductUuid,
        counts: CatalogCounts,
    ) -> Result<(), ProductsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let rows_affected = self
            .repository
            .set_catalog_counts(&mut tx, product, counts)
            .await?;

        if rows_affected == 0 {
            return Err(ProductsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn publish_product(
        &self,
        seller: SellerUuid,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.repository.get_product_for_update(&mut tx, product).await?;

        if record.seller_uuid != seller {
            return Err(ProductsServiceError::Forbidden);
        }

        match record.status {
            ProductStatus::Draft => {}
            ProductStatus::Sold => return Err(ProductsServiceError::AlreadySold),
            ProductStatus::Available | ProductStatus::Reserved => {
                return Err(ProductsServiceError::AlreadyPublished);
            }
        }

        // Checklist order is fixed; only the first unmet requirement is
        // reported.
        if record.photo_count == 0 {
            return Err(ProductsServiceError::PreconditionFailed(
                PublishRequirement::Photo,
            ));
        }

        if record.category_count == 0 {
            return Err(ProductsServiceError::PreconditionFailed(
                PublishRequirement::Category,
            ));
        }

        self.repository
            .transition_status(&mut tx, product, ProductStatus::Draft, ProductStatus::Available)
            .await?;

        let published = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(published)
    }

    async fn unpublish_product(
        &self,
        seller: SellerUuid,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.repository.get_product_for_update(&mut tx, product).await?;

        if record.seller_uuid != seller {
            return Err(ProductsServiceError::Forbidden);
        }

        // A reserved product has a non-empty queue by invariant, so the
        // status check doubles as the queue-emptiness check.
        match record.status {
            ProductStatus::Available => {}
            ProductStatus::Draft => return Err(ProductsServiceError::NotPublished),
            ProductStatus::Sold => return Err(ProductsServiceError::AlreadySold),
            ProductStatus::Reserved => return Err(ProductsServiceError::QueueNotEmpty),
        }

        self.repository
            .transition_status(&mut tx, product, ProductStatus::Available, ProductStatus::Draft)
            .await?;

        let unpublished = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(unpublished)
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Creates a new product in `draft` for the given seller.
    async fn create_product(
        &self,
        seller: SellerUuid,
        product: NewProduct,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Retrieve a single product.
    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, ProductsServiceError>;

    /// Updates a product's listing fields. Allowed in any state except
    /// `sold`, including while buyers are queued.
    async fn update_product(
        &self,
        seller: SellerUuid,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Records the product's current photo and category counts, as reported
    /// by the media and taxonomy collaborators.
    async fn set_catalog_counts(
        &self,
        product: ProductUuid,
        counts: CatalogCounts,
    ) -> Result<(), ProductsServiceError>;

    /// Publishes a draft product, making it visible to buyers. Requires at
    /// least one photo and at least one category; the first unmet
    /// requirement is reported.
    async fn publish_product(
        &self,
        seller: SellerUuid,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Withdraws a published product back to `draft`. Refused while any
    /// buyers are queued on it.
    async fn unpublish_product(
        &self,
        seller: SellerUuid,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError>;
}
