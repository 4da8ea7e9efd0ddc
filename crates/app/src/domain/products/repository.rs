//! Products Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::products::{
    data::{CatalogCounts, NewProduct, ProductUpdate},
    records::{ProductRecord, ProductStatus, ProductUuid, SellerUuid},
};

const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const GET_PRODUCT_FOR_UPDATE_SQL: &str = include_str!("sql/get_product_for_update.sql");
const UPDATE_PRODUCT_SQL: &str = include_str!("sql/update_product.sql");
const SET_CATALOG_COUNTS_SQL: &str = include_str!("sql/set_catalog_counts.sql");
const TRANSITION_STATUS_SQL: &str = include_str!("sql/transition_status.sql");
const MARK_SOLD_SQL: &str = include_str!("sql/mark_sold.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProductsRepository;

impl PgProductsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        seller: SellerUuid,
        product: &NewProduct,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(seller.into_uuid())
            .bind(&product.title)
            .bind(&product.description)
            .bind(cents_to_i64(product.price_cents)?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Read a product under its row lock. Every write path that depends on
    /// the product's current state goes through this first.
    pub(crate) async fn get_product_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_FOR_UPDATE_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Lock several product rows, in ascending UUID order.
    ///
    /// Locking one row per statement keeps the acquisition order exact;
    /// a single `FOR UPDATE` over `ANY($1)` would lock in plan order.
    pub(crate) async fn lock_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        products: &[ProductUuid],
    ) -> Result<Vec<ProductRecord>, sqlx::Error> {
        let mut sorted = products.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut records = Vec::with_capacity(sorted.len());

        for product in sorted {
            records.push(self.get_product_for_update(tx, product).await?);
        }

        Ok(records)
    }

    pub(crate) async fn update_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        update: &ProductUpdate,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(UPDATE_PRODUCT_SQL)
            .bind(product.into_uuid())
            .bind(&update.title)
            .bind(&update.description)
            .bind(cents_to_i64(update.price_cents)?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn set_catalog_counts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        counts: CatalogCounts,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(SET_CATALOG_COUNTS_SQL)
            .bind(product.into_uuid())
            .bind(count_to_i32(counts.photos)?)
            .bind(count_to_i32(counts.categories)?)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Compare-and-set status update. Returns the number of rows changed,
    /// which is zero when the product was no longer in `from`.
    pub(crate) async fn transition_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        from: ProductStatus,
        to: ProductStatus,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(TRANSITION_STATUS_SQL)
            .bind(product.into_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Terminal transition from either published state.
    pub(crate) async fn mark_sold(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(MARK_SOLD_SQL)
            .bind(product.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            seller_uuid: SellerUuid::from_uuid(row.try_get("seller_uuid")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price_cents: try_get_cents(row, "price_cents")?,
            status: try_get_status(row, "status")?,
            photo_count: try_get_count(row, "photo_count")?,
            category_count: try_get_count(row, "category_count")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

/// Decode a `BIGINT` cents column into `u64`, rejecting negative values.
pub(crate) fn try_get_cents(row: &PgRow, column: &str) -> Result<u64, sqlx::Error> {
    let cents_i64: i64 = row.try_get(column)?;

    u64::try_from(cents_i64).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn cents_to_i64(cents: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(cents).map_err(|e| sqlx::Error::ColumnDecode {
        index: "price_cents".to_string(),
        source: Box::new(e),
    })
}

fn try_get_count(row: &PgRow, column: &str) -> Result<u32, sqlx::Error> {
    let count_i32: i32 = row.try_get(column)?;

    u32::try_from(count_i32).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn count_to_i32(count: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(count).map_err(|e| sqlx::Error::ColumnDecode {
        index: "catalog_count".to_string(),
        source: Box::new(e),
    })
}

fn try_get_status(row: &PgRow, column: &str) -> Result<ProductStatus, sqlx::Error> {
    let raw: String = row.try_get(column)?;

    ProductStatus::parse(&raw).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unknown product status {raw:?}").into(),
    })
}
