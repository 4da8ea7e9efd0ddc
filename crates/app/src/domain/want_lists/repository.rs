//! Want Lists Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    products::{records::ProductUuid, repository::try_get_cents},
    reservations::records::{BuyerUuid, ReservationUuid},
    want_lists::records::{WantListRecord, WantListStatus, WantListUuid},
};

const CREATE_WANT_LIST_SQL: &str = include_str!("sql/create_want_list.sql");
const GET_WANT_LIST_FOR_UPDATE_SQL: &str = include_str!("sql/get_want_list_for_update.sql");
const GET_ACTIVE_FOR_BUYER_SQL: &str = include_str!("sql/get_active_for_buyer.sql");
const GET_ACTIVE_FOR_BUYER_FOR_UPDATE_SQL: &str =
    include_str!("sql/get_active_for_buyer_for_update.sql");
const SET_WANT_LIST_STATUS_SQL: &str = include_str!("sql/set_want_list_status.sql");
const LOCK_EMPTY_ACTIVE_WANT_LISTS_SQL: &str = include_str!("sql/lock_empty_active_want_lists.sql");
const CANCEL_WANT_LISTS_IF_EMPTY_SQL: &str = include_str!("sql/cancel_want_lists_if_empty.sql");
const LIST_WANT_LIST_ITEMS_SQL: &str = include_str!("sql/list_want_list_items.sql");

/// One want-list entry joined with the catalog fields the aggregate view
/// needs, priced at read time.
#[derive(Debug, Clone)]
pub(crate) struct WantListItemRow {
    pub reservation_uuid: ReservationUuid,
    pub product_uuid: ProductUuid,
    pub queued_at: Timestamp,
    pub title: String,
    pub price_cents: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgWantListsRepository;

impl PgWantListsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_want_list(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        want_list: WantListUuid,
        buyer: BuyerUuid,
    ) -> Result<WantListRecord, sqlx::Error> {
        query_as::<Postgres, WantListRecord>(CREATE_WANT_LIST_SQL)
            .bind(want_list.into_uuid())
            .bind(buyer.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_want_list_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        want_list: WantListUuid,
    ) -> Result<Option<WantListRecord>, sqlx::Error> {
        query_as::<Postgres, WantListRecord>(GET_WANT_LIST_FOR_UPDATE_SQL)
            .bind(want_list.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn get_active_for_buyer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        buyer: BuyerUuid,
    ) -> Result<Option<WantListRecord>, sqlx::Error> {
        query_as::<Postgres, WantListRecord>(GET_ACTIVE_FOR_BUYER_SQL)
            .bind(buyer.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn get_active_for_buyer_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        buyer: BuyerUuid,
    ) -> Result<Option<WantListRecord>, sqlx::Error> {
        query_as::<Postgres, WantListRecord>(GET_ACTIVE_FOR_BUYER_FOR_UPDATE_SQL)
            .bind(buyer.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// The buyer's active want list, row-locked, created on the spot when
    /// there is none. The partial unique index backstops the lost race of
    /// two concurrent first adds; the loser surfaces a unique violation.
    pub(crate) async fn get_or_create_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        buyer: BuyerUuid,
    ) -> Result<WantListRecord, sqlx::Error> {
        if let Some(want_list) = self.get_active_for_buyer_for_update(tx, buyer).await? {
            return Ok(want_list);
        }

        self.create_want_list(tx, WantListUuid::new(), buyer).await
    }

    /// Compare-and-set from `active` into a terminal status. Returns the
    /// number of rows changed.
    pub(crate) async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        want_list: WantListUuid,
        status: WantListStatus,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(SET_WANT_LIST_STATUS_SQL)
            .bind(want_list.into_uuid())
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Lock every active want list that currently has no entries.
    pub(crate) async fn lock_empty_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<WantListRecord>, sqlx::Error> {
        query_as::<Postgres, WantListRecord>(LOCK_EMPTY_ACTIVE_WANT_LISTS_SQL)
            .fetch_all(&mut **tx)
            .await
    }

    /// Cancel the given lists, re-checking emptiness in a fresh statement.
    ///
    /// `FOR UPDATE` alone is not enough here: the emptiness subquery of the
    /// locking scan is not re-evaluated for rows another transaction did
    /// not rewrite, so an entry inserted while we waited for the lock would
    /// go unseen. The second statement reads current state under the locks
    /// we now hold.
    pub(crate) async fn cancel_if_still_empty(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        want_lists: &[WantListUuid],
    ) -> Result<u64, sqlx::Error> {
        let uuids: Vec<Uuid> = want_lists.iter().map(|w| w.into_uuid()).collect();

        let rows_affected = query(CANCEL_WANT_LISTS_IF_EMPTY_SQL)
            .bind(uuids)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// The want list's entries joined with live catalog data, in the
    /// buyer's add order.
    pub(crate) async fn list_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        want_list: WantListUuid,
    ) -> Result<Vec<WantListItemRow>, sqlx::Error> {
        query_as::<Postgres, WantListItemRow>(LIST_WANT_LIST_ITEMS_SQL)
            .bind(want_list.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for WantListRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: WantListUuid::from_uuid(row.try_get("uuid")?),
            buyer_uuid: BuyerUuid::from_uuid(row.try_get("buyer_uuid")?),
            status: try_get_status(row, "status")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for WantListItemRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            reservation_uuid: ReservationUuid::from_uuid(row.try_get("uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            queued_at: row.try_get::<SqlxTimestamp, _>("queued_at")?.to_jiff(),
            title: row.try_get("title")?,
            price_cents: try_get_cents(row, "price_cents")?,
        })
    }
}

fn try_get_status(row: &PgRow, column: &str) -> Result<WantListStatus, sqlx::Error> {
    let raw: String = row.try_get(column)?;

    WantListStatus::parse(&raw).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unknown want list status {raw:?}").into(),
    })
}
