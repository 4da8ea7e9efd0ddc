//! Reservations Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::domain::{
    products::records::ProductUuid,
    reservations::records::{BuyerUuid, ReservationRecord, ReservationUuid},
    want_lists::records::WantListUuid,
};

const CREATE_RESERVATION_SQL: &str = include_str!("sql/create_reservation.sql");
const GET_RESERVATION_SQL: &str = include_str!("sql/get_reservation.sql");
const DELETE_RESERVATION_SQL: &str = include_str!("sql/delete_reservation.sql");
const LIST_QUEUE_SQL: &str = include_str!("sql/list_queue.sql");
const LIST_QUEUES_SQL: &str = include_str!("sql/list_queues.sql");
const QUEUE_LEN_SQL: &str = include_str!("sql/queue_len.sql");
const ENTRY_EXISTS_SQL: &str = include_str!("sql/entry_exists.sql");
const DELETE_QUEUES_SQL: &str = include_str!("sql/delete_queues.sql");
const LIST_FOR_WANT_LIST_SQL: &str = include_str!("sql/list_for_want_list.sql");
const DELETE_FOR_WANT_LIST_SQL: &str = include_str!("sql/delete_for_want_list.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgReservationsRepository;

impl PgReservationsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Insert a queue entry. `queued_at` is assigned by the database so
    /// arrival order is decided in one place.
    pub(crate) async fn create_reservation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reservation: ReservationUuid,
        product: ProductUuid,
        buyer: BuyerUuid,
        want_list: WantListUuid,
    ) -> Result<ReservationRecord, sqlx::Error> {
        query_as::<Postgres, ReservationRecord>(CREATE_RESERVATION_SQL)
            .bind(reservation.into_uuid())
            .bind(product.into_uuid())
            .bind(buyer.into_uuid())
            .bind(want_list.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_reservation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reservation: ReservationUuid,
    ) -> Result<Option<ReservationRecord>, sqlx::Error> {
        query_as::<Postgres, ReservationRecord>(GET_RESERVATION_SQL)
            .bind(reservation.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn delete_reservation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reservation: ReservationUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_RESERVATION_SQL)
            .bind(reservation.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// One product's live queue in canonical order (arrival, then entry id).
    pub(crate) async fn list_queue(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Vec<ReservationRecord>, sqlx::Error> {
        query_as::<Postgres, ReservationRecord>(LIST_QUEUE_SQL)
            .bind(product.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    /// The live queues of several products at once, each in canonical
    /// order, grouped by product in the result order.
    pub(crate) async fn list_queues(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        products: &[ProductUuid],
    ) -> Result<Vec<ReservationRecord>, sqlx::Error> {
        let uuids: Vec<Uuid> = products.iter().map(|p| p.into_uuid()).collect();

        query_as::<Postgres, ReservationRecord>(LIST_QUEUES_SQL)
            .bind(uuids)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn queue_len(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<u64, sqlx::Error> {
        let count: i64 = query_scalar(QUEUE_LEN_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        u64::try_from(count).map_err(|e| sqlx::Error::ColumnDecode {
            index: "count".to_string(),
            source: Box::new(e),
        })
    }

    pub(crate) async fn entry_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        buyer: BuyerUuid,
    ) -> Result<bool, sqlx::Error> {
        query_scalar(ENTRY_EXISTS_SQL)
            .bind(product.into_uuid())
            .bind(buyer.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Drop every entry of every given product, the other buyers' included.
    pub(crate) async fn delete_queues(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        products: &[ProductUuid],
    ) -> Result<u64, sqlx::Error> {
        let uuids: Vec<Uuid> = products.iter().map(|p| p.into_uuid()).collect();

        let rows_affected = query(DELETE_QUEUES_SQL)
            .bind(uuids)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Drop one want list's own entries, leaving other buyers' claims on
    /// the same products untouched.
    pub(crate) async fn delete_for_want_list(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        want_list: WantListUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_FOR_WANT_LIST_SQL)
            .bind(want_list.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// The entries owned by one want list, in the buyer's add order.
    pub(crate) async fn list_for_want_list(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        want_list: WantListUuid,
    ) -> Result<Vec<ReservationRecord>, sqlx::Error> {
        query_as::<Postgres, ReservationRecord>(LIST_FOR_WANT_LIST_SQL)
            .bind(want_list.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for ReservationRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ReservationUuid::from_uuid(row.try_get("uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            buyer_uuid: BuyerUuid::from_uuid(row.try_get("buyer_uuid")?),
            want_list_uuid: WantListUuid::from_uuid(row.try_get("want_list_uuid")?),
            queued_at: row.try_get::<SqlxTimestamp, _>("queued_at")?.to_jiff(),
        })
    }
}
