//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    analytics::{AnalyticsSink, TracingAnalyticsSink},
    database::{self, Db},
    domain::{
        checkout::{CheckoutService, PgCheckoutService},
        products::{PgProductsService, ProductsService},
        reservations::{PgReservationsService, ReservationsService},
        want_lists::{PgWantListsService, WantListsService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

#[derive(Clone)]
pub struct AppContext {
    pub products: Arc<dyn ProductsService>,
    pub reservations: Arc<dyn ReservationsService>,
    pub want_lists: Arc<dyn WantListsService>,
    pub checkout: Arc<dyn CheckoutService>,
}

impl AppContext {
    /// Build application context from a database URL, with sales going to
    /// the tracing-backed analytics sink.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::new(Db::new(pool), Arc::new(TracingAnalyticsSink)))
    }

    #[must_use]
    pub fn new(db: Db, analytics: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            products: Arc::new(PgProductsService::new(db.clone())),
            reservations: Arc::new(PgReservationsService::new(db.clone())),
            want_lists: Arc::new(PgWantListsService::new(db.clone())),
            checkout: Arc::new(PgCheckoutService::new(db, analytics)),
        }
    }
}
