//! Shared test infrastructure for service-level integration tests.

mod helpers;

pub(crate) use context::TestContext;
pub(crate) use helpers::{create_published_product, draft_product};
