use std::sync::Arc;

use crate::db::postgres::PgStore;
use crate::ledger::Ledger;

pub mod admin;
pub mod auth;
pub mod payment;
pub mod tx;
pub mod utils;
pub mod wallet;

/// Shared handle to the ledger service, as carried in router state.
pub type LedgerHandle = Arc<Ledger<PgStore>>;
