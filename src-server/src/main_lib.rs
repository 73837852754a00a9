use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use debtorbook_core::storage::{FileStorage, LocalFileStorage};
use debtorbook_core::trade_debtors::{InMemoryTradeDebtorService, TradeDebtorServiceTrait};

use crate::config::Config;

/// Shared application state handed to every handler.
pub struct AppState {
    pub debtor_service: Arc<dyn TradeDebtorServiceTrait>,
    pub storage: Arc<dyn FileStorage>,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(&config.upload_dir));
    let debtor_service: Arc<dyn TradeDebtorServiceTrait> =
        Arc::new(InMemoryTradeDebtorService::new(storage.clone()));
    Arc::new(AppState {
        debtor_service,
        storage,
    })
}
