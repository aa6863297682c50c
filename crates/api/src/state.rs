use std::sync::Arc;

use lockbank_core::association::AssociationPolicy;
use lockbank_core::email::EmailPolicy;
use lockbank_db::{AssociationBroker, LoanLedger, LockerRegistry, Store};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Shared database handle.
    pub store: Store,
    pub broker: AssociationBroker,
    pub lockers: LockerRegistry,
    pub ledger: LoanLedger,
    /// Domains accepted for association.
    pub email_policy: Arc<EmailPolicy>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Store, policy: AssociationPolicy, config: ServerConfig) -> Self {
        Self {
            broker: AssociationBroker::new(store.clone(), policy),
            lockers: LockerRegistry::new(store.clone()),
            ledger: LoanLedger::new(store.clone()),
            email_policy: Arc::new(EmailPolicy::new(&config.allowed_email_domains)),
            config: Arc::new(config),
            store,
        }
    }
}
