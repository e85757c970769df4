use std::sync::Arc;

use crate::attendance::AttendanceLedger;
use crate::auth::CredentialStore;
use crate::config::Config;
use crate::session::SessionManager;
use crate::storage::{Storage, StoreError};

/// Everything the handlers share, injected through an `Extension`.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionManager,
    pub ledger: AttendanceLedger,
    pub credentials: CredentialStore,
}

impl AppState {
    pub async fn new(config: Config, storage: Arc<dyn Storage>) -> Result<Arc<Self>, StoreError> {
        let data = storage.load_all().await?;

        let sessions = SessionManager::new(config.token_validity);
        let ledger = AttendanceLedger::new(storage.clone(), config.geofence, data.attendance);
        let credentials = CredentialStore::new(storage, data.users);

        Ok(Arc::new(Self {
            config,
            sessions,
            ledger,
            credentials,
        }))
    }
}
