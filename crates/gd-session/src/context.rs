use gd_anim::Clock;
use gd_ipc::EventSender;
use gd_net::TransportFactory;
use gd_security::TrustStore;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// Collaborators a session is wired to at construction.
#[derive(Clone)]
pub struct SessionContext {
    pub transports: Arc<dyn TransportFactory>,
    pub events: EventSender,
    pub clock: Arc<dyn Clock>,
    /// Shared by every tab of the application.
    pub trust: Arc<Mutex<TrustStore>>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    pub fn new(
        transports: Arc<dyn TransportFactory>,
        events: EventSender,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transports,
            events,
            clock,
            trust: Arc::new(Mutex::new(TrustStore::default())),
        }
    }

    pub fn with_trust_store(mut self, trust: Arc<Mutex<TrustStore>>) -> Self {
        self.trust = trust;
        self
    }

    pub(crate) fn trust_store(&self) -> MutexGuard<'_, TrustStore> {
        match self.trust.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
