use crate::{
    errors::ServiceError,
    models::checkout::DEFAULT_COUNTRY,
    services::commerce::{
        cart_service::CartStore, checkout_service::CheckoutState,
        payment_selector::PaymentMethodSelector,
    },
};
use dashmap::DashMap;
use serde::Serialize;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;

/// Everything the storefront remembers about one shopper.
#[derive(Debug, Clone, Serialize)]
pub struct ShopperSession {
    pub cart: CartStore,
    pub selector: PaymentMethodSelector,
    pub state: CheckoutState,
    /// Shipping country last reported by the checkout form
    pub country: String,
}

impl Default for ShopperSession {
    fn default() -> Self {
        Self {
            cart: CartStore::new(),
            selector: PaymentMethodSelector::new(),
            state: CheckoutState::Idle,
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl ShopperSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that belongs to no registry, for answering reads about
    /// unknown ids.
    pub fn detached() -> SharedSession {
        Arc::new(Mutex::new(Self::default()))
    }
}

pub type SharedSession = Arc<Mutex<ShopperSession>>;

#[derive(Debug)]
struct SessionEntry {
    session: SharedSession,
    checkout_in_flight: Arc<AtomicBool>,
    last_touched: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            session: Arc::new(Mutex::new(ShopperSession::default())),
            checkout_in_flight: Arc::new(AtomicBool::new(false)),
            last_touched: Instant::now(),
        }
    }

    fn touch(&mut self) -> SharedSession {
        self.last_touched = Instant::now();
        Arc::clone(&self.session)
    }

    fn is_busy(&self) -> bool {
        self.checkout_in_flight.load(Ordering::Acquire) || Arc::strong_count(&self.session) > 1
    }
}

/// Clears the in-flight mark when the checkout ends, however it ends.
#[derive(Debug)]
struct InFlightMark(Arc<AtomicBool>);

impl Drop for InFlightMark {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Exclusive access to a session for one checkout attempt.
#[derive(Debug)]
pub struct CheckoutGuard {
    session: OwnedMutexGuard<ShopperSession>,
    _in_flight: InFlightMark,
}

impl Deref for CheckoutGuard {
    type Target = ShopperSession;

    fn deref(&self) -> &ShopperSession {
        &self.session
    }
}

impl DerefMut for CheckoutGuard {
    fn deref_mut(&mut self) -> &mut ShopperSession {
        &mut self.session
    }
}

/// Sessions keyed by the client's session id.
///
/// Only writes create sessions. Idle sessions are dropped by
/// [`SessionRegistry::sweep_idle`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, session_id: &str) -> SharedSession {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::new)
            .touch()
    }

    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions
            .get_mut(session_id)
            .map(|mut entry| entry.touch())
    }

    /// Like [`get`](Self::get), but an unknown id is `NotFound`.
    pub fn require(&self, session_id: &str) -> Result<SharedSession, ServiceError> {
        self.get(session_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", session_id)))
    }

    /// Takes the session for a checkout attempt.
    ///
    /// Fails with `Conflict` while another checkout for the same session is
    /// running. Other requests holding the session only delay the start.
    /// An unknown session has nothing to check out.
    pub async fn begin_checkout(&self, session_id: &str) -> Result<CheckoutGuard, ServiceError> {
        let (session, in_flight) = {
            let mut entry = self
                .sessions
                .get_mut(session_id)
                .ok_or_else(|| ServiceError::InvalidOperation("Cart is empty".to_string()))?;
            (entry.touch(), Arc::clone(&entry.checkout_in_flight))
        };

        if in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ServiceError::Conflict(
                "A checkout is already in progress".to_string(),
            ));
        }
        let mark = InFlightMark(in_flight);

        Ok(CheckoutGuard {
            session: session.lock_owned().await,
            _in_flight: mark,
        })
    }

    /// Drops sessions untouched for `max_idle` that nobody is using.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions
            .retain(|_, entry| entry.is_busy() || now.duration_since(entry.last_touched) < max_idle);
        before.saturating_sub(self.sessions.len())
    }

    /// Sweeps idle sessions every `interval` until the runtime shuts down.
    pub fn start_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        max_idle: Duration,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                let removed = registry.sweep_idle(max_idle);
                if removed > 0 {
                    debug!(removed, remaining = registry.len(), "Swept idle sessions");
                }
            }
        })
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
