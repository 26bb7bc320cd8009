//! # Session Carts
//!
//! One in-progress sale or route per session id.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Cart Lifecycle                               │
//! │                                                                         │
//! │  POST /api/sessions ─────────────► SessionCart { cart: empty }         │
//! │  POST /api/orders/{id}/session ──► SessionCart { editing: Order(id) }  │
//! │  POST /api/routes/{id}/session ──► SessionCart { editing: Route(id) }  │
//! │        │                                                                │
//! │        │  lines / customer / bottles                                    │
//! │        ▼                                                                │
//! │  POST /api/sessions/{id}/order|route                                   │
//! │        │                                                                │
//! │        ├── Ok  ──► session dropped (cart + customer cleared)           │
//! │        └── Err ──► session untouched, caller fixes and retries         │
//! │                                                                         │
//! │  idle past [server].session_idle_minutes ──► swept                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The map is behind a `RwLock`, each session behind its own `Mutex`, so a
//! slow finalize on one session never blocks another. A session lock is held
//! for the whole finalize so the same cart can't be submitted twice.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use aquaroute_core::{
    BottleLedger, BottleSnapshot, CartBuilder, CartLine, CartTotals, Customer, LineChange, TaxRate,
};

/// The stored document a session is rewriting, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EditTarget {
    Order(String),
    Route(String),
}

/// Cart, customer selection and bottle figures of one session.
#[derive(Debug, Clone)]
pub struct SessionCart {
    pub id: String,
    /// Only this actor may touch the session.
    pub actor_id: String,
    pub cart: CartBuilder,
    pub customer: Option<Customer>,
    pub ledger: BottleLedger,
    pub editing: Option<EditTarget>,
    /// Quantities the edited document already holds, per product. They go
    /// back to stock before the edit is applied, so they count as available.
    pub held: HashMap<String, i64>,
    pub created_at: DateTime<Utc>,
}

impl SessionCart {
    pub fn new(actor_id: impl Into<String>, tax_rate: TaxRate) -> Self {
        SessionCart {
            id: Uuid::new_v4().to_string(),
            actor_id: actor_id.into(),
            cart: CartBuilder::new(tax_rate),
            customer: None,
            ledger: BottleLedger::default(),
            editing: None,
            held: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Stock the cart may draw on for `product_id`.
    pub fn available(&self, product_id: &str, on_hand: i64) -> i64 {
        on_hand + self.held.get(product_id).copied().unwrap_or(0)
    }

    /// Routes every cart change through the ledger.
    pub fn record(&mut self, change: Option<LineChange>) -> Option<LineChange> {
        if let Some(change) = &change {
            self.ledger.record_line_change(change);
        }
        change
    }

    /// Selects the customer and takes a fresh bottle snapshot.
    ///
    /// Bottle counts already derived from the cart are kept.
    pub fn select_customer(&mut self, customer: Customer) {
        self.ledger.snapshot = BottleSnapshot::of(&customer);
        self.customer = Some(customer);
    }

    /// Empties the cart. The ledger follows the removed lines.
    pub fn clear_lines(&mut self) {
        let changes = self.cart.clear();
        self.ledger.record_all(&changes);
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id.clone(),
            lines: self.cart.lines().to_vec(),
            totals: self.cart.totals(),
            customer: self.customer.clone(),
            ledger: self.ledger,
            bottle_balance: self.ledger.balance(),
            editing: self.editing.clone(),
            created_at: self.created_at,
        }
    }
}

/// What the front end renders for a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
    pub customer: Option<Customer>,
    pub ledger: BottleLedger,
    pub bottle_balance: i64,
    pub editing: Option<EditTarget>,
    pub created_at: DateTime<Utc>,
}

pub type SharedSession = Arc<Mutex<SessionCart>>;

#[derive(Debug)]
struct Entry {
    session: SharedSession,
    /// Last successful lookup by its owner.
    last_seen: DateTime<Utc>,
}

/// All open sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: SessionCart) -> SharedSession {
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        let entry = Entry {
            session: shared.clone(),
            last_seen: Utc::now(),
        };
        self.sessions.write().await.insert(id, entry);
        shared
    }

    /// The session, if it exists and belongs to `actor_id`. Marks it active.
    pub async fn get(&self, id: &str, actor_id: &str) -> Option<SharedSession> {
        let shared = self.sessions.read().await.get(id)?.session.clone();

        // Map lock released first: finalize holds the session lock while it
        // removes the entry.
        let owner = shared.lock().await.actor_id.clone();
        if owner != actor_id {
            return None;
        }

        if let Some(entry) = self.sessions.write().await.get_mut(id) {
            entry.last_seen = Utc::now();
        }
        Some(shared)
    }

    pub async fn remove(&self, id: &str) -> Option<SharedSession> {
        self.sessions.write().await.remove(id).map(|entry| entry.session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions nobody has touched for `idle`. Returns how many went.
    ///
    /// A session whose lock is held (a request is working on it) is kept.
    pub async fn sweep_idle(&self, idle: Duration) -> usize {
        let cutoff = Utc::now() - idle;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen > cutoff || entry.session.try_lock().is_err());
        before - sessions.len()
    }

    /// Sweeps idle sessions every `every` until the runtime shuts down.
    ///
    /// Spawn as a background task.
    pub async fn run_idle_sweeper(self, idle: Duration, every: std::time::Duration) {
        info!(idle_minutes = idle.num_minutes(), "Session sweeper starting");

        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let removed = self.sweep_idle(idle).await;
            if removed > 0 {
                let remaining = self.len().await;
                info!(removed, remaining, "Swept idle sessions");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquaroute_core::{CustomerKind, Money, Product, ProductCategory};

    fn product(code: &str, price: i64, deposit: bool) -> Product {
        let now = Utc::now();
        Product {
            id: format!("p-{code}"),
            code: code.to_string(),
            name: code.to_string(),
            description: None,
            category: ProductCategory::Water,
            price: Money::from_minor(price),
            is_active: true,
            affects_bottle_deposit: deposit,
            created_at: now,
            updated_at: now,
        }
    }

    fn customer(lent: i64, owned: i64) -> Customer {
        let now = Utc::now();
        Customer {
            id: "c-1".to_string(),
            code: "CLI001".to_string(),
            tax_id: None,
            name: "Juana Pérez".to_string(),
            kind: CustomerKind::Personal,
            street: "Los Aromos".to_string(),
            street_number: "123".to_string(),
            district: "Maipú".to_string(),
            city: "Santiago".to_string(),
            reference: None,
            phone: None,
            email: None,
            contact: None,
            comments: None,
            bottles_owned: owned,
            bottles_lent: lent,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_deposit_lines_drive_to_deliver() {
        let mut session = SessionCart::new("u-1", TaxRate::IVA);
        let refill = product("BID-20L", 2500, true);
        let pump = product("BOMBA", 7490, false);

        for _ in 0..3 {
            let change = session.cart.add_line(&refill, 10).unwrap();
            session.record(change);
        }
        let change = session.cart.add_line(&pump, 10).unwrap();
        session.record(change);
        assert_eq!(session.ledger.to_deliver, 3);

        let change = session.cart.remove_line(&refill.id);
        session.record(change);
        assert_eq!(session.ledger.to_deliver, 0);
    }

    #[test]
    fn test_select_customer_keeps_cart_figures() {
        let mut session = SessionCart::new("u-1", TaxRate::IVA);
        let refill = product("BID-20L", 2500, true);
        for _ in 0..3 {
            let change = session.cart.add_line(&refill, 10).unwrap();
            session.record(change);
        }
        session.ledger.set_to_collect(2);
        session.select_customer(customer(5, 1));

        let view = session.view();
        assert_eq!(view.ledger.snapshot.in_circulation, 5);
        assert_eq!(view.ledger.snapshot.owned, 1);
        assert_eq!(view.bottle_balance, 6);
    }

    #[test]
    fn test_held_quantities_count_as_available() {
        let mut session = SessionCart::new("u-1", TaxRate::IVA);
        session.held.insert("p-A".to_string(), 2);
        assert_eq!(session.available("p-A", 1), 3);
        assert_eq!(session.available("p-B", 1), 1);
    }

    #[test]
    fn test_clear_lines_resets_to_deliver() {
        let mut session = SessionCart::new("u-1", TaxRate::IVA);
        let refill = product("BID-20L", 2500, true);
        let change = session.cart.add_line(&refill, 10).unwrap();
        session.record(change);
        session.clear_lines();
        assert!(session.cart.is_empty());
        assert_eq!(session.ledger.to_deliver, 0);
    }

    #[tokio::test]
    async fn test_store_checks_owner() {
        let store = SessionStore::new();
        let session = SessionCart::new("u-1", TaxRate::IVA);
        let id = session.id.clone();
        store.insert(session).await;

        assert!(store.get(&id, "u-1").await.is_some());
        assert!(store.get(&id, "u-2").await.is_none());
        assert!(store.remove(&id).await.is_some());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_sessions() {
        let store = SessionStore::new();
        let idle = SessionCart::new("u-1", TaxRate::IVA);
        let idle_id = idle.id.clone();
        store.insert(idle).await;

        assert_eq!(store.sweep_idle(Duration::hours(1)).await, 0);
        assert!(store.get(&idle_id, "u-1").await.is_some());

        assert_eq!(store.sweep_idle(Duration::zero()).await, 1);
        assert!(store.get(&idle_id, "u-1").await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_keeps_session_in_use() {
        let store = SessionStore::new();
        let busy = SessionCart::new("u-1", TaxRate::IVA);
        let busy_id = busy.id.clone();
        let shared = store.insert(busy).await;

        let guard = shared.lock().await;
        assert_eq!(store.sweep_idle(Duration::zero()).await, 0);
        drop(guard);

        assert!(store.get(&busy_id, "u-1").await.is_some());
    }
}
