//! In-memory venue with scriptable state.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::types::base_of;
use crate::venue::{Capabilities, RemoteOrder, VenueClient, VenueError};

#[derive(Debug, Default)]
struct Book {
    /// Open orders keyed by venue order id
    open_orders: BTreeMap<String, RemoteOrder>,
    /// Last prices keyed by upper-case base symbol
    prices: HashMap<String, Decimal>,
}

/// Simulated venue supporting every capability.
///
/// Symbols passed in may be composite (`BTCUSDT.PAPER`) or bare; only the
/// base part is used.
#[derive(Debug)]
pub struct PaperVenue {
    name: String,
    book: Mutex<Book>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

fn key(symbol: &str) -> String {
    base_of(symbol).to_ascii_uppercase()
}

impl PaperVenue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            book: Mutex::new(Book::default()),
            next_id: AtomicU64::new(1),
            failing: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn book(&self) -> std::sync::MutexGuard<'_, Book> {
        self.book.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Next synthetic venue order id, e.g. `PAPER-17`.
    pub fn next_venue_order_id(&self) -> String {
        format!("{}-{}", self.name, self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.book().prices.insert(key(symbol), price);
    }

    pub fn clear_price(&self, symbol: &str) {
        self.book().prices.remove(&key(symbol));
    }

    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.book().prices.get(&key(symbol)).copied()
    }

    /// List `order` as open. Orders without an id are ignored.
    pub fn add_order(&self, order: RemoteOrder) {
        if let Some(id) = order.order_id.clone() {
            self.book().open_orders.insert(id, order);
        }
    }

    /// Stop listing an order (filled or canceled out of band).
    pub fn remove_order(&self, venue_order_id: &str) -> Option<RemoteOrder> {
        self.book().open_orders.remove(venue_order_id)
    }

    pub fn open_orders(&self) -> Vec<RemoteOrder> {
        self.book().open_orders.values().cloned().collect()
    }

    /// While set, every venue call fails with a network error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), VenueError> {
        if self.is_failing() {
            Err(VenueError::Network(format!("{} unreachable (simulated)", self.name)))
        } else {
            Ok(())
        }
    }

    /// Move every price by a random fraction in `[-max_step, max_step]`.
    ///
    /// A step that is zero, negative or not finite leaves prices unchanged.
    pub fn random_walk<R: Rng>(&self, rng: &mut R, max_step: f64) {
        if !(max_step.is_finite() && max_step > 0.0) {
            return;
        }
        let mut book = self.book();
        for (symbol, price) in book.prices.iter_mut() {
            let step: f64 = rng.gen_range(-max_step..=max_step);
            let Ok(factor) = Decimal::try_from(1.0 + step) else {
                continue;
            };
            let next = (*price * factor).round_dp(8);
            if next > Decimal::ZERO {
                debug!(venue = %self.name, symbol = %symbol, from = %price, to = %next, "Paper price moved");
                *price = next;
            }
        }
    }
}

#[async_trait]
impl VenueClient for PaperVenue {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn list_open_orders(&self) -> Result<Vec<RemoteOrder>, VenueError> {
        self.check_available()?;
        Ok(self.open_orders())
    }

    async fn cancel(&self, venue_order_id: &str, symbol: &str) -> Result<(), VenueError> {
        self.check_available()?;
        match self.remove_order(venue_order_id) {
            Some(_) => {
                debug!(venue = %self.name, venue_order_id = %venue_order_id, symbol = %symbol, "Paper order canceled");
                Ok(())
            }
            None => Err(VenueError::Api(format!("unknown order {}", venue_order_id))),
        }
    }

    async fn get_last_price(&self, symbol: &str) -> Result<Option<Decimal>, VenueError> {
        self.check_available()?;
        Ok(self.price(symbol))
    }
}
