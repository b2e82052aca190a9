//! Billing session abstraction
//!
//! Wraps the platform's asynchronous purchase API behind a trait so the
//! reconciler never talks to platform code directly. A real binding (Play
//! Billing or similar) implements [`BillingSession`] and pushes
//! [`PurchaseUpdate`]s into the channel created by [`update_channel`].

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A purchasable credit pack as reported by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub product_id: String,
    pub title: String,
    /// Display price, already localized by the store ("$1.99")
    pub price: String,
}

/// Platform-level purchase state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseState {
    /// Payment settled; eligible for acknowledgement
    Purchased,
    /// Payment still in flight (e.g. cash top-up); no action yet
    Pending,
}

/// One purchase as reported by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    /// Opaque token proving the transaction; the idempotency key everywhere
    pub purchase_token: String,
    pub product_id: String,
    pub state: PurchaseState,
    /// Whether the store already considers this purchase acknowledged
    pub acknowledged: bool,
}

/// Asynchronous event from the store, delivered in order on a single channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseUpdate {
    /// One or more purchases changed state; a batch is reconciled
    /// purchase-by-purchase with no cross-purchase ordering guarantee
    Purchases(Vec<Purchase>),
    /// The user backed out; informational, no side effects
    Canceled,
    /// The store reported a failure; `message` is surfaced verbatim
    Error { message: String },
}

/// The platform purchase flow.
///
/// All methods are suspension points; none may be assumed instantaneous.
/// Purchase updates do not come back through return values - they arrive on
/// the update channel, possibly long after `launch_purchase` returned.
#[async_trait]
pub trait BillingSession: Send + Sync {
    /// Look up the offer for a product.
    ///
    /// Fails with `BillingUnavailable` while the store connection is not yet
    /// established; retry after the connection-ready signal rather than
    /// immediately.
    async fn query_offer(&self, product_id: &str) -> Result<Offer>;

    /// Start the purchase flow for an offer. Resulting updates arrive on the
    /// update channel.
    async fn launch_purchase(&self, offer: &Offer) -> Result<()>;

    /// Acknowledge a purchase by token. Required before the store considers
    /// the purchase settled; unacknowledged purchases are auto-refunded after
    /// a grace window. Safe to repeat.
    async fn acknowledge(&self, purchase_token: &str) -> Result<()>;

    /// All purchases the store currently attributes to this user. Used by the
    /// startup pass to re-drive unacknowledged PURCHASED items.
    async fn query_purchases(&self) -> Result<Vec<Purchase>>;
}

/// Sender half given to the billing implementation.
pub type UpdateSender = mpsc::UnboundedSender<PurchaseUpdate>;

/// Receiver half consumed by the reconciler's run loop.
pub type UpdateReceiver = mpsc::UnboundedReceiver<PurchaseUpdate>;

/// Create the channel carrying purchase updates from the billing
/// implementation to the reconciler. Unbounded: update volume is tiny and the
/// sender must never block a platform callback.
pub fn update_channel() -> (UpdateSender, UpdateReceiver) {
    mpsc::unbounded_channel()
}
