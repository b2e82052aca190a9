//! Purchase reconciliation
//!
//! Drives each platform purchase through acknowledge -> backend verify ->
//! credit grant, with at most one backend submission per token per attempt.
//! The backend dedupes grants by purchase token, so on any doubt the token is
//! resubmitted rather than trusting local state; local records exist only to
//! avoid redundant submissions within one app session.

use crate::billing::{BillingSession, Purchase, PurchaseState, PurchaseUpdate, UpdateReceiver};
use crate::client::CreditsGateway;
use crate::error::{ErrorCode, Result};
use crate::types::{AddCreditsRequest, CreditBalance};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Client-local lifecycle of one purchase token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Seen, not yet acknowledged (or still pending at the store)
    Pending,
    /// Acknowledged with the store; backend grant not yet confirmed
    Acknowledged,
    /// Backend confirmed the grant; replays of this token are no-ops
    Verified,
    /// Backend rejected the token outright; not resubmitted automatically
    Failed,
}

/// In-memory record of one purchase. Ephemeral: the backend is the source of
/// truth for whether a token was redeemed.
#[derive(Debug, Clone)]
pub struct PurchaseRecord {
    pub purchase_token: String,
    pub product_id: String,
    pub credits_requested: i64,
    pub state: RecordState,
}

/// Product catalog and package identity for credit purchases.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Application package name sent with every grant request
    pub package_name: String,
    /// Credits granted per product id
    pub products: HashMap<String, i64>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        let mut products = HashMap::new();
        products.insert("ideacredit_10".to_string(), 10);
        Self {
            package_name: "com.ideascanner".to_string(),
            products,
        }
    }
}

impl ReconcilerConfig {
    fn credits_for(&self, product_id: &str) -> i64 {
        // Backend defaults an unknown amount to 1
        self.products.get(product_id).copied().unwrap_or(1)
    }
}

/// User-visible outcome of a reconciliation step. The UI layer renders these;
/// the reconciler never blocks on it.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEvent {
    /// Backend verified the token and granted credits
    CreditsGranted {
        purchase_token: String,
        balance: CreditBalance,
    },
    /// The user backed out of the purchase flow; informational
    PurchaseCanceled,
    /// The store reports payment still in flight; nothing to do yet
    PurchasePending { product_id: String },
    /// Store-level failure, message passed through verbatim
    BillingError { message: String },
    /// Acknowledge failed; the purchase stays unresolved and is retried on
    /// the next update or resume pass
    AckFailed {
        purchase_token: String,
        message: String,
    },
    /// Backend grant failed; retryable unless the token was rejected outright
    VerifyFailed {
        purchase_token: String,
        message: String,
        retryable: bool,
    },
    /// Acknowledged, but no user is logged in; redeemed after the next login
    DeferredUntilLogin { purchase_token: String },
    /// Replay of a token already verified this session; no-op
    AlreadyVerified { purchase_token: String },
}

/// Drives purchases from the store through backend verification.
///
/// Single-consumer by design: updates are processed one at a time in arrival
/// order, and within one purchase acknowledge always completes successfully
/// before the grant is attempted. Distinct purchases carry no ordering
/// guarantee relative to each other.
pub struct Reconciler {
    gateway: Arc<dyn CreditsGateway>,
    billing: Arc<dyn BillingSession>,
    config: ReconcilerConfig,
    records: HashMap<String, PurchaseRecord>,
    /// Tokens acknowledged while logged out, waiting for `on_login`
    deferred: Vec<String>,
}

impl Reconciler {
    pub fn new(
        gateway: Arc<dyn CreditsGateway>,
        billing: Arc<dyn BillingSession>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            gateway,
            billing,
            config,
            records: HashMap::new(),
            deferred: Vec::new(),
        }
    }

    /// Current client-local state of a token, if seen this session.
    pub fn record_state(&self, purchase_token: &str) -> Option<RecordState> {
        self.records.get(purchase_token).map(|r| r.state)
    }

    /// Process one update from the billing channel.
    pub async fn handle_update(&mut self, update: PurchaseUpdate) -> Vec<ReconcileEvent> {
        match update {
            PurchaseUpdate::Canceled => {
                tracing::debug!("purchase flow canceled by user");
                vec![ReconcileEvent::PurchaseCanceled]
            }
            PurchaseUpdate::Error { message } => {
                tracing::warn!(%message, "billing update error");
                vec![ReconcileEvent::BillingError { message }]
            }
            PurchaseUpdate::Purchases(batch) => {
                let mut events = Vec::new();
                for purchase in batch {
                    events.extend(self.reconcile(purchase).await);
                }
                events
            }
        }
    }

    /// Startup pass: re-drive every purchase the store still attributes to
    /// this user. Re-acknowledges unacknowledged PURCHASED items before the
    /// store's refund grace window runs out, and resubmits their tokens.
    pub async fn resume(&mut self) -> Result<Vec<ReconcileEvent>> {
        let purchases = self.billing.query_purchases().await?;
        let mut events = Vec::new();
        for purchase in purchases {
            events.extend(self.reconcile(purchase).await);
        }
        Ok(events)
    }

    /// Resubmit every acknowledged-but-unverified token. Cheap to call on any
    /// app-resume trigger; does nothing when there is nothing to settle.
    pub async fn retry_unresolved(&mut self) -> Vec<ReconcileEvent> {
        let tokens: Vec<String> = self
            .records
            .values()
            .filter(|r| r.state == RecordState::Acknowledged)
            .map(|r| r.purchase_token.clone())
            .collect();

        let mut events = Vec::new();
        for token in tokens {
            if !self.gateway.is_authenticated() {
                let event = self.defer(&token);
                events.push(event);
                continue;
            }
            events.push(self.submit(&token).await);
        }
        events
    }

    /// Login hook: redeem tokens that completed while logged out.
    pub async fn on_login(&mut self) -> Vec<ReconcileEvent> {
        let tokens = std::mem::take(&mut self.deferred);
        let mut events = Vec::new();
        for token in tokens {
            if self.record_state(&token) == Some(RecordState::Verified) {
                continue;
            }
            events.push(self.submit(&token).await);
        }
        events
    }

    /// Consume the billing update channel until it closes, forwarding events
    /// to the UI channel. Dropping the event receiver stops the loop.
    pub async fn run(
        &mut self,
        mut updates: UpdateReceiver,
        events: mpsc::UnboundedSender<ReconcileEvent>,
    ) {
        while let Some(update) = updates.recv().await {
            for event in self.handle_update(update).await {
                if events.send(event).is_err() {
                    return;
                }
            }
        }
    }

    async fn reconcile(&mut self, purchase: Purchase) -> Vec<ReconcileEvent> {
        let token = purchase.purchase_token.clone();
        let mut events = Vec::new();

        if purchase.state == PurchaseState::Pending {
            tracing::debug!(product = %purchase.product_id, "purchase pending at store");
            self.record(&purchase, RecordState::Pending);
            events.push(ReconcileEvent::PurchasePending {
                product_id: purchase.product_id,
            });
            return events;
        }

        if self.record_state(&token) == Some(RecordState::Verified) {
            events.push(ReconcileEvent::AlreadyVerified {
                purchase_token: token,
            });
            return events;
        }

        // Settle earlier acknowledged purchases of this product before
        // touching a new one, so an older token is never stranded behind it.
        let stale: Vec<String> = self
            .records
            .values()
            .filter(|r| {
                r.product_id == purchase.product_id
                    && r.purchase_token != token
                    && r.state == RecordState::Acknowledged
            })
            .map(|r| r.purchase_token.clone())
            .collect();
        for prior in stale {
            if self.gateway.is_authenticated() {
                events.push(self.submit(&prior).await);
            }
        }

        let already_acked = purchase.acknowledged
            || self.record_state(&token) == Some(RecordState::Acknowledged);

        if !already_acked {
            if let Err(e) = self.billing.acknowledge(&token).await {
                // Left unresolved on purpose: the store will redeliver the
                // purchase on the next update or resume pass.
                tracing::warn!(%token, error = %e, "acknowledge failed");
                self.record(&purchase, RecordState::Pending);
                events.push(ReconcileEvent::AckFailed {
                    purchase_token: token,
                    message: e.message().to_string(),
                });
                return events;
            }
            tracing::debug!(%token, "purchase acknowledged");
        }

        self.record(&purchase, RecordState::Acknowledged);

        if !self.gateway.is_authenticated() {
            let event = self.defer(&token);
            events.push(event);
            return events;
        }

        events.push(self.submit(&token).await);
        events
    }

    /// One backend grant attempt for an acknowledged token.
    async fn submit(&mut self, token: &str) -> ReconcileEvent {
        let Some(record) = self.records.get(token) else {
            // Only reachable through internal bookkeeping bugs; surface it
            // rather than invent a request.
            return ReconcileEvent::VerifyFailed {
                purchase_token: token.to_string(),
                message: "unknown purchase token".to_string(),
                retryable: false,
            };
        };

        let req = AddCreditsRequest {
            package_name: self.config.package_name.clone(),
            product_id: record.product_id.clone(),
            purchase_token: record.purchase_token.clone(),
            credits_amount: record.credits_requested,
        };

        match self.gateway.add_credits(&req).await {
            Ok(balance) => {
                tracing::debug!(%token, credits = balance.credits, "credits granted");
                self.set_state(token, RecordState::Verified);
                self.deferred.retain(|t| t != token);
                ReconcileEvent::CreditsGranted {
                    purchase_token: token.to_string(),
                    balance,
                }
            }
            Err(e) if e.is_unauthorized() => self.defer(token),
            Err(e) => {
                let retryable = !matches!(
                    e.code(),
                    ErrorCode::Validation | ErrorCode::NotFound
                );
                tracing::warn!(%token, error = %e, retryable, "credit grant failed");
                // A rejected token is terminal; a transport or server failure
                // keeps the record acknowledged so the token is resubmitted.
                if !retryable {
                    self.set_state(token, RecordState::Failed);
                }
                ReconcileEvent::VerifyFailed {
                    purchase_token: token.to_string(),
                    message: e.message().to_string(),
                    retryable,
                }
            }
        }
    }

    fn defer(&mut self, token: &str) -> ReconcileEvent {
        if !self.deferred.iter().any(|t| t == token) {
            self.deferred.push(token.to_string());
        }
        ReconcileEvent::DeferredUntilLogin {
            purchase_token: token.to_string(),
        }
    }

    fn record(&mut self, purchase: &Purchase, state: RecordState) {
        let credits = self.config.credits_for(&purchase.product_id);
        self.records
            .entry(purchase.purchase_token.clone())
            .and_modify(|r| r.state = state)
            .or_insert_with(|| PurchaseRecord {
                purchase_token: purchase.purchase_token.clone(),
                product_id: purchase.product_id.clone(),
                credits_requested: credits,
                state,
            });
    }

    fn set_state(&mut self, token: &str, state: RecordState) {
        if let Some(record) = self.records.get_mut(token) {
            record.state = state;
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("records", &self.records.len())
            .field("deferred", &self.deferred.len())
            .finish()
    }
}