//! # IdeaScanner SDK
//!
//! Rust client for the IdeaScanner backend: account auth (email/password and
//! Google sign-in), idea analysis with a viability score, and consumable
//! credit purchases verified server-side.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ideascanner_sdk::{AnalyzeOutcome, IdeaScanner, ScannerOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scanner = IdeaScanner::new(ScannerOptions::default())?;
//!     scanner.login("me@example.com", "hunter22").await?;
//!
//!     match scanner
//!         .analyze("A subscription box for rare houseplants", None)
//!         .await?
//!     {
//!         AnalyzeOutcome::Scored(a) => {
//!             println!("Score: {}", a.score.unwrap_or(0));
//!             println!("{}", a.analysis);
//!         }
//!         AnalyzeOutcome::PaymentRequired => {
//!             // Out of free uses and credits - offer a purchase instead of
//!             // showing an error.
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Purchases
//!
//! Credit purchases flow through [`Reconciler`], which owns the one real
//! correctness contract in this client: acknowledge each purchase with the
//! store, then forward the purchase token to the backend for verification,
//! granting credits at most once per token. The store side is abstracted by
//! the [`BillingSession`] trait; purchase updates arrive over the channel
//! from [`update_channel`].
//!
//! Purchase tokens are never discarded before the backend confirms the grant:
//! a failed grant stays acknowledged and is resubmitted on the next
//! reconciliation pass, and the backend dedupes grants by token.

pub mod billing;
pub mod client;
pub mod error;
pub mod reconcile;
pub mod storage;
pub mod types;

// Main client
pub use client::{CreditsGateway, IdeaScanner, ScannerOptions, DEFAULT_BASE_URL};

// Error types
pub use error::{ErrorCode, Result, ScannerError};

// Storage
pub use storage::{FileStorage, MemoryStorage, StorageAdapter};

// Billing
pub use billing::{
    update_channel, BillingSession, Offer, Purchase, PurchaseState, PurchaseUpdate,
    UpdateReceiver, UpdateSender,
};

// Reconciliation
pub use reconcile::{
    PurchaseRecord, ReconcileEvent, Reconciler, ReconcilerConfig, RecordState,
};

// Types
pub use types::{
    AddCreditsRequest, Analysis, AnalyzeOutcome, AuthResult, CreditBalance, HistoryEntry,
    UserInfo,
};
