//! Record store: durable keyed storage for orders and payments
//!
//! Every mutation of an existing entity goes through compare-and-set on its
//! `version`: the write succeeds only when the stored version still equals the
//! version the caller read, and the store bumps it by one. A lost race comes
//! back as [`StorageError::VersionConflict`] with nothing written.

mod redb_store;

pub use redb_store::RedbStore;

use async_trait::async_trait;
use shared::models::{Order, Payment};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    Duplicate { entity: &'static str, id: String },

    #[error("{entity} {id} version conflict")]
    VersionConflict { entity: &'static str, id: String },

    #[error("order {order_id} already has an active payment")]
    ActivePaymentExists { order_id: String },
}

pub type StoreResult<T> = Result<T, StorageError>;

/// Which orders a listing returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderFilter {
    All,
    ByCustomer(String),
    ByDeliveryAgent(String),
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            OrderFilter::All => true,
            OrderFilter::ByCustomer(id) => &order.customer_id == id,
            OrderFilter::ByDeliveryAgent(id) => order.delivery_agent_id.as_deref() == Some(id),
        }
    }
}

/// Durable order/payment storage
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new order. Fails with `Duplicate` if the id is taken.
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;

    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>>;

    /// Compare-and-set write. Returns the stored order with its bumped version.
    async fn update_order(&self, order: &Order, expected_version: u64) -> StoreResult<Order>;

    /// Newest first
    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>>;

    /// Persist a new payment and make it the order's active payment.
    ///
    /// Fails with `ActivePaymentExists` unless the order has no payment yet or
    /// its current one ended `failed`/`cancelled`.
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()>;

    async fn get_payment(&self, id: &str) -> StoreResult<Option<Payment>>;

    /// The order's active payment
    async fn find_payment_by_order(&self, order_id: &str) -> StoreResult<Option<Payment>>;

    async fn find_payment_by_intent(&self, intent_id: &str) -> StoreResult<Option<Payment>>;

    /// Compare-and-set write. Returns the stored payment with its bumped version.
    async fn update_payment(&self, payment: &Payment, expected_version: u64)
    -> StoreResult<Payment>;

    /// Record a provider event id. Returns `false` if it was already recorded.
    async fn mark_event_processed(&self, event_id: &str) -> StoreResult<bool>;

    async fn is_event_processed(&self, event_id: &str) -> StoreResult<bool>;
}
