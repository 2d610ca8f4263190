//! redb-backed record store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | JSON `Order` | Orders |
//! | `payments` | `payment_id` | JSON `Payment` | Payment ledger |
//! | `order_payments` | `order_id` | `payment_id` | Active payment per order |
//! | `intent_payments` | `intent_id` | `payment_id` | Provider intent lookup |
//! | `processed_events` | `event_id` | processed-at millis | Webhook idempotency |
//!
//! redb serializes write transactions, so the read-check-write sequence of a
//! compare-and-set inside one write transaction is atomic.

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::models::{Order, Payment, PaymentStatus};
use std::path::Path;
use std::sync::Arc;

use super::{OrderFilter, RecordStore, StorageError, StoreResult};

const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");
const PAYMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("payments");
const ORDER_PAYMENTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("order_payments");
const INTENT_PAYMENTS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("intent_payments");
const PROCESSED_EVENTS_TABLE: TableDefinition<&str, i64> =
    TableDefinition::new("processed_events");

/// Record store backed by redb
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at the given path
    ///
    /// Commits are durable once `commit()` returns (redb's default
    /// `Durability::Immediate`).
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, local tooling)
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(ORDER_PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(INTENT_PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_EVENTS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn read_payment_in(txn: &WriteTransaction, id: &str) -> StoreResult<Option<Payment>> {
        let table = txn.open_table(PAYMENTS_TABLE)?;
        let payment = table
            .get(id)?
            .map(|guard| serde_json::from_slice::<Payment>(guard.value()))
            .transpose()?;
        Ok(payment)
    }

    fn insert_order_sync(&self, order: &Order) -> StoreResult<()> {
        let bytes = serde_json::to_vec(order)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            if table.get(order.id.as_str())?.is_some() {
                return Err(StorageError::Duplicate {
                    entity: "order",
                    id: order.id.clone(),
                });
            }
            table.insert(order.id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn get_order_sync(&self, id: &str) -> StoreResult<Option<Order>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ORDERS_TABLE)?;
        let order = table
            .get(id)?
            .map(|guard| serde_json::from_slice::<Order>(guard.value()))
            .transpose()?;
        Ok(order)
    }

    fn update_order_sync(&self, order: &Order, expected_version: u64) -> StoreResult<Order> {
        let txn = self.db.begin_write()?;
        let stored = {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            let current = table
                .get(order.id.as_str())?
                .map(|guard| serde_json::from_slice::<Order>(guard.value()))
                .transpose()?
                .ok_or_else(|| StorageError::NotFound {
                    entity: "order",
                    id: order.id.clone(),
                })?;

            if current.version != expected_version {
                return Err(StorageError::VersionConflict {
                    entity: "order",
                    id: order.id.clone(),
                });
            }

            let mut next = order.clone();
            next.version = expected_version + 1;
            let bytes = serde_json::to_vec(&next)?;
            table.insert(next.id.as_str(), bytes.as_slice())?;
            next
        };
        txn.commit()?;
        Ok(stored)
    }

    fn list_orders_sync(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let order: Order = serde_json::from_slice(value.value())?;
            if filter.matches(&order) {
                orders.push(order);
            }
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    fn insert_payment_sync(&self, payment: &Payment) -> StoreResult<()> {
        let bytes = serde_json::to_vec(payment)?;
        let txn = self.db.begin_write()?;
        {
            let active_id = {
                let index = txn.open_table(ORDER_PAYMENTS_TABLE)?;
                index
                    .get(payment.order_id.as_str())?
                    .map(|guard| guard.value().to_string())
            };
            if let Some(active_id) = active_id
                && let Some(active) = Self::read_payment_in(&txn, &active_id)?
                && !matches!(
                    active.status,
                    PaymentStatus::Failed | PaymentStatus::Cancelled
                )
            {
                return Err(StorageError::ActivePaymentExists {
                    order_id: payment.order_id.clone(),
                });
            }

            let mut table = txn.open_table(PAYMENTS_TABLE)?;
            if table.get(payment.id.as_str())?.is_some() {
                return Err(StorageError::Duplicate {
                    entity: "payment",
                    id: payment.id.clone(),
                });
            }
            table.insert(payment.id.as_str(), bytes.as_slice())?;

            let mut index = txn.open_table(ORDER_PAYMENTS_TABLE)?;
            index.insert(payment.order_id.as_str(), payment.id.as_str())?;

            if let Some(intent_id) = payment.intent_id.as_deref() {
                let mut intents = txn.open_table(INTENT_PAYMENTS_TABLE)?;
                intents.insert(intent_id, payment.id.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn get_payment_sync(&self, id: &str) -> StoreResult<Option<Payment>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PAYMENTS_TABLE)?;
        let payment = table
            .get(id)?
            .map(|guard| serde_json::from_slice::<Payment>(guard.value()))
            .transpose()?;
        Ok(payment)
    }

    fn find_payment_via_index(
        &self,
        index_def: TableDefinition<'static, &'static str, &'static str>,
        key: &str,
    ) -> StoreResult<Option<Payment>> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(index_def)?;
        let payment_id = match index.get(key)? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };
        let table = txn.open_table(PAYMENTS_TABLE)?;
        let payment = table
            .get(payment_id.as_str())?
            .map(|guard| serde_json::from_slice::<Payment>(guard.value()))
            .transpose()?;
        Ok(payment)
    }

    fn update_payment_sync(&self, payment: &Payment, expected_version: u64) -> StoreResult<Payment> {
        let txn = self.db.begin_write()?;
        let stored = {
            let current = Self::read_payment_in(&txn, &payment.id)?.ok_or_else(|| {
                StorageError::NotFound {
                    entity: "payment",
                    id: payment.id.clone(),
                }
            })?;

            if current.version != expected_version {
                return Err(StorageError::VersionConflict {
                    entity: "payment",
                    id: payment.id.clone(),
                });
            }

            let mut next = payment.clone();
            next.version = expected_version + 1;
            let bytes = serde_json::to_vec(&next)?;
            let mut table = txn.open_table(PAYMENTS_TABLE)?;
            table.insert(next.id.as_str(), bytes.as_slice())?;
            next
        };
        txn.commit()?;
        Ok(stored)
    }

    fn mark_event_processed_sync(&self, event_id: &str) -> StoreResult<bool> {
        let txn = self.db.begin_write()?;
        let inserted = {
            let mut table = txn.open_table(PROCESSED_EVENTS_TABLE)?;
            if table.get(event_id)?.is_some() {
                false
            } else {
                table.insert(event_id, shared::util::now_millis())?;
                true
            }
        };
        txn.commit()?;
        Ok(inserted)
    }

    fn is_event_processed_sync(&self, event_id: &str) -> StoreResult<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROCESSED_EVENTS_TABLE)?;
        Ok(table.get(event_id)?.is_some())
    }
}

#[async_trait]
impl RecordStore for RedbStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        self.insert_order_sync(order)
    }

    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        self.get_order_sync(id)
    }

    async fn update_order(&self, order: &Order, expected_version: u64) -> StoreResult<Order> {
        self.update_order_sync(order, expected_version)
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        self.list_orders_sync(&filter)
    }

    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()> {
        self.insert_payment_sync(payment)
    }

    async fn get_payment(&self, id: &str) -> StoreResult<Option<Payment>> {
        self.get_payment_sync(id)
    }

    async fn find_payment_by_order(&self, order_id: &str) -> StoreResult<Option<Payment>> {
        self.find_payment_via_index(ORDER_PAYMENTS_TABLE, order_id)
    }

    async fn find_payment_by_intent(&self, intent_id: &str) -> StoreResult<Option<Payment>> {
        self.find_payment_via_index(INTENT_PAYMENTS_TABLE, intent_id)
    }

    async fn update_payment(
        &self,
        payment: &Payment,
        expected_version: u64,
    ) -> StoreResult<Payment> {
        self.update_payment_sync(payment, expected_version)
    }

    async fn mark_event_processed(&self, event_id: &str) -> StoreResult<bool> {
        self.mark_event_processed_sync(event_id)
    }

    async fn is_event_processed(&self, event_id: &str) -> StoreResult<bool> {
        self.is_event_processed_sync(event_id)
    }
}
