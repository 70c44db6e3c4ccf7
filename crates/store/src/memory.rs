use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::{AddressId, IntentId, OrderId, ProductId};
use domain::{Address, Order, Product};

use crate::error::StoreError;
use crate::store::{
    AddressStore, InventoryStore, OrderStore, ReserveOutcome, TransitionOutcome,
};
use crate::Result;

#[derive(Debug, Clone)]
struct StockRecord {
    product: Product,
    available: u32,
}

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, StockRecord>,
    addresses: HashMap<AddressId, Address>,
    orders: HashMap<OrderId, Order>,
    intent_index: HashMap<IntentId, OrderId>,
    fail_ops: bool,
}

/// In-memory store implementation for testing and default wiring.
///
/// Every mutating operation runs under a single write lock, so the
/// check-and-write pairs are atomic: the same conditional-update semantics
/// the PostgreSQL implementation gets from `UPDATE ... WHERE`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product with its available stock.
    pub async fn seed_product(&self, product: Product, available: u32) {
        let mut inner = self.inner.write().await;
        inner
            .products
            .insert(product.id.clone(), StockRecord { product, available });
    }

    /// Seeds a customer address.
    pub async fn seed_address(&self, address: Address) {
        let mut inner = self.inner.write().await;
        inner.addresses.insert(address.id, address);
    }

    /// Configures every subsequent operation to fail as if the store were
    /// unreachable. Used to exercise the retryable-failure paths.
    pub async fn set_fail_ops(&self, fail: bool) {
        self.inner.write().await.fail_ops = fail;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Returns a snapshot of all stored orders, for test assertions.
    pub async fn orders(&self) -> Vec<Order> {
        self.inner.read().await.orders.values().cloned().collect()
    }

    fn check(inner: &Inner) -> Result<()> {
        if inner.fail_ops {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let inner = self.inner.read().await;
        Self::check(&inner)?;
        Ok(inner.products.get(product_id).map(|r| r.product.clone()))
    }

    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<ReserveOutcome> {
        let mut inner = self.inner.write().await;
        Self::check(&inner)?;
        let record = inner
            .products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;

        if record.available >= quantity {
            record.available -= quantity;
            Ok(ReserveOutcome::Reserved)
        } else {
            Ok(ReserveOutcome::Insufficient)
        }
    }

    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::check(&inner)?;
        let record = inner
            .products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
        record.available += quantity;
        Ok(())
    }

    async fn available(&self, product_id: &ProductId) -> Result<Option<u32>> {
        let inner = self.inner.read().await;
        Self::check(&inner)?;
        Ok(inner.products.get(product_id).map(|r| r.available))
    }
}

#[async_trait]
impl AddressStore for InMemoryStore {
    async fn get_address(&self, address_id: AddressId) -> Result<Option<Address>> {
        let inner = self.inner.read().await;
        Self::check(&inner)?;
        Ok(inner.addresses.get(&address_id).cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::check(&inner)?;
        if inner.orders.contains_key(&order.id()) {
            return Err(StoreError::DuplicateOrder(order.id()));
        }
        if let Some(intent) = order.payment_intent_id() {
            inner.intent_index.insert(intent.clone(), order.id());
        }
        inner.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Self::check(&inner)?;
        Ok(inner.orders.get(&order_id).cloned())
    }

    async fn find_by_intent(&self, intent_id: &IntentId) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Self::check(&inner)?;
        let Some(order_id) = inner.intent_index.get(intent_id) else {
            return Ok(None);
        };
        Ok(inner.orders.get(order_id).cloned())
    }

    async fn attach_intent(
        &self,
        order_id: OrderId,
        intent_id: &IntentId,
    ) -> Result<TransitionOutcome> {
        let mut inner = self.inner.write().await;
        Self::check(&inner)?;
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Err(StoreError::OrderNotFound(order_id));
        };
        if order.attach_intent(intent_id.clone(), Utc::now()).is_err() {
            return Ok(TransitionOutcome::NotApplied);
        }
        inner.intent_index.insert(intent_id.clone(), order_id);
        Ok(TransitionOutcome::Applied)
    }

    async fn apply_payment_success(&self, intent_id: &IntentId) -> Result<TransitionOutcome> {
        let mut inner = self.inner.write().await;
        Self::check(&inner)?;
        let Some(order_id) = inner.intent_index.get(intent_id).copied() else {
            return Ok(TransitionOutcome::NotApplied);
        };
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Ok(TransitionOutcome::NotApplied);
        };
        match order.settle_paid(Utc::now()) {
            Ok(()) => Ok(TransitionOutcome::Applied),
            Err(_) => Ok(TransitionOutcome::NotApplied),
        }
    }

    async fn apply_payment_failure(&self, intent_id: &IntentId) -> Result<TransitionOutcome> {
        let mut inner = self.inner.write().await;
        Self::check(&inner)?;
        let Some(order_id) = inner.intent_index.get(intent_id).copied() else {
            return Ok(TransitionOutcome::NotApplied);
        };
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Ok(TransitionOutcome::NotApplied);
        };
        match order.settle_failed(Utc::now()) {
            Ok(()) => Ok(TransitionOutcome::Applied),
            Err(_) => Ok(TransitionOutcome::NotApplied),
        }
    }

    async fn cancel_unpaid(&self, order_id: OrderId) -> Result<TransitionOutcome> {
        let mut inner = self.inner.write().await;
        Self::check(&inner)?;
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Err(StoreError::OrderNotFound(order_id));
        };
        match order.settle_failed(Utc::now()) {
            Ok(()) => Ok(TransitionOutcome::Applied),
            Err(_) => Ok(TransitionOutcome::NotApplied),
        }
    }
}
