use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use cartstock_cart::{CartItem, NewCartItem};
use cartstock_catalog::Product;
use cartstock_core::{CartItemId, CustomerId, DomainError, Entity, ExpectedVersion, ProductCode};

use super::r#trait::{CartStore, CatalogStore, StoreError};

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

fn from_domain(err: DomainError) -> StoreError {
    match err {
        DomainError::OutOfStock {
            product_code,
            requested,
            available,
        } => StoreError::Insufficient {
            product_code,
            requested,
            available,
        },
        other => StoreError::Invalid(other.to_string()),
    }
}

/// In-memory product catalog.
///
/// Intended for tests/dev. `apply_delta` runs its check and write under one
/// write guard, which serializes concurrent reservations per store.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    products: RwLock<HashMap<ProductCode, Product>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product record.
    pub fn upsert(&self, product: Product) -> Result<(), StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        products.insert(product.code().clone(), product);
        Ok(())
    }

    /// Retire a product from the catalog while carts may still reference it.
    pub fn remove(&self, code: &ProductCode) -> Result<Option<Product>, StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        Ok(products.remove(code))
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn get_by_code(&self, code: &ProductCode) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.get(code).cloned())
    }

    fn apply_delta(&self, code: &ProductCode, delta: i64) -> Result<Product, StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let product = products
            .get_mut(code)
            .ok_or_else(|| StoreError::product_not_found(code))?;
        product.apply_delta(delta).map_err(from_domain)?;
        Ok(product.clone())
    }
}

#[derive(Debug, Default)]
struct CartState {
    items: HashMap<CartItemId, CartItem>,
    by_pair: HashMap<(CustomerId, ProductCode), CartItemId>,
}

impl CartState {
    fn insert(&mut self, item: CartItem) -> Result<(), StoreError> {
        let pair = (item.customer_id(), item.product_code().clone());
        if self.by_pair.contains_key(&pair) {
            return Err(StoreError::Duplicate(format!(
                "customer {} already has product {} in cart",
                pair.0, pair.1
            )));
        }
        if self.items.contains_key(&item.id_typed()) {
            return Err(StoreError::Duplicate(format!("cart item {}", item.id_typed())));
        }
        self.by_pair.insert(pair, item.id_typed());
        self.items.insert(item.id_typed(), item);
        Ok(())
    }

    fn remove(&mut self, id: CartItemId) -> Option<CartItem> {
        let item = self.items.remove(&id)?;
        self.by_pair
            .remove(&(item.customer_id(), item.product_code().clone()));
        Some(item)
    }

    fn customer_items(&self, customer_id: CustomerId) -> Vec<CartItem> {
        let mut items: Vec<CartItem> = self
            .items
            .values()
            .filter(|i| i.customer_id() == customer_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.created_at(), i.id_typed()));
        items
    }
}

/// In-memory cart store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    state: RwLock<CartState>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.items.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Every active line across all customers.
    pub fn all(&self) -> Result<Vec<CartItem>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.items.values().cloned().collect())
    }
}

impl CartStore for InMemoryCartStore {
    fn find_by_customer_and_code(
        &self,
        customer_id: CustomerId,
        code: &ProductCode,
    ) -> Result<Option<CartItem>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .by_pair
            .get(&(customer_id, code.clone()))
            .and_then(|id| state.items.get(id))
            .cloned())
    }

    fn find_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.items.get(&id).cloned())
    }

    fn find_all_by_customer(&self, customer_id: CustomerId) -> Result<Vec<CartItem>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.customer_items(customer_id))
    }

    fn create(&self, fields: NewCartItem) -> Result<CartItem, StoreError> {
        let item = CartItem::create(CartItemId::new(), fields, Utc::now())
            .map_err(|e| StoreError::Invalid(e.to_string()))?;
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.insert(item.clone())?;
        Ok(item)
    }

    fn update_quantity(
        &self,
        id: CartItemId,
        quantity: u32,
        expected_version: ExpectedVersion,
    ) -> Result<CartItem, StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let item = state
            .items
            .get_mut(&id)
            .ok_or_else(|| StoreError::cart_item_not_found(id))?;

        expected_version
            .check(item.version())
            .map_err(|e| StoreError::Concurrency(format!("cart item {id}: {e}")))?;

        item.set_quantity(quantity, Utc::now())
            .map_err(|e| StoreError::Invalid(e.to_string()))?;
        Ok(item.clone())
    }

    fn delete_by_id(&self, id: CartItemId) -> Result<CartItem, StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state
            .remove(id)
            .ok_or_else(|| StoreError::cart_item_not_found(id))
    }

    fn delete_all_by_customer(&self, customer_id: CustomerId) -> Result<Vec<CartItem>, StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let items = state.customer_items(customer_id);
        for item in &items {
            state.remove(item.id_typed());
        }
        Ok(items)
    }

    fn reinstate(&self, item: CartItem) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.insert(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartstock_catalog::{NewProduct, Pricing};
    use cartstock_core::{Money, VendorId};

    fn code(raw: &str) -> ProductCode {
        ProductCode::parse(raw).unwrap()
    }

    fn product(raw: &str, quantity: u32) -> Product {
        Product::new(NewProduct {
            code: code(raw),
            vendor_id: VendorId::new(),
            title: format!("Product {raw}"),
            category: "bath".to_string(),
            pic_url: None,
            pricing: Pricing {
                price: Money::from_minor(1000),
                discount_price: Money::ZERO,
                discount_note: None,
            },
            available_quantity: quantity,
        })
        .unwrap()
    }

    fn fields(customer_id: CustomerId, raw: &str, quantity: u32) -> NewCartItem {
        NewCartItem::snapshot(customer_id, &product(raw, 10), quantity).unwrap()
    }

    #[test]
    fn catalog_apply_delta_rejects_oversell_without_mutation() {
        let store = InMemoryCatalogStore::new();
        store.upsert(product("P-1", 2)).unwrap();

        let err = store.apply_delta(&code("P-1"), -3).unwrap_err();
        assert_eq!(
            err,
            StoreError::Insufficient {
                product_code: "P-1".to_string(),
                requested: 3,
                available: 2,
            }
        );
        assert_eq!(
            store.get_by_code(&code("P-1")).unwrap().unwrap().available_quantity(),
            2
        );
    }

    #[test]
    fn catalog_apply_delta_on_unknown_code_is_not_found() {
        let store = InMemoryCatalogStore::new();
        assert!(store.apply_delta(&code("nope"), 1).unwrap_err().is_not_found());
    }

    #[test]
    fn cart_create_enforces_pair_uniqueness() {
        let store = InMemoryCartStore::new();
        let customer = CustomerId::new();
        store.create(fields(customer, "P-1", 1)).unwrap();

        let err = store.create(fields(customer, "P-1", 2)).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // Same product, different customer is fine.
        store.create(fields(CustomerId::new(), "P-1", 1)).unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn cart_update_checks_version() {
        let store = InMemoryCartStore::new();
        let item = store.create(fields(CustomerId::new(), "P-1", 1)).unwrap();

        let updated = store
            .update_quantity(item.id_typed(), 3, ExpectedVersion::Exact(item.version()))
            .unwrap();
        assert_eq!(updated.quantity(), 3);

        let err = store
            .update_quantity(item.id_typed(), 4, ExpectedVersion::Exact(item.version()))
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));

        let forced = store
            .update_quantity(item.id_typed(), 5, ExpectedVersion::Any)
            .unwrap();
        assert_eq!(forced.quantity(), 5);
        assert_eq!(forced.version(), item.version() + 2);
    }

    #[test]
    fn poisoned_cart_lock_is_unavailable() {
        let store = std::sync::Arc::new(InMemoryCartStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.write().unwrap();
            panic!("poison the cart lock");
        })
        .join();

        assert!(matches!(store.len(), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.is_empty(), Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.find_all_by_customer(CustomerId::new()),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn delete_frees_the_pair_and_reinstate_restores_it() {
        let store = InMemoryCartStore::new();
        let customer = CustomerId::new();
        let item = store.create(fields(customer, "P-1", 2)).unwrap();

        let removed = store.delete_by_id(item.id_typed()).unwrap();
        assert_eq!(removed, item);
        assert!(store.delete_by_id(item.id_typed()).unwrap_err().is_not_found());
        assert!(store.find_by_customer_and_code(customer, &code("P-1")).unwrap().is_none());

        store.reinstate(removed).unwrap();
        assert_eq!(store.find_by_id(item.id_typed()).unwrap(), Some(item));
    }

    #[test]
    fn delete_all_only_touches_one_customer() {
        let store = InMemoryCartStore::new();
        let c1 = CustomerId::new();
        let c2 = CustomerId::new();
        store.create(fields(c1, "P-1", 1)).unwrap();
        store.create(fields(c1, "P-2", 1)).unwrap();
        store.create(fields(c2, "P-1", 1)).unwrap();

        let removed = store.delete_all_by_customer(c1).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store.find_all_by_customer(c1).unwrap().is_empty());
        assert_eq!(store.find_all_by_customer(c2).unwrap().len(), 1);
    }
}
