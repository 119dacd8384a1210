// src/sales.rs - Point of sale
use std::sync::Arc;

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::AuthService;
use crate::error::{AppError, AppResult};
use crate::inventory::{next_movement_id, save_movements, save_products};
use crate::models::{
    MovementKind, ProductCategory, RegisterSaleRequest, Sale, SaleItem, StockMovement, User,
    TAX_RATE,
};
use crate::storage::{keys, Store};
use crate::validator::{FieldValidator, ValidationResult};

// ==================== PRODUCTS AS SEEN BY SALES ====================

/// The sales view of a product. Normally mapped from the inventory store;
/// the legacy `sistemaAgraria_products` key (which already uses this
/// shape) is the fallback when inventory has never run.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaleProduct {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub default_price: f64,
    #[serde(default)]
    pub current_stock: Option<f64>,
    #[serde(default)]
    pub category: Option<ProductCategory>,
}

pub fn load_sale_products(store: &Store) -> Vec<SaleProduct> {
    if let Some(products) = store.get::<Vec<crate::models::Product>>(keys::INVENTORY_PRODUCTS) {
        return products
            .into_iter()
            .map(|p| SaleProduct {
                id: p.id,
                name: p.name,
                unit: p.unit,
                default_price: p.unit_price,
                current_stock: Some(p.current_stock),
                category: Some(p.category),
            })
            .collect();
    }

    store.get::<Vec<SaleProduct>>(keys::LEGACY_PRODUCTS).unwrap_or_default()
}

// ==================== SALE DRAFT (cart) ====================

/// An in-progress sale. Lines are validated against the effective stock:
/// what the inventory says minus what this cart already holds.
#[derive(Debug, Default)]
pub struct SaleDraft {
    items: Vec<SaleItem>,
}

impl SaleDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_in_cart(&self, product_id: i64) -> f64 {
        self.items
            .iter()
            .filter(|i| i.product_id == product_id)
            .map(|i| i.quantity)
            .sum()
    }

    /// Adds a line, merging with an existing line for the same product
    /// (the merged line adopts the latest unit price).
    pub fn add_item(&mut self, product: &SaleProduct, quantity: f64, unit_price: f64) -> AppResult<()> {
        if quantity <= 0.0 {
            return Err(AppError::ValidationError("Quantity must be positive".to_string()));
        }
        if unit_price <= 0.0 {
            return Err(AppError::ValidationError("Unit price must be positive".to_string()));
        }

        if let Some(stock) = product.current_stock {
            let available = stock - self.quantity_in_cart(product.id);
            if quantity > available {
                return Err(AppError::insufficient_stock(available.max(0.0), quantity));
            }
        }

        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(item) => {
                item.quantity += quantity;
                item.unit_price = unit_price;
                item.subtotal = item.quantity * unit_price;
            }
            None => self.items.push(SaleItem {
                product_id: product.id,
                product_name: product.name.clone(),
                unit: product.unit.clone(),
                quantity,
                unit_price,
                subtotal: quantity * unit_price,
            }),
        }

        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> AppResult<()> {
        if index >= self.items.len() {
            return Err(AppError::BadRequest(format!("No cart line at index {}", index)));
        }
        self.items.remove(index);
        Ok(())
    }

    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|i| i.subtotal).sum()
    }

    pub fn tax(&self) -> f64 {
        self.subtotal() * TAX_RATE
    }

    pub fn total(&self) -> f64 {
        self.subtotal() + self.tax()
    }
}

// ==================== SERVICE ====================

pub struct SalesService {
    store: Arc<Store>,
    auth: Arc<AuthService>,
}

impl SalesService {
    pub fn new(store: Arc<Store>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    pub fn products_for_sale(&self) -> AppResult<Vec<SaleProduct>> {
        self.require_viewer()?;
        Ok(load_sale_products(&self.store))
    }

    /// Registered sales, newest first.
    pub fn list(&self) -> AppResult<Vec<Sale>> {
        self.require_viewer()?;
        Ok(self.store.get::<Vec<Sale>>(keys::SALES).unwrap_or_default())
    }

    pub fn recent(&self, limit: usize) -> AppResult<Vec<Sale>> {
        let mut sales = self.list()?;
        sales.truncate(limit);
        Ok(sales)
    }

    pub fn get(&self, id: i64) -> AppResult<Sale> {
        self.require_viewer()?;
        self.store
            .get::<Vec<Sale>>(keys::SALES)
            .unwrap_or_default()
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::sale_not_found(id))
    }

    /// Registers the drafted sale: persists it, then walks the lines
    /// decrementing inventory stock and recording a `salida` movement per
    /// line. The two writes are not transactional; handlers run to
    /// completion on a single thread.
    pub fn register(&self, draft: SaleDraft, request: RegisterSaleRequest) -> AppResult<Sale> {
        let user = self.require_seller()?;
        request.validate()?;
        self.check_request(&request)?;

        if draft.is_empty() {
            return Err(AppError::ValidationError(
                "A sale needs at least one product".to_string(),
            ));
        }

        let mut sales = self.store.get::<Vec<Sale>>(keys::SALES).unwrap_or_default();
        let sale = Sale {
            id: next_id(&sales),
            sale_date: request.sale_date,
            customer_name: request.customer_name,
            customer_phone: request.customer_phone.unwrap_or_default(),
            payment_method: request.payment_method,
            subtotal: draft.subtotal(),
            tax: draft.tax(),
            total: draft.total(),
            items: draft.items,
            created_at: Utc::now(),
            created_by: user.username.clone(),
        };

        sales.insert(0, sale.clone());
        self.store.put(keys::SALES, &sales)?;

        self.apply_to_inventory(&sale, &user);

        log::info!(
            "Sale {} registered for '{}' ({} lines)",
            sale.receipt_number(),
            sale.customer_name,
            sale.items.len()
        );
        Ok(sale)
    }

    /// Stock side effects of a registered sale. Failures here are logged
    /// and do not undo the sale.
    fn apply_to_inventory(&self, sale: &Sale, user: &User) {
        let mut products = self
            .store
            .get::<Vec<crate::models::Product>>(keys::INVENTORY_PRODUCTS)
            .unwrap_or_default();
        let mut movements = self
            .store
            .get::<Vec<StockMovement>>(keys::INVENTORY_MOVEMENTS)
            .unwrap_or_default();
        let today = Local::now().date_naive();

        for item in &sale.items {
            let Some(product) = products.iter_mut().find(|p| p.id == item.product_id) else {
                continue;
            };
            product.current_stock = (product.current_stock - item.quantity).max(0.0);
            movements.insert(
                0,
                StockMovement {
                    id: next_movement_id(&movements),
                    product_id: product.id,
                    product_name: product.name.clone(),
                    kind: MovementKind::Outbound,
                    quantity: item.quantity,
                    reason: "Venta".to_string(),
                    date: today,
                    user: user.username.clone(),
                },
            );
        }

        if let Err(err) = save_products(&self.store, &products) {
            log::warn!("Could not update inventory after sale: {}", err);
        }
        if let Err(err) = save_movements(&self.store, &movements) {
            log::warn!("Could not record sale movements: {}", err);
        }
    }

    fn check_request(&self, request: &RegisterSaleRequest) -> AppResult<()> {
        let mut result = ValidationResult::new();
        if let Err(msg) = FieldValidator::not_empty(&request.customer_name, "customerName") {
            result.add_error("customerName", msg);
        }
        if let Err(msg) =
            FieldValidator::not_in_future(request.sale_date, Local::now().date_naive(), "saleDate")
        {
            result.add_error("saleDate", msg);
        }
        result.into_result()
    }

    fn require_viewer(&self) -> AppResult<User> {
        let user = self.auth.require_auth()?;
        if !user.role.can_view_sales() {
            return Err(AppError::Forbidden("Teachers have no access to sales".to_string()));
        }
        Ok(user)
    }

    fn require_seller(&self) -> AppResult<User> {
        let user = self.require_viewer()?;
        if !user.role.can_register_sales() {
            return Err(AppError::Forbidden("Area leads cannot register sales".to_string()));
        }
        Ok(user)
    }
}

fn next_id(sales: &[Sale]) -> i64 {
    sales.iter().map(|s| s.id).max().unwrap_or(0) + 1
}

// ==================== TESTS ====================
