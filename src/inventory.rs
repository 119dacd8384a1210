// src/inventory.rs - Products and stock movements
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use validator::Validate;

use crate::auth::AuthService;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateProductRequest, MovementKind, Product, RecordMovementRequest, StockMovement, User,
};
use crate::storage::{keys, Store};

// ==================== COLLECTION ACCESS ====================

pub fn load_or_seed_products(store: &Store) -> Vec<Product> {
    if let Some(products) = store.get::<Vec<Product>>(keys::INVENTORY_PRODUCTS) {
        return products;
    }

    let products = default_products();
    if let Err(err) = store.put(keys::INVENTORY_PRODUCTS, &products) {
        log::warn!("Could not persist seeded products: {}", err);
    }
    products
}

pub fn save_products(store: &Store, products: &[Product]) -> AppResult<()> {
    store.put(keys::INVENTORY_PRODUCTS, &products)
}

pub fn load_or_seed_movements(store: &Store) -> Vec<StockMovement> {
    if let Some(movements) = store.get::<Vec<StockMovement>>(keys::INVENTORY_MOVEMENTS) {
        return movements;
    }

    let movements = default_movements();
    if let Err(err) = store.put(keys::INVENTORY_MOVEMENTS, &movements) {
        log::warn!("Could not persist seeded movements: {}", err);
    }
    movements
}

pub fn save_movements(store: &Store, movements: &[StockMovement]) -> AppResult<()> {
    store.put(keys::INVENTORY_MOVEMENTS, &movements)
}

fn default_products() -> Vec<Product> {
    use crate::models::ProductCategory::*;

    let product = |id: i64, name: &str, category, stock: f64, min: f64, price: f64, unit: &str| Product {
        id,
        name: name.to_string(),
        category,
        current_stock: stock,
        min_stock: min,
        unit_price: price,
        unit: unit.to_string(),
    };

    vec![
        product(1, "Semillas de Tomate", Seeds, 25.0, 10.0, 15.50, "paquete"),
        product(2, "Fertilizante Orgánico", Fertilizers, 8.0, 5.0, 25.00, "kg"),
        product(3, "Herramientas de Jardín", Tools, 15.0, 3.0, 45.00, "unidad"),
        product(4, "Macetas de Barro", Pots, 2.0, 5.0, 8.50, "unidad"),
        product(5, "Sustrato para Plantas", Substrates, 12.0, 8.0, 12.00, "kg"),
    ]
}

fn default_movements() -> Vec<StockMovement> {
    vec![
        StockMovement {
            id: 1,
            product_id: 1,
            product_name: "Semillas de Tomate".to_string(),
            kind: MovementKind::Inbound,
            quantity: 10.0,
            reason: "Compra inicial".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid seed date"),
            user: "admin".to_string(),
        },
        StockMovement {
            id: 2,
            product_id: 2,
            product_name: "Fertilizante Orgánico".to_string(),
            kind: MovementKind::Outbound,
            quantity: 2.0,
            reason: "Venta".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 14).expect("valid seed date"),
            user: "admin".to_string(),
        },
    ]
}

pub fn next_movement_id(movements: &[StockMovement]) -> i64 {
    movements.iter().map(|m| m.id).max().unwrap_or(0) + 1
}

// ==================== SERVICE ====================

pub struct InventoryService {
    store: Arc<Store>,
    auth: Arc<AuthService>,
}

impl InventoryService {
    pub fn new(store: Arc<Store>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    pub fn products(&self) -> AppResult<Vec<Product>> {
        self.require_viewer()?;
        Ok(load_or_seed_products(&self.store))
    }

    pub fn movements(&self) -> AppResult<Vec<StockMovement>> {
        self.require_viewer()?;
        Ok(load_or_seed_movements(&self.store))
    }

    /// The newest movements, for the movements table.
    pub fn recent_movements(&self, limit: usize) -> AppResult<Vec<StockMovement>> {
        let mut movements = self.movements()?;
        movements.truncate(limit);
        Ok(movements)
    }

    pub fn add_product(&self, request: CreateProductRequest) -> AppResult<Product> {
        let user = self.require_manager()?;
        request.validate()?;

        let mut products = load_or_seed_products(&self.store);
        let wanted = request.name.to_lowercase();
        if products.iter().any(|p| p.name.to_lowercase() == wanted) {
            return Err(AppError::product_name_taken(&request.name));
        }

        let product = Product {
            id: next_product_id(&products),
            name: request.name,
            category: request.category,
            current_stock: request.initial_stock,
            min_stock: request.min_stock,
            unit_price: request.unit_price,
            unit: request.unit,
        };

        products.push(product.clone());
        save_products(&self.store, &products)?;

        // Opening stock shows up in the movement history
        if product.current_stock > 0.0 {
            let mut movements = load_or_seed_movements(&self.store);
            movements.insert(
                0,
                StockMovement {
                    id: next_movement_id(&movements),
                    product_id: product.id,
                    product_name: product.name.clone(),
                    kind: MovementKind::Inbound,
                    quantity: product.current_stock,
                    reason: "Stock inicial".to_string(),
                    date: Local::now().date_naive(),
                    user: user.username.clone(),
                },
            );
            save_movements(&self.store, &movements)?;
        }

        log::info!("Product '{}' added", product.name);
        Ok(product)
    }

    pub fn update_price(&self, product_id: i64, unit_price: f64) -> AppResult<Product> {
        self.require_manager()?;
        if unit_price <= 0.0 {
            return Err(AppError::ValidationError("Unit price must be positive".to_string()));
        }

        let mut products = load_or_seed_products(&self.store);
        let product = products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| AppError::product_not_found(product_id))?;

        product.unit_price = unit_price;
        let updated = product.clone();
        save_products(&self.store, &products)?;
        Ok(updated)
    }

    pub fn delete_product(&self, product_id: i64) -> AppResult<()> {
        self.require_manager()?;

        let mut products = load_or_seed_products(&self.store);
        let before = products.len();
        products.retain(|p| p.id != product_id);
        if products.len() == before {
            return Err(AppError::product_not_found(product_id));
        }

        save_products(&self.store, &products)?;
        log::info!("Product {} deleted", product_id);
        Ok(())
    }

    /// Applies one stock change: entrada adds, salida subtracts (bounded
    /// by the stock on hand), ajuste overwrites the level.
    pub fn record_movement(&self, request: RecordMovementRequest) -> AppResult<StockMovement> {
        let user = self.require_viewer()?;
        request.validate()?;

        let mut products = load_or_seed_products(&self.store);
        let product = products
            .iter_mut()
            .find(|p| p.id == request.product_id)
            .ok_or_else(|| AppError::product_not_found(request.product_id))?;

        match request.kind {
            MovementKind::Inbound => product.current_stock += request.quantity,
            MovementKind::Outbound => {
                if request.quantity > product.current_stock {
                    return Err(AppError::insufficient_stock(product.current_stock, request.quantity));
                }
                product.current_stock -= request.quantity;
            }
            MovementKind::Adjustment => product.current_stock = request.quantity,
        }

        let movement = StockMovement {
            id: 0, // assigned below
            product_id: product.id,
            product_name: product.name.clone(),
            kind: request.kind,
            quantity: request.quantity,
            reason: request.reason,
            date: Local::now().date_naive(),
            user: user.username.clone(),
        };

        save_products(&self.store, &products)?;

        let mut movements = load_or_seed_movements(&self.store);
        let movement = StockMovement {
            id: next_movement_id(&movements),
            ..movement
        };
        movements.insert(0, movement.clone());
        save_movements(&self.store, &movements)?;

        Ok(movement)
    }

    fn require_viewer(&self) -> AppResult<User> {
        let user = self.auth.require_auth()?;
        if !user.role.can_view_inventory() {
            return Err(AppError::Forbidden("Teachers have no access to inventory".to_string()));
        }
        Ok(user)
    }

    fn require_manager(&self) -> AppResult<User> {
        let user = self.require_viewer()?;
        if !user.role.can_manage_products() {
            return Err(AppError::Forbidden(
                "Only administrators can manage products".to_string(),
            ));
        }
        Ok(user)
    }
}

fn next_product_id(products: &[Product]) -> i64 {
    products.iter().map(|p| p.id).max().unwrap_or(0) + 1
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::models::ProductCategory;

    async fn service_as(username: &str, password: &str) -> InventoryService {
        let store = Arc::new(Store::in_memory());
        let config = AuthConfig {
            login_delay_ms: 0,
            ..AuthConfig::default()
        };
        let auth = Arc::new(AuthService::new(store.clone(), config));
        auth.login(username, password, false).await.unwrap();
        InventoryService::new(store, auth)
    }

    fn movement(product_id: i64, kind: MovementKind, quantity: f64) -> RecordMovementRequest {
        RecordMovementRequest {
            product_id,
            kind,
            quantity,
            reason: "Prueba".to_string(),
        }
    }

    #[tokio::test]
    async fn test_seeded_inventory() {
        let service = service_as("admin", "admin123").await;
        assert_eq!(service.products().unwrap().len(), 5);
        assert_eq!(service.movements().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_inbound_and_outbound() {
        let service = service_as("admin", "admin123").await;

        service.record_movement(movement(1, MovementKind::Inbound, 5.0)).unwrap();
        let products = service.products().unwrap();
        assert_eq!(products[0].current_stock, 30.0);

        service.record_movement(movement(1, MovementKind::Outbound, 12.0)).unwrap();
        let products = service.products().unwrap();
        assert_eq!(products[0].current_stock, 18.0);

        // Movements are prepended
        let movements = service.movements().unwrap();
        assert_eq!(movements[0].kind, MovementKind::Outbound);
        assert_eq!(movements[0].user, "admin");
    }

    #[tokio::test]
    async fn test_outbound_cannot_exceed_stock() {
        let service = service_as("admin", "admin123").await;
        let err = service
            .record_movement(movement(2, MovementKind::Outbound, 100.0))
            .unwrap_err();
        assert!(err.to_string().contains("Insufficient stock"));

        // Stock and history untouched
        let products = service.products().unwrap();
        assert_eq!(products[1].current_stock, 8.0);
        assert_eq!(service.movements().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_adjustment_overwrites_stock() {
        let service = service_as("admin", "admin123").await;
        service.record_movement(movement(4, MovementKind::Adjustment, 9.0)).unwrap();
        let products = service.products().unwrap();
        assert_eq!(products[3].current_stock, 9.0);
    }

    #[tokio::test]
    async fn test_add_product_with_initial_stock() {
        let service = service_as("admin", "admin123").await;
        let product = service
            .add_product(CreateProductRequest {
                name: "Semillas de Lechuga".to_string(),
                category: ProductCategory::Seeds,
                initial_stock: 30.0,
                min_stock: 10.0,
                unit_price: 8.0,
                unit: "paquete".to_string(),
            })
            .unwrap();

        assert_eq!(product.id, 6);

        let movements = service.movements().unwrap();
        assert_eq!(movements[0].reason, "Stock inicial");
        assert_eq!(movements[0].quantity, 30.0);

        // Duplicate name, any case
        let err = service
            .add_product(CreateProductRequest {
                name: "SEMILLAS DE LECHUGA".to_string(),
                category: ProductCategory::Seeds,
                initial_stock: 0.0,
                min_stock: 1.0,
                unit_price: 8.0,
                unit: "paquete".to_string(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_role_gating() {
        // Teachers cannot even see the inventory
        let service = service_as("prof.animal", "prof123").await;
        assert!(matches!(service.products().unwrap_err(), AppError::Forbidden(_)));

        // Area leads can view and move stock but not manage products
        let service = service_as("jefe", "jefe123").await;
        assert!(service.products().is_ok());
        assert!(service.record_movement(movement(1, MovementKind::Inbound, 1.0)).is_ok());
        assert!(matches!(
            service.update_price(1, 20.0).unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            service.delete_product(1).unwrap_err(),
            AppError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn test_update_price_and_delete() {
        let service = service_as("admin", "admin123").await;

        let updated = service.update_price(3, 50.0).unwrap();
        assert_eq!(updated.unit_price, 50.0);
        assert!(service.update_price(3, 0.0).is_err());

        service.delete_product(3).unwrap();
        assert_eq!(service.products().unwrap().len(), 4);
        assert!(matches!(
            service.update_price(3, 10.0).unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
