// src/models/inventory.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::NaiveDate;

// ==================== PRODUCT ====================

/// An inventory item, persisted under `inventory_products`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: ProductCategory,
    pub current_stock: f64,
    pub min_stock: f64,
    pub unit_price: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProductCategory {
    #[serde(rename = "semillas")]
    Seeds,
    #[serde(rename = "fertilizantes")]
    Fertilizers,
    #[serde(rename = "herramientas")]
    Tools,
    #[serde(rename = "macetas")]
    Pots,
    #[serde(rename = "sustratos")]
    Substrates,
    #[serde(rename = "otros")]
    Other,
}

impl ProductCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Seeds => "Semillas",
            ProductCategory::Fertilizers => "Fertilizantes",
            ProductCategory::Tools => "Herramientas",
            ProductCategory::Pots => "Macetas y Contenedores",
            ProductCategory::Substrates => "Sustratos",
            ProductCategory::Other => "Otros",
        }
    }
}

/// Traffic-light stock level shown next to each product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StockStatus {
    Out,
    Low,
    Ok,
}

impl Product {
    pub fn stock_status(&self) -> StockStatus {
        if self.current_stock == 0.0 {
            StockStatus::Out
        } else if self.current_stock <= self.min_stock {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }
}

// ==================== STOCK MOVEMENT ====================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MovementKind {
    #[serde(rename = "entrada")]
    Inbound,
    #[serde(rename = "salida")]
    Outbound,
    #[serde(rename = "ajuste")]
    Adjustment,
}

impl MovementKind {
    pub fn label(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "Entrada",
            MovementKind::Outbound => "Salida",
            MovementKind::Adjustment => "Ajuste",
        }
    }
}

/// One stock change, persisted newest-first under `inventory_movements`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    #[serde(rename = "type")]
    pub kind: MovementKind,
    pub quantity: f64,
    pub reason: String,
    pub date: NaiveDate,
    pub user: String,
}

// ==================== REQUEST STRUCTS ====================

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    pub category: ProductCategory,

    #[validate(range(min = 0.0, message = "Initial stock cannot be negative"))]
    pub initial_stock: f64,

    #[validate(range(min = 0.0, message = "Minimum stock cannot be negative"))]
    pub min_stock: f64,

    #[validate(range(min = 0.0, message = "Unit price cannot be negative"))]
    pub unit_price: f64,

    #[validate(length(min = 1, max = 20, message = "Unit is required"))]
    pub unit: String,
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct RecordMovementRequest {
    pub product_id: i64,

    pub kind: MovementKind,

    #[validate(range(min = 0.0001, message = "Quantity must be positive"))]
    pub quantity: f64,

    #[validate(length(min = 1, max = 255, message = "Reason is required"))]
    pub reason: String,
}
