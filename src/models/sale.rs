// src/models/sale.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, NaiveDate, Utc};

/// IVA applied to every sale.
pub const TAX_RATE: f64 = 0.21;

// ==================== SALE (point of sale store) ====================

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: i64,
    pub product_name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// A registered sale, persisted newest-first under `sistemaAgraria_sales`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: i64,
    pub sale_date: NaiveDate,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    pub payment_method: PaymentMethod,
    pub items: Vec<SaleItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Sale {
    /// Receipt number shown to the customer, zero-padded to six digits.
    pub fn receipt_number(&self) -> String {
        format!("{:06}", self.id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    #[serde(rename = "efectivo")]
    Cash,
    #[serde(rename = "tarjeta")]
    Card,
    #[serde(rename = "transferencia")]
    Transfer,
    #[serde(rename = "cheque")]
    Cheque,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Efectivo",
            PaymentMethod::Card => "Tarjeta",
            PaymentMethod::Transfer => "Transferencia",
            PaymentMethod::Cheque => "Cheque",
        }
    }
}

// ==================== LEGACY SALE (query store) ====================

/// The differently-shaped records under the standalone `sales` key, read
/// by the sales query view. Kept as its own type instead of being folded
/// into `Sale`: which shape downstream consumers expect has never been
/// settled, so neither store is rewritten into the other.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LegacySale {
    pub id: i64,
    pub date: NaiveDate,
    pub customer: String,
    pub seller: String,
    pub products: Vec<LegacySaleItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LegacySaleItem {
    pub name: String,
    pub quantity: f64,
    pub price: f64,
    pub subtotal: f64,
}

// ==================== REQUEST STRUCTS ====================

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct RegisterSaleRequest {
    pub sale_date: NaiveDate,

    #[validate(length(min = 1, max = 255, message = "Customer name is required"))]
    pub customer_name: String,

    #[validate(length(max = 50, message = "Phone cannot exceed 50 characters"))]
    pub customer_phone: Option<String>,

    pub payment_method: PaymentMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_number_padding() {
        let sale = Sale {
            id: 7,
            sale_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            customer_name: "Juan Pérez".to_string(),
            customer_phone: String::new(),
            payment_method: PaymentMethod::Cash,
            items: vec![],
            subtotal: 0.0,
            tax: 0.0,
            total: 0.0,
            created_at: Utc::now(),
            created_by: "admin".to_string(),
        };
        assert_eq!(sale.receipt_number(), "000007");
    }

    #[test]
    fn test_payment_method_tokens() {
        let json = serde_json::to_string(&PaymentMethod::Transfer).unwrap();
        assert_eq!(json, "\"transferencia\"");
        assert_eq!(PaymentMethod::Cheque.label(), "Cheque");
    }

    #[test]
    fn test_legacy_sale_shape() {
        let raw = r#"{
            "id": 1,
            "date": "2024-01-15",
            "customer": "Juan Pérez",
            "seller": "Admin Usuario",
            "products": [
                { "name": "Semillas de Tomate", "quantity": 2, "price": 15.5, "subtotal": 31.0 }
            ],
            "subtotal": 56.0,
            "tax": 11.76,
            "total": 67.76
        }"#;

        let sale: LegacySale = serde_json::from_str(raw).unwrap();
        assert_eq!(sale.products.len(), 1);
        assert_eq!(sale.products[0].quantity, 2.0);
        assert_eq!(sale.seller, "Admin Usuario");
    }
}
