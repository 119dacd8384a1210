// src/reports.rs - Query views over activities and sales
use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::activities::load_or_seed_activities;
use crate::auth::AuthService;
use crate::error::AppResult;
use crate::models::{Activity, EnvironmentKind, LegacySale, LegacySaleItem};
use crate::storage::{keys, Store};

// ==================== ACTIVITY QUERY ====================

/// All filters are optional and conjunctive.
#[derive(Debug, Default, Clone)]
pub struct ActivityFilter {
    pub environment_id: Option<i64>,
    pub environment_type: Option<EnvironmentKind>,
    pub teacher: Option<String>,
    pub year: Option<String>,
    pub division: Option<String>,
    pub group_contains: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub title_contains: Option<String>,
    pub description_contains: Option<String>,
}

impl ActivityFilter {
    fn matches(&self, activity: &Activity) -> bool {
        if let Some(id) = self.environment_id {
            if activity.environment_id != id {
                return false;
            }
        }
        if let Some(kind) = self.environment_type {
            if activity.environment_type != kind {
                return false;
            }
        }
        if let Some(ref teacher) = self.teacher {
            if &activity.responsible_teacher != teacher {
                return false;
            }
        }
        if let Some(ref year) = self.year {
            if &activity.year != year {
                return false;
            }
        }
        if let Some(ref division) = self.division {
            if &activity.division != division {
                return false;
            }
        }
        if let Some(ref group) = self.group_contains {
            if !activity.group.to_lowercase().contains(&group.to_lowercase()) {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if activity.activity_date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if activity.activity_date > to {
                return false;
            }
        }
        if let Some(ref title) = self.title_contains {
            if !activity.activity_title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }
        if let Some(ref description) = self.description_contains {
            if !activity
                .activity_description
                .to_lowercase()
                .contains(&description.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

// ==================== SALES QUERY ====================

#[derive(Debug, Default, Clone)]
pub struct SalesFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring on the customer.
    pub customer_contains: Option<String>,
    /// Exact product name anywhere in the sale.
    pub product: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl SalesFilter {
    fn matches(&self, sale: &LegacySale) -> bool {
        if let Some(from) = self.date_from {
            if sale.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if sale.date > to {
                return false;
            }
        }
        if let Some(ref customer) = self.customer_contains {
            if !sale.customer.to_lowercase().contains(&customer.to_lowercase()) {
                return false;
            }
        }
        if let Some(ref product) = self.product {
            if !sale.products.iter().any(|p| &p.name == product) {
                return false;
            }
        }
        if sale.total < self.min_amount.unwrap_or(0.0) {
            return false;
        }
        if sale.total > self.max_amount.unwrap_or(f64::INFINITY) {
            return false;
        }
        true
    }
}

/// Whitelisted sort fields of the sales result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleSortField {
    Date,
    Customer,
    Products,
    Subtotal,
    Tax,
    Total,
}

impl SaleSortField {
    pub fn from_str(field: &str) -> Self {
        match field {
            "customer" => SaleSortField::Customer,
            "products" => SaleSortField::Products,
            "subtotal" => SaleSortField::Subtotal,
            "tax" => SaleSortField::Tax,
            "total" => SaleSortField::Total,
            _ => SaleSortField::Date,
        }
    }
}

pub fn sort_sales(sales: &mut [LegacySale], field: SaleSortField, ascending: bool) {
    let by_f64 = |a: f64, b: f64| a.partial_cmp(&b).unwrap_or(Ordering::Equal);

    sales.sort_by(|a, b| {
        let ordering = match field {
            SaleSortField::Date => a.date.cmp(&b.date),
            SaleSortField::Customer => a.customer.to_lowercase().cmp(&b.customer.to_lowercase()),
            SaleSortField::Products => a.products.len().cmp(&b.products.len()),
            SaleSortField::Subtotal => by_f64(a.subtotal, b.subtotal),
            SaleSortField::Tax => by_f64(a.tax, b.tax),
            SaleSortField::Total => by_f64(a.total, b.total),
        };
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

// ==================== LEGACY SALES STORE ====================

/// The sales query view keeps its own store under the bare `sales` key,
/// with records shaped differently from the point-of-sale collection.
pub fn load_or_seed_legacy_sales(store: &Store) -> Vec<LegacySale> {
    if let Some(sales) = store.get::<Vec<LegacySale>>(keys::LEGACY_SALES) {
        return sales;
    }

    let sales = default_legacy_sales();
    if let Err(err) = store.put(keys::LEGACY_SALES, &sales) {
        log::warn!("Could not persist seeded sales: {}", err);
    }
    sales
}

fn default_legacy_sales() -> Vec<LegacySale> {
    let item = |name: &str, quantity: f64, price: f64| LegacySaleItem {
        name: name.to_string(),
        quantity,
        price,
        subtotal: quantity * price,
    };
    let sale = |id: i64, date: (i32, u32, u32), customer: &str, products: Vec<LegacySaleItem>| {
        let subtotal: f64 = products.iter().map(|p| p.subtotal).sum();
        let tax = subtotal * 0.21;
        LegacySale {
            id,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid seed date"),
            customer: customer.to_string(),
            seller: "Admin Usuario".to_string(),
            products,
            subtotal,
            tax,
            total: subtotal + tax,
        }
    };

    vec![
        sale(1, (2024, 1, 15), "Juan Pérez", vec![
            item("Semillas de Tomate", 2.0, 15.50),
            item("Fertilizante Orgánico", 1.0, 25.00),
        ]),
        sale(2, (2024, 1, 14), "María García", vec![
            item("Herramientas de Jardín", 1.0, 45.00),
        ]),
        sale(3, (2024, 1, 13), "Carlos López", vec![
            item("Semillas de Lechuga", 3.0, 8.00),
            item("Sustrato para Plantas", 2.0, 12.00),
        ]),
        sale(4, (2024, 1, 12), "Ana Martínez", vec![
            item("Macetas de Barro", 5.0, 8.50),
        ]),
        sale(5, (2024, 1, 11), "Roberto Silva", vec![
            item("Semillas de Tomate", 1.0, 15.50),
            item("Regadera Metálica", 1.0, 18.00),
        ]),
    ]
}

// ==================== SERVICE ====================

pub struct ReportsService {
    store: Arc<Store>,
    auth: Arc<AuthService>,
}

impl ReportsService {
    pub fn new(store: Arc<Store>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    /// Filtered activities, most recent first (by date, then time).
    pub fn query_activities(&self, filter: &ActivityFilter) -> AppResult<Vec<Activity>> {
        self.auth.require_auth()?;

        let mut results: Vec<Activity> = load_or_seed_activities(&self.store)
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect();

        results.sort_by(|a, b| {
            (b.activity_date, b.activity_time).cmp(&(a.activity_date, a.activity_time))
        });
        Ok(results)
    }

    /// Distinct teacher names found in the activity log (filter options).
    pub fn activity_teachers(&self) -> AppResult<Vec<String>> {
        self.auth.require_auth()?;

        let mut teachers: Vec<String> = load_or_seed_activities(&self.store)
            .into_iter()
            .map(|a| a.responsible_teacher)
            .collect();
        teachers.sort();
        teachers.dedup();
        Ok(teachers)
    }

    pub fn query_sales(
        &self,
        filter: &SalesFilter,
        sort: SaleSortField,
        ascending: bool,
    ) -> AppResult<Vec<LegacySale>> {
        self.auth.require_auth()?;

        let mut results: Vec<LegacySale> = load_or_seed_legacy_sales(&self.store)
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();

        sort_sales(&mut results, sort, ascending);
        Ok(results)
    }

    /// Distinct product names across all recorded sales (filter options).
    pub fn sale_products(&self) -> AppResult<Vec<String>> {
        self.auth.require_auth()?;

        let mut products: Vec<String> = load_or_seed_legacy_sales(&self.store)
            .into_iter()
            .flat_map(|s| s.products.into_iter().map(|p| p.name))
            .collect();
        products.sort();
        products.dedup();
        Ok(products)
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    async fn service() -> ReportsService {
        let store = Arc::new(Store::in_memory());
        let config = AuthConfig {
            login_delay_ms: 0,
            ..AuthConfig::default()
        };
        let auth = Arc::new(AuthService::new(store.clone(), config));
        auth.login("admin", "admin123", false).await.unwrap();
        ReportsService::new(store, auth)
    }

    #[tokio::test]
    async fn test_activity_filters() {
        let service = service().await;

        let all = service.query_activities(&ActivityFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        // Sorted newest first
        assert!(all[0].activity_date > all[1].activity_date);

        let animal = service
            .query_activities(&ActivityFilter {
                environment_type: Some(EnvironmentKind::Animal),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(animal.len(), 1);
        assert_eq!(animal[0].environment_name, "Granja Avícola");

        let by_title = service
            .query_activities(&ActivityFilter {
                title_contains: Some("siembra".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_title.len(), 1);

        let none = service
            .query_activities(&ActivityFilter {
                environment_type: Some(EnvironmentKind::Animal),
                title_contains: Some("siembra".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_activity_date_range() {
        let service = service().await;
        let filter = ActivityFilter {
            date_from: Some(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()),
            ..Default::default()
        };
        let results = service.query_activities(&filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }

    #[tokio::test]
    async fn test_activity_teacher_options() {
        let service = service().await;
        let teachers = service.activity_teachers().unwrap();
        assert_eq!(
            teachers,
            vec!["Prof. Ana Martínez".to_string(), "Prof. María González".to_string()]
        );
    }

    #[tokio::test]
    async fn test_sales_filters() {
        let service = service().await;

        let all = service
            .query_sales(&SalesFilter::default(), SaleSortField::Date, false)
            .unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].customer, "Juan Pérez"); // newest date first

        let by_customer = service
            .query_sales(
                &SalesFilter {
                    customer_contains: Some("garcía".to_string()),
                    ..Default::default()
                },
                SaleSortField::Date,
                false,
            )
            .unwrap();
        assert_eq!(by_customer.len(), 1);

        let by_product = service
            .query_sales(
                &SalesFilter {
                    product: Some("Semillas de Tomate".to_string()),
                    ..Default::default()
                },
                SaleSortField::Date,
                false,
            )
            .unwrap();
        assert_eq!(by_product.len(), 2);

        let by_amount = service
            .query_sales(
                &SalesFilter {
                    min_amount: Some(55.0),
                    max_amount: Some(60.0),
                    ..Default::default()
                },
                SaleSortField::Date,
                false,
            )
            .unwrap();
        assert_eq!(by_amount.len(), 1);
        assert_eq!(by_amount[0].customer, "Carlos López");
    }

    #[tokio::test]
    async fn test_sales_sorting() {
        let service = service().await;

        let by_total = service
            .query_sales(&SalesFilter::default(), SaleSortField::Total, true)
            .unwrap();
        let totals: Vec<f64> = by_total.iter().map(|s| s.total).collect();
        let mut expected = totals.clone();
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(totals, expected);

        let by_products = service
            .query_sales(&SalesFilter::default(), SaleSortField::Products, false)
            .unwrap();
        assert_eq!(by_products[0].products.len(), 2);
    }

    #[tokio::test]
    async fn test_sale_product_options() {
        let service = service().await;
        let products = service.sale_products().unwrap();
        assert!(products.contains(&"Regadera Metálica".to_string()));
        assert_eq!(products.len(), 7);
    }

    #[test]
    fn test_sort_field_whitelist() {
        assert_eq!(SaleSortField::from_str("total"), SaleSortField::Total);
        assert_eq!(SaleSortField::from_str("customer"), SaleSortField::Customer);
        assert_eq!(SaleSortField::from_str("bogus"), SaleSortField::Date);
    }
}
