// src/export.rs - CSV export for the query views
use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::{Activity, LegacySale};

// ==================== CSV WRITING ====================

// Every string field is quote-wrapped (embedded quotes doubled); numeric
// columns stay bare. One header row, then one row per record, no trailing
// newline.
fn writer(buffer: Vec<u8>) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(buffer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> AppResult<String> {
    let buffer = writer.into_inner().map_err(|e| e.into_error())?;
    let mut csv = String::from_utf8(buffer)
        .map_err(|e| crate::error::AppError::StorageError(e.to_string()))?;
    while csv.ends_with('\n') || csv.ends_with('\r') {
        csv.pop();
    }
    Ok(csv)
}

// ==================== ACTIVITIES ====================

pub const ACTIVITY_HEADERS: [&str; 12] = [
    "Fecha",
    "Hora",
    "Entorno",
    "Tipo",
    "Título",
    "Descripción",
    "Profesor",
    "Año",
    "División",
    "Grupo",
    "Duración (min)",
    "Observaciones",
];

pub fn activities_to_csv(activities: &[Activity]) -> AppResult<String> {
    let mut writer = writer(Vec::new());
    writer.write_record(ACTIVITY_HEADERS)?;

    for activity in activities {
        writer.write_record(&[
            activity.activity_date.to_string(),
            activity.activity_time.format("%H:%M").to_string(),
            activity.environment_name.clone(),
            activity.environment_type.label().to_string(),
            activity.activity_title.clone(),
            activity.activity_description.clone(),
            activity.responsible_teacher.clone(),
            activity.year.clone(),
            activity.division.clone(),
            activity.group.clone(),
            activity.duration.to_string(),
            activity.observations.clone(),
        ])?;
    }

    writer.flush()?;
    finish(writer)
}

pub fn activities_export_filename(date: NaiveDate) -> String {
    format!("consulta_actividades_{}.csv", date)
}

// ==================== SALES ====================

pub const SALE_HEADERS: [&str; 7] =
    ["Fecha", "Cliente", "Vendedor", "Productos", "Subtotal", "IVA", "Total"];

pub fn sales_to_csv(sales: &[LegacySale]) -> AppResult<String> {
    let mut writer = writer(Vec::new());
    writer.write_record(SALE_HEADERS)?;

    for sale in sales {
        let products = sale
            .products
            .iter()
            .map(|p| format!("{} ({})", p.name, p.quantity))
            .collect::<Vec<_>>()
            .join("; ");

        writer.write_record(&[
            sale.date.to_string(),
            sale.customer.clone(),
            sale.seller.clone(),
            products,
            format!("{:.2}", sale.subtotal),
            format!("{:.2}", sale.tax),
            format!("{:.2}", sale.total),
        ])?;
    }

    writer.flush()?;
    finish(writer)
}

pub fn sales_export_filename(date: NaiveDate) -> String {
    format!("ventas_{}.csv", date)
}

// ==================== TESTS ====================
