//! models/income_model.rs
//! Estructuras para ingresos (pagos) y sus resúmenes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IngresoRecord {
    pub id: String,
    pub estudiante_id: Option<String>,
    pub concepto: String,
    pub monto: f64,
    /// "efectivo", "transferencia", "tarjeta", etc.
    pub metodo: String,
    /// Liga opcional a un evento de calendario.
    pub evento_id: Option<String>,
    /// Fecha del pago (YYYY-MM-DD).
    pub fecha: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIngresoRequest {
    pub estudiante_id: Option<String>,
    pub concepto: String,
    pub monto: f64,
    pub metodo: String,
    pub evento_id: Option<String>,
    pub fecha: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateIngresoResponse {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListIngresosResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<IngresoRecord>,
}

/// Totales de un mes agrupados por método de pago.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MonthlySummaryRow {
    pub metodo: String,
    pub cantidad: i64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummaryResponse {
    /// "YYYY-MM"
    pub mes: String,
    pub total_general: f64,
    pub por_metodo: Vec<MonthlySummaryRow>,
}
