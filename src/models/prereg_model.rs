//! models/prereg_model.rs
//! Preregistros de asesores pendientes de aprobación.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PreregistroRecord {
    pub id: String,
    pub nombre: String,
    pub email: String,
    pub telefono: Option<String>,
    pub especialidad: Option<String>,
    /// "pendiente", "aprobado" o "rechazado"
    pub estado: String,
    pub decidido_por: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePreregistroRequest {
    pub nombre: String,
    pub email: String,
    pub telefono: Option<String>,
    pub especialidad: Option<String>,
}

/// Decisión del admin sobre un preregistro.
#[derive(Debug, Clone, Deserialize)]
pub struct DecidePreregistroRequest {
    /// Identificador del admin que decide.
    pub decidido_por: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovePreregistroResponse {
    pub preregistro_id: String,
    /// Id del asesor creado al aprobar.
    pub asesor_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AsesorRecord {
    pub id: String,
    pub preregistro_id: Option<String>,
    pub nombre: String,
    pub email: String,
    pub especialidad: Option<String>,
    pub activo: bool,
    pub created_at: String,
}
