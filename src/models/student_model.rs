//! models/student_model.rs
//! Estructuras para estudiantes y asignación de folios.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudentRecord {
    pub id: String,
    /// Folio legible, p. ej. "MEEAU26-0042".
    pub folio: String,
    pub folio_num: i64,
    pub curso: String,
    pub anio: i64,
    pub nombre: String,
    pub apellidos: String,
    pub email: String,
    pub telefono: Option<String>,
    pub activo: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Request para dar de alta un estudiante. El folio lo asigna el servidor.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudentRequest {
    pub curso: String,
    pub anio: i64,
    pub nombre: String,
    pub apellidos: String,
    pub email: String,
    pub telefono: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStudentResponse {
    pub id: String,
    pub folio: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStudentRequest {
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub activo: Option<bool>,
}

/// Para listar estudiantes con paginación
#[derive(Debug, Clone, Serialize)]
pub struct ListStudentsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<StudentRecord>,
}
