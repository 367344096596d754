//! models/quiz_model.rs
//! Quizzes de respuesta corta, preguntas con clave de respuesta e intentos.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizRecord {
    pub id: String,
    pub titulo: String,
    pub curso: String,
    pub created_at: String,
}

/// Pregunta con su clave: respuestas exactas aceptadas y palabras clave
/// esperadas (ambas guardadas como columnas JSON en la DB).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreguntaRecord {
    pub id: String,
    pub quiz_id: String,
    pub orden: i64,
    pub texto: String,
    pub respuestas_aceptadas: Vec<String>,
    pub palabras_clave: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePreguntaRequest {
    pub texto: String,
    pub respuestas_aceptadas: Vec<String>,
    #[serde(default)]
    pub palabras_clave: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuizRequest {
    pub titulo: String,
    pub curso: String,
    pub preguntas: Vec<CreatePreguntaRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateQuizResponse {
    pub id: String,
    pub preguntas: usize,
    pub message: String,
}

/// Una respuesta dentro del envío de un intento.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub pregunta_id: String,
    pub texto: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAttemptRequest {
    pub estudiante_id: String,
    pub respuestas: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAttemptResponse {
    pub intento_id: String,
    pub estado: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IntentoRecord {
    pub id: String,
    pub quiz_id: String,
    pub estudiante_id: String,
    /// "pendiente", "calificando", "calificado", "revision" o "error"
    pub estado: String,
    pub puntaje: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Intento junto con el detalle de sus respuestas calificadas.
#[derive(Debug, Clone, Serialize)]
pub struct IntentoDetailResponse {
    pub intento: IntentoRecord,
    pub respuestas: Vec<crate::models::grading_model::RespuestaRecord>,
}
