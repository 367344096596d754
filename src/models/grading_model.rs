//! models/grading_model.rs
//! Estructuras de la calificación híbrida: veredictos, método y confianza.

use serde::{Deserialize, Serialize};

/// Método con el que se decidió una respuesta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingMethod {
    Exacta,
    PalabrasClave,
    Llm,
    Manual,
}

impl GradingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradingMethod::Exacta => "exacta",
            GradingMethod::PalabrasClave => "palabras_clave",
            GradingMethod::Llm => "llm",
            GradingMethod::Manual => "manual",
        }
    }
}

/// Veredicto de la cascada para una respuesta.
#[derive(Debug, Clone, PartialEq)]
pub enum GradingVerdict {
    Decided {
        correcta: bool,
        confianza: f64,
        metodo: GradingMethod,
    },
    /// El nivel 2 no fue concluyente; pasa al LLM.
    Ambiguous {
        keyword_ratio: f64,
    },
    /// El LLM falló o no se pudo interpretar; revisión manual.
    NeedsReview,
}

/// Respuesta persistida con su metadata de calificación.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RespuestaRecord {
    pub id: String,
    pub intento_id: String,
    pub pregunta_id: String,
    pub texto: String,
    pub es_correcta: Option<bool>,
    pub confianza: Option<f64>,
    pub metodo: Option<String>,
    /// "pendiente", "calificada" o "revision"
    pub estado: String,
    pub calificada_en: Option<String>,
}

/// Veredicto JSON que se le pide al LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmVerdict {
    pub correcta: bool,
    pub confianza: f64,
}

/// Override manual de un admin sobre una respuesta.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualGradeRequest {
    pub es_correcta: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegradeResponse {
    pub intento_id: String,
    pub reencoladas: u64,
    pub message: String,
}
