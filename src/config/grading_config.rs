//! config/grading_config.rs
//! Configuración global de la calificación híbrida (umbrales, endpoint LLM).

use serde::{Deserialize, Serialize};

/// Configuración de la cascada de calificación, con valores por defecto
/// (sobreescribibles vía variables de entorno).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Proporción mínima de palabras clave para marcar correcta en el nivel 2.
    pub keyword_accept_threshold: f64,
    /// Proporción máxima de palabras clave para marcar incorrecta en el nivel 2.
    pub keyword_reject_threshold: f64,

    /// Endpoint compatible con chat-completions de OpenAI.
    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    /// Reintentos ante fallo HTTP del LLM antes de mandar a revisión manual.
    pub llm_max_retries: u32,
}

impl Default for GradingConfig {
    fn default() -> Self {
        GradingConfig {
            keyword_accept_threshold: 0.6,
            keyword_reject_threshold: 0.2,
            llm_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            llm_api_key: String::new(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_timeout_secs: 30,
            llm_max_retries: 2,
        }
    }
}

impl GradingConfig {
    /// Lee la configuración del entorno; lo que falte toma el default.
    pub fn from_env() -> Self {
        let mut cfg = GradingConfig::default();

        if let Ok(v) = std::env::var("GRADING_KEYWORD_ACCEPT") {
            if let Ok(parsed) = v.parse() {
                cfg.keyword_accept_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("GRADING_KEYWORD_REJECT") {
            if let Ok(parsed) = v.parse() {
                cfg.keyword_reject_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("LLM_API_URL") {
            cfg.llm_api_url = v;
        }
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            cfg.llm_api_key = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            cfg.llm_model = v;
        }
        if let Ok(v) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse() {
                cfg.llm_timeout_secs = parsed;
            }
        }
        if let Ok(v) = std::env::var("LLM_MAX_RETRIES") {
            if let Ok(parsed) = v.parse() {
                cfg.llm_max_retries = parsed;
            }
        }

        cfg
    }
}
