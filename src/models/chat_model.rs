//! models/chat_model.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessageRecord {
    pub id: i64,
    pub conversacion_id: String,
    pub remitente_id: String,
    pub texto: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub remitente_id: String,
    pub texto: String,
}

/// Mensajes nuevos a partir de un id (polling del frontend).
#[derive(Debug, Clone, Serialize)]
pub struct PollMessagesResponse {
    pub conversacion_id: String,
    pub mensajes: Vec<ChatMessageRecord>,
    /// Último id entregado; el cliente lo manda en el siguiente poll.
    pub ultimo_id: i64,
}
