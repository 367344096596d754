//! services/chat_service.rs
//! Mensajes de chat estudiante/asesor con lectura estilo polling:
//! el cliente pide "lo nuevo después del id X".

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::chat_model::{ChatMessageRecord, PollMessagesResponse, SendMessageRequest};

#[derive(Clone, Debug)]
pub struct ChatService {
    db_pool: Pool<Sqlite>,
}

impl ChatService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        ChatService { db_pool }
    }

    pub async fn send_message(
        &self,
        conversacion_id: &str,
        req: SendMessageRequest,
    ) -> Result<ChatMessageRecord> {
        if req.texto.trim().is_empty() {
            return Err(anyhow!("El mensaje no puede estar vacío"));
        }

        let now = Utc::now().to_rfc3339();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO mensajes (conversacion_id, remitente_id, texto, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(conversacion_id)
        .bind(&req.remitente_id)
        .bind(&req.texto)
        .bind(&now)
        .fetch_one(&self.db_pool)
        .await
        .context("Fallo al insertar mensaje")?;

        Ok(ChatMessageRecord {
            id,
            conversacion_id: conversacion_id.to_string(),
            remitente_id: req.remitente_id,
            texto: req.texto,
            created_at: now,
        })
    }

    /// Mensajes con id mayor a `after_id`, en orden de llegada.
    pub async fn poll_messages(
        &self,
        conversacion_id: &str,
        after_id: i64,
        limit: u64,
    ) -> Result<PollMessagesResponse> {
        let mensajes = sqlx::query_as::<_, ChatMessageRecord>(
            r#"
            SELECT id, conversacion_id, remitente_id, texto, created_at
            FROM mensajes
            WHERE conversacion_id = ?1 AND id > ?2
            ORDER BY id ASC
            LIMIT ?3
            "#,
        )
        .bind(conversacion_id)
        .bind(after_id)
        .bind(limit as i64)
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al leer mensajes")?;

        let ultimo_id = mensajes.last().map(|m| m.id).unwrap_or(after_id);

        Ok(PollMessagesResponse {
            conversacion_id: conversacion_id.to_string(),
            mensajes,
            ultimo_id,
        })
    }
}
