//! handlers/chat_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::chat_model::SendMessageRequest;
use crate::services::chat_service::ChatService;

#[derive(Deserialize)]
pub struct PollQuery {
    /// Último id que el cliente ya tiene; 0 para todo el historial.
    after_id: Option<i64>,
    limit: Option<u64>,
}

/// POST /api/chat/{conversacion_id}/mensajes
pub async fn send_message_endpoint(
    service: web::Data<ChatService>,
    path: web::Path<String>,
    body: web::Json<SendMessageRequest>,
) -> HttpResponse {
    match service
        .send_message(&path.into_inner(), body.into_inner())
        .await
    {
        Ok(mensaje) => HttpResponse::Ok().json(mensaje),
        Err(e) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/chat/{conversacion_id}/mensajes?after_id=N
pub async fn poll_messages_endpoint(
    service: web::Data<ChatService>,
    path: web::Path<String>,
    query: web::Query<PollQuery>,
) -> HttpResponse {
    let after_id = query.after_id.unwrap_or(0);
    let limit = query.limit.unwrap_or(100);

    match service
        .poll_messages(&path.into_inner(), after_id, limit)
        .await
    {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}
