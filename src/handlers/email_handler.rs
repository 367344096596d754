//! handlers/email_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::email_model::SendEmailRequest;
use crate::services::email_service::EmailService;

/// POST /api/correos/enviar
pub async fn send_email_endpoint(
    service: web::Data<EmailService>,
    body: web::Json<SendEmailRequest>,
) -> HttpResponse {
    match service.send_email(body.into_inner()).await {
        Ok(correo_id) => HttpResponse::Ok().json(json!({
            "success": true,
            "correo_id": correo_id,
            "message": "Envío en proceso"
        })),
        Err(e) => {
            log::error!("Error al enviar correo: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// GET /api/correos/{id}/estado
pub async fn email_status_endpoint(
    service: web::Data<EmailService>,
    path: web::Path<String>,
) -> HttpResponse {
    match service.get_email_status(&path.into_inner()).await {
        Ok(status) => HttpResponse::Ok().json(json!({
            "success": true,
            "status": status
        })),
        Err(e) => {
            let status_code = if e.to_string().contains("No se encontró") {
                actix_web::http::StatusCode::NOT_FOUND
            } else {
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
            };
            HttpResponse::build(status_code).json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}
