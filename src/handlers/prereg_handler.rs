//! handlers/prereg_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::prereg_model::{CreatePreregistroRequest, DecidePreregistroRequest};
use crate::services::prereg_service::PreregService;

/// POST /api/preregistros
pub async fn create_preregistro_endpoint(
    service: web::Data<PreregService>,
    body: web::Json<CreatePreregistroRequest>,
) -> HttpResponse {
    match service.create_preregistro(body.into_inner()).await {
        Ok(id) => HttpResponse::Ok().json(json!({
            "success": true,
            "id": id,
            "message": "Preregistro recibido, pendiente de aprobación"
        })),
        Err(e) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/preregistros/pendientes
pub async fn list_pending_endpoint(service: web::Data<PreregService>) -> HttpResponse {
    match service.list_pending().await {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// POST /api/preregistros/{id}/aprobar
pub async fn approve_endpoint(
    service: web::Data<PreregService>,
    path: web::Path<String>,
    body: web::Json<DecidePreregistroRequest>,
) -> HttpResponse {
    match service.approve(&path.into_inner(), &body.decidido_por).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => {
            let status = if e.to_string().contains("No se encontró") {
                actix_web::http::StatusCode::NOT_FOUND
            } else {
                // Incluye el caso "ya fue decidido"
                actix_web::http::StatusCode::CONFLICT
            };
            HttpResponse::build(status).json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// POST /api/preregistros/{id}/rechazar
pub async fn reject_endpoint(
    service: web::Data<PreregService>,
    path: web::Path<String>,
    body: web::Json<DecidePreregistroRequest>,
) -> HttpResponse {
    match service.reject(&path.into_inner(), &body.decidido_por).await {
        Ok(_) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Preregistro rechazado"
        })),
        Err(e) => HttpResponse::Conflict().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}
