//! handlers/grading_handler.rs
//! Operaciones administrativas sobre la calificación: override manual y
//! recalificación de un intento completo.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::grading_model::{ManualGradeRequest, RegradeResponse};
use crate::services::grading_queue::GradingQueue;
use crate::services::grading_service::GradingService;

/// PUT /api/respuestas/{id}/calificacion
pub async fn manual_grade_endpoint(
    grading: web::Data<GradingService>,
    path: web::Path<String>,
    body: web::Json<ManualGradeRequest>,
) -> HttpResponse {
    match grading
        .manual_grade(&path.into_inner(), body.es_correcta)
        .await
    {
        Ok(_) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Calificación manual aplicada"
        })),
        Err(e) => {
            let status = if e.to_string().contains("No se encontró") {
                actix_web::http::StatusCode::NOT_FOUND
            } else {
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
            };
            HttpResponse::build(status).json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// POST /api/intentos/{id}/recalificar
/// Reinicia las respuestas calificadas a máquina (las manuales se
/// respetan) y vuelve a encolar el intento.
pub async fn regrade_endpoint(
    grading: web::Data<GradingService>,
    queue: web::Data<GradingQueue>,
    path: web::Path<String>,
) -> HttpResponse {
    let intento_id = path.into_inner();

    let reencoladas = match grading.reset_for_regrade(&intento_id).await {
        Ok(n) => n,
        Err(e) => {
            return HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    };

    if let Err(e) = queue.enqueue(&intento_id) {
        log::error!("No se pudo encolar recalificación de {}: {:?}", intento_id, e);
        return HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": "El intento se reinició pero no se pudo encolar"
        }));
    }

    HttpResponse::Ok().json(RegradeResponse {
        intento_id,
        reencoladas,
        message: "Recalificación encolada".to_string(),
    })
}
