//! handlers/quiz_handler.rs
//! Endpoints de quizzes e intentos. El envío de un intento lo encola a la
//! cola de calificación; el frontend consulta el estado después.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::quiz_model::{CreateQuizRequest, IntentoDetailResponse, SubmitAttemptRequest};
use crate::services::grading_queue::GradingQueue;
use crate::services::grading_service::GradingService;
use crate::services::quiz_service::QuizService;

/// POST /api/quizzes
pub async fn create_quiz_endpoint(
    service: web::Data<QuizService>,
    body: web::Json<CreateQuizRequest>,
) -> HttpResponse {
    match service.create_quiz(body.into_inner()).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/quizzes/{id}
pub async fn get_quiz_endpoint(
    service: web::Data<QuizService>,
    path: web::Path<String>,
) -> HttpResponse {
    let quiz_id = path.into_inner();
    let quiz = match service.get_quiz(&quiz_id).await {
        Ok(q) => q,
        Err(e) => {
            return HttpResponse::NotFound().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    };
    match service.list_preguntas(&quiz_id).await {
        Ok(preguntas) => HttpResponse::Ok().json(json!({
            "quiz": quiz,
            "preguntas": preguntas
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// POST /api/quizzes/{id}/intentos
/// Registra el intento y lo encola para calificación en background.
pub async fn submit_attempt_endpoint(
    service: web::Data<QuizService>,
    queue: web::Data<GradingQueue>,
    path: web::Path<String>,
    body: web::Json<SubmitAttemptRequest>,
) -> HttpResponse {
    let quiz_id = path.into_inner();

    let resp = match service.submit_attempt(&quiz_id, body.into_inner()).await {
        Ok(r) => r,
        Err(e) => {
            log::error!("Error al registrar intento: {:?}", e);
            return HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": e.to_string()
            }));
        }
    };

    if let Err(e) = queue.enqueue(&resp.intento_id) {
        // El intento quedó guardado; se recupera en el siguiente arranque
        log::error!("No se pudo encolar intento {}: {:?}", resp.intento_id, e);
    }

    HttpResponse::Ok().json(resp)
}

/// GET /api/intentos/{id}
/// Estado del intento con el detalle de sus respuestas.
pub async fn get_attempt_endpoint(
    service: web::Data<QuizService>,
    grading: web::Data<GradingService>,
    path: web::Path<String>,
) -> HttpResponse {
    let intento_id = path.into_inner();

    let intento = match service.get_attempt(&intento_id).await {
        Ok(i) => i,
        Err(e) => {
            return HttpResponse::NotFound().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    };

    match grading.list_attempt_answers(&intento_id).await {
        Ok(respuestas) => HttpResponse::Ok().json(IntentoDetailResponse {
            intento,
            respuestas,
        }),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}
