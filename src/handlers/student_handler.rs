//! handlers/student_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::student_model::{CreateStudentRequest, UpdateStudentRequest};
use crate::services::student_service::StudentService;

#[derive(Deserialize)]
pub struct StudentListQuery {
    curso: Option<String>,
    page: Option<u64>,
    page_size: Option<u64>,
}

/// POST /api/estudiantes
pub async fn create_student_endpoint(
    service: web::Data<StudentService>,
    body: web::Json<CreateStudentRequest>,
) -> HttpResponse {
    match service.create_student(body.into_inner()).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => {
            log::error!("Error al crear estudiante: {:?}", e);
            HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// GET /api/estudiantes
pub async fn list_students_endpoint(
    service: web::Data<StudentService>,
    query: web::Query<StudentListQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20);

    match service
        .list_students(query.curso.as_deref(), page, page_size)
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/estudiantes/{id}
pub async fn get_student_endpoint(
    service: web::Data<StudentService>,
    path: web::Path<String>,
) -> HttpResponse {
    match service.get_student(&path.into_inner()).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// PUT /api/estudiantes/{id}
pub async fn update_student_endpoint(
    service: web::Data<StudentService>,
    path: web::Path<String>,
    body: web::Json<UpdateStudentRequest>,
) -> HttpResponse {
    match service
        .update_student(&path.into_inner(), body.into_inner())
        .await
    {
        Ok(_) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Estudiante actualizado"
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
