//! handlers/income_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::income_model::CreateIngresoRequest;
use crate::services::income_service::IncomeService;

#[derive(Deserialize)]
pub struct PaginationQuery {
    page: Option<u64>,
    page_size: Option<u64>,
}

/// POST /api/ingresos
pub async fn create_ingreso_endpoint(
    service: web::Data<IncomeService>,
    body: web::Json<CreateIngresoRequest>,
) -> HttpResponse {
    match service.create_ingreso(body.into_inner()).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => {
            log::error!("Error al registrar ingreso: {:?}", e);
            HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// GET /api/ingresos
pub async fn list_ingresos_endpoint(
    service: web::Data<IncomeService>,
    query: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20);

    match service.list_ingresos(page, page_size).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/ingresos/{id}
pub async fn get_ingreso_endpoint(
    service: web::Data<IncomeService>,
    path: web::Path<String>,
) -> HttpResponse {
    match service.get_ingreso(&path.into_inner()).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/ingresos/resumen/{mes}  (mes = "YYYY-MM")
pub async fn monthly_summary_endpoint(
    service: web::Data<IncomeService>,
    path: web::Path<String>,
) -> HttpResponse {
    match service.monthly_summary(&path.into_inner()).await {
        Ok(resumen) => HttpResponse::Ok().json(resumen),
        Err(e) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}
