use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::{Pool, Sqlite};

use crate::config::grading_config::GradingConfig;
use crate::logger::init_logger;
use crate::services::chat_service::ChatService;
use crate::services::email_service::{EmailService, GmailConfig};
use crate::services::grading_queue::GradingQueue;
use crate::services::grading_service::GradingService;
use crate::services::income_service::IncomeService;
use crate::services::prereg_service::PreregService;
use crate::services::quiz_service::QuizService;
use crate::services::student_service::StudentService;

mod app;
mod config;
mod handlers;
mod logger;
mod models;
mod services;

async fn setup_database() -> Pool<Sqlite> {
    // 1) Carpeta "data" junto al binario
    std::fs::create_dir_all("data").expect("No se pudo crear directorio 'data'");

    let db_path = std::env::current_dir()
        .expect("No se pudo obtener el current_dir")
        .join("data")
        .join("academia.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.to_string_lossy());

    log::info!("Conectando a SQLite en {}", db_url);

    // 2) Conectarnos con SQLx
    Pool::<Sqlite>::connect(&db_url)
        .await
        .expect("No se pudo conectar a la base de datos SQLite.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let db_pool = setup_database().await;

    // Migraciones
    if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
        panic!("Fallo en migraciones: {:?}", e);
    }

    // Servicios de dominio
    let student_service = StudentService::new(db_pool.clone());
    let prereg_service = PreregService::new(db_pool.clone());
    let income_service = IncomeService::new(db_pool.clone());
    let quiz_service = QuizService::new(db_pool.clone());
    let chat_service = ChatService::new(db_pool.clone());

    // Calificación híbrida + cola en background
    let grading_config = GradingConfig::from_env();
    let grading_service = GradingService::new(db_pool.clone(), grading_config);
    let grading_queue = GradingQueue::start(grading_service.clone());

    // Intentos que quedaron a medias en el arranque anterior
    match grading_service.list_unfinished_attempts().await {
        Ok(pendientes) => {
            for intento_id in pendientes {
                log::info!("Reencolando intento sin calificar {}", intento_id);
                if let Err(e) = grading_queue.enqueue(&intento_id) {
                    log::error!("No se pudo reencolar {}: {:?}", intento_id, e);
                }
            }
        }
        Err(e) => log::error!("No se pudieron recuperar intentos pendientes: {:?}", e),
    }

    // Correo por Gmail (opcional en local)
    let gmail_config = GmailConfig::from_env().unwrap_or_else(|e| {
        log::warn!("Gmail sin configurar ({}); los envíos de correo fallarán", e);
        GmailConfig::disabled()
    });
    let email_service = EmailService::new(db_pool.clone(), gmail_config);

    // Levantar servidor
    log::info!("Levantando servidor en 0.0.0.0:5030");
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(student_service.clone()))
            .app_data(web::Data::new(prereg_service.clone()))
            .app_data(web::Data::new(income_service.clone()))
            .app_data(web::Data::new(quiz_service.clone()))
            .app_data(web::Data::new(chat_service.clone()))
            .app_data(web::Data::new(grading_service.clone()))
            .app_data(web::Data::new(grading_queue.clone()))
            .app_data(web::Data::new(email_service.clone()))
            .configure(app::init_app)
    })
    .bind(("0.0.0.0", 5030))?
    .run()
    .await
}
