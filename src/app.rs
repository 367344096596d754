//! app.rs
use crate::handlers::{
    chat_handler, email_handler, grading_handler, income_handler, prereg_handler, quiz_handler,
    student_handler,
};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/estudiantes")
                    .route("", web::post().to(student_handler::create_student_endpoint))
                    .route("", web::get().to(student_handler::list_students_endpoint))
                    .route("/{id}", web::get().to(student_handler::get_student_endpoint))
                    .route(
                        "/{id}",
                        web::put().to(student_handler::update_student_endpoint),
                    ),
            )
            .service(
                web::scope("/preregistros")
                    .route(
                        "",
                        web::post().to(prereg_handler::create_preregistro_endpoint),
                    )
                    .route(
                        "/pendientes",
                        web::get().to(prereg_handler::list_pending_endpoint),
                    )
                    .route(
                        "/{id}/aprobar",
                        web::post().to(prereg_handler::approve_endpoint),
                    )
                    .route(
                        "/{id}/rechazar",
                        web::post().to(prereg_handler::reject_endpoint),
                    ),
            )
            .service(
                web::scope("/ingresos")
                    .route("", web::post().to(income_handler::create_ingreso_endpoint))
                    .route("", web::get().to(income_handler::list_ingresos_endpoint))
                    .route(
                        "/resumen/{mes}",
                        web::get().to(income_handler::monthly_summary_endpoint),
                    )
                    .route("/{id}", web::get().to(income_handler::get_ingreso_endpoint)),
            )
            .service(
                web::scope("/quizzes")
                    .route("", web::post().to(quiz_handler::create_quiz_endpoint))
                    .route("/{id}", web::get().to(quiz_handler::get_quiz_endpoint))
                    .route(
                        "/{id}/intentos",
                        web::post().to(quiz_handler::submit_attempt_endpoint),
                    ),
            )
            .service(
                web::scope("/intentos")
                    .route("/{id}", web::get().to(quiz_handler::get_attempt_endpoint))
                    .route(
                        "/{id}/recalificar",
                        web::post().to(grading_handler::regrade_endpoint),
                    ),
            )
            .service(web::scope("/respuestas").route(
                "/{id}/calificacion",
                web::put().to(grading_handler::manual_grade_endpoint),
            ))
            .service(
                web::scope("/chat")
                    .route(
                        "/{conversacion_id}/mensajes",
                        web::post().to(chat_handler::send_message_endpoint),
                    )
                    .route(
                        "/{conversacion_id}/mensajes",
                        web::get().to(chat_handler::poll_messages_endpoint),
                    ),
            )
            .service(
                web::scope("/correos")
                    .route("/enviar", web::post().to(email_handler::send_email_endpoint))
                    .route(
                        "/{id}/estado",
                        web::get().to(email_handler::email_status_endpoint),
                    ),
            ),
    );
}
