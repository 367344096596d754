//! services/grading_queue.rs
//! Cola en memoria con un único worker secuencial que drena intentos y
//! los manda a la cascada de calificación. El orden de llegada se respeta
//! y un intento fallido no tumba al worker: queda en estado 'error'.

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::services::grading_service::GradingService;

#[derive(Clone)]
pub struct GradingQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl GradingQueue {
    /// Arranca el worker y devuelve el extremo para encolar.
    pub fn start(grading_service: GradingService) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            log::info!("Worker de calificación arrancado");
            while let Some(intento_id) = rx.recv().await {
                match grading_service.grade_attempt(&intento_id).await {
                    Ok(_) => {
                        log::info!("Intento {} calificado", intento_id);
                    }
                    Err(e) => {
                        log::error!("Fallo al calificar intento {}: {:?}", intento_id, e);
                        if let Err(e2) = grading_service
                            .set_attempt_status(&intento_id, "error", Some(&format!("{:?}", e)))
                            .await
                        {
                            log::error!(
                                "No se pudo marcar intento {} en error: {:?}",
                                intento_id,
                                e2
                            );
                        }
                    }
                }
            }
            log::info!("Worker de calificación detenido (cola cerrada)");
        });

        GradingQueue { tx }
    }

    pub fn enqueue(&self, intento_id: &str) -> Result<()> {
        self.tx
            .send(intento_id.to_string())
            .map_err(|_| anyhow!("La cola de calificación está cerrada"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::grading_config::GradingConfig;
    use sqlx::{Pool, Sqlite};

    async fn test_pool() -> Pool<Sqlite> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("No se pudo abrir sqlite en memoria");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Fallo al migrar");
        pool
    }

    fn offline_config() -> GradingConfig {
        GradingConfig {
            llm_api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            llm_timeout_secs: 1,
            llm_max_retries: 0,
            ..GradingConfig::default()
        }
    }

    async fn seed_attempt(pool: &Pool<Sqlite>, texto: &str) -> String {
        use crate::models::quiz_model::{
            CreatePreguntaRequest, CreateQuizRequest, SubmitAttemptRequest, SubmittedAnswer,
        };
        use crate::services::quiz_service::QuizService;

        let quiz_service = QuizService::new(pool.clone());
        let quiz = quiz_service
            .create_quiz(CreateQuizRequest {
                titulo: "Geografía".to_string(),
                curso: "EEAU".to_string(),
                preguntas: vec![CreatePreguntaRequest {
                    texto: "¿Capital de Francia?".to_string(),
                    respuestas_aceptadas: vec!["París".to_string()],
                    palabras_clave: vec!["parís".to_string()],
                }],
            })
            .await
            .unwrap();
        let preguntas = quiz_service.list_preguntas(&quiz.id).await.unwrap();
        quiz_service
            .submit_attempt(
                &quiz.id,
                SubmitAttemptRequest {
                    estudiante_id: "est-1".to_string(),
                    respuestas: vec![SubmittedAnswer {
                        pregunta_id: preguntas[0].id.clone(),
                        texto: texto.to_string(),
                    }],
                },
            )
            .await
            .unwrap()
            .intento_id
    }

    #[actix_rt::test]
    async fn test_worker_procesa_encolados() {
        let pool = test_pool().await;
        let service = GradingService::new(pool.clone(), offline_config());
        let queue = GradingQueue::start(service.clone());

        let a = seed_attempt(&pool, "paris").await;
        let b = seed_attempt(&pool, "londres").await;
        queue.enqueue(&a).unwrap();
        queue.enqueue(&b).unwrap();

        // El worker es asíncrono; esperamos a que termine con un sondeo corto.
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            let restantes: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM intentos WHERE estado IN ('pendiente', 'calificando')",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
            if restantes == 0 {
                break;
            }
        }

        let estado_a: String = sqlx::query_scalar("SELECT estado FROM intentos WHERE id = ?1")
            .bind(&a)
            .fetch_one(&pool)
            .await
            .unwrap();
        let (estado_b, puntaje_b): (String, Option<f64>) =
            sqlx::query_as("SELECT estado, puntaje FROM intentos WHERE id = ?1")
                .bind(&b)
                .fetch_one(&pool)
                .await
                .unwrap();

        assert_eq!(estado_a, "calificado");
        assert_eq!(estado_b, "calificado");
        assert_eq!(puntaje_b, Some(0.0)); // "londres": exacta no, 0 palabras clave
    }

    #[actix_rt::test]
    async fn test_recuperacion_de_intentos_pendientes() {
        let pool = test_pool().await;
        let service = GradingService::new(pool.clone(), offline_config());

        let a = seed_attempt(&pool, "paris").await;
        // Simula un intento que quedó a medias en un arranque anterior
        service
            .set_attempt_status(&a, "calificando", None)
            .await
            .unwrap();

        let pendientes = service.list_unfinished_attempts().await.unwrap();
        assert_eq!(pendientes, vec![a]);
    }
}
