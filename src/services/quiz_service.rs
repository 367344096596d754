//! services/quiz_service.rs
//! Quizzes, preguntas con clave de respuesta (columnas JSON) y envío de
//! intentos. El encolado a calificación lo hace el handler.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::quiz_model::{
    CreateQuizRequest, CreateQuizResponse, IntentoRecord, PreguntaRecord, QuizRecord,
    SubmitAttemptRequest, SubmitAttemptResponse,
};

#[derive(Clone, Debug)]
pub struct QuizService {
    db_pool: Pool<Sqlite>,
}

impl QuizService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        QuizService { db_pool }
    }

    /// Crea el quiz y sus preguntas en una transacción. La clave de cada
    /// pregunta (respuestas aceptadas y palabras clave) se guarda como JSON.
    pub async fn create_quiz(&self, req: CreateQuizRequest) -> Result<CreateQuizResponse> {
        if req.preguntas.is_empty() {
            return Err(anyhow!("El quiz necesita al menos una pregunta"));
        }
        for (i, p) in req.preguntas.iter().enumerate() {
            if p.respuestas_aceptadas.is_empty() {
                return Err(anyhow!(
                    "La pregunta {} no tiene respuestas aceptadas",
                    i + 1
                ));
            }
        }

        let quiz_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.db_pool.begin().await?;

        sqlx::query("INSERT INTO quizzes (id, titulo, curso, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&quiz_id)
            .bind(&req.titulo)
            .bind(&req.curso)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .context("Fallo al insertar quiz")?;

        let total = req.preguntas.len();
        for (orden, p) in req.preguntas.into_iter().enumerate() {
            let pregunta_id = Uuid::new_v4().to_string();
            let aceptadas_json = serde_json::to_string(&p.respuestas_aceptadas)?;
            let palabras_json = serde_json::to_string(&p.palabras_clave)?;

            sqlx::query(
                r#"
                INSERT INTO preguntas (
                    id, quiz_id, orden, texto, respuestas_aceptadas, palabras_clave
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&pregunta_id)
            .bind(&quiz_id)
            .bind(orden as i64)
            .bind(&p.texto)
            .bind(&aceptadas_json)
            .bind(&palabras_json)
            .execute(&mut *tx)
            .await
            .context("Fallo al insertar pregunta")?;
        }

        tx.commit().await?;

        Ok(CreateQuizResponse {
            id: quiz_id,
            preguntas: total,
            message: "Quiz creado".to_string(),
        })
    }

    pub async fn get_quiz(&self, quiz_id: &str) -> Result<QuizRecord> {
        let record = sqlx::query_as::<_, QuizRecord>(
            "SELECT id, titulo, curso, created_at FROM quizzes WHERE id = ?1",
        )
        .bind(quiz_id)
        .fetch_one(&self.db_pool)
        .await
        .context("No se encontró quiz con ese id")?;
        Ok(record)
    }

    /// Preguntas del quiz en orden, con su clave deserializada.
    pub async fn list_preguntas(&self, quiz_id: &str) -> Result<Vec<PreguntaRecord>> {
        let rows = sqlx::query_as::<_, (String, String, i64, String, String, String)>(
            r#"
            SELECT id, quiz_id, orden, texto, respuestas_aceptadas, palabras_clave
            FROM preguntas
            WHERE quiz_id = ?1
            ORDER BY orden ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.db_pool)
        .await?;

        let mut preguntas = Vec::with_capacity(rows.len());
        for (id, quiz_id, orden, texto, aceptadas_json, palabras_json) in rows {
            preguntas.push(PreguntaRecord {
                id,
                quiz_id,
                orden,
                texto,
                respuestas_aceptadas: serde_json::from_str(&aceptadas_json)
                    .context("Columna respuestas_aceptadas no es JSON válido")?,
                palabras_clave: serde_json::from_str(&palabras_json)
                    .context("Columna palabras_clave no es JSON válido")?,
            });
        }
        Ok(preguntas)
    }

    /// Registra el intento y sus respuestas (estado 'pendiente'). Exige
    /// exactamente una respuesta por pregunta del quiz.
    pub async fn submit_attempt(
        &self,
        quiz_id: &str,
        req: SubmitAttemptRequest,
    ) -> Result<SubmitAttemptResponse> {
        let preguntas = self.list_preguntas(quiz_id).await?;
        if preguntas.is_empty() {
            return Err(anyhow!("No se encontró quiz con ese id o no tiene preguntas"));
        }

        let mut por_pregunta = std::collections::HashMap::new();
        for r in &req.respuestas {
            if por_pregunta.insert(r.pregunta_id.as_str(), r).is_some() {
                return Err(anyhow!("Respuesta duplicada para la pregunta {}", r.pregunta_id));
            }
        }
        if por_pregunta.len() != preguntas.len() {
            return Err(anyhow!(
                "Se esperaban {} respuestas, llegaron {}",
                preguntas.len(),
                por_pregunta.len()
            ));
        }

        let intento_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.db_pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO intentos (
                id, quiz_id, estudiante_id, estado, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, 'pendiente', ?4, ?4)
            "#,
        )
        .bind(&intento_id)
        .bind(quiz_id)
        .bind(&req.estudiante_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Fallo al insertar intento")?;

        for pregunta in &preguntas {
            let respuesta = por_pregunta
                .get(pregunta.id.as_str())
                .ok_or_else(|| anyhow!("Falta respuesta para la pregunta {}", pregunta.id))?;

            sqlx::query(
                r#"
                INSERT INTO respuestas (id, intento_id, pregunta_id, texto, estado)
                VALUES (?1, ?2, ?3, ?4, 'pendiente')
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&intento_id)
            .bind(&pregunta.id)
            .bind(&respuesta.texto)
            .execute(&mut *tx)
            .await
            .context("Fallo al insertar respuesta")?;
        }

        tx.commit().await?;

        log::info!(
            "Intento {} registrado para quiz {} ({} respuestas)",
            intento_id,
            quiz_id,
            preguntas.len()
        );

        Ok(SubmitAttemptResponse {
            intento_id,
            estado: "pendiente".to_string(),
            message: "Intento registrado, calificación en proceso".to_string(),
        })
    }

    pub async fn get_attempt(&self, intento_id: &str) -> Result<IntentoRecord> {
        let record = sqlx::query_as::<_, IntentoRecord>(
            r#"
            SELECT id, quiz_id, estudiante_id, estado, puntaje,
                   error_message, created_at, updated_at
            FROM intentos
            WHERE id = ?1
            "#,
        )
        .bind(intento_id)
        .fetch_one(&self.db_pool)
        .await
        .context("No se encontró intento con ese id")?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz_model::{CreatePreguntaRequest, SubmittedAnswer};

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

    fn quiz_simple() -> CreateQuizRequest {
        CreateQuizRequest {
            titulo: "Historia".to_string(),
            curso: "EEAU".to_string(),
            preguntas: vec![CreatePreguntaRequest {
                texto: "¿Año de la independencia?".to_string(),
                respuestas_aceptadas: vec!["1810".to_string()],
                palabras_clave: vec![],
            }],
        }
    }

    #[actix_rt::test]
    async fn test_crear_quiz_y_leer_preguntas() {
        let pool = test_pool().await;
        let service = QuizService::new(pool);

        let created = service.create_quiz(quiz_simple()).await.unwrap();
        assert_eq!(created.preguntas, 1);

        let preguntas = service.list_preguntas(&created.id).await.unwrap();
        assert_eq!(preguntas.len(), 1);
        assert_eq!(preguntas[0].respuestas_aceptadas, vec!["1810"]);
        assert!(preguntas[0].palabras_clave.is_empty());
    }

    #[actix_rt::test]
    async fn test_quiz_sin_preguntas_rechazado() {
        let pool = test_pool().await;
        let service = QuizService::new(pool);

        let mut req = quiz_simple();
        req.preguntas.clear();
        assert!(service.create_quiz(req).await.is_err());
    }

    #[actix_rt::test]
    async fn test_submit_exige_todas_las_respuestas() {
        let pool = test_pool().await;
        let service = QuizService::new(pool);

        let created = service.create_quiz(quiz_simple()).await.unwrap();

        // Sin respuestas
        let vacio = service
            .submit_attempt(
                &created.id,
                SubmitAttemptRequest {
                    estudiante_id: "est-1".to_string(),
                    respuestas: vec![],
                },
            )
            .await;
        assert!(vacio.is_err());

        // Completo
        let preguntas = service.list_preguntas(&created.id).await.unwrap();
        let ok = service
            .submit_attempt(
                &created.id,
                SubmitAttemptRequest {
                    estudiante_id: "est-1".to_string(),
                    respuestas: vec![SubmittedAnswer {
                        pregunta_id: preguntas[0].id.clone(),
                        texto: "1810".to_string(),
                    }],
                },
            )
            .await
            .unwrap();

        let intento = service.get_attempt(&ok.intento_id).await.unwrap();
        assert_eq!(intento.estado, "pendiente");
        assert!(intento.puntaje.is_none());
    }
}
