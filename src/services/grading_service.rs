//! services/grading_service.rs
//! Calificación híbrida de respuestas cortas: cascada de tres niveles
//! (coincidencia exacta -> palabras clave -> LLM), persistencia del
//! veredicto con método y confianza, y recálculo del puntaje del intento.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use reqwest::Client;
use sqlx::{Pool, Sqlite};

use crate::config::grading_config::GradingConfig;
use crate::models::grading_model::{GradingMethod, GradingVerdict, LlmVerdict, RespuestaRecord};

#[derive(Clone)]
pub struct GradingService {
    db_pool: Pool<Sqlite>,
    config: GradingConfig,
    http_client: Client,
}

// ============================================================
// Niveles 1 y 2: funciones puras sobre texto normalizado
// ============================================================

/// Normaliza texto para comparar: minúsculas, sin acentos ni signos,
/// espacios colapsados.
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.to_lowercase().chars() {
        let mapped = match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        };
        if mapped.is_alphanumeric() {
            out.push(mapped);
        } else if !out.ends_with(' ') && !out.is_empty() {
            out.push(' ');
        }
    }
    out.trim().to_string()
}

/// Nivel 1: ¿la respuesta coincide exactamente (normalizada) con alguna
/// de las aceptadas?
pub fn exact_match(respuesta: &str, aceptadas: &[String]) -> bool {
    let norm = normalize_text(respuesta);
    if norm.is_empty() {
        return false;
    }
    aceptadas.iter().any(|a| normalize_text(a) == norm)
}

/// Nivel 2: proporción de palabras clave presentes en la respuesta.
/// Devuelve None si la pregunta no tiene palabras clave (se salta al LLM).
/// Las palabras clave multi-término cuentan si aparecen como secuencia
/// completa de tokens.
pub fn keyword_ratio(respuesta: &str, palabras: &[String]) -> Option<f64> {
    if palabras.is_empty() {
        return None;
    }
    let haystack = format!(" {} ", normalize_text(respuesta));
    let found = palabras
        .iter()
        .filter(|kw| {
            let kw_norm = normalize_text(kw);
            !kw_norm.is_empty() && haystack.contains(&format!(" {} ", kw_norm))
        })
        .count();
    Some(found as f64 / palabras.len() as f64)
}

/// Interpreta el contenido devuelto por el LLM. Acepta JSON estricto,
/// con o sin fence de código; cualquier otra cosa es None (revisión).
pub fn parse_llm_verdict(content: &str) -> Option<LlmVerdict> {
    let mut body = content.trim();
    if let Some(stripped) = body.strip_prefix("```json") {
        body = stripped;
    } else if let Some(stripped) = body.strip_prefix("```") {
        body = stripped;
    }
    if let Some(stripped) = body.strip_suffix("```") {
        body = stripped;
    }
    let verdict: LlmVerdict = serde_json::from_str(body.trim()).ok()?;
    if !verdict.confianza.is_finite() {
        return None;
    }
    Some(LlmVerdict {
        correcta: verdict.correcta,
        confianza: verdict.confianza.clamp(0.0, 1.0),
    })
}

impl GradingService {
    pub fn new(db_pool: Pool<Sqlite>, config: GradingConfig) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.llm_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        GradingService {
            db_pool,
            config,
            http_client,
        }
    }

    // ============================================================
    // Cascada por respuesta
    // ============================================================

    /// Corre los niveles 1 y 2 de la cascada; si no son concluyentes
    /// devuelve `Ambiguous` para que el llamador consulte al LLM.
    pub fn grade_offline(
        &self,
        respuesta: &str,
        aceptadas: &[String],
        palabras: &[String],
    ) -> GradingVerdict {
        if exact_match(respuesta, aceptadas) {
            return GradingVerdict::Decided {
                correcta: true,
                confianza: 1.0,
                metodo: GradingMethod::Exacta,
            };
        }

        match keyword_ratio(respuesta, palabras) {
            Some(ratio) if ratio >= self.config.keyword_accept_threshold => {
                GradingVerdict::Decided {
                    correcta: true,
                    confianza: ratio,
                    metodo: GradingMethod::PalabrasClave,
                }
            }
            Some(ratio) if ratio <= self.config.keyword_reject_threshold => {
                GradingVerdict::Decided {
                    correcta: false,
                    confianza: 1.0 - ratio,
                    metodo: GradingMethod::PalabrasClave,
                }
            }
            Some(ratio) => GradingVerdict::Ambiguous {
                keyword_ratio: ratio,
            },
            // Sin palabras clave la pregunta va directo al LLM
            None => GradingVerdict::Ambiguous { keyword_ratio: 0.0 },
        }
    }

    /// Cascada completa para una respuesta. Sólo llega al LLM cuando los
    /// niveles offline no deciden.
    pub async fn grade_answer(
        &self,
        pregunta: &str,
        respuesta: &str,
        aceptadas: &[String],
        palabras: &[String],
    ) -> GradingVerdict {
        match self.grade_offline(respuesta, aceptadas, palabras) {
            GradingVerdict::Decided {
                correcta,
                confianza,
                metodo,
            } => GradingVerdict::Decided {
                correcta,
                confianza,
                metodo,
            },
            _ => match self.grade_with_llm(pregunta, respuesta, aceptadas).await {
                Ok(verdict) => GradingVerdict::Decided {
                    correcta: verdict.correcta,
                    confianza: verdict.confianza,
                    metodo: GradingMethod::Llm,
                },
                Err(e) => {
                    log::warn!("LLM no concluyente, respuesta a revisión manual: {:?}", e);
                    GradingVerdict::NeedsReview
                }
            },
        }
    }

    /// Nivel 3: una llamada chat-completions pidiendo veredicto JSON
    /// estricto, con reintentos acotados.
    async fn grade_with_llm(
        &self,
        pregunta: &str,
        respuesta: &str,
        aceptadas: &[String],
    ) -> Result<LlmVerdict> {
        let system = "Eres un calificador de respuestas cortas. Responde ÚNICAMENTE \
                      con JSON de la forma {\"correcta\": true|false, \"confianza\": 0.0-1.0}.";
        let user = format!(
            "Pregunta: {}\nRespuestas aceptadas: {}\nRespuesta del estudiante: {}\n\
             ¿La respuesta del estudiante es equivalente a alguna aceptada?",
            pregunta,
            aceptadas.join(" | "),
            respuesta
        );

        let payload = serde_json::json!({
            "model": self.config.llm_model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        let mut last_err = anyhow!("sin intentos");
        for intento in 0..=self.config.llm_max_retries {
            if intento > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(500 * intento as u64)).await;
            }
            match self.post_completion(&payload).await {
                Ok(content) => {
                    return parse_llm_verdict(&content)
                        .ok_or_else(|| anyhow!("Veredicto LLM no interpretable: {}", content));
                }
                Err(e) => {
                    log::warn!("Llamada LLM falló (intento {}): {:?}", intento + 1, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    async fn post_completion(&self, payload: &serde_json::Value) -> Result<String> {
        let resp = self
            .http_client
            .post(&self.config.llm_api_url)
            .bearer_auth(&self.config.llm_api_key)
            .json(payload)
            .send()
            .await
            .context("No se pudo contactar el endpoint LLM")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("LLM respondió {}: {}", status, body));
        }

        let json: serde_json::Value = resp.json().await.context("Respuesta LLM no es JSON")?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Respuesta LLM sin choices[0].message.content"))
    }

    // ============================================================
    // Persistencia y agregados
    // ============================================================

    /// Califica todas las respuestas pendientes de un intento y recalcula
    /// su puntaje. Es el cuerpo que ejecuta el worker de la cola.
    pub async fn grade_attempt(&self, intento_id: &str) -> Result<()> {
        self.set_attempt_status(intento_id, "calificando", None)
            .await?;

        // Respuestas pendientes junto con la clave de su pregunta
        let rows = sqlx::query_as::<_, (String, String, String, String, String)>(
            r#"
            SELECT r.id, r.texto, p.texto, p.respuestas_aceptadas, p.palabras_clave
            FROM respuestas r
            JOIN preguntas p ON p.id = r.pregunta_id
            WHERE r.intento_id = ?1 AND r.estado = 'pendiente'
            ORDER BY p.orden ASC
            "#,
        )
        .bind(intento_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al leer respuestas pendientes")?;

        log::info!(
            "Calificando intento {}: {} respuestas pendientes",
            intento_id,
            rows.len()
        );

        for (respuesta_id, texto, pregunta_texto, aceptadas_json, palabras_json) in rows {
            let aceptadas: Vec<String> = serde_json::from_str(&aceptadas_json)
                .context("Columna respuestas_aceptadas no es JSON válido")?;
            let palabras: Vec<String> = serde_json::from_str(&palabras_json)
                .context("Columna palabras_clave no es JSON válido")?;

            let verdict = self
                .grade_answer(&pregunta_texto, &texto, &aceptadas, &palabras)
                .await;
            self.persist_verdict(&respuesta_id, &verdict).await?;
        }

        self.recompute_attempt_score(intento_id).await
    }

    async fn persist_verdict(&self, respuesta_id: &str, verdict: &GradingVerdict) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        match verdict {
            GradingVerdict::Decided {
                correcta,
                confianza,
                metodo,
            } => {
                sqlx::query(
                    r#"
                    UPDATE respuestas
                    SET es_correcta = ?2, confianza = ?3, metodo = ?4,
                        estado = 'calificada', calificada_en = ?5
                    WHERE id = ?1
                    "#,
                )
                .bind(respuesta_id)
                .bind(*correcta)
                .bind(*confianza)
                .bind(metodo.as_str())
                .bind(&now)
                .execute(&self.db_pool)
                .await
                .context("Fallo al guardar veredicto")?;
            }
            // Ambiguous nunca se persiste: o se decide con el LLM o queda
            // en revisión.
            GradingVerdict::Ambiguous { .. } | GradingVerdict::NeedsReview => {
                sqlx::query(
                    r#"
                    UPDATE respuestas
                    SET es_correcta = NULL, confianza = NULL, metodo = NULL,
                        estado = 'revision', calificada_en = ?2
                    WHERE id = ?1
                    "#,
                )
                .bind(respuesta_id)
                .bind(&now)
                .execute(&self.db_pool)
                .await
                .context("Fallo al marcar revisión")?;
            }
        }
        Ok(())
    }

    /// Recalcula el puntaje del intento a partir de sus respuestas:
    /// porcentaje de correctas sobre el total. El intento queda
    /// 'calificado' sólo si ninguna respuesta está en revisión.
    pub async fn recompute_attempt_score(&self, intento_id: &str) -> Result<()> {
        let (total, correctas, pendientes, revision): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN es_correcta = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN estado = 'pendiente' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN estado = 'revision' THEN 1 ELSE 0 END), 0)
            FROM respuestas
            WHERE intento_id = ?1
            "#,
        )
        .bind(intento_id)
        .fetch_one(&self.db_pool)
        .await
        .context("Fallo al agregar respuestas del intento")?;

        if total == 0 {
            return Err(anyhow!("El intento {} no tiene respuestas", intento_id));
        }

        let puntaje = 100.0 * correctas as f64 / total as f64;
        let estado = if pendientes > 0 {
            "calificando"
        } else if revision > 0 {
            "revision"
        } else {
            "calificado"
        };

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE intentos
            SET estado = ?2, puntaje = ?3, error_message = NULL, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(intento_id)
        .bind(estado)
        .bind(puntaje)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar puntaje del intento")?;

        log::info!(
            "Intento {} -> estado {}, puntaje {:.1} ({} de {} correctas, {} en revisión)",
            intento_id,
            estado,
            puntaje,
            correctas,
            total,
            revision
        );

        Ok(())
    }

    /// Override manual del admin: fija el veredicto con confianza 1.0 y
    /// recalcula el puntaje del intento (puede sacar al intento de
    /// 'revision').
    pub async fn manual_grade(&self, respuesta_id: &str, es_correcta: bool) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        let intento_id: String =
            sqlx::query_scalar("SELECT intento_id FROM respuestas WHERE id = ?1")
                .bind(respuesta_id)
                .fetch_one(&self.db_pool)
                .await
                .context("No se encontró respuesta con ese id")?;

        sqlx::query(
            r#"
            UPDATE respuestas
            SET es_correcta = ?2, confianza = 1.0, metodo = 'manual',
                estado = 'calificada', calificada_en = ?3
            WHERE id = ?1
            "#,
        )
        .bind(respuesta_id)
        .bind(es_correcta)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al aplicar calificación manual")?;

        self.recompute_attempt_score(&intento_id).await
    }

    /// Prepara un intento para recalificarse: las respuestas calificadas a
    /// máquina vuelven a 'pendiente'; las decisiones manuales se respetan.
    /// Devuelve cuántas respuestas se reiniciaron.
    pub async fn reset_for_regrade(&self, intento_id: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE respuestas
            SET es_correcta = NULL, confianza = NULL, metodo = NULL,
                estado = 'pendiente', calificada_en = NULL
            WHERE intento_id = ?1 AND (metodo IS NULL OR metodo != 'manual')
            "#,
        )
        .bind(intento_id)
        .execute(&self.db_pool)
        .await
        .context("Fallo al reiniciar respuestas")?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE intentos
            SET estado = 'pendiente', puntaje = NULL, error_message = NULL, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(intento_id)
        .bind(&now)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn set_attempt_status(
        &self,
        intento_id: &str,
        estado: &str,
        error: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE intentos
            SET estado = ?2, error_message = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(intento_id)
        .bind(estado)
        .bind(error)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar estado del intento")?;
        Ok(())
    }

    /// Intentos que quedaron a medias (p. ej. por un reinicio del servidor);
    /// al arrancar se vuelven a encolar.
    pub async fn list_unfinished_attempts(&self) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM intentos
            WHERE estado IN ('pendiente', 'calificando')
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al buscar intentos sin calificar")?;
        Ok(ids)
    }

    pub async fn list_attempt_answers(&self, intento_id: &str) -> Result<Vec<RespuestaRecord>> {
        let rows = sqlx::query_as::<_, RespuestaRecord>(
            r#"
            SELECT r.id, r.intento_id, r.pregunta_id, r.texto,
                   r.es_correcta, r.confianza, r.metodo, r.estado, r.calificada_en
            FROM respuestas r
            JOIN preguntas p ON p.id = r.pregunta_id
            WHERE r.intento_id = ?1
            ORDER BY p.orden ASC
            "#,
        )
        .bind(intento_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(rows)
    }
}
