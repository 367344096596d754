//! services/email_service.rs
//! Correo saliente por Gmail: cache del access token OAuth2 (se renueva
//! con el refresh token sólo cuando expira), envío SMTP con XOAUTH2 y
//! registro del estado de cada correo.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use lettre::{
    message::{
        header::{ContentDisposition, ContentType},
        Body, Mailbox, MultiPart, SinglePart,
    },
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use reqwest::Client;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::email_model::{EmailStatusResponse, SendEmailRequest};

/// Margen antes de la expiración real para no usar un token a punto de morir.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Cuenta remitente ("Academia <cuenta@gmail.com>" usa este user).
    pub sender: String,
    pub sender_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub token_url: String,
}

impl GmailConfig {
    pub fn from_env() -> Result<Self> {
        Ok(GmailConfig {
            smtp_host: std::env::var("GMAIL_SMTP_HOST")
                .unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_port: std::env::var("GMAIL_SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            sender: std::env::var("GMAIL_SENDER").context("Falta GMAIL_SENDER")?,
            sender_name: std::env::var("GMAIL_SENDER_NAME")
                .unwrap_or_else(|_| "MQerKAcademy".to_string()),
            client_id: std::env::var("GMAIL_CLIENT_ID").context("Falta GMAIL_CLIENT_ID")?,
            client_secret: std::env::var("GMAIL_CLIENT_SECRET")
                .context("Falta GMAIL_CLIENT_SECRET")?,
            refresh_token: std::env::var("GMAIL_REFRESH_TOKEN")
                .context("Falta GMAIL_REFRESH_TOKEN")?,
            token_url: std::env::var("GMAIL_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
        })
    }

    /// Config vacía para arrancar sin credenciales (entorno local);
    /// los envíos fallan y quedan registrados como 'fallido'.
    pub fn disabled() -> Self {
        GmailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: "sin-configurar@localhost".to_string(),
            sender_name: "MQerKAcademy".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Un token cacheado sirve mientras le quede más que el margen de
    /// seguridad.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
pub struct EmailService {
    db_pool: Pool<Sqlite>,
    config: GmailConfig,
    http_client: Client,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl EmailService {
    pub fn new(db_pool: Pool<Sqlite>, config: GmailConfig) -> Self {
        EmailService {
            db_pool,
            config,
            http_client: Client::new(),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    // ============================================================
    // Cache del access token
    // ============================================================

    /// Devuelve un access token vigente, renovándolo contra el endpoint de
    /// Google sólo si el cacheado falta o está por expirar.
    pub async fn get_access_token(&self) -> Result<String> {
        {
            let guard = self.token_cache.read().await;
            if let Some(token) = guard.as_ref() {
                if token.is_valid_at(Utc::now()) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut guard = self.token_cache.write().await;
        // Otro task pudo renovarlo mientras esperábamos el write lock
        if let Some(token) = guard.as_ref() {
            if token.is_valid_at(Utc::now()) {
                return Ok(token.access_token.clone());
            }
        }

        log::info!("Renovando access token de Gmail");
        let refreshed = self.refresh_access_token().await?;
        let access_token = refreshed.access_token.clone();
        *guard = Some(refreshed);
        Ok(access_token)
    }

    async fn refresh_access_token(&self) -> Result<CachedToken> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", self.config.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let resp = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .context("No se pudo contactar el endpoint de tokens de Google")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Refresh de token falló con {}: {}", status, body));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .context("Respuesta del endpoint de tokens no es JSON válido")?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

    // ============================================================
    // Envío
    // ============================================================

    /// Registra el correo y lo envía, en línea o en un task aparte según
    /// `async_send`. Devuelve el id del registro.
    pub async fn send_email(&self, req: SendEmailRequest) -> Result<String> {
        if req.recipients.is_empty() {
            return Err(anyhow!("Se necesita al menos un destinatario"));
        }

        let correo_id = self.insert_email_record(&req).await?;

        if req.async_send {
            let service = self.clone();
            let id = correo_id.clone();
            tokio::spawn(async move {
                match service.handle_send(&id, req).await {
                    Ok(_) => log::info!("Correo asíncrono {} enviado", id),
                    Err(e) => log::error!("Fallo el correo asíncrono {}: {:?}", id, e),
                }
            });
            Ok(correo_id)
        } else {
            self.handle_send(&correo_id, req).await?;
            Ok(correo_id)
        }
    }

    pub async fn get_email_status(&self, correo_id: &str) -> Result<EmailStatusResponse> {
        let (estado, error): (String, Option<String>) =
            sqlx::query_as("SELECT estado, error_message FROM correos WHERE id = ?1")
                .bind(correo_id)
                .fetch_one(&self.db_pool)
                .await
                .context("No se encontró correo con ese id")?;

        Ok(EmailStatusResponse {
            id: correo_id.to_string(),
            estado,
            error,
        })
    }

    async fn insert_email_record(&self, req: &SendEmailRequest) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let destinatarios = req.recipients.join(";");

        sqlx::query(
            r#"
            INSERT INTO correos (id, destinatarios, asunto, estado, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'pendiente', ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(&destinatarios)
        .bind(&req.subject)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al registrar correo")?;

        Ok(id)
    }

    async fn handle_send(&self, correo_id: &str, req: SendEmailRequest) -> Result<()> {
        match self.send_via_gmail(&req).await {
            Ok(_) => {
                self.update_email_status(correo_id, "enviado", None).await?;
                Ok(())
            }
            Err(e) => {
                let error = format!("{e:?}");
                self.update_email_status(correo_id, "fallido", Some(&error))
                    .await?;
                Err(anyhow!("Envío de correo falló: {error}"))
            }
        }
    }

    async fn send_via_gmail(&self, req: &SendEmailRequest) -> Result<()> {
        let access_token = self.get_access_token().await?;

        let from: Mailbox = format!("{} <{}>", self.config.sender_name, self.config.sender)
            .parse()
            .context("Remitente inválido")?;

        let tls_params = TlsParameters::new(self.config.smtp_host.clone())?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(self.config.sender.clone(), access_token))
            .authentication(vec![Mechanism::Xoauth2])
            .tls(Tls::Required(tls_params))
            .build();

        // Cuerpo HTML más adjuntos
        let html_part = SinglePart::builder()
            .header(ContentType::parse("text/html; charset=utf-8")?)
            .body(req.body.clone());

        let mut multipart = MultiPart::mixed().singlepart(html_part);
        if let Some(attachments) = &req.attachments {
            for attach in attachments {
                let body = Body::new(attach.data.clone());
                let part = SinglePart::builder()
                    .header(ContentType::parse(attach.content_type.as_str())?)
                    .header(ContentDisposition::attachment(&attach.filename.clone()))
                    .body(body);
                multipart = multipart.singlepart(part);
            }
        }

        // Un mensaje por destinatario
        for recip_str in &req.recipients {
            let to: Mailbox = recip_str.parse().context("Destinatario inválido")?;
            let message = Message::builder()
                .from(from.clone())
                .to(to)
                .subject(&req.subject)
                .multipart(multipart.clone())?;

            tokio::time::timeout(std::time::Duration::from_secs(30), mailer.send(message))
                .await
                .context("Timeout enviando correo")??;
        }

        Ok(())
    }

    async fn update_email_status(
        &self,
        correo_id: &str,
        estado: &str,
        error: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE correos
            SET estado = ?2, error_message = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(correo_id)
        .bind(estado)
        .bind(error)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar estado del correo")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cache_vigencia() {
        let now = Utc::now();
        let fresco = CachedToken {
            access_token: "abc".to_string(),
            expires_at: now + Duration::seconds(3600),
        };
        assert!(fresco.is_valid_at(now));

        // Dentro del margen de seguridad cuenta como expirado
        let al_borde = CachedToken {
            access_token: "abc".to_string(),
            expires_at: now + Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS - 1),
        };
        assert!(!al_borde.is_valid_at(now));

        let vencido = CachedToken {
            access_token: "abc".to_string(),
            expires_at: now - Duration::seconds(10),
        };
        assert!(!vencido.is_valid_at(now));
    }

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

    fn config_dummy() -> GmailConfig {
        GmailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: "academia@example.com".to_string(),
            sender_name: "Academia".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            // Endpoint inalcanzable: los tests no deben salir a la red
            token_url: "http://127.0.0.1:9/token".to_string(),
        }
    }

    #[actix_rt::test]
    async fn test_registro_y_estado_de_correo() {
        let pool = test_pool().await;
        let service = EmailService::new(pool, config_dummy());

        let req = SendEmailRequest {
            recipients: vec!["padre@example.com".to_string()],
            subject: "Resultados del quiz".to_string(),
            body: "<p>Hola</p>".to_string(),
            async_send: false,
            attachments: None,
        };

        // El token no se puede renovar (endpoint inalcanzable), así que el
        // envío síncrono falla y el correo queda registrado como fallido.
        let correo_id = service.insert_email_record(&req).await.unwrap();
        let result = service.handle_send(&correo_id, req).await;
        assert!(result.is_err());

        let status = service.get_email_status(&correo_id).await.unwrap();
        assert_eq!(status.estado, "fallido");
        assert!(status.error.is_some());
    }

    #[actix_rt::test]
    async fn test_sin_destinatarios_rechazado() {
        let pool = test_pool().await;
        let service = EmailService::new(pool, config_dummy());

        let req = SendEmailRequest {
            recipients: vec![],
            subject: "x".to_string(),
            body: "y".to_string(),
            async_send: false,
            attachments: None,
        };
        assert!(service.send_email(req).await.is_err());
    }
}
