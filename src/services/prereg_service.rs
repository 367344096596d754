//! services/prereg_service.rs
//! Preregistros de asesores: alta, listado y decisión del admin.
//! Aprobar promueve al solicitante a asesor activo en la misma transacción.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::prereg_model::{
    ApprovePreregistroResponse, CreatePreregistroRequest, PreregistroRecord,
};

#[derive(Clone, Debug)]
pub struct PreregService {
    db_pool: Pool<Sqlite>,
}

impl PreregService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        PreregService { db_pool }
    }

    pub async fn create_preregistro(&self, req: CreatePreregistroRequest) -> Result<String> {
        if req.nombre.trim().is_empty() || req.email.trim().is_empty() {
            return Err(anyhow!("nombre y email son obligatorios"));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO preregistros (
                id, nombre, email, telefono, especialidad,
                estado, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 'pendiente', ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(&req.nombre)
        .bind(&req.email)
        .bind(&req.telefono)
        .bind(&req.especialidad)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar preregistro")?;

        Ok(id)
    }

    pub async fn list_pending(&self) -> Result<Vec<PreregistroRecord>> {
        let rows = sqlx::query_as::<_, PreregistroRecord>(
            r#"
            SELECT id, nombre, email, telefono, especialidad,
                   estado, decidido_por, created_at, updated_at
            FROM preregistros
            WHERE estado = 'pendiente'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows)
    }

    /// Aprueba un preregistro pendiente: lo marca 'aprobado' y crea el
    /// registro de asesor, todo en una transacción. Un preregistro ya
    /// decidido no se puede volver a decidir.
    pub async fn approve(
        &self,
        prereg_id: &str,
        decidido_por: &str,
    ) -> Result<ApprovePreregistroResponse> {
        let now = Utc::now().to_rfc3339();
        let asesor_id = Uuid::new_v4().to_string();

        let mut tx = self.db_pool.begin().await?;

        let prereg = sqlx::query_as::<_, PreregistroRecord>(
            r#"
            SELECT id, nombre, email, telefono, especialidad,
                   estado, decidido_por, created_at, updated_at
            FROM preregistros
            WHERE id = ?1
            "#,
        )
        .bind(prereg_id)
        .fetch_one(&mut *tx)
        .await
        .context("No se encontró preregistro con ese id")?;

        if prereg.estado != "pendiente" {
            return Err(anyhow!(
                "El preregistro ya fue decidido (estado actual: {})",
                prereg.estado
            ));
        }

        sqlx::query(
            r#"
            UPDATE preregistros
            SET estado = 'aprobado', decidido_por = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(prereg_id)
        .bind(decidido_por)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Fallo al aprobar preregistro")?;

        sqlx::query(
            r#"
            INSERT INTO asesores (
                id, preregistro_id, nombre, email, especialidad, activo, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
        )
        .bind(&asesor_id)
        .bind(prereg_id)
        .bind(&prereg.nombre)
        .bind(&prereg.email)
        .bind(&prereg.especialidad)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Fallo al crear asesor")?;

        tx.commit().await?;

        log::info!(
            "Preregistro {} aprobado por {}; asesor {} creado",
            prereg_id,
            decidido_por,
            asesor_id
        );

        Ok(ApprovePreregistroResponse {
            preregistro_id: prereg_id.to_string(),
            asesor_id,
            message: "Preregistro aprobado".to_string(),
        })
    }

    /// Rechaza un preregistro pendiente.
    pub async fn reject(&self, prereg_id: &str, decidido_por: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE preregistros
            SET estado = 'rechazado', decidido_por = ?2, updated_at = ?3
            WHERE id = ?1 AND estado = 'pendiente'
            "#,
        )
        .bind(prereg_id)
        .bind(decidido_por)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al rechazar preregistro")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("El preregistro no existe o ya fue decidido"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn solicitud(nombre: &str) -> CreatePreregistroRequest {
        CreatePreregistroRequest {
            nombre: nombre.to_string(),
            email: format!("{}@example.com", nombre),
            telefono: None,
            especialidad: Some("matemáticas".to_string()),
        }
    }

    #[actix_rt::test]
    async fn test_aprobar_crea_asesor() {
        let pool = test_pool().await;
        let service = PreregService::new(pool.clone());

        let id = service.create_preregistro(solicitud("laura")).await.unwrap();
        let resp = service.approve(&id, "admin-1").await.unwrap();

        // El asesor quedó registrado y ligado al preregistro
        let asesor: crate::models::prereg_model::AsesorRecord = sqlx::query_as(
            "SELECT id, preregistro_id, nombre, email, especialidad, activo, created_at \
             FROM asesores WHERE id = ?1",
        )
        .bind(&resp.asesor_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(asesor.preregistro_id.as_deref(), Some(id.as_str()));
        assert_eq!(asesor.nombre, "laura");
        assert!(asesor.activo);

        // Ya no aparece como pendiente
        assert!(service.list_pending().await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_doble_decision_rechazada() {
        let pool = test_pool().await;
        let service = PreregService::new(pool);

        let id = service.create_preregistro(solicitud("marco")).await.unwrap();
        service.approve(&id, "admin-1").await.unwrap();

        assert!(service.approve(&id, "admin-2").await.is_err());
        assert!(service.reject(&id, "admin-2").await.is_err());
    }

    #[actix_rt::test]
    async fn test_rechazo() {
        let pool = test_pool().await;
        let service = PreregService::new(pool);

        let id = service.create_preregistro(solicitud("nora")).await.unwrap();
        service.reject(&id, "admin-1").await.unwrap();
        assert!(service.list_pending().await.unwrap().is_empty());
    }
}
