//! services/income_service.rs
//! Registro y consulta de ingresos (pagos), con resumen mensual.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::income_model::{
    CreateIngresoRequest, CreateIngresoResponse, IngresoRecord, ListIngresosResponse,
    MonthlySummaryResponse, MonthlySummaryRow,
};

#[derive(Clone, Debug)]
pub struct IncomeService {
    db_pool: Pool<Sqlite>,
}

impl IncomeService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        IncomeService { db_pool }
    }

    pub async fn create_ingreso(&self, req: CreateIngresoRequest) -> Result<CreateIngresoResponse> {
        if req.monto <= 0.0 {
            return Err(anyhow!("El monto debe ser mayor a cero"));
        }
        // La fecha se guarda como YYYY-MM-DD; validamos el formato aquí
        // porque el resumen mensual filtra con LIKE sobre ese prefijo.
        if chrono::NaiveDate::parse_from_str(&req.fecha, "%Y-%m-%d").is_err() {
            return Err(anyhow!("Fecha inválida, se espera YYYY-MM-DD"));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO ingresos (
                id, estudiante_id, concepto, monto, metodo,
                evento_id, fecha, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(&req.estudiante_id)
        .bind(&req.concepto)
        .bind(req.monto)
        .bind(&req.metodo)
        .bind(&req.evento_id)
        .bind(&req.fecha)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar ingreso")?;

        Ok(CreateIngresoResponse {
            id,
            message: "Ingreso registrado".to_string(),
        })
    }

    pub async fn get_ingreso(&self, ingreso_id: &str) -> Result<IngresoRecord> {
        let record = sqlx::query_as::<_, IngresoRecord>(
            r#"
            SELECT id, estudiante_id, concepto, monto, metodo,
                   evento_id, fecha, created_at
            FROM ingresos
            WHERE id = ?1
            "#,
        )
        .bind(ingreso_id)
        .fetch_one(&self.db_pool)
        .await
        .context("No se encontró ingreso con ese id")?;

        Ok(record)
    }

    /// Lista ingresos con paginación, del más reciente al más antiguo.
    pub async fn list_ingresos(&self, page: u64, page_size: u64) -> Result<ListIngresosResponse> {
        let offset = (page.saturating_sub(1)) * page_size;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingresos")
            .fetch_one(&self.db_pool)
            .await?;

        let items = sqlx::query_as::<_, IngresoRecord>(
            r#"
            SELECT id, estudiante_id, concepto, monto, metodo,
                   evento_id, fecha, created_at
            FROM ingresos
            ORDER BY fecha DESC, created_at DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(page_size as i64)
        .bind(offset as i64)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(ListIngresosResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }

    /// Resumen de un mes ("YYYY-MM"): conteo y total agrupados por método.
    pub async fn monthly_summary(&self, mes: &str) -> Result<MonthlySummaryResponse> {
        if mes.len() != 7 || mes.as_bytes()[4] != b'-' {
            return Err(anyhow!("Mes inválido, se espera YYYY-MM"));
        }
        let prefix = format!("{}-%", mes);

        let por_metodo = sqlx::query_as::<_, MonthlySummaryRow>(
            r#"
            SELECT metodo, COUNT(*) AS cantidad, SUM(monto) AS total
            FROM ingresos
            WHERE fecha LIKE ?1
            GROUP BY metodo
            ORDER BY total DESC
            "#,
        )
        .bind(&prefix)
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al calcular resumen mensual")?;

        let total_general = por_metodo.iter().map(|r| r.total).sum();

        Ok(MonthlySummaryResponse {
            mes: mes.to_string(),
            total_general,
            por_metodo,
        })
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

    fn pago(concepto: &str, monto: f64, metodo: &str, fecha: &str) -> CreateIngresoRequest {
        CreateIngresoRequest {
            estudiante_id: None,
            concepto: concepto.to_string(),
            monto,
            metodo: metodo.to_string(),
            evento_id: None,
            fecha: fecha.to_string(),
        }
    }

    #[actix_rt::test]
    async fn test_monto_invalido() {
        let pool = test_pool().await;
        let service = IncomeService::new(pool);
        assert!(service
            .create_ingreso(pago("colegiatura", 0.0, "efectivo", "2026-08-01"))
            .await
            .is_err());
        assert!(service
            .create_ingreso(pago("colegiatura", 100.0, "efectivo", "01/08/2026"))
            .await
            .is_err());
    }

    #[actix_rt::test]
    async fn test_resumen_mensual() {
        let pool = test_pool().await;
        let service = IncomeService::new(pool);

        service
            .create_ingreso(pago("colegiatura", 1500.0, "efectivo", "2026-08-03"))
            .await
            .unwrap();
        service
            .create_ingreso(pago("inscripción", 500.0, "transferencia", "2026-08-15"))
            .await
            .unwrap();
        service
            .create_ingreso(pago("colegiatura", 1500.0, "transferencia", "2026-08-20"))
            .await
            .unwrap();
        // Fuera del mes consultado
        service
            .create_ingreso(pago("colegiatura", 1500.0, "efectivo", "2026-07-30"))
            .await
            .unwrap();

        let resumen = service.monthly_summary("2026-08").await.unwrap();
        assert_eq!(resumen.total_general, 3500.0);
        assert_eq!(resumen.por_metodo.len(), 2);
        assert_eq!(resumen.por_metodo[0].metodo, "transferencia");
        assert_eq!(resumen.por_metodo[0].cantidad, 2);
        assert_eq!(resumen.por_metodo[0].total, 2000.0);
    }

    #[actix_rt::test]
    async fn test_liga_a_evento() {
        let pool = test_pool().await;
        let service = IncomeService::new(pool);

        let mut req = pago("taller", 250.0, "tarjeta", "2026-08-10");
        req.evento_id = Some("evt-123".to_string());
        let created = service.create_ingreso(req).await.unwrap();

        let fetched = service.get_ingreso(&created.id).await.unwrap();
        assert_eq!(fetched.evento_id.as_deref(), Some("evt-123"));
    }
}
