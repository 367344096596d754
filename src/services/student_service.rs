//! services/student_service.rs
//! Alta y consulta de estudiantes, incluyendo la asignación de folios.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::student_model::{
    CreateStudentRequest, CreateStudentResponse, ListStudentsResponse, StudentRecord,
    UpdateStudentRequest,
};

#[derive(Clone, Debug)]
pub struct StudentService {
    db_pool: Pool<Sqlite>,
}

impl StudentService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        StudentService { db_pool }
    }

    /// Da de alta un estudiante asignándole el siguiente folio de su
    /// curso/año. El consecutivo se calcula dentro de la misma transacción
    /// que el INSERT para que dos altas simultáneas no compartan folio
    /// (el índice único sobre (curso, anio, folio_num) respalda esto).
    pub async fn create_student(&self, req: CreateStudentRequest) -> Result<CreateStudentResponse> {
        if req.nombre.trim().is_empty() || req.curso.trim().is_empty() {
            return Err(anyhow!("nombre y curso son obligatorios"));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.db_pool.begin().await?;

        let next_num: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(folio_num), 0) + 1
            FROM estudiantes
            WHERE curso = ?1 AND anio = ?2
            "#,
        )
        .bind(&req.curso)
        .bind(req.anio)
        .fetch_one(&mut *tx)
        .await
        .context("Fallo al calcular el siguiente folio")?;

        let folio = format_folio(&req.curso, req.anio, next_num);

        sqlx::query(
            r#"
            INSERT INTO estudiantes (
                id, folio, folio_num, curso, anio,
                nombre, apellidos, email, telefono, activo,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)
            "#,
        )
        .bind(&id)
        .bind(&folio)
        .bind(next_num)
        .bind(&req.curso)
        .bind(req.anio)
        .bind(&req.nombre)
        .bind(&req.apellidos)
        .bind(&req.email)
        .bind(&req.telefono)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Fallo al insertar estudiante")?;

        tx.commit().await?;

        log::info!("Estudiante {} dado de alta con folio {}", id, folio);

        Ok(CreateStudentResponse {
            id,
            folio,
            message: "Estudiante creado".to_string(),
        })
    }

    pub async fn get_student(&self, student_id: &str) -> Result<StudentRecord> {
        let record = sqlx::query_as::<_, StudentRecord>(
            r#"
            SELECT id, folio, folio_num, curso, anio, nombre, apellidos,
                   email, telefono, activo, created_at, updated_at
            FROM estudiantes
            WHERE id = ?1
            "#,
        )
        .bind(student_id)
        .fetch_one(&self.db_pool)
        .await
        .context("No se encontró estudiante con ese id")?;

        Ok(record)
    }

    /// Lista estudiantes con paginación, opcionalmente filtrando por curso.
    pub async fn list_students(
        &self,
        curso: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<ListStudentsResponse> {
        let offset = (page.saturating_sub(1)) * page_size;

        let total: i64 = match curso {
            Some(c) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM estudiantes WHERE curso = ?1")
                    .bind(c)
                    .fetch_one(&self.db_pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM estudiantes")
                    .fetch_one(&self.db_pool)
                    .await?
            }
        };

        let items = match curso {
            Some(c) => {
                sqlx::query_as::<_, StudentRecord>(
                    r#"
                    SELECT id, folio, folio_num, curso, anio, nombre, apellidos,
                           email, telefono, activo, created_at, updated_at
                    FROM estudiantes
                    WHERE curso = ?1
                    ORDER BY anio DESC, folio_num ASC
                    LIMIT ?2 OFFSET ?3
                    "#,
                )
                .bind(c)
                .bind(page_size as i64)
                .bind(offset as i64)
                .fetch_all(&self.db_pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, StudentRecord>(
                    r#"
                    SELECT id, folio, folio_num, curso, anio, nombre, apellidos,
                           email, telefono, activo, created_at, updated_at
                    FROM estudiantes
                    ORDER BY anio DESC, curso ASC, folio_num ASC
                    LIMIT ?1 OFFSET ?2
                    "#,
                )
                .bind(page_size as i64)
                .bind(offset as i64)
                .fetch_all(&self.db_pool)
                .await?
            }
        };

        Ok(ListStudentsResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }

    /// Actualiza los campos editables de un estudiante.
    pub async fn update_student(&self, student_id: &str, req: UpdateStudentRequest) -> Result<()> {
        let current = self.get_student(student_id).await?;
        let now = Utc::now().to_rfc3339();

        let nombre = req.nombre.unwrap_or(current.nombre);
        let apellidos = req.apellidos.unwrap_or(current.apellidos);
        let email = req.email.unwrap_or(current.email);
        let telefono = req.telefono.or(current.telefono);
        let activo = req.activo.unwrap_or(current.activo);

        sqlx::query(
            r#"
            UPDATE estudiantes
            SET nombre = ?2, apellidos = ?3, email = ?4,
                telefono = ?5, activo = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(student_id)
        .bind(&nombre)
        .bind(&apellidos)
        .bind(&email)
        .bind(&telefono)
        .bind(activo)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar estudiante")?;

        Ok(())
    }
}

/// Arma el folio legible: "M" + curso + últimos dos dígitos del año + consecutivo.
/// Ejemplo: curso "EEAU", año 2026, número 42 -> "MEEAU26-0042".
pub fn format_folio(curso: &str, anio: i64, num: i64) -> String {
    let curso_norm: String = curso
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    format!("M{}{:02}-{:04}", curso_norm, anio % 100, num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student_model::CreateStudentRequest;

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

    fn alta(nombre: &str, curso: &str, anio: i64) -> CreateStudentRequest {
        CreateStudentRequest {
            curso: curso.to_string(),
            anio,
            nombre: nombre.to_string(),
            apellidos: "Pérez".to_string(),
            email: format!("{}@example.com", nombre),
            telefono: None,
        }
    }

    #[test]
    fn test_format_folio() {
        assert_eq!(format_folio("EEAU", 2026, 42), "MEEAU26-0042");
        assert_eq!(format_folio("digi-start", 2025, 7), "MDIGISTART25-0007");
    }

    #[actix_rt::test]
    async fn test_folios_secuenciales_por_curso_y_anio() {
        let pool = test_pool().await;
        let service = StudentService::new(pool);

        let a = service.create_student(alta("ana", "EEAU", 2026)).await.unwrap();
        let b = service.create_student(alta("beto", "EEAU", 2026)).await.unwrap();
        // Otro curso arranca su propio consecutivo
        let c = service.create_student(alta("carla", "DIGI", 2026)).await.unwrap();
        // Mismo curso, otro año: también arranca en 1
        let d = service.create_student(alta("dani", "EEAU", 2027)).await.unwrap();

        assert_eq!(a.folio, "MEEAU26-0001");
        assert_eq!(b.folio, "MEEAU26-0002");
        assert_eq!(c.folio, "MDIGI26-0001");
        assert_eq!(d.folio, "MEEAU27-0001");
    }

    #[actix_rt::test]
    async fn test_update_y_get() {
        let pool = test_pool().await;
        let service = StudentService::new(pool);

        let created = service.create_student(alta("eva", "EEAU", 2026)).await.unwrap();
        service
            .update_student(
                &created.id,
                UpdateStudentRequest {
                    nombre: Some("Eva María".to_string()),
                    apellidos: None,
                    email: None,
                    telefono: Some("5512345678".to_string()),
                    activo: Some(false),
                },
            )
            .await
            .unwrap();

        let fetched = service.get_student(&created.id).await.unwrap();
        assert_eq!(fetched.nombre, "Eva María");
        assert_eq!(fetched.telefono.as_deref(), Some("5512345678"));
        assert!(!fetched.activo);
        // El folio no cambia con updates
        assert_eq!(fetched.folio, created.folio);
    }

    #[actix_rt::test]
    async fn test_list_paginado() {
        let pool = test_pool().await;
        let service = StudentService::new(pool);

        for i in 0..5 {
            service
                .create_student(alta(&format!("al{}", i), "EEAU", 2026))
                .await
                .unwrap();
        }

        let pagina = service.list_students(Some("EEAU"), 1, 3).await.unwrap();
        assert_eq!(pagina.total, 5);
        assert_eq!(pagina.items.len(), 3);
        assert_eq!(pagina.items[0].folio_num, 1);

        let pagina2 = service.list_students(Some("EEAU"), 2, 3).await.unwrap();
        assert_eq!(pagina2.items.len(), 2);
    }
}
