use std::sync::Arc;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::courses::CoursesApi;
use crate::db;
use crate::error::{db_error, internal_error, CampusError};
use crate::models;
use crate::schema;

/// Printable serial embedded in the rendered certificate.
pub fn serial_for(id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("CERT-{}", hex[..12].to_uppercase())
}

pub struct CertificatesApi {
    pool: db::DbConnectionPool,
    courses: Arc<CoursesApi>,
}

impl CertificatesApi {
    pub fn new(pool: db::DbConnectionPool, courses: Arc<CoursesApi>) -> Self {
        Self { pool, courses }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    /// Issues a completion certificate once per (user, course). The
    /// PDF itself is rendered by an external service from this record.
    pub async fn issue(
        &self,
        user: Uuid,
        course_id: Uuid,
    ) -> Result<models::Certificate, CampusError> {
        let course = self.courses.get_course(course_id).await?;
        let lesson_ids =
            self.courses.lesson_ids_of_course(course_id).await?;
        if lesson_ids.is_empty() {
            return Err(CampusError::unprocessable("Course has no lessons"));
        }
        let completed = self.courses.completed_lessons(user, course_id).await?;
        if completed.len() < lesson_ids.len() {
            return Err(CampusError::unprocessable("Course not completed yet"));
        }

        let mut conn = self.connect().await?;
        let id = Uuid::new_v4();
        let new_certificate = models::NewCertificate {
            id,
            course_id,
            institution_id: course.institution_id,
            user_id: user,
            serial: serial_for(id),
        };
        let num = diesel::insert_into(schema::certificates::table)
            .values(&new_certificate)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        if num == 0 {
            return Err(CampusError::unprocessable(
                "Certificate already issued",
            ));
        }
        schema::certificates::table
            .find(id)
            .select(models::Certificate::as_select())
            .first(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn get(
        &self,
        id: Uuid,
    ) -> Result<models::Certificate, CampusError> {
        let mut conn = self.connect().await?;
        schema::certificates::table
            .find(id)
            .select(models::Certificate::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Certificate"))
    }

    pub async fn for_user(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::Certificate>, CampusError> {
        let mut conn = self.connect().await?;
        schema::certificates::table
            .filter(schema::certificates::user_id.eq(&user))
            .filter(schema::certificates::institution_id.eq(&institution))
            .order(schema::certificates::issued_at.desc())
            .select(models::Certificate::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }
}
