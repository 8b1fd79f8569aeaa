use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::error::{db_error, internal_error, CampusError};
use crate::models;
use crate::schema;
use crate::types::ClassView;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClass {
    pub institution: Uuid,
    pub course: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollUser {
    pub class: Uuid,
    pub user: Uuid,
}

pub struct ClassesApi {
    pool: db::DbConnectionPool,
}

impl ClassesApi {
    pub fn new(pool: db::DbConnectionPool) -> Self {
        Self { pool }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    pub async fn create(
        &self,
        props: CreateClass,
    ) -> Result<models::Class, CampusError> {
        let mut conn = self.connect().await?;
        let new_class = models::NewClass {
            id: Uuid::new_v4(),
            institution_id: props.institution,
            course_id: props.course,
            name: props.name,
        };
        diesel::insert_into(schema::classes::table)
            .values(&new_class)
            .returning(models::Class::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<models::Class, CampusError> {
        let mut conn = self.connect().await?;
        schema::classes::table
            .find(id)
            .select(models::Class::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Class"))
    }

    pub async fn view(&self, id: Uuid) -> Result<ClassView, CampusError> {
        let class = self.get(id).await?;
        let mut conn = self.connect().await?;
        let members: Vec<Uuid> = schema::enrollments::table
            .filter(schema::enrollments::class_id.eq(&id))
            .select(schema::enrollments::user_id)
            .get_results(&mut conn)
            .await
            .map_err(internal_error)?;
        Ok(ClassView { class, members })
    }

    pub async fn enroll(
        &self,
        props: EnrollUser,
    ) -> Result<(), CampusError> {
        let mut conn = self.connect().await?;
        let new_enrollment = models::NewEnrollment {
            id: Uuid::new_v4(),
            class_id: props.class,
            user_id: props.user,
        };
        let num = diesel::insert_into(schema::enrollments::table)
            .values(&new_enrollment)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        if num == 0 {
            return Err(CampusError::unprocessable("Already enrolled"));
        }
        Ok(())
    }

    pub async fn list(
        &self,
        institution: Uuid,
    ) -> Result<Vec<models::Class>, CampusError> {
        let mut conn = self.connect().await?;
        schema::classes::table
            .filter(schema::classes::institution_id.eq(&institution))
            .order(schema::classes::created_at.asc())
            .select(models::Class::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }
}
