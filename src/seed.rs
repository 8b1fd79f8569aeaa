use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::achievements::CriteriaKind;
use crate::db;
use crate::error::{internal_error, CampusError};
use crate::models;
use crate::roles::Role;
use crate::schema;

#[derive(Deserialize)]
pub struct SeedInstitution {
    pub id: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
pub struct SeedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct SeedMembership {
    pub user: Uuid,
    pub institution: Uuid,
    pub role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAchievement {
    pub id: Uuid,
    pub institution: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub criteria: CriteriaKind,
    pub threshold: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCourse {
    pub id: Uuid,
    pub institution: Uuid,
    pub author: Uuid,
    pub title: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct SeedChatRoom {
    pub id: Uuid,
    pub institution: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub institutions: Vec<SeedInstitution>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub memberships: Vec<SeedMembership>,
    #[serde(default)]
    pub achievements: Vec<SeedAchievement>,
    #[serde(default)]
    pub courses: Vec<SeedCourse>,
    #[serde(default)]
    pub chat_rooms: Vec<SeedChatRoom>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub institutions: usize,
    pub users: usize,
    pub memberships: usize,
    pub achievements: usize,
    pub courses: usize,
    pub chat_rooms: usize,
}

/// Bulk seeding. The only place with batched writes; conflicts are
/// dropped so reseeding the same payload is harmless.
pub struct SeedApi {
    pool: db::DbConnectionPool,
}

impl SeedApi {
    pub fn new(pool: db::DbConnectionPool) -> Self {
        Self { pool }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    pub async fn seed(
        &self,
        data: SeedData,
    ) -> Result<SeedReport, CampusError> {
        let mut report = SeedReport::default();
        let mut conn = self.connect().await?;

        if !data.institutions.is_empty() {
            let rows: Vec<models::NewInstitution> = data
                .institutions
                .into_iter()
                .map(|i| models::NewInstitution {
                    id: i.id,
                    name: i.name,
                })
                .collect();
            report.institutions =
                diesel::insert_into(schema::institutions::table)
                    .values(&rows)
                    .on_conflict_do_nothing()
                    .execute(&mut conn)
                    .await
                    .map_err(internal_error)?;
        }

        if !data.users.is_empty() {
            let rows: Vec<models::NewUser> = data
                .users
                .into_iter()
                .map(|u| models::NewUser {
                    id: u.id,
                    name: u.name,
                    email: u.email,
                })
                .collect();
            report.users = diesel::insert_into(schema::users::table)
                .values(&rows)
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .await
                .map_err(internal_error)?;
        }

        if !data.memberships.is_empty() {
            let rows: Vec<models::NewUserInstitution> = data
                .memberships
                .into_iter()
                .map(|m| models::NewUserInstitution {
                    id: Uuid::new_v4(),
                    user_id: m.user,
                    institution_id: m.institution,
                    role: m.role.as_str().to_string(),
                })
                .collect();
            report.memberships =
                diesel::insert_into(schema::user_institutions::table)
                    .values(&rows)
                    .on_conflict_do_nothing()
                    .execute(&mut conn)
                    .await
                    .map_err(internal_error)?;
        }

        if !data.achievements.is_empty() {
            let rows: Vec<models::NewAchievement> = data
                .achievements
                .into_iter()
                .map(|a| models::NewAchievement {
                    id: a.id,
                    institution_id: a.institution,
                    title: a.title,
                    description: a.description,
                    criteria: a.criteria.as_str().to_string(),
                    threshold: a.threshold,
                })
                .collect();
            report.achievements =
                diesel::insert_into(schema::achievements::table)
                    .values(&rows)
                    .on_conflict_do_nothing()
                    .execute(&mut conn)
                    .await
                    .map_err(internal_error)?;
        }

        if !data.courses.is_empty() {
            let rows: Vec<models::NewCourse> = data
                .courses
                .into_iter()
                .map(|c| models::NewCourse {
                    id: c.id,
                    institution_id: c.institution,
                    author_id: c.author,
                    title: c.title,
                    description: c.description,
                })
                .collect();
            report.courses = diesel::insert_into(schema::courses::table)
                .values(&rows)
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .await
                .map_err(internal_error)?;
        }

        if !data.chat_rooms.is_empty() {
            let rows: Vec<models::NewChatRoom> = data
                .chat_rooms
                .into_iter()
                .map(|r| models::NewChatRoom {
                    id: r.id,
                    institution_id: r.institution,
                    name: r.name,
                })
                .collect();
            report.chat_rooms =
                diesel::insert_into(schema::chat_rooms::table)
                    .values(&rows)
                    .on_conflict_do_nothing()
                    .execute(&mut conn)
                    .await
                    .map_err(internal_error)?;
        }

        Ok(report)
    }
}
