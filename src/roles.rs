use std::num::NonZeroUsize;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db;
use crate::error::{internal_error, CampusError};
use crate::models;
use crate::schema;

/// Role of a user within one institution, persisted as text on the
/// association row.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Tutor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Tutor => "tutor",
            Role::Student => "student",
        }
    }

    pub fn parse(value: &str) -> Result<Role, CampusError> {
        match value {
            "admin" => Ok(Role::Admin),
            "tutor" => Ok(Role::Tutor),
            "student" => Ok(Role::Student),
            _ => Err(CampusError::bad_request("Unknown role")),
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Role::Admin => true,
            Role::Tutor => matches!(
                permission,
                AuthorCourses
                    | ReviewSubmissions
                    | ManageClasses
                    | ModerateFeed
                    | PostToFeed
                    | Study
            ),
            Role::Student => matches!(permission, PostToFeed | Study),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageMembers,
    ManageAchievements,
    AuthorCourses,
    ReviewSubmissions,
    ManageClasses,
    ModerateFeed,
    PostToFeed,
    Study,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub institution_id: Uuid,
    pub role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberChange {
    pub user: Uuid,
    pub institution: Uuid,
    pub role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRemove {
    pub user: Uuid,
    pub institution: Uuid,
}

/// Resolves (user, institution) pairs to roles from the persisted
/// association table. Memberships are cached per user and invalidated
/// on every membership mutation.
pub struct AccessApi {
    pool: db::DbConnectionPool,
    cache: Mutex<LruCache<Uuid, Vec<Membership>>>,
}

impl AccessApi {
    pub fn new(pool: db::DbConnectionPool) -> Self {
        Self {
            pool,
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(5000).unwrap())),
        }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    async fn get_from_cache(&self, id: &Uuid) -> Option<Vec<Membership>> {
        let mut cache = self.cache.lock().await;
        cache.get(id).cloned()
    }

    async fn put_to_cache(&self, id: Uuid, memberships: Vec<Membership>) {
        let mut cache = self.cache.lock().await;
        cache.put(id, memberships);
    }

    async fn invalidate(&self, id: &Uuid) {
        let mut cache = self.cache.lock().await;
        cache.pop(id);
    }

    pub async fn memberships(
        &self,
        user: Uuid,
    ) -> Result<Vec<Membership>, CampusError> {
        if let Some(memberships) = self.get_from_cache(&user).await {
            return Ok(memberships);
        }
        let mut conn = self.connect().await?;
        let rows: Vec<(Uuid, String)> = schema::user_institutions::table
            .filter(schema::user_institutions::user_id.eq(&user))
            .select((
                schema::user_institutions::institution_id,
                schema::user_institutions::role,
            ))
            .get_results(&mut conn)
            .await
            .map_err(internal_error)?;
        let mut memberships = Vec::with_capacity(rows.len());
        for (institution_id, role) in rows {
            memberships.push(Membership {
                institution_id,
                role: Role::parse(&role)?,
            });
        }
        self.put_to_cache(user, memberships.clone()).await;
        Ok(memberships)
    }

    pub async fn role(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Role, CampusError> {
        let memberships = self.memberships(user).await?;
        memberships
            .iter()
            .find(|m| m.institution_id == institution)
            .map(|m| m.role)
            .ok_or_else(|| {
                CampusError::forbidden("Not a member of the institution")
            })
    }

    /// Per-request permission gate: every institution-scoped operation
    /// goes through here.
    pub async fn require(
        &self,
        user: Uuid,
        institution: Uuid,
        permission: Permission,
    ) -> Result<Role, CampusError> {
        let role = self.role(user, institution).await?;
        if role.allows(permission) {
            Ok(role)
        } else {
            Err(CampusError::forbidden("Operation not permitted"))
        }
    }

    pub async fn add_member(
        &self,
        props: MemberChange,
    ) -> Result<(), CampusError> {
        let MemberChange { user, institution, role } = props;
        let mut conn = self.connect().await?;
        let cnt: i64 = schema::institutions::table
            .filter(schema::institutions::id.eq(&institution))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(internal_error)?;
        if cnt == 0 {
            return Err(CampusError::not_found("Institution not found"));
        }
        let new_member = models::NewUserInstitution {
            id: Uuid::new_v4(),
            user_id: user,
            institution_id: institution,
            role: role.as_str().to_string(),
        };
        let num = diesel::insert_into(schema::user_institutions::table)
            .values(&new_member)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        if num == 0 {
            return Err(CampusError::unprocessable("Already a member"));
        }
        self.invalidate(&user).await;
        Ok(())
    }

    pub async fn update_role(
        &self,
        props: MemberChange,
    ) -> Result<(), CampusError> {
        let MemberChange { user, institution, role } = props;
        let mut conn = self.connect().await?;
        let num = diesel::update(schema::user_institutions::table)
            .filter(schema::user_institutions::user_id.eq(&user))
            .filter(schema::user_institutions::institution_id.eq(&institution))
            .set(schema::user_institutions::role.eq(role.as_str()))
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        if num == 0 {
            return Err(CampusError::not_found("Member not found"));
        }
        self.invalidate(&user).await;
        Ok(())
    }

    pub async fn remove_member(
        &self,
        props: MemberRemove,
    ) -> Result<(), CampusError> {
        let MemberRemove { user, institution } = props;
        let mut conn = self.connect().await?;
        let num = diesel::delete(schema::user_institutions::table)
            .filter(schema::user_institutions::user_id.eq(&user))
            .filter(schema::user_institutions::institution_id.eq(&institution))
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        if num == 0 {
            return Err(CampusError::not_found("Member not found"));
        }
        self.invalidate(&user).await;
        Ok(())
    }

    pub async fn remove_user_everywhere(
        &self,
        user: Uuid,
    ) -> Result<(), CampusError> {
        let mut conn = self.connect().await?;
        let _ = diesel::delete(schema::user_institutions::table)
            .filter(schema::user_institutions::user_id.eq(&user))
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        self.invalidate(&user).await;
        Ok(())
    }

    pub async fn list_members(
        &self,
        institution: Uuid,
    ) -> Result<Vec<models::UserInstitution>, CampusError> {
        let mut conn = self.connect().await?;
        schema::user_institutions::table
            .filter(
                schema::user_institutions::institution_id.eq(&institution),
            )
            .select(models::UserInstitution::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_allows_everything() {
        for permission in [
            Permission::ManageMembers,
            Permission::ManageAchievements,
            Permission::AuthorCourses,
            Permission::ReviewSubmissions,
            Permission::ManageClasses,
            Permission::ModerateFeed,
            Permission::PostToFeed,
            Permission::Study,
        ] {
            assert!(Role::Admin.allows(permission));
        }
    }

    #[test]
    fn tutor_cannot_manage_members_or_achievements() {
        assert!(!Role::Tutor.allows(Permission::ManageMembers));
        assert!(!Role::Tutor.allows(Permission::ManageAchievements));
        assert!(Role::Tutor.allows(Permission::ReviewSubmissions));
        assert!(Role::Tutor.allows(Permission::AuthorCourses));
    }

    #[test]
    fn student_is_limited_to_study_and_feed() {
        assert!(Role::Student.allows(Permission::Study));
        assert!(Role::Student.allows(Permission::PostToFeed));
        assert!(!Role::Student.allows(Permission::AuthorCourses));
        assert!(!Role::Student.allows(Permission::ReviewSubmissions));
        assert!(!Role::Student.allows(Permission::ModerateFeed));
    }

    #[test]
    fn role_text_roundtrip() {
        for role in [Role::Admin, Role::Tutor, Role::Student] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
        assert!(Role::parse("superuser").is_err());
    }
}
