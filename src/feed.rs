use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db;
use crate::error::{db_error, internal_error, CampusError};
use crate::models;
use crate::schema;
use crate::types::PostView;

const FEED_PAGE: i64 = 50;

pub struct FeedApi {
    pool: db::DbConnectionPool,
}

impl FeedApi {
    pub fn new(pool: db::DbConnectionPool) -> Self {
        Self { pool }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    pub async fn create_post(
        &self,
        author: Uuid,
        institution: Uuid,
        body: String,
    ) -> Result<models::Post, CampusError> {
        if body.trim().is_empty() {
            return Err(CampusError::bad_request("Post body is empty"));
        }
        let mut conn = self.connect().await?;
        let new_post = models::NewPost {
            id: Uuid::new_v4(),
            institution_id: institution,
            author_id: author,
            body,
        };
        diesel::insert_into(schema::posts::table)
            .values(&new_post)
            .returning(models::Post::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn get_post(
        &self,
        id: Uuid,
    ) -> Result<models::Post, CampusError> {
        let mut conn = self.connect().await?;
        schema::posts::table
            .find(id)
            .select(models::Post::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Post"))
    }

    pub async fn post_view(
        &self,
        id: Uuid,
    ) -> Result<PostView, CampusError> {
        let post = self.get_post(id).await?;
        let mut conn = self.connect().await?;
        let comments: Vec<models::Comment> = schema::comments::table
            .filter(schema::comments::post_id.eq(&id))
            .order(schema::comments::created_at.asc())
            .select(models::Comment::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)?;
        Ok(PostView { post, comments })
    }

    pub async fn feed(
        &self,
        institution: Uuid,
    ) -> Result<Vec<models::Post>, CampusError> {
        let mut conn = self.connect().await?;
        schema::posts::table
            .filter(schema::posts::institution_id.eq(&institution))
            .order(schema::posts::created_at.desc())
            .limit(FEED_PAGE)
            .select(models::Post::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn create_comment(
        &self,
        author: Uuid,
        post: Uuid,
        body: String,
    ) -> Result<models::Comment, CampusError> {
        if body.trim().is_empty() {
            return Err(CampusError::bad_request("Comment body is empty"));
        }
        let mut conn = self.connect().await?;
        let new_comment = models::NewComment {
            id: Uuid::new_v4(),
            post_id: post,
            author_id: author,
            body,
        };
        diesel::insert_into(schema::comments::table)
            .values(&new_comment)
            .returning(models::Comment::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    /// Deletes a post with its comments. The caller decides whether
    /// the user may moderate.
    pub async fn delete_post(&self, id: Uuid) -> Result<(), CampusError> {
        let mut conn = self.connect().await?;
        let _ = diesel::delete(schema::comments::table)
            .filter(schema::comments::post_id.eq(&id))
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        let num = diesel::delete(schema::posts::table)
            .filter(schema::posts::id.eq(&id))
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        if num == 0 {
            Err(CampusError::not_found("Post not found"))
        } else {
            Ok(())
        }
    }
}
