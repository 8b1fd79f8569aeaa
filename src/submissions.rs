use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::error::{db_error, internal_error, CampusError};
use crate::models;
use crate::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl models::ActivitySubmission {
    /// A review decision is allowed on pending submissions only,
    /// transitions are one-way.
    pub fn ensure_reviewable(&self) -> Result<(), CampusError> {
        if self.status == SubmissionStatus::Pending.as_str() {
            Ok(())
        } else {
            Err(CampusError::unprocessable("Submission already reviewed"))
        }
    }
}

/// Rejections must carry feedback for the student.
pub fn validate_feedback(feedback: &str) -> Result<(), CampusError> {
    if feedback.trim().is_empty() {
        Err(CampusError::unprocessable(
            "Feedback is required when rejecting",
        ))
    } else {
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

pub struct SubmissionsApi {
    pool: db::DbConnectionPool,
}

impl SubmissionsApi {
    pub fn new(pool: db::DbConnectionPool) -> Self {
        Self { pool }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    pub async fn get(
        &self,
        id: Uuid,
    ) -> Result<models::ActivitySubmission, CampusError> {
        let mut conn = self.connect().await?;
        schema::activity_submissions::table
            .find(id)
            .select(models::ActivitySubmission::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Submission"))
    }

    /// Turns in a file for an activity. Resubmission is possible only
    /// after a rejection.
    pub async fn submit(
        &self,
        user: Uuid,
        institution: Uuid,
        activity: Uuid,
        file_url: String,
    ) -> Result<models::ActivitySubmission, CampusError> {
        if file_url.trim().is_empty() {
            return Err(CampusError::bad_request("A file is required"));
        }
        let mut conn = self.connect().await?;
        let open: i64 = schema::activity_submissions::table
            .filter(schema::activity_submissions::activity_id.eq(&activity))
            .filter(schema::activity_submissions::user_id.eq(&user))
            .filter(schema::activity_submissions::status.ne(
                SubmissionStatus::Rejected.as_str(),
            ))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(internal_error)?;
        if open != 0 {
            return Err(CampusError::unprocessable(
                "Activity already submitted",
            ));
        }
        let new_submission = models::NewActivitySubmission {
            id: Uuid::new_v4(),
            activity_id: activity,
            institution_id: institution,
            user_id: user,
            file_url,
            status: SubmissionStatus::Pending.as_str().to_string(),
        };
        diesel::insert_into(schema::activity_submissions::table)
            .values(&new_submission)
            .returning(models::ActivitySubmission::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    /// Applies a tutor's review decision. The guard on the loaded row
    /// and the status filter on the update together keep the
    /// transition one-way.
    pub async fn review(
        &self,
        reviewer: Uuid,
        id: Uuid,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> Result<models::ActivitySubmission, CampusError> {
        let submission = self.get(id).await?;
        submission.ensure_reviewable()?;

        let (status, feedback) = match decision {
            ReviewDecision::Approve => (SubmissionStatus::Approved, feedback),
            ReviewDecision::Reject => {
                let feedback = feedback.unwrap_or_default();
                validate_feedback(&feedback)?;
                (SubmissionStatus::Rejected, Some(feedback))
            }
        };

        let mut conn = self.connect().await?;
        let num = diesel::update(schema::activity_submissions::table)
            .filter(schema::activity_submissions::id.eq(&id))
            .filter(schema::activity_submissions::status.eq(
                SubmissionStatus::Pending.as_str(),
            ))
            .set((
                schema::activity_submissions::status.eq(status.as_str()),
                schema::activity_submissions::feedback.eq(feedback),
                schema::activity_submissions::reviewer_id.eq(Some(reviewer)),
                schema::activity_submissions::reviewed_at
                    .eq(Some(Utc::now())),
            ))
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        if num == 0 {
            return Err(CampusError::unprocessable(
                "Submission already reviewed",
            ));
        }
        self.get(id).await
    }

    /// Review queue for an institution.
    pub async fn pending(
        &self,
        institution: Uuid,
    ) -> Result<Vec<models::ActivitySubmission>, CampusError> {
        let mut conn = self.connect().await?;
        schema::activity_submissions::table
            .filter(
                schema::activity_submissions::institution_id.eq(&institution),
            )
            .filter(schema::activity_submissions::status.eq(
                SubmissionStatus::Pending.as_str(),
            ))
            .order(schema::activity_submissions::submitted_at.asc())
            .select(models::ActivitySubmission::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn for_user(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::ActivitySubmission>, CampusError> {
        let mut conn = self.connect().await?;
        schema::activity_submissions::table
            .filter(schema::activity_submissions::user_id.eq(&user))
            .filter(
                schema::activity_submissions::institution_id.eq(&institution),
            )
            .order(schema::activity_submissions::submitted_at.desc())
            .select(models::ActivitySubmission::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(status: SubmissionStatus) -> models::ActivitySubmission {
        models::ActivitySubmission {
            id: Uuid::new_v4(),
            activity_id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            file_url: "files/essay.pdf".to_string(),
            status: status.as_str().to_string(),
            feedback: None,
            reviewer_id: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        }
    }

    #[test]
    fn pending_submission_is_reviewable() {
        assert!(submission(SubmissionStatus::Pending)
            .ensure_reviewable()
            .is_ok());
    }

    #[test]
    fn approved_submission_cannot_be_reviewed_again() {
        assert!(submission(SubmissionStatus::Approved)
            .ensure_reviewable()
            .is_err());
    }

    #[test]
    fn rejected_submission_cannot_be_reviewed_again() {
        assert!(submission(SubmissionStatus::Rejected)
            .ensure_reviewable()
            .is_err());
    }

    #[test]
    fn rejection_feedback_must_not_be_blank() {
        assert!(validate_feedback("").is_err());
        assert!(validate_feedback("   \n").is_err());
        assert!(validate_feedback("Missing the second chapter").is_ok());
    }
}
