use std::sync::Arc;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use crate::achievements::AchievementsApi;
use crate::db;
use crate::error::{db_error, internal_error, CampusError};
use crate::models;
use crate::schema;
use crate::types::{
    QuestionView, QuestionnaireView, SubmitQuestionnaireResult,
};

/// Percent of correct answers, rounded down. One answer per question,
/// in question order.
pub fn grade(
    questions: &[models::Question],
    answers: &[i32],
) -> Result<i32, CampusError> {
    if questions.is_empty() {
        return Err(CampusError::unprocessable(
            "Questionnaire has no questions",
        ));
    }
    if answers.len() != questions.len() {
        return Err(CampusError::bad_request(
            "One answer per question is required",
        ));
    }
    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| q.correct_choice == **a)
        .count();
    Ok((correct * 100 / questions.len()) as i32)
}

/// Next 1-based attempt number, or an error when all attempts are
/// used up. `used` can never pass `max_attempts`.
pub fn attempt_number(
    used: i64,
    max_attempts: i32,
) -> Result<i32, CampusError> {
    if used >= max_attempts as i64 {
        Err(CampusError::unprocessable("No attempts left"))
    } else {
        Ok(used as i32 + 1)
    }
}

fn parse_choices(choices: &str) -> Result<Vec<String>, CampusError> {
    serde_json::from_str(choices)
        .map_err(|_| CampusError::internal("Malformed question choices"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionnaire {
    pub lesson: Uuid,
    pub title: String,
    pub max_attempts: i32,
    pub pass_score: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestion {
    pub questionnaire: Uuid,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_choice: i32,
    pub position: i32,
}

pub struct QuestionnairesApi {
    pool: db::DbConnectionPool,
    achievements: Arc<AchievementsApi>,
}

impl QuestionnairesApi {
    pub fn new(
        pool: db::DbConnectionPool,
        achievements: Arc<AchievementsApi>,
    ) -> Self {
        Self { pool, achievements }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    pub async fn get(
        &self,
        id: Uuid,
    ) -> Result<models::Questionnaire, CampusError> {
        let mut conn = self.connect().await?;
        schema::questionnaires::table
            .find(id)
            .select(models::Questionnaire::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Questionnaire"))
    }

    pub async fn create(
        &self,
        props: CreateQuestionnaire,
    ) -> Result<models::Questionnaire, CampusError> {
        if props.max_attempts <= 0 {
            return Err(CampusError::bad_request(
                "maxAttempts must be positive",
            ));
        }
        if !(0..=100).contains(&props.pass_score) {
            return Err(CampusError::bad_request(
                "passScore must be a percentage",
            ));
        }
        let mut conn = self.connect().await?;
        let new_questionnaire = models::NewQuestionnaire {
            id: Uuid::new_v4(),
            lesson_id: props.lesson,
            title: props.title,
            max_attempts: props.max_attempts,
            pass_score: props.pass_score,
        };
        diesel::insert_into(schema::questionnaires::table)
            .values(&new_questionnaire)
            .returning(models::Questionnaire::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn add_question(
        &self,
        props: CreateQuestion,
    ) -> Result<models::Question, CampusError> {
        if props.choices.len() < 2 {
            return Err(CampusError::bad_request(
                "A question needs at least two choices",
            ));
        }
        if props.correct_choice < 0
            || props.correct_choice as usize >= props.choices.len()
        {
            return Err(CampusError::bad_request(
                "correctChoice is out of range",
            ));
        }
        let choices = serde_json::to_string(&props.choices)
            .map_err(|e| CampusError::internal(&e.to_string()))?;
        let mut conn = self.connect().await?;
        let new_question = models::NewQuestion {
            id: Uuid::new_v4(),
            questionnaire_id: props.questionnaire,
            prompt: props.prompt,
            choices,
            correct_choice: props.correct_choice,
            position: props.position,
        };
        diesel::insert_into(schema::questions::table)
            .values(&new_question)
            .returning(models::Question::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    async fn questions(
        &self,
        questionnaire: Uuid,
    ) -> Result<Vec<models::Question>, CampusError> {
        let mut conn = self.connect().await?;
        schema::questions::table
            .filter(schema::questions::questionnaire_id.eq(&questionnaire))
            .order(schema::questions::position.asc())
            .select(models::Question::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }

    async fn attempts_used(
        &self,
        user: Uuid,
        questionnaire: Uuid,
    ) -> Result<i64, CampusError> {
        let mut conn = self.connect().await?;
        schema::questionnaire_submissions::table
            .filter(
                schema::questionnaire_submissions::questionnaire_id
                    .eq(&questionnaire),
            )
            .filter(schema::questionnaire_submissions::user_id.eq(&user))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    /// Student view of a questionnaire: questions without correct
    /// choices, plus the caller's attempt budget.
    pub async fn view(
        &self,
        user: Uuid,
        id: Uuid,
    ) -> Result<QuestionnaireView, CampusError> {
        let questionnaire = self.get(id).await?;
        let questions = self.questions(id).await?;
        let used = self.attempts_used(user, id).await? as i32;
        let mut views = Vec::with_capacity(questions.len());
        for question in questions {
            views.push(QuestionView {
                id: question.id,
                prompt: question.prompt,
                choices: parse_choices(&question.choices)?,
                position: question.position,
            });
        }
        Ok(QuestionnaireView {
            id: questionnaire.id,
            lesson_id: questionnaire.lesson_id,
            title: questionnaire.title,
            max_attempts: questionnaire.max_attempts,
            pass_score: questionnaire.pass_score,
            attempts_used: used,
            attempts_left: (questionnaire.max_attempts - used).max(0),
            questions: views,
        })
    }

    /// Records one graded attempt. The attempt guard runs before any
    /// write, so the stored attempt number can never pass
    /// `max_attempts`. A passing attempt feeds the achievement
    /// evaluator.
    pub async fn submit(
        &self,
        user: Uuid,
        institution: Uuid,
        questionnaire: Uuid,
        answers: Vec<i32>,
    ) -> Result<SubmitQuestionnaireResult, CampusError> {
        let q = self.get(questionnaire).await?;
        let used = self.attempts_used(user, questionnaire).await?;
        let attempt = attempt_number(used, q.max_attempts)?;
        let questions = self.questions(questionnaire).await?;
        let score = grade(&questions, &answers)?;
        let passed = score >= q.pass_score;

        let answers_json = serde_json::to_string(&answers)
            .map_err(|e| CampusError::internal(&e.to_string()))?;
        let submission = models::NewQuestionnaireSubmission {
            id: Uuid::new_v4(),
            questionnaire_id: questionnaire,
            institution_id: institution,
            user_id: user,
            answers: answers_json,
            score,
            passed,
            attempt,
        };
        let mut conn = self.connect().await?;
        let _ = diesel::insert_into(schema::questionnaire_submissions::table)
            .values(&submission)
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;

        let unlocked = if passed {
            self.achievements.evaluate(user, institution).await?
        } else {
            Vec::new()
        };
        Ok(SubmitQuestionnaireResult {
            score,
            passed,
            attempt,
            attempts_left: q.max_attempts - attempt,
            unlocked,
        })
    }

    pub async fn submissions(
        &self,
        user: Uuid,
        questionnaire: Uuid,
    ) -> Result<Vec<models::QuestionnaireSubmission>, CampusError> {
        let mut conn = self.connect().await?;
        schema::questionnaire_submissions::table
            .filter(
                schema::questionnaire_submissions::questionnaire_id
                    .eq(&questionnaire),
            )
            .filter(schema::questionnaire_submissions::user_id.eq(&user))
            .order(schema::questionnaire_submissions::attempt.asc())
            .select(models::QuestionnaireSubmission::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct_choice: i32) -> models::Question {
        models::Question {
            id: Uuid::new_v4(),
            questionnaire_id: Uuid::new_v4(),
            prompt: "?".to_string(),
            choices: r#"["a","b","c"]"#.to_string(),
            correct_choice,
            position: 0,
        }
    }

    #[test]
    fn grade_all_correct_is_hundred() {
        let questions = vec![question(0), question(1)];
        assert_eq!(grade(&questions, &[0, 1]).unwrap(), 100);
    }

    #[test]
    fn grade_rounds_down() {
        let questions = vec![question(0), question(1), question(2)];
        assert_eq!(grade(&questions, &[0, 1, 0]).unwrap(), 66);
    }

    #[test]
    fn grade_all_wrong_is_zero() {
        let questions = vec![question(0), question(1)];
        assert_eq!(grade(&questions, &[1, 0]).unwrap(), 0);
    }

    #[test]
    fn grade_rejects_answer_count_mismatch() {
        let questions = vec![question(0), question(1)];
        assert!(grade(&questions, &[0]).is_err());
    }

    #[test]
    fn grade_rejects_empty_questionnaire() {
        assert!(grade(&[], &[]).is_err());
    }

    #[test]
    fn attempts_stop_at_max() {
        assert_eq!(attempt_number(0, 3).unwrap(), 1);
        assert_eq!(attempt_number(2, 3).unwrap(), 3);
        assert!(attempt_number(3, 3).is_err());
        // even an inconsistent count can't mint an attempt past max
        assert!(attempt_number(7, 3).is_err());
    }
}
