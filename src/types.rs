use serde::Serialize;
use uuid::Uuid;

use crate::models;
use crate::roles::Membership;

#[derive(Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: models::User,
    pub memberships: Vec<Membership>,
}

/// Question as shown to a student: the correct choice stays on the
/// server.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: Uuid,
    pub prompt: String,
    pub choices: Vec<String>,
    pub position: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireView {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub title: String,
    pub max_attempts: i32,
    pub pass_score: i32,
    pub attempts_used: i32,
    pub attempts_left: i32,
    pub questions: Vec<QuestionView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuestionnaireResult {
    pub score: i32,
    pub passed: bool,
    pub attempt: i32,
    pub attempts_left: i32,
    pub unlocked: Vec<models::Achievement>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonResult {
    pub newly_completed: bool,
    pub course_completed: bool,
    pub unlocked: Vec<models::Achievement>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub streak: i64,
    pub unlocked: Vec<models::Achievement>,
}

#[derive(Serialize)]
pub struct LessonTree {
    #[serde(flatten)]
    pub lesson: models::Lesson,
    pub contents: Vec<models::Content>,
    pub activities: Vec<models::Activity>,
    pub questionnaires: Vec<models::Questionnaire>,
}

#[derive(Serialize)]
pub struct ModuleTree {
    #[serde(flatten)]
    pub module: models::CourseModule,
    pub lessons: Vec<LessonTree>,
}

#[derive(Serialize)]
pub struct CourseTree {
    #[serde(flatten)]
    pub course: models::Course,
    pub modules: Vec<ModuleTree>,
}

#[derive(Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: models::Post,
    pub comments: Vec<models::Comment>,
}

#[derive(Serialize)]
pub struct ClassView {
    #[serde(flatten)]
    pub class: models::Class,
    pub members: Vec<Uuid>,
}
