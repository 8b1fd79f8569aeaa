use diesel::prelude::*;

use crate::schema;

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::institutions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::institutions)]
pub struct NewInstitution {
    pub id: uuid::Uuid,
    pub name: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::user_institutions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct UserInstitution {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub role: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::user_institutions)]
pub struct NewUserInstitution {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub role: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub author_id: uuid::Uuid,
    pub title: String,
    pub description: String,
    pub published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::courses)]
pub struct NewCourse {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub author_id: uuid::Uuid,
    pub title: String,
    pub description: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::course_modules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = schema::course_modules)]
pub struct NewCourseModule {
    pub id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::lessons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: uuid::Uuid,
    pub module_id: uuid::Uuid,
    pub title: String,
    pub duration_minutes: i32,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = schema::lessons)]
pub struct NewLesson {
    pub id: uuid::Uuid,
    pub module_id: uuid::Uuid,
    pub title: String,
    pub duration_minutes: i32,
    pub position: i32,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::contents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: uuid::Uuid,
    pub lesson_id: uuid::Uuid,
    pub kind: String,
    pub title: String,
    pub url: String,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = schema::contents)]
pub struct NewContent {
    pub id: uuid::Uuid,
    pub lesson_id: uuid::Uuid,
    pub kind: String,
    pub title: String,
    pub url: String,
    pub position: i32,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::activities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: uuid::Uuid,
    pub lesson_id: uuid::Uuid,
    pub title: String,
    pub instructions: String,
}

#[derive(Insertable)]
#[diesel(table_name = schema::activities)]
pub struct NewActivity {
    pub id: uuid::Uuid,
    pub lesson_id: uuid::Uuid,
    pub title: String,
    pub instructions: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::activity_submissions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ActivitySubmission {
    pub id: uuid::Uuid,
    pub activity_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub file_url: String,
    pub status: String,
    pub feedback: Option<String>,
    pub reviewer_id: Option<uuid::Uuid>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::activity_submissions)]
pub struct NewActivitySubmission {
    pub id: uuid::Uuid,
    pub activity_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub file_url: String,
    pub status: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::questionnaires)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    pub id: uuid::Uuid,
    pub lesson_id: uuid::Uuid,
    pub title: String,
    pub max_attempts: i32,
    pub pass_score: i32,
}

#[derive(Insertable)]
#[diesel(table_name = schema::questionnaires)]
pub struct NewQuestionnaire {
    pub id: uuid::Uuid,
    pub lesson_id: uuid::Uuid,
    pub title: String,
    pub max_attempts: i32,
    pub pass_score: i32,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::questions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: uuid::Uuid,
    pub questionnaire_id: uuid::Uuid,
    pub prompt: String,
    pub choices: String,
    pub correct_choice: i32,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = schema::questions)]
pub struct NewQuestion {
    pub id: uuid::Uuid,
    pub questionnaire_id: uuid::Uuid,
    pub prompt: String,
    pub choices: String,
    pub correct_choice: i32,
    pub position: i32,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::questionnaire_submissions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireSubmission {
    pub id: uuid::Uuid,
    pub questionnaire_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub answers: String,
    pub score: i32,
    pub passed: bool,
    pub attempt: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::questionnaire_submissions)]
pub struct NewQuestionnaireSubmission {
    pub id: uuid::Uuid,
    pub questionnaire_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub answers: String,
    pub score: i32,
    pub passed: bool,
    pub attempt: i32,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::achievements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: uuid::Uuid,
    pub institution_id: Option<uuid::Uuid>,
    pub title: String,
    pub description: String,
    pub criteria: String,
    pub threshold: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::achievements)]
pub struct NewAchievement {
    pub id: uuid::Uuid,
    pub institution_id: Option<uuid::Uuid>,
    pub title: String,
    pub description: String,
    pub criteria: String,
    pub threshold: i64,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::user_achievements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub id: uuid::Uuid,
    pub achievement_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub unlocked_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::user_achievements)]
pub struct NewUserAchievement {
    pub id: uuid::Uuid,
    pub achievement_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::lesson_completions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletion {
    pub id: uuid::Uuid,
    pub lesson_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::lesson_completions)]
pub struct NewLessonCompletion {
    pub id: uuid::Uuid,
    pub lesson_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::activity_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub kind: String,
    pub subject_id: Option<uuid::Uuid>,
    pub amount: i64,
    pub occurred_on: chrono::NaiveDate,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::activity_events)]
pub struct NewActivityEvent {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub kind: String,
    pub subject_id: Option<uuid::Uuid>,
    pub amount: i64,
    pub occurred_on: chrono::NaiveDate,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::certificates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub serial: String,
    pub issued_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::certificates)]
pub struct NewCertificate {
    pub id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub serial: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub author_id: uuid::Uuid,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::posts)]
pub struct NewPost {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub author_id: uuid::Uuid,
    pub body: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: uuid::Uuid,
    pub post_id: uuid::Uuid,
    pub author_id: uuid::Uuid,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::comments)]
pub struct NewComment {
    pub id: uuid::Uuid,
    pub post_id: uuid::Uuid,
    pub author_id: uuid::Uuid,
    pub body: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::chat_rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub name: String,
    pub rev: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::chat_rooms)]
pub struct NewChatRoom {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub name: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: uuid::Uuid,
    pub room_id: uuid::Uuid,
    pub ordinal: i64,
    pub author_id: uuid::Uuid,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::chat_messages)]
pub struct NewChatMessage {
    pub id: uuid::Uuid,
    pub room_id: uuid::Uuid,
    pub ordinal: i64,
    pub author_id: uuid::Uuid,
    pub body: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::classes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::classes)]
pub struct NewClass {
    pub id: uuid::Uuid,
    pub institution_id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub name: String,
}

#[derive(serde::Serialize, Selectable, Queryable, Clone)]
#[diesel(table_name = schema::enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: uuid::Uuid,
    pub class_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::enrollments)]
pub struct NewEnrollment {
    pub id: uuid::Uuid,
    pub class_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
}
