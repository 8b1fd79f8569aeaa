use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::{internal_error, CampusError};
use crate::models;
use crate::schema;

/// Activity that is recorded as an event row. Lesson completions and
/// questionnaire passes live in their own tables and are counted from
/// there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    DailyLogin,
    StudyTime,
    CourseCompleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DailyLogin => "daily_login",
            EventKind::StudyTime => "study_time",
            EventKind::CourseCompleted => "course_completed",
        }
    }
}

pub struct Event {
    pub kind: EventKind,
    pub subject: Option<Uuid>,
    pub amount: i64,
}

impl Event {
    pub fn daily_login() -> Self {
        Self {
            kind: EventKind::DailyLogin,
            subject: None,
            amount: 1,
        }
    }

    pub fn study_time(lesson: Uuid, minutes: i64) -> Self {
        Self {
            kind: EventKind::StudyTime,
            subject: Some(lesson),
            amount: minutes,
        }
    }

    pub fn course_completed(course: Uuid) -> Self {
        Self {
            kind: EventKind::CourseCompleted,
            subject: Some(course),
            amount: 1,
        }
    }
}

/// Counter an achievement threshold is compared against.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaKind {
    LessonsCompleted,
    QuestionnairesPassed,
    CoursesCompleted,
    LoginStreak,
    StudyMinutes,
}

impl CriteriaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriteriaKind::LessonsCompleted => "lessons_completed",
            CriteriaKind::QuestionnairesPassed => "questionnaires_passed",
            CriteriaKind::CoursesCompleted => "courses_completed",
            CriteriaKind::LoginStreak => "login_streak",
            CriteriaKind::StudyMinutes => "study_minutes",
        }
    }

    pub fn parse(value: &str) -> Result<CriteriaKind, CampusError> {
        match value {
            "lessons_completed" => Ok(CriteriaKind::LessonsCompleted),
            "questionnaires_passed" => Ok(CriteriaKind::QuestionnairesPassed),
            "courses_completed" => Ok(CriteriaKind::CoursesCompleted),
            "login_streak" => Ok(CriteriaKind::LoginStreak),
            "study_minutes" => Ok(CriteriaKind::StudyMinutes),
            _ => Err(CampusError::bad_request("Unknown criteria")),
        }
    }
}

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub lessons_completed: i64,
    pub questionnaires_passed: i64,
    pub courses_completed: i64,
    pub study_minutes: i64,
    pub login_streak: i64,
}

impl ProgressSnapshot {
    pub fn counter(&self, kind: CriteriaKind) -> i64 {
        match kind {
            CriteriaKind::LessonsCompleted => self.lessons_completed,
            CriteriaKind::QuestionnairesPassed => self.questionnaires_passed,
            CriteriaKind::CoursesCompleted => self.courses_completed,
            CriteriaKind::LoginStreak => self.login_streak,
            CriteriaKind::StudyMinutes => self.study_minutes,
        }
    }
}

/// Number of consecutive login days ending at the most recent one.
pub fn login_streak(mut days: Vec<NaiveDate>) -> i64 {
    days.sort();
    days.dedup();
    let mut streak = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in days.into_iter().rev() {
        match prev {
            Some(p) if day.succ_opt() != Some(p) => break,
            _ => streak += 1,
        }
        prev = Some(day);
    }
    streak
}

/// Achievements whose threshold is now satisfied and that the user has
/// not unlocked yet. Rows with a criteria kind the evaluator doesn't
/// know are skipped.
pub fn due_achievements<'a>(
    snapshot: &ProgressSnapshot,
    achievements: &'a [models::Achievement],
    unlocked: &HashSet<Uuid>,
) -> Vec<&'a models::Achievement> {
    achievements
        .iter()
        .filter(|a| !unlocked.contains(&a.id))
        .filter(|a| match CriteriaKind::parse(&a.criteria) {
            Ok(kind) => snapshot.counter(kind) >= a.threshold,
            Err(_) => {
                warn!("achievement {}: unknown criteria", a.id);
                false
            }
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAchievement {
    pub institution: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub criteria: CriteriaKind,
    pub threshold: i64,
}

pub struct AchievementsApi {
    pool: db::DbConnectionPool,
}

impl AchievementsApi {
    pub fn new(pool: db::DbConnectionPool) -> Self {
        Self { pool }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    pub async fn create(
        &self,
        props: CreateAchievement,
    ) -> Result<models::Achievement, CampusError> {
        if props.threshold <= 0 {
            return Err(CampusError::bad_request(
                "Threshold must be positive",
            ));
        }
        let mut conn = self.connect().await?;
        let new_achievement = models::NewAchievement {
            id: Uuid::new_v4(),
            institution_id: props.institution,
            title: props.title,
            description: props.description,
            criteria: props.criteria.as_str().to_string(),
            threshold: props.threshold,
        };
        diesel::insert_into(schema::achievements::table)
            .values(&new_achievement)
            .returning(models::Achievement::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    /// Institution achievements, or the default templates when no
    /// institution is given.
    pub async fn list(
        &self,
        institution: Option<Uuid>,
    ) -> Result<Vec<models::Achievement>, CampusError> {
        let mut conn = self.connect().await?;
        let query = schema::achievements::table
            .select(models::Achievement::as_select())
            .order(schema::achievements::created_at.asc())
            .into_boxed();
        let query = match institution {
            Some(id) => query
                .filter(schema::achievements::institution_id.eq(id)),
            None => query
                .filter(schema::achievements::institution_id.is_null()),
        };
        query
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }

    /// Copies the default templates into an institution, skipping
    /// titles the institution already has.
    pub async fn copy_defaults(
        &self,
        institution: Uuid,
    ) -> Result<Vec<models::Achievement>, CampusError> {
        let templates = self.list(None).await?;
        let existing: Vec<String> = {
            let mut conn = self.connect().await?;
            schema::achievements::table
                .filter(schema::achievements::institution_id.eq(institution))
                .select(schema::achievements::title)
                .get_results(&mut conn)
                .await
                .map_err(internal_error)?
        };
        let copies: Vec<models::NewAchievement> = templates
            .into_iter()
            .filter(|t| !existing.contains(&t.title))
            .map(|t| models::NewAchievement {
                id: Uuid::new_v4(),
                institution_id: Some(institution),
                title: t.title,
                description: t.description,
                criteria: t.criteria,
                threshold: t.threshold,
            })
            .collect();
        if copies.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connect().await?;
        diesel::insert_into(schema::achievements::table)
            .values(&copies)
            .returning(models::Achievement::as_returning())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }

    /// Achievements the user has unlocked within one institution.
    pub async fn unlocked(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::Achievement>, CampusError> {
        let mut conn = self.connect().await?;
        let unlocked_ids: Vec<Uuid> = schema::user_achievements::table
            .filter(schema::user_achievements::user_id.eq(&user))
            .select(schema::user_achievements::achievement_id)
            .get_results(&mut conn)
            .await
            .map_err(internal_error)?;
        schema::achievements::table
            .filter(schema::achievements::id.eq_any(&unlocked_ids))
            .filter(schema::achievements::institution_id.eq(&institution))
            .select(models::Achievement::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }

    /// Records an event batch and re-evaluates the user's achievements.
    /// Returns achievements unlocked by this call only.
    pub async fn record(
        &self,
        user: Uuid,
        institution: Uuid,
        events: Vec<Event>,
    ) -> Result<Vec<models::Achievement>, CampusError> {
        if !events.is_empty() {
            let today = Utc::now().date_naive();
            let rows: Vec<models::NewActivityEvent> = events
                .into_iter()
                .map(|event| models::NewActivityEvent {
                    id: Uuid::new_v4(),
                    institution_id: institution,
                    user_id: user,
                    kind: event.kind.as_str().to_string(),
                    subject_id: event.subject,
                    amount: event.amount,
                    occurred_on: today,
                })
                .collect();
            let mut conn = self.connect().await?;
            // unique indexes drop a second daily login or course
            // completion for the same day/course
            let _ = diesel::insert_into(schema::activity_events::table)
                .values(&rows)
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .await
                .map_err(internal_error)?;
        }
        self.evaluate(user, institution).await
    }

    /// Evaluates the user's progress against the institution's not yet
    /// unlocked achievements. Each unlock is inserted at most once; a
    /// repeated evaluation for the same state unlocks nothing.
    pub async fn evaluate(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::Achievement>, CampusError> {
        let snapshot = self.snapshot(user, institution).await?;
        let mut conn = self.connect().await?;
        let achievements: Vec<models::Achievement> =
            schema::achievements::table
                .filter(schema::achievements::institution_id.eq(&institution))
                .select(models::Achievement::as_select())
                .get_results(&mut conn)
                .await
                .map_err(internal_error)?;
        let unlocked: HashSet<Uuid> = schema::user_achievements::table
            .filter(schema::user_achievements::user_id.eq(&user))
            .select(schema::user_achievements::achievement_id)
            .get_results::<Uuid>(&mut conn)
            .await
            .map_err(internal_error)?
            .into_iter()
            .collect();

        let mut newly_unlocked = Vec::new();
        for achievement in due_achievements(&snapshot, &achievements, &unlocked)
        {
            let unlock = models::NewUserAchievement {
                id: Uuid::new_v4(),
                achievement_id: achievement.id,
                user_id: user,
            };
            // the unique (achievement, user) index makes the unlock
            // exactly-once even when the same event fires twice
            let num = diesel::insert_into(schema::user_achievements::table)
                .values(&unlock)
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .await
                .map_err(internal_error)?;
            if num != 0 {
                newly_unlocked.push(achievement.clone());
            }
        }
        Ok(newly_unlocked)
    }

    pub async fn snapshot(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<ProgressSnapshot, CampusError> {
        let mut conn = self.connect().await?;
        let lessons_completed: i64 = schema::lesson_completions::table
            .filter(schema::lesson_completions::user_id.eq(&user))
            .filter(
                schema::lesson_completions::institution_id.eq(&institution),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(internal_error)?;
        let questionnaires_passed: i64 =
            schema::questionnaire_submissions::table
                .filter(schema::questionnaire_submissions::user_id.eq(&user))
                .filter(
                    schema::questionnaire_submissions::institution_id
                        .eq(&institution),
                )
                .filter(schema::questionnaire_submissions::passed.eq(true))
                .select(diesel::dsl::count_distinct(
                    schema::questionnaire_submissions::questionnaire_id,
                ))
                .get_result(&mut conn)
                .await
                .map_err(internal_error)?;
        let courses_completed: i64 = schema::activity_events::table
            .filter(schema::activity_events::user_id.eq(&user))
            .filter(schema::activity_events::institution_id.eq(&institution))
            .filter(
                schema::activity_events::kind
                    .eq(EventKind::CourseCompleted.as_str()),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(internal_error)?;
        let study_amounts: Vec<i64> = schema::activity_events::table
            .filter(schema::activity_events::user_id.eq(&user))
            .filter(schema::activity_events::institution_id.eq(&institution))
            .filter(
                schema::activity_events::kind
                    .eq(EventKind::StudyTime.as_str()),
            )
            .select(schema::activity_events::amount)
            .get_results(&mut conn)
            .await
            .map_err(internal_error)?;
        let login_days: Vec<NaiveDate> = schema::activity_events::table
            .filter(schema::activity_events::user_id.eq(&user))
            .filter(schema::activity_events::institution_id.eq(&institution))
            .filter(
                schema::activity_events::kind
                    .eq(EventKind::DailyLogin.as_str()),
            )
            .select(schema::activity_events::occurred_on)
            .order(schema::activity_events::occurred_on.desc())
            .limit(366)
            .get_results(&mut conn)
            .await
            .map_err(internal_error)?;
        Ok(ProgressSnapshot {
            lessons_completed,
            questionnaires_passed,
            courses_completed,
            study_minutes: study_amounts.into_iter().sum(),
            login_streak: login_streak(login_days),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn achievement(
        criteria: CriteriaKind,
        threshold: i64,
    ) -> models::Achievement {
        models::Achievement {
            id: Uuid::new_v4(),
            institution_id: Some(Uuid::new_v4()),
            title: format!("{} {}", criteria.as_str(), threshold),
            description: String::new(),
            criteria: criteria.as_str().to_string(),
            threshold,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn streak_of_empty_history_is_zero() {
        assert_eq!(login_streak(vec![]), 0);
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let days = vec![
            day(2026, 3, 1),
            day(2026, 3, 2),
            day(2026, 3, 3),
        ];
        assert_eq!(login_streak(days), 3);
    }

    #[test]
    fn streak_breaks_on_gap() {
        let days = vec![
            day(2026, 3, 1),
            day(2026, 3, 3),
            day(2026, 3, 4),
        ];
        assert_eq!(login_streak(days), 2);
    }

    #[test]
    fn streak_ignores_duplicate_and_unsorted_days() {
        let days = vec![
            day(2026, 3, 2),
            day(2026, 3, 1),
            day(2026, 3, 2),
        ];
        assert_eq!(login_streak(days), 2);
    }

    #[test]
    fn due_unlocks_at_exact_threshold() {
        let a = achievement(CriteriaKind::LessonsCompleted, 5);
        let snapshot = ProgressSnapshot {
            lessons_completed: 5,
            ..Default::default()
        };
        let list = [a];
        let due = due_achievements(&snapshot, &list, &HashSet::new());
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn due_skips_below_threshold() {
        let a = achievement(CriteriaKind::StudyMinutes, 120);
        let snapshot = ProgressSnapshot {
            study_minutes: 119,
            ..Default::default()
        };
        let list = [a];
        let due = due_achievements(&snapshot, &list, &HashSet::new());
        assert!(due.is_empty());
    }

    #[test]
    fn due_skips_already_unlocked() {
        let a = achievement(CriteriaKind::QuestionnairesPassed, 1);
        let snapshot = ProgressSnapshot {
            questionnaires_passed: 3,
            ..Default::default()
        };
        let unlocked: HashSet<Uuid> = [a.id].into_iter().collect();
        let list = [a];
        let due = due_achievements(&snapshot, &list, &unlocked);
        assert!(due.is_empty());
    }

    #[test]
    fn due_is_empty_after_unlocking_even_if_event_fires_again() {
        // the same progress presented twice must not unlock twice
        let a = achievement(CriteriaKind::LoginStreak, 7);
        let snapshot = ProgressSnapshot {
            login_streak: 10,
            ..Default::default()
        };
        let mut unlocked = HashSet::new();
        let first_list = [a.clone()];
        let first = due_achievements(&snapshot, &first_list, &unlocked);
        assert_eq!(first.len(), 1);
        unlocked.insert(a.id);
        let second_list = [a];
        let second = due_achievements(&snapshot, &second_list, &unlocked);
        assert!(second.is_empty());
    }

    #[test]
    fn due_skips_unknown_criteria() {
        let mut a = achievement(CriteriaKind::LessonsCompleted, 1);
        a.criteria = "perfect_attendance".to_string();
        let snapshot = ProgressSnapshot {
            lessons_completed: 100,
            ..Default::default()
        };
        let list = [a];
        let due = due_achievements(&snapshot, &list, &HashSet::new());
        assert!(due.is_empty());
    }

    #[test]
    fn snapshot_counters_map_to_criteria() {
        let snapshot = ProgressSnapshot {
            lessons_completed: 1,
            questionnaires_passed: 2,
            courses_completed: 3,
            study_minutes: 4,
            login_streak: 5,
        };
        assert_eq!(snapshot.counter(CriteriaKind::LessonsCompleted), 1);
        assert_eq!(snapshot.counter(CriteriaKind::QuestionnairesPassed), 2);
        assert_eq!(snapshot.counter(CriteriaKind::CoursesCompleted), 3);
        assert_eq!(snapshot.counter(CriteriaKind::StudyMinutes), 4);
        assert_eq!(snapshot.counter(CriteriaKind::LoginStreak), 5);
    }
}
