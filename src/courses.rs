use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use crate::achievements::{AchievementsApi, Event};
use crate::db;
use crate::error::{db_error, internal_error, CampusError};
use crate::models;
use crate::schema;
use crate::types::{CompleteLessonResult, CourseTree, LessonTree, ModuleTree};

pub const CONTENT_KINDS: [&str; 4] = ["video", "document", "scorm", "link"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourse {
    pub institution: Uuid,
    pub title: String,
    pub description: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModule {
    pub course: Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLesson {
    pub module: Uuid,
    pub title: String,
    #[serde(default)]
    pub duration_minutes: i32,
    pub position: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContent {
    pub lesson: Uuid,
    pub kind: String,
    pub title: String,
    pub url: String,
    pub position: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivity {
    pub lesson: Uuid,
    pub title: String,
    pub instructions: String,
}

pub struct CoursesApi {
    pool: db::DbConnectionPool,
    achievements: Arc<AchievementsApi>,
}

impl CoursesApi {
    pub fn new(
        pool: db::DbConnectionPool,
        achievements: Arc<AchievementsApi>,
    ) -> Self {
        Self { pool, achievements }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    // Lineage lookups. Relations are id references, resolved with
    // follow-up reads.

    pub async fn get_course(
        &self,
        id: Uuid,
    ) -> Result<models::Course, CampusError> {
        let mut conn = self.connect().await?;
        schema::courses::table
            .find(id)
            .select(models::Course::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Course"))
    }

    pub async fn get_module(
        &self,
        id: Uuid,
    ) -> Result<models::CourseModule, CampusError> {
        let mut conn = self.connect().await?;
        schema::course_modules::table
            .find(id)
            .select(models::CourseModule::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Module"))
    }

    pub async fn get_lesson(
        &self,
        id: Uuid,
    ) -> Result<models::Lesson, CampusError> {
        let mut conn = self.connect().await?;
        schema::lessons::table
            .find(id)
            .select(models::Lesson::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Lesson"))
    }

    pub async fn get_content(
        &self,
        id: Uuid,
    ) -> Result<models::Content, CampusError> {
        let mut conn = self.connect().await?;
        schema::contents::table
            .find(id)
            .select(models::Content::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Content"))
    }

    pub async fn get_activity(
        &self,
        id: Uuid,
    ) -> Result<models::Activity, CampusError> {
        let mut conn = self.connect().await?;
        schema::activities::table
            .find(id)
            .select(models::Activity::as_select())
            .first(&mut conn)
            .await
            .map_err(db_error("Activity"))
    }

    pub async fn course_of_module(
        &self,
        module: Uuid,
    ) -> Result<models::Course, CampusError> {
        let module = self.get_module(module).await?;
        self.get_course(module.course_id).await
    }

    pub async fn course_of_lesson(
        &self,
        lesson: Uuid,
    ) -> Result<models::Course, CampusError> {
        let lesson = self.get_lesson(lesson).await?;
        self.course_of_module(lesson.module_id).await
    }

    pub async fn course_of_content(
        &self,
        content: Uuid,
    ) -> Result<models::Course, CampusError> {
        let content = self.get_content(content).await?;
        self.course_of_lesson(content.lesson_id).await
    }

    pub async fn course_of_activity(
        &self,
        activity: Uuid,
    ) -> Result<models::Course, CampusError> {
        let activity = self.get_activity(activity).await?;
        self.course_of_lesson(activity.lesson_id).await
    }

    // Authoring

    pub async fn create_course(
        &self,
        author: Uuid,
        props: CreateCourse,
    ) -> Result<models::Course, CampusError> {
        let mut conn = self.connect().await?;
        let new_course = models::NewCourse {
            id: Uuid::new_v4(),
            institution_id: props.institution,
            author_id: author,
            title: props.title,
            description: props.description,
        };
        diesel::insert_into(schema::courses::table)
            .values(&new_course)
            .returning(models::Course::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn publish_course(
        &self,
        id: Uuid,
    ) -> Result<models::Course, CampusError> {
        let mut conn = self.connect().await?;
        diesel::update(schema::courses::table)
            .filter(schema::courses::id.eq(&id))
            .set((
                schema::courses::published.eq(true),
                schema::courses::updated_at.eq(Utc::now()),
            ))
            .returning(models::Course::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(db_error("Course"))
    }

    pub async fn add_module(
        &self,
        props: CreateModule,
    ) -> Result<models::CourseModule, CampusError> {
        let mut conn = self.connect().await?;
        let new_module = models::NewCourseModule {
            id: Uuid::new_v4(),
            course_id: props.course,
            title: props.title,
            position: props.position,
        };
        diesel::insert_into(schema::course_modules::table)
            .values(&new_module)
            .returning(models::CourseModule::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn add_lesson(
        &self,
        props: CreateLesson,
    ) -> Result<models::Lesson, CampusError> {
        if props.duration_minutes < 0 {
            return Err(CampusError::bad_request(
                "durationMinutes must not be negative",
            ));
        }
        let mut conn = self.connect().await?;
        let new_lesson = models::NewLesson {
            id: Uuid::new_v4(),
            module_id: props.module,
            title: props.title,
            duration_minutes: props.duration_minutes,
            position: props.position,
        };
        diesel::insert_into(schema::lessons::table)
            .values(&new_lesson)
            .returning(models::Lesson::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn add_content(
        &self,
        props: CreateContent,
    ) -> Result<models::Content, CampusError> {
        if !CONTENT_KINDS.contains(&props.kind.as_str()) {
            return Err(CampusError::bad_request("Unknown content kind"));
        }
        let mut conn = self.connect().await?;
        let new_content = models::NewContent {
            id: Uuid::new_v4(),
            lesson_id: props.lesson,
            kind: props.kind,
            title: props.title,
            url: props.url,
            position: props.position,
        };
        diesel::insert_into(schema::contents::table)
            .values(&new_content)
            .returning(models::Content::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn add_activity(
        &self,
        props: CreateActivity,
    ) -> Result<models::Activity, CampusError> {
        let mut conn = self.connect().await?;
        let new_activity = models::NewActivity {
            id: Uuid::new_v4(),
            lesson_id: props.lesson,
            title: props.title,
            instructions: props.instructions,
        };
        diesel::insert_into(schema::activities::table)
            .values(&new_activity)
            .returning(models::Activity::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    pub async fn list_courses(
        &self,
        institution: Uuid,
        published_only: bool,
    ) -> Result<Vec<models::Course>, CampusError> {
        let mut conn = self.connect().await?;
        let mut query = schema::courses::table
            .select(models::Course::as_select())
            .order(schema::courses::created_at.asc())
            .filter(schema::courses::institution_id.eq(institution))
            .into_boxed();
        if published_only {
            query = query.filter(schema::courses::published.eq(true));
        }
        query
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }

    /// Full course tree, one follow-up read per level.
    pub async fn course_tree(
        &self,
        id: Uuid,
    ) -> Result<CourseTree, CampusError> {
        let course = self.get_course(id).await?;
        let mut conn = self.connect().await?;
        let modules: Vec<models::CourseModule> =
            schema::course_modules::table
                .filter(schema::course_modules::course_id.eq(&id))
                .order(schema::course_modules::position.asc())
                .select(models::CourseModule::as_select())
                .get_results(&mut conn)
                .await
                .map_err(internal_error)?;
        let mut module_trees = Vec::with_capacity(modules.len());
        for module in modules {
            let lessons: Vec<models::Lesson> = schema::lessons::table
                .filter(schema::lessons::module_id.eq(&module.id))
                .order(schema::lessons::position.asc())
                .select(models::Lesson::as_select())
                .get_results(&mut conn)
                .await
                .map_err(internal_error)?;
            let mut lesson_trees = Vec::with_capacity(lessons.len());
            for lesson in lessons {
                let contents: Vec<models::Content> = schema::contents::table
                    .filter(schema::contents::lesson_id.eq(&lesson.id))
                    .order(schema::contents::position.asc())
                    .select(models::Content::as_select())
                    .get_results(&mut conn)
                    .await
                    .map_err(internal_error)?;
                let activities: Vec<models::Activity> =
                    schema::activities::table
                        .filter(schema::activities::lesson_id.eq(&lesson.id))
                        .select(models::Activity::as_select())
                        .get_results(&mut conn)
                        .await
                        .map_err(internal_error)?;
                let questionnaires: Vec<models::Questionnaire> =
                    schema::questionnaires::table
                        .filter(
                            schema::questionnaires::lesson_id.eq(&lesson.id),
                        )
                        .select(models::Questionnaire::as_select())
                        .get_results(&mut conn)
                        .await
                        .map_err(internal_error)?;
                lesson_trees.push(LessonTree {
                    lesson,
                    contents,
                    activities,
                    questionnaires,
                });
            }
            module_trees.push(ModuleTree {
                module,
                lessons: lesson_trees,
            });
        }
        Ok(CourseTree {
            course,
            modules: module_trees,
        })
    }

    pub async fn lesson_ids_of_course(
        &self,
        course: Uuid,
    ) -> Result<Vec<Uuid>, CampusError> {
        let mut conn = self.connect().await?;
        let module_ids: Vec<Uuid> = schema::course_modules::table
            .filter(schema::course_modules::course_id.eq(&course))
            .select(schema::course_modules::id)
            .get_results(&mut conn)
            .await
            .map_err(internal_error)?;
        schema::lessons::table
            .filter(schema::lessons::module_id.eq_any(&module_ids))
            .select(schema::lessons::id)
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }

    /// Marks a lesson completed. Completing twice is a no-op. The
    /// first completion credits study time and, when it closes out
    /// the course, a course completion, then re-evaluates
    /// achievements.
    pub async fn complete_lesson(
        &self,
        user: Uuid,
        lesson_id: Uuid,
    ) -> Result<CompleteLessonResult, CampusError> {
        let lesson = self.get_lesson(lesson_id).await?;
        let course = self.course_of_module(lesson.module_id).await?;

        let completion = models::NewLessonCompletion {
            id: Uuid::new_v4(),
            lesson_id,
            institution_id: course.institution_id,
            user_id: user,
        };
        let num = {
            let mut conn = self.connect().await?;
            diesel::insert_into(schema::lesson_completions::table)
                .values(&completion)
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .await
                .map_err(internal_error)?
        };
        if num == 0 {
            return Ok(CompleteLessonResult {
                newly_completed: false,
                course_completed: false,
                unlocked: Vec::new(),
            });
        }

        let mut events = Vec::new();
        if lesson.duration_minutes > 0 {
            events.push(Event::study_time(
                lesson.id,
                lesson.duration_minutes as i64,
            ));
        }

        let lesson_ids = self.lesson_ids_of_course(course.id).await?;
        let completed: i64 = {
            let mut conn = self.connect().await?;
            schema::lesson_completions::table
                .filter(schema::lesson_completions::user_id.eq(&user))
                .filter(
                    schema::lesson_completions::lesson_id
                        .eq_any(&lesson_ids),
                )
                .count()
                .get_result(&mut conn)
                .await
                .map_err(internal_error)?
        };
        let course_completed = completed == lesson_ids.len() as i64;
        if course_completed {
            events.push(Event::course_completed(course.id));
        }

        let unlocked = self
            .achievements
            .record(user, course.institution_id, events)
            .await?;
        Ok(CompleteLessonResult {
            newly_completed: true,
            course_completed,
            unlocked,
        })
    }

    pub async fn completed_lessons(
        &self,
        user: Uuid,
        course: Uuid,
    ) -> Result<Vec<Uuid>, CampusError> {
        let lesson_ids = self.lesson_ids_of_course(course).await?;
        let mut conn = self.connect().await?;
        schema::lesson_completions::table
            .filter(schema::lesson_completions::user_id.eq(&user))
            .filter(schema::lesson_completions::lesson_id.eq_any(&lesson_ids))
            .select(schema::lesson_completions::lesson_id)
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }
}
