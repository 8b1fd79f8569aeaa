use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Extension, Json, Router,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use log::trace;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::achievements::{
    AchievementsApi, CreateAchievement, Event, ProgressSnapshot,
};
use crate::actors::chat::{ChatActorMessage, ChatHandle, ConnectMessage};
use crate::certificates::CertificatesApi;
use crate::classes::{ClassesApi, CreateClass, EnrollUser};
use crate::courses::{
    CoursesApi, CreateActivity, CreateContent, CreateCourse, CreateLesson,
    CreateModule,
};
use crate::db;
use crate::error::{internal_error, CampusError};
use crate::feed::FeedApi;
use crate::models;
use crate::protocol::{ErrorCode, RoomErrorMessage, ServerMessage};
use crate::questionnaires::{
    CreateQuestion, CreateQuestionnaire, QuestionnairesApi,
};
use crate::roles::{AccessApi, MemberChange, MemberRemove, Permission};
use crate::schema;
use crate::seed::{SeedApi, SeedData};
use crate::submissions::{ReviewDecision, SubmissionsApi};
use crate::types::{LoginResult, UserProfile};

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u32 {
    3000
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampusConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u32,
    pub api_token: String,
    pub seed_token: String,
    pub auth_url: Option<String>,
    pub db: db::DbConfig,
}

/// Identity resolved from the session token, attached to the request
/// by the auth middleware.
#[derive(Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[derive(Clone)]
pub struct Campus {
    pool: db::DbConnectionPool,
    access: Arc<AccessApi>,
    achievements: Arc<AchievementsApi>,
    questionnaires: Arc<QuestionnairesApi>,
    submissions: Arc<SubmissionsApi>,
    courses: Arc<CoursesApi>,
    certificates: Arc<CertificatesApi>,
    feed: Arc<FeedApi>,
    classes: Arc<ClassesApi>,
    seed: Arc<SeedApi>,
    chat: ChatHandle,
    host: String,
    port: u32,
    api_token: String,
    seed_token: String,
    auth_url: Option<String>,
}

impl Campus {
    pub async fn new(config: CampusConfig) -> Self {
        let pool = db::create_pool(config.db).await;
        let access = Arc::new(AccessApi::new(pool.clone()));
        let achievements = Arc::new(AchievementsApi::new(pool.clone()));
        let questionnaires = Arc::new(QuestionnairesApi::new(
            pool.clone(),
            achievements.clone(),
        ));
        let courses =
            Arc::new(CoursesApi::new(pool.clone(), achievements.clone()));
        let certificates =
            Arc::new(CertificatesApi::new(pool.clone(), courses.clone()));
        let chat = ChatHandle::new(pool.clone(), access.clone());
        Self {
            submissions: Arc::new(SubmissionsApi::new(pool.clone())),
            feed: Arc::new(FeedApi::new(pool.clone())),
            classes: Arc::new(ClassesApi::new(pool.clone())),
            seed: Arc::new(SeedApi::new(pool.clone())),
            pool,
            access,
            achievements,
            questionnaires,
            courses,
            certificates,
            chat,
            host: config.host,
            port: config.port,
            api_token: config.api_token,
            seed_token: config.seed_token,
            auth_url: config.auth_url,
        }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    /// Resolves a session token to a user id through the external
    /// auth provider. Without a provider the token itself must be the
    /// user id.
    async fn auth(&self, token: &str) -> Result<Uuid, CampusError> {
        match &self.auth_url {
            Some(auth_url) => {
                let url = "".to_string() + auth_url + token;
                let req = reqwest::Client::new()
                    .post(url)
                    .body("".to_string())
                    .send()
                    .await
                    .map_err(internal_error)?;
                if req.status() != reqwest::StatusCode::OK {
                    return Err(CampusError::auth_failed(
                        "Authentication failed",
                    ));
                }
                let Ok(user) = req.text().await else {
                    return Err(CampusError::auth_failed(
                        "Authentication failed",
                    ));
                };
                Uuid::parse_str(user.trim()).map_err(|_| {
                    CampusError::auth_failed("Authentication failed")
                })
            }
            None => Uuid::parse_str(token).map_err(|_| {
                CampusError::auth_failed("Invalid session token")
            }),
        }
    }

    // Institutions & users

    async fn create_institution(
        &self,
        name: String,
    ) -> Result<models::Institution, CampusError> {
        let mut conn = self.connect().await?;
        let new_institution = models::NewInstitution {
            id: Uuid::new_v4(),
            name,
        };
        diesel::insert_into(schema::institutions::table)
            .values(&new_institution)
            .returning(models::Institution::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    async fn get_institution(
        &self,
        id: Uuid,
    ) -> Result<models::Institution, CampusError> {
        let mut conn = self.connect().await?;
        schema::institutions::table
            .find(id)
            .select(models::Institution::as_select())
            .first(&mut conn)
            .await
            .map_err(|err| match err {
                diesel::NotFound => {
                    CampusError::not_found("Institution not found")
                }
                err => CampusError::internal(&err.to_string()),
            })
    }

    async fn create_user(
        &self,
        props: CreateUserBody,
    ) -> Result<models::User, CampusError> {
        let mut conn = self.connect().await?;
        let new_user = models::NewUser {
            id: Uuid::new_v4(),
            name: props.name,
            email: props.email,
        };
        diesel::insert_into(schema::users::table)
            .values(&new_user)
            .returning(models::User::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| match err {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => CampusError::unprocessable("Email already registered"),
                err => internal_error(err),
            })
    }

    async fn get_user_profile(
        &self,
        id: Uuid,
    ) -> Result<UserProfile, CampusError> {
        let mut conn = self.connect().await?;
        let user = schema::users::table
            .find(id)
            .select(models::User::as_select())
            .first(&mut conn)
            .await
            .map_err(|err| match err {
                diesel::NotFound => CampusError::not_found("User not found"),
                err => CampusError::internal(&err.to_string()),
            })?;
        let memberships = self.access.memberships(id).await?;
        Ok(UserProfile { user, memberships })
    }

    async fn create_chat_room(
        &self,
        props: CreateRoomBody,
    ) -> Result<models::ChatRoom, CampusError> {
        // room must belong to an existing institution
        let _ = self.get_institution(props.institution).await?;
        let mut conn = self.connect().await?;
        let new_room = models::NewChatRoom {
            id: Uuid::new_v4(),
            institution_id: props.institution,
            name: props.name,
        };
        diesel::insert_into(schema::chat_rooms::table)
            .values(&new_room)
            .returning(models::ChatRoom::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)
    }

    // Session operations

    /// Daily login: one streak credit per calendar day, then a fresh
    /// achievement evaluation.
    async fn login(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<LoginResult, CampusError> {
        self.access.role(user, institution).await?;
        let unlocked = self
            .achievements
            .record(user, institution, vec![Event::daily_login()])
            .await?;
        let snapshot = self.achievements.snapshot(user, institution).await?;
        Ok(LoginResult {
            streak: snapshot.login_streak,
            unlocked,
        })
    }

    async fn progress(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<ProgressSnapshot, CampusError> {
        self.access.require(user, institution, Permission::Study).await?;
        self.achievements.snapshot(user, institution).await
    }

    // Courses

    async fn list_courses(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::Course>, CampusError> {
        let role = self
            .access
            .require(user, institution, Permission::Study)
            .await?;
        let published_only = !role.allows(Permission::AuthorCourses);
        self.courses.list_courses(institution, published_only).await
    }

    async fn get_course_tree(
        &self,
        user: Uuid,
        id: Uuid,
    ) -> Result<crate::types::CourseTree, CampusError> {
        let course = self.courses.get_course(id).await?;
        let role = self
            .access
            .require(user, course.institution_id, Permission::Study)
            .await?;
        if !course.published && !role.allows(Permission::AuthorCourses) {
            return Err(CampusError::not_found("Course not found"));
        }
        self.courses.course_tree(id).await
    }

    async fn create_course(
        &self,
        user: Uuid,
        props: CreateCourse,
    ) -> Result<models::Course, CampusError> {
        self.access
            .require(user, props.institution, Permission::AuthorCourses)
            .await?;
        self.courses.create_course(user, props).await
    }

    async fn publish_course(
        &self,
        user: Uuid,
        id: Uuid,
    ) -> Result<models::Course, CampusError> {
        let course = self.courses.get_course(id).await?;
        self.access
            .require(user, course.institution_id, Permission::AuthorCourses)
            .await?;
        self.courses.publish_course(id).await
    }

    async fn add_module(
        &self,
        user: Uuid,
        props: CreateModule,
    ) -> Result<models::CourseModule, CampusError> {
        let course = self.courses.get_course(props.course).await?;
        self.access
            .require(user, course.institution_id, Permission::AuthorCourses)
            .await?;
        self.courses.add_module(props).await
    }

    async fn add_lesson(
        &self,
        user: Uuid,
        props: CreateLesson,
    ) -> Result<models::Lesson, CampusError> {
        let course = self.courses.course_of_module(props.module).await?;
        self.access
            .require(user, course.institution_id, Permission::AuthorCourses)
            .await?;
        self.courses.add_lesson(props).await
    }

    async fn add_content(
        &self,
        user: Uuid,
        props: CreateContent,
    ) -> Result<models::Content, CampusError> {
        let course = self.courses.course_of_lesson(props.lesson).await?;
        self.access
            .require(user, course.institution_id, Permission::AuthorCourses)
            .await?;
        self.courses.add_content(props).await
    }

    async fn add_activity(
        &self,
        user: Uuid,
        props: CreateActivity,
    ) -> Result<models::Activity, CampusError> {
        let course = self.courses.course_of_lesson(props.lesson).await?;
        self.access
            .require(user, course.institution_id, Permission::AuthorCourses)
            .await?;
        self.courses.add_activity(props).await
    }

    async fn complete_lesson(
        &self,
        user: Uuid,
        lesson: Uuid,
    ) -> Result<crate::types::CompleteLessonResult, CampusError> {
        let course = self.courses.course_of_lesson(lesson).await?;
        self.access
            .require(user, course.institution_id, Permission::Study)
            .await?;
        self.courses.complete_lesson(user, lesson).await
    }

    // Questionnaires

    async fn create_questionnaire(
        &self,
        user: Uuid,
        props: CreateQuestionnaire,
    ) -> Result<models::Questionnaire, CampusError> {
        let course = self.courses.course_of_lesson(props.lesson).await?;
        self.access
            .require(user, course.institution_id, Permission::AuthorCourses)
            .await?;
        self.questionnaires.create(props).await
    }

    async fn add_question(
        &self,
        user: Uuid,
        props: CreateQuestion,
    ) -> Result<models::Question, CampusError> {
        let questionnaire =
            self.questionnaires.get(props.questionnaire).await?;
        let course = self
            .courses
            .course_of_lesson(questionnaire.lesson_id)
            .await?;
        self.access
            .require(user, course.institution_id, Permission::AuthorCourses)
            .await?;
        self.questionnaires.add_question(props).await
    }

    async fn get_questionnaire(
        &self,
        user: Uuid,
        id: Uuid,
    ) -> Result<crate::types::QuestionnaireView, CampusError> {
        let questionnaire = self.questionnaires.get(id).await?;
        let course = self
            .courses
            .course_of_lesson(questionnaire.lesson_id)
            .await?;
        self.access
            .require(user, course.institution_id, Permission::Study)
            .await?;
        self.questionnaires.view(user, id).await
    }

    async fn submit_questionnaire(
        &self,
        user: Uuid,
        props: SubmitQuestionnaireBody,
    ) -> Result<crate::types::SubmitQuestionnaireResult, CampusError> {
        let questionnaire = self.questionnaires.get(props.id).await?;
        let course = self
            .courses
            .course_of_lesson(questionnaire.lesson_id)
            .await?;
        self.access
            .require(user, course.institution_id, Permission::Study)
            .await?;
        self.questionnaires
            .submit(user, course.institution_id, props.id, props.answers)
            .await
    }

    // Activity submissions

    async fn submit_activity(
        &self,
        user: Uuid,
        props: SubmitActivityBody,
    ) -> Result<models::ActivitySubmission, CampusError> {
        let course = self.courses.course_of_activity(props.activity).await?;
        self.access
            .require(user, course.institution_id, Permission::Study)
            .await?;
        self.submissions
            .submit(user, course.institution_id, props.activity, props.file_url)
            .await
    }

    async fn review_submission(
        &self,
        user: Uuid,
        props: ReviewSubmissionBody,
    ) -> Result<models::ActivitySubmission, CampusError> {
        let submission = self.submissions.get(props.id).await?;
        self.access
            .require(
                user,
                submission.institution_id,
                Permission::ReviewSubmissions,
            )
            .await?;
        self.submissions
            .review(user, props.id, props.decision, props.feedback)
            .await
    }

    async fn list_pending_submissions(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::ActivitySubmission>, CampusError> {
        self.access
            .require(user, institution, Permission::ReviewSubmissions)
            .await?;
        self.submissions.pending(institution).await
    }

    async fn my_submissions(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::ActivitySubmission>, CampusError> {
        self.access.require(user, institution, Permission::Study).await?;
        self.submissions.for_user(user, institution).await
    }

    // Certificates

    async fn issue_certificate(
        &self,
        user: Uuid,
        course_id: Uuid,
    ) -> Result<models::Certificate, CampusError> {
        let course = self.courses.get_course(course_id).await?;
        self.access
            .require(user, course.institution_id, Permission::Study)
            .await?;
        self.certificates.issue(user, course_id).await
    }

    async fn get_certificate(
        &self,
        user: Uuid,
        id: Uuid,
    ) -> Result<models::Certificate, CampusError> {
        let certificate = self.certificates.get(id).await?;
        self.access.role(user, certificate.institution_id).await?;
        Ok(certificate)
    }

    async fn my_certificates(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::Certificate>, CampusError> {
        self.access.require(user, institution, Permission::Study).await?;
        self.certificates.for_user(user, institution).await
    }

    // Feed

    async fn create_post(
        &self,
        user: Uuid,
        props: CreatePostBody,
    ) -> Result<models::Post, CampusError> {
        self.access
            .require(user, props.institution, Permission::PostToFeed)
            .await?;
        self.feed.create_post(user, props.institution, props.body).await
    }

    async fn get_post(
        &self,
        user: Uuid,
        id: Uuid,
    ) -> Result<crate::types::PostView, CampusError> {
        let post = self.feed.get_post(id).await?;
        self.access.role(user, post.institution_id).await?;
        self.feed.post_view(id).await
    }

    async fn list_feed(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::Post>, CampusError> {
        self.access.role(user, institution).await?;
        self.feed.feed(institution).await
    }

    async fn create_comment(
        &self,
        user: Uuid,
        props: CreateCommentBody,
    ) -> Result<models::Comment, CampusError> {
        let post = self.feed.get_post(props.post).await?;
        self.access
            .require(user, post.institution_id, Permission::PostToFeed)
            .await?;
        self.feed.create_comment(user, props.post, props.body).await
    }

    /// Authors may remove their own posts, moderators any post.
    async fn delete_post(
        &self,
        user: Uuid,
        id: Uuid,
    ) -> Result<(), CampusError> {
        let post = self.feed.get_post(id).await?;
        if post.author_id != user {
            self.access
                .require(user, post.institution_id, Permission::ModerateFeed)
                .await?;
        }
        self.feed.delete_post(id).await
    }

    // Classes

    async fn create_class(
        &self,
        user: Uuid,
        props: CreateClass,
    ) -> Result<models::Class, CampusError> {
        self.access
            .require(user, props.institution, Permission::ManageClasses)
            .await?;
        let course = self.courses.get_course(props.course).await?;
        if course.institution_id != props.institution {
            return Err(CampusError::unprocessable(
                "Course belongs to another institution",
            ));
        }
        self.classes.create(props).await
    }

    async fn get_class(
        &self,
        user: Uuid,
        id: Uuid,
    ) -> Result<crate::types::ClassView, CampusError> {
        let class = self.classes.get(id).await?;
        self.access.role(user, class.institution_id).await?;
        self.classes.view(id).await
    }

    async fn enroll(
        &self,
        user: Uuid,
        props: EnrollUser,
    ) -> Result<(), CampusError> {
        let class = self.classes.get(props.class).await?;
        self.access
            .require(user, class.institution_id, Permission::ManageClasses)
            .await?;
        // the enrollee has to be a member too
        self.access.role(props.user, class.institution_id).await.map_err(
            |_| {
                CampusError::unprocessable(
                    "User is not a member of the institution",
                )
            },
        )?;
        self.classes.enroll(props).await
    }

    async fn list_classes(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::Class>, CampusError> {
        self.access.role(user, institution).await?;
        self.classes.list(institution).await
    }

    // Achievements

    async fn list_achievements(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::Achievement>, CampusError> {
        self.access.role(user, institution).await?;
        self.achievements.list(Some(institution)).await
    }

    async fn my_achievements(
        &self,
        user: Uuid,
        institution: Uuid,
    ) -> Result<Vec<models::Achievement>, CampusError> {
        self.access.role(user, institution).await?;
        self.achievements.unlocked(user, institution).await
    }

    // Scorm proxy

    /// Relays one asset of a scorm package from its upstream origin.
    async fn scorm_asset(
        &self,
        user: Uuid,
        content_id: Uuid,
        path: String,
    ) -> Result<(String, Vec<u8>), CampusError> {
        let content = self.courses.get_content(content_id).await?;
        if content.kind != "scorm" {
            return Err(CampusError::bad_request("Not a scorm content"));
        }
        let course = self.courses.course_of_lesson(content.lesson_id).await?;
        self.access
            .require(user, course.institution_id, Permission::Study)
            .await?;

        let url = format!(
            "{}/{}",
            content.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let res = reqwest::Client::new()
            .get(url)
            .send()
            .await
            .map_err(internal_error)?;
        if !res.status().is_success() {
            return Err(CampusError::not_found("Asset not found"));
        }
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = res.bytes().await.map_err(internal_error)?;
        Ok((content_type, body.to_vec()))
    }

    fn app(&self) -> Router {
        let admin_router = Router::new()
            .route("/create_institution", post(create_institution))
            .route("/get_institution", post(get_institution))
            .route("/create_user", post(create_user))
            .route("/get_user", post(get_user))
            // Memberships
            .route("/add_member", post(add_member))
            .route("/update_member_role", post(update_member_role))
            .route("/remove_member", post(remove_member))
            .route(
                "/remove_user_from_all_institutions",
                post(remove_user_from_all_institutions),
            )
            .route("/list_members", post(list_members))
            // Achievement templates
            .route("/create_achievement", post(create_achievement))
            .route(
                "/list_default_achievements",
                post(list_default_achievements),
            )
            .route(
                "/copy_default_achievements",
                post(copy_default_achievements),
            )
            // Chat
            .route("/create_chat_room", post(create_chat_room))
            .layer(middleware::from_fn_with_state(
                self.clone(),
                check_api_token,
            ))
            .with_state(self.clone());

        let session_router = Router::new()
            .route("/login", post(login))
            .route("/profile", post(profile))
            .route("/progress", post(progress))
            // Courses
            .route("/list_courses", post(list_courses))
            .route("/get_course", post(get_course))
            .route("/create_course", post(create_course))
            .route("/publish_course", post(publish_course))
            .route("/add_module", post(add_module))
            .route("/add_lesson", post(add_lesson))
            .route("/add_content", post(add_content))
            .route("/add_activity", post(add_activity))
            .route("/complete_lesson", post(complete_lesson))
            // Questionnaires
            .route("/create_questionnaire", post(create_questionnaire))
            .route("/add_question", post(add_question))
            .route("/get_questionnaire", post(get_questionnaire))
            .route("/submit_questionnaire", post(submit_questionnaire))
            // Activity submissions
            .route("/submit_activity", post(submit_activity))
            .route("/review_submission", post(review_submission))
            .route(
                "/list_pending_submissions",
                post(list_pending_submissions),
            )
            .route("/my_submissions", post(my_submissions))
            // Certificates
            .route("/issue_certificate", post(issue_certificate))
            .route("/get_certificate", post(get_certificate))
            .route("/my_certificates", post(my_certificates))
            // Feed
            .route("/create_post", post(create_post))
            .route("/get_post", post(get_post))
            .route("/list_feed", post(list_feed))
            .route("/create_comment", post(create_comment))
            .route("/delete_post", post(delete_post))
            // Classes
            .route("/create_class", post(create_class))
            .route("/get_class", post(get_class))
            .route("/enroll", post(enroll))
            .route("/list_classes", post(list_classes))
            // Achievements
            .route("/list_achievements", post(list_achievements))
            .route("/my_achievements", post(my_achievements))
            // Scorm proxy
            .route("/scorm/:content/*path", get(scorm_asset))
            .layer(middleware::from_fn_with_state(
                self.clone(),
                authenticate,
            ))
            .with_state(self.clone());

        Router::new()
            .route("/", get(root))
            .route("/chat", any(chat_handler))
            .route("/seed", post(seed))
            .merge(admin_router)
            .merge(session_router)
            .with_state(self.clone())
    }

    pub async fn run(&self) {
        let conn = self.connect().await.unwrap();
        db::run_migrations(deadpool::managed::Object::take(conn))
            .await
            .unwrap();

        let app = self.app();
        let host = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(host).await.unwrap();
        axum::serve(listener, app).await.unwrap();
    }

    async fn handle_chat_connect(
        &self,
        mut websocket: WebSocket,
        query: ChatQuery,
    ) {
        let user = match self.auth(&query.token).await {
            Ok(user) => {
                trace!("campus: authorized chat client as {}", user);
                user
            }
            Err(err) => {
                let msg = ServerMessage::RoomError(RoomErrorMessage {
                    room: query.room,
                    code: err.code,
                });
                let Ok(str_msg) = serde_json::to_string(&msg) else {
                    return;
                };
                _ = websocket.send(Message::Text(str_msg)).await;
                return;
            }
        };
        self.chat.send(ChatActorMessage::Connect(ConnectMessage {
            websocket,
            user,
            room: query.room,
            since: query.since,
        }));
    }
}

async fn root() -> &'static str {
    "Campus api"
}

// Websocket handler

#[derive(Deserialize)]
struct ChatQuery {
    room: Uuid,
    #[serde(default)]
    since: i64,
    token: String,
}

async fn chat_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ChatQuery>,
    State(campus): State<Campus>,
) -> Response {
    ws.on_upgrade(move |ws| handle_chat_connect(campus, ws, query))
}

async fn handle_chat_connect(
    campus: Campus,
    websocket: WebSocket,
    query: ChatQuery,
) {
    campus.handle_chat_connect(websocket, query).await;
}

// Auth middlewares

fn get_header_value(req: &Request, header: &str) -> Option<String> {
    let header_value = req.headers().get(header)?;
    if let Ok(str) = header_value.to_str() {
        Some(str.to_string())
    } else {
        None
    }
}

async fn check_api_token(
    State(state): State<Campus>,
    req: Request,
    next: Next,
) -> Response {
    let header = get_header_value(&req, "x-campus-api-token");
    if Some(state.api_token) == header {
        next.run(req).await
    } else {
        campus_err_response(CampusError::auth_failed(
            "Invalid authorization token",
        ))
    }
}

async fn authenticate(
    State(state): State<Campus>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = get_header_value(&req, "x-campus-token") else {
        return campus_err_response(CampusError::auth_failed(
            "Session token is required",
        ));
    };
    match state.auth(&token).await {
        Ok(user) => {
            req.extensions_mut().insert(AuthUser(user));
            next.run(req).await
        }
        Err(err) => campus_err_response(err),
    }
}

// Api response helpers

#[derive(Serialize)]
struct CampusErrorBody {
    error: CampusError,
}

fn campus_err_response(error: CampusError) -> Response {
    let status = match error.code {
        ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
        ErrorCode::AuthFailed => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::UnprocessableContent => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = Json(CampusErrorBody { error });
    (status, body).into_response()
}

fn campus_response<T>(result: Result<T, CampusError>) -> Response
where
    T: Serialize,
{
    match result {
        Ok(res) => Json(res).into_response(),
        Err(err) => campus_err_response(err),
    }
}

// Request payloads

#[derive(Deserialize)]
struct Id {
    id: Uuid,
}

#[derive(Deserialize)]
struct InstitutionRef {
    institution: Uuid,
}

#[derive(Deserialize)]
struct CreateInstitutionBody {
    name: String,
}

#[derive(Deserialize)]
struct CreateUserBody {
    name: String,
    email: String,
}

#[derive(Deserialize)]
struct CreateRoomBody {
    institution: Uuid,
    name: String,
}

#[derive(Deserialize)]
struct SubmitQuestionnaireBody {
    id: Uuid,
    answers: Vec<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitActivityBody {
    activity: Uuid,
    file_url: String,
}

#[derive(Deserialize)]
struct ReviewSubmissionBody {
    id: Uuid,
    decision: ReviewDecision,
    feedback: Option<String>,
}

#[derive(Deserialize)]
struct CreatePostBody {
    institution: Uuid,
    body: String,
}

#[derive(Deserialize)]
struct CreateCommentBody {
    post: Uuid,
    body: String,
}

// Admin handlers

async fn create_institution(
    State(state): State<Campus>,
    Json(payload): Json<CreateInstitutionBody>,
) -> Response {
    let res = state.create_institution(payload.name).await;
    campus_response(res)
}

async fn get_institution(
    State(state): State<Campus>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.get_institution(payload.id).await;
    campus_response(res)
}

async fn create_user(
    State(state): State<Campus>,
    Json(payload): Json<CreateUserBody>,
) -> Response {
    let res = state.create_user(payload).await;
    campus_response(res)
}

async fn get_user(
    State(state): State<Campus>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.get_user_profile(payload.id).await;
    campus_response(res)
}

async fn add_member(
    State(state): State<Campus>,
    Json(payload): Json<MemberChange>,
) -> Response {
    let res = state.access.add_member(payload).await;
    campus_response(res)
}

async fn update_member_role(
    State(state): State<Campus>,
    Json(payload): Json<MemberChange>,
) -> Response {
    let res = state.access.update_role(payload).await;
    campus_response(res)
}

async fn remove_member(
    State(state): State<Campus>,
    Json(payload): Json<MemberRemove>,
) -> Response {
    let res = state.access.remove_member(payload).await;
    campus_response(res)
}

async fn remove_user_from_all_institutions(
    State(state): State<Campus>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.access.remove_user_everywhere(payload.id).await;
    campus_response(res)
}

async fn list_members(
    State(state): State<Campus>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.access.list_members(payload.id).await;
    campus_response(res)
}

async fn create_achievement(
    State(state): State<Campus>,
    Json(payload): Json<CreateAchievement>,
) -> Response {
    let res = state.achievements.create(payload).await;
    campus_response(res)
}

async fn list_default_achievements(State(state): State<Campus>) -> Response {
    let res = state.achievements.list(None).await;
    campus_response(res)
}

async fn copy_default_achievements(
    State(state): State<Campus>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.achievements.copy_defaults(payload.id).await;
    campus_response(res)
}

async fn create_chat_room(
    State(state): State<Campus>,
    Json(payload): Json<CreateRoomBody>,
) -> Response {
    let res = state.create_chat_room(payload).await;
    campus_response(res)
}

// Seeding handler, gated by the seeding secret instead of the admin
// api token

async fn seed(
    State(state): State<Campus>,
    req: Request,
) -> Response {
    let bearer = get_header_value(&req, "authorization")
        .and_then(|value| value.strip_prefix("Bearer ").map(String::from));
    if bearer.as_deref() != Some(state.seed_token.as_str()) {
        return campus_err_response(CampusError::auth_failed(
            "Invalid seeding token",
        ));
    }
    let bytes = match axum::body::to_bytes(req.into_body(), usize::MAX).await
    {
        Ok(bytes) => bytes,
        Err(_) => {
            return campus_err_response(CampusError::bad_request(
                "Couldn't read request body",
            ))
        }
    };
    let data = match serde_json::from_slice::<SeedData>(&bytes) {
        Ok(data) => data,
        Err(err) => {
            return campus_err_response(CampusError::bad_request(
                &err.to_string(),
            ))
        }
    };
    let res = state.seed.seed(data).await;
    campus_response(res)
}

// Session handlers

async fn login(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state.login(user, payload.institution).await;
    campus_response(res)
}

async fn profile(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Response {
    let res = state.get_user_profile(user).await;
    campus_response(res)
}

async fn progress(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state.progress(user, payload.institution).await;
    campus_response(res)
}

// Course handlers

async fn list_courses(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state.list_courses(user, payload.institution).await;
    campus_response(res)
}

async fn get_course(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.get_course_tree(user, payload.id).await;
    campus_response(res)
}

async fn create_course(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateCourse>,
) -> Response {
    let res = state.create_course(user, payload).await;
    campus_response(res)
}

async fn publish_course(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.publish_course(user, payload.id).await;
    campus_response(res)
}

async fn add_module(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateModule>,
) -> Response {
    let res = state.add_module(user, payload).await;
    campus_response(res)
}

async fn add_lesson(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateLesson>,
) -> Response {
    let res = state.add_lesson(user, payload).await;
    campus_response(res)
}

async fn add_content(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateContent>,
) -> Response {
    let res = state.add_content(user, payload).await;
    campus_response(res)
}

async fn add_activity(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateActivity>,
) -> Response {
    let res = state.add_activity(user, payload).await;
    campus_response(res)
}

async fn complete_lesson(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.complete_lesson(user, payload.id).await;
    campus_response(res)
}

// Questionnaire handlers

async fn create_questionnaire(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateQuestionnaire>,
) -> Response {
    let res = state.create_questionnaire(user, payload).await;
    campus_response(res)
}

async fn add_question(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateQuestion>,
) -> Response {
    let res = state.add_question(user, payload).await;
    campus_response(res)
}

async fn get_questionnaire(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.get_questionnaire(user, payload.id).await;
    campus_response(res)
}

async fn submit_questionnaire(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<SubmitQuestionnaireBody>,
) -> Response {
    let res = state.submit_questionnaire(user, payload).await;
    campus_response(res)
}

// Activity submission handlers

async fn submit_activity(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<SubmitActivityBody>,
) -> Response {
    let res = state.submit_activity(user, payload).await;
    campus_response(res)
}

async fn review_submission(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<ReviewSubmissionBody>,
) -> Response {
    let res = state.review_submission(user, payload).await;
    campus_response(res)
}

async fn list_pending_submissions(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state
        .list_pending_submissions(user, payload.institution)
        .await;
    campus_response(res)
}

async fn my_submissions(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state.my_submissions(user, payload.institution).await;
    campus_response(res)
}

// Certificate handlers

async fn issue_certificate(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CourseRef>,
) -> Response {
    let res = state.issue_certificate(user, payload.course).await;
    campus_response(res)
}

#[derive(Deserialize)]
struct CourseRef {
    course: Uuid,
}

async fn get_certificate(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.get_certificate(user, payload.id).await;
    campus_response(res)
}

async fn my_certificates(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state.my_certificates(user, payload.institution).await;
    campus_response(res)
}

// Feed handlers

async fn create_post(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreatePostBody>,
) -> Response {
    let res = state.create_post(user, payload).await;
    campus_response(res)
}

async fn get_post(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.get_post(user, payload.id).await;
    campus_response(res)
}

async fn list_feed(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state.list_feed(user, payload.institution).await;
    campus_response(res)
}

async fn create_comment(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateCommentBody>,
) -> Response {
    let res = state.create_comment(user, payload).await;
    campus_response(res)
}

async fn delete_post(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.delete_post(user, payload.id).await;
    campus_response(res)
}

// Class handlers

async fn create_class(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateClass>,
) -> Response {
    let res = state.create_class(user, payload).await;
    campus_response(res)
}

async fn get_class(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<Id>,
) -> Response {
    let res = state.get_class(user, payload.id).await;
    campus_response(res)
}

async fn enroll(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<EnrollUser>,
) -> Response {
    let res = state.enroll(user, payload).await;
    campus_response(res)
}

async fn list_classes(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state.list_classes(user, payload.institution).await;
    campus_response(res)
}

// Achievement handlers

async fn list_achievements(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state.list_achievements(user, payload.institution).await;
    campus_response(res)
}

async fn my_achievements(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<InstitutionRef>,
) -> Response {
    let res = state.my_achievements(user, payload.institution).await;
    campus_response(res)
}

// Scorm proxy handler

async fn scorm_asset(
    State(state): State<Campus>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path((content, path)): Path<(Uuid, String)>,
) -> Response {
    match state.scorm_asset(user, content, path).await {
        Ok((content_type, body)) => {
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(err) => campus_err_response(err),
    }
}
