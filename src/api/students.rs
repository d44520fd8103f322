use crate::api::common::{
    created, delete_scoped, ensure_in_school, fetch_scoped, require_non_empty, update_scoped,
};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::role::Role;
use crate::model::student::Student;
use crate::utils::filter::{Filter, Paginated, StudentPage, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const COLUMNS: &str = "id, school_id, class_id, first_name, last_name, grade, roll_number, status";
const UPDATABLE: &[&str] = &[
    "class_id",
    "first_name",
    "last_name",
    "grade",
    "roll_number",
    "status",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateStudent {
    pub school_id: Option<u64>,
    pub class_id: Option<u64>,
    #[schema(example = "Nadia")]
    pub first_name: String,
    #[schema(example = "Karim")]
    pub last_name: String,
    #[schema(example = "Grade 5")]
    pub grade: String,
    #[schema(example = "05-17")]
    pub roll_number: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct StudentQuery {
    pub school_id: Option<u64>,
    pub class_id: Option<u64>,
    pub grade: Option<String>,
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created"),
        (status = 400, description = "Class belongs to another school"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn create_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateStudent>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let school_id = auth.school_for_write(payload.school_id)?;
    require_non_empty("first_name", &payload.first_name)?;
    require_non_empty("grade", &payload.grade)?;

    if let Some(class_id) = payload.class_id {
        ensure_in_school(pool.get_ref(), "classes", class_id, school_id, "Class").await?;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO students (school_id, class_id, first_name, last_name, grade, roll_number)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(school_id)
    .bind(payload.class_id)
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.grade.trim())
    .bind(payload.roll_number.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            AppError::Conflict("Roll number already used in this school".into())
        } else {
            e.into()
        }
    })?;

    Ok(created("Student", result.last_insert_id()))
}

#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Paginated students", body = StudentPage),
        (status = 403, description = "Students cannot list other students")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn list_students(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<StudentQuery>,
) -> AppResult<HttpResponse> {
    if auth.role == Role::Student {
        return Err(AppError::forbidden("Students cannot list other students"));
    }

    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let filter = Filter::new()
        .and_opt("school_id = ?", auth.scoped_school(query.school_id)?)
        .and_opt("class_id = ?", query.class_id)
        .and_opt("grade = ?", query.grade.as_deref())
        .and_opt("status = ?", query.status.as_deref());

    let students: Paginated<Student> = fetch_page(
        pool.get_ref(),
        "students",
        COLUMNS,
        &filter,
        "grade ASC, last_name ASC",
        page,
    )
    .await?;

    Ok(HttpResponse::Ok().json(students))
}

#[utoipa::path(
    get,
    path = "/api/students/{student_id}",
    params(("student_id" = u64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 403, description = "Students may only read their own record"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn get_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let student_id = path.into_inner();
    if auth.role == Role::Student && auth.student_id != Some(student_id) {
        return Err(AppError::forbidden("Students may only read their own record"));
    }

    let student: Student =
        fetch_scoped(pool.get_ref(), &auth, "students", COLUMNS, student_id, "Student").await?;

    Ok(HttpResponse::Ok().json(student))
}

#[utoipa::path(
    put,
    path = "/api/students/{student_id}",
    params(("student_id" = u64, Path, description = "Student ID")),
    request_body(content = Object, description = "Any of: class_id, first_name, last_name, grade, roll_number, status"),
    responses(
        (status = 200, description = "Student updated"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn update_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let student_id = path.into_inner();

    if let Some(class_id) = payload.get("class_id").and_then(Value::as_u64) {
        let student: Student =
            fetch_scoped(pool.get_ref(), &auth, "students", COLUMNS, student_id, "Student").await?;
        ensure_in_school(pool.get_ref(), "classes", class_id, student.school_id, "Class").await?;
    }

    update_scoped(
        pool.get_ref(),
        &auth,
        "students",
        student_id,
        &payload,
        UPDATABLE,
        "Student",
    )
    .await
}

#[utoipa::path(
    delete,
    path = "/api/students/{student_id}",
    params(("student_id" = u64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deleted"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn delete_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    delete_scoped(pool.get_ref(), &auth, "students", path.into_inner(), "Student").await
}
