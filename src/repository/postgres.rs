use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    Pagination, Post, PostChanges, PostFilter, Student, StudentChanges, StudentFilter, Teacher,
    TeacherChanges, TeacherFilter,
};

const POST_COLUMNS: &str = "id, title, content, author, subject";

const TEACHER_COLUMNS: &str = "id, name, email, national_id, registration, password_hash, \
     subject, phone, birth_date, created_at, updated_at";

const STUDENT_COLUMNS: &str = "id, name, email, national_id, registration, password_hash, \
     class_group, phone, birth_date, created_at, updated_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL. All
/// queries are runtime-checked (`query_as::<_, T>`), so building the crate does not
/// need a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique-constraint name from `migrations/0001_init.sql` to the wire field it guards.
fn unique_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.ends_with("_email_key") => "email",
        Some(c) if c.ends_with("_national_id_key") => "cpf",
        Some(c) if c.ends_with("_registration_key") => "matricula",
        _ => "unique field",
    }
}

fn map_db_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Duplicate(unique_field(db.constraint()));
        }
    }
    RepositoryError::Database(err)
}

/// Appends `AND <column> = $n` for a present exact-match filter.
fn push_eq(builder: &mut QueryBuilder<'_, Postgres>, column: &str, value: &Option<String>) {
    if let Some(v) = value {
        builder.push(format!(" AND {column} = "));
        builder.push_bind(v.clone());
    }
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: Pagination) {
    builder.push(" ORDER BY created_at ASC LIMIT ");
    builder.push_bind(i64::from(page.limit));
    builder.push(" OFFSET ");
    builder.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Credential Store ---

    async fn find_teacher_by_email(&self, email: &str) -> RepoResult<Option<Teacher>> {
        sqlx::query_as::<_, Teacher>(&format!(
            "SELECT {TEACHER_COLUMNS} FROM teachers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn find_student_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    // --- Posts ---

    async fn list_posts(&self, filter: &PostFilter, page: Pagination) -> RepoResult<Vec<Post>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE TRUE"));
        push_eq(&mut builder, "author", &filter.author);
        push_eq(&mut builder, "subject", &filter.subject);
        push_page(&mut builder, page);

        builder
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_post(&self, id: &str) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn create_post(&self, post: Post) -> RepoResult<Post> {
        sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (id, title, content, author, subject) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {POST_COLUMNS}"
        ))
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.author)
        .bind(&post.subject)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    /// update_post
    ///
    /// COALESCE keeps every column whose change is `None`.
    async fn update_post(&self, id: &str, changes: PostChanges) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts SET \
                title = COALESCE($2, title), \
                content = COALESCE($3, content), \
                author = COALESCE($4, author), \
                subject = COALESCE($5, subject) \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.author)
        .bind(changes.subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_post(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    // --- Teachers ---

    async fn list_teachers(
        &self,
        filter: &TeacherFilter,
        page: Pagination,
    ) -> RepoResult<Vec<Teacher>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE TRUE"));
        push_eq(&mut builder, "name", &filter.name);
        push_eq(&mut builder, "email", &filter.email);
        push_eq(&mut builder, "registration", &filter.registration);
        push_eq(&mut builder, "subject", &filter.subject);
        push_page(&mut builder, page);

        builder
            .build_query_as::<Teacher>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn create_teacher(&self, teacher: Teacher) -> RepoResult<Teacher> {
        sqlx::query_as::<_, Teacher>(&format!(
            "INSERT INTO teachers ({TEACHER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {TEACHER_COLUMNS}"
        ))
        .bind(&teacher.id)
        .bind(&teacher.name)
        .bind(&teacher.email)
        .bind(&teacher.national_id)
        .bind(&teacher.registration)
        .bind(&teacher.password_hash)
        .bind(&teacher.subject)
        .bind(&teacher.phone)
        .bind(teacher.birth_date)
        .bind(teacher.created_at)
        .bind(teacher.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update_teacher(
        &self,
        id: &str,
        changes: TeacherChanges,
    ) -> RepoResult<Option<Teacher>> {
        sqlx::query_as::<_, Teacher>(&format!(
            "UPDATE teachers SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                national_id = COALESCE($4, national_id), \
                registration = COALESCE($5, registration), \
                subject = COALESCE($6, subject), \
                phone = COALESCE($7, phone), \
                birth_date = COALESCE($8, birth_date), \
                password_hash = COALESCE($9, password_hash), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {TEACHER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.national_id)
        .bind(changes.registration)
        .bind(changes.subject)
        .bind(changes.phone)
        .bind(changes.birth_date)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_teacher(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM teachers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    // --- Students ---

    async fn list_students(
        &self,
        filter: &StudentFilter,
        page: Pagination,
    ) -> RepoResult<Vec<Student>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {STUDENT_COLUMNS} FROM students WHERE TRUE"));
        push_eq(&mut builder, "name", &filter.name);
        push_eq(&mut builder, "email", &filter.email);
        push_eq(&mut builder, "registration", &filter.registration);
        push_eq(&mut builder, "class_group", &filter.class_group);
        push_page(&mut builder, page);

        builder
            .build_query_as::<Student>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn create_student(&self, student: Student) -> RepoResult<Student> {
        sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students ({STUDENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(&student.id)
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.national_id)
        .bind(&student.registration)
        .bind(&student.password_hash)
        .bind(&student.class_group)
        .bind(&student.phone)
        .bind(student.birth_date)
        .bind(student.created_at)
        .bind(student.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update_student(
        &self,
        id: &str,
        changes: StudentChanges,
    ) -> RepoResult<Option<Student>> {
        sqlx::query_as::<_, Student>(&format!(
            "UPDATE students SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                national_id = COALESCE($4, national_id), \
                registration = COALESCE($5, registration), \
                class_group = COALESCE($6, class_group), \
                phone = COALESCE($7, phone), \
                birth_date = COALESCE($8, birth_date), \
                password_hash = COALESCE($9, password_hash), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.national_id)
        .bind(changes.registration)
        .bind(changes.class_group)
        .bind(changes.phone)
        .bind(changes.birth_date)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_student(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    // --- Seeding ---

    async fn count_teachers(&self) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM teachers")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn count_students(&self) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn count_posts(&self) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_constraints_map_to_wire_fields() {
        assert_eq!(unique_field(Some("teachers_email_key")), "email");
        assert_eq!(unique_field(Some("students_national_id_key")), "cpf");
        assert_eq!(unique_field(Some("students_registration_key")), "matricula");
        assert_eq!(unique_field(None), "unique field");
    }
}
