use async_trait::async_trait;
use std::sync::{
    RwLock, RwLockReadGuard, RwLockWriteGuard,
    atomic::{AtomicBool, Ordering},
};

use chrono::Utc;

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    Pagination, Post, PostChanges, PostFilter, Student, StudentChanges, StudentFilter, Teacher,
    TeacherChanges, TeacherFilter,
};

#[derive(Default)]
struct Tables {
    teachers: Vec<Teacher>,
    students: Vec<Student>,
    posts: Vec<Post>,
}

/// InMemoryRepository
///
/// Process-local store with the same contract as `PostgresRepository`: insertion order,
/// exact-match filters, per-collection uniqueness on email, cpf and matricula. Used by
/// the test suites and handy for running the API without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails with `Unavailable`.
    pub fn unavailable() -> Self {
        let repo = Self::default();
        repo.set_offline(true);
        repo
    }

    /// Toggles simulated connectivity loss.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Tables>> {
        self.check_online()?;
        self.tables
            .read()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".into()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, Tables>> {
        self.check_online()?;
        self.tables
            .write()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".into()))
    }

    fn check_online(&self) -> RepoResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("store is offline".into()));
        }
        Ok(())
    }
}

fn field_matches(filter: &Option<String>, value: &str) -> bool {
    filter.as_deref().is_none_or(|f| f == value)
}

fn paginate<T: Clone>(rows: impl Iterator<Item = T>, page: Pagination) -> Vec<T> {
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    rows.skip(skip).take(page.limit as usize).collect()
}

/// First unique field already held by a row other than `own_id`.
fn duplicate_field<'a, I>(
    rows: I,
    own_id: &str,
    email: &str,
    cpf: &str,
    reg: &str,
) -> Option<&'static str>
where
    I: Iterator<Item = (&'a str, &'a str, &'a str, &'a str)>,
{
    for (id, e, c, r) in rows {
        if id == own_id {
            continue;
        }
        if e == email {
            return Some("email");
        }
        if c == cpf {
            return Some("cpf");
        }
        if r == reg {
            return Some("matricula");
        }
    }
    None
}

fn teacher_keys(t: &Teacher) -> (&str, &str, &str, &str) {
    (&t.id, &t.email, &t.national_id, &t.registration)
}

fn student_keys(s: &Student) -> (&str, &str, &str, &str) {
    (&s.id, &s.email, &s.national_id, &s.registration)
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_teacher_by_email(&self, email: &str) -> RepoResult<Option<Teacher>> {
        let tables = self.read()?;
        Ok(tables.teachers.iter().find(|t| t.email == email).cloned())
    }

    async fn find_student_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        let tables = self.read()?;
        Ok(tables.students.iter().find(|s| s.email == email).cloned())
    }

    async fn list_posts(&self, filter: &PostFilter, page: Pagination) -> RepoResult<Vec<Post>> {
        let tables = self.read()?;
        let rows = tables
            .posts
            .iter()
            .filter(|p| {
                field_matches(&filter.author, &p.author)
                    && field_matches(&filter.subject, &p.subject)
            })
            .cloned();
        Ok(paginate(rows, page))
    }

    async fn get_post(&self, id: &str) -> RepoResult<Option<Post>> {
        let tables = self.read()?;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, post: Post) -> RepoResult<Post> {
        let mut tables = self.write()?;
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: &str, changes: PostChanges) -> RepoResult<Option<Post>> {
        let mut tables = self.write()?;
        let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.title {
            post.title = v;
        }
        if let Some(v) = changes.content {
            post.content = v;
        }
        if let Some(v) = changes.author {
            post.author = v;
        }
        if let Some(v) = changes.subject {
            post.subject = v;
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: &str) -> RepoResult<bool> {
        let mut tables = self.write()?;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        Ok(tables.posts.len() != before)
    }

    async fn list_teachers(
        &self,
        filter: &TeacherFilter,
        page: Pagination,
    ) -> RepoResult<Vec<Teacher>> {
        let tables = self.read()?;
        let rows = tables
            .teachers
            .iter()
            .filter(|t| {
                field_matches(&filter.name, &t.name)
                    && field_matches(&filter.email, &t.email)
                    && field_matches(&filter.registration, &t.registration)
                    && field_matches(&filter.subject, &t.subject)
            })
            .cloned();
        Ok(paginate(rows, page))
    }

    async fn create_teacher(&self, teacher: Teacher) -> RepoResult<Teacher> {
        let mut tables = self.write()?;
        if let Some(field) = duplicate_field(
            tables.teachers.iter().map(teacher_keys),
            &teacher.id,
            &teacher.email,
            &teacher.national_id,
            &teacher.registration,
        ) {
            return Err(RepositoryError::Duplicate(field));
        }
        tables.teachers.push(teacher.clone());
        Ok(teacher)
    }

    async fn update_teacher(
        &self,
        id: &str,
        changes: TeacherChanges,
    ) -> RepoResult<Option<Teacher>> {
        let mut tables = self.write()?;
        let Some(current) = tables.teachers.iter().find(|t| t.id == id).cloned() else {
            return Ok(None);
        };

        let mut next = current;
        if let Some(v) = changes.name {
            next.name = v;
        }
        if let Some(v) = changes.email {
            next.email = v;
        }
        if let Some(v) = changes.national_id {
            next.national_id = v;
        }
        if let Some(v) = changes.registration {
            next.registration = v;
        }
        if let Some(v) = changes.subject {
            next.subject = v;
        }
        if let Some(v) = changes.phone {
            next.phone = v;
        }
        if let Some(v) = changes.birth_date {
            next.birth_date = v;
        }
        if let Some(v) = changes.password_hash {
            next.password_hash = v;
        }
        next.updated_at = Utc::now();

        if let Some(field) = duplicate_field(
            tables.teachers.iter().map(teacher_keys),
            id,
            &next.email,
            &next.national_id,
            &next.registration,
        ) {
            return Err(RepositoryError::Duplicate(field));
        }

        if let Some(slot) = tables.teachers.iter_mut().find(|t| t.id == id) {
            *slot = next.clone();
        }
        Ok(Some(next))
    }

    async fn delete_teacher(&self, id: &str) -> RepoResult<bool> {
        let mut tables = self.write()?;
        let before = tables.teachers.len();
        tables.teachers.retain(|t| t.id != id);
        Ok(tables.teachers.len() != before)
    }

    async fn list_students(
        &self,
        filter: &StudentFilter,
        page: Pagination,
    ) -> RepoResult<Vec<Student>> {
        let tables = self.read()?;
        let rows = tables
            .students
            .iter()
            .filter(|s| {
                field_matches(&filter.name, &s.name)
                    && field_matches(&filter.email, &s.email)
                    && field_matches(&filter.registration, &s.registration)
                    && field_matches(&filter.class_group, &s.class_group)
            })
            .cloned();
        Ok(paginate(rows, page))
    }

    async fn create_student(&self, student: Student) -> RepoResult<Student> {
        let mut tables = self.write()?;
        if let Some(field) = duplicate_field(
            tables.students.iter().map(student_keys),
            &student.id,
            &student.email,
            &student.national_id,
            &student.registration,
        ) {
            return Err(RepositoryError::Duplicate(field));
        }
        tables.students.push(student.clone());
        Ok(student)
    }

    async fn update_student(
        &self,
        id: &str,
        changes: StudentChanges,
    ) -> RepoResult<Option<Student>> {
        let mut tables = self.write()?;
        let Some(current) = tables.students.iter().find(|s| s.id == id).cloned() else {
            return Ok(None);
        };

        let mut next = current;
        if let Some(v) = changes.name {
            next.name = v;
        }
        if let Some(v) = changes.email {
            next.email = v;
        }
        if let Some(v) = changes.national_id {
            next.national_id = v;
        }
        if let Some(v) = changes.registration {
            next.registration = v;
        }
        if let Some(v) = changes.class_group {
            next.class_group = v;
        }
        if let Some(v) = changes.phone {
            next.phone = v;
        }
        if let Some(v) = changes.birth_date {
            next.birth_date = v;
        }
        if let Some(v) = changes.password_hash {
            next.password_hash = v;
        }
        next.updated_at = Utc::now();

        if let Some(field) = duplicate_field(
            tables.students.iter().map(student_keys),
            id,
            &next.email,
            &next.national_id,
            &next.registration,
        ) {
            return Err(RepositoryError::Duplicate(field));
        }

        if let Some(slot) = tables.students.iter_mut().find(|s| s.id == id) {
            *slot = next.clone();
        }
        Ok(Some(next))
    }

    async fn delete_student(&self, id: &str) -> RepoResult<bool> {
        let mut tables = self.write()?;
        let before = tables.students.len();
        tables.students.retain(|s| s.id != id);
        Ok(tables.students.len() != before)
    }

    async fn count_teachers(&self) -> RepoResult<i64> {
        Ok(self.read()?.teachers.len() as i64)
    }

    async fn count_students(&self) -> RepoResult<i64> {
        Ok(self.read()?.students.len() as i64)
    }

    async fn count_posts(&self) -> RepoResult<i64> {
        Ok(self.read()?.posts.len() as i64)
    }
}
