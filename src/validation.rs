use std::collections::BTreeMap;
use std::sync::OnceLock;

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use chrono::NaiveDate;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::{
    error::ApiError,
    models::{
        Credentials, LoginRequest, PostChanges, PostForm, PostInput, StudentForm, StudentInput,
        StudentPatch, TeacherForm, TeacherInput, TeacherPatch,
    },
};

/// Field name (as it appears on the wire) → list of messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

const REQUIRED: &str = "required";

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

/// Validate
///
/// Turns a loosely-typed request payload into its validated form, or the full map of
/// field errors. All fields are checked; the first failure does not short-circuit.
pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, FieldErrors>;
}

/// Rule accumulator shared by all `Validate` impls.
#[derive(Default)]
struct Checker {
    errors: FieldErrors,
}

impl Checker {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Required field with a minimum length in characters (1 = non-empty).
    fn text(&mut self, field: &str, value: Option<String>, min: usize) -> Option<String> {
        match value {
            None => {
                self.fail(field, REQUIRED);
                None
            }
            Some(v) => self.check_len(field, v, min),
        }
    }

    /// Optional field: absent is fine, present must satisfy the same rule.
    fn optional_text(&mut self, field: &str, value: Option<String>, min: usize) -> Option<String> {
        value.and_then(|v| self.check_len(field, v, min))
    }

    fn check_len(&mut self, field: &str, value: String, min: usize) -> Option<String> {
        let len = value.chars().count();
        if len == 0 {
            self.fail(field, REQUIRED);
            None
        } else if len < min {
            self.fail(field, format!("must have at least {min} characters"));
            None
        } else {
            Some(value)
        }
    }

    fn email(&mut self, field: &str, value: Option<String>) -> Option<String> {
        match value {
            None => {
                self.fail(field, REQUIRED);
                None
            }
            Some(v) => self.check_email(field, v),
        }
    }

    fn optional_email(&mut self, field: &str, value: Option<String>) -> Option<String> {
        value.and_then(|v| self.check_email(field, v))
    }

    fn check_email(&mut self, field: &str, value: String) -> Option<String> {
        if valid_email(&value) {
            Some(value)
        } else {
            self.fail(field, "invalid email");
            None
        }
    }

    fn date(&mut self, field: &str, value: Option<String>) -> Option<NaiveDate> {
        match value {
            None => {
                self.fail(field, REQUIRED);
                None
            }
            Some(v) => self.check_date(field, &v),
        }
    }

    fn optional_date(&mut self, field: &str, value: Option<String>) -> Option<NaiveDate> {
        value.and_then(|v| self.check_date(field, &v))
    }

    // Accepts a bare date or the date part of an RFC 3339 timestamp.
    fn check_date(&mut self, field: &str, value: &str) -> Option<NaiveDate> {
        if value.is_empty() {
            self.fail(field, REQUIRED);
            return None;
        }
        let date_part = value.split('T').next().unwrap_or(value);
        match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.fail(field, "invalid date, expected YYYY-MM-DD");
                None
            }
        }
    }

    fn finish<T>(self, output: Option<T>) -> Result<T, FieldErrors> {
        match output {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(self.errors),
        }
    }
}

impl Validate for LoginRequest {
    type Output = Credentials;

    fn validate(self) -> Result<Credentials, FieldErrors> {
        let mut c = Checker::default();
        let email = c.email("email", self.email);
        let password = c.text("senha", self.senha, 1);
        let output = match (email, password) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            _ => None,
        };
        c.finish(output)
    }
}

/// Creation rules for posts: every field required.
impl Validate for PostInput {
    type Output = PostForm;

    fn validate(self) -> Result<PostForm, FieldErrors> {
        let mut c = Checker::default();
        let title = c.text("title", self.title, 1);
        let content = c.text("content", self.content, 1);
        let author = c.text("author", self.author, 1);
        let subject = c.text("subject", self.subject, 1);
        let output = match (title, content, author, subject) {
            (Some(title), Some(content), Some(author), Some(subject)) => Some(PostForm {
                title,
                content,
                author,
                subject,
            }),
            _ => None,
        };
        c.finish(output)
    }
}

/// PostUpdate
///
/// Same payload as `PostInput`, validated with partial-update rules.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(transparent)]
pub struct PostUpdate(pub PostInput);

impl Validate for PostUpdate {
    type Output = PostChanges;

    fn validate(self) -> Result<PostChanges, FieldErrors> {
        let input = self.0;
        let mut c = Checker::default();
        let changes = PostChanges {
            title: c.optional_text("title", input.title, 1),
            content: c.optional_text("content", input.content, 1),
            author: c.optional_text("author", input.author, 1),
            subject: c.optional_text("subject", input.subject, 1),
        };
        c.finish(Some(changes))
    }
}

impl Validate for TeacherInput {
    type Output = TeacherForm;

    fn validate(self) -> Result<TeacherForm, FieldErrors> {
        let mut c = Checker::default();
        let name = c.text("nome", self.nome, 1);
        let national_id = c.text("cpf", self.cpf, 1);
        let birth_date = c.date("nascimento", self.nascimento);
        let phone = c.text("telefone", self.telefone, 1);
        let subject = c.text("disciplina", self.disciplina, 1);
        let email = c.email("email", self.email);
        let registration = c.text("matricula", self.matricula, 1);
        let password = c.text("senha", self.senha, 1);

        let output = match (
            name,
            national_id,
            birth_date,
            phone,
            subject,
            email,
            registration,
            password,
        ) {
            (
                Some(name),
                Some(national_id),
                Some(birth_date),
                Some(phone),
                Some(subject),
                Some(email),
                Some(registration),
                Some(password),
            ) => Some(TeacherForm {
                name,
                email,
                national_id,
                registration,
                subject,
                phone,
                birth_date,
                password,
            }),
            _ => None,
        };
        c.finish(output)
    }
}

/// TeacherUpdate
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(transparent)]
pub struct TeacherUpdate(pub TeacherInput);

impl Validate for TeacherUpdate {
    type Output = TeacherPatch;

    fn validate(self) -> Result<TeacherPatch, FieldErrors> {
        let input = self.0;
        let mut c = Checker::default();
        let patch = TeacherPatch {
            name: c.optional_text("nome", input.nome, 1),
            national_id: c.optional_text("cpf", input.cpf, 1),
            birth_date: c.optional_date("nascimento", input.nascimento),
            phone: c.optional_text("telefone", input.telefone, 1),
            subject: c.optional_text("disciplina", input.disciplina, 1),
            email: c.optional_email("email", input.email),
            registration: c.optional_text("matricula", input.matricula, 1),
            password: c.optional_text("senha", input.senha, 1),
        };
        c.finish(Some(patch))
    }
}

// Student rules are stricter than teacher rules.
const STUDENT_NAME_MIN: usize = 3;
const STUDENT_CPF_MIN: usize = 11;
const STUDENT_PHONE_MIN: usize = 10;
const STUDENT_REGISTRATION_MIN: usize = 5;
const STUDENT_PASSWORD_MIN: usize = 6;

impl Validate for StudentInput {
    type Output = StudentForm;

    fn validate(self) -> Result<StudentForm, FieldErrors> {
        let mut c = Checker::default();
        let name = c.text("nome", self.nome, STUDENT_NAME_MIN);
        let national_id = c.text("cpf", self.cpf, STUDENT_CPF_MIN);
        let birth_date = c.date("nascimento", self.nascimento);
        let phone = c.text("telefone", self.telefone, STUDENT_PHONE_MIN);
        let class_group = c.text("turma", self.turma, 1);
        let email = c.email("email", self.email);
        let registration = c.text("matricula", self.matricula, STUDENT_REGISTRATION_MIN);
        let password = c.text("senha", self.senha, STUDENT_PASSWORD_MIN);

        let output = match (
            name,
            national_id,
            birth_date,
            phone,
            class_group,
            email,
            registration,
            password,
        ) {
            (
                Some(name),
                Some(national_id),
                Some(birth_date),
                Some(phone),
                Some(class_group),
                Some(email),
                Some(registration),
                Some(password),
            ) => Some(StudentForm {
                name,
                email,
                national_id,
                registration,
                class_group,
                phone,
                birth_date,
                password,
            }),
            _ => None,
        };
        c.finish(output)
    }
}

/// StudentUpdate
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(transparent)]
pub struct StudentUpdate(pub StudentInput);

impl Validate for StudentUpdate {
    type Output = StudentPatch;

    fn validate(self) -> Result<StudentPatch, FieldErrors> {
        let input = self.0;
        let mut c = Checker::default();
        let patch = StudentPatch {
            name: c.optional_text("nome", input.nome, STUDENT_NAME_MIN),
            national_id: c.optional_text("cpf", input.cpf, STUDENT_CPF_MIN),
            birth_date: c.optional_date("nascimento", input.nascimento),
            phone: c.optional_text("telefone", input.telefone, STUDENT_PHONE_MIN),
            class_group: c.optional_text("turma", input.turma, 1),
            email: c.optional_email("email", input.email),
            registration: c.optional_text("matricula", input.matricula, STUDENT_REGISTRATION_MIN),
            password: c.optional_text("senha", input.senha, STUDENT_PASSWORD_MIN),
        };
        c.finish(Some(patch))
    }
}

/// Valid
///
/// JSON body extractor that deserializes `T` and runs its `Validate` rules. Handlers
/// receive the validated output directly; malformed bodies never reach a service.
pub struct Valid<T: Validate>(pub T::Output);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: Validate + DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            let mut errors = FieldErrors::new();
            errors.insert("body".to_string(), vec![rejection.body_text()]);
            ApiError::Validation(errors)
        })?;
        raw.validate().map(Valid).map_err(ApiError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_reports_every_bad_field() {
        let errors = LoginRequest {
            email: Some("not-an-email".into()),
            senha: None,
        }
        .validate()
        .unwrap_err();

        assert_eq!(errors["email"], vec!["invalid email".to_string()]);
        assert_eq!(errors["senha"], vec!["required".to_string()]);
    }

    #[test]
    fn login_rejects_empty_password() {
        let errors = LoginRequest {
            email: Some("a@b.com".into()),
            senha: Some(String::new()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("senha"));
    }

    #[test]
    fn student_minimum_lengths() {
        let errors = StudentInput {
            nome: Some("Al".into()),
            cpf: Some("123".into()),
            nascimento: Some("2005-03-20".into()),
            telefone: Some("1199".into()),
            turma: Some("3A".into()),
            email: Some("al@escola.com".into()),
            matricula: Some("A1".into()),
            senha: Some("123".into()),
        }
        .validate()
        .unwrap_err();

        for field in ["nome", "cpf", "telefone", "matricula", "senha"] {
            assert!(errors.contains_key(field), "expected an error for {field}");
        }
        assert!(!errors.contains_key("turma"));
        assert!(!errors.contains_key("nascimento"));
    }

    #[test]
    fn teacher_birth_date_accepts_timestamp_prefix() {
        let form = TeacherInput {
            nome: Some("Prof. João Silva".into()),
            cpf: Some("12345678901".into()),
            nascimento: Some("1980-05-15T00:00:00.000Z".into()),
            telefone: Some("(11) 98765-4321".into()),
            disciplina: Some("Matemática".into()),
            email: Some("joao.silva@escola.com".into()),
            matricula: Some("PROF001".into()),
            senha: Some("senha123".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(form.birth_date, NaiveDate::from_ymd_opt(1980, 5, 15).unwrap());
    }

    #[test]
    fn partial_update_only_checks_present_fields() {
        let patch = TeacherUpdate(TeacherInput {
            disciplina: Some("Física".into()),
            ..Default::default()
        })
        .validate()
        .unwrap();
        assert_eq!(patch.subject.as_deref(), Some("Física"));
        assert!(patch.name.is_none());

        let errors = TeacherUpdate(TeacherInput {
            email: Some("broken".into()),
            ..Default::default()
        })
        .validate()
        .unwrap_err();
        assert_eq!(errors["email"], vec!["invalid email".to_string()]);
    }
}
