use chrono::NaiveDate;

use crate::{
    models::{PostForm, StudentForm, TeacherForm},
    password::{PasswordError, PasswordHasher},
    repository::{Repository, RepositoryError},
};

/// Password shared by every demo account.
pub const DEMO_PASSWORD: &str = "senha123";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("invalid seed date: {0}")]
    Date(&'static str),
}

/// Rows inserted by one `seed_database` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub teachers: usize,
    pub students: usize,
    pub posts: usize,
}

// (name, cpf, birth date, phone, subject, email, registration)
#[rustfmt::skip]
const TEACHERS: [(&str, &str, &str, &str, &str, &str, &str); 3] = [
    ("Prof. João Silva", "12345678901", "1980-05-15", "(11) 98765-4321", "Matemática", "joao.silva@escola.com", "PROF001"),
    ("Profa. Maria Santos", "98765432100", "1985-08-22", "(11) 97654-3210", "História", "maria.santos@escola.com", "PROF002"),
    ("Prof. Carlos Oliveira", "11122233344", "1978-03-10", "(11) 96543-2109", "Ciências", "carlos.oliveira@escola.com", "PROF003"),
];

// (name, cpf, birth date, phone, class group, email, registration)
#[rustfmt::skip]
const STUDENTS: [(&str, &str, &str, &str, &str, &str, &str); 4] = [
    ("Ana Paula Costa", "55566677788", "2005-03-20", "(11) 91234-5678", "3A", "ana.costa@escola.com", "ALU001"),
    ("Pedro Henrique Souza", "44455566677", "2006-07-15", "(11) 92345-6789", "2B", "pedro.souza@escola.com", "ALU002"),
    ("Juliana Ferreira", "33344455566", "2005-11-30", "(11) 93456-7890", "3A", "juliana.ferreira@escola.com", "ALU003"),
    ("Lucas Almeida", "22233344455", "2006-01-25", "(11) 94567-8901", "2B", "lucas.almeida@escola.com", "ALU004"),
];

// (title, content, author, subject)
const POSTS: [(&str, &str, &str, &str); 6] = [
    (
        "Introdução à Álgebra Linear",
        "Nesta aula, vamos explorar os conceitos básicos da álgebra linear, incluindo vetores, matrizes e sistemas lineares.",
        "Prof. João Silva",
        "Matemática",
    ),
    (
        "A Revolução Francesa e seus Impactos",
        "A Revolução Francesa (1789-1799) foi um dos eventos mais importantes da história moderna. Neste post, discutiremos suas causas e consequências.",
        "Profa. Maria Santos",
        "História",
    ),
    (
        "O Ciclo da Água na Natureza",
        "O ciclo da água é um processo contínuo de circulação da água na Terra, essencial para entender diversos fenômenos naturais.",
        "Prof. Carlos Oliveira",
        "Ciências",
    ),
    (
        "Teorema de Pitágoras: Aplicações Práticas",
        "O Teorema de Pitágoras é uma das ferramentas mais úteis da geometria, da construção civil até a navegação.",
        "Prof. João Silva",
        "Matemática",
    ),
    (
        "O Brasil Colonial: Economia e Sociedade",
        "Durante o período colonial brasileiro, a economia era baseada principalmente na exploração de recursos naturais.",
        "Profa. Maria Santos",
        "História",
    ),
    (
        "Fotossíntese: Como as Plantas Produzem Energia",
        "A fotossíntese é o processo pelo qual as plantas convertem luz solar em energia química.",
        "Prof. Carlos Oliveira",
        "Ciências",
    ),
];

fn date(raw: &'static str) -> Result<NaiveDate, SeedError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| SeedError::Date(raw))
}

/// seed_database
///
/// Fills each of the three tables with demo rows, but only tables that are currently
/// empty. Running it against a populated store is a no-op.
pub async fn seed_database(
    repo: &dyn Repository,
    hasher: &dyn PasswordHasher,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    let teachers_empty = repo.count_teachers().await? == 0;
    let students_empty = repo.count_students().await? == 0;
    let posts_empty = repo.count_posts().await? == 0;

    if !(teachers_empty || students_empty || posts_empty) {
        tracing::info!("database already holds sample data; skipping seed");
        return Ok(report);
    }

    if teachers_empty {
        for (name, cpf, born, phone, subject, email, registration) in TEACHERS {
            let form = TeacherForm {
                name: name.into(),
                email: email.into(),
                national_id: cpf.into(),
                registration: registration.into(),
                subject: subject.into(),
                phone: phone.into(),
                birth_date: date(born)?,
                password: DEMO_PASSWORD.into(),
            };
            // Hashed per account so no two rows share a salt.
            let hash = hasher.hash(&form.password).await?;
            repo.create_teacher(form.into_record(hash)).await?;
            report.teachers += 1;
        }
    }

    if students_empty {
        for (name, cpf, born, phone, class_group, email, registration) in STUDENTS {
            let form = StudentForm {
                name: name.into(),
                email: email.into(),
                national_id: cpf.into(),
                registration: registration.into(),
                class_group: class_group.into(),
                phone: phone.into(),
                birth_date: date(born)?,
                password: DEMO_PASSWORD.into(),
            };
            let hash = hasher.hash(&form.password).await?;
            repo.create_student(form.into_record(hash)).await?;
            report.students += 1;
        }
    }

    if posts_empty {
        for (title, content, author, subject) in POSTS {
            let form = PostForm {
                title: title.into(),
                content: content.into(),
                author: author.into(),
                subject: subject.into(),
            };
            repo.create_post(form.into_record()).await?;
            report.posts += 1;
        }
    }

    tracing::info!(
        teachers = report.teachers,
        students = report.students,
        posts = report.posts,
        "seeded sample data"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{password::BcryptHasher, repository::InMemoryRepository};

    #[tokio::test]
    async fn seeds_empty_store_once() {
        let repo = InMemoryRepository::new();
        let hasher = BcryptHasher::with_cost(4);

        let first = seed_database(&repo, &hasher).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                teachers: 3,
                students: 4,
                posts: 6
            }
        );

        let second = seed_database(&repo, &hasher).await.unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(repo.count_teachers().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn seeded_accounts_verify_with_demo_password() {
        let repo = InMemoryRepository::new();
        let hasher = BcryptHasher::with_cost(4);
        seed_database(&repo, &hasher).await.unwrap();

        let ana = repo
            .find_student_by_email("ana.costa@escola.com")
            .await
            .unwrap()
            .unwrap();
        assert!(hasher.verify(DEMO_PASSWORD, &ana.password_hash).await);
    }

    #[tokio::test]
    async fn seeded_accounts_get_distinct_hashes() {
        let repo = InMemoryRepository::new();
        let hasher = BcryptHasher::with_cost(4);
        seed_database(&repo, &hasher).await.unwrap();

        let joao = repo
            .find_teacher_by_email("joao.silva@escola.com")
            .await
            .unwrap()
            .unwrap();
        let maria = repo
            .find_teacher_by_email("maria.santos@escola.com")
            .await
            .unwrap()
            .unwrap();
        let ana = repo
            .find_student_by_email("ana.costa@escola.com")
            .await
            .unwrap()
            .unwrap();

        assert_ne!(joao.password_hash, maria.password_hash);
        assert_ne!(joao.password_hash, ana.password_hash);
        assert!(hasher.verify(DEMO_PASSWORD, &maria.password_hash).await);
    }
}
