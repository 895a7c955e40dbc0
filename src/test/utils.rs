#[cfg(test)]
pub mod test_db {
    use crate::database::{
        CURRENT_SCHEMA, create_achievement, create_category, create_job, create_project,
        create_subcategory, create_technology, migrate_database_declaratively,
    };
    use crate::error::AppError;
    use crate::models::{
        NewAchievement, NewCategory, NewJob, NewProject, NewSubcategory, NewTechnology,
    };
    use chrono::NaiveDate;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::{Pool, Sqlite, SqlitePool};
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub fn init_test_logging() {
        INIT.call_once(|| {
            let _ = env_logger::builder()
                .parse_filters("debug")
                .is_test(true)
                .try_init();
        });
    }

    /// An in-memory database on a single long-lived connection.
    pub async fn memory_pool() -> Result<SqlitePool, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        Ok(SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?)
    }

    pub fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("test dates are YYYY-MM-DD")
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        categories: Vec<String>,
        subcategories: Vec<TestSubcategory>,
        technologies: Vec<TestTechnology>,
        projects: Vec<TestProject>,
        jobs: Vec<TestJob>,
        achievements: Vec<TestAchievement>,
    }

    pub struct TestSubcategory {
        pub name: String,
        pub category: String,
    }

    pub struct TestTechnology {
        pub name: String,
        pub subcategory: Option<String>,
    }

    pub struct TestProject {
        pub name: String,
        pub github: String,
        pub technologies: Vec<String>,
    }

    pub struct TestJob {
        pub title: String,
        pub company: String,
        pub start_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        pub is_current: bool,
        pub technologies: Vec<String>,
    }

    pub struct TestAchievement {
        pub description: String,
        pub job_title: String,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn category(mut self, name: &str) -> Self {
            self.categories.push(name.to_string());
            self
        }

        pub fn subcategory(mut self, name: &str, category: &str) -> Self {
            self.subcategories.push(TestSubcategory {
                name: name.to_string(),
                category: category.to_string(),
            });
            self
        }

        pub fn technology(mut self, name: &str, subcategory: Option<&str>) -> Self {
            self.technologies.push(TestTechnology {
                name: name.to_string(),
                subcategory: subcategory.map(String::from),
            });
            self
        }

        pub fn project(mut self, name: &str, technologies: &[&str]) -> Self {
            self.projects.push(TestProject {
                name: name.to_string(),
                github: format!("https://github.com/example/{}", name.to_lowercase()),
                technologies: technologies.iter().map(|t| t.to_string()).collect(),
            });
            self
        }

        pub fn job(
            mut self,
            title: &str,
            company: &str,
            start_date: &str,
            end_date: Option<&str>,
            is_current: bool,
            technologies: &[&str],
        ) -> Self {
            self.jobs.push(TestJob {
                title: title.to_string(),
                company: company.to_string(),
                start_date: date(start_date),
                end_date: end_date.map(date),
                is_current,
                technologies: technologies.iter().map(|t| t.to_string()).collect(),
            });
            self
        }

        pub fn achievement(mut self, description: &str, job_title: &str) -> Self {
            self.achievements.push(TestAchievement {
                description: description.to_string(),
                job_title: job_title.to_string(),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            init_test_logging();

            let pool = memory_pool().await?;
            migrate_database_declaratively(pool.clone(), CURRENT_SCHEMA, false).await?;

            let mut test_db = TestDb {
                pool,
                category_ids: HashMap::new(),
                subcategory_ids: HashMap::new(),
                technology_ids: HashMap::new(),
                project_ids: HashMap::new(),
                job_ids: HashMap::new(),
                achievement_ids: HashMap::new(),
            };

            for name in &self.categories {
                let category = create_category(
                    &test_db.pool,
                    NewCategory {
                        name: name.clone(),
                    },
                )
                .await?;
                test_db.category_ids.insert(name.clone(), category.id);
            }

            for subcategory in &self.subcategories {
                let category = lookup(&test_db.category_ids, &subcategory.category)?;
                let created = create_subcategory(
                    &test_db.pool,
                    NewSubcategory {
                        name: subcategory.name.clone(),
                        category,
                    },
                )
                .await?;
                test_db
                    .subcategory_ids
                    .insert(subcategory.name.clone(), created.id);
            }

            for technology in &self.technologies {
                let subcategory = match &technology.subcategory {
                    Some(name) => Some(lookup(&test_db.subcategory_ids, name)?),
                    None => None,
                };
                let created = create_technology(
                    &test_db.pool,
                    NewTechnology {
                        name: technology.name.clone(),
                        subcategory,
                    },
                )
                .await?;
                test_db
                    .technology_ids
                    .insert(technology.name.clone(), created.id);
            }

            for project in &self.projects {
                let technology = lookup_all(&test_db.technology_ids, &project.technologies)?;
                let created = create_project(
                    &test_db.pool,
                    NewProject {
                        name: project.name.clone(),
                        description: format!("{} description", project.name),
                        github: project.github.clone(),
                        technology,
                    },
                )
                .await?;
                test_db.project_ids.insert(project.name.clone(), created.id);
            }

            for job in &self.jobs {
                let technologies = lookup_all(&test_db.technology_ids, &job.technologies)?;
                let created = create_job(
                    &test_db.pool,
                    NewJob {
                        company: job.company.clone(),
                        link: String::new(),
                        title: job.title.clone(),
                        start_date: job.start_date,
                        end_date: job.end_date,
                        is_current: job.is_current,
                        technologies,
                    },
                )
                .await?;
                test_db.job_ids.insert(job.title.clone(), created.id);
            }

            for achievement in &self.achievements {
                let job = lookup(&test_db.job_ids, &achievement.job_title)?;
                let created = create_achievement(
                    &test_db.pool,
                    NewAchievement {
                        description: achievement.description.clone(),
                        job,
                    },
                )
                .await?;
                test_db
                    .achievement_ids
                    .insert(achievement.description.clone(), created.id);
            }

            Ok(test_db)
        }
    }

    fn lookup(ids: &HashMap<String, i64>, name: &str) -> Result<i64, AppError> {
        ids.get(name)
            .copied()
            .ok_or_else(|| AppError::Internal(format!("Test fixture {} was not seeded", name)))
    }

    fn lookup_all(ids: &HashMap<String, i64>, names: &[String]) -> Result<Vec<i64>, AppError> {
        names.iter().map(|name| lookup(ids, name)).collect()
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub category_ids: HashMap<String, i64>,
        pub subcategory_ids: HashMap<String, i64>,
        pub technology_ids: HashMap<String, i64>,
        pub project_ids: HashMap<String, i64>,
        pub job_ids: HashMap<String, i64>,
        pub achievement_ids: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn category_id(&self, name: &str) -> i64 {
            self.category_ids[name]
        }

        pub fn subcategory_id(&self, name: &str) -> i64 {
            self.subcategory_ids[name]
        }

        pub fn technology_id(&self, name: &str) -> i64 {
            self.technology_ids[name]
        }

        pub fn project_id(&self, name: &str) -> i64 {
            self.project_ids[name]
        }

        pub fn job_id(&self, title: &str) -> i64 {
            self.job_ids[title]
        }

        pub fn achievement_id(&self, description: &str) -> i64 {
            self.achievement_ids[description]
        }

        pub async fn count_rows(&self, table: &str) -> i64 {
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await
                .expect("Failed to count rows")
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    pub use super::test_db::{TestDb, TestDbBuilder};

    use crate::auth::AccessPolicy;
    use crate::init_rocket;
    use rocket::local::asynchronous::Client;

    /// Programming → Web Development → Python, plus a second category, two jobs, and a project.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .category("Programming")
            .category("Tools")
            .subcategory("Web Development", "Programming")
            .subcategory("Editors", "Tools")
            .technology("Python", Some("Web Development"))
            .technology("Rust", Some("Web Development"))
            .technology("Neovim", Some("Editors"))
            .technology("Bash", None)
            .project("Portfolio", &["Python", "Neovim"])
            .project("Dotfiles", &["Bash"])
            .job("Engineer", "Acme", "2021-03-01", None, true, &["Rust"])
            .job("Intern", "Initech", "2019-06-01", Some("2019-09-01"), false, &["Python"])
            .achievement("Shipped the billing rewrite", "Engineer")
            .build()
            .await
            .expect("Failed to build standard test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        setup_test_client_with_policy(test_db, AccessPolicy::Open).await
    }

    pub async fn setup_test_client_with_policy(
        test_db: TestDb,
        policy: AccessPolicy,
    ) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone(), policy).await;
        let client = Client::tracked(rocket)
            .await
            .expect("valid rocket instance");

        (client, test_db)
    }
}
