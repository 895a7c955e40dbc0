use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Technology;
use crate::validation::{empty_string_as_none, validate_web_url};

#[derive(Serialize, Deserialize, sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Achievement {
    pub id: i64,
    pub description: String,
    pub job: i64,
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = self.description.chars().take(50).collect();
        f.write_str(&preview)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Job {
    pub id: i64,
    pub company: String,
    pub link: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub technologies: Vec<Technology>,
    pub achievements: Vec<Achievement>,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbJob {
    pub id: i64,
    pub company: String,
    pub link: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}

impl Job {
    pub fn from_row(
        row: DbJob,
        technologies: Vec<Technology>,
        achievements: Vec<Achievement>,
    ) -> Self {
        Self {
            id: row.id,
            company: row.company,
            link: row.link,
            title: row.title,
            start_date: row.start_date,
            end_date: row.end_date,
            is_current: row.is_current,
            technologies,
            achievements,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.title, self.company)
    }
}

#[derive(Serialize, Deserialize, Validate, Debug, Clone, Default)]
pub struct JobPayload {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 200, message = "Ensure this field has between 1 and 200 characters.")
    )]
    pub company: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        custom(function = "validate_web_url", message = "Enter a valid URL."),
        length(max = 200, message = "Ensure this field has no more than 200 characters.")
    )]
    pub link: Option<String>,

    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 200, message = "Ensure this field has between 1 and 200 characters.")
    )]
    pub title: Option<String>,

    #[validate(required(message = "This field is required."))]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub is_current: bool,

    #[serde(default)]
    pub technologies: Vec<i64>,
}

impl From<&Job> for JobPayload {
    fn from(job: &Job) -> Self {
        Self {
            company: Some(job.company.clone()),
            link: Some(job.link.clone()).filter(|link| !link.is_empty()),
            title: Some(job.title.clone()),
            start_date: Some(job.start_date),
            end_date: job.end_date,
            is_current: job.is_current,
            technologies: job.technologies.iter().map(|t| t.id).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub company: String,
    pub link: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub technologies: Vec<i64>,
}

impl NewJob {
    /// A current job has no end date, whatever the caller supplied.
    pub fn normalized(mut self) -> Self {
        if self.is_current {
            self.end_date = None;
        }
        self
    }
}

impl From<JobPayload> for NewJob {
    fn from(payload: JobPayload) -> Self {
        Self {
            company: payload.company.unwrap_or_default(),
            link: payload.link.unwrap_or_default(),
            title: payload.title.unwrap_or_default(),
            start_date: payload.start_date.unwrap_or_default(),
            end_date: payload.end_date,
            is_current: payload.is_current,
            technologies: payload.technologies,
        }
    }
}

#[derive(Serialize, Deserialize, Validate, Debug, Clone, Default)]
pub struct AchievementPayload {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, message = "This field may not be blank.")
    )]
    pub description: Option<String>,

    #[validate(required(message = "This field is required."))]
    pub job: Option<i64>,
}

impl From<&Achievement> for AchievementPayload {
    fn from(achievement: &Achievement) -> Self {
        Self {
            description: Some(achievement.description.clone()),
            job: Some(achievement.job),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAchievement {
    pub description: String,
    pub job: i64,
}

impl From<AchievementPayload> for NewAchievement {
    fn from(payload: AchievementPayload) -> Self {
        Self {
            description: payload.description.unwrap_or_default(),
            job: payload.job.unwrap_or_default(),
        }
    }
}
