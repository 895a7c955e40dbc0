use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Technology;
use crate::validation::validate_web_url;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub technology: Vec<Technology>,
    /// Names of the categories reached through the project's technologies.
    pub category: Vec<String>,
    pub github: String,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbProject {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub github: String,
}

impl Project {
    pub fn from_row(row: DbProject, technology: Vec<Technology>, category: Vec<String>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            technology,
            category,
            github: row.github,
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Serialize, Deserialize, Validate, Debug, Clone, Default)]
pub struct ProjectPayload {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 20, message = "Ensure this field has between 1 and 20 characters.")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "This field is required."),
        length(min = 1, message = "This field may not be blank.")
    )]
    pub description: Option<String>,

    #[validate(
        required(message = "This field is required."),
        custom(function = "validate_web_url", message = "Enter a valid URL."),
        length(max = 200, message = "Ensure this field has no more than 200 characters.")
    )]
    pub github: Option<String>,

    /// Technology ids; embedded objects are never accepted here.
    #[serde(default)]
    pub technology: Vec<i64>,
}

impl From<&Project> for ProjectPayload {
    fn from(project: &Project) -> Self {
        Self {
            name: Some(project.name.clone()),
            description: Some(project.description.clone()),
            github: Some(project.github.clone()),
            technology: project.technology.iter().map(|t| t.id).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub github: String,
    pub technology: Vec<i64>,
}

impl From<ProjectPayload> for NewProject {
    fn from(payload: ProjectPayload) -> Self {
        Self {
            name: payload.name.unwrap_or_default(),
            description: payload.description.unwrap_or_default(),
            github: payload.github.unwrap_or_default(),
            technology: payload.technology,
        }
    }
}
