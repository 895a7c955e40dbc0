use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Technology {
    pub id: i64,
    pub name: String,
    pub subcategory: Option<i64>,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbTechnology {
    pub id: i64,
    pub name: String,
    pub subcategory_id: Option<i64>,
}

impl From<DbTechnology> for Technology {
    fn from(row: DbTechnology) -> Self {
        Self {
            id: row.id,
            name: row.name,
            subcategory: row.subcategory_id,
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Subcategory {
    pub id: i64,
    pub name: String,
    pub category: i64,
    pub technologies: Vec<Technology>,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbSubcategory {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
}

impl Subcategory {
    pub fn from_row(row: DbSubcategory, technologies: Vec<Technology>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category_id,
            technologies,
        }
    }

    /// Admin-style label, e.g. "Programming - Web Development".
    pub fn qualified_name(&self, category_name: &str) -> String {
        format!("{} - {}", category_name, self.name)
    }
}

impl fmt::Display for Subcategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub subcategories: Vec<Subcategory>,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbCategory {
    pub id: i64,
    pub name: String,
}

impl Category {
    pub fn from_row(row: DbCategory, subcategories: Vec<Subcategory>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            subcategories,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Serialize, Deserialize, Validate, Debug, Clone, Default)]
pub struct CategoryPayload {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 50, message = "Ensure this field has between 1 and 50 characters.")
    )]
    pub name: Option<String>,
}

impl From<&Category> for CategoryPayload {
    fn from(category: &Category) -> Self {
        Self {
            name: Some(category.name.clone()),
        }
    }
}

#[derive(Serialize, Deserialize, Validate, Debug, Clone, Default)]
pub struct SubcategoryPayload {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 50, message = "Ensure this field has between 1 and 50 characters.")
    )]
    pub name: Option<String>,

    #[validate(required(message = "This field is required."))]
    pub category: Option<i64>,
}

impl From<&Subcategory> for SubcategoryPayload {
    fn from(subcategory: &Subcategory) -> Self {
        Self {
            name: Some(subcategory.name.clone()),
            category: Some(subcategory.category),
        }
    }
}

#[derive(Serialize, Deserialize, Validate, Debug, Clone, Default)]
pub struct TechnologyPayload {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 50, message = "Ensure this field has between 1 and 50 characters.")
    )]
    pub name: Option<String>,

    #[serde(default)]
    pub subcategory: Option<i64>,
}

impl From<&Technology> for TechnologyPayload {
    fn from(technology: &Technology) -> Self {
        Self {
            name: Some(technology.name.clone()),
            subcategory: technology.subcategory,
        }
    }
}

/// Validated write forms handed to the persistence layer.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
}

impl From<CategoryPayload> for NewCategory {
    fn from(payload: CategoryPayload) -> Self {
        Self {
            name: payload.name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSubcategory {
    pub name: String,
    pub category: i64,
}

impl From<SubcategoryPayload> for NewSubcategory {
    fn from(payload: SubcategoryPayload) -> Self {
        Self {
            name: payload.name.unwrap_or_default(),
            category: payload.category.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTechnology {
    pub name: String,
    pub subcategory: Option<i64>,
}

impl From<TechnologyPayload> for NewTechnology {
    fn from(payload: TechnologyPayload) -> Self {
        Self {
            name: payload.name.unwrap_or_default(),
            subcategory: payload.subcategory,
        }
    }
}
