use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'categories' table. Seeded by migration, read-only via the API.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Material icon name used by the UI.
    pub icon: String,
    /// Hex colour, e.g. "#FF5722".
    pub color: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,

    /// Number of published quizzes, populated only by listing queries.
    #[sqlx(default)]
    #[serde(default)]
    pub quizzes_count: i64,
}

pub const CATEGORY_COLUMNS: &str =
    "id, name, slug, icon, color, description, created_at, updated_at";
