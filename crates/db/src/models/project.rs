use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use uuid::Uuid;

pub const DEFAULT_PROJECT_COLOR: &str = "#6366f1";

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    OnHold,
    Completed,
    Archived,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStatus::Active => write!(f, "active"),
            ProjectStatus::OnHold => write!(f, "on hold"),
            ProjectStatus::Completed => write!(f, "completed"),
            ProjectStatus::Archived => write!(f, "archived"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub status: ProjectStatus,
    pub color: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub status: Option<ProjectStatus>,
    pub color: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub status: Option<ProjectStatus>,
    pub color: Option<String>,
    pub category: Option<String>,
}

impl Project {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"SELECT id, name, status, color, category, created_at, updated_at
               FROM projects
               ORDER BY name COLLATE NOCASE"#,
        )
        .fetch_all(pool)
        .await
    }

    /// Projects matching the optional status and (case-insensitive) category filters.
    pub async fn find_filtered(
        pool: &SqlitePool,
        status: Option<ProjectStatus>,
        category: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"SELECT id, name, status, color, category, created_at, updated_at
               FROM projects
               WHERE (? IS NULL OR status = ?)
                 AND (? IS NULL OR category = ? COLLATE NOCASE)
               ORDER BY name COLLATE NOCASE"#,
        )
        .bind(status)
        .bind(status)
        .bind(category)
        .bind(category)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"SELECT id, name, status, color, category, created_at, updated_at
               FROM projects
               WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_name_case_insensitive(
        pool: &SqlitePool,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"SELECT id, name, status, color, category, created_at, updated_at
               FROM projects
               WHERE name = ? COLLATE NOCASE
               LIMIT 1"#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateProject,
        project_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"INSERT INTO projects (id, name, status, color, category)
               VALUES (?, ?, COALESCE(?, 'active'), COALESCE(?, ?), ?)
               RETURNING id, name, status, color, category, created_at, updated_at"#,
        )
        .bind(project_id)
        .bind(&data.name)
        .bind(data.status)
        .bind(&data.color)
        .bind(DEFAULT_PROJECT_COLOR)
        .bind(&data.category)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let name = data.name.as_ref().unwrap_or(&existing.name);
        let status = data.status.unwrap_or(existing.status);
        let color = data.color.as_ref().unwrap_or(&existing.color);
        let category = data.category.as_ref().or(existing.category.as_ref());

        sqlx::query_as::<_, Project>(
            r#"UPDATE projects
               SET name       = ?,
                   status     = ?,
                   color      = ?,
                   category   = ?,
                   updated_at = datetime('now', 'subsec')
               WHERE id = ?
               RETURNING id, name, status, color, category, created_at, updated_at"#,
        )
        .bind(name)
        .bind(status)
        .bind(color)
        .bind(category)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::{create_test_project, setup_test_pool};

    #[tokio::test]
    async fn create_applies_defaults() {
        let pool = setup_test_pool().await;

        let project = Project::create(
            &pool,
            &CreateProject {
                name: "Operations Review".into(),
                ..Default::default()
            },
            Uuid::new_v4(),
        )
        .await
        .expect("failed to create project");

        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.color, DEFAULT_PROJECT_COLOR);
        assert!(project.category.is_none());

        let found = Project::find_by_name_case_insensitive(&pool, "operations REVIEW")
            .await
            .expect("lookup failed");
        assert_eq!(found.map(|p| p.id), Some(project.id));
    }

    #[tokio::test]
    async fn filter_by_status_and_category() {
        let pool = setup_test_pool().await;
        create_test_project(&pool, "Hiring", Some("People")).await;
        let finance = create_test_project(&pool, "Budget", Some("Finance")).await;
        Project::update(
            &pool,
            finance.id,
            &UpdateProject {
                status: Some(ProjectStatus::OnHold),
                ..Default::default()
            },
        )
        .await
        .expect("update failed");

        let people = Project::find_filtered(&pool, None, Some("people"))
            .await
            .expect("filter failed");
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].name, "Hiring");

        let on_hold = Project::find_filtered(&pool, Some(ProjectStatus::OnHold), None)
            .await
            .expect("filter failed");
        assert_eq!(on_hold.len(), 1);
        assert_eq!(on_hold[0].id, finance.id);

        let all = Project::find_filtered(&pool, None, None)
            .await
            .expect("filter failed");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn update_missing_project_is_row_not_found() {
        let pool = setup_test_pool().await;
        let err = Project::update(&pool, Uuid::new_v4(), &UpdateProject::default())
            .await
            .expect_err("update should fail");
        assert!(matches!(err, sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn delete_reports_rows_affected() {
        let pool = setup_test_pool().await;
        let project = create_test_project(&pool, "Scratch", None).await;

        assert_eq!(Project::delete(&pool, project.id).await.unwrap(), 1);
        assert_eq!(Project::delete(&pool, project.id).await.unwrap(), 0);
    }
}
