use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: Uuid,
    pub nickname: String,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamMember {
    pub nickname: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTeamMember {
    pub nickname: Option<String>,
    pub role: Option<String>,
}

impl TeamMember {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"SELECT id, nickname, role, created_at, updated_at
               FROM team_members
               ORDER BY nickname COLLATE NOCASE"#,
        )
        .fetch_all(pool)
        .await
    }

    /// Members whose role matches `role` case-insensitively, or everyone when `role` is `None`.
    pub async fn find_by_role(
        pool: &SqlitePool,
        role: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"SELECT id, nickname, role, created_at, updated_at
               FROM team_members
               WHERE (? IS NULL OR role = ? COLLATE NOCASE)
               ORDER BY nickname COLLATE NOCASE"#,
        )
        .bind(role)
        .bind(role)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"SELECT id, nickname, role, created_at, updated_at
               FROM team_members
               WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Exact (case-insensitive) nickname lookup.
    pub async fn find_by_nickname(
        pool: &SqlitePool,
        nickname: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"SELECT id, nickname, role, created_at, updated_at
               FROM team_members
               WHERE nickname = ? COLLATE NOCASE"#,
        )
        .bind(nickname)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateTeamMember,
        member_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"INSERT INTO team_members (id, nickname, role)
               VALUES (?, ?, ?)
               RETURNING id, nickname, role, created_at, updated_at"#,
        )
        .bind(member_id)
        .bind(&data.nickname)
        .bind(&data.role)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateTeamMember,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let nickname = data.nickname.as_ref().unwrap_or(&existing.nickname);
        let role = data.role.as_ref().or(existing.role.as_ref());

        sqlx::query_as::<_, TeamMember>(
            r#"UPDATE team_members
               SET nickname   = ?,
                   role       = ?,
                   updated_at = datetime('now', 'subsec')
               WHERE id = ?
               RETURNING id, nickname, role, created_at, updated_at"#,
        )
        .bind(nickname)
        .bind(role)
        .bind(id)
        .fetch_one(pool)
        .await
    }
}
