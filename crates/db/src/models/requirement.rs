use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[sqlx(type_name = "requirement_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    OneTime,
    Recurring,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[sqlx(type_name = "frequency", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
        }
    }
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[sqlx(type_name = "requirement_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequirementStatus::Pending => write!(f, "pending"),
            RequirementStatus::InProgress => write!(f, "in progress"),
            RequirementStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A task attached to a project; either one-off (optionally due on a date) or recurring.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub requirement_type: RequirementType,
    pub frequency: Option<Frequency>,
    pub day_of_week: Option<i64>,
    pub day_of_month: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub status: RequirementStatus,
    pub owner_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateRequirement {
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub requirement_type: RequirementType,
    pub frequency: Option<Frequency>,
    pub day_of_week: Option<i64>,
    pub day_of_month: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<RequirementStatus>,
    pub owner_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequirement {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<RequirementStatus>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementFilter {
    pub project_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub status: Option<RequirementStatus>,
}

const REQUIREMENT_COLUMNS: &str = "id, project_id, name, description, requirement_type, frequency, \
     day_of_week, day_of_month, due_date, status, owner_id, template_id, created_at, updated_at";

impl Requirement {
    pub async fn find_filtered(
        pool: &SqlitePool,
        filter: RequirementFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"SELECT {REQUIREMENT_COLUMNS}
               FROM requirements
               WHERE (? IS NULL OR project_id = ?)
                 AND (? IS NULL OR owner_id = ?)
                 AND (? IS NULL OR status = ?)
               ORDER BY created_at"#
        );
        sqlx::query_as::<_, Requirement>(&sql)
            .bind(filter.project_id)
            .bind(filter.project_id)
            .bind(filter.owner_id)
            .bind(filter.owner_id)
            .bind(filter.status)
            .bind(filter.status)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {REQUIREMENT_COLUMNS} FROM requirements WHERE id = ?");
        sqlx::query_as::<_, Requirement>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateRequirement,
        requirement_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"INSERT INTO requirements
                (id, project_id, name, description, requirement_type, frequency,
                 day_of_week, day_of_month, due_date, status, owner_id, template_id)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, 'pending'), ?, ?)
               RETURNING {REQUIREMENT_COLUMNS}"#
        );
        sqlx::query_as::<_, Requirement>(&sql)
            .bind(requirement_id)
            .bind(data.project_id)
            .bind(&data.name)
            .bind(&data.description)
            .bind(data.requirement_type)
            .bind(data.frequency)
            .bind(data.day_of_week)
            .bind(data.day_of_month)
            .bind(data.due_date)
            .bind(data.status)
            .bind(data.owner_id)
            .bind(data.template_id)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateRequirement,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let name = data.name.as_ref().unwrap_or(&existing.name);
        let description = data.description.as_ref().or(existing.description.as_ref());
        let frequency = data.frequency.or(existing.frequency);
        let due_date = data.due_date.or(existing.due_date);
        let status = data.status.unwrap_or(existing.status);
        let owner_id = data.owner_id.or(existing.owner_id);

        let sql = format!(
            r#"UPDATE requirements
               SET name        = ?,
                   description = ?,
                   frequency   = ?,
                   due_date    = ?,
                   status      = ?,
                   owner_id    = ?,
                   updated_at  = datetime('now', 'subsec')
               WHERE id = ?
               RETURNING {REQUIREMENT_COLUMNS}"#
        );
        sqlx::query_as::<_, Requirement>(&sql)
            .bind(name)
            .bind(description)
            .bind(frequency)
            .bind(due_date)
            .bind(status)
            .bind(owner_id)
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM requirements WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::{create_test_member, create_test_project, setup_test_pool};

    fn one_time(project_id: Uuid, name: &str) -> CreateRequirement {
        CreateRequirement {
            project_id,
            name: name.to_string(),
            description: None,
            requirement_type: RequirementType::OneTime,
            frequency: None,
            day_of_week: None,
            day_of_month: None,
            due_date: None,
            status: None,
            owner_id: None,
            template_id: None,
        }
    }

    #[tokio::test]
    async fn create_and_filter_requirements() {
        let pool = setup_test_pool().await;
        let project = create_test_project(&pool, "Ops", None).await;
        let other = create_test_project(&pool, "Growth", None).await;
        let owner = create_test_member(&pool, "Maria", None).await;

        let mut weekly = one_time(project.id, "Weekly sync");
        weekly.requirement_type = RequirementType::Recurring;
        weekly.frequency = Some(Frequency::Weekly);
        weekly.day_of_week = Some(1);
        weekly.owner_id = Some(owner.id);
        let created = Requirement::create(&pool, &weekly, Uuid::new_v4())
            .await
            .expect("failed to create requirement");
        assert_eq!(created.status, RequirementStatus::Pending);
        assert_eq!(created.frequency, Some(Frequency::Weekly));

        let mut dated = one_time(other.id, "Launch");
        dated.due_date = NaiveDate::from_ymd_opt(2026, 11, 2);
        Requirement::create(&pool, &dated, Uuid::new_v4())
            .await
            .expect("failed to create requirement");

        let by_project = Requirement::find_filtered(
            &pool,
            RequirementFilter {
                project_id: Some(project.id),
                ..Default::default()
            },
        )
        .await
        .expect("filter failed");
        assert_eq!(by_project.len(), 1);
        assert_eq!(by_project[0].owner_id, Some(owner.id));

        let by_owner = Requirement::find_filtered(
            &pool,
            RequirementFilter {
                owner_id: Some(owner.id),
                ..Default::default()
            },
        )
        .await
        .expect("filter failed");
        assert_eq!(by_owner.len(), 1);

        let launch = Requirement::find_filtered(&pool, RequirementFilter::default())
            .await
            .expect("filter failed")
            .into_iter()
            .find(|r| r.name == "Launch")
            .expect("launch missing");
        assert_eq!(launch.due_date, NaiveDate::from_ymd_opt(2026, 11, 2));
    }

    #[tokio::test]
    async fn unknown_project_violates_foreign_key() {
        let pool = setup_test_pool().await;
        let result = Requirement::create(&pool, &one_time(Uuid::new_v4(), "Orphan"), Uuid::new_v4()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn update_keeps_unspecified_fields() {
        let pool = setup_test_pool().await;
        let project = create_test_project(&pool, "Ops", None).await;
        let mut data = one_time(project.id, "Audit");
        data.description = Some("Quarterly audit".into());
        let created = Requirement::create(&pool, &data, Uuid::new_v4())
            .await
            .expect("failed to create requirement");

        let updated = Requirement::update(
            &pool,
            created.id,
            &UpdateRequirement {
                status: Some(RequirementStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .expect("update failed");

        assert_eq!(updated.status, RequirementStatus::InProgress);
        assert_eq!(updated.description.as_deref(), Some("Quarterly audit"));
        assert_eq!(updated.name, "Audit");
    }
}
