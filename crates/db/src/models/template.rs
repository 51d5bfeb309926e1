use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateGoalArea {
    pub id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateGoal {
    pub id: Uuid,
    pub goal_area_id: Uuid,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalAreaWithGoals {
    #[serde(flatten)]
    pub area: TemplateGoalArea,
    pub goals: Vec<TemplateGoal>,
}

/// A template together with its goal-area/goal tree, ordered by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateWithGoals {
    #[serde(flatten)]
    pub template: Template,
    pub goal_areas: Vec<GoalAreaWithGoals>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGoalArea {
    pub name: String,
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub description: Option<String>,
    pub goal_areas: Vec<CreateGoalArea>,
}

impl Template {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Template>(
            r#"SELECT id, name, description, created_at, updated_at
               FROM templates
               ORDER BY name COLLATE NOCASE"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Template>(
            r#"SELECT id, name, description, created_at, updated_at
               FROM templates
               WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_with_goals(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<TemplateWithGoals>, sqlx::Error> {
        let Some(template) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let areas = sqlx::query_as::<_, TemplateGoalArea>(
            r#"SELECT id, template_id, name, position
               FROM template_goal_areas
               WHERE template_id = ?
               ORDER BY position"#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let goals = sqlx::query_as::<_, TemplateGoal>(
            r#"SELECT g.id, g.goal_area_id, g.name, g.position
               FROM template_goals g
               JOIN template_goal_areas a ON a.id = g.goal_area_id
               WHERE a.template_id = ?
               ORDER BY a.position, g.position"#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let goal_areas = areas
            .into_iter()
            .map(|area| {
                let goals = goals
                    .iter()
                    .filter(|g| g.goal_area_id == area.id)
                    .cloned()
                    .collect();
                GoalAreaWithGoals { area, goals }
            })
            .collect();

        Ok(Some(TemplateWithGoals {
            template,
            goal_areas,
        }))
    }

    /// Insert the template and its whole goal tree in one transaction.
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateTemplate,
        template_id: Uuid,
    ) -> Result<TemplateWithGoals, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let template = sqlx::query_as::<_, Template>(
            r#"INSERT INTO templates (id, name, description)
               VALUES (?, ?, ?)
               RETURNING id, name, description, created_at, updated_at"#,
        )
        .bind(template_id)
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await?;

        let mut goal_areas = Vec::with_capacity(data.goal_areas.len());
        for (area_position, area_data) in data.goal_areas.iter().enumerate() {
            let area = sqlx::query_as::<_, TemplateGoalArea>(
                r#"INSERT INTO template_goal_areas (id, template_id, name, position)
                   VALUES (?, ?, ?, ?)
                   RETURNING id, template_id, name, position"#,
            )
            .bind(Uuid::new_v4())
            .bind(template_id)
            .bind(&area_data.name)
            .bind(area_position as i64)
            .fetch_one(&mut *tx)
            .await?;

            let mut goals = Vec::with_capacity(area_data.goals.len());
            for (goal_position, goal_name) in area_data.goals.iter().enumerate() {
                let goal = sqlx::query_as::<_, TemplateGoal>(
                    r#"INSERT INTO template_goals (id, goal_area_id, name, position)
                       VALUES (?, ?, ?, ?)
                       RETURNING id, goal_area_id, name, position"#,
                )
                .bind(Uuid::new_v4())
                .bind(area.id)
                .bind(goal_name)
                .bind(goal_position as i64)
                .fetch_one(&mut *tx)
                .await?;
                goals.push(goal);
            }

            goal_areas.push(GoalAreaWithGoals { area, goals });
        }

        tx.commit().await?;

        Ok(TemplateWithGoals {
            template,
            goal_areas,
        })
    }
}
