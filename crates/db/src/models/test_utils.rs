use sqlx::SqlitePool;
use uuid::Uuid;

use super::project::{CreateProject, Project};
use super::team_member::{CreateTeamMember, TeamMember};
use crate::DBService;

pub(crate) async fn setup_test_pool() -> SqlitePool {
    DBService::new_in_memory()
        .await
        .expect("failed to open sqlite memory db")
        .pool
}

pub(crate) async fn create_test_project(
    pool: &SqlitePool,
    name: &str,
    category: Option<&str>,
) -> Project {
    Project::create(
        pool,
        &CreateProject {
            name: name.to_string(),
            category: category.map(str::to_string),
            ..Default::default()
        },
        Uuid::new_v4(),
    )
    .await
    .expect("failed to create test project")
}

pub(crate) async fn create_test_member(
    pool: &SqlitePool,
    nickname: &str,
    role: Option<&str>,
) -> TeamMember {
    TeamMember::create(
        pool,
        &CreateTeamMember {
            nickname: nickname.to_string(),
            role: role.map(str::to_string),
        },
        Uuid::new_v4(),
    )
    .await
    .expect("failed to create test team member")
}
