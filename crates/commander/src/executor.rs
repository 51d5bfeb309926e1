//! Execution engine
//!
//! Runs a plan strictly in order. Every call produces its own result; a
//! failing call never stops the ones after it. Ids created earlier in the plan
//! are threaded into later calls that leave them out.

use std::collections::HashMap;

use db::models::{
    project::{CreateProject, Project, UpdateProject},
    requirement::{CreateRequirement, Requirement, RequirementFilter, UpdateRequirement},
    team_member::{CreateTeamMember, TeamMember, UpdateTeamMember},
    template::{CreateGoalArea, CreateTemplate, Template},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    brain::ToolCall,
    expansion::expand_fan_out,
    operations::{parse_id, parse_optional_id, CreateRequirementArgs, Operation, OperationError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub operation_name: String,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn success(operation_name: impl Into<String>, result: Value) -> Self {
        Self {
            operation_name: operation_name.into(),
            status: OperationStatus::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(operation_name: impl Into<String>, error: impl ToString) -> Self {
        Self {
            operation_name: operation_name.into(),
            status: OperationStatus::Error,
            result: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}

/// "Completed N operation(s) successfully[, M failed]."
pub fn summary_message(results: &[OperationResult]) -> String {
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let failed = results.len() - succeeded;
    if failed == 0 {
        format!("Completed {} operation(s) successfully.", succeeded)
    } else {
        format!(
            "Completed {} operation(s) successfully, {} failed.",
            succeeded, failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextSlot {
    Project,
    Requirement,
    Template,
}

/// Last-created ids for one execution pass; dropped with the pass.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    last_created: HashMap<ContextSlot, Uuid>,
}

impl ExecutionContext {
    pub fn last(&self, slot: ContextSlot) -> Option<Uuid> {
        self.last_created.get(&slot).copied()
    }

    pub fn record(&mut self, slot: ContextSlot, id: Uuid) {
        self.last_created.insert(slot, id);
    }

    fn fill(&self, target: &mut Option<String>, slot: ContextSlot) {
        let missing = target.as_deref().map_or(true, |s| s.trim().is_empty());
        if missing {
            if let Some(id) = self.last(slot) {
                *target = Some(id.to_string());
            }
        }
    }

    /// Fill identifier arguments the caller left out from earlier results.
    pub fn backfill(&self, op: &mut Operation) {
        match op {
            Operation::CreateRequirement(args) => {
                self.fill(&mut args.project_id, ContextSlot::Project);
                self.fill(&mut args.template_id, ContextSlot::Template);
            }
            Operation::CreateRequirementForEachMember(args) => {
                self.fill(&mut args.project_id, ContextSlot::Project);
            }
            Operation::UpdateProject(args) => {
                self.fill(&mut args.project_id, ContextSlot::Project);
            }
            Operation::UpdateRequirement(args) => {
                self.fill(&mut args.requirement_id, ContextSlot::Requirement);
            }
            _ => {}
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, OperationError> {
    serde_json::to_value(value).map_err(|e| OperationError::Store(e.to_string()))
}

fn required_id(field: &'static str, value: Option<&str>) -> Result<Uuid, OperationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_id(field, v),
        None => Err(OperationError::Validation {
            field,
            message: "is required and no earlier operation in this plan supplied one".to_string(),
        }),
    }
}

fn not_found(entity: &'static str, id: Uuid) -> impl FnOnce(sqlx::Error) -> OperationError {
    move |err| match err {
        sqlx::Error::RowNotFound => OperationError::NotFound { entity, id },
        other => OperationError::from(other),
    }
}

fn non_blank(field: &'static str, value: &str) -> Result<String, OperationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OperationError::Validation {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Answer a read operation. Never mutates the store.
pub async fn run_read(pool: &SqlitePool, op: &Operation) -> Result<Value, OperationError> {
    match op {
        Operation::ListProjects(args) => {
            let projects =
                Project::find_filtered(pool, args.status, args.category.as_deref()).await?;
            to_json(&projects)
        }
        Operation::ListTeamMembers(args) => {
            let members = TeamMember::find_by_role(pool, args.role.as_deref()).await?;
            to_json(&members)
        }
        Operation::ListRequirements(args) => {
            let filter = RequirementFilter {
                project_id: parse_optional_id("projectId", args.project_id.as_deref())?,
                owner_id: parse_optional_id("ownerId", args.owner_id.as_deref())?,
                status: args.status,
            };
            let requirements = Requirement::find_filtered(pool, filter).await?;
            to_json(&requirements)
        }
        Operation::ListTemplates(_) => {
            let templates = Template::find_all(pool).await?;
            to_json(&templates)
        }
        other => Err(OperationError::Validation {
            field: "operation",
            message: format!("{} is not a read operation", other.name()),
        }),
    }
}

/// Runs confirmed or fresh plans against the store
pub struct ExecutionEngine<'a> {
    pool: &'a SqlitePool,
    default_assignee: &'a str,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(pool: &'a SqlitePool, default_assignee: &'a str) -> Self {
        Self {
            pool,
            default_assignee,
        }
    }

    /// Execute `plan` in order and return one result per executed write.
    ///
    /// Read calls are skipped. A fan-out call yields one result per member.
    pub async fn execute(&self, plan: &[ToolCall]) -> Vec<OperationResult> {
        let mut ctx = ExecutionContext::default();
        let mut results = Vec::with_capacity(plan.len());

        tracing::info!("[EXECUTOR] Executing plan with {} call(s)", plan.len());

        for call in plan {
            let mut op = match Operation::parse(&call.name, &call.arguments) {
                Ok(op) => op,
                Err(e) => {
                    tracing::warn!("[EXECUTOR] {} rejected: {}", call.name, e);
                    results.push(OperationResult::failure(&call.name, e));
                    continue;
                }
            };

            if op.is_read() {
                tracing::debug!("[EXECUTOR] Skipping read call {}", call.name);
                continue;
            }

            ctx.backfill(&mut op);

            match op {
                Operation::CreateRequirementForEachMember(args) => {
                    let members = match TeamMember::find_all(self.pool).await {
                        Ok(members) => members,
                        Err(e) => {
                            results.push(OperationResult::failure(
                                &call.name,
                                OperationError::from(e),
                            ));
                            continue;
                        }
                    };
                    let expanded = expand_fan_out(&args, &members);
                    if expanded.is_empty() {
                        tracing::warn!(
                            "[EXECUTOR] {} matched no team members (role filter: {:?})",
                            call.name,
                            args.role
                        );
                    }
                    for sub in expanded {
                        results.push(self.run_one(Operation::CreateRequirement(sub), &mut ctx).await);
                    }
                }
                op => results.push(self.run_one(op, &mut ctx).await),
            }
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        tracing::info!(
            "[EXECUTOR] Plan finished: {} succeeded, {} failed",
            succeeded,
            results.len() - succeeded
        );

        results
    }

    async fn run_one(&self, mut op: Operation, ctx: &mut ExecutionContext) -> OperationResult {
        ctx.backfill(&mut op);
        let name = op.name();
        tracing::debug!("[EXECUTOR] {} {}", name, op.arguments());

        match self.dispatch(&op, ctx).await {
            Ok(value) => OperationResult::success(name, value),
            Err(e) => {
                tracing::warn!("[EXECUTOR] {} failed: {}", name, e);
                OperationResult::failure(name, e)
            }
        }
    }

    async fn dispatch(
        &self,
        op: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        let pool = self.pool;

        match op {
            Operation::CreateProject(args) => {
                let data = CreateProject {
                    name: non_blank("name", &args.name)?,
                    status: args.status,
                    color: args.color.clone(),
                    category: args.category.clone(),
                };
                let project = Project::create(pool, &data, Uuid::new_v4()).await?;
                ctx.record(ContextSlot::Project, project.id);
                to_json(&project)
            }
            Operation::UpdateProject(args) => {
                let id = required_id("projectId", args.project_id.as_deref())?;
                let data = UpdateProject {
                    name: args
                        .name
                        .as_deref()
                        .map(|name| non_blank("name", name))
                        .transpose()?,
                    status: args.status,
                    color: args.color.clone(),
                    category: args.category.clone(),
                };
                let project = Project::update(pool, id, &data)
                    .await
                    .map_err(not_found("Project", id))?;
                to_json(&project)
            }
            Operation::DeleteProject(args) => {
                let id = parse_id("projectId", &args.project_id)?;
                if Project::delete(pool, id).await? == 0 {
                    return Err(OperationError::NotFound {
                        entity: "Project",
                        id,
                    });
                }
                Ok(serde_json::json!({ "deleted": id }))
            }
            Operation::CreateTeamMember(args) => {
                let data = CreateTeamMember {
                    nickname: non_blank("nickname", &args.nickname)?,
                    role: args.role.clone(),
                };
                let member = TeamMember::create(pool, &data, Uuid::new_v4()).await?;
                to_json(&member)
            }
            Operation::UpdateTeamMember(args) => {
                let id = parse_id("memberId", &args.member_id)?;
                let data = UpdateTeamMember {
                    nickname: args
                        .nickname
                        .as_deref()
                        .map(|nickname| non_blank("nickname", nickname))
                        .transpose()?,
                    role: args.role.clone(),
                };
                let member = TeamMember::update(pool, id, &data)
                    .await
                    .map_err(not_found("Team member", id))?;
                to_json(&member)
            }
            Operation::CreateRequirement(args) => {
                let requirement = self.create_requirement(args).await?;
                ctx.record(ContextSlot::Requirement, requirement.id);
                to_json(&requirement)
            }
            Operation::UpdateRequirement(args) => {
                let id = required_id("requirementId", args.requirement_id.as_deref())?;
                let owner_id = parse_optional_id("ownerId", args.owner_id.as_deref())?;
                if let Some(owner_id) = owner_id {
                    self.ensure_member(owner_id).await?;
                }
                let data = UpdateRequirement {
                    name: args.name.clone(),
                    description: args.description.clone(),
                    frequency: args.frequency,
                    due_date: args.parsed_due_date()?,
                    status: args.status,
                    owner_id,
                };
                let requirement = Requirement::update(pool, id, &data)
                    .await
                    .map_err(not_found("Requirement", id))?;
                to_json(&requirement)
            }
            Operation::DeleteRequirement(args) => {
                let id = parse_id("requirementId", &args.requirement_id)?;
                if Requirement::delete(pool, id).await? == 0 {
                    return Err(OperationError::NotFound {
                        entity: "Requirement",
                        id,
                    });
                }
                Ok(serde_json::json!({ "deleted": id }))
            }
            Operation::CreateTemplate(args) => {
                let data = CreateTemplate {
                    name: non_blank("name", &args.name)?,
                    description: args.description.clone(),
                    goal_areas: args
                        .goal_areas
                        .iter()
                        .map(|a| CreateGoalArea {
                            name: a.name.clone(),
                            goals: a.goals.clone(),
                        })
                        .collect(),
                };
                let template = Template::create(pool, &data, Uuid::new_v4()).await?;
                ctx.record(ContextSlot::Template, template.template.id);
                to_json(&template)
            }
            // Expanded by `execute` before dispatch.
            Operation::CreateRequirementForEachMember(_) => Err(OperationError::Validation {
                field: "operation",
                message: "fan-out operations must be expanded before dispatch".to_string(),
            }),
            read => run_read(pool, read).await,
        }
    }

    async fn create_requirement(
        &self,
        args: &CreateRequirementArgs,
    ) -> Result<Requirement, OperationError> {
        let pool = self.pool;

        let project_id = required_id("projectId", args.project_id.as_deref())?;
        if Project::find_by_id(pool, project_id).await?.is_none() {
            return Err(OperationError::NotFound {
                entity: "Project",
                id: project_id,
            });
        }

        let template_id = parse_optional_id("templateId", args.template_id.as_deref())?;
        if let Some(template_id) = template_id {
            if Template::find_by_id(pool, template_id).await?.is_none() {
                return Err(OperationError::NotFound {
                    entity: "Template",
                    id: template_id,
                });
            }
        }

        let owner_id = match parse_optional_id("ownerId", args.owner_id.as_deref())? {
            Some(owner_id) => {
                self.ensure_member(owner_id).await?;
                Some(owner_id)
            }
            None => self.default_owner().await?,
        };

        let fields = args.fields.validate()?;
        let data = CreateRequirement {
            project_id,
            name: fields.name,
            description: fields.description,
            requirement_type: fields.requirement_type,
            frequency: fields.frequency,
            day_of_week: fields.day_of_week,
            day_of_month: fields.day_of_month,
            due_date: fields.due_date,
            status: fields.status,
            owner_id,
            template_id,
        };

        Ok(Requirement::create(pool, &data, Uuid::new_v4()).await?)
    }

    async fn ensure_member(&self, id: Uuid) -> Result<(), OperationError> {
        match TeamMember::find_by_id(self.pool, id).await? {
            Some(_) => Ok(()),
            None => Err(OperationError::NotFound {
                entity: "Team member",
                id,
            }),
        }
    }

    /// The designated default person, looked up fresh for every call
    async fn default_owner(&self) -> Result<Option<Uuid>, OperationError> {
        let member = TeamMember::find_by_nickname(self.pool, self.default_assignee).await?;
        if member.is_none() {
            tracing::warn!(
                "[EXECUTOR] Default assignee '{}' not found; leaving task unassigned",
                self.default_assignee
            );
        }
        Ok(member.map(|m| m.id))
    }
}
