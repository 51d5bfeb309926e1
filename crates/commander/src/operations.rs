//! Typed arguments for every catalog operation
//!
//! The reasoning backend hands us loosely-typed JSON. Each call is decoded into
//! one [`Operation`] variant before anything touches the store; unknown extra
//! fields are ignored, missing or mistyped ones fail that call alone.

use chrono::NaiveDate;
use db::models::{
    project::ProjectStatus,
    requirement::{Frequency, RequirementStatus, RequirementType},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::catalog;

/// Per-call failure. Never aborts the rest of a plan.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Malformed arguments for {operation}: {message}")]
    MalformedArguments { operation: String, message: String },

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Invalid identifier for {field}: '{value}' is not a valid id")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Database error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for OperationError {
    fn from(err: sqlx::Error) -> Self {
        OperationError::Store(err.to_string())
    }
}

pub fn parse_id(field: &'static str, value: &str) -> Result<Uuid, OperationError> {
    Uuid::parse_str(value.trim()).map_err(|_| OperationError::InvalidIdentifier {
        field,
        value: value.to_string(),
    })
}

pub fn parse_optional_id(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<Uuid>, OperationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| parse_id(field, v))
        .transpose()
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, OperationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| OperationError::Validation {
        field,
        message: format!("'{}' is not a YYYY-MM-DD date", value),
    })
}

fn require_name(field: &'static str, value: &str) -> Result<(), OperationError> {
    if value.trim().is_empty() {
        return Err(OperationError::Validation {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsArgs {
    /// Only projects with this status
    pub status: Option<ProjectStatus>,
    /// Only projects in this category (case-insensitive)
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTeamMembersArgs {
    /// Only members with this role (case-insensitive)
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListRequirementsArgs {
    pub project_id: Option<String>,
    pub owner_id: Option<String>,
    pub status: Option<RequirementStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListTemplatesArgs {}

// ---------------------------------------------------------------------------
// Projects and people
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectArgs {
    pub name: String,
    pub status: Option<ProjectStatus>,
    /// Hex color such as "#22c55e"
    pub color: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectArgs {
    /// Project to update; defaults to the project created earlier in the same plan
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub status: Option<ProjectStatus>,
    pub color: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProjectArgs {
    pub project_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamMemberArgs {
    pub nickname: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamMemberArgs {
    pub member_id: String,
    pub nickname: Option<String>,
    pub role: Option<String>,
}

// ---------------------------------------------------------------------------
// Requirements
// ---------------------------------------------------------------------------

/// Fields shared by single and per-member requirement creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequirementFields {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to "recurring" when a frequency is given, otherwise "one_time"
    pub requirement_type: Option<RequirementType>,
    /// Required for recurring requirements
    pub frequency: Option<Frequency>,
    /// 0 = Sunday .. 6 = Saturday, for weekly recurrence
    pub day_of_week: Option<i64>,
    /// 1..31, for monthly recurrence
    pub day_of_month: Option<i64>,
    /// YYYY-MM-DD
    pub due_date: Option<String>,
    pub status: Option<RequirementStatus>,
}

/// Checked form of [`RequirementFields`]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRequirementFields {
    pub name: String,
    pub description: Option<String>,
    pub requirement_type: RequirementType,
    pub frequency: Option<Frequency>,
    pub day_of_week: Option<i64>,
    pub day_of_month: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<RequirementStatus>,
}

impl RequirementFields {
    pub fn effective_type(&self) -> RequirementType {
        match (self.requirement_type, self.frequency) {
            (Some(t), _) => t,
            (None, Some(_)) => RequirementType::Recurring,
            (None, None) => RequirementType::OneTime,
        }
    }

    pub fn validate(&self) -> Result<ValidRequirementFields, OperationError> {
        require_name("name", &self.name)?;

        let requirement_type = self.effective_type();
        if requirement_type == RequirementType::Recurring && self.frequency.is_none() {
            return Err(OperationError::Validation {
                field: "frequency",
                message: "is required for recurring requirements".to_string(),
            });
        }
        if let Some(day) = self.day_of_week {
            if !(0..=6).contains(&day) {
                return Err(OperationError::Validation {
                    field: "dayOfWeek",
                    message: format!("{} is outside 0..6", day),
                });
            }
        }
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(OperationError::Validation {
                    field: "dayOfMonth",
                    message: format!("{} is outside 1..31", day),
                });
            }
        }
        let due_date = self
            .due_date
            .as_deref()
            .map(|d| parse_date("dueDate", d))
            .transpose()?;

        Ok(ValidRequirementFields {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            requirement_type,
            frequency: self.frequency,
            day_of_week: self.day_of_week,
            day_of_month: self.day_of_month,
            due_date,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequirementArgs {
    /// Defaults to the project created earlier in the same plan
    pub project_id: Option<String>,
    /// Defaults to the designated default assignee
    pub owner_id: Option<String>,
    /// Defaults to the template created earlier in the same plan
    pub template_id: Option<String>,
    #[serde(flatten)]
    pub fields: RequirementFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequirementForEachMemberArgs {
    /// Defaults to the project created earlier in the same plan
    pub project_id: Option<String>,
    pub template_id: Option<String>,
    /// Only members with this role (case-insensitive); everyone when omitted
    pub role: Option<String>,
    #[serde(flatten)]
    pub fields: RequirementFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequirementArgs {
    /// Defaults to the requirement created earlier in the same plan
    pub requirement_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    /// YYYY-MM-DD
    pub due_date: Option<String>,
    pub status: Option<RequirementStatus>,
    pub owner_id: Option<String>,
}

impl UpdateRequirementArgs {
    pub fn parsed_due_date(&self) -> Result<Option<NaiveDate>, OperationError> {
        self.due_date
            .as_deref()
            .map(|d| parse_date("dueDate", d))
            .transpose()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequirementArgs {
    pub requirement_id: String,
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalAreaArgs {
    pub name: String,
    #[serde(default)]
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateArgs {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub goal_areas: Vec<GoalAreaArgs>,
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A decoded tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "arguments", rename_all = "snake_case")]
pub enum Operation {
    ListProjects(ListProjectsArgs),
    ListTeamMembers(ListTeamMembersArgs),
    ListRequirements(ListRequirementsArgs),
    ListTemplates(ListTemplatesArgs),
    CreateProject(CreateProjectArgs),
    UpdateProject(UpdateProjectArgs),
    DeleteProject(DeleteProjectArgs),
    CreateTeamMember(CreateTeamMemberArgs),
    UpdateTeamMember(UpdateTeamMemberArgs),
    CreateRequirement(CreateRequirementArgs),
    CreateRequirementForEachMember(CreateRequirementForEachMemberArgs),
    UpdateRequirement(UpdateRequirementArgs),
    DeleteRequirement(DeleteRequirementArgs),
    CreateTemplate(CreateTemplateArgs),
}

impl Operation {
    /// Decode raw backend arguments for the named operation.
    ///
    /// Arguments that arrived as an unparsed JSON string get one more parse
    /// attempt; `null` is treated as an empty object.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, OperationError> {
        if catalog::find(name).is_none() {
            return Err(OperationError::UnknownOperation(name.to_string()));
        }

        let malformed = |message: String| OperationError::MalformedArguments {
            operation: name.to_string(),
            message,
        };

        let arguments = match arguments {
            Value::Object(_) => arguments.clone(),
            Value::Null => json!({}),
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(value @ Value::Object(_)) => value,
                Ok(_) => return Err(malformed("arguments must be a JSON object".to_string())),
                Err(e) => return Err(malformed(e.to_string())),
            },
            _ => return Err(malformed("arguments must be a JSON object".to_string())),
        };

        serde_json::from_value(json!({ "operation": name, "arguments": arguments }))
            .map_err(|e| malformed(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListProjects(_) => "list_projects",
            Operation::ListTeamMembers(_) => "list_team_members",
            Operation::ListRequirements(_) => "list_requirements",
            Operation::ListTemplates(_) => "list_templates",
            Operation::CreateProject(_) => "create_project",
            Operation::UpdateProject(_) => "update_project",
            Operation::DeleteProject(_) => "delete_project",
            Operation::CreateTeamMember(_) => "create_team_member",
            Operation::UpdateTeamMember(_) => "update_team_member",
            Operation::CreateRequirement(_) => "create_requirement",
            Operation::CreateRequirementForEachMember(_) => "create_requirement_for_each_member",
            Operation::UpdateRequirement(_) => "update_requirement",
            Operation::DeleteRequirement(_) => "delete_requirement",
            Operation::CreateTemplate(_) => "create_template",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Operation::ListProjects(_)
                | Operation::ListTeamMembers(_)
                | Operation::ListRequirements(_)
                | Operation::ListTemplates(_)
        )
    }

    /// Arguments as the camelCase JSON object the backend would have sent
    pub fn arguments(&self) -> Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("arguments").map(Value::take))
            .unwrap_or_else(|| json!({}))
    }

    /// One-line human description used in previews
    pub fn describe(&self) -> String {
        match self {
            Operation::ListProjects(args) => {
                let mut filters = Vec::new();
                if let Some(status) = args.status {
                    filters.push(format!("status {}", status));
                }
                if let Some(ref category) = args.category {
                    filters.push(format!("category \"{}\"", category));
                }
                with_filters("List projects", &filters)
            }
            Operation::ListTeamMembers(args) => match args.role {
                Some(ref role) => format!("List team members with role \"{}\"", role),
                None => "List team members".to_string(),
            },
            Operation::ListRequirements(args) => {
                let mut filters = Vec::new();
                if let Some(ref id) = args.project_id {
                    filters.push(format!("project {}", id));
                }
                if let Some(ref id) = args.owner_id {
                    filters.push(format!("owner {}", id));
                }
                if let Some(status) = args.status {
                    filters.push(format!("status {}", status));
                }
                with_filters("List requirements", &filters)
            }
            Operation::ListTemplates(_) => "List templates".to_string(),
            Operation::CreateProject(args) => {
                let mut text = format!("Create project \"{}\"", args.name);
                if let Some(ref category) = args.category {
                    text.push_str(&format!(" in category \"{}\"", category));
                }
                if let Some(status) = args.status {
                    text.push_str(&format!(" ({})", status));
                }
                text
            }
            Operation::UpdateProject(args) => {
                let mut changes = Vec::new();
                if let Some(ref name) = args.name {
                    changes.push(format!("name to \"{}\"", name));
                }
                if let Some(status) = args.status {
                    changes.push(format!("status to {}", status));
                }
                if let Some(ref color) = args.color {
                    changes.push(format!("color to {}", color));
                }
                if let Some(ref category) = args.category {
                    changes.push(format!("category to \"{}\"", category));
                }
                let target = project_label(args.project_id.as_deref());
                if changes.is_empty() {
                    format!("Update {}", target)
                } else {
                    format!("Update {}: set {}", target, changes.join(", "))
                }
            }
            Operation::DeleteProject(args) => format!("Delete project {}", args.project_id),
            Operation::CreateTeamMember(args) => match args.role {
                Some(ref role) => format!("Add team member \"{}\" as {}", args.nickname, role),
                None => format!("Add team member \"{}\"", args.nickname),
            },
            Operation::UpdateTeamMember(args) => {
                let mut changes = Vec::new();
                if let Some(ref nickname) = args.nickname {
                    changes.push(format!("nickname to \"{}\"", nickname));
                }
                if let Some(ref role) = args.role {
                    changes.push(format!("role to \"{}\"", role));
                }
                if changes.is_empty() {
                    format!("Update team member {}", args.member_id)
                } else {
                    format!("Update team member {}: set {}", args.member_id, changes.join(", "))
                }
            }
            Operation::CreateRequirement(args) => {
                let mut text = describe_requirement(&args.fields);
                text.push_str(&format!(" in {}", project_label(args.project_id.as_deref())));
                if let Some(ref owner) = args.owner_id {
                    text.push_str(&format!(" for {}", owner));
                }
                text
            }
            Operation::CreateRequirementForEachMember(args) => {
                let scope = match args.role {
                    Some(ref role) => format!("every team member with role \"{}\"", role),
                    None => "every team member".to_string(),
                };
                format!(
                    "{} in {} for {}",
                    describe_requirement(&args.fields),
                    project_label(args.project_id.as_deref()),
                    scope
                )
            }
            Operation::UpdateRequirement(args) => {
                let mut changes = Vec::new();
                if let Some(ref name) = args.name {
                    changes.push(format!("name to \"{}\"", name));
                }
                if let Some(status) = args.status {
                    changes.push(format!("status to {}", status));
                }
                if let Some(frequency) = args.frequency {
                    changes.push(format!("frequency to {}", frequency));
                }
                if let Some(ref due) = args.due_date {
                    changes.push(format!("due date to {}", due));
                }
                if let Some(ref owner) = args.owner_id {
                    changes.push(format!("owner to {}", owner));
                }
                let target = match args.requirement_id {
                    Some(ref id) => format!("requirement {}", id),
                    None => "the new requirement".to_string(),
                };
                if changes.is_empty() {
                    format!("Update {}", target)
                } else {
                    format!("Update {}: set {}", target, changes.join(", "))
                }
            }
            Operation::DeleteRequirement(args) => {
                format!("Delete requirement {}", args.requirement_id)
            }
            Operation::CreateTemplate(args) => {
                let goals: usize = args.goal_areas.iter().map(|a| a.goals.len()).sum();
                format!(
                    "Create template \"{}\" with {} goal area(s) and {} goal(s)",
                    args.name,
                    args.goal_areas.len(),
                    goals
                )
            }
        }
    }
}

fn with_filters(base: &str, filters: &[String]) -> String {
    if filters.is_empty() {
        base.to_string()
    } else {
        format!("{} ({})", base, filters.join(", "))
    }
}

fn project_label(id: Option<&str>) -> String {
    match id {
        Some(id) => format!("project {}", id),
        None => "the new project".to_string(),
    }
}

fn describe_requirement(fields: &RequirementFields) -> String {
    let mut text = match (fields.effective_type(), fields.frequency) {
        (RequirementType::Recurring, Some(frequency)) => {
            format!("Create {} task \"{}\"", frequency, fields.name)
        }
        _ => format!("Create task \"{}\"", fields.name),
    };
    if let Some(ref due) = fields.due_date {
        text.push_str(&format!(" due {}", due));
    }
    text
}
