//! Operation catalog: the fixed set of things the pipeline may do
//!
//! Parameter schemas are generated from the argument structs in
//! [`crate::operations`] and offered to the reasoning backend as tools.

use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;

use crate::{
    brain::ToolDefinition,
    operations::{
        CreateProjectArgs, CreateRequirementArgs, CreateRequirementForEachMemberArgs,
        CreateTeamMemberArgs, CreateTemplateArgs, DeleteProjectArgs, DeleteRequirementArgs,
        ListProjectsArgs, ListRequirementsArgs, ListTeamMembersArgs, ListTemplatesArgs, Operation,
        UpdateProjectArgs, UpdateRequirementArgs, UpdateTeamMemberArgs,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Side-effect free; satisfied inline while the backend is still deciding
    Read,
    Write,
    /// A write that expands into one call per matching team member
    FanOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: OperationKind,
    pub parameters: Value,
}

fn spec<T: JsonSchema>(
    name: &'static str,
    kind: OperationKind,
    description: &'static str,
) -> OperationSpec {
    let mut parameters = schemars::schema_for!(T).to_value();
    if let Some(obj) = parameters.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("properties")
            .or_insert_with(|| Value::Object(Default::default()));
    }
    OperationSpec {
        name,
        description,
        kind,
        parameters,
    }
}

static CATALOG: Lazy<Vec<OperationSpec>> = Lazy::new(|| {
    use OperationKind::*;
    vec![
        spec::<ListProjectsArgs>(
            "list_projects",
            Read,
            "List projects with their ids, status and category. Use this to find projects before updating them.",
        ),
        spec::<ListTeamMembersArgs>(
            "list_team_members",
            Read,
            "List team members with their ids, nicknames and roles.",
        ),
        spec::<ListRequirementsArgs>(
            "list_requirements",
            Read,
            "List requirements (tasks), optionally filtered by project, owner or status.",
        ),
        spec::<ListTemplatesArgs>(
            "list_templates",
            Read,
            "List goal templates with their ids.",
        ),
        spec::<CreateProjectArgs>("create_project", Write, "Create a new project."),
        spec::<UpdateProjectArgs>(
            "update_project",
            Write,
            "Update an existing project's name, status, color or category.",
        ),
        spec::<DeleteProjectArgs>(
            "delete_project",
            Write,
            "Delete a project and all of its requirements.",
        ),
        spec::<CreateTeamMemberArgs>("create_team_member", Write, "Add a person to the team."),
        spec::<UpdateTeamMemberArgs>(
            "update_team_member",
            Write,
            "Change a team member's nickname or role.",
        ),
        spec::<CreateRequirementArgs>(
            "create_requirement",
            Write,
            "Create a requirement (task) in a project. One-time tasks may have a due date; recurring tasks need a frequency.",
        ),
        spec::<CreateRequirementForEachMemberArgs>(
            "create_requirement_for_each_member",
            FanOut,
            "Create the same requirement once for every team member (optionally only those with a given role), each owned by that member.",
        ),
        spec::<UpdateRequirementArgs>(
            "update_requirement",
            Write,
            "Update a requirement's name, description, schedule, due date, status or owner.",
        ),
        spec::<DeleteRequirementArgs>("delete_requirement", Write, "Delete a requirement."),
        spec::<CreateTemplateArgs>(
            "create_template",
            Write,
            "Create a goal template made of goal areas, each holding a list of goals.",
        ),
    ]
});

pub fn list_operations() -> &'static [OperationSpec] {
    &CATALOG
}

pub fn find(name: &str) -> Option<&'static OperationSpec> {
    CATALOG.iter().find(|s| s.name == name)
}

pub fn is_read(name: &str) -> bool {
    find(name).is_some_and(|s| s.kind == OperationKind::Read)
}

/// One-line description of a call; falls back to the decode error for bad arguments.
pub fn describe(name: &str, arguments: &Value) -> String {
    match Operation::parse(name, arguments) {
        Ok(op) => op.describe(),
        Err(e) => format!("{} ({})", name, e),
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    CATALOG
        .iter()
        .map(|s| ToolDefinition {
            name: s.name.to_string(),
            description: s.description.to_string(),
            parameters: s.parameters.clone(),
        })
        .collect()
}
