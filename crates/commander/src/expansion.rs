//! Fan-out expansion and the preview builder
//!
//! [`expand_fan_out`] is the single rule used both when previewing a plan and
//! when executing it, so both see the same per-member calls for the same team.

use db::models::team_member::TeamMember;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    brain::ToolCall,
    catalog,
    operations::{CreateRequirementArgs, CreateRequirementForEachMemberArgs, Operation},
};

/// One pending write as shown to the operator before confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub tool_call_id: String,
    pub operation_name: String,
    pub arguments: Value,
    pub description: String,
}

fn role_matches(member: &TeamMember, role: Option<&str>) -> bool {
    match role.map(str::trim).filter(|r| !r.is_empty()) {
        None => true,
        Some(role) => member
            .role
            .as_deref()
            .is_some_and(|r| r.trim().eq_ignore_ascii_case(role)),
    }
}

/// One `create_requirement` per member matching the role filter, in roster order.
pub fn expand_fan_out(
    args: &CreateRequirementForEachMemberArgs,
    members: &[TeamMember],
) -> Vec<CreateRequirementArgs> {
    members
        .iter()
        .filter(|m| role_matches(m, args.role.as_deref()))
        .map(|m| {
            let mut fields = args.fields.clone();
            fields.name = format!("{} - {}", args.fields.name, m.nickname);
            CreateRequirementArgs {
                project_id: args.project_id.clone(),
                owner_id: Some(m.id.to_string()),
                template_id: args.template_id.clone(),
                fields,
            }
        })
        .collect()
}

/// Render the pending writes of `plan` without executing anything.
///
/// Reads are omitted; fan-out calls become one entry per matching member.
pub async fn build_preview(
    pool: &SqlitePool,
    plan: &[ToolCall],
) -> Result<Vec<PreviewEntry>, sqlx::Error> {
    let mut members: Option<Vec<TeamMember>> = None;
    let mut entries = Vec::new();

    for call in plan {
        if catalog::is_read(&call.name) {
            continue;
        }

        match Operation::parse(&call.name, &call.arguments) {
            Ok(Operation::CreateRequirementForEachMember(args)) => {
                if members.is_none() {
                    members = Some(TeamMember::find_all(pool).await?);
                }
                let roster = members.as_deref().unwrap_or(&[]);
                for sub in expand_fan_out(&args, roster) {
                    let op = Operation::CreateRequirement(sub);
                    entries.push(PreviewEntry {
                        tool_call_id: call.id.clone(),
                        operation_name: op.name().to_string(),
                        arguments: op.arguments(),
                        description: op.describe(),
                    });
                }
            }
            Ok(op) => entries.push(PreviewEntry {
                tool_call_id: call.id.clone(),
                operation_name: op.name().to_string(),
                arguments: op.arguments(),
                description: op.describe(),
            }),
            // Shown anyway so the operator sees what will fail.
            Err(_) => entries.push(PreviewEntry {
                tool_call_id: call.id.clone(),
                operation_name: call.name.clone(),
                arguments: call.arguments.clone(),
                description: catalog::describe(&call.name, &call.arguments),
            }),
        }
    }

    tracing::info!(
        "[COMMAND] Preview built: {} call(s) -> {} pending write(s)",
        plan.len(),
        entries.len()
    );

    Ok(entries)
}
