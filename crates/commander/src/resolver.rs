//! Entity resolver: loose names to stable identifiers
//!
//! Built fresh from the store on every invocation and rendered into the system
//! prompt so the backend can map "ops" or "eng review" to a real project id
//! instead of inventing one.

use db::models::{project::Project, team_member::TeamMember};
use indexmap::IndexSet;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Word to common abbreviations, matched on the lowercase token
const ABBREVIATIONS: &[(&str, &[&str])] = &[
    ("operations", &["ops", "oper"]),
    ("operation", &["ops", "op"]),
    ("engineering", &["eng"]),
    ("marketing", &["mktg", "mkt"]),
    ("management", &["mgmt"]),
    ("development", &["dev"]),
    ("department", &["dept"]),
    ("information", &["info"]),
    ("technology", &["tech"]),
    ("administration", &["admin"]),
    ("finance", &["fin"]),
    ("customer", &["cust"]),
    ("production", &["prod"]),
    ("product", &["prod"]),
    ("quality", &["qa"]),
    ("application", &["app"]),
    ("documentation", &["docs"]),
    ("infrastructure", &["infra"]),
    ("communications", &["comms"]),
    ("international", &["intl"]),
    ("project", &["proj"]),
    ("meeting", &["mtg"]),
];

fn abbreviations_for(token: &str) -> &'static [&'static str] {
    ABBREVIATIONS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, abbrs)| *abbrs)
        .unwrap_or(&[])
}

/// Aliases a project name is likely to be referred to by.
pub fn project_aliases(name: &str) -> Vec<String> {
    let canonical = name.trim().to_lowercase();
    let tokens: Vec<String> = name
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let mut aliases = IndexSet::new();

    if tokens.len() > 1 {
        let acronym: String = tokens.iter().filter_map(|t| t.chars().next()).collect();
        aliases.insert(acronym);
    }

    for token in &tokens {
        aliases.insert(token.clone());
        for abbr in abbreviations_for(token) {
            aliases.insert((*abbr).to_string());
        }
    }

    if tokens.len() > 1 {
        for (i, token) in tokens.iter().enumerate() {
            for abbr in abbreviations_for(token) {
                let mut words = tokens.clone();
                words[i] = (*abbr).to_string();
                aliases.insert(words.join(" "));
            }
        }
    }

    aliases
        .into_iter()
        .filter(|a| *a != canonical && a.chars().count() >= 2)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEntry {
    pub id: Uuid,
    pub display_name: String,
    pub aliases: Vec<String>,
    /// Category for projects, role for people
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDictionary {
    pub projects: Vec<EntityEntry>,
    pub people: Vec<EntityEntry>,
    /// Nickname of the designated default person
    pub default_assignee: String,
    /// Set when the default person currently exists on the team
    pub default_assignee_id: Option<Uuid>,
}

impl EntityDictionary {
    /// Snapshot the current projects and people.
    pub async fn build(pool: &SqlitePool, default_assignee: &str) -> Result<Self, sqlx::Error> {
        let projects = Project::find_all(pool).await?;
        let members = TeamMember::find_all(pool).await?;
        let dictionary = Self::from_entities(&projects, &members, default_assignee);

        tracing::debug!(
            "[COMMAND] Entity dictionary built: {} projects, {} people",
            dictionary.projects.len(),
            dictionary.people.len()
        );

        Ok(dictionary)
    }

    pub fn from_entities(
        projects: &[Project],
        members: &[TeamMember],
        default_assignee: &str,
    ) -> Self {
        let projects = projects
            .iter()
            .map(|p| EntityEntry {
                id: p.id,
                display_name: p.name.clone(),
                aliases: project_aliases(&p.name),
                detail: p.category.clone(),
            })
            .collect();

        let people = members
            .iter()
            .map(|m| {
                let nickname = m.nickname.to_lowercase();
                let aliases = m
                    .role
                    .as_ref()
                    .map(|r| r.trim().to_lowercase())
                    .filter(|r| r.chars().count() >= 2 && *r != nickname)
                    .into_iter()
                    .collect();
                EntityEntry {
                    id: m.id,
                    display_name: m.nickname.clone(),
                    aliases,
                    detail: m.role.clone(),
                }
            })
            .collect();

        let default_assignee_id = members
            .iter()
            .find(|m| m.nickname.eq_ignore_ascii_case(default_assignee))
            .map(|m| m.id);

        Self {
            projects,
            people,
            default_assignee: default_assignee.to_string(),
            default_assignee_id,
        }
    }

    /// Text block for the system prompt
    pub fn render(&self) -> String {
        let mut out = String::from("PROJECTS (use these ids, never invent one):\n");
        if self.projects.is_empty() {
            out.push_str("- (none)\n");
        }
        for p in &self.projects {
            out.push_str(&format!("- \"{}\" id={}", p.display_name, p.id));
            if let Some(ref category) = p.detail {
                out.push_str(&format!(" category={}", category));
            }
            if !p.aliases.is_empty() {
                out.push_str(&format!(" aliases: {}", p.aliases.join(", ")));
            }
            out.push('\n');
        }

        out.push_str("\nTEAM MEMBERS:\n");
        if self.people.is_empty() {
            out.push_str("- (none)\n");
        }
        for m in &self.people {
            out.push_str(&format!("- \"{}\" id={}", m.display_name, m.id));
            if let Some(ref role) = m.detail {
                out.push_str(&format!(" role={}", role));
            }
            out.push('\n');
        }

        match self.default_assignee_id {
            Some(id) => out.push_str(&format!(
                "\nDEFAULT ASSIGNEE: \"{}\" id={} (owner of any task created without one)\n",
                self.default_assignee, id
            )),
            None => out.push_str(&format!(
                "\nDEFAULT ASSIGNEE: \"{}\" (not on the team yet; tasks without an owner stay unassigned)\n",
                self.default_assignee
            )),
        }

        out
    }
}
