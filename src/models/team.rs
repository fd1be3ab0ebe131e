//! Departments and team members

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Seniority of a team member, used for ordering on the about page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Executive,
    Lead,
    #[default]
    Member,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Executive => "executive",
            TeamRole::Lead => "lead",
            TeamRole::Member => "member",
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "executive" => Ok(TeamRole::Executive),
            "lead" => Ok(TeamRole::Lead),
            "member" => Ok(TeamRole::Member),
            _ => Err(anyhow::anyhow!("Invalid team role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    pub name: String,
    /// Job title
    pub title: String,
    pub department_id: Option<i64>,
    pub role: TeamRole,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub achievements: Vec<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Members of one department; `department` is `None` for unassigned members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentGroup {
    pub department: Option<Department>,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDepartmentInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDepartmentInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamMemberInput {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub role: TeamRole,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub sort_order: i64,
}

/// Omitted fields are left unchanged. `department_id: 0` unassigns the member.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTeamMemberInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub role: Option<TeamRole>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub achievements: Option<Vec<String>>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_role_order_and_parse() {
        assert!(TeamRole::Executive < TeamRole::Lead);
        assert!(TeamRole::Lead < TeamRole::Member);
        assert_eq!("LEAD".parse::<TeamRole>().unwrap(), TeamRole::Lead);
        assert!("intern".parse::<TeamRole>().is_err());
        assert_eq!(TeamRole::default(), TeamRole::Member);
    }
}
