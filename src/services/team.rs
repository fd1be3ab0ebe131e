//! Departments and team members
//!
//! The public directory groups members by department (in department
//! order), executives first within each group. Members without a
//! department are listed last.

use crate::cache::{self, Cache};
use crate::db::repositories::TeamRepository;
use crate::models::{
    CreateDepartmentInput, CreateTeamMemberInput, Department, DepartmentGroup, TeamMember,
    UpdateDepartmentInput, UpdateTeamMemberInput,
};
use crate::services::slug::{generate_slug, is_valid_slug};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

const CACHE_KEY_DIRECTORY: &str = "team:directory";
const CACHE_KEY_DEPARTMENTS: &str = "team:departments";
const CACHE_PATTERN_TEAM: &str = "team:*";

const MAX_ACHIEVEMENTS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum TeamServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Department slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TeamService {
    repo: Arc<dyn TeamRepository>,
    cache: Arc<Cache>,
}

impl TeamService {
    pub fn new(repo: Arc<dyn TeamRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, TeamServiceError> {
        Ok(cache::cached(&self.cache, CACHE_KEY_DEPARTMENTS, || self.repo.list_departments()).await?)
    }

    pub async fn create_department(&self, input: CreateDepartmentInput) -> Result<Department, TeamServiceError> {
        let name = require_text("Name", &input.name)?;
        let slug = normalize_slug(input.slug.as_deref().unwrap_or(&name))?;
        if self.repo.department_slug_exists(&slug, None).await? {
            return Err(TeamServiceError::DuplicateSlug(slug));
        }

        let department = Department {
            id: 0,
            name,
            slug,
            description: non_empty(input.description),
            sort_order: input.sort_order,
            created_at: Utc::now(),
        };
        let created = self
            .repo
            .create_department(&department)
            .await
            .context("Failed to create department")?;
        self.invalidate().await;
        Ok(created)
    }

    pub async fn update_department(
        &self,
        id: i64,
        input: UpdateDepartmentInput,
    ) -> Result<Department, TeamServiceError> {
        let mut department = self.require_department(id).await?;

        if let Some(name) = input.name {
            department.name = require_text("Name", &name)?;
        }
        if let Some(slug) = input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let slug = normalize_slug(slug)?;
            if slug != department.slug && self.repo.department_slug_exists(&slug, Some(id)).await? {
                return Err(TeamServiceError::DuplicateSlug(slug));
            }
            department.slug = slug;
        }
        if let Some(description) = input.description {
            department.description = non_empty(Some(description));
        }
        if let Some(order) = input.sort_order {
            department.sort_order = order;
        }

        let updated = self.repo.update_department(&department).await?;
        self.invalidate().await;
        Ok(updated)
    }

    /// Delete a department; its members become unassigned
    pub async fn delete_department(&self, id: i64) -> Result<(), TeamServiceError> {
        self.require_department(id).await?;
        self.repo.delete_department(id).await?;
        self.invalidate().await;
        Ok(())
    }

    pub async fn list_members(&self) -> Result<Vec<TeamMember>, TeamServiceError> {
        Ok(self.repo.list_members().await?)
    }

    pub async fn get_member(&self, id: i64) -> Result<TeamMember, TeamServiceError> {
        self.repo
            .get_member(id)
            .await?
            .ok_or_else(|| TeamServiceError::NotFound(format!("Team member {}", id)))
    }

    pub async fn create_member(&self, input: CreateTeamMemberInput) -> Result<TeamMember, TeamServiceError> {
        let department_id = self.check_department(input.department_id).await?;
        let now = Utc::now();
        let member = TeamMember {
            id: 0,
            name: require_text("Name", &input.name)?,
            title: require_text("Title", &input.title)?,
            department_id,
            role: input.role,
            bio: non_empty(input.bio),
            photo_url: non_empty(input.photo_url),
            achievements: clean_achievements(input.achievements)?,
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create_member(&member)
            .await
            .context("Failed to create team member")?;
        self.invalidate().await;
        tracing::info!(member_id = created.id, "Team member added");
        Ok(created)
    }

    pub async fn update_member(
        &self,
        id: i64,
        input: UpdateTeamMemberInput,
    ) -> Result<TeamMember, TeamServiceError> {
        let mut member = self.get_member(id).await?;

        if let Some(name) = input.name {
            member.name = require_text("Name", &name)?;
        }
        if let Some(title) = input.title {
            member.title = require_text("Title", &title)?;
        }
        if input.department_id.is_some() {
            member.department_id = self.check_department(input.department_id).await?;
        }
        if let Some(role) = input.role {
            member.role = role;
        }
        if let Some(bio) = input.bio {
            member.bio = non_empty(Some(bio));
        }
        if let Some(photo) = input.photo_url {
            member.photo_url = non_empty(Some(photo));
        }
        if let Some(achievements) = input.achievements {
            member.achievements = clean_achievements(achievements)?;
        }
        if let Some(order) = input.sort_order {
            member.sort_order = order;
        }

        let updated = self.repo.update_member(&member).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn delete_member(&self, id: i64) -> Result<(), TeamServiceError> {
        self.get_member(id).await?;
        self.repo.delete_member(id).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Members grouped by department for the about page
    pub async fn directory(&self) -> Result<Vec<DepartmentGroup>, TeamServiceError> {
        Ok(cache::cached(&self.cache, CACHE_KEY_DIRECTORY, || async {
            let departments = self.repo.list_departments().await?;
            let members = self.repo.list_members().await?;
            Ok::<_, anyhow::Error>(group_by_department(departments, members))
        })
        .await?)
    }

    async fn require_department(&self, id: i64) -> Result<Department, TeamServiceError> {
        self.repo
            .get_department(id)
            .await?
            .ok_or_else(|| TeamServiceError::NotFound(format!("Department {}", id)))
    }

    /// `Some(0)` means "no department"
    async fn check_department(&self, id: Option<i64>) -> Result<Option<i64>, TeamServiceError> {
        match id {
            None | Some(0) => Ok(None),
            Some(id) => {
                if self.repo.get_department(id).await?.is_none() {
                    return Err(TeamServiceError::ValidationError(format!("Unknown department: {}", id)));
                }
                Ok(Some(id))
            }
        }
    }

    async fn invalidate(&self) {
        cache::invalidate(&self.cache, CACHE_PATTERN_TEAM).await;
    }
}

/// Departments in their order, members by role then `sort_order` then
/// name; empty departments are skipped and unassigned members come last.
pub fn group_by_department(departments: Vec<Department>, mut members: Vec<TeamMember>) -> Vec<DepartmentGroup> {
    members.sort_by(|a, b| {
        a.role
            .cmp(&b.role)
            .then(a.sort_order.cmp(&b.sort_order))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut groups: Vec<DepartmentGroup> = departments
        .into_iter()
        .map(|department| DepartmentGroup {
            department: Some(department),
            members: Vec::new(),
        })
        .collect();
    let mut unassigned = Vec::new();

    for member in members {
        let slot = member.department_id.and_then(|id| {
            groups
                .iter_mut()
                .find(|g| g.department.as_ref().map(|d| d.id) == Some(id))
        });
        match slot {
            Some(group) => group.members.push(member),
            None => unassigned.push(member),
        }
    }

    groups.retain(|g| !g.members.is_empty());
    if !unassigned.is_empty() {
        groups.push(DepartmentGroup {
            department: None,
            members: unassigned,
        });
    }
    groups
}

fn clean_achievements(items: Vec<String>) -> Result<Vec<String>, TeamServiceError> {
    let cleaned: Vec<String> = items
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if cleaned.len() > MAX_ACHIEVEMENTS {
        return Err(TeamServiceError::ValidationError(format!(
            "At most {} achievements",
            MAX_ACHIEVEMENTS
        )));
    }
    Ok(cleaned)
}

fn require_text(field: &str, value: &str) -> Result<String, TeamServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TeamServiceError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(value.to_string())
}

fn normalize_slug(value: &str) -> Result<String, TeamServiceError> {
    let slug = generate_slug(value);
    if !is_valid_slug(&slug) {
        return Err(TeamServiceError::ValidationError(format!("Invalid slug: {}", value)));
    }
    Ok(slug)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
