//! Departments and team members repository

use crate::db::{on_pool, DynDatabasePool, InsertedId};
use crate::models::{Department, TeamMember};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn create_department(&self, department: &Department) -> Result<Department>;

    async fn get_department(&self, id: i64) -> Result<Option<Department>>;

    /// All departments by `sort_order`, then name
    async fn list_departments(&self) -> Result<Vec<Department>>;

    async fn update_department(&self, department: &Department) -> Result<Department>;

    /// Delete a department; its members become unassigned
    async fn delete_department(&self, id: i64) -> Result<()>;

    async fn department_slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    async fn create_member(&self, member: &TeamMember) -> Result<TeamMember>;

    async fn get_member(&self, id: i64) -> Result<Option<TeamMember>>;

    /// All members by `sort_order`, then name
    async fn list_members(&self) -> Result<Vec<TeamMember>>;

    /// Number of members
    async fn count(&self) -> Result<i64>;

    async fn update_member(&self, member: &TeamMember) -> Result<TeamMember>;

    async fn delete_member(&self, id: i64) -> Result<()>;

    /// Most recently added members
    async fn recent_members(&self, limit: i64) -> Result<Vec<TeamMember>>;
}

#[derive(sqlx::FromRow)]
struct DepartmentRow {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    sort_order: i64,
    created_at: DateTime<Utc>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Department {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            sort_order: row.sort_order,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: i64,
    name: String,
    title: String,
    department_id: Option<i64>,
    role: String,
    bio: Option<String>,
    photo_url: Option<String>,
    achievements: String,
    sort_order: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for TeamMember {
    type Error = anyhow::Error;

    fn try_from(row: MemberRow) -> Result<Self> {
        Ok(TeamMember {
            achievements: serde_json::from_str(&row.achievements)
                .with_context(|| format!("Invalid achievements JSON for member {}", row.id))?,
            role: row.role.parse()?,
            id: row.id,
            name: row.name,
            title: row.title,
            department_id: row.department_id,
            bio: row.bio,
            photo_url: row.photo_url,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const DEPARTMENT_COLUMNS: &str = "id, name, slug, description, sort_order, created_at";

const MEMBER_COLUMNS: &str = "id, name, title, department_id, role, bio, photo_url, achievements, \
    sort_order, created_at, updated_at";

pub struct SqlxTeamRepository {
    pool: DynDatabasePool,
}

impl SqlxTeamRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TeamRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TeamRepository for SqlxTeamRepository {
    async fn create_department(&self, department: &Department) -> Result<Department> {
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO departments (name, slug, description, sort_order, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&department.name)
            .bind(&department.slug)
            .bind(&department.description)
            .bind(department.sort_order)
            .bind(department.created_at)
            .execute(conn)
            .await
            .map(|r| r.inserted_id())
        })
        .context("Failed to create department")?;

        Ok(Department { id, ..department.clone() })
    }

    async fn get_department(&self, id: i64) -> Result<Option<Department>> {
        let sql = format!("SELECT {} FROM departments WHERE id = ?", DEPARTMENT_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, DepartmentRow>(&sql).bind(id).fetch_optional(conn).await
        })
        .context("Failed to get department")?;

        Ok(row.map(Department::from))
    }

    async fn list_departments(&self) -> Result<Vec<Department>> {
        let sql = format!("SELECT {} FROM departments ORDER BY sort_order, name", DEPARTMENT_COLUMNS);
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, DepartmentRow>(&sql).fetch_all(conn).await
        })
        .context("Failed to list departments")?;

        Ok(rows.into_iter().map(Department::from).collect())
    }

    async fn update_department(&self, department: &Department) -> Result<Department> {
        on_pool!(self.pool, conn => {
            sqlx::query("UPDATE departments SET name = ?, slug = ?, description = ?, sort_order = ? WHERE id = ?")
                .bind(&department.name)
                .bind(&department.slug)
                .bind(&department.description)
                .bind(department.sort_order)
                .bind(department.id)
                .execute(conn)
                .await
                .map(|_| ())
        })
        .context("Failed to update department")?;

        Ok(department.clone())
    }

    async fn delete_department(&self, id: i64) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM departments WHERE id = ?").bind(id).execute(conn).await.map(|_| ())
        })
        .context("Failed to delete department")?;

        Ok(())
    }

    async fn department_slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(conn)
                .await
        })
        .context("Failed to check department slug")?;

        Ok(count > 0)
    }

    async fn create_member(&self, member: &TeamMember) -> Result<TeamMember> {
        let achievements = serde_json::to_string(&member.achievements)?;
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO team_members (name, title, department_id, role, bio, photo_url,
                    achievements, sort_order, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&member.name)
            .bind(&member.title)
            .bind(member.department_id)
            .bind(member.role.as_str())
            .bind(&member.bio)
            .bind(&member.photo_url)
            .bind(&achievements)
            .bind(member.sort_order)
            .bind(member.created_at)
            .bind(member.updated_at)
            .execute(conn)
            .await
            .map(|r| r.inserted_id())
        })
        .context("Failed to create team member")?;

        Ok(TeamMember { id, ..member.clone() })
    }

    async fn get_member(&self, id: i64) -> Result<Option<TeamMember>> {
        let sql = format!("SELECT {} FROM team_members WHERE id = ?", MEMBER_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, MemberRow>(&sql).bind(id).fetch_optional(conn).await
        })
        .context("Failed to get team member")?;

        row.map(TeamMember::try_from).transpose()
    }

    async fn list_members(&self) -> Result<Vec<TeamMember>> {
        let sql = format!("SELECT {} FROM team_members ORDER BY sort_order, name", MEMBER_COLUMNS);
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, MemberRow>(&sql).fetch_all(conn).await
        })
        .context("Failed to list team members")?;

        rows.into_iter().map(TeamMember::try_from).collect()
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM team_members").fetch_one(conn).await
        })
        .context("Failed to count team members")?;

        Ok(count)
    }

    async fn update_member(&self, member: &TeamMember) -> Result<TeamMember> {
        let achievements = serde_json::to_string(&member.achievements)?;
        let now = Utc::now();
        on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                UPDATE team_members
                SET name = ?, title = ?, department_id = ?, role = ?, bio = ?, photo_url = ?,
                    achievements = ?, sort_order = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&member.name)
            .bind(&member.title)
            .bind(member.department_id)
            .bind(member.role.as_str())
            .bind(&member.bio)
            .bind(&member.photo_url)
            .bind(&achievements)
            .bind(member.sort_order)
            .bind(now)
            .bind(member.id)
            .execute(conn)
            .await
            .map(|_| ())
        })
        .context("Failed to update team member")?;

        Ok(TeamMember {
            updated_at: now,
            ..member.clone()
        })
    }

    async fn delete_member(&self, id: i64) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM team_members WHERE id = ?").bind(id).execute(conn).await.map(|_| ())
        })
        .context("Failed to delete team member")?;

        Ok(())
    }

    async fn recent_members(&self, limit: i64) -> Result<Vec<TeamMember>> {
        let sql = format!(
            "SELECT {} FROM team_members ORDER BY created_at DESC, id DESC LIMIT ?",
            MEMBER_COLUMNS
        );
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, MemberRow>(&sql).bind(limit).fetch_all(conn).await
        })
        .context("Failed to get recent team members")?;

        rows.into_iter().map(TeamMember::try_from).collect()
    }
}
