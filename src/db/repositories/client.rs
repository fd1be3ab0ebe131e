//! Client repository

use crate::db::{on_pool, DynDatabasePool, InsertedId};
use crate::models::Client;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(&self, client: &Client) -> Result<Client>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Client>>;

    /// All clients by `sort_order`, then name
    async fn list(&self) -> Result<Vec<Client>>;

    async fn count(&self) -> Result<i64>;

    async fn update(&self, client: &Client) -> Result<Client>;

    async fn delete(&self, id: i64) -> Result<()>;
}

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: i64,
    name: String,
    logo_url: Option<String>,
    website_url: Option<String>,
    description: Option<String>,
    sort_order: i64,
    created_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            name: row.name,
            logo_url: row.logo_url,
            website_url: row.website_url,
            description: row.description,
            sort_order: row.sort_order,
            created_at: row.created_at,
        }
    }
}

const CLIENT_COLUMNS: &str = "id, name, logo_url, website_url, description, sort_order, created_at";

pub struct SqlxClientRepository {
    pool: DynDatabasePool,
}

impl SqlxClientRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ClientRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ClientRepository for SqlxClientRepository {
    async fn create(&self, client: &Client) -> Result<Client> {
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO clients (name, logo_url, website_url, description, sort_order, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&client.name)
            .bind(&client.logo_url)
            .bind(&client.website_url)
            .bind(&client.description)
            .bind(client.sort_order)
            .bind(client.created_at)
            .execute(conn)
            .await
            .map(|r| r.inserted_id())
        })
        .context("Failed to create client")?;

        Ok(Client { id, ..client.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Client>> {
        let sql = format!("SELECT {} FROM clients WHERE id = ?", CLIENT_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, ClientRow>(&sql).bind(id).fetch_optional(conn).await
        })
        .context("Failed to get client")?;

        Ok(row.map(Client::from))
    }

    async fn list(&self) -> Result<Vec<Client>> {
        let sql = format!("SELECT {} FROM clients ORDER BY sort_order, name", CLIENT_COLUMNS);
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, ClientRow>(&sql).fetch_all(conn).await
        })
        .context("Failed to list clients")?;

        Ok(rows.into_iter().map(Client::from).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients").fetch_one(conn).await
        })
        .context("Failed to count clients")?;

        Ok(count)
    }

    async fn update(&self, client: &Client) -> Result<Client> {
        on_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE clients SET name = ?, logo_url = ?, website_url = ?, description = ?, sort_order = ? WHERE id = ?",
            )
            .bind(&client.name)
            .bind(&client.logo_url)
            .bind(&client.website_url)
            .bind(&client.description)
            .bind(client.sort_order)
            .bind(client.id)
            .execute(conn)
            .await
            .map(|_| ())
        })
        .context("Failed to update client")?;

        Ok(client.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM clients WHERE id = ?").bind(id).execute(conn).await.map(|_| ())
        })
        .context("Failed to delete client")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_client_crud() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let repo = SqlxClientRepository::new(pool);

        let created = repo
            .create(&Client {
                id: 0,
                name: "Acme".into(),
                logo_url: Some("/uploads/acme.png".into()),
                website_url: None,
                description: None,
                sort_order: 1,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.logo_url.as_deref(), Some("/uploads/acme.png"));

        fetched.name = "Acme Corp".into();
        repo.update(&fetched).await.unwrap();
        assert_eq!(repo.list().await.unwrap()[0].name, "Acme Corp");
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.delete(created.id).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
