//! Client logo wall

use crate::cache::{self, Cache};
use crate::db::repositories::ClientRepository;
use crate::models::{Client, CreateClientInput, UpdateClientInput};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

const CACHE_KEY_CLIENT_LIST: &str = "clients:list";
const CACHE_PATTERN_CLIENTS: &str = "clients:*";

#[derive(Debug, thiserror::Error)]
pub enum ClientServiceError {
    #[error("Client not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ClientService {
    repo: Arc<dyn ClientRepository>,
    cache: Arc<Cache>,
}

impl ClientService {
    pub fn new(repo: Arc<dyn ClientRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn list(&self) -> Result<Vec<Client>, ClientServiceError> {
        Ok(cache::cached(&self.cache, CACHE_KEY_CLIENT_LIST, || self.repo.list()).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Client, ClientServiceError> {
        self.repo.get_by_id(id).await?.ok_or(ClientServiceError::NotFound(id))
    }

    pub async fn create(&self, input: CreateClientInput) -> Result<Client, ClientServiceError> {
        let client = Client {
            id: 0,
            name: validate_name(&input.name)?,
            logo_url: non_empty(input.logo_url),
            website_url: validate_url(input.website_url)?,
            description: non_empty(input.description),
            sort_order: input.sort_order,
            created_at: Utc::now(),
        };
        let created = self.repo.create(&client).await.context("Failed to create client")?;
        self.invalidate().await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateClientInput) -> Result<Client, ClientServiceError> {
        let mut client = self.get(id).await?;

        if let Some(name) = input.name {
            client.name = validate_name(&name)?;
        }
        if let Some(logo) = input.logo_url {
            client.logo_url = non_empty(Some(logo));
        }
        if let Some(url) = input.website_url {
            client.website_url = validate_url(Some(url))?;
        }
        if let Some(description) = input.description {
            client.description = non_empty(Some(description));
        }
        if let Some(order) = input.sort_order {
            client.sort_order = order;
        }

        let updated = self.repo.update(&client).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await?;
        self.invalidate().await;
        Ok(())
    }

    async fn invalidate(&self) {
        cache::invalidate(&self.cache, CACHE_PATTERN_CLIENTS).await;
    }
}

fn validate_name(name: &str) -> Result<String, ClientServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientServiceError::ValidationError("Client name cannot be empty".into()));
    }
    Ok(name.to_string())
}

/// Website links must be absolute http(s) URLs
fn validate_url(url: Option<String>) -> Result<Option<String>, ClientServiceError> {
    match non_empty(url) {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(Some(url)),
        Some(url) => Err(ClientServiceError::ValidationError(format!("Invalid website URL: {}", url))),
        None => Ok(None),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxClientRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> ClientService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        ClientService::new(SqlxClientRepository::boxed(pool), Arc::new(MemoryCache::new()))
    }

    fn input(name: &str, order: i64) -> CreateClientInput {
        CreateClientInput {
            name: name.to_string(),
            logo_url: Some("/uploads/logo.png".into()),
            website_url: Some("https://example.com".into()),
            description: None,
            sort_order: order,
        }
    }

    #[tokio::test]
    async fn test_client_crud() {
        let service = setup().await;
        let b = service.create(input("Beta", 2)).await.unwrap();
        service.create(input("Alpha", 1)).await.unwrap();

        let names: Vec<_> = service.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);

        let updated = service
            .update(
                b.id,
                UpdateClientInput {
                    sort_order: Some(0),
                    website_url: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.website_url.is_none());
        assert_eq!(service.list().await.unwrap()[0].name, "Beta");

        service.delete(b.id).await.unwrap();
        assert!(matches!(service.get(b.id).await, Err(ClientServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_client_validation() {
        let service = setup().await;
        assert!(matches!(
            service.create(input(" ", 0)).await,
            Err(ClientServiceError::ValidationError(_))
        ));

        let mut bad = input("Gamma", 0);
        bad.website_url = Some("javascript:alert(1)".into());
        assert!(matches!(
            service.create(bad).await,
            Err(ClientServiceError::ValidationError(_))
        ));
    }
}
