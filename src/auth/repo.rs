use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Clone, Error)]
pub enum RepoError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("storage error: {0}")]
    Storage(String),
}

/// Persistence for user records.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Inserts a new record with a fresh id. The email uniqueness check and the
    /// insert happen as one step; a lost race yields `DuplicateEmail`.
    async fn create(&self, new_user: NewUser) -> Result<User, RepoError>;

    /// Exact, case-sensitive match.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<Uuid, User>,
    id_by_email: HashMap<String, Uuid>,
}

/// Volatile store indexed by id and by email. Contents last as long as the value does.
///
/// Nothing is ever evicted, so memory grows with every registration.
#[derive(Default)]
pub struct InMemoryUserRepository {
    tables: RwLock<Tables>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.id_by_email.contains_key(&new_user.email) {
            return Err(RepoError::DuplicateEmail);
        }

        let mut id = Uuid::new_v4();
        while tables.by_id.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let user = User {
            id,
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.id_by_email.insert(user.email.clone(), id);
        tables.by_id.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .id_by_email
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.by_id.get(&id).cloned())
    }
}
