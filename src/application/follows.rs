//! The follow graph: directed edges from readers to authors.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown user")]
    UnknownUser,
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    /// Follow the author addressed by `author_username`.
    ///
    /// Following an author twice is a silent no-op; following yourself is
    /// rejected.
    pub async fn follow(&self, user_id: Uuid, author_username: &str) -> Result<(), FollowError> {
        let author = self.resolve_author(author_username).await?;

        if author.id == user_id {
            return Err(DomainError::validation("a user cannot follow themselves").into());
        }

        let created = self.follows.insert_follow(user_id, author.id).await?;
        if created {
            tracing::info!(
                target = "brusio::follows",
                user_id = %user_id,
                author_id = %author.id,
                "follow edge created"
            );
        }

        Ok(())
    }

    /// Remove the edge towards `author_username`; absent edges are a no-op.
    pub async fn unfollow(&self, user_id: Uuid, author_username: &str) -> Result<(), FollowError> {
        let author = self.resolve_author(author_username).await?;
        self.follows.delete_follow(user_id, author.id).await?;
        Ok(())
    }

    /// Authors the given user follows, as consumed by the follow feed.
    pub async fn followed_authors(&self, user_id: Uuid) -> Result<Vec<Uuid>, FollowError> {
        Ok(self.follows.followed_authors(user_id).await?)
    }

    pub async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, FollowError> {
        Ok(self.follows.is_following(user_id, author_id).await?)
    }

    async fn resolve_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or(FollowError::UnknownUser)
    }
}
