//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which slice of the post timeline a feed query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Every post.
    All,
    /// Posts assigned to one group.
    Group(Uuid),
    /// Posts written by one author.
    Author(Uuid),
    /// Posts written by authors the given user follows.
    FollowedBy(Uuid),
}

/// Author reference resolved alongside each feed post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
}

/// Group reference resolved alongside each feed post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

/// A post with its author and group batch-joined by the repository.
///
/// Feed queries resolve both references in the same statement so rendering
/// never goes back to the store per item.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPost {
    pub id: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub published_at: OffsetDateTime,
    pub author: AuthorRef,
    pub group: Option<GroupRef>,
}

#[derive(Debug, Clone)]
pub struct NewPostParams {
    pub text: String,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Full ordered candidate set for a feed scope, most recent first.
    ///
    /// Ordering is `published_at DESC, id DESC` and is the contract every
    /// feed consumer depends on.
    async fn list_feed(&self, scope: FeedScope) -> Result<Vec<FeedPost>, RepoError>;

    async fn find_feed_post(&self, id: Uuid) -> Result<Option<FeedPost>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError>;

    async fn create_group(&self, params: NewGroupParams) -> Result<GroupRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewUserParams {
    pub username: String,
    pub password_salt: String,
    pub password_hash: Vec<u8>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(&self, params: NewUserParams) -> Result<UserRecord, RepoError>;
}

/// Comment joined with its author's username for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub author: AuthorRef,
}

#[derive(Debug, Clone)]
pub struct NewCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError>;

    async fn create_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the edge if absent. Returns `true` when a new edge was created,
    /// `false` when it already existed.
    async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    /// Remove the edge; absent edges are a no-op.
    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError>;

    async fn followed_authors(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError>;

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;
}
