//! Feed assembly: ordered candidate sets for every feed view.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{
    AuthorRef, FeedPost, FeedScope, GroupsRepo, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::GroupRecord;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown user")]
    UnknownUser,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Group feed: the group itself plus its ordered posts.
#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub posts: Vec<FeedPost>,
}

/// Profile feed: the author plus their ordered posts.
#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: AuthorRef,
    pub post_count: usize,
    pub posts: Vec<FeedPost>,
}

/// Builds the ordered candidate set of posts for each feed view.
///
/// Every query is read-only and returns posts with author and group already
/// joined; pagination happens afterwards over the materialized set.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
        }
    }

    /// Every post, most recent first.
    pub async fn index_feed(&self) -> Result<Vec<FeedPost>, FeedError> {
        Ok(self.posts.list_feed(FeedScope::All).await?)
    }

    /// Posts of the group addressed by `slug`.
    pub async fn group_feed(&self, slug: &str) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;

        let posts = self.posts.list_feed(FeedScope::Group(group.id)).await?;
        Ok(GroupFeed { group, posts })
    }

    /// Posts written by the author addressed by `username`.
    pub async fn profile_feed(&self, username: &str) -> Result<ProfileFeed, FeedError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::UnknownUser)?;

        let posts = self.posts.list_feed(FeedScope::Author(user.id)).await?;
        let post_count = posts.len();

        Ok(ProfileFeed {
            author: AuthorRef {
                id: user.id,
                username: user.username,
            },
            post_count,
            posts,
        })
    }

    /// Posts written by authors the given user follows.
    ///
    /// Following nobody yields an empty feed, not an error.
    pub async fn follow_feed(&self, user_id: Uuid) -> Result<Vec<FeedPost>, FeedError> {
        Ok(self.posts.list_feed(FeedScope::FollowedBy(user_id)).await?)
    }
}
