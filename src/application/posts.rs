//! Post authoring and the post-detail view.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{
    CommentWithAuthor, CommentsRepo, FeedPost, GroupsRepo, NewCommentParams, NewPostParams,
    PostsRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts as post_rules;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found")]
    NotFound,
    #[error("only the author may edit a post")]
    NotAuthor,
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Validated input for creating or editing a post.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

/// A single post plus its comment thread.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: FeedPost,
    pub comments: Vec<CommentWithAuthor>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            comments,
        }
    }

    pub async fn detail(&self, id: Uuid) -> Result<PostDetail, PostError> {
        let post = self
            .posts
            .find_feed_post(id)
            .await?
            .ok_or(PostError::NotFound)?;

        let comments = self.comments.list_for_post(id).await?;
        Ok(PostDetail { post, comments })
    }

    /// Groups offered in the post form's group selector.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_all().await?)
    }

    pub async fn create(&self, author_id: Uuid, input: PostInput) -> Result<PostRecord, PostError> {
        let input = self.validate(input).await?;

        let record = self
            .posts
            .create_post(NewPostParams {
                text: input.text,
                author_id,
                group_id: input.group_id,
                image: input.image,
            })
            .await?;

        tracing::info!(
            target = "brusio::posts",
            post_id = %record.id,
            author_id = %author_id,
            preview = %post_rules::preview(&record.text),
            "post created"
        );

        Ok(record)
    }

    /// The post as loaded for its edit form. Fails with `NotAuthor` for any
    /// editor other than the post's author.
    pub async fn edit_context(&self, id: Uuid, editor_id: Uuid) -> Result<PostRecord, PostError> {
        let record = self.posts.find_by_id(id).await?.ok_or(PostError::NotFound)?;
        if record.author_id != editor_id {
            return Err(PostError::NotAuthor);
        }
        Ok(record)
    }

    pub async fn update(
        &self,
        id: Uuid,
        editor_id: Uuid,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let record = self.posts.find_by_id(id).await?.ok_or(PostError::NotFound)?;
        if record.author_id != editor_id {
            return Err(PostError::NotAuthor);
        }

        let input = self.validate(input).await?;

        Ok(self
            .posts
            .update_post(UpdatePostParams {
                id,
                text: input.text,
                group_id: input.group_id,
                image: input.image,
            })
            .await?)
    }

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: String,
    ) -> Result<CommentRecord, PostError> {
        post_rules::validate_comment_text(&text)?;

        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(PostError::NotFound);
        }

        Ok(self
            .comments
            .create_comment(NewCommentParams {
                post_id,
                author_id,
                text: text.trim().to_string(),
            })
            .await?)
    }

    async fn validate(&self, input: PostInput) -> Result<PostInput, PostError> {
        post_rules::validate_post_text(&input.text)?;

        if let Some(group_id) = input.group_id {
            if self.groups.find_by_id(group_id).await?.is_none() {
                return Err(DomainError::missing_reference("group").into());
            }
        }

        Ok(PostInput {
            text: input.text.trim().to_string(),
            group_id: input.group_id,
            image: input
                .image
                .map(|image| image.trim().to_string())
                .filter(|image| !image.is_empty()),
        })
    }
}
