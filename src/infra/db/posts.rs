use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{
    FeedPost, FeedScope, NewPostParams, PostsRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::map_sqlx_error;
use super::types::{FeedPostRow, PostRow};

const FEED_SELECT: &str = "SELECT p.id, p.text, p.image, p.published_at, \
     u.id AS author_id, u.username AS author_username, \
     g.id AS group_id, g.title AS group_title, g.slug AS group_slug \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id \
     WHERE 1=1 ";

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_feed(&self, scope: FeedScope) -> Result<Vec<FeedPost>, RepoError> {
        let mut qb = QueryBuilder::new(FEED_SELECT);
        Self::apply_feed_scope(&mut qb, scope);
        qb.push(" ORDER BY p.published_at DESC, p.id DESC ");

        let rows = qb
            .build_query_as::<FeedPostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FeedPost::from).collect())
    }

    async fn find_feed_post(&self, id: Uuid) -> Result<Option<FeedPost>, RepoError> {
        let mut qb = QueryBuilder::new(FEED_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<FeedPostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(FeedPost::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, text, author_id, group_id, image, published_at \
             FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "INSERT INTO posts (id, text, author_id, group_id, image, published_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             RETURNING id, text, author_id, group_id, image, published_at",
        )
        .bind(Uuid::new_v4())
        .bind(&params.text)
        .bind(params.author_id)
        .bind(params.group_id)
        .bind(&params.image)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "UPDATE posts SET text = $2, group_id = $3, image = $4 \
             WHERE id = $1 \
             RETURNING id, text, author_id, group_id, image, published_at",
        )
        .bind(params.id)
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(PostRecord::from(row))
    }
}
