//! In-memory repositories and request helpers shared by the HTTP tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{
        Request, Response,
        header::{CONTENT_TYPE, COOKIE},
    },
};
use time::{Duration, OffsetDateTime, macros::datetime};
use tower::ServiceExt;
use uuid::Uuid;

use brusio::application::accounts::{AccountService, SessionStore};
use brusio::application::feed::FeedService;
use brusio::application::follows::FollowService;
use brusio::application::posts::PostService;
use brusio::application::repos::{
    AuthorRef, CommentWithAuthor, CommentsRepo, FeedPost, FeedScope, FollowsRepo, GroupRef,
    GroupsRepo, NewCommentParams, NewGroupParams, NewPostParams, NewUserParams, PostsRepo,
    RepoError, UpdatePostParams, UsersRepo,
};
use brusio::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord,
};
use brusio::infra::http::{RouterState, build_router};
use brusio::infra::page_cache::PageCache;

/// Hand-rolled repository fake mirroring the Postgres ordering contract.
#[derive(Default)]
pub struct InMemoryRepos {
    users: Mutex<Vec<UserRecord>>,
    groups: Mutex<Vec<GroupRecord>>,
    posts: Mutex<Vec<PostRecord>>,
    comments: Mutex<Vec<CommentRecord>>,
    follows: Mutex<Vec<FollowRecord>>,
    ticks: Mutex<i64>,
}

impl InMemoryRepos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_timestamp(&self) -> OffsetDateTime {
        let mut ticks = self.ticks.lock().unwrap();
        *ticks += 1;
        datetime!(2024-01-01 00:00 UTC) + Duration::minutes(*ticks)
    }

    pub fn add_user(&self, username: &str) -> UserRecord {
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_salt: "salt".to_string(),
            password_hash: Vec::new(),
            joined_at: self.next_timestamp(),
        };
        self.users.lock().unwrap().push(record.clone());
        record
    }

    pub fn add_group(&self, title: &str, slug: &str) -> GroupRecord {
        let record = GroupRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("{title} description"),
            created_at: self.next_timestamp(),
        };
        self.groups.lock().unwrap().push(record.clone());
        record
    }

    pub fn add_post(&self, author: &UserRecord, group: Option<&GroupRecord>, text: &str) -> PostRecord {
        let record = PostRecord {
            id: Uuid::new_v4(),
            text: text.to_string(),
            author_id: author.id,
            group_id: group.map(|group| group.id),
            image: None,
            published_at: self.next_timestamp(),
        };
        self.posts.lock().unwrap().push(record.clone());
        record
    }

    pub fn add_follow(&self, user: &UserRecord, author: &UserRecord) {
        self.follows.lock().unwrap().push(FollowRecord {
            user_id: user.id,
            author_id: author.id,
            created_at: self.next_timestamp(),
        });
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.lock().unwrap().len()
    }

    pub fn follow_count(&self) -> usize {
        self.follows.lock().unwrap().len()
    }

    pub fn post_text(&self, id: Uuid) -> Option<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .map(|post| post.text.clone())
    }

    fn to_feed_post(&self, post: &PostRecord) -> FeedPost {
        let users = self.users.lock().unwrap();
        let groups = self.groups.lock().unwrap();

        let author = users
            .iter()
            .find(|user| user.id == post.author_id)
            .map(|user| AuthorRef {
                id: user.id,
                username: user.username.clone(),
            })
            .expect("post author exists");

        let group = post.group_id.and_then(|group_id| {
            groups
                .iter()
                .find(|group| group.id == group_id)
                .map(|group| GroupRef {
                    id: group.id,
                    title: group.title.clone(),
                    slug: group.slug.clone(),
                })
        });

        FeedPost {
            id: post.id,
            text: post.text.clone(),
            image: post.image.clone(),
            published_at: post.published_at,
            author,
            group,
        }
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepos {
    async fn list_feed(&self, scope: FeedScope) -> Result<Vec<FeedPost>, RepoError> {
        let follows = self.follows.lock().unwrap().clone();
        let mut selected: Vec<PostRecord> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| match scope {
                FeedScope::All => true,
                FeedScope::Group(group_id) => post.group_id == Some(group_id),
                FeedScope::Author(author_id) => post.author_id == author_id,
                FeedScope::FollowedBy(user_id) => follows
                    .iter()
                    .any(|edge| edge.user_id == user_id && edge.author_id == post.author_id),
            })
            .cloned()
            .collect();

        selected.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(selected.iter().map(|post| self.to_feed_post(post)).collect())
    }

    async fn find_feed_post(&self, id: Uuid) -> Result<Option<FeedPost>, RepoError> {
        let post = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned();
        Ok(post.map(|post| self.to_feed_post(&post)))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }

    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError> {
        let record = PostRecord {
            id: Uuid::new_v4(),
            text: params.text,
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
            published_at: self.next_timestamp(),
        };
        self.posts.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        Ok(post.clone())
    }
}

#[async_trait]
impl GroupsRepo for InMemoryRepos {
    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.groups.lock().unwrap().clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|group| group.id == id)
            .cloned())
    }

    async fn create_group(&self, params: NewGroupParams) -> Result<GroupRecord, RepoError> {
        if self
            .groups
            .lock()
            .unwrap()
            .iter()
            .any(|group| group.slug == params.slug)
        {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }

        let record = GroupRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            description: params.description,
            created_at: self.next_timestamp(),
        };
        self.groups.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepos {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, params: NewUserParams) -> Result<UserRecord, RepoError> {
        if self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|user| user.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            password_salt: params.password_salt,
            password_hash: params.password_hash,
            joined_at: self.next_timestamp(),
        };
        self.users.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepos {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let users = self.users.lock().unwrap().clone();
        let mut comments: Vec<CommentRecord> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = users
                    .iter()
                    .find(|user| user.id == comment.author_id)
                    .map(|user| AuthorRef {
                        id: user.id,
                        username: user.username.clone(),
                    })
                    .expect("comment author exists");
                CommentWithAuthor {
                    id: comment.id,
                    text: comment.text,
                    created_at: comment.created_at,
                    author,
                }
            })
            .collect())
    }

    async fn create_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError> {
        let record = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: self.next_timestamp(),
        };
        self.comments.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl FollowsRepo for InMemoryRepos {
    async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut follows = self.follows.lock().unwrap();
        if follows
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id)
        {
            return Ok(false);
        }
        follows.push(FollowRecord {
            user_id,
            author_id,
            created_at: datetime!(2024-01-01 00:00 UTC),
        });
        Ok(true)
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        self.follows
            .lock()
            .unwrap()
            .retain(|edge| !(edge.user_id == user_id && edge.author_id == author_id));
        Ok(())
    }

    async fn followed_authors(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .filter(|edge| edge.user_id == user_id)
            .map(|edge| edge.author_id)
            .collect())
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id))
    }
}

/// Everything a test needs: the router, the fake store, and session issuing.
pub struct TestApp {
    pub router: Router,
    pub repos: Arc<InMemoryRepos>,
    pub sessions: Arc<SessionStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache(None)
    }

    pub fn with_cache(cache: Option<Arc<PageCache>>) -> Self {
        let repos = InMemoryRepos::new();
        let sessions = Arc::new(SessionStore::new(StdDuration::from_secs(3600)));

        let posts_repo: Arc<dyn PostsRepo> = repos.clone();
        let groups_repo: Arc<dyn GroupsRepo> = repos.clone();
        let users_repo: Arc<dyn UsersRepo> = repos.clone();
        let comments_repo: Arc<dyn CommentsRepo> = repos.clone();
        let follows_repo: Arc<dyn FollowsRepo> = repos.clone();

        let state = RouterState {
            feed: Arc::new(FeedService::new(
                posts_repo.clone(),
                groups_repo.clone(),
                users_repo.clone(),
            )),
            posts: Arc::new(PostService::new(posts_repo, groups_repo, comments_repo)),
            follows: Arc::new(FollowService::new(follows_repo, users_repo.clone())),
            accounts: Arc::new(AccountService::new(users_repo, sessions.clone())),
            db: None,
            cache,
        };

        Self {
            router: build_router(state),
            repos,
            sessions,
        }
    }

    pub fn login(&self, user: &UserRecord) -> Uuid {
        self.sessions.issue(user)
    }

    pub async fn get(&self, path: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(path)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    pub async fn get_as(&self, path: &str, session: Uuid) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(path)
                    .header(COOKIE, format!("brusio_session={session}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    pub async fn post_form(
        &self,
        path: &str,
        body: &str,
        session: Option<Uuid>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(session) = session {
            builder = builder.header(COOKIE, format!("brusio_session={session}"));
        }

        self.router
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).expect("request"))
            .await
            .expect("response")
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("collected body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn location_of(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}
