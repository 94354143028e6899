//! Public handlers: feeds, post detail, authoring, and follow actions.

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::feed::FeedError;
use crate::application::follows::FollowError;
use crate::application::pagination::paginate;
use crate::application::posts::PostError;
use crate::domain::entities::{GroupRecord, PostRecord};
use crate::domain::posts::format_human_date;
use crate::presentation::views::{
    CommentItem, FeedView, FollowTemplate, GroupBadge, GroupChoice, GroupTemplate, GroupView,
    IndexTemplate, LayoutContext, PageNav, PostCard, PostDetailTemplate, PostDetailView,
    PostFormTemplate, PostFormView, ProfileTemplate, ProfileView, ViewerView,
    render_not_found_response, render_template_response,
};

use super::RouterState;
use super::auth::{CurrentUser, RequireUser};
use super::forms::{CommentForm, PostForm};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    /// Malformed page input degrades to the paginator's default, never an error.
    fn requested(&self) -> Option<usize> {
        self.page.as_deref().and_then(|raw| raw.parse().ok())
    }
}

pub async fn index(
    State(state): State<RouterState>,
    Query(query): Query<PageQuery>,
    current: CurrentUser,
) -> Response {
    let posts = match state.feed.index_feed().await {
        Ok(posts) => posts,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let page = paginate(posts, query.requested());
    let cards = page.items.iter().map(PostCard::from_feed).collect();

    let view = LayoutContext::new(
        current.viewer(),
        FeedView {
            heading: "Latest posts".to_string(),
            posts: cards,
            nav: PageNav::from_page(&page, "/"),
        },
    );
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

pub async fn group_index(
    State(state): State<RouterState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    current: CurrentUser,
) -> Response {
    match state.feed.group_feed(&slug).await {
        Ok(feed) => {
            let page = paginate(feed.posts, query.requested());
            let cards = page.items.iter().map(PostCard::from_feed).collect();

            let view = LayoutContext::new(
                current.viewer(),
                GroupView {
                    title: feed.group.title,
                    description: feed.group.description,
                    nav: PageNav::from_page(&page, format!("/group/{slug}/")),
                    slug: feed.group.slug,
                    posts: cards,
                },
            );
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(FeedError::UnknownGroup) => render_not_found_response(current.viewer()),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub async fn profile(
    State(state): State<RouterState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    current: CurrentUser,
) -> Response {
    let profile = match state.feed.profile_feed(&username).await {
        Ok(profile) => profile,
        Err(FeedError::UnknownUser) => return render_not_found_response(current.viewer()),
        Err(err) => return HttpError::from(err).into_response(),
    };

    let (is_self, is_following) = match current.0.as_ref() {
        Some(principal) if principal.user_id == profile.author.id => (true, false),
        Some(principal) => {
            match state
                .follows
                .is_following(principal.user_id, profile.author.id)
                .await
            {
                Ok(following) => (false, following),
                Err(err) => return HttpError::from(err).into_response(),
            }
        }
        None => (false, false),
    };

    let page = paginate(profile.posts, query.requested());
    let cards = page.items.iter().map(PostCard::from_feed).collect();

    let view = LayoutContext::new(
        current.viewer(),
        ProfileView {
            nav: PageNav::from_page(&page, format!("/profile/{}/", profile.author.username)),
            username: profile.author.username,
            post_count: profile.post_count,
            is_self,
            is_following,
            show_follow_controls: current.0.is_some() && !is_self,
            posts: cards,
        },
    );
    render_template_response(ProfileTemplate { view }, StatusCode::OK)
}

pub async fn post_detail(
    State(state): State<RouterState>,
    Path(id): Path<String>,
    current: CurrentUser,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found_response(current.viewer());
    };

    match state.posts.detail(id).await {
        Ok(detail) => {
            let can_edit = current
                .0
                .as_ref()
                .is_some_and(|principal| principal.user_id == detail.post.author.id);

            let view = LayoutContext::new(
                current.viewer(),
                PostDetailView {
                    id: detail.post.id.to_string(),
                    title: PostDetailView::title_for(&detail.post),
                    text: detail.post.text.clone(),
                    author_username: detail.post.author.username.clone(),
                    group: detail.post.group.as_ref().map(|group| GroupBadge {
                        title: group.title.clone(),
                        slug: group.slug.clone(),
                    }),
                    image: detail.post.image.clone(),
                    published: format_human_date(detail.post.published_at),
                    can_edit,
                    can_comment: current.0.is_some(),
                    comments: detail.comments.iter().map(CommentItem::from_comment).collect(),
                },
            );
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(PostError::NotFound) => render_not_found_response(current.viewer()),
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn group_choices(groups: &[GroupRecord], selected: Option<Uuid>) -> Vec<GroupChoice> {
    groups
        .iter()
        .map(|group| GroupChoice {
            id: group.id.to_string(),
            title: group.title.clone(),
            selected: selected == Some(group.id),
        })
        .collect()
}

async fn render_post_form(
    state: &RouterState,
    viewer: Option<ViewerView>,
    heading: &str,
    action: String,
    text: String,
    image: String,
    selected: Option<Uuid>,
    error: Option<String>,
) -> Response {
    let groups = match state.posts.group_choices().await {
        Ok(groups) => groups,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let view = LayoutContext::new(
        viewer,
        PostFormView {
            heading: heading.to_string(),
            action,
            text,
            image,
            groups: group_choices(&groups, selected),
            error,
        },
    );
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

pub async fn create_post_form(State(state): State<RouterState>, user: RequireUser) -> Response {
    let viewer = Some(ViewerView {
        username: user.0.username.clone(),
    });
    render_post_form(
        &state,
        viewer,
        "New post",
        "/create/".to_string(),
        String::new(),
        String::new(),
        None,
        None,
    )
    .await
}

pub async fn create_post(
    State(state): State<RouterState>,
    user: RequireUser,
    Form(form): Form<PostForm>,
) -> Response {
    let viewer = Some(ViewerView {
        username: user.0.username.clone(),
    });

    let input = match form.clone().into_input() {
        Ok(input) => input,
        Err(err) => {
            return render_post_form(
                &state,
                viewer,
                "New post",
                "/create/".to_string(),
                form.text,
                form.image,
                None,
                Some(err.to_string()),
            )
            .await;
        }
    };

    match state.posts.create(user.0.user_id, input.clone()).await {
        Ok(_) => Redirect::to(&format!("/profile/{}/", user.0.username)).into_response(),
        Err(PostError::Domain(err)) => {
            render_post_form(
                &state,
                viewer,
                "New post",
                "/create/".to_string(),
                input.text,
                form.image,
                input.group_id,
                Some(err.to_string()),
            )
            .await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub async fn edit_post_form(
    State(state): State<RouterState>,
    Path(id): Path<String>,
    user: RequireUser,
) -> Response {
    let viewer = Some(ViewerView {
        username: user.0.username.clone(),
    });
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer);
    };

    match state.posts.edit_context(id, user.0.user_id).await {
        Ok(record) => {
            let PostRecord {
                text,
                group_id,
                image,
                ..
            } = record;
            render_post_form(
                &state,
                viewer,
                "Edit post",
                format!("/posts/{id}/edit/"),
                text,
                image.unwrap_or_default(),
                group_id,
                None,
            )
            .await
        }
        // Someone else's post: back to the detail view, untouched.
        Err(PostError::NotAuthor) => Redirect::to(&format!("/posts/{id}/")).into_response(),
        Err(PostError::NotFound) => render_not_found_response(viewer),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub async fn edit_post(
    State(state): State<RouterState>,
    Path(id): Path<String>,
    user: RequireUser,
    Form(form): Form<PostForm>,
) -> Response {
    let viewer = Some(ViewerView {
        username: user.0.username.clone(),
    });
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer);
    };

    let input = match form.clone().into_input() {
        Ok(input) => input,
        Err(err) => {
            return render_post_form(
                &state,
                viewer,
                "Edit post",
                format!("/posts/{id}/edit/"),
                form.text,
                form.image,
                None,
                Some(err.to_string()),
            )
            .await;
        }
    };

    match state.posts.update(id, user.0.user_id, input.clone()).await {
        Ok(record) => Redirect::to(&format!("/posts/{}/", record.id)).into_response(),
        Err(PostError::NotAuthor) => Redirect::to(&format!("/posts/{id}/")).into_response(),
        Err(PostError::NotFound) => render_not_found_response(viewer),
        Err(PostError::Domain(err)) => {
            render_post_form(
                &state,
                viewer,
                "Edit post",
                format!("/posts/{id}/edit/"),
                input.text,
                form.image,
                input.group_id,
                Some(err.to_string()),
            )
            .await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub async fn add_comment(
    State(state): State<RouterState>,
    Path(id): Path<String>,
    user: RequireUser,
    Form(form): Form<CommentForm>,
) -> Response {
    let viewer = Some(ViewerView {
        username: user.0.username.clone(),
    });
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer);
    };

    match state.posts.add_comment(id, user.0.user_id, form.text).await {
        Ok(_) | Err(PostError::Domain(_)) => {
            // Blank comments are dropped silently; the reader lands back on
            // the thread either way.
            Redirect::to(&format!("/posts/{id}/")).into_response()
        }
        Err(PostError::NotFound) => render_not_found_response(viewer),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub async fn follow_author(
    State(state): State<RouterState>,
    Path(username): Path<String>,
    user: RequireUser,
) -> Response {
    match state.follows.follow(user.0.user_id, &username).await {
        // Self-follow attempts fall through to the profile without an edge.
        Ok(()) | Err(FollowError::Domain(_)) => {
            Redirect::to(&format!("/profile/{username}/")).into_response()
        }
        Err(FollowError::UnknownUser) => render_not_found_response(Some(ViewerView {
            username: user.0.username.clone(),
        })),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub async fn unfollow_author(
    State(state): State<RouterState>,
    Path(username): Path<String>,
    user: RequireUser,
) -> Response {
    match state.follows.unfollow(user.0.user_id, &username).await {
        Ok(()) => Redirect::to(&format!("/profile/{username}/")).into_response(),
        Err(FollowError::UnknownUser) => render_not_found_response(Some(ViewerView {
            username: user.0.username.clone(),
        })),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub async fn follow_index(
    State(state): State<RouterState>,
    Query(query): Query<PageQuery>,
    user: RequireUser,
) -> Response {
    let posts = match state.feed.follow_feed(user.0.user_id).await {
        Ok(posts) => posts,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let page = paginate(posts, query.requested());
    let cards = page.items.iter().map(PostCard::from_feed).collect();

    let view = LayoutContext::new(
        Some(ViewerView {
            username: user.0.username.clone(),
        }),
        FeedView {
            heading: "Following".to_string(),
            posts: cards,
            nav: PageNav::from_page(&page, "/follow/"),
        },
    );
    render_template_response(FollowTemplate { view }, StatusCode::OK)
}

pub async fn db_health(State(state): State<RouterState>) -> Response {
    match state.db.as_ref() {
        Some(db) => match db.health_check().await {
            Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
            Err(err) => {
                warn!(
                    target = "brusio::http::health",
                    error = %err,
                    "database health check failed"
                );
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "status": "unavailable" })),
                )
                    .into_response()
            }
        },
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unconfigured" })),
        )
            .into_response(),
    }
}

pub async fn not_found(current: CurrentUser) -> Response {
    render_not_found_response(current.viewer())
}
