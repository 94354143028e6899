use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::application::repos::{CommentWithAuthor, FeedPost};
use crate::domain::posts::{format_human_date, preview};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<ViewerView>) -> Response {
    let view = LayoutContext::new(viewer, NotFoundView);
    let mut response = render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// The signed-in principal as shown in the page chrome.
#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub viewer: Option<ViewerView>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(viewer: Option<ViewerView>, content: T) -> Self {
        Self { viewer, content }
    }
}

#[derive(Clone)]
pub struct GroupBadge {
    pub title: String,
    pub slug: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: String,
    pub text: String,
    pub author_username: String,
    pub group: Option<GroupBadge>,
    pub image: Option<String>,
    pub published: String,
}

impl PostCard {
    pub fn from_feed(post: &FeedPost) -> Self {
        Self {
            id: post.id.to_string(),
            text: post.text.clone(),
            author_username: post.author.username.clone(),
            group: post.group.as_ref().map(|group| GroupBadge {
                title: group.title.clone(),
                slug: group.slug.clone(),
            }),
            image: post.image.clone(),
            published: format_human_date(post.published_at),
        }
    }
}

/// Page-number navigation rendered under every feed.
#[derive(Clone)]
pub struct PageNav {
    pub number: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_number: usize,
    pub next_number: usize,
    pub base_path: String,
}

impl PageNav {
    pub fn from_page<T>(page: &Page<T>, base_path: impl Into<String>) -> Self {
        Self {
            number: page.number,
            total_pages: page.total_pages,
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous_number: page.number.saturating_sub(1).max(1),
            next_number: (page.number + 1).min(page.total_pages),
            base_path: base_path.into(),
        }
    }
}

/// Shared feed body for the index and follow views.
#[derive(Clone)]
pub struct FeedView {
    pub heading: String,
    pub posts: Vec<PostCard>,
    pub nav: PageNav,
}

#[derive(Clone)]
pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub posts: Vec<PostCard>,
    pub nav: PageNav,
}

#[derive(Clone)]
pub struct ProfileView {
    pub username: String,
    pub post_count: usize,
    pub is_self: bool,
    pub is_following: bool,
    pub show_follow_controls: bool,
    pub posts: Vec<PostCard>,
    pub nav: PageNav,
}

#[derive(Clone)]
pub struct CommentItem {
    pub author_username: String,
    pub created: String,
    pub text: String,
}

impl CommentItem {
    pub fn from_comment(comment: &CommentWithAuthor) -> Self {
        Self {
            author_username: comment.author.username.clone(),
            created: format_human_date(comment.created_at),
            text: comment.text.clone(),
        }
    }
}

#[derive(Clone)]
pub struct PostDetailView {
    pub id: String,
    pub title: String,
    pub text: String,
    pub author_username: String,
    pub group: Option<GroupBadge>,
    pub image: Option<String>,
    pub published: String,
    pub can_edit: bool,
    pub can_comment: bool,
    pub comments: Vec<CommentItem>,
}

impl PostDetailView {
    pub fn title_for(post: &FeedPost) -> String {
        preview(&post.text)
    }
}

#[derive(Clone)]
pub struct GroupChoice {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

/// Shared form body for creating and editing a post.
#[derive(Clone)]
pub struct PostFormView {
    pub heading: String,
    pub action: String,
    pub text: String,
    pub image: String,
    pub groups: Vec<GroupChoice>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct LoginView {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct SignupView {
    pub username: String,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct NotFoundView;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupView>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupView>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<NotFoundView>,
}
