//! HTTP surface: router, shared state, and middleware wiring.

pub mod auth;
pub mod forms;
mod middleware;
pub mod public;

use std::sync::Arc;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::{
    accounts::AccountService, feed::FeedService, follows::FollowService, posts::PostService,
};
use crate::infra::db::PostgresRepositories;
use crate::infra::page_cache::{PageCache, page_cache_layer};

pub use middleware::{RequestContext, log_responses, set_request_context};

#[derive(Clone)]
pub struct RouterState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub db: Option<Arc<PostgresRepositories>>,
    pub cache: Option<Arc<PageCache>>,
}

pub fn build_router(state: RouterState) -> Router {
    // The page cache wraps the index route only; every other view renders
    // per request.
    let index = Router::new().route("/", get(public::index));
    let index = match state.cache.clone() {
        Some(cache) => {
            index.route_layer(axum_middleware::from_fn_with_state(cache, page_cache_layer))
        }
        None => index,
    };

    Router::new()
        .merge(index)
        .route("/group/{slug}/", get(public::group_index))
        .route("/profile/{username}/", get(public::profile))
        .route("/profile/{username}/follow/", get(public::follow_author))
        .route("/profile/{username}/unfollow/", get(public::unfollow_author))
        .route("/posts/{id}/", get(public::post_detail))
        .route(
            "/posts/{id}/edit/",
            get(public::edit_post_form).post(public::edit_post),
        )
        .route("/posts/{id}/comment/", post(public::add_comment))
        .route(
            "/create/",
            get(public::create_post_form).post(public::create_post),
        )
        .route("/follow/", get(public::follow_index))
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup))
        .route("/auth/logout/", get(auth::logout))
        .route("/_health/db", get(public::db_health))
        .fallback(public::not_found)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
        .with_state(state)
}
