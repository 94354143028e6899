//! Follow graph semantics and the follow feed, at service and HTTP level.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;

use brusio::application::follows::{FollowError, FollowService};
use brusio::application::repos::{FollowsRepo, UsersRepo};
use common::{TestApp, body_string, location_of};

fn follow_service(app: &TestApp) -> FollowService {
    let follows: Arc<dyn FollowsRepo> = app.repos.clone();
    let users: Arc<dyn UsersRepo> = app.repos.clone();
    FollowService::new(follows, users)
}

#[tokio::test]
async fn follow_then_followed_authors_contains_author() {
    let app = TestApp::new();
    let reader = app.repos.add_user("reader");
    let author = app.repos.add_user("author");
    let service = follow_service(&app);

    service.follow(reader.id, "author").await.expect("followed");

    let followed = service.followed_authors(reader.id).await.expect("listed");
    assert_eq!(followed, vec![author.id]);
    assert!(service.is_following(reader.id, author.id).await.expect("checked"));
}

#[tokio::test]
async fn repeated_follow_does_not_duplicate_the_edge() {
    let app = TestApp::new();
    let reader = app.repos.add_user("reader");
    let author = app.repos.add_user("author");
    app.repos.add_post(&author, None, "only once in the feed");
    let service = follow_service(&app);

    service.follow(reader.id, "author").await.expect("followed");
    service.follow(reader.id, "author").await.expect("idempotent");

    assert_eq!(app.repos.follow_count(), 1);

    let body = body_string(app.get_as("/follow/", app.login(&reader)).await).await;
    assert_eq!(body.matches("only once in the feed").count(), 1);
}

#[tokio::test]
async fn unfollow_removes_the_edge_and_the_posts() {
    let app = TestApp::new();
    let reader = app.repos.add_user("reader");
    let author = app.repos.add_user("author");
    app.repos.add_post(&author, None, "soon to disappear");
    let service = follow_service(&app);

    service.follow(reader.id, "author").await.expect("followed");
    service.unfollow(reader.id, "author").await.expect("unfollowed");

    assert!(service.followed_authors(reader.id).await.expect("listed").is_empty());

    let body = body_string(app.get_as("/follow/", app.login(&reader)).await).await;
    assert!(!body.contains("soon to disappear"));
}

#[tokio::test]
async fn unfollow_without_edge_is_a_noop() {
    let app = TestApp::new();
    let reader = app.repos.add_user("reader");
    app.repos.add_user("author");
    let service = follow_service(&app);

    service.unfollow(reader.id, "author").await.expect("no-op unfollow");
    assert_eq!(app.repos.follow_count(), 0);
}

#[tokio::test]
async fn follow_feed_is_scoped_to_the_follower() {
    let app = TestApp::new();
    let author = app.repos.add_user("author");
    let follower = app.repos.add_user("follower");
    let bystander = app.repos.add_user("bystander");
    app.repos.add_post(&author, None, "visible to followers only");
    app.repos.add_follow(&follower, &author);

    let follower_body = body_string(app.get_as("/follow/", app.login(&follower)).await).await;
    assert!(follower_body.contains("visible to followers only"));

    let bystander_body = body_string(app.get_as("/follow/", app.login(&bystander)).await).await;
    assert!(!bystander_body.contains("visible to followers only"));
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let app = TestApp::new();
    let user = app.repos.add_user("narcissus");
    let service = follow_service(&app);

    let err = service
        .follow(user.id, "narcissus")
        .await
        .expect_err("self-follow rejected");
    assert!(matches!(err, FollowError::Domain(_)));
    assert_eq!(app.repos.follow_count(), 0);
}

#[tokio::test]
async fn follow_route_creates_edge_and_redirects_to_profile() {
    let app = TestApp::new();
    let reader = app.repos.add_user("reader");
    app.repos.add_user("author");

    let session = app.login(&reader);
    let response = app.get_as("/profile/author/follow/", session).await;
    assert!(response.status().is_redirection());
    assert_eq!(location_of(&response).as_deref(), Some("/profile/author/"));
    assert_eq!(app.repos.follow_count(), 1);

    // A second click is a silent no-op.
    let response = app.get_as("/profile/author/follow/", session).await;
    assert!(response.status().is_redirection());
    assert_eq!(app.repos.follow_count(), 1);
}

#[tokio::test]
async fn unfollow_route_removes_edge() {
    let app = TestApp::new();
    let reader = app.repos.add_user("reader");
    let author = app.repos.add_user("author");
    app.repos.add_follow(&reader, &author);

    let session = app.login(&reader);
    let response = app.get_as("/profile/author/unfollow/", session).await;
    assert!(response.status().is_redirection());
    assert_eq!(app.repos.follow_count(), 0);
}

#[tokio::test]
async fn self_follow_route_redirects_without_an_edge() {
    let app = TestApp::new();
    let user = app.repos.add_user("narcissus");

    let session = app.login(&user);
    let response = app.get_as("/profile/narcissus/follow/", session).await;
    assert!(response.status().is_redirection());
    assert_eq!(app.repos.follow_count(), 0);
}

#[tokio::test]
async fn follow_feed_requires_authentication() {
    let app = TestApp::new();
    let response = app.get("/follow/").await;
    assert!(response.status().is_redirection());
    assert_eq!(
        location_of(&response).as_deref(),
        Some("/auth/login/?next=/follow/")
    );
}

#[tokio::test]
async fn follow_route_for_unknown_author_is_not_found() {
    let app = TestApp::new();
    let reader = app.repos.add_user("reader");

    let session = app.login(&reader);
    let response = app.get_as("/profile/ghost/follow/", session).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
