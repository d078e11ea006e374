use axum::{routing::delete, routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/:id/follow", post(handlers::follow_user))
        .route("/users/:id/unfollow", post(handlers::unfollow_user))
        .route("/users/:id/block", post(handlers::block_user))
        .route("/users/:id/unblock", post(handlers::unblock_user))
        .route(
            "/users/:id/follow-requests/accept",
            post(handlers::accept_follow_request),
        )
        .route(
            "/users/:id/follow-requests/decline",
            post(handlers::decline_follow_request),
        )
        .route("/users/:id/followers", get(handlers::list_followers))
        .route("/users/:id/following", get(handlers::list_following))
        .route("/users/:id/relationship", get(handlers::relationship_status))
        .route("/users/:id/follow-status", get(handlers::follow_status))
}

pub fn account() -> Router<AppState> {
    Router::new()
        .route("/blocks", get(handlers::list_blocked_users))
        .route("/follow-requests", get(handlers::list_follow_requests))
        .route("/account/privacy", patch(handlers::update_privacy))
}

pub fn workouts() -> Router<AppState> {
    Router::new()
        .route("/workouts/:id", get(handlers::get_workout))
        .route("/workouts/:id/like", post(handlers::like_workout))
        .route("/workouts/:id/like", delete(handlers::unlike_workout))
        .route("/workouts/:id/likes", get(handlers::list_workout_likes))
        .route("/workouts/:id/liked", get(handlers::is_workout_liked))
        .route("/workouts/:id/comments", post(handlers::comment_workout))
        .route("/workouts/:id/comments", get(handlers::list_workout_comments))
        .route(
            "/workouts/:id/comments/:comment_id",
            delete(handlers::delete_comment),
        )
}
