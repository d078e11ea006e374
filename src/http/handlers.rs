use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::content::ContentAccessor;
use crate::app::social::RelationshipMutator;
use crate::app::users::AccountService;
use crate::domain::content::Workout;
use crate::domain::engagement::{Comment, Like, LikerDetail};
use crate::domain::social_graph::{BlockEdge, FollowEdge, FollowStatus, Relationship};
use crate::domain::user::Actor;
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_offset: Option<i64>,
}

impl PaginationQuery {
    fn resolve(&self, state: &AppState) -> Result<(i64, i64), AppError> {
        let limit = self.limit.unwrap_or(state.default_page_limit);
        if !(1..=state.max_page_limit).contains(&limit) {
            return Err(AppError::bad_request(format!(
                "limit must be between 1 and {}",
                state.max_page_limit
            )));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::bad_request("offset must not be negative"));
        }
        Ok((limit, offset))
    }
}

/// Handlers fetch `limit + 1` rows; the extra row only signals another page.
fn paginate<T>(mut items: Vec<T>, limit: i64, offset: i64) -> ListResponse<T> {
    let next_offset = if items.len() > limit as usize {
        items.truncate(limit as usize);
        Some(offset + limit)
    } else {
        None
    };
    ListResponse { items, next_offset }
}

fn mutator(state: &AppState) -> RelationshipMutator {
    RelationshipMutator::new(state.store.clone())
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.store.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Follow graph
// ---------------------------------------------------------------------------

pub async fn follow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowEdge>, AppError> {
    if auth.user_id == id {
        return Err(AppError::bad_request("cannot follow yourself"));
    }

    let edge = mutator(&state)
        .follow(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "user", "failed to follow user"))?;

    Ok(Json(edge))
}

pub async fn unfollow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if auth.user_id == id {
        return Err(AppError::bad_request("cannot unfollow yourself"));
    }

    mutator(&state)
        .unfollow(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "follow", "failed to unfollow user"))?;

    Ok(StatusCode::NO_CONTENT)
}

/// `id` is the requesting follower; the caller is the account being followed.
pub async fn accept_follow_request(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    mutator(&state)
        .accept_follow(id, auth.user_id)
        .await
        .map_err(|err| {
            AppError::from_access(err, "follow request", "failed to accept follow request")
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn decline_follow_request(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    mutator(&state)
        .decline_follow(id, auth.user_id)
        .await
        .map_err(|err| {
            AppError::from_access(err, "follow request", "failed to decline follow request")
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct FollowStatusResponse {
    pub status: FollowStatus,
}

pub async fn follow_status(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowStatusResponse>, AppError> {
    let status = mutator(&state)
        .follow_status(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "follow", "failed to fetch follow status"))?;

    Ok(Json(FollowStatusResponse { status }))
}

pub async fn list_followers(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<FollowEdge>>, AppError> {
    let (limit, offset) = query.resolve(&state)?;
    let mutator = mutator(&state);

    let visible = mutator
        .visibility()
        .can_view(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "user", "failed to list followers"))?;
    if !visible {
        return Err(AppError::not_found("user not found"));
    }

    let followers = mutator
        .list_followers(id, limit + 1, offset)
        .await
        .map_err(|err| AppError::from_access(err, "user", "failed to list followers"))?;

    Ok(Json(paginate(followers, limit, offset)))
}

pub async fn list_following(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<FollowEdge>>, AppError> {
    let (limit, offset) = query.resolve(&state)?;
    let mutator = mutator(&state);

    let visible = mutator
        .visibility()
        .can_view(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "user", "failed to list following"))?;
    if !visible {
        return Err(AppError::not_found("user not found"));
    }

    let following = mutator
        .list_following(id, limit + 1, offset)
        .await
        .map_err(|err| AppError::from_access(err, "user", "failed to list following"))?;

    Ok(Json(paginate(following, limit, offset)))
}

pub async fn list_follow_requests(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<FollowEdge>>, AppError> {
    let (limit, offset) = query.resolve(&state)?;
    let requests = mutator(&state)
        .list_follow_requests(auth.user_id, limit + 1, offset)
        .await
        .map_err(|err| {
            AppError::from_access(err, "user", "failed to list follow requests")
        })?;

    Ok(Json(paginate(requests, limit, offset)))
}

pub async fn relationship_status(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Relationship>, AppError> {
    let relationship = mutator(&state)
        .relationship(auth.user_id, id)
        .await
        .map_err(|err| {
            AppError::from_access(err, "user", "failed to fetch relationship status")
        })?;

    Ok(Json(relationship))
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

pub async fn block_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BlockEdge>, AppError> {
    if auth.user_id == id {
        return Err(AppError::bad_request("cannot block yourself"));
    }

    let edge = mutator(&state)
        .block(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "user", "failed to block user"))?;

    Ok(Json(edge))
}

pub async fn unblock_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if auth.user_id == id {
        return Err(AppError::bad_request("cannot unblock yourself"));
    }

    mutator(&state)
        .unblock(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "block", "failed to unblock user"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_blocked_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<BlockEdge>>, AppError> {
    let (limit, offset) = query.resolve(&state)?;
    let blocks = mutator(&state)
        .blocked_users(auth.user_id, limit + 1, offset)
        .await
        .map_err(|err| AppError::from_access(err, "user", "failed to list blocked users"))?;

    Ok(Json(paginate(blocks, limit, offset)))
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct UpdatePrivacyRequest {
    pub is_private: bool,
}

pub async fn update_privacy(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePrivacyRequest>,
) -> Result<Json<Actor>, AppError> {
    let service = AccountService::new(state.store.clone());
    let actor = service
        .set_privacy(auth.user_id, payload.is_private)
        .await
        .map_err(|err| AppError::from_access(err, "user", "failed to update privacy"))?;

    Ok(Json(actor))
}

// ---------------------------------------------------------------------------
// Workouts
// ---------------------------------------------------------------------------

pub async fn get_workout(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Workout>, AppError> {
    let accessor = ContentAccessor::new(state.store.clone());
    let workout = accessor
        .get_workout(id, auth.user_id)
        .await
        .map_err(|err| AppError::from_access(err, "workout", "failed to fetch workout"))?;

    Ok(Json(workout))
}

pub async fn like_workout(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Like>, AppError> {
    let like = mutator(&state)
        .like(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "workout", "failed to like workout"))?;

    Ok(Json(like))
}

pub async fn unlike_workout(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    mutator(&state)
        .unlike(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "like", "failed to unlike workout"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_workout_likes(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<LikerDetail>>, AppError> {
    let (limit, offset) = query.resolve(&state)?;
    let likers = mutator(&state)
        .list_likers(id, auth.user_id, limit + 1, offset)
        .await
        .map_err(|err| AppError::from_access(err, "workout", "failed to list likes"))?;

    Ok(Json(paginate(likers, limit, offset)))
}

#[derive(Serialize)]
pub struct LikedResponse {
    pub liked: bool,
}

pub async fn is_workout_liked(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikedResponse>, AppError> {
    let liked = mutator(&state)
        .is_liked(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_access(err, "workout", "failed to fetch like"))?;

    Ok(Json(LikedResponse { liked }))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub body: String,
}

pub async fn comment_workout(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<Comment>, AppError> {
    const MAX_COMMENT_LEN: usize = 1000;

    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("comment body cannot be empty"));
    }
    if payload.body.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::bad_request("comment body exceeds 1000 characters"));
    }

    let comment = mutator(&state)
        .add_comment(auth.user_id, id, &payload.body)
        .await
        .map_err(|err| AppError::from_access(err, "workout", "failed to comment on workout"))?;

    Ok(Json(comment))
}

pub async fn list_workout_comments(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Comment>>, AppError> {
    let (limit, offset) = query.resolve(&state)?;
    let comments = mutator(&state)
        .list_comments(id, auth.user_id, limit + 1, offset)
        .await
        .map_err(|err| AppError::from_access(err, "workout", "failed to list comments"))?;

    Ok(Json(paginate(comments, limit, offset)))
}

pub async fn delete_comment(
    Path((id, comment_id)): Path<(Uuid, Uuid)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    mutator(&state)
        .delete_comment(auth.user_id, id, comment_id)
        .await
        .map_err(|err| AppError::from_access(err, "comment", "failed to delete comment"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_signals_next_page_from_extra_row() {
        let page = paginate(vec![1, 2, 3], 2, 4);
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_offset, Some(6));

        let page = paginate(vec![1, 2], 2, 0);
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_offset, None);
    }
}
