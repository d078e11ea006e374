use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::app::visibility::VisibilityFacts;
use crate::domain::content::{ContentKind, ContentOwner, Workout};
use crate::domain::engagement::{Comment, Like, LikerDetail};
use crate::domain::social_graph::{BlockEdge, FollowEdge, FollowStatus, Relationship};
use crate::domain::user::Actor;
use crate::infra::db::Db;
use crate::infra::store::{FollowWrite, GraphStore, StoreResult};

const ACTOR_COLUMNS: &str =
    "id, handle, display_name, is_private, followers_count, following_count, created_at";
const FOLLOW_COLUMNS: &str = "follower_id, following_id, status, created_at";

/// Block in either direction between two SQL expressions.
fn blocked_between(alias: &str, a: &str, b: &str) -> String {
    format!(
        "EXISTS (SELECT 1 FROM blocks {alias} \
         WHERE ({alias}.blocker_id = {a} AND {alias}.blocked_id = {b}) \
            OR ({alias}.blocker_id = {b} AND {alias}.blocked_id = {a}))"
    )
}

/// Interaction guard: `viewer` may act on content of the `users` row aliased
/// `owner`. Same precedence as `visibility::decide`, never with admin bypass.
fn visible_to(viewer: &str, owner: &str) -> String {
    let owner_id = format!("{owner}.id");
    format!(
        "({owner_id} = {viewer} OR (NOT {blocked} AND (NOT {owner}.is_private OR EXISTS ( \
             SELECT 1 FROM follows vf \
             WHERE vf.follower_id = {viewer} AND vf.following_id = {owner_id} \
               AND vf.status = 'accepted'))))",
        blocked = blocked_between("vb", viewer, &owner_id),
    )
}

fn parse_status(value: &str) -> StoreResult<FollowStatus> {
    FollowStatus::from_db(value).ok_or_else(|| anyhow!("unknown follow status: {}", value).into())
}

fn parse_optional_status(value: Option<String>) -> StoreResult<Option<FollowStatus>> {
    value.as_deref().map(parse_status).transpose()
}

fn actor_from_row(row: &PgRow) -> Actor {
    Actor {
        id: row.get("id"),
        handle: row.get("handle"),
        display_name: row.get("display_name"),
        is_private: row.get("is_private"),
        followers_count: row.get("followers_count"),
        following_count: row.get("following_count"),
        created_at: row.get("created_at"),
    }
}

fn follow_from_row(row: &PgRow) -> StoreResult<FollowEdge> {
    let status: String = row.get("status");
    Ok(FollowEdge {
        follower_id: row.get("follower_id"),
        following_id: row.get("following_id"),
        status: parse_status(&status)?,
        created_at: row.get("created_at"),
    })
}

fn block_from_row(row: &PgRow) -> BlockEdge {
    BlockEdge {
        blocker_id: row.get("blocker_id"),
        blocked_id: row.get("blocked_id"),
        created_at: row.get("created_at"),
    }
}

fn like_from_row(row: &PgRow) -> Like {
    Like {
        id: row.get("id"),
        user_id: row.get("user_id"),
        workout_id: row.get("workout_id"),
        created_at: row.get("created_at"),
    }
}

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        workout_id: row.get("workout_id"),
        body: row.get("body"),
        created_at: row.get("created_at"),
    }
}

fn follows_from_rows(rows: Vec<PgRow>) -> StoreResult<Vec<FollowEdge>> {
    rows.iter().map(follow_from_row).collect()
}

/// Applies `delta` to the follower's following count and the target's
/// follower count.
async fn adjust_follow_counts(
    conn: &mut PgConnection,
    follower: Uuid,
    following: Uuid,
    delta: i64,
) -> StoreResult<()> {
    sqlx::query(
        "UPDATE users \
         SET following_count = following_count + CASE WHEN id = $1 THEN $3 ELSE 0 END, \
             followers_count = followers_count + CASE WHEN id = $2 THEN $3 ELSE 0 END \
         WHERE id IN ($1, $2)",
    )
    .bind(follower)
    .bind(following)
    .bind(delta)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn list_follow_edges(
        &self,
        filter: &str,
        id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>> {
        let sql = format!(
            "SELECT f.follower_id, f.following_id, f.status, f.created_at \
             FROM follows f \
             WHERE {filter} \
               AND NOT {blocked} \
             ORDER BY f.created_at DESC, f.follower_id DESC, f.following_id DESC \
             LIMIT $2 OFFSET $3",
            blocked = blocked_between("b", "f.follower_id", "f.following_id"),
        );
        let rows = sqlx::query(&sql)
            .bind(id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;
        follows_from_rows(rows)
    }
}

#[async_trait]
impl GraphStore for PgStore {
    async fn actor(&self, id: Uuid) -> StoreResult<Option<Actor>> {
        let sql = format!("SELECT {ACTOR_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(actor_from_row))
    }

    async fn is_admin(&self, id: Uuid) -> StoreResult<bool> {
        let is_admin: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM admins WHERE user_id = $1)")
                .bind(id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(is_admin)
    }

    async fn visibility_facts(
        &self,
        viewer: Uuid,
        owner: Uuid,
    ) -> StoreResult<Option<VisibilityFacts>> {
        let row = sqlx::query(
            "SELECT o.is_private, \
                EXISTS (SELECT 1 FROM blocks \
                        WHERE blocker_id = $1 AND blocked_id = $2) AS viewer_blocks_owner, \
                EXISTS (SELECT 1 FROM blocks \
                        WHERE blocker_id = $2 AND blocked_id = $1) AS owner_blocks_viewer, \
                (SELECT status FROM follows \
                 WHERE follower_id = $1 AND following_id = $2) AS follow_status \
             FROM users o WHERE o.id = $2",
        )
        .bind(viewer)
        .bind(owner)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(VisibilityFacts {
            viewer_blocks_owner: row.get("viewer_blocks_owner"),
            owner_blocks_viewer: row.get("owner_blocks_viewer"),
            owner_is_private: row.get("is_private"),
            follow_status: parse_optional_status(row.get("follow_status"))?,
        }))
    }

    async fn relationship(&self, viewer: Uuid, other: Uuid) -> StoreResult<Relationship> {
        let row = sqlx::query(
            "SELECT \
                (SELECT status FROM follows \
                 WHERE follower_id = $1 AND following_id = $2) AS following, \
                (SELECT status FROM follows \
                 WHERE follower_id = $2 AND following_id = $1) AS followed_by, \
                EXISTS (SELECT 1 FROM blocks \
                        WHERE blocker_id = $1 AND blocked_id = $2) AS is_blocking, \
                EXISTS (SELECT 1 FROM blocks \
                        WHERE blocker_id = $2 AND blocked_id = $1) AS is_blocked_by",
        )
        .bind(viewer)
        .bind(other)
        .fetch_one(self.db.pool())
        .await?;

        let is_blocking: bool = row.get("is_blocking");
        let is_blocked_by: bool = row.get("is_blocked_by");
        if is_blocking || is_blocked_by {
            return Ok(Relationship {
                is_blocking,
                is_blocked_by,
                ..Default::default()
            });
        }
        Ok(Relationship {
            following: parse_optional_status(row.get("following"))?,
            followed_by: parse_optional_status(row.get("followed_by"))?,
            is_blocking,
            is_blocked_by,
        })
    }

    async fn insert_block(
        &self,
        blocker: Uuid,
        blocked: Uuid,
    ) -> StoreResult<(BlockEdge, bool)> {
        let mut tx = self.db.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO blocks (blocker_id, blocked_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING \
             RETURNING blocker_id, blocked_id, created_at",
        )
        .bind(blocker)
        .bind(blocked)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = inserted else {
            let existing = sqlx::query(
                "SELECT blocker_id, blocked_id, created_at FROM blocks \
                 WHERE blocker_id = $1 AND blocked_id = $2",
            )
            .bind(blocker)
            .bind(blocked)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok((block_from_row(&existing), false));
        };

        let removed = sqlx::query(
            "DELETE FROM follows \
             WHERE (follower_id = $1 AND following_id = $2) \
                OR (follower_id = $2 AND following_id = $1) \
             RETURNING follower_id, following_id, status, created_at",
        )
        .bind(blocker)
        .bind(blocked)
        .fetch_all(&mut *tx)
        .await?;

        for edge in follows_from_rows(removed)? {
            if edge.status == FollowStatus::Accepted {
                adjust_follow_counts(&mut tx, edge.follower_id, edge.following_id, -1).await?;
            }
        }

        tx.commit().await?;
        Ok((block_from_row(&row), true))
    }

    async fn delete_block(&self, blocker: Uuid, blocked: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker)
            .bind(blocked)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn block_exists(&self, a: Uuid, b: Uuid) -> StoreResult<bool> {
        let sql = format!("SELECT {}", blocked_between("b", "$1", "$2"));
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(a)
            .bind(b)
            .fetch_one(self.db.pool())
            .await?;
        Ok(exists)
    }

    async fn list_blocked(
        &self,
        blocker: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<BlockEdge>> {
        let rows = sqlx::query(
            "SELECT blocker_id, blocked_id, created_at FROM blocks \
             WHERE blocker_id = $1 \
             ORDER BY created_at DESC, blocked_id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(blocker)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(block_from_row).collect())
    }

    async fn upsert_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<FollowWrite> {
        let mut tx = self.db.pool().begin().await?;

        let block_sql = format!("SELECT {}", blocked_between("b", "$1", "$2"));
        let blocked: bool = sqlx::query_scalar(&block_sql)
            .bind(follower)
            .bind(target)
            .fetch_one(&mut *tx)
            .await?;
        if blocked {
            tx.rollback().await?;
            return Ok(FollowWrite::Blocked);
        }

        // The block guard is repeated inside each write so a block committed
        // after the check above still wins.
        let insert_sql = format!(
            "INSERT INTO follows (follower_id, following_id, status, accepted_at) \
             SELECT $1, u.id, \
                    CASE WHEN u.is_private THEN 'pending' ELSE 'accepted' END, \
                    CASE WHEN u.is_private THEN NULL ELSE now() END \
             FROM users u \
             WHERE u.id = $2 AND NOT {blocked} \
             ON CONFLICT (follower_id, following_id) DO NOTHING \
             RETURNING {FOLLOW_COLUMNS}",
            blocked = blocked_between("b", "$1", "$2"),
        );
        let inserted = sqlx::query(&insert_sql)
            .bind(follower)
            .bind(target)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = inserted {
            let edge = follow_from_row(&row)?;
            if edge.status == FollowStatus::Accepted {
                adjust_follow_counts(&mut tx, follower, target, 1).await?;
            }
            tx.commit().await?;
            return Ok(FollowWrite::Created(edge));
        }

        let upgrade_sql = format!(
            "UPDATE follows f SET status = 'accepted', accepted_at = now() \
             FROM users u \
             WHERE f.follower_id = $1 AND f.following_id = $2 AND u.id = f.following_id \
               AND f.status = 'pending' AND NOT u.is_private \
               AND NOT {blocked} \
             RETURNING f.follower_id, f.following_id, f.status, f.created_at",
            blocked = blocked_between("b", "$1", "$2"),
        );
        let upgraded = sqlx::query(&upgrade_sql)
            .bind(follower)
            .bind(target)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = upgraded {
            let edge = follow_from_row(&row)?;
            adjust_follow_counts(&mut tx, follower, target, 1).await?;
            tx.commit().await?;
            return Ok(FollowWrite::Upgraded(edge));
        }

        let existing_sql = format!(
            "SELECT {FOLLOW_COLUMNS} FROM follows WHERE follower_id = $1 AND following_id = $2"
        );
        let existing = sqlx::query(&existing_sql)
            .bind(follower)
            .bind(target)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = existing {
            let edge = follow_from_row(&row)?;
            tx.commit().await?;
            return Ok(FollowWrite::Unchanged(edge));
        }

        let target_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(target)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;

        if target_exists {
            Ok(FollowWrite::Blocked)
        } else {
            Ok(FollowWrite::MissingTarget)
        }
    }

    async fn delete_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut tx = self.db.pool().begin().await?;

        let removed: Option<String> = sqlx::query_scalar(
            "DELETE FROM follows WHERE follower_id = $1 AND following_id = $2 RETURNING status",
        )
        .bind(follower)
        .bind(target)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(status) = removed else {
            tx.rollback().await?;
            return Ok(false);
        };

        if parse_status(&status)? == FollowStatus::Accepted {
            adjust_follow_counts(&mut tx, follower, target, -1).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn accept_follow(
        &self,
        follower: Uuid,
        target: Uuid,
    ) -> StoreResult<Option<FollowEdge>> {
        let mut tx = self.db.pool().begin().await?;

        let sql = format!(
            "UPDATE follows SET status = 'accepted', accepted_at = now() \
             WHERE follower_id = $1 AND following_id = $2 AND status = 'pending' \
               AND NOT {blocked} \
             RETURNING {FOLLOW_COLUMNS}",
            blocked = blocked_between("b", "$1", "$2"),
        );
        let row = sqlx::query(&sql)
            .bind(follower)
            .bind(target)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let edge = follow_from_row(&row)?;
        adjust_follow_counts(&mut tx, follower, target, 1).await?;
        tx.commit().await?;
        Ok(Some(edge))
    }

    async fn decline_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM follows \
             WHERE follower_id = $1 AND following_id = $2 AND status = 'pending'",
        )
        .bind(follower)
        .bind(target)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn follow_edge(&self, follower: Uuid, target: Uuid) -> StoreResult<Option<FollowEdge>> {
        let sql = format!(
            "SELECT {FOLLOW_COLUMNS} FROM follows \
             WHERE follower_id = $1 AND following_id = $2 AND NOT {blocked}",
            blocked = blocked_between("b", "$1", "$2"),
        );
        let row = sqlx::query(&sql)
            .bind(follower)
            .bind(target)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(follow_from_row).transpose()
    }

    async fn list_followers(
        &self,
        of: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>> {
        self.list_follow_edges("f.following_id = $1 AND f.status = 'accepted'", of, limit, offset)
            .await
    }

    async fn list_following(
        &self,
        of: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>> {
        self.list_follow_edges("f.follower_id = $1 AND f.status = 'accepted'", of, limit, offset)
            .await
    }

    async fn list_follow_requests(
        &self,
        target: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>> {
        self.list_follow_edges(
            "f.following_id = $1 AND f.status = 'pending'",
            target,
            limit,
            offset,
        )
        .await
    }

    async fn set_private(&self, id: Uuid, private: bool) -> StoreResult<Option<(Actor, u64)>> {
        let mut tx = self.db.pool().begin().await?;

        let sql =
            format!("UPDATE users SET is_private = $2 WHERE id = $1 RETURNING {ACTOR_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(private)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let mut actor = actor_from_row(&row);

        if private {
            tx.commit().await?;
            return Ok(Some((actor, 0)));
        }

        let accept_sql = format!(
            "UPDATE follows f SET status = 'accepted', accepted_at = now() \
             WHERE f.following_id = $1 AND f.status = 'pending' \
               AND NOT {blocked} \
             RETURNING f.follower_id",
            blocked = blocked_between("b", "f.follower_id", "f.following_id"),
        );
        let followers: Vec<Uuid> = sqlx::query_scalar(&accept_sql)
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        if !followers.is_empty() {
            sqlx::query("UPDATE users SET following_count = following_count + 1 WHERE id = ANY($1)")
                .bind(followers.as_slice())
                .execute(&mut *tx)
                .await?;

            let sql = format!(
                "UPDATE users SET followers_count = followers_count + $2 WHERE id = $1 \
                 RETURNING {ACTOR_COLUMNS}"
            );
            let row = sqlx::query(&sql)
                .bind(id)
                .bind(followers.len() as i64)
                .fetch_one(&mut *tx)
                .await?;
            actor = actor_from_row(&row);
        }

        tx.commit().await?;
        Ok(Some((actor, followers.len() as u64)))
    }

    async fn content_owner(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> StoreResult<Option<ContentOwner>> {
        let sql = format!("SELECT owner_id FROM {} WHERE id = $1", kind.table());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| ContentOwner::from_db(row.get("owner_id"))))
    }

    async fn workout(&self, id: Uuid) -> StoreResult<Option<Workout>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, notes, like_count, comment_count, created_at \
             FROM workouts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| Workout {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            notes: row.get("notes"),
            like_count: row.get("like_count"),
            comment_count: row.get("comment_count"),
            created_at: row.get("created_at"),
        }))
    }

    async fn insert_like(&self, actor: Uuid, workout: Uuid) -> StoreResult<Option<Like>> {
        let mut tx = self.db.pool().begin().await?;

        let sql = format!(
            "INSERT INTO likes (user_id, workout_id) \
             SELECT $1, w.id FROM workouts w JOIN users o ON o.id = w.owner_id \
             WHERE w.id = $2 AND {guard} \
             ON CONFLICT (user_id, workout_id) DO NOTHING \
             RETURNING id, user_id, workout_id, created_at",
            guard = visible_to("$1", "o"),
        );
        let row = sqlx::query(&sql)
            .bind(actor)
            .bind(workout)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("UPDATE workouts SET like_count = like_count + 1 WHERE id = $1")
            .bind(workout)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(like_from_row(&row)))
    }

    async fn find_like(&self, actor: Uuid, workout: Uuid) -> StoreResult<Option<Like>> {
        let row = sqlx::query(
            "SELECT id, user_id, workout_id, created_at FROM likes \
             WHERE user_id = $1 AND workout_id = $2",
        )
        .bind(actor)
        .bind(workout)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(like_from_row))
    }

    async fn delete_like(&self, actor: Uuid, workout: Uuid) -> StoreResult<bool> {
        let mut tx = self.db.pool().begin().await?;

        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND workout_id = $2")
            .bind(actor)
            .bind(workout)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE workouts SET like_count = like_count - 1 WHERE id = $1")
            .bind(workout)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_likes(
        &self,
        workout: Uuid,
        ghost_viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LikerDetail>> {
        let sql = format!(
            "SELECT l.id, l.user_id, u.handle, u.display_name, l.created_at \
             FROM likes l JOIN users u ON u.id = l.user_id \
             WHERE l.workout_id = $1 \
               AND ($2::uuid IS NULL OR NOT {ghost}) \
             ORDER BY l.created_at DESC, l.id DESC \
             LIMIT $3 OFFSET $4",
            ghost = blocked_between("gb", "$2", "l.user_id"),
        );
        let rows = sqlx::query(&sql)
            .bind(workout)
            .bind(ghost_viewer)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

        let mut likers = Vec::with_capacity(rows.len());
        for row in rows {
            likers.push(LikerDetail {
                like_id: row.get("id"),
                user_id: row.get("user_id"),
                handle: row.get("handle"),
                display_name: row.get("display_name"),
                liked_at: row.get("created_at"),
            });
        }

        Ok(likers)
    }

    async fn insert_comment(
        &self,
        actor: Uuid,
        workout: Uuid,
        body: &str,
    ) -> StoreResult<Option<Comment>> {
        let mut tx = self.db.pool().begin().await?;

        let sql = format!(
            "INSERT INTO comments (user_id, workout_id, body) \
             SELECT $1, w.id, $3 FROM workouts w JOIN users o ON o.id = w.owner_id \
             WHERE w.id = $2 AND {guard} \
             RETURNING id, user_id, workout_id, body, created_at",
            guard = visible_to("$1", "o"),
        );
        let row = sqlx::query(&sql)
            .bind(actor)
            .bind(workout)
            .bind(body)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("UPDATE workouts SET comment_count = comment_count + 1 WHERE id = $1")
            .bind(workout)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(comment_from_row(&row)))
    }

    async fn delete_comment(
        &self,
        comment: Uuid,
        workout: Uuid,
        author: Uuid,
    ) -> StoreResult<bool> {
        let mut tx = self.db.pool().begin().await?;

        let result = sqlx::query(
            "DELETE FROM comments WHERE id = $1 AND workout_id = $2 AND user_id = $3",
        )
        .bind(comment)
        .bind(workout)
        .bind(author)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE workouts SET comment_count = comment_count - 1 WHERE id = $1")
            .bind(workout)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_comments(
        &self,
        workout: Uuid,
        ghost_viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "SELECT c.id, c.user_id, c.workout_id, c.body, c.created_at \
             FROM comments c \
             WHERE c.workout_id = $1 \
               AND ($2::uuid IS NULL OR NOT {ghost}) \
             ORDER BY c.created_at DESC, c.id DESC \
             LIMIT $3 OFFSET $4",
            ghost = blocked_between("gb", "$2", "c.user_id"),
        );
        let rows = sqlx::query(&sql)
            .bind(workout)
            .bind(ghost_viewer)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db.ping().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_guard_checks_both_directions() {
        let sql = blocked_between("b", "$1", "$2");
        assert!(sql.contains("b.blocker_id = $1 AND b.blocked_id = $2"));
        assert!(sql.contains("b.blocker_id = $2 AND b.blocked_id = $1"));
    }

    #[test]
    fn interaction_guard_has_no_admin_bypass() {
        let sql = visible_to("$1", "o");
        assert!(sql.starts_with("(o.id = $1 OR"));
        assert!(sql.contains("NOT o.is_private"));
        assert!(sql.contains("vf.status = 'accepted'"));
        assert!(!sql.contains("admins"));
    }
}
