//! Postgres Store Tests
//!
//! Exercises `PgStore` against a real database. Skipped unless
//! `TEST_DATABASE_URL` points at a disposable Postgres instance.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use stride::app::content::ContentAccessor;
use stride::app::social::RelationshipMutator;
use stride::app::AccessError;
use stride::domain::social_graph::FollowStatus;
use stride::infra::db::Db;
use stride::infra::pg_store::PgStore;
use stride::infra::store::GraphStore;

async fn setup() -> Option<(PgPool, RelationshipMutator, ContentAccessor)> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("cannot connect to test database");

    let mut migration_files: Vec<_> = std::fs::read_dir("migrations")
        .expect("cannot read migrations/")
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "sql"))
        .collect();
    migration_files.sort_by_key(|e| e.file_name());

    for entry in &migration_files {
        let sql = std::fs::read_to_string(entry.path())
            .unwrap_or_else(|_| panic!("cannot read {:?}", entry.path()));
        sqlx::raw_sql(&sql)
            .execute(&pool)
            .await
            .unwrap_or_else(|e| panic!("migration {:?} failed: {}", entry.file_name(), e));
    }

    let store: Arc<dyn GraphStore> = Arc::new(PgStore::new(Db::from_pool(pool.clone())));
    Some((
        pool,
        RelationshipMutator::new(store.clone()),
        ContentAccessor::new(store),
    ))
}

async fn create_user(pool: &PgPool, is_private: bool) -> Uuid {
    let handle = format!("pg_{}", Uuid::new_v4().simple());
    sqlx::query_scalar(
        "INSERT INTO users (handle, display_name, is_private) VALUES ($1, $1, $2) RETURNING id",
    )
    .bind(&handle)
    .bind(is_private)
    .fetch_one(pool)
    .await
    .expect("insert test user failed")
}

async fn create_workout(pool: &PgPool, owner: Uuid) -> Uuid {
    sqlx::query_scalar("INSERT INTO workouts (owner_id, title) VALUES ($1, 'tempo') RETURNING id")
        .bind(owner)
        .fetch_one(pool)
        .await
        .expect("insert test workout failed")
}

async fn counts(pool: &PgPool, user: Uuid) -> (i64, i64) {
    sqlx::query_as("SELECT followers_count, following_count FROM users WHERE id = $1")
        .bind(user)
        .fetch_one(pool)
        .await
        .expect("count lookup failed")
}

#[tokio::test]
async fn block_cascade_and_idempotence() {
    let Some((pool, mutator, _)) = setup().await else {
        return;
    };
    let a = create_user(&pool, false).await;
    let b = create_user(&pool, false).await;
    mutator.follow(a, b).await.unwrap();
    mutator.follow(b, a).await.unwrap();
    assert_eq!(counts(&pool, a).await, (1, 1));

    let first = mutator.block(a, b).await.unwrap();
    let second = mutator.block(a, b).await.unwrap();
    assert_eq!(first, second);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM blocks WHERE blocker_id = $1 AND blocked_id = $2",
    )
    .bind(a)
    .bind(b)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(counts(&pool, a).await, (0, 0));
    assert_eq!(counts(&pool, b).await, (0, 0));
    assert!(mutator.is_blocked(b, a).await.unwrap());
    assert!(matches!(mutator.follow(b, a).await, Err(AccessError::Blocked)));
}

#[tokio::test]
async fn pending_follow_lifecycle() {
    let Some((pool, mutator, content)) = setup().await else {
        return;
    };
    let owner = create_user(&pool, true).await;
    let follower = create_user(&pool, false).await;
    let workout = create_workout(&pool, owner).await;

    let edge = mutator.follow(follower, owner).await.unwrap();
    assert_eq!(edge.status, FollowStatus::Pending);
    assert!(content.get_workout(workout, follower).await.unwrap_err().is_not_found());

    mutator.accept_follow(follower, owner).await.unwrap();
    assert!(mutator.accept_follow(follower, owner).await.unwrap_err().is_not_found());
    assert_eq!(counts(&pool, owner).await, (1, 0));
    assert!(content.get_workout(workout, follower).await.is_ok());

    sqlx::query("UPDATE users SET is_private = TRUE WHERE id = $1")
        .bind(owner)
        .execute(&pool)
        .await
        .unwrap();
    let edge = mutator.follow(follower, owner).await.unwrap();
    assert_eq!(edge.status, FollowStatus::Accepted);
    assert_eq!(counts(&pool, owner).await, (1, 0));
}

#[tokio::test]
async fn guarded_like_and_ghosted_likers() {
    let Some((pool, mutator, _)) = setup().await else {
        return;
    };
    let owner = create_user(&pool, true).await;
    let stranger = create_user(&pool, false).await;
    let follower = create_user(&pool, false).await;
    let workout = create_workout(&pool, owner).await;

    assert!(matches!(
        mutator.like(stranger, workout).await,
        Err(AccessError::InteractionNotAllowed)
    ));

    mutator.follow(follower, owner).await.unwrap();
    mutator.accept_follow(follower, owner).await.unwrap();
    let first = mutator.like(follower, workout).await.unwrap();
    let second = mutator.like(follower, workout).await.unwrap();
    assert_eq!(first.id, second.id);

    let like_count: i64 = sqlx::query_scalar("SELECT like_count FROM workouts WHERE id = $1")
        .bind(workout)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(like_count, 1);

    assert_eq!(mutator.list_likers(workout, owner, 10, 0).await.unwrap().len(), 1);
    mutator.block(owner, follower).await.unwrap();
    assert!(mutator.list_likers(workout, owner, 10, 0).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_follows_count_once() {
    let Some((pool, mutator, _)) = setup().await else {
        return;
    };
    let a = create_user(&pool, false).await;
    let b = create_user(&pool, false).await;

    let (first, second) = tokio::join!(mutator.follow(a, b), mutator.follow(a, b));
    assert_eq!(first.unwrap(), second.unwrap());

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND following_id = $2",
    )
    .bind(a)
    .bind(b)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(counts(&pool, a).await, (0, 1));
    assert_eq!(counts(&pool, b).await, (1, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_blocks_cascade_once() {
    let Some((pool, mutator, _)) = setup().await else {
        return;
    };
    let a = create_user(&pool, false).await;
    let b = create_user(&pool, false).await;
    mutator.follow(b, a).await.unwrap();

    let (first, second) = tokio::join!(mutator.block(a, b), mutator.block(a, b));
    assert_eq!(first.unwrap(), second.unwrap());

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM blocks WHERE blocker_id = $1 AND blocked_id = $2",
    )
    .bind(a)
    .bind(b)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(counts(&pool, a).await, (0, 0));
    assert_eq!(counts(&pool, b).await, (0, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_likes_store_one_row() {
    let Some((pool, mutator, _)) = setup().await else {
        return;
    };
    let owner = create_user(&pool, false).await;
    let liker = create_user(&pool, false).await;
    let workout = create_workout(&pool, owner).await;

    let (first, second) = tokio::join!(mutator.like(liker, workout), mutator.like(liker, workout));
    assert_eq!(first.unwrap().id, second.unwrap().id);

    let (rows, like_count): (i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM likes WHERE workout_id = $1), \
                (SELECT like_count FROM workouts WHERE id = $1)",
    )
    .bind(workout)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(like_count, 1);
}

#[tokio::test]
async fn block_of_missing_user_is_a_reference_error() {
    let Some((pool, mutator, _)) = setup().await else {
        return;
    };
    let a = create_user(&pool, false).await;

    let err = mutator.block(a, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AccessError::Reference(_)));
}
