use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use prospect_core::{Comment, CoreError, DatabaseError, Post, SCHEMA_VERSION};

use crate::export::export_batch;
use crate::import::import_directory;
use crate::Database;

async fn setup_test_db() -> (Database, PathBuf) {
    let path = std::env::temp_dir().join(format!("prospect_test_{}.db", uuid::Uuid::new_v4()));
    let db = Database::connect(&path)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations().await.expect("Failed to run migrations");
    (db, path)
}

fn ts(epoch_seconds: i64) -> DateTime<Utc> {
    // Whole seconds only, matching the source clock's resolution
    Utc.timestamp_opt(epoch_seconds, 0).unwrap()
}

fn sample_post(id: &str, score: i64) -> Post {
    Post {
        id: id.to_string(),
        title: "Is there a tool for this?".to_string(),
        content: "long form body".to_string(),
        score,
        num_comments: 7,
        created_utc: ts(1640995200),
        author: "builder42".to_string(),
        subreddit: "startups".to_string(),
        url: format!("https://reddit.com/r/startups/comments/{id}/"),
        search_pattern: "is there a tool".to_string(),
        upvote_ratio: 0.93,
        is_self: true,
        domain: "self.startups".to_string(),
        extracted_at: ts(1641081600),
    }
}

fn sample_comment(comment_id: &str, post_id: &str) -> Comment {
    Comment {
        comment_id: comment_id.to_string(),
        post_id: post_id.to_string(),
        body: "have you tried X".to_string(),
        score: 3,
        created_utc: ts(1640998800),
        author: "commenter".to_string(),
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (db, _path) = setup_test_db().await;
    db.run_migrations().await.expect("second run should be a no-op");
    assert_eq!(db.count_posts().await.unwrap(), 0);
}

#[tokio::test]
async fn replace_on_conflict_keeps_the_last_write() {
    let (db, _path) = setup_test_db().await;

    db.upsert_posts(&[sample_post("p1", 5)]).await.unwrap();
    db.upsert_posts(&[sample_post("p1", 99)]).await.unwrap();

    assert_eq!(db.count_posts().await.unwrap(), 1);
    let stored = db.get_post("p1").await.unwrap().unwrap();
    assert_eq!(stored.score, 99);
}

#[tokio::test]
async fn full_row_is_replaced_not_merged() {
    let (db, _path) = setup_test_db().await;

    db.upsert_posts(&[sample_post("p1", 5)]).await.unwrap();

    let mut rewrite = sample_post("p1", 5);
    rewrite.search_pattern = "looking for a tool".to_string();
    rewrite.title = "retitled".to_string();
    db.upsert_posts(&[rewrite.clone()]).await.unwrap();

    let stored = db.get_post("p1").await.unwrap().unwrap();
    assert_eq!(stored, rewrite);
}

#[tokio::test]
async fn comment_fk_is_not_enforced_at_write_time() {
    let (db, _path) = setup_test_db().await;

    // Owning post intentionally absent
    db.upsert_comments(&[sample_comment("c1", "never-fetched")])
        .await
        .unwrap();

    assert_eq!(db.count_comments().await.unwrap(), 1);
    let stored = db.get_comment("c1").await.unwrap().unwrap();
    assert_eq!(stored.post_id, "never-fetched");
}

#[tokio::test]
async fn export_writes_timestamped_files() {
    let dir = tempfile::tempdir().unwrap();
    let run_started_at = ts(1640995200); // 2022-01-01 00:00:00 UTC

    let paths = export_batch(dir.path(), run_started_at, &[sample_post("p1", 5)], &[]).unwrap();

    assert!(paths.posts_csv.ends_with("reddit_posts_20220101_000000.csv"));
    assert!(paths.posts_json.ends_with("reddit_posts_20220101_000000.json"));
    assert!(paths.posts_csv.exists());
    assert!(paths.posts_json.exists());
    assert!(paths.comments_csv.is_none());
    assert!(paths.comments_json.is_none());
}

#[tokio::test]
async fn export_then_import_round_trips_field_for_field() {
    let dir = tempfile::tempdir().unwrap();
    let posts = vec![sample_post("p1", 5), sample_post("p2", 12)];
    let comments = vec![sample_comment("c1", "p1")];

    export_batch(dir.path(), ts(1640995200), &posts, &comments).unwrap();

    let (db, _path) = setup_test_db().await;
    let summary = import_directory(&db, dir.path()).await.unwrap();
    assert_eq!(summary.posts, 2);
    assert_eq!(summary.comments, 1);
    assert_eq!(summary.skipped_files, 0);

    let stored = db.get_post("p2").await.unwrap().unwrap();
    assert_eq!(stored, posts[1]);
    let stored = db.get_comment("c1").await.unwrap().unwrap();
    assert_eq!(stored, comments[0]);
}

#[tokio::test]
async fn reimporting_the_same_file_twice_does_not_drift() {
    let dir = tempfile::tempdir().unwrap();
    let posts = vec![sample_post("p1", 5)];
    export_batch(dir.path(), ts(1640995200), &posts, &[]).unwrap();

    let (db, _path) = setup_test_db().await;
    import_directory(&db, dir.path()).await.unwrap();
    let after_first = db.count_posts().await.unwrap();

    import_directory(&db, dir.path()).await.unwrap();
    let after_second = db.count_posts().await.unwrap();

    assert_eq!(after_first, 1);
    assert_eq!(after_second, after_first);
}

#[tokio::test]
async fn malformed_export_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    export_batch(dir.path(), ts(1640995200), &[sample_post("p1", 5)], &[]).unwrap();
    std::fs::write(
        dir.path().join("reddit_posts_20220202_000000.json"),
        "{ not valid json",
    )
    .unwrap();

    let (db, _path) = setup_test_db().await;
    let summary = import_directory(&db, dir.path()).await.unwrap();

    assert_eq!(summary.posts, 1);
    assert_eq!(summary.skipped_files, 1);
}

#[tokio::test]
async fn a_store_from_a_newer_schema_is_refused() {
    let (db, path) = setup_test_db().await;
    drop(db);

    let pool = sqlx::SqlitePool::connect(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION + 1))
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let db = Database::connect(&path).await.unwrap();
    let err = db.run_migrations().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Database(DatabaseError::SchemaVersionMismatch { .. })
    ));
}
