use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction, Value};
use uuid::Uuid;

use crate::database::entity::{post, user};
use crate::database::postgres_repo::{PostgresPostRepository, PostgresUserRepository};
use quill_core::domain::{PageRequest, Post, PostInput, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository, UserRepository};

fn post_model(id: Uuid, user_id: Uuid, title: &str) -> post::Model {
    let now = Utc::now();
    post::Model {
        id,
        user_id,
        title: title.to_owned(),
        body: "Body".to_owned(),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

fn count_row(total: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(total)))])
}

fn transaction_log(repo: PostgresPostRepository) -> Vec<Transaction> {
    match Arc::try_unwrap(repo.db) {
        Ok(conn) => conn.into_transaction_log(),
        Err(_) => panic!("connection is still shared"),
    }
}

fn user_model(id: Uuid, name: &str) -> user::Model {
    let now = Utc::now();
    user::Model {
        id,
        name: name.to_owned(),
        email: format!("{}@example.com", name.to_lowercase()),
        password_hash: "hash".to_owned(),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let post_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(post_id, user_id, "Test Post")]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.expect("post should be found");
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.id, post_id);
    assert_eq!(post.user_id, user_id);
}

#[tokio::test]
async fn test_find_post_with_author() {
    let post_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![(
            post_model(post_id, user_id, "Joined"),
            user_model(user_id, "Alice"),
        )]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let found = repo.find_with_author(post_id).await.unwrap().unwrap();
    assert_eq!(found.post.id, post_id);
    assert_eq!(found.author.id, user_id);
    assert_eq!(found.author.name, "Alice");
}

#[tokio::test]
async fn test_missing_post_is_none() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(Uuid::new_v4()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_delete_reports_missing_rows() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result = BaseRepository::<Post, Uuid>::delete(&repo, Uuid::new_v4()).await;
    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_insert_post_returns_stored_row() {
    let user_id = Uuid::new_v4();
    let post = Post::new(user_id, "Fresh".into(), "Body".into());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(post.id, user_id, "Fresh")]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let stored = repo.insert(post.clone()).await.unwrap();
    assert_eq!(stored.id, post.id);
    assert_eq!(stored.user_id, user_id);
}

#[tokio::test]
async fn test_find_user_by_email() {
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user_model(user_id, "Bob")]])
        .into_connection();

    let repo = PostgresUserRepository::new(db);

    let user: User = repo
        .find_by_email("bob@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.name, "Bob");
}

#[tokio::test]
async fn test_update_post_sets_only_editable_columns() {
    let user_id = Uuid::new_v4();
    let mut post = Post::new(user_id, "Old".into(), "Old body".into());
    post.revise(PostInput::new("New", "New body"));

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(post.id, user_id, "New")]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let stored = repo.update(post.clone()).await.unwrap();
    assert_eq!(stored.id, post.id);
    assert_eq!(stored.title, "New");

    let log = transaction_log(repo);
    assert_eq!(log.len(), 1);
    let sql = log[0].statements()[0].to_string();
    let (assignments, filter) = sql.split_once(" WHERE ").unwrap();

    assert!(assignments.starts_with(r#"UPDATE "posts" SET"#), "{sql}");
    assert!(assignments.contains(r#""title" = 'New'"#), "{sql}");
    assert!(assignments.contains(r#""body" = 'New body'"#), "{sql}");
    assert!(assignments.contains(r#""updated_at""#), "{sql}");
    assert!(!assignments.contains(r#""user_id""#), "{sql}");
    assert!(!assignments.contains(r#""created_at""#), "{sql}");
    assert!(filter.contains(&post.id.to_string()), "{sql}");
}

#[tokio::test]
async fn test_paginate_joins_authors_in_creation_order() {
    let alice = user_model(Uuid::new_v4(), "Alice");
    let bob = user_model(Uuid::new_v4(), "Bob");
    let start = Utc::now();

    let mut rows = Vec::new();
    for (i, owner) in [&alice, &bob, &alice].into_iter().enumerate() {
        let mut model = post_model(Uuid::new_v4(), owner.id, &format!("Post {}", i + 4));
        model.created_at = (start + Duration::seconds(i as i64)).into();
        rows.push((model, owner.clone()));
    }

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[count_row(7)]])
        .append_query_results([rows])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let page = repo
        .paginate_with_authors(PageRequest::new(2, 3))
        .await
        .unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(page.total_items, 7);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.items[0].post.title, "Post 4");
    assert_eq!(page.items[0].author.name, "Alice");
    assert_eq!(page.items[1].author.name, "Bob");
    assert_eq!(page.items[1].author.id, bob.id);

    let log = transaction_log(repo);
    assert_eq!(log.len(), 2);

    let count = log[0].statements()[0].to_string();
    assert!(count.contains("COUNT(*) AS num_items"), "{count}");

    let select = log[1].statements()[0].to_string();
    assert!(select.contains(r#"LEFT JOIN "users""#), "{select}");
    assert!(
        select.contains(r#"ORDER BY "posts"."created_at" ASC, "posts"."id" ASC"#),
        "{select}"
    );
    assert!(select.contains("LIMIT 3 OFFSET 3"), "{select}");
}

#[tokio::test]
async fn test_paginate_past_last_page_skips_fetch() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[count_row(4)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let page = repo
        .paginate_with_authors(PageRequest::new(u64::MAX, 3))
        .await
        .unwrap();
    assert!(page.is_empty());
    assert_eq!(page.page, u64::MAX);
    assert_eq!(page.total_items, 4);
    assert_eq!(page.total_pages, 2);
    assert!(!page.has_next());

    assert_eq!(transaction_log(repo).len(), 1);
}

#[tokio::test]
async fn test_repositories_share_one_connection() {
    let user_id = Uuid::new_v4();
    let post_id = Uuid::new_v4();

    let conn = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user_model(user_id, "Carol")]])
            .append_query_results([vec![post_model(post_id, user_id, "Shared")]])
            .into_connection(),
    );

    let users = PostgresUserRepository::shared(conn.clone());
    let posts = PostgresPostRepository::shared(conn.clone());

    let user = users
        .find_by_email("carol@example.com")
        .await
        .unwrap()
        .unwrap();
    let post: Post = posts.find_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(post.user_id, user.id);

    drop((users, posts));
    assert_eq!(Arc::strong_count(&conn), 1);
}
