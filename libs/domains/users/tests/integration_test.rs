//! PostgreSQL integration tests
//!
//! Each test starts its own container. Run with `--ignored` where Docker is
//! available.

use chrono::Utc;
use domain_users::*;
use test_utils::{TestDataBuilder, TestDatabase};

fn new_user(name: &str, email: &str, age: Option<i32>) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        age,
        created_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_crud_round_trip() {
    let db = TestDatabase::new().await;
    let service = UserService::new(PgUserRepository::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("pg_crud");

    let created = service
        .create_user(UserRequest::new(
            builder.name("anna"),
            builder.email("anna"),
            Some(28),
        ))
        .await
        .unwrap();
    assert!(created.id > 0);

    let fetched = service.get_user(created.id).await.unwrap();
    assert_eq!(fetched.email, created.email);
    assert_eq!(fetched.age, Some(28));

    let by_email = service.get_user_by_email(&created.email).await.unwrap();
    assert_eq!(by_email.id, created.id);

    let updated = service
        .update_user(
            created.id,
            UserRequest::new("Anna Updated", builder.email("anna"), None),
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Anna Updated");
    assert_eq!(updated.age, None);
    assert_eq!(
        updated.created_at.timestamp_micros(),
        created.created_at.timestamp_micros()
    );

    service.delete_user(created.id).await.unwrap();
    assert!(matches!(
        service.get_user(created.id).await,
        Err(UserError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_unique_constraint_maps_to_duplicate_email() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());

    repo.save(new_user("Anna", "anna@example.com", None))
        .await
        .unwrap();

    // Bypass the service pre-check to hit the store constraint
    let err = repo
        .save(new_user("Other Anna", "anna@example.com", None))
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::DuplicateEmail(email) if email == "anna@example.com"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_search_is_case_insensitive_and_literal() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());

    for (name, email) in [
        ("Ivan Petrov", "ivan@example.com"),
        ("MARIA IVANOVA", "maria@example.com"),
        ("Boris", "boris@example.com"),
        ("100% Real", "real@example.com"),
    ] {
        repo.save(new_user(name, email, None)).await.unwrap();
    }

    let names: Vec<_> = repo
        .find_by_name_contains("ivan")
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, ["Ivan Petrov", "MARIA IVANOVA"]);

    let literal = repo.find_by_name_contains("%").await.unwrap();
    assert_eq!(literal.len(), 1);
    assert_eq!(literal[0].name, "100% Real");

    assert_eq!(repo.find_by_name_contains("").await.unwrap().len(), 4);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_existence_checks() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());

    let anna = repo
        .save(new_user("Anna", "anna@example.com", Some(30)))
        .await
        .unwrap();

    assert!(repo.exists_by_id(anna.id).await.unwrap());
    assert!(!repo.exists_by_id(anna.id + 1).await.unwrap());
    assert!(repo.exists_by_email("anna@example.com").await.unwrap());
    assert!(!repo.exists_by_email("ANNA@example.com").await.unwrap());
    assert!(
        !repo
            .exists_by_email_excluding_id("anna@example.com", anna.id)
            .await
            .unwrap()
    );
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_ids_are_not_reused() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());

    let first = repo
        .save(new_user("Anna", "anna@example.com", None))
        .await
        .unwrap();
    repo.delete(first.id).await.unwrap();

    let second = repo
        .save(new_user("Anna", "anna@example.com", None))
        .await
        .unwrap();
    assert!(second.id > first.id);

    assert!(matches!(
        repo.delete(first.id).await,
        Err(UserError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_age_check_constraint() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());

    let err = repo
        .save(new_user("Old", "old@example.com", Some(151)))
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::Store(_)));
}
