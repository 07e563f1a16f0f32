use chrono::Utc;
use observability::DirectoryMetrics;
use std::sync::Arc;
use tracing::instrument;

use crate::error::{UserError, UserResult};
use crate::events::ChangeNotifier;
use crate::models::{NewUser, User, UserRequest};
use crate::repository::UserRepository;
use crate::validation::validate_fail_fast;

/// Validated, trimmed field values
struct Fields {
    name: String,
    email: String,
    age: Option<i32>,
}

fn checked_fields(request: &UserRequest) -> UserResult<Fields> {
    validate_fail_fast(request.name.as_deref(), request.email.as_deref(), request.age).map_err(|e| {
        DirectoryMetrics::record_validation_failure(e.field);
        UserError::from(e)
    })?;

    Ok(Fields {
        name: request.name.as_deref().unwrap_or_default().trim().to_string(),
        email: request.email.as_deref().unwrap_or_default().trim().to_string(),
        age: request.age,
    })
}

fn count_duplicates<T>(result: UserResult<T>) -> UserResult<T> {
    if let Err(UserError::DuplicateEmail(_)) = &result {
        DirectoryMetrics::record_duplicate_email();
    }
    result
}

/// Validation, email uniqueness and notifications on top of a [`UserRepository`]
#[derive(Clone)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    notifier: ChangeNotifier,
}

impl<R: UserRepository> UserService<R> {
    /// Service with notifications disabled
    pub fn new(repository: R) -> Self {
        Self::with_notifier(repository, ChangeNotifier::disabled())
    }

    pub fn with_notifier(repository: R, notifier: ChangeNotifier) -> Self {
        Self {
            repository: Arc::new(repository),
            notifier,
        }
    }

    /// Validate fail-fast, reject a taken email, persist, then notify.
    #[instrument(skip(self, request), fields(email = ?request.email))]
    pub async fn create_user(&self, request: UserRequest) -> UserResult<User> {
        let fields = checked_fields(&request)?;

        if self.repository.exists_by_email(&fields.email).await? {
            return count_duplicates(Err(UserError::DuplicateEmail(fields.email)));
        }

        let new_user = NewUser {
            name: fields.name,
            email: fields.email,
            age: fields.age,
            created_at: Utc::now(),
        };
        // The store constraint catches a concurrent create that passed the check above
        let user = count_duplicates(self.repository.save(new_user).await)?;

        DirectoryMetrics::record_created();

        self.notifier.notify_created(&user);
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> UserResult<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> UserResult<User> {
        self.repository
            .find_by_email(email)
            .await?
            .ok_or_else(|| UserError::EmailNotFound(email.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> UserResult<Vec<User>> {
        self.repository.find_all().await
    }

    /// `None` is a missing parameter; `Some("")` matches every user.
    #[instrument(skip(self))]
    pub async fn search_users(&self, fragment: Option<&str>) -> UserResult<Vec<User>> {
        let fragment = fragment.ok_or(UserError::MissingParameter("name"))?;
        self.repository.find_by_name_contains(fragment).await
    }

    /// Replace name, email and age. Emits no notification.
    #[instrument(skip(self, request), fields(email = ?request.email))]
    pub async fn update_user(&self, id: i64, request: UserRequest) -> UserResult<User> {
        let mut user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        let fields = checked_fields(&request)?;

        if self
            .repository
            .exists_by_email_excluding_id(&fields.email, id)
            .await?
        {
            return count_duplicates(Err(UserError::DuplicateEmail(fields.email)));
        }

        user.name = fields.name;
        user.email = fields.email;
        user.age = fields.age;

        let user = count_duplicates(self.repository.update(user).await)?;
        DirectoryMetrics::record_updated();
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> UserResult<()> {
        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        self.repository.delete(id).await?;

        DirectoryMetrics::record_deleted();

        self.notifier.notify_deleted(&user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use mockall::predicate::eq;

    fn stored(id: i64, name: &str, email: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            age: Some(25),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_before_touching_store() {
        // No expectations: any repository call would panic
        let service = UserService::new(MockUserRepository::new());

        let err = service
            .create_user(UserRequest::new("", "a@b.com", Some(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(ref f) if f.field == "name"));

        let err = service
            .create_user(UserRequest::new("Bob", "not-an-email", Some(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(ref f) if f.field == "email"));

        let err = service
            .create_user(UserRequest::new("Bob", "a@b.com", Some(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(ref f) if f.field == "age"));
    }

    #[tokio::test]
    async fn test_create_trims_fields_before_checking_and_saving() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email()
            .withf(|email| email == "bob@mail.com")
            .times(1)
            .returning(|_| Ok(false));
        repo.expect_save()
            .withf(|u| u.name == "Bob Stone" && u.email == "bob@mail.com" && u.age.is_none())
            .times(1)
            .returning(|u| Ok(u.into_user(1)));

        let service = UserService::new(repo);
        let user = service
            .create_user(UserRequest::new("  Bob Stone ", " bob@mail.com ", None))
            .await
            .unwrap();
        assert_eq!(user.id, 1);
    }

    #[tokio::test]
    async fn test_create_with_taken_email_is_conflict() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email().returning(|_| Ok(true));
        repo.expect_save().never();

        let service = UserService::new(repo);
        let err = service
            .create_user(UserRequest::new("Bob", "bob@mail.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_create_surfaces_store_constraint_as_conflict() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email().returning(|_| Ok(false));
        repo.expect_save()
            .returning(|u| Err(UserError::DuplicateEmail(u.email)));

        let service = UserService::new(repo);
        let err = service
            .create_user(UserRequest::new("Bob", "bob@mail.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::DuplicateEmail(email) if email == "bob@mail.com"));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found_without_writes() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().with(eq(9)).returning(|_| Ok(None));
        repo.expect_update().never();

        let service = UserService::new(repo);
        let err = service
            .update_user(9, UserRequest::new("Bob", "bob@mail.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound(9)));
    }

    #[tokio::test]
    async fn test_update_not_found_wins_over_invalid_input() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let service = UserService::new(repo);
        let err = service
            .update_user(9, UserRequest::new("", "bad", None))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound(9)));
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_created_at() {
        let existing = stored(4, "Anna", "anna@mail.com");
        let created_at = existing.created_at;

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .with(eq(4))
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_exists_by_email_excluding_id()
            .withf(|email, id| email == "anna@mail.com" && *id == 4)
            .returning(|_, _| Ok(false));
        repo.expect_update()
            .withf(move |u| u.id == 4 && u.created_at == created_at && u.name == "Anna K")
            .returning(Ok);

        let service = UserService::new(repo);
        let user = service
            .update_user(4, UserRequest::new("Anna K", "anna@mail.com", Some(31)))
            .await
            .unwrap();
        assert_eq!(user.age, Some(31));
    }

    #[tokio::test]
    async fn test_update_to_another_users_email_is_conflict() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(stored(id, "Anna", "anna@mail.com"))));
        repo.expect_exists_by_email_excluding_id()
            .returning(|_, _| Ok(true));
        repo.expect_update().never();

        let service = UserService::new(repo);
        let err = service
            .update_user(4, UserRequest::new("Anna", "boris@mail.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_delete().never();

        let service = UserService::new(repo);
        assert!(matches!(service.delete_user(5).await, Err(UserError::NotFound(5))));
    }

    #[tokio::test]
    async fn test_search_requires_the_parameter() {
        let service = UserService::new(MockUserRepository::new());
        let err = service.search_users(None).await.unwrap_err();
        assert!(matches!(err, UserError::MissingParameter("name")));
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn test_get_by_email_miss_is_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));

        let service = UserService::new(repo);
        let err = service.get_user_by_email("ghost@mail.com").await.unwrap_err();
        assert!(matches!(err, UserError::EmailNotFound(email) if email == "ghost@mail.com"));
    }
}
