use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, User};

/// Persistence for user records.
///
/// Implementations must reject a second record with the same email with
/// [`UserError::DuplicateEmail`], even when the caller skipped the existence check.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert and assign an id
    async fn save(&self, user: NewUser) -> UserResult<User>;

    /// Persist name, email and age of an existing record; `created_at` is kept
    async fn update(&self, user: User) -> UserResult<User>;

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Every record in id order
    async fn find_all(&self) -> UserResult<Vec<User>>;

    /// Case-insensitive substring match on name, in id order
    async fn find_by_name_contains(&self, fragment: &str) -> UserResult<Vec<User>>;

    async fn exists_by_id(&self, id: i64) -> UserResult<bool>;

    async fn exists_by_email(&self, email: &str) -> UserResult<bool>;

    /// Whether `email` belongs to a record other than `id`
    async fn exists_by_email_excluding_id(&self, email: &str, id: i64) -> UserResult<bool>;

    /// [`UserError::NotFound`] when no record has `id`
    async fn delete(&self, id: i64) -> UserResult<()>;
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, User>,
    last_id: i64,
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<Table>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(table: &Table, email: &str, except: Option<i64>) -> bool {
    table
        .rows
        .values()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: NewUser) -> UserResult<User> {
        let mut table = self.table.write().await;

        if email_taken(&table, &user.email, None) {
            return Err(UserError::DuplicateEmail(user.email));
        }

        table.last_id += 1;
        let user = user.into_user(table.last_id);
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let mut table = self.table.write().await;

        if email_taken(&table, &user.email, Some(user.id)) {
            return Err(UserError::DuplicateEmail(user.email));
        }

        let stored = table.rows.get_mut(&user.id).ok_or(UserError::NotFound(user.id))?;
        stored.name = user.name;
        stored.email = user.email;
        stored.age = user.age;
        Ok(stored.clone())
    }

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_all(&self) -> UserResult<Vec<User>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn find_by_name_contains(&self, fragment: &str) -> UserResult<Vec<User>> {
        let needle = fragment.to_lowercase();
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn exists_by_id(&self, id: i64) -> UserResult<bool> {
        Ok(self.table.read().await.rows.contains_key(&id))
    }

    async fn exists_by_email(&self, email: &str) -> UserResult<bool> {
        Ok(email_taken(&*self.table.read().await, email, None))
    }

    async fn exists_by_email_excluding_id(&self, email: &str, id: i64) -> UserResult<bool> {
        Ok(email_taken(&*self.table.read().await, email, Some(id)))
    }

    async fn delete(&self, id: i64) -> UserResult<()> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(UserError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            age: Some(30),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_increasing_ids() {
        let repo = InMemoryUserRepository::new();
        let a = repo.save(new_user("Anna", "anna@mail.com")).await.unwrap();
        let b = repo.save(new_user("Boris", "boris@mail.com")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let repo = InMemoryUserRepository::new();
        let a = repo.save(new_user("Anna", "anna@mail.com")).await.unwrap();
        repo.delete(a.id).await.unwrap();
        let b = repo.save(new_user("Anna", "anna@mail.com")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_save_rejects_duplicate_email() {
        let repo = InMemoryUserRepository::new();
        repo.save(new_user("Anna", "anna@mail.com")).await.unwrap();
        let err = repo.save(new_user("Other", "anna@mail.com")).await.unwrap_err();
        assert!(matches!(err, UserError::DuplicateEmail(email) if email == "anna@mail.com"));
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_created_at_and_checks_email() {
        let repo = InMemoryUserRepository::new();
        let anna = repo.save(new_user("Anna", "anna@mail.com")).await.unwrap();
        repo.save(new_user("Boris", "boris@mail.com")).await.unwrap();

        let mut changed = anna.clone();
        changed.name = "Anna K".to_string();
        changed.created_at = Utc::now() + chrono::Duration::days(1);
        let updated = repo.update(changed).await.unwrap();
        assert_eq!(updated.name, "Anna K");
        assert_eq!(updated.created_at, anna.created_at);

        let mut clash = updated.clone();
        clash.email = "boris@mail.com".to_string();
        assert!(matches!(repo.update(clash).await, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_find_by_name_contains_ignores_case() {
        let repo = InMemoryUserRepository::new();
        repo.save(new_user("Ivan Petrov", "ivan@mail.com")).await.unwrap();
        repo.save(new_user("MARIA IVANOVA", "maria@mail.com")).await.unwrap();
        repo.save(new_user("Petr Sidorov", "petr@mail.com")).await.unwrap();

        let names: Vec<String> = repo
            .find_by_name_contains("ivan")
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Ivan Petrov", "MARIA IVANOVA"]);
        assert_eq!(repo.find_by_name_contains("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_exists_by_email_excluding_id() {
        let repo = InMemoryUserRepository::new();
        let anna = repo.save(new_user("Anna", "anna@mail.com")).await.unwrap();
        assert!(repo.exists_by_email("anna@mail.com").await.unwrap());
        assert!(!repo.exists_by_email_excluding_id("anna@mail.com", anna.id).await.unwrap());
        assert!(repo.exists_by_email_excluding_id("anna@mail.com", anna.id + 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let repo = InMemoryUserRepository::new();
        assert!(matches!(repo.delete(42).await, Err(UserError::NotFound(42))));
    }
}
