use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, SqlErr, Statement};

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, User};
use crate::repository::UserRepository;

const COLUMNS: &str = "id, name, email, age, created_at";

/// PostgreSQL implementation of UserRepository using SeaORM
#[derive(Clone)]
pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, stmt: Statement) -> UserResult<Option<User>> {
        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(UserError::store)?;
        Ok(row.map(Into::into))
    }

    async fn fetch_all(&self, stmt: Statement) -> UserResult<Vec<User>> {
        let rows = UserRow::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(UserError::store)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn exists(&self, stmt: Statement) -> UserResult<bool> {
        let row = ExistsRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(UserError::store)?;
        Ok(row.is_some_and(|r| r.found))
    }
}

#[derive(Debug, FromQueryResult)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    age: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            age: row.age,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct ExistsRow {
    found: bool,
}

/// Unique violations become `DuplicateEmail`, everything else a store error.
fn map_write_error(err: DbErr, email: &str) -> UserError {
    let unique = matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("duplicate key value violates unique constraint");

    if unique {
        UserError::DuplicateEmail(email.to_string())
    } else {
        UserError::store(err)
    }
}

/// `%fragment%` with LIKE wildcards in the fragment escaped
fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn save(&self, user: NewUser) -> UserResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, age, created_at) VALUES ($1, $2, $3, $4) RETURNING {}",
            COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.name.clone().into(),
                user.email.clone().into(),
                user.age.into(),
                user.created_at.into(),
            ],
        );

        UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| map_write_error(e, &user.email))?
            .map(Into::into)
            .ok_or_else(|| UserError::Store("INSERT returned no row".to_string()))
    }

    async fn update(&self, user: User) -> UserResult<User> {
        // created_at is write-once
        let sql = format!(
            "UPDATE users SET name = $1, email = $2, age = $3 WHERE id = $4 RETURNING {}",
            COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.name.clone().into(),
                user.email.clone().into(),
                user.age.into(),
                user.id.into(),
            ],
        );

        UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| map_write_error(e, &user.email))?
            .map(Into::into)
            .ok_or(UserError::NotFound(user.id))
    }

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", COLUMNS);
        self.fetch_one(Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]))
            .await
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", COLUMNS);
        self.fetch_one(Statement::from_sql_and_values(DbBackend::Postgres, sql, [email.into()]))
            .await
    }

    async fn find_all(&self) -> UserResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", COLUMNS);
        self.fetch_all(Statement::from_string(DbBackend::Postgres, sql)).await
    }

    async fn find_by_name_contains(&self, fragment: &str) -> UserResult<Vec<User>> {
        let sql = format!(
            r"SELECT {} FROM users WHERE name ILIKE $1 ESCAPE '\' ORDER BY id",
            COLUMNS
        );
        self.fetch_all(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [like_pattern(fragment).into()],
        ))
        .await
    }

    async fn exists_by_id(&self, id: i64) -> UserResult<bool> {
        let sql = "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1) AS found";
        self.exists(Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]))
            .await
    }

    async fn exists_by_email(&self, email: &str) -> UserResult<bool> {
        let sql = "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1) AS found";
        self.exists(Statement::from_sql_and_values(DbBackend::Postgres, sql, [email.into()]))
            .await
    }

    async fn exists_by_email_excluding_id(&self, email: &str, id: i64) -> UserResult<bool> {
        let sql = "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND id <> $2) AS found";
        self.exists(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [email.into(), id.into()],
        ))
        .await
    }

    async fn delete(&self, id: i64) -> UserResult<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM users WHERE id = $1",
            [id.into()],
        );

        let result = self.db.execute_raw(stmt).await.map_err(UserError::store)?;
        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(id));
        }
        Ok(())
    }
}
