use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::validation::validate_collect_all;

/// A stored user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Store-assigned identifier, never reused
    pub id: i64,
    pub name: String,
    /// Unique across all users
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    /// Set once at creation
    pub created_at: DateTime<Utc>,
}

/// A record that has not been saved yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn into_user(self, id: i64) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            age: self.age,
            created_at: self.created_at,
        }
    }
}

/// Body of `POST /users` and `PUT /users/{id}`.
///
/// Fields are optional at the type level so a missing field is reported by
/// validation instead of a deserialization error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserRequest {
    #[schema(example = "Ivan Petrov", min_length = 2, max_length = 100)]
    pub name: Option<String>,
    #[schema(example = "ivan.petrov@example.com")]
    pub email: Option<String>,
    #[schema(example = 30, minimum = 0, maximum = 150)]
    pub age: Option<i32>,
}

impl UserRequest {
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: Option<i32>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            age,
        }
    }
}

impl Validate for UserRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let failures = validate_collect_all(self.name.as_deref(), self.email.as_deref(), self.age);
        if failures.is_empty() {
            return Ok(());
        }

        let mut errors = ValidationErrors::new();
        for (field, message) in failures {
            let mut error = ValidationError::new("invalid");
            error.message = Some(message.into());
            errors.add(field, error);
        }
        Err(errors)
    }
}

/// `GET /users/search` query
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Case-insensitive name fragment; empty matches every user
    pub name: Option<String>,
}

/// Hypermedia link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Link {
    pub href: String,
}

/// A user with navigation links, as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResource {
    #[serde(flatten)]
    pub user: User,
    #[serde(rename = "_links")]
    pub links: BTreeMap<String, Link>,
}

impl UserResource {
    /// Links relative to `base`, the collection path (e.g. `/api/v1/users`).
    pub fn new(user: User, base: &str) -> Self {
        let item = format!("{}/{}", base, user.id);
        let links = BTreeMap::from([
            ("self".to_string(), Link { href: item.clone() }),
            ("update".to_string(), Link { href: item.clone() }),
            ("delete".to_string(), Link { href: item }),
            ("users".to_string(), Link { href: base.to_string() }),
            (
                "by-email".to_string(),
                Link {
                    href: format!("{}/email/{}", base, urlencoding::encode(&user.email)),
                },
            ),
        ]);
        Self { user, links }
    }
}
