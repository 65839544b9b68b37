use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::post::Author;
use super::validation::{ValidationErrors, not_blank};

/// User entity - represents a user in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with generated ID and timestamps.
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn as_author(&self) -> Author {
        Author {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Sign-up details, normalized before they are checked.
#[derive(Debug, Clone, Validate)]
pub struct Registration {
    #[validate(custom(function = "not_blank", message = "The name field is required."))]
    #[validate(length(max = 255, message = "The name may not be greater than 255 characters."))]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "The email field is required."))]
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "The password must be at least 8 characters."))]
    pub password: String,
}

impl Registration {
    /// Trim the name and lowercase the email. The password is kept as typed.
    pub fn new(name: &str, email: &str, password: String) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            password,
        }
    }

    pub fn validated(self) -> Result<Self, ValidationErrors> {
        self.validate()?;
        Ok(self)
    }
}
