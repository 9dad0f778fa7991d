use sqlx::FromRow;
use uuid::Uuid;

/// Writable columns of the `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Name,
    Email,
    Password,
}

impl UserField {
    pub fn column(self) -> &'static str {
        match self {
            UserField::Name => "name",
            UserField::Email => "email",
            UserField::Password => "password",
        }
    }
}

/// Ordered set of column assignments for a partial user update.
///
/// Email and password values must already be hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    fields: Vec<(UserField, String)>,
}

impl UserChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `field`, replacing any earlier value for it.
    pub fn set(&mut self, field: UserField, value: String) -> &mut Self {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UserField, &str)> {
        self.fields.iter().map(|(f, v)| (*f, v.as_str()))
    }
}

/// Row used to authenticate a user by name.
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    pub id: Uuid,
    #[sqlx(rename = "password")]
    pub password_hash: String, // argon2 PHC string
}
