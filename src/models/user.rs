use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Public view of a user, as returned by login and verify.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfile {
    #[sqlx(rename = "id")]
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
        }
    }
}

/// Account section of the JSON export.
#[derive(Debug, Serialize, FromRow)]
pub struct ExportedUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: NaiveDateTime,
}
