use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};

use super::coerce::value_as_id;
use crate::error::{AppError, AppResult};

/// `?action=` / `?id=` pair accepted by every write endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
    pub id: Option<String>,
}

impl ActionQuery {
    pub fn id(&self) -> Option<i64> {
        self.id.as_deref().and_then(|raw| value_as_id(&Value::String(raw.to_string())))
    }
}

/// POST verbs shared by categories, tasks, expenses and time entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    #[default]
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitAction {
    #[default]
    Create,
    Update,
    Delete,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthAction {
    Register,
    Login,
    Logout,
    Verify,
    DeleteAccount,
    ForgotPassword,
    VerifyResetCode,
    ResetPassword,
}

impl AuthAction {
    /// Actions exposed to credential guessing, hence rate limited.
    pub fn is_rate_limited(self) -> bool {
        matches!(
            self,
            AuthAction::Register
                | AuthAction::Login
                | AuthAction::ForgotPassword
                | AuthAction::VerifyResetCode
                | AuthAction::ResetPassword
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthAction::Register => "register",
            AuthAction::Login => "login",
            AuthAction::Logout => "logout",
            AuthAction::Verify => "verify",
            AuthAction::DeleteAccount => "delete_account",
            AuthAction::ForgotPassword => "forgot_password",
            AuthAction::VerifyResetCode => "verify_reset_code",
            AuthAction::ResetPassword => "reset_password",
        }
    }
}

/// Reads the discriminator from the query string, falling back to the body's
/// `action` field. Blank counts as absent; anything outside `A` is rejected.
pub fn parse_action<A: DeserializeOwned>(
    query: Option<&str>,
    body: Option<&Map<String, Value>>,
) -> AppResult<Option<A>> {
    let raw = query
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| {
            body.and_then(|b| b.get("action"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });

    match raw {
        None => Ok(None),
        Some(raw) => serde_json::from_value(Value::String(raw))
            .map(Some)
            .map_err(|_| AppError::BadRequest("Invalid action".into())),
    }
}

/// Like [`parse_action`] but an absent discriminator means `A::default()`.
pub fn resolve_action<A: DeserializeOwned + Default>(
    query: Option<&str>,
    body: Option<&Map<String, Value>>,
) -> AppResult<A> {
    parse_action(query, body).map(Option::unwrap_or_default)
}

/// Identifier for update/delete, taken from the query string first and then
/// the body's `id` field.
pub fn target_id(
    query_id: Option<i64>,
    body: Option<&Map<String, Value>>,
    resource: &str,
) -> AppResult<i64> {
    query_id
        .or_else(|| body.and_then(|b| b.get("id")).and_then(value_as_id))
        .ok_or_else(|| AppError::BadRequest(format!("{resource} ID required")))
}
