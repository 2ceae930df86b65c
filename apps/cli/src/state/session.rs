//! # Session
//!
//! The acting user for one CLI invocation. The identity provider is
//! external: the user id arrives as `--user`, and the admin flag is read
//! from `admin_flags`.

use serde::Serialize;
use tracing::debug;

use parknow_core::validation::validate_user_id;
use parknow_core::{CoreError, ValidationError};

use crate::error::ApiError;
use crate::state::AppState;

/// Only [`Session::resolve`] builds one, so `is_admin` always reflects the
/// stored flag at resolve time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    user_id: String,
    is_admin: bool,
}

/// Shown when no acting user was given on the command line.
pub const MISSING_USER_MESSAGE: &str =
    "Nenhum usuário informado. Use --user <id> ou defina PARKNOW_USER.";

impl Session {
    /// Validates `user_id` and looks up its admin flag.
    pub async fn resolve(state: &AppState, user_id: &str) -> Result<Self, ApiError> {
        let user_id = validate_user_id(user_id).map_err(|err| match err {
            ValidationError::UserRequired => ApiError::validation(MISSING_USER_MESSAGE),
            other => other.into(),
        })?;
        let is_admin = state.db().admins().is_admin(&user_id).await?;
        debug!(user_id = %user_id, is_admin, "Session resolved");

        Ok(Session { user_id, is_admin })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Session with a fixed admin flag, bypassing the store.
    #[cfg(test)]
    pub(crate) fn for_test(user_id: &str, is_admin: bool) -> Self {
        Session {
            user_id: user_id.to_string(),
            is_admin,
        }
    }

    /// Fails with `AdminRequired` unless the session is admin-flagged.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(CoreError::AdminRequired.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::Utc;

    #[tokio::test]
    async fn test_resolve_reads_admin_flag() {
        let state = AppState::in_memory().await.unwrap();
        state
            .db()
            .admins()
            .set_admin("boss", true, Utc::now())
            .await
            .unwrap();

        let admin = Session::resolve(&state, "boss").await.unwrap();
        assert!(admin.is_admin());
        assert!(admin.require_admin().is_ok());

        let user = Session::resolve(&state, " alice ").await.unwrap();
        assert_eq!(user.user_id(), "alice");
        assert!(!user.is_admin());
        assert_eq!(
            user.require_admin().unwrap_err().code,
            ErrorCode::AdminRequired
        );
    }

    #[tokio::test]
    async fn test_resolve_rejects_blank_user() {
        let state = AppState::in_memory().await.unwrap();
        let err = Session::resolve(&state, "   ").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, MISSING_USER_MESSAGE);

        let err = Session::resolve(&state, "").await.unwrap_err();
        assert_ne!(err.message, "Por favor, preencha todos os campos.");
    }

    #[tokio::test]
    async fn test_admin_flag_comes_from_store() {
        let state = AppState::in_memory().await.unwrap();
        let session = Session::resolve(&state, "mallory").await.unwrap();
        assert!(!session.is_admin());
        assert_eq!(
            session.require_admin().unwrap_err().code,
            ErrorCode::AdminRequired
        );

        state
            .db()
            .admins()
            .set_admin("mallory", true, Utc::now())
            .await
            .unwrap();
        // The flag is read at resolve time.
        assert!(!session.is_admin());
        assert!(Session::resolve(&state, "mallory").await.unwrap().is_admin());
    }
}
