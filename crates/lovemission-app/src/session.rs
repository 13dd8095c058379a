//! Auto-login resolution and the sign-in / sign-out sequences.

use lovemission_core::session::{route_for, Destination, LOGIN_MARKER_KEY};
use lovemission_core::user::User;
use tracing::{error, info, warn};

use crate::context::{AppContext, SESSION_KEY};
use crate::error::AppError;

/// Where the app should start, and the user it resolved on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub destination: Destination,
    pub user: Option<User>,
}

impl Resolution {
    fn signed_out() -> Self {
        Self {
            destination: Destination::SignIn,
            user: None,
        }
    }
}

pub struct SessionManager {
    ctx: AppContext,
}

impl SessionManager {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Decide the start destination from the persisted login marker.
    ///
    /// A missing marker and a failed user lookup both send the user to
    /// sign-in; there is no retry.
    pub async fn resolve(&self) -> Resolution {
        let email = match self.ctx.store.get(LOGIN_MARKER_KEY).await {
            Ok(Some(email)) if !email.trim().is_empty() => email,
            Ok(_) => return Resolution::signed_out(),
            Err(e) => {
                warn!("reading login marker: {e}");
                return Resolution::signed_out();
            }
        };

        match self.ctx.service.get_user_by_email(&email).await {
            Ok(user) => Resolution {
                destination: route_for(Some(&user)),
                user: Some(user),
            },
            Err(e) => {
                warn!(%email, "resolving signed-in user: {e}");
                Resolution::signed_out()
            }
        }
    }

    /// Authenticate, persist the login marker and register for push.
    /// Returns `None` on any failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Option<User> {
        match self.try_sign_in(email, password).await {
            Ok(user) => {
                info!(user_id = user.id, "signed in");
                Some(user)
            }
            Err(e) => {
                error!(%email, "sign in failed: {e}");
                None
            }
        }
    }

    async fn try_sign_in(&self, email: &str, password: &str) -> Result<User, AppError> {
        let session = self.ctx.service.sign_in(email, password).await?;
        let mut user = self.ctx.service.get_user_by_email(email).await?;

        self.ctx.store.set(LOGIN_MARKER_KEY, email).await?;
        self.ctx
            .store
            .set(SESSION_KEY, &serde_json::to_string(&session)?)
            .await?;

        if let Some(token) = self.ctx.push.register().await {
            self.ctx
                .service
                .update_push_token(user.id, Some(&token))
                .await?;
            user.push_token = Some(token);
        }
        Ok(user)
    }

    /// Clear the marker, the push token and the backend session. Every step
    /// is attempted; the first error is returned.
    pub async fn sign_out(&self, user_id: i64) -> Result<(), AppError> {
        let mut first: Option<AppError> = None;

        for key in [LOGIN_MARKER_KEY, SESSION_KEY] {
            if let Err(e) = self.ctx.store.remove(key).await {
                warn!(key, "clearing stored value: {e}");
                first.get_or_insert(e.into());
            }
        }
        if let Err(e) = self.ctx.service.update_push_token(user_id, None).await {
            warn!(user_id, "clearing push token: {e}");
            first.get_or_insert(e.into());
        }
        if let Err(e) = self.ctx.service.sign_out().await {
            warn!("backend sign out: {e}");
            first.get_or_insert(e.into());
        }

        match first {
            Some(e) => Err(e),
            None => {
                info!(user_id, "signed out");
                Ok(())
            }
        }
    }
}
