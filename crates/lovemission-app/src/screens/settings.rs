use lovemission_core::theme::ThemeMode;
use lovemission_core::user::{display_name, User};
use tracing::error;

use super::ME_PLACEHOLDER;
use crate::alert::{self, Alert};
use crate::context::AppContext;
use crate::error::AppError;
use crate::session::SessionManager;

/// Profile, appearance and sign-out.
pub struct SettingsScreen {
    ctx: AppContext,
    user: User,
    alert: Option<Alert>,
}

impl SettingsScreen {
    pub fn new(ctx: AppContext, user: User) -> Self {
        Self {
            ctx,
            user,
            alert: None,
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn nickname(&self) -> &str {
        display_name(Some(&self.user), ME_PLACEHOLDER)
    }

    pub async fn update_nickname(&mut self, nickname: &str) -> bool {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            self.alert = Some(Alert::error(alert::NICKNAME_EMPTY));
            return false;
        }
        match self.ctx.service.update_nickname(self.user.id, nickname).await {
            Ok(()) => {
                self.user.nickname = Some(nickname.to_string());
                self.alert = Some(Alert::success(alert::NICKNAME_UPDATED));
                true
            }
            Err(e) => {
                error!(user_id = self.user.id, "updating nickname: {e}");
                self.alert = Some(Alert::error(alert::NICKNAME_UPDATE_FAILED));
                false
            }
        }
    }

    pub fn theme_mode(&self) -> ThemeMode {
        self.ctx.theme.mode()
    }

    pub fn toggle_theme(&self) -> ThemeMode {
        self.ctx.theme.toggle()
    }

    pub async fn sign_out(self) -> Result<(), AppError> {
        SessionManager::new(self.ctx).sign_out(self.user.id).await
    }

    pub fn take_alert(&mut self) -> Option<Alert> {
        self.alert.take()
    }
}
