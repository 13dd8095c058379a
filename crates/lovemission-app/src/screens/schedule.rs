use lovemission_core::mission::{CreateScheduledMission, MissionType};
use lovemission_core::user::User;
use lovemission_core::views::{self, MissionBoard};
use tracing::{error, warn};

use crate::alert::{self, Alert};
use crate::context::AppContext;

/// Missions scheduled for the partner.
pub struct ScheduleScreen {
    ctx: AppContext,
    user: User,
    board: MissionBoard,
    partner_push_token: Option<String>,
    alert: Option<Alert>,
}

impl ScheduleScreen {
    pub fn new(ctx: AppContext, user: User) -> Self {
        Self {
            ctx,
            user,
            board: MissionBoard::default(),
            partner_push_token: None,
            alert: None,
        }
    }

    pub async fn on_focus(&mut self) {
        self.ctx.service.invalidate_reads();
        self.refresh().await;
    }

    async fn refresh(&mut self) {
        let Some(partner_id) = self.user.partner_id else {
            return;
        };
        let (missions, token) = tokio::join!(
            self.ctx.service.list_missions_for_owner(partner_id),
            self.ctx.service.partner_push_token(partner_id),
        );
        match missions {
            Ok(rows) => self.board = views::mission_board(&rows),
            Err(e) => warn!(partner_id, "loading missions: {e}"),
        }
        match token {
            Ok(t) => self.partner_push_token = t,
            Err(e) => warn!(partner_id, "loading partner push token: {e}"),
        }
    }

    /// Schedule a mission for the partner.
    pub async fn register(&mut self, title: &str, kind: MissionType) -> bool {
        let title = title.trim();
        let ok = match self.user.partner_id {
            Some(owner_id) if !title.is_empty() => {
                let input = CreateScheduledMission {
                    title: title.to_string(),
                    kind,
                    owner_id,
                };
                match self.ctx.service.create_mission(&input).await {
                    Ok(_) => true,
                    Err(e) => {
                        error!(%title, "scheduling mission: {e}");
                        false
                    }
                }
            }
            _ => false,
        };
        self.alert = Some(if ok {
            Alert::success(alert::MISSION_CREATED)
        } else {
            Alert::error(alert::MISSION_CREATE_FAILED)
        });
        self.refresh().await;
        ok
    }

    pub async fn complete(&mut self, mission_id: i64) -> bool {
        let result = self.ctx.service.complete_mission(mission_id).await;
        if let Err(e) = &result {
            error!(mission_id, "completing mission: {e}");
            self.alert = Some(Alert::error(alert::MISSION_COMPLETE_FAILED));
        }
        self.refresh().await;
        result.is_ok()
    }

    pub fn board(&self) -> &MissionBoard {
        &self.board
    }

    /// Whether the partner can be notified about new missions.
    pub fn partner_reachable(&self) -> bool {
        self.partner_push_token.is_some()
    }

    pub fn take_alert(&mut self) -> Option<Alert> {
        self.alert.take()
    }
}
