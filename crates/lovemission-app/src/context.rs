use std::sync::Arc;
use std::time::Duration;

use lovemission_core::mission::{CreateScheduledMission, MissionType};
use lovemission_core::task::{AssignedTo, CreateTask};
use lovemission_service::{AuthSession, CachedService, HttpService, LoveService, MemoryService};
use lovemission_store::{create_store, KeyValueStore};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::push::{NoPush, PushRegistrar, StaticPush};
use crate::theme::ThemeState;

/// Store key holding the serialized backend session between runs.
pub const SESSION_KEY: &str = "session.json";

/// Credentials of the seeded offline couple.
pub const DEMO_PASSWORD: &str = "love";
pub const DEMO_EMAILS: [&str; 2] = ["a@lovemission.test", "b@lovemission.test"];

/// Everything a screen needs, built once at the application root.
///
/// Cloning is cheap: every field is shared.
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<dyn LoveService>,
    pub store: Arc<dyn KeyValueStore>,
    pub theme: ThemeState,
    pub push: Arc<dyn PushRegistrar>,
    remote: Option<Arc<CachedService<HttpService>>>,
}

impl AppContext {
    pub fn new(service: Arc<dyn LoveService>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            service,
            store,
            theme: ThemeState::new(),
            push: Arc::new(NoPush),
            remote: None,
        }
    }

    pub fn with_push(mut self, push: Arc<dyn PushRegistrar>) -> Self {
        self.push = push;
        self
    }

    /// Wire up storage and the backend from configuration. Online runs
    /// resume the session saved by a previous run, if any.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let store = create_store(&config.store_config());
        let ttl = Duration::from_secs(config.cache_ttl);

        let mut ctx = if config.offline {
            info!("using seeded in-memory backend");
            let svc = CachedService::with_ttl(seeded_backend().await?, ttl);
            Self::new(Arc::new(svc), store)
        } else {
            let http = match load_session(store.as_ref()).await {
                Some(session) => {
                    debug!(email = %session.email, "resuming saved session");
                    HttpService::with_session(&config.supabase_url, &config.anon_key, session)
                }
                None => HttpService::new(&config.supabase_url, &config.anon_key),
            };
            let remote = Arc::new(CachedService::with_ttl(http, ttl));
            let mut ctx = Self::new(remote.clone(), store);
            ctx.remote = Some(remote);
            ctx
        };

        if let Some(token) = config.push_token.clone() {
            ctx = ctx.with_push(Arc::new(StaticPush(token)));
        }
        Ok(ctx)
    }

    /// Write back the live backend session, which may have been refreshed
    /// during this run.
    pub async fn persist_session(&self) -> Result<(), AppError> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };
        if let Some(session) = remote.inner().session().await {
            self.store
                .set(SESSION_KEY, &serde_json::to_string(&session)?)
                .await?;
        }
        Ok(())
    }
}

async fn load_session(store: &dyn KeyValueStore) -> Option<AuthSession> {
    let raw = match store.get(SESSION_KEY).await {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("reading saved session: {e}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!("discarding unreadable saved session: {e}");
            None
        }
    }
}

/// An in-memory backend holding a linked couple and a few rows, so the
/// offline CLI has something to show.
pub async fn seeded_backend() -> Result<MemoryService, AppError> {
    let svc = MemoryService::new();
    let a = svc
        .add_user(DEMO_EMAILS[0], DEMO_PASSWORD, Some("Dana"))
        .await;
    let b = svc
        .add_user(DEMO_EMAILS[1], DEMO_PASSWORD, Some("Robin"))
        .await;
    svc.link_partners(a.id, b.id).await?;

    let seed = [
        ("Buy flowers", Some("2024-06-01"), AssignedTo::Me, a.id),
        ("Plan weekend trip", Some("2024-06-08"), AssignedTo::Both, a.id),
        ("Fix the bike", None, AssignedTo::Partner, b.id),
    ];
    for (title, due, assigned_to, created_by) in seed {
        svc.create_task(&CreateTask {
            title: title.to_string(),
            description: None,
            due_date: due.map(String::from),
            assigned_to,
            created_by,
        })
        .await?;
    }

    for (title, kind, owner_id) in [
        ("Morning hug", MissionType::Daily, b.id),
        ("Surprise dinner", MissionType::Special, b.id),
        ("Call me back", MissionType::Emergency, a.id),
    ] {
        svc.create_mission(&CreateScheduledMission {
            title: title.to_string(),
            kind,
            owner_id,
        })
        .await?;
    }
    Ok(svc)
}
