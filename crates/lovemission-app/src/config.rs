use std::path::PathBuf;

use clap::Args;
use lovemission_store::StoreConfig;

/// Connection and storage settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// Backend project URL.
    #[arg(
        long,
        global = true,
        env = "LOVEMISSION_SUPABASE_URL",
        default_value = "http://127.0.0.1:54321"
    )]
    pub supabase_url: String,

    /// Public (anon) API key of the backend project.
    #[arg(long, global = true, env = "LOVEMISSION_SUPABASE_ANON_KEY", default_value = "")]
    pub anon_key: String,

    /// Directory for the login marker and saved session.
    #[arg(long, global = true, env = "LOVEMISSION_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Run against a seeded in-memory backend instead of the network.
    #[arg(long, global = true, env = "LOVEMISSION_OFFLINE")]
    pub offline: bool,

    /// Seconds a cached read stays fresh.
    #[arg(long, global = true, default_value_t = 300)]
    pub cache_ttl: u64,

    /// Push token to register after sign-in.
    #[arg(long, global = true, env = "LOVEMISSION_PUSH_TOKEN")]
    pub push_token: Option<String>,
}

impl AppConfig {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            local_data_dir: self.data_dir.clone(),
            ephemeral: false,
        }
    }
}
