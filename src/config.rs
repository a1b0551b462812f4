use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::server::Timing;
use crate::store::{FileStore, KeyValueStore, MemoryStore};

#[derive(Debug, Clone, Parser)]
#[command(name = "health-sphere")]
#[command(about = "Patient no-show prediction front end (simulated model)", long_about = None)]
pub struct Config {
    #[arg(long, env = "HEALTH_SPHERE_HOST", default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, env = "HEALTH_SPHERE_PORT", default_value_t = 8080)]
    pub port: u16,
    /// Profile file holding all stored state. Kept in memory when omitted.
    #[arg(long, env = "HEALTH_SPHERE_STORE")]
    pub store: Option<PathBuf>,
    #[arg(long, env = "HEALTH_SPHERE_PREDICT_LATENCY_MS", default_value_t = 1500)]
    pub predict_latency_ms: u64,
    #[arg(long, env = "HEALTH_SPHERE_LOGIN_LATENCY_MS", default_value_t = 1000)]
    pub login_latency_ms: u64,
    #[arg(long, env = "HEALTH_SPHERE_REGISTER_LATENCY_MS", default_value_t = 800)]
    pub register_latency_ms: u64,
}

impl Config {
    pub fn timing(&self) -> Timing {
        Timing {
            predict: Duration::from_millis(self.predict_latency_ms),
            login: Duration::from_millis(self.login_latency_ms),
            register: Duration::from_millis(self.register_latency_ms),
        }
    }

    pub fn open_store(&self) -> Arc<dyn KeyValueStore> {
        match &self.store {
            Some(path) => {
                info!(path = %path.display(), "using file-backed profile store");
                Arc::new(FileStore::open(path))
            }
            None => {
                info!("using in-memory profile store, state is lost on exit");
                Arc::new(MemoryStore::new())
            }
        }
    }
}
