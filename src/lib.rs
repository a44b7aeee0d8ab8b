use std::sync::Arc;

use config::Config;
use session::DeviceSessions;

pub mod backend;
pub mod clock;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod honeypot;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod routes;
pub mod session;
pub mod storage;
pub mod submission;
pub mod utils;
pub mod voting;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<DeviceSessions>,
}
