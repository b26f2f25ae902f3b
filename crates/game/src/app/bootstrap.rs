use engine::{LoopConfig, Scene};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::board::{BoardConfig, BoardScene};

const SEED_ENV_VAR: &str = "BOARD_SEED";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Board Sandbox Startup ===");

    let board = BoardConfig {
        seed: parse_seed(std::env::var(SEED_ENV_VAR).ok().as_deref()),
        ..BoardConfig::default()
    };
    let config = LoopConfig {
        window_title: "Board Sandbox".to_string(),
        ..LoopConfig::default()
    };

    AppWiring {
        config,
        scene: Box::new(BoardScene::new(board)),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_seed(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(seed) => Some(seed),
        Err(_) => {
            warn!(var = SEED_ENV_VAR, value = raw, "invalid_seed_ignored");
            None
        }
    }
}
