//! Shared application state handed to every HTTP handler.

use std::sync::Arc;

use jetgate_bridge::{BridgeHandle, StatusCache};

use crate::config::Config;
use crate::detect::Detector;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub bridge: BridgeHandle,
    pub cache: StatusCache,
    pub detector: Arc<dyn Detector>,
}

impl AppState {
    pub fn new(
        config: Config,
        bridge: BridgeHandle,
        cache: StatusCache,
        detector: Arc<dyn Detector>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            bridge,
            cache,
            detector,
        }
    }
}
