use std::sync::Arc;

use crate::core::config::EngineSettings;

/// Shared handle over the persistence gateway and engine settings.
///
/// Cloning is cheap; every service function takes `&Engine<G>`.
pub struct Engine<G> {
    inner: Arc<InnerEngine<G>>,
}

struct InnerEngine<G> {
    settings: EngineSettings,
    gateway: G,
}

impl<G> Engine<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_settings(gateway, EngineSettings::default())
    }

    pub fn with_settings(gateway: G, settings: EngineSettings) -> Self {
        Self { inner: Arc::new(InnerEngine { settings, gateway }) }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }
}

impl<G> Clone for Engine<G> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}
