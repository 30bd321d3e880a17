//! config singleton management stuff
use {
    crate::config::options::Base34,
    color_eyre::Result,
    std::sync::{LazyLock, RwLock, RwLockReadGuard},
    tracing::warn,
};

/// global config instance
static CONFIG: LazyLock<RwLock<Base34>> = LazyLock::new(|| {
    RwLock::new(Base34::load().unwrap_or_else(|e| {
        warn!("failed to load configuration, using defaults: {:#}", e);
        Base34::default()
    }))
});

/// get a ro ref to the config
pub fn config() -> Result<RwLockReadGuard<'static, Base34>> {
    CONFIG
        .read()
        .map_err(|e| color_eyre::eyre::eyre!("Configuration lock poisoned: {}", e))
}

/// get a specific config value with a default fallback
pub fn get_or_default<T, F>(getter: F, default: T) -> T
where
    F: FnOnce(&Base34) -> Option<T>,
    T: Clone,
{
    config()
        .ok()
        .and_then(|cfg| getter(&cfg))
        .unwrap_or(default)
}
