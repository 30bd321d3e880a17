//! user preferences: blocked content, proxying, privacy, debug output
use {
    crate::{
        error::*,
        store::{PersistedStore, StateStorage},
    },
    serde::{Deserialize, Serialize},
    smart_default::SmartDefault,
    std::sync::Arc,
    tracing::{debug, info},
};

/// the name preferences are persisted under
pub const PREFERENCES_STORAGE: &str = "preferences-storage";

/// a named blocked-content entry offered to users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedPreset {
    /// what the preset is called
    pub label: &'static str,
    /// the space separated tokens it blocks
    pub value: &'static str,
}

/// the blocked-content presets
pub const BLOCKED_CONTENT_PRESETS: &[BlockedPreset] = &[
    BlockedPreset {
        label: "AI Generated",
        value: "ai_generated",
    },
    BlockedPreset {
        label: "Futanari",
        value: "futanari",
    },
    BlockedPreset {
        label: "Gore",
        value: "gore",
    },
    BlockedPreset {
        label: "Scat",
        value: "scat",
    },
    BlockedPreset {
        label: "Animal-Related",
        value: "zoophilia zoo canine* equine* feral_* *_feral bestiality* zoophilia* animal",
    },
];

/// find a preset by label or value, ignoring case
pub fn find_preset(name: &str) -> Option<&'static BlockedPreset> {
    let name = name.trim();

    BLOCKED_CONTENT_PRESETS
        .iter()
        .find(|p| p.label.eq_ignore_ascii_case(name) || p.value.eq_ignore_ascii_case(name))
}

/// persisted user preferences
#[derive(Serialize, Deserialize, Clone, Debug, SmartDefault, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// entries excluded from every search, each may hold several space separated tokens
    pub blocked_content: Vec<String>,
    /// show diagnostic output
    pub debug: bool,
    /// rewrite media urls through the relay's proxy
    #[default(true)]
    pub use_proxy: bool,
    /// hide media when showing results
    pub privacy_mode: bool,
    /// the content warning has been acknowledged
    pub saw_warning: bool,
}

/// the preferences store
pub type PreferencesStore = PersistedStore<Preferences>;

impl PersistedStore<Preferences> {
    /// load the preferences from storage
    pub fn open(storage: Arc<dyn StateStorage>) -> Result<Self> {
        Self::load(PREFERENCES_STORAGE, storage)
    }

    /// add a blocked-content entry. returns false if it was already blocked
    pub fn add_blocked_content(&mut self, entry: &str) -> Result<bool> {
        let entry = entry.trim();
        if entry.is_empty() || self.state().blocked_content.iter().any(|b| b == entry) {
            debug!(entry, "not adding blocked content");
            return Ok(false);
        }

        self.update(|p| p.blocked_content.push(entry.to_string()))?;
        info!(entry, "blocked content added");
        Ok(true)
    }

    /// remove a blocked-content entry. returns false if it wasn't blocked
    pub fn remove_blocked_content(&mut self, entry: &str) -> Result<bool> {
        let entry = entry.trim();
        if !self.state().blocked_content.iter().any(|b| b == entry) {
            return Ok(false);
        }

        self.update(|p| p.blocked_content.retain(|b| b != entry))?;
        info!(entry, "blocked content removed");
        Ok(true)
    }

    /// toggle diagnostic output
    pub fn set_debug(&mut self, enabled: bool) -> Result<()> {
        self.update(|p| p.debug = enabled)
    }

    /// toggle media proxying
    pub fn set_use_proxy(&mut self, enabled: bool) -> Result<()> {
        self.update(|p| p.use_proxy = enabled)
    }

    /// toggle privacy mode
    pub fn set_privacy_mode(&mut self, enabled: bool) -> Result<()> {
        self.update(|p| p.privacy_mode = enabled)
    }

    /// record that the content warning was acknowledged
    pub fn set_saw_warning(&mut self, saw: bool) -> Result<()> {
        self.update(|p| p.saw_warning = saw)
    }
}
