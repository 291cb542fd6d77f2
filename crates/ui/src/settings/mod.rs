/// Settings persistence for the client core.
pub mod state;

pub use state::{CacheSettings, ClientSettings, ComposerSettings, SettingsError, SettingsStore};
