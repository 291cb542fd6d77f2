use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::chat::composer::InputMetrics;

pub const SETTINGS_DIRECTORY_NAME: &str = "openvibe";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DEFAULT_WORKSPACE_NAME: &str = "OpenVibe";
pub const DEFAULT_LINE_HEIGHT: f32 = 20.0;
pub const DEFAULT_MAX_INPUT_HEIGHT: f32 = 200.0;
pub const DEFAULT_WRAP_COLUMNS: usize = 80;
pub const DEFAULT_SETTLE_WINDOW_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposerSettings {
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    #[serde(default = "default_max_height")]
    pub max_height: f32,
    #[serde(default = "default_wrap_columns")]
    pub wrap_columns: usize,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            line_height: default_line_height(),
            max_height: default_max_height(),
            wrap_columns: default_wrap_columns(),
        }
    }
}

impl ComposerSettings {
    pub fn metrics(&self) -> InputMetrics {
        InputMetrics {
            line_height: self.line_height,
            max_height: self.max_height,
            wrap_columns: self.wrap_columns,
        }
    }

    fn normalized(mut self) -> Self {
        if !self.line_height.is_finite() || self.line_height <= 0.0 {
            self.line_height = DEFAULT_LINE_HEIGHT;
        }
        if !self.max_height.is_finite() || self.max_height <= 0.0 {
            self.max_height = DEFAULT_MAX_INPUT_HEIGHT;
        }
        // A cap below one line would make the single-line baseline unreachable.
        self.max_height = self.max_height.max(self.line_height);
        if self.wrap_columns == 0 {
            self.wrap_columns = DEFAULT_WRAP_COLUMNS;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_settle_window_ms")]
    pub settle_window_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            settle_window_ms: default_settle_window_ms(),
        }
    }
}

impl CacheSettings {
    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClientSettings {
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub workspace_name: Option<String>,
    #[serde(default)]
    pub composer: ComposerSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl ClientSettings {
    pub fn normalized(mut self) -> Self {
        self.workspace_id = normalize_optional(self.workspace_id);
        self.workspace_name = normalize_optional(self.workspace_name);
        self.composer = self.composer.normalized();
        self
    }
}

/// Current client settings plus the file they round-trip through.
///
/// Readers take cheap `Arc` snapshots; edits go through `update`, which
/// writes the file before publishing the new snapshot.
pub struct SettingsStore {
    current: ArcSwap<ClientSettings>,
    path: PathBuf,
}

impl SettingsStore {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_DIRECTORY_NAME)
            .join(SETTINGS_FILE_NAME)
    }

    pub fn open(path: PathBuf) -> Self {
        let settings = read_settings(&path);
        Self {
            current: ArcSwap::from_pointee(settings),
            path,
        }
    }

    /// Opens the per-user settings file.
    pub fn load() -> Self {
        Self::open(Self::default_path())
    }

    pub fn settings(&self) -> Arc<ClientSettings> {
        self.current.load_full()
    }

    /// Applies `edit` to a copy of the current settings, persists it, then publishes it.
    ///
    /// On error the previous snapshot stays current.
    pub fn update(
        &self,
        edit: impl FnOnce(&mut ClientSettings),
    ) -> Result<Arc<ClientSettings>, SettingsError> {
        let mut next = ClientSettings::clone(&self.current.load());
        edit(&mut next);
        let next = Arc::new(next.normalized());

        write_settings(&self.path, &next)?;
        self.current.store(Arc::clone(&next));
        Ok(next)
    }
}

fn read_settings(path: &Path) -> ClientSettings {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no settings file; using defaults");
        return ClientSettings::default();
    }

    Figment::from(Serialized::defaults(ClientSettings::default()))
        .merge(Json::file(path))
        .extract::<ClientSettings>()
        .map(ClientSettings::normalized)
        .unwrap_or_else(|error| {
            tracing::warn!(path = %path.display(), "unreadable settings, using defaults: {error}");
            ClientSettings::default()
        })
}

// Temp file plus rename, so a crash never leaves a half-written settings file.
fn write_settings(path: &Path, settings: &ClientSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context(CreateDirectorySnafu {
            stage: "create-settings-directory",
            path: parent.to_path_buf(),
        })?;
    }

    let content = serde_json::to_string_pretty(settings).context(EncodeSnafu {
        stage: "serialize-settings-json",
    })?;

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, content).context(WriteTempSnafu {
        stage: "write-temporary-settings-file",
        path: temp_path.clone(),
    })?;

    std::fs::rename(&temp_path, path).context(ReplaceSnafu {
        stage: "rename-temporary-settings-file",
        from: temp_path,
        to: path.to_path_buf(),
    })?;

    tracing::debug!(path = %path.display(), "settings saved");
    Ok(())
}

/// Failures while persisting settings. Loading never fails; it falls back to defaults.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot create settings directory {path:?} ({stage}): {source}"))]
    CreateDirectory {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot encode settings as json ({stage}): {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot write settings to {path:?} ({stage}): {source}"))]
    WriteTemp {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot move {from:?} over {to:?} ({stage}): {source}"))]
    Replace {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

impl SettingsError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::CreateDirectory { stage, .. }
            | Self::Encode { stage, .. }
            | Self::WriteTemp { stage, .. }
            | Self::Replace { stage, .. } => *stage,
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_line_height() -> f32 {
    DEFAULT_LINE_HEIGHT
}

fn default_max_height() -> f32 {
    DEFAULT_MAX_INPUT_HEIGHT
}

fn default_wrap_columns() -> usize {
    DEFAULT_WRAP_COLUMNS
}

fn default_settle_window_ms() -> u64 {
    DEFAULT_SETTLE_WINDOW_MS
}
