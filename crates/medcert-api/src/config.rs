use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use medcert_export::GeneratorOptions;

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

/// Database value selecting the in-memory store.
pub const MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    pub config_version: u32,
    pub bind: String,
    /// Root for the database and backups.
    pub data_dir: PathBuf,
    /// SQLite file, or `:memory:`. A relative path is taken from `data_dir`.
    pub database: String,
    /// Extra CORS origin for the deployed frontend.
    pub frontend_url: Option<String>,
    pub export: GeneratorOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            bind: "0.0.0.0:5000".to_string(),
            data_dir: PathBuf::from("data"),
            database: "medcert.db".to_string(),
            frontend_url: None,
            export: GeneratorOptions::default(),
        }
    }
}

impl ServiceConfig {
    /// Read the config file if there is one, then apply environment
    /// overrides.
    pub fn load() -> eyre::Result<Self> {
        let mut config = match config_path() {
            Some(path) if path.exists() => {
                let config = Self::from_file(&path)?;
                tracing::info!(path = %path.display(), "config loaded");
                config
            }
            _ => {
                tracing::info!("no config file, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> eyre::Result<Self> {
        // Parse as raw JSON so we can run migrations before deserializing.
        let json: serde_json::Value = serde_json::from_str(contents)?;
        let on_disk_version = json
            .get("config_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;

        let migrated = migrate(json, on_disk_version)?;
        Ok(serde_json::from_value(migrated)?)
    }

    /// Apply `MEDCERT_*` and `FRONTEND_URL` overrides through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(bind) = set("MEDCERT_BIND") {
            self.bind = bind;
        }
        if let Some(dir) = set("MEDCERT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
            self.export.output_dir = self.data_dir.join("generated_documents");
        }
        if let Some(template) = set("MEDCERT_TEMPLATE") {
            self.export.template = Some(PathBuf::from(template));
        }
        if let Some(logo) = set("MEDCERT_LOGO") {
            self.export.logo = Some(PathBuf::from(logo));
        }
        if let Some(db) = set("MEDCERT_DB") {
            self.database = db;
        }
        if let Some(url) = set("FRONTEND_URL") {
            self.frontend_url = Some(url);
        }
    }

    /// `None` for the in-memory store.
    pub fn database_path(&self) -> Option<PathBuf> {
        (self.database != MEMORY_DATABASE).then(|| self.resolve(Path::new(&self.database)))
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

/// `$MEDCERT_CONFIG`, else `<config dir>/medcert/config.json`.
fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("MEDCERT_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|base| base.join("medcert").join("config.json"))
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update medcert."
        ));
    }

    // v0 → v1: flat template/logo/output_dir keys move under `export`
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;

        let mut export = match obj.remove("export") {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        for key in ["template", "logo", "output_dir"] {
            if let Some(value) = obj.remove(key) {
                export.entry(key).or_insert(value);
            }
        }
        obj.insert("export".to_string(), serde_json::Value::Object(export));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (moved export settings)");
    }

    Ok(json)
}
