use std::path::PathBuf;

pub const DATABASE_URL_VAR: &str = "STUDYDECK_DATABASE_URL";
pub const DATA_DIR_VAR: &str = "STUDYDECK_DATA_DIR";

const APP_DIR_NAME: &str = "studydeck";

/// Startup configuration. A database URL selects the SQLite backend; without
/// one everything goes to the local fallback store under `data_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(DATABASE_URL_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Self {
            database_url,
            data_dir,
        }
    }

    /// Filesystem path (or `:memory:`) of the configured database.
    pub fn database_path(&self) -> Option<String> {
        self.database_url.as_deref().map(|url| {
            url.strip_prefix("sqlite://")
                .or_else(|| url.strip_prefix("sqlite:"))
                .unwrap_or(url)
                .to_string()
        })
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn no_database_url_means_fallback() {
        let config = config_from(&[]);
        assert!(config.database_url.is_none());
        assert!(config.database_path().is_none());
    }

    #[test]
    fn empty_database_url_counts_as_absent() {
        let config = config_from(&[(DATABASE_URL_VAR, "  ")]);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn database_url_prefix_is_stripped() {
        let config = config_from(&[(DATABASE_URL_VAR, "sqlite:///tmp/decks.db")]);
        assert_eq!(config.database_path().as_deref(), Some("/tmp/decks.db"));

        let config = config_from(&[(DATABASE_URL_VAR, "sqlite::memory:")]);
        assert_eq!(config.database_path().as_deref(), Some(":memory:"));
    }

    #[test]
    fn plain_path_is_kept() {
        let config = config_from(&[(DATABASE_URL_VAR, "decks.db")]);
        assert_eq!(config.database_path().as_deref(), Some("decks.db"));
    }

    #[test]
    fn data_dir_override() {
        let config = config_from(&[(DATA_DIR_VAR, "/tmp/studydeck-test")]);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/studydeck-test"));
    }

    #[test]
    fn default_data_dir_ends_with_app_name() {
        let config = config_from(&[]);
        assert!(config.data_dir.ends_with("studydeck"));
    }
}
