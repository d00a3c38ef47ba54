//! Command implementations.

mod info;
mod recent;
mod recover;
mod run;
mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;
use config_loader::{ConfigLoader, StationConfig};
use tracing::{debug, info};

use crate::error::CliError;

pub use info::run_info;
pub use recent::run_recent;
pub use recover::run_recover;
pub use run::run_ingest;
pub use validate::run_validate;

/// Load the station configuration, or defaults when no path is given.
///
/// Missing or unparsable files map to exit status 1.
fn load_config(path: Option<&Path>) -> Result<StationConfig> {
    let Some(path) = path else {
        debug!("No configuration file given, using defaults");
        return Ok(StationConfig::default());
    };

    info!(config = %path.display(), "Loading configuration");

    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    let config = ConfigLoader::load_from_path(path)
        .map_err(|e| CliError::config_invalid(format!("{}: {e}", path.display())))?;
    Ok(config)
}

/// Apply a `--db` override.
fn override_db(config: &mut StationConfig, db: Option<&PathBuf>) {
    if let Some(db) = db {
        info!(path = %db.display(), "Overriding database path from CLI");
        config.storage.path = db.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_defaults_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("sensor_readings.db"));
    }

    #[test]
    fn test_load_config_missing_file_is_config_error() {
        let err = load_config(Some(Path::new("/nonexistent/station.toml"))).unwrap_err();
        assert_eq!(crate::error::exit_status(&err), 1);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[storage]\npath = \"station.db\"").unwrap();

        let mut config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("station.db"));

        override_db(&mut config, Some(&PathBuf::from("other.db")));
        assert_eq!(config.storage.path, PathBuf::from("other.db"));
    }
}
