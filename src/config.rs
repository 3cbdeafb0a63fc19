// ============================================================================
// Paths
// ============================================================================

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Used when the platform reports no data directory.
const FALLBACK_DATA_DIR: &str = ".devis-pdf";
const STORE_DIR: &str = "forms";
const PROFILE_FILE: &str = "company.toml";

/// Where persisted forms and the company profile live.
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    /// Resolve the data directory: explicit override, then the platform's
    /// data directory, then a hidden directory under the current one.
    pub fn resolve(data_dir: Option<&Path>) -> Self {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => ProjectDirs::from("fr", "devis-pdf", "devis-pdf")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR)),
        };
        log::debug!("data directory: {}", data_dir.display());
        Paths { data_dir }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join(STORE_DIR)
    }

    pub fn profile_path(&self) -> PathBuf {
        self.data_dir.join(PROFILE_FILE)
    }
}

/// Output directory for generated files, defaulting to the current one.
pub fn output_dir(dir: Option<&Path>) -> PathBuf {
    dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_data_dir_wins() {
        let paths = Paths::resolve(Some(Path::new("/tmp/devis")));
        assert_eq!(paths.store_dir(), PathBuf::from("/tmp/devis/forms"));
        assert_eq!(paths.profile_path(), PathBuf::from("/tmp/devis/company.toml"));
    }

    #[test]
    fn test_default_data_dir_is_not_empty() {
        let paths = Paths::resolve(None);
        assert!(!paths.data_dir.as_os_str().is_empty());
    }

    #[test]
    fn test_output_dir_defaults_to_current() {
        assert_eq!(output_dir(None), PathBuf::from("."));
        assert_eq!(output_dir(Some(Path::new("out"))), PathBuf::from("out"));
    }
}
