use anyhow::Result;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const REDIRECT_FILE: &str = ".herdbook_redirect";

/// FileConnection manages the data directory and the per-farm directories
/// inside it
///
/// ```text
/// data/
/// ├── global_config.yaml
/// └── {farm}/
///     ├── breeding_records.yaml
///     └── animals.csv
/// ```
#[derive(Clone, Debug)]
pub struct FileConnection {
    base_directory: PathBuf,
}

impl FileConnection {
    /// Create a new connection rooted at `base_directory`, creating it if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Open `directory`, following a redirect file inside it if one exists
    pub fn open_with_redirect<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let redirect_file = directory.join(REDIRECT_FILE);

        let actual_data_dir = if redirect_file.exists() {
            match fs::read_to_string(&redirect_file) {
                Ok(redirected_path) => {
                    let redirected_path = redirected_path.trim();
                    let path = PathBuf::from(redirected_path);

                    if path.exists() {
                        info!("Found redirect file, using data directory: {}", path.display());
                        path
                    } else {
                        warn!("Redirect file points to non-existent directory: {}. Using default.", redirected_path);
                        directory
                    }
                }
                Err(e) => {
                    error!("Failed to read redirect file: {}. Using default directory.", e);
                    directory
                }
            }
        } else {
            info!("No redirect file found, using data directory: {}", directory.display());
            directory
        };

        Self::new(actual_data_dir)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Directory holding one farm's files
    pub fn farm_directory(&self, farm_id: &str) -> PathBuf {
        self.base_directory.join(Self::safe_directory_name(farm_id))
    }

    pub fn ensure_farm_directory(&self, farm_id: &str) -> Result<PathBuf> {
        let farm_dir = self.farm_directory(farm_id);
        if !farm_dir.exists() {
            fs::create_dir_all(&farm_dir)?;
        }
        Ok(farm_dir)
    }

    /// Every farm directory currently on disk
    pub fn farm_directories(&self) -> Result<Vec<PathBuf>> {
        let mut directories = Vec::new();
        for entry in fs::read_dir(&self.base_directory)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                directories.push(entry.path());
            }
        }
        directories.sort();
        Ok(directories)
    }

    /// Write through a temp file and rename so readers never see a partial file
    pub fn write_atomically(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Farm ids become directory names; anything outside `[A-Za-z0-9_-]` is replaced
    pub fn safe_directory_name(farm_id: &str) -> String {
        let name: String = farm_id
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();

        if name.is_empty() {
            "farm".to_string()
        } else {
            name
        }
    }
}
