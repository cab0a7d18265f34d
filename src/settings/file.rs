//! TOML settings files.

use std::path::{Path, PathBuf};

use super::source::{SettingsEntry, SettingsSource};
use super::SettingsError;

/// A settings layer read from a TOML file.
///
/// A required file that does not exist is an error; a missing optional file
/// contributes nothing.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }
}

impl SettingsSource for FileSource {
    fn entries(&self) -> Result<Vec<SettingsEntry>, SettingsError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return if self.required {
                    Err(SettingsError::FileNotFound(self.path.clone()))
                } else {
                    Ok(Vec::new())
                };
            }
            Err(source) => {
                return Err(SettingsError::ReadError {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let table = toml::from_str(&contents).map_err(|source| SettingsError::ParseError {
            path: self.path.clone(),
            source,
        })?;
        Ok(vec![SettingsEntry::root(table)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_loads_table_at_root() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[context]\npath = \"beans.xml\"").unwrap();

        let entries = FileSource::new(file.path(), true).entries().unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.is_empty());
        assert_eq!(entries[0].value["context"]["path"].as_str(), Some("beans.xml"));
    }

    #[test]
    fn test_required_missing_file() {
        let result = FileSource::new("/nonexistent/factory.toml", true).entries();
        assert!(matches!(result, Err(SettingsError::FileNotFound(_))));
    }

    #[test]
    fn test_optional_missing_file() {
        let entries = FileSource::new("/nonexistent/factory.toml", false)
            .entries()
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[context").unwrap();

        let result = FileSource::new(file.path(), true).entries();
        assert!(matches!(result, Err(SettingsError::ParseError { .. })));
    }
}
