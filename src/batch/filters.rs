use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Failure to load the filter list
#[derive(Debug, Error)]
pub enum FilterListError {
    #[error("Failed to read filter list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Search values issued once per batch, one per line in the source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterList {
    values: Vec<String>,
}

impl FilterList {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Parse line-oriented contents, trimming each line and skipping blanks
    pub fn parse(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Load the list from `path`; a missing file is an error, never an empty list
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FilterListError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FilterListError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let list = Self::parse(&contents);
        info!(path = %path.display(), count = list.len(), "Loaded filter list");
        Ok(list)
    }

    /// Warn when the list size differs from what the dataset should contain
    pub fn check_expected_count(&self, expected: Option<usize>) -> bool {
        match expected {
            Some(expected) if expected != self.len() => {
                warn!(expected, actual = self.len(), "Filter list size differs from expected count");
                false
            }
            _ => true,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.values
    }
}

impl<S: Into<String>> FromIterator<S> for FilterList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_trims_and_skips_blank_lines() {
        let list = FilterList::parse("SMITH\n  JONES \r\n\nBROWN\n\n");
        assert_eq!(list.as_slice(), &["SMITH", "JONES", "BROWN"]);
    }

    #[tokio::test]
    async fn test_load_reads_one_value_per_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "SMITH\nJOHNSON\nWILLIAMS").unwrap();

        let list = FilterList::load(file.path()).await.unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["SMITH", "JOHNSON", "WILLIAMS"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("family_names.txt");

        let err = FilterList::load(&missing).await.unwrap_err();
        let FilterListError::Io { path, source } = err;
        assert_eq!(path, missing);
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_expected_count_check() {
        let list: FilterList = ["SMITH", "JONES"].into_iter().collect();
        assert!(list.check_expected_count(None));
        assert!(list.check_expected_count(Some(2)));
        assert!(!list.check_expected_count(Some(20)));
    }
}
