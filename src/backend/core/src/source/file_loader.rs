//! YAML directory-scanning `ConfigSource`.
//!
//! Configured with an ordered list of directories and, per kind, a list of
//! glob patterns. Every matching file in every directory is parsed and
//! merged into a single mapping per kind; on a duplicate name, the file
//! visited later (directories in list order, files in directory-listing
//! order) overrides the earlier one and a warning is logged. Missing
//! directories are skipped. A malformed file aborts the load with the
//! file path and the parser's line/column in the error message.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::Pattern;
use serde::de::DeserializeOwned;
use serde_yaml::Value as YamlValue;

use crate::error::{GatewayError, Result};
use crate::model::{DatabaseConfig, EndpointConfig, QueryConfig};

use super::{ConfigSink, ConfigSource, UpsertOutcome};

pub struct FileLoader {
    directories: Vec<PathBuf>,
    database_patterns: Vec<String>,
    query_patterns: Vec<String>,
    endpoint_patterns: Vec<String>,
}

impl FileLoader {
    pub fn new(
        directories: Vec<PathBuf>,
        database_patterns: Vec<String>,
        query_patterns: Vec<String>,
        endpoint_patterns: Vec<String>,
    ) -> Self {
        Self {
            directories,
            database_patterns,
            query_patterns,
            endpoint_patterns,
        }
    }

    fn matching_files(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        let compiled: Vec<Pattern> = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    GatewayError::configuration(format!("invalid glob pattern {p}: {e}"))
                })
            })
            .collect::<Result<_>>()?;

        let mut files = Vec::new();
        for dir in &self.directories {
            if !dir.exists() {
                tracing::info!(dir = %dir.display(), "config directory does not exist, skipping");
                continue;
            }
            let mut entries: Vec<_> = std::fs::read_dir(dir)
                .map_err(|e| {
                    GatewayError::configuration(format!("reading {}: {e}", dir.display()))
                })?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            entries.sort();

            for path in entries {
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if compiled.iter().any(|pat| pat.matches(file_name)) {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }

    fn load_kind<T: DeserializeOwned>(
        &self,
        patterns: &[String],
        top_level_key: &str,
    ) -> Result<HashMap<String, T>> {
        let mut merged: HashMap<String, T> = HashMap::new();
        for path in self.matching_files(patterns)? {
            let entries = parse_kind_file::<T>(&path, top_level_key)?;
            for (name, cfg) in entries {
                if merged.contains_key(&name) {
                    tracing::warn!(
                        name = %name,
                        file = %path.display(),
                        "duplicate config name, overriding earlier definition"
                    );
                }
                merged.insert(name, cfg);
            }
        }
        Ok(merged)
    }

    /// All writes land in one merged file per kind under the first
    /// configured directory, regardless of how many files that kind was
    /// originally read from.
    fn upsert_into_kind<T: DeserializeOwned + serde::Serialize + Clone>(
        &self,
        top_level_key: &str,
        name: &str,
        cfg: &T,
    ) -> Result<UpsertOutcome> {
        let dir = self.directories.first().ok_or_else(|| {
            GatewayError::configuration("no config directory configured to write into")
        })?;
        std::fs::create_dir_all(dir)
            .map_err(|e| GatewayError::configuration(format!("creating {}: {e}", dir.display())))?;
        let path = dir.join(format!("migrated-{top_level_key}.yml"));

        let mut entries: HashMap<String, T> = if path.exists() {
            parse_kind_file(&path, top_level_key)?
        } else {
            HashMap::new()
        };
        let outcome = if entries.contains_key(name) {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        };
        entries.insert(name.to_string(), cfg.clone());

        let mut root = HashMap::new();
        root.insert(top_level_key.to_string(), entries);
        let serialized = serde_yaml::to_string(&root).map_err(|e| {
            GatewayError::internal(format!("serializing {}", path.display())).with_source(e)
        })?;
        std::fs::write(&path, serialized)
            .map_err(|e| GatewayError::configuration(format!("writing {}: {e}", path.display())))?;
        Ok(outcome)
    }
}

/// Parses one YAML file and extracts the `name -> entry` map under
/// `top_level_key`, if present. A file that matches a kind's glob pattern
/// but has no corresponding top-level key yields an empty map rather than
/// an error, so a single combined file matching multiple kinds' patterns
/// works the same as three separate files.
fn parse_kind_file<T: DeserializeOwned>(
    path: &Path,
    top_level_key: &str,
) -> Result<HashMap<String, T>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        GatewayError::configuration(format!("reading {}: {e}", path.display()))
    })?;

    let document: YamlValue = serde_yaml::from_str(&contents).map_err(|e| {
        GatewayError::configuration(format!("parsing {}: {e}", path.display()))
    })?;

    let YamlValue::Mapping(mapping) = document else {
        return Ok(HashMap::new());
    };

    let Some(section) = mapping.get(YamlValue::String(top_level_key.to_string())) else {
        return Ok(HashMap::new());
    };

    serde_yaml::from_value(section.clone())
        .map_err(|e| GatewayError::configuration(format!("parsing {}: {e}", path.display())))
}

#[async_trait]
impl ConfigSource for FileLoader {
    async fn load_databases(&self) -> Result<HashMap<String, DatabaseConfig>> {
        let mut map = self.load_kind::<DatabaseConfig>(&self.database_patterns, "databases")?;
        for (name, cfg) in map.iter_mut() {
            cfg.name = name.clone();
        }
        Ok(map)
    }

    async fn load_queries(&self) -> Result<HashMap<String, QueryConfig>> {
        let mut map = self.load_kind::<QueryConfig>(&self.query_patterns, "queries")?;
        for (name, cfg) in map.iter_mut() {
            cfg.name = name.clone();
        }
        Ok(map)
    }

    async fn load_endpoints(&self) -> Result<HashMap<String, EndpointConfig>> {
        let mut map = self.load_kind::<EndpointConfig>(&self.endpoint_patterns, "endpoints")?;
        for (name, cfg) in map.iter_mut() {
            cfg.name = name.clone();
        }
        Ok(map)
    }
}

#[async_trait]
impl ConfigSink for FileLoader {
    async fn upsert_database(&self, cfg: &DatabaseConfig) -> Result<UpsertOutcome> {
        self.upsert_into_kind("databases", &cfg.name, cfg)
    }

    async fn upsert_query(&self, cfg: &QueryConfig) -> Result<UpsertOutcome> {
        self.upsert_into_kind("queries", &cfg.name, cfg)
    }

    async fn upsert_endpoint(&self, cfg: &EndpointConfig) -> Result<UpsertOutcome> {
        self.upsert_into_kind("endpoints", &cfg.name, cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &Path, file: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(file)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn loads_one_database_query_endpoint() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "d1-database.yml",
            "databases:\n  d1:\n    url: \"postgres://localhost/d1\"\n",
        );
        write(
            tmp.path(),
            "q1-query.yml",
            "queries:\n  q1:\n    database: d1\n    sql: \"SELECT 1\"\n",
        );
        write(
            tmp.path(),
            "e1-endpoint.yml",
            "endpoints:\n  e1:\n    path: /x\n    query: q1\n",
        );

        let loader = FileLoader::new(
            vec![tmp.path().to_path_buf()],
            vec!["*-database.yml".into()],
            vec!["*-query.yml".into()],
            vec!["*-endpoint.yml".into()],
        );

        let set = loader.load_all().await.unwrap();
        assert_eq!(set.counts(), (1, 1, 1));
        assert_eq!(set.databases["d1"].name, "d1");
        assert_eq!(set.endpoints["e1"].query, "q1");
    }

    #[tokio::test]
    async fn missing_directory_yields_empty_map() {
        let loader = FileLoader::new(
            vec![PathBuf::from("/does/not/exist")],
            vec!["*-database.yml".into()],
            vec![],
            vec![],
        );
        let map = loader.load_databases().await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn later_file_overrides_earlier_on_duplicate_name() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "a-database.yml",
            "databases:\n  d1:\n    url: \"postgres://localhost/first\"\n",
        );
        write(
            tmp.path(),
            "b-database.yml",
            "databases:\n  d1:\n    url: \"postgres://localhost/second\"\n",
        );

        let loader = FileLoader::new(
            vec![tmp.path().to_path_buf()],
            vec!["*-database.yml".into()],
            vec![],
            vec![],
        );
        let map = loader.load_databases().await.unwrap();
        assert_eq!(map["d1"].url, "postgres://localhost/second");
    }

    #[tokio::test]
    async fn malformed_file_fails_load() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "bad-database.yml", "databases: [this, is, a, list]\n");

        let loader = FileLoader::new(
            vec![tmp.path().to_path_buf()],
            vec!["*-database.yml".into()],
            vec![],
            vec![],
        );
        assert!(loader.load_databases().await.is_err());
    }
}
