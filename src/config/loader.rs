//! Configuration loading from disk.
//!
//! # Responsibilities
//! - Resolve the config path (env var, CLI argument, default)
//! - Parse the base YAML file
//! - Discover module files under `modules_dir` and aggregate them
//! - Deduplicate modules by name (first occurrence wins)

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{GatewayConfig, ModuleConfig};

/// Environment variable overriding the config path.
pub const CONFIG_ENV_VAR: &str = "GATEWAY_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found under '{0}'")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Resolve the configuration file path.
///
/// Precedence: `GATEWAY_CONFIG` env var, then the CLI argument, then
/// `gateway.yml`. A missing `.yml`/`.yaml` extension is appended.
pub fn resolve_config_path(cli: Option<PathBuf>) -> PathBuf {
    let mut path = std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .or(cli)
        .unwrap_or_else(|| PathBuf::from("gateway.yml"));

    let has_yaml_ext = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    );
    if !has_yaml_ext {
        path.set_extension("yml");
    }
    path
}

/// Load the base configuration and aggregate discovered modules.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let mut config: GatewayConfig = parse_yaml(path)?;

    if let Some(dir) = config.modules_dir.clone() {
        for file in module_files(Path::new(&dir))? {
            let module: ModuleConfig = parse_yaml(&file)?;
            config.modules.push(module);
        }
    }

    config.modules = dedupe_modules(config.modules);
    Ok(config)
}

fn parse_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// List module files under `dir` in sorted order for deterministic loading.
fn module_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yml") | Some("yaml")
            )
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Deduplicate modules by name, keeping the first occurrence.
///
/// The base file loads before discovered directories, so inline modules win
/// over same-named discovered ones.
fn dedupe_modules(modules: Vec<ModuleConfig>) -> Vec<ModuleConfig> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(modules.len());
    for module in modules {
        if seen.insert(module.name.clone()) {
            unique.push(module);
        } else {
            tracing::warn!(module = %module.name, "Duplicate module ignored");
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn module(name: &str) -> ModuleConfig {
        ModuleConfig {
            name: name.to_string(),
            path: String::new(),
            routes: Vec::new(),
            retries: None,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let mut billing = module("billing");
        billing.path = "/billing".into();
        let mut shadow = module("billing");
        shadow.path = "/shadow".into();

        let unique = dedupe_modules(vec![billing, module("users"), shadow]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name, "billing");
        assert_eq!(unique[0].path, "/billing");
        assert_eq!(unique[1].name, "users");
    }

    #[test]
    fn test_resolve_path_appends_extension() {
        let path = resolve_config_path(Some(PathBuf::from("custom")));
        assert_eq!(path, PathBuf::from("custom.yml"));

        let path = resolve_config_path(Some(PathBuf::from("custom.yaml")));
        assert_eq!(path, PathBuf::from("custom.yaml"));

        let path = resolve_config_path(None);
        assert_eq!(path, PathBuf::from("gateway.yml"));
    }

    #[test]
    fn test_route_config_minimal_yaml() {
        let route: RouteConfig = serde_yaml::from_str(
            "upstream: /users/{id}\ndownstream: http://localhost:5001/users/{id}\n",
        )
        .unwrap();
        assert_eq!(route.method, "");
        assert!(route.claims.is_empty());
        assert!(route.schema.is_none());
        assert!(route.retries.is_none());
    }

    #[test]
    fn test_module_yaml_with_defaults() {
        let module: ModuleConfig = serde_yaml::from_str(
            r#"
name: users
path: /api
retries:
  retries: 5
  interval: 0.5
  exponential: true
routes:
  - upstream: /users
    method: post
    downstream: http://localhost:5001/users
    claims:
      - users:write
"#,
        )
        .unwrap();
        assert_eq!(module.name, "users");
        assert_eq!(module.routes.len(), 1);
        let retries = module.retries.unwrap();
        assert_eq!(retries.retries, 5);
        assert!(retries.exponential);
        assert_eq!(module.routes[0].claims, vec!["users:write"]);
    }
}
