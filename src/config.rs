//! Linker configuration
//!
//! ```yaml
//! registry: build/api.registry
//! version_file: build/impl.version   # or impl_version: "21.0.4-b509"
//! short_form_prefix: com.jetbrains.
//! lock_retry_ms: 10
//! classpath:
//!   - "deps/**/*.yaml"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::LinkError;
use crate::registry::{check_version, DEFAULT_LOCK_RETRY};
use crate::scanner::DEFAULT_SHORT_FORM_PREFIX;

/// Raw configuration, as read from YAML and command-line overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkerConfig {
    pub registry: Option<PathBuf>,
    pub impl_version: Option<String>,
    pub version_file: Option<PathBuf>,
    pub short_form_prefix: Option<String>,
    pub lock_retry_ms: Option<u64>,
    #[serde(default)]
    pub classpath: Vec<String>,
}

/// Validated settings for one pass
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub registry: PathBuf,
    /// Written as the `VERSION` header
    pub impl_version: String,
    pub short_form_prefix: String,
    pub lock_retry: Duration,
}

impl LinkSettings {
    pub fn new(registry: impl Into<PathBuf>, impl_version: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            impl_version: impl_version.into(),
            short_form_prefix: DEFAULT_SHORT_FORM_PREFIX.to_string(),
            lock_retry: DEFAULT_LOCK_RETRY,
        }
    }
}

impl LinkerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, LinkError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, LinkError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Fields set in `overrides` replace ours; classpath patterns accumulate
    pub fn merged(mut self, overrides: LinkerConfig) -> Self {
        self.registry = overrides.registry.or(self.registry);
        self.impl_version = overrides.impl_version.or(self.impl_version);
        self.version_file = overrides.version_file.or(self.version_file);
        self.short_form_prefix = overrides.short_form_prefix.or(self.short_form_prefix);
        self.lock_retry_ms = overrides.lock_retry_ms.or(self.lock_retry_ms);
        self.classpath.extend(overrides.classpath);
        self
    }

    /// Check required fields and read the version file if one is named
    pub fn resolve(&self) -> Result<LinkSettings, LinkError> {
        let registry = self.registry.clone().ok_or_else(|| LinkError::InvalidConfig {
            details: "no registry path".into(),
        })?;

        let impl_version = match (&self.impl_version, &self.version_file) {
            (Some(version), _) => version.trim().to_string(),
            (None, Some(path)) => std::fs::read_to_string(path)?.trim().to_string(),
            (None, None) => {
                return Err(LinkError::InvalidConfig {
                    details: "no implementation version".into(),
                })
            }
        };
        check_version(&impl_version)?;

        if self.lock_retry_ms == Some(0) {
            return Err(LinkError::InvalidConfig {
                details: "lock_retry_ms must be at least 1".into(),
            });
        }

        let short_form_prefix = self
            .short_form_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_SHORT_FORM_PREFIX.to_string());

        Ok(LinkSettings {
            registry,
            impl_version,
            short_form_prefix,
            lock_retry: self
                .lock_retry_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_LOCK_RETRY),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_fill_optional_settings() {
        let config = LinkerConfig::from_yaml("registry: out/api.registry\nimpl_version: \" 17.0.9 \"").unwrap();
        let settings = config.resolve().unwrap();

        assert_eq!(settings.registry, PathBuf::from("out/api.registry"));
        assert_eq!(settings.impl_version, "17.0.9");
        assert_eq!(settings.short_form_prefix, "com.jetbrains.");
        assert_eq!(settings.lock_retry, Duration::from_millis(10));
    }

    #[test]
    fn version_file_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let version = dir.path().join("impl.version");
        std::fs::write(&version, "21.0.4-b509\n").unwrap();

        let config = LinkerConfig {
            registry: Some(dir.path().join("api.registry")),
            version_file: Some(version),
            ..Default::default()
        };
        assert_eq!(config.resolve().unwrap().impl_version, "21.0.4-b509");
    }

    #[test]
    fn overrides_replace_set_fields_only() {
        let base = LinkerConfig::from_yaml(
            "registry: a.registry\nimpl_version: '1'\nlock_retry_ms: 50\nclasspath: ['deps/*.yaml']",
        )
        .unwrap();
        let overrides = LinkerConfig {
            impl_version: Some("2".into()),
            classpath: vec!["more/*.yaml".into()],
            ..Default::default()
        };

        let merged = base.merged(overrides);
        assert_eq!(merged.registry, Some(PathBuf::from("a.registry")));
        assert_eq!(merged.impl_version.as_deref(), Some("2"));
        assert_eq!(merged.lock_retry_ms, Some(50));
        assert_eq!(merged.classpath, ["deps/*.yaml", "more/*.yaml"]);
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let err = LinkerConfig::default().resolve().unwrap_err();
        assert!(err.to_string().contains("LINK-040"));

        let err = LinkerConfig::from_yaml("registry: a.registry").unwrap().resolve().unwrap_err();
        assert!(err.to_string().contains("no implementation version"));

        let err = LinkerConfig::from_yaml("registry: a.registry\nimpl_version: '  '")
            .unwrap()
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("single non-empty line"));
    }

    #[test]
    fn zero_lock_retry_is_rejected() {
        let err = LinkerConfig::from_yaml("registry: a.registry\nimpl_version: '1'\nlock_retry_ms: 0")
            .unwrap()
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("lock_retry_ms must be at least 1"), "{err}");
    }

    #[test]
    fn multi_line_version_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let version = dir.path().join("impl.version");
        std::fs::write(&version, "21.0.4\nb509\n").unwrap();

        let config = LinkerConfig {
            registry: Some(dir.path().join("api.registry")),
            version_file: Some(version),
            ..Default::default()
        };
        let err = config.resolve().unwrap_err();
        assert!(matches!(err, LinkError::InvalidVersion { .. }), "{err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(LinkerConfig::from_yaml("registry: a\nregistery: b").is_err());
    }
}
