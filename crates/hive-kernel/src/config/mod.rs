//! Configuration loading
//!
//! Multi-format loader (YAML, TOML, JSON, INI, RON, JSON5) used for agent and
//! workflow settings.
//!
//! - Format detection from the file extension
//! - Environment variable substitution (`${VAR}` and `$VAR` syntax)
//! - Layering of several sources, later ones overriding earlier ones
//!
//! Keys are matched case-insensitively by the underlying `config` crate, so
//! map keys coming from a file (for example workflow names) arrive lowercased.

use ::config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::OnceLock;

pub use ::config::FileFormat as Format;

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect configuration format from file extension
///
/// `.yaml`/`.yml`, `.toml`, `.json`, `.ini`, `.ron` and `.json5` are
/// recognized.
pub fn detect_format(path: impl AsRef<Path>) -> ConfigResult<FileFormat> {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

fn braced_var() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex"))
}

fn bare_var() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("static regex"))
}

/// Substitute environment variables in a string
///
/// `${VAR}` is replaced first, then `$VAR`. References to unset variables
/// are left untouched.
pub fn substitute_env_vars(content: &str) -> String {
    let replace = |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    };

    let braced = braced_var().replace_all(content, replace);
    bare_var().replace_all(&braced, replace).into_owned()
}

fn build<T>(builder: ::config::ConfigBuilder<::config::builder::DefaultState>) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    builder
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration from a file, detecting the format from its extension
pub fn load_config<T>(path: impl AsRef<Path>) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    from_str(&content, format)
}

/// Load configuration from a string with an explicit format
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let substituted = substitute_env_vars(content);
    build(Cfg::builder().add_source(File::from_str(&substituted, format)))
}

/// Merge several in-memory sources, later sources overriding earlier ones
pub fn merge_configs<T>(sources: &[(&str, FileFormat)]) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let mut builder = Cfg::builder();
    for (content, format) in sources {
        let substituted = substitute_env_vars(content);
        builder = builder.add_source(File::from_str(&substituted, *format));
    }
    build(builder)
}

/// Load a file and layer `PREFIX_SECTION__KEY` environment variables on top
pub fn load_with_env<T>(path: impl AsRef<Path>, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let substituted = substitute_env_vars(&content);

    build(
        Cfg::builder()
            .add_source(File::from_str(&substituted, format))
            .add_source(Environment::with_prefix(env_prefix).separator("__")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        retries: u32,
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("hive.yaml").unwrap(), FileFormat::Yaml);
        assert_eq!(detect_format("hive.yml").unwrap(), FileFormat::Yaml);
        assert_eq!(detect_format("hive.toml").unwrap(), FileFormat::Toml);
        assert_eq!(detect_format("hive.JSON").unwrap(), FileFormat::Json);
        assert!(matches!(
            detect_format("hive.txt"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(detect_format("hive").is_err());
    }

    #[test]
    fn test_from_str_toml() {
        let sample: Sample = from_str("name = \"sensor\"\nretries = 4\n", FileFormat::Toml).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "sensor".into(),
                retries: 4
            }
        );
    }

    #[test]
    fn test_env_substitution() {
        unsafe { std::env::set_var("HIVE_TEST_HOST", "localhost"); }
        unsafe { std::env::set_var("HIVE_TEST_PORT", "8080"); }

        let result = substitute_env_vars("url: http://${HIVE_TEST_HOST}:$HIVE_TEST_PORT/api");
        assert_eq!(result, "url: http://localhost:8080/api");

        let untouched = substitute_env_vars("key: ${HIVE_TEST_DEFINITELY_UNSET}");
        assert_eq!(untouched, "key: ${HIVE_TEST_DEFINITELY_UNSET}");
    }

    #[test]
    fn test_merge_later_wins() {
        let sample: Sample = merge_configs(&[
            (r#"{"name": "base", "retries": 1}"#, FileFormat::Json),
            ("retries: 5", FileFormat::Yaml),
        ])
        .unwrap();
        assert_eq!(sample.name, "base");
        assert_eq!(sample.retries, 5);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "name: vision").unwrap();

        let sample: Sample = load_config(&path).unwrap();
        assert_eq!(sample.name, "vision");
        assert_eq!(sample.retries, 0);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load_config::<Sample>("/nonexistent/hive.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
