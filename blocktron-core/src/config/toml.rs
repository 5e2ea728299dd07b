//! Simple TOML parser for OTA configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the update configuration. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - `[ota]` section header
//! - `[target <name>]` section headers (name may contain dots)
//! - Comments (# ...)
//!
//! NOT supported:
//! - Multi-line strings
//! - Arrays and inline tables
//! - Dotted keys
//!
//! Example:
//!
//! ```toml
//! [ota]
//! base_url = "http://updates.local/blocktron"
//! max_verify_boots = 3
//!
//! [target code.py]
//!
//! [target fonts.bdf]
//! url = "http://cdn.local/fonts/4x6.bdf"
//! kind = "data"
//! ```

use heapless::{String, Vec};

use super::types::{
    ArtifactKind, ConfigError, FileName, OtaConfig, Target, Url, DEFAULT_BASE_URL, MAX_TARGETS,
    MAX_URL_LEN,
};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid section header
    InvalidSection,
    /// Invalid value type
    InvalidValue,
    /// Too many items (exceeded heapless capacity)
    TooManyItems,
    /// Parsed configuration failed validation
    Invalid(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::TooManyTargets => ParseError::TooManyItems,
            other => ParseError::Invalid(other),
        }
    }
}

/// Current parsing context
#[derive(Debug, Clone)]
enum Section {
    Root,
    Ota,
    Target(FileName),
}

/// Target being built; the URL is resolved once base_url is known
#[derive(Debug, Clone)]
struct PendingTarget {
    name: FileName,
    url: Option<Url>,
    kind: Option<ArtifactKind>,
}

/// Parse TOML configuration into OtaConfig
///
/// Keys absent from the input keep their defaults. If any `[target]`
/// section is present, the targets replace the default list.
pub fn parse_ota_config(input: &str) -> Result<OtaConfig, ParseError> {
    let mut config = OtaConfig::default();
    let mut base_url: String<MAX_URL_LEN> =
        String::try_from(DEFAULT_BASE_URL).map_err(|_| ParseError::InvalidValue)?;
    let mut section = Section::Root;

    let mut pending: Vec<PendingTarget, MAX_TARGETS> = Vec::new();

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Check for section header
        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;

            if let Section::Target(name) = &section {
                if pending.iter().any(|t| t.name == *name) {
                    return Err(ParseError::InvalidSection);
                }
                pending
                    .push(PendingTarget {
                        name: name.clone(),
                        url: None,
                        kind: None,
                    })
                    .map_err(|_| ParseError::TooManyItems)?;
            }
            continue;
        }

        // Parse key = value
        if let Some((key, value)) = parse_key_value(line) {
            apply_value(&section, key, value, &mut config, &mut base_url, &mut pending)?;
        }
    }

    if pending.is_empty() {
        // No explicit targets: default set at the (possibly overridden) base
        if base_url.as_str() != DEFAULT_BASE_URL {
            let defaults = OtaConfig::with_base_url(&base_url)?;
            config.targets = defaults.targets;
        }
    } else {
        config.targets.clear();
        for p in pending {
            let mut target = match p.url {
                Some(url) => Target {
                    kind: ArtifactKind::for_name(&p.name),
                    name: p.name,
                    url,
                },
                None => Target::from_base(&base_url, &p.name)?,
            };
            if let Some(kind) = p.kind {
                target.kind = kind;
            }
            config
                .targets
                .push(target)
                .map_err(|_| ParseError::TooManyItems)?;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Parse section header like "ota" or "target code.py"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    let header = header.trim();

    // Split on whitespace for "type name" format; names may contain dots
    let mut parts = header.split_whitespace();
    let section_type = parts.next().ok_or(ParseError::InvalidSection)?;
    let name = parts.next();
    if parts.next().is_some() {
        return Err(ParseError::InvalidSection);
    }

    match (section_type, name) {
        ("ota", None) => Ok(Section::Ota),
        ("target", Some(name)) => {
            let name = parse_string(name)?;
            let name = FileName::try_from(name).map_err(|_| ParseError::InvalidSection)?;
            Ok(Section::Target(name))
        }
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = if let Some(hash_pos) = value.find('#') {
        // Make sure # is not inside a string
        let quote_count = value[..hash_pos].matches('"').count();
        if quote_count % 2 == 0 {
            value[..hash_pos].trim()
        } else {
            value
        }
    } else {
        value
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        Ok(&value[1..value.len() - 1])
    } else {
        // Allow unquoted strings for simple values
        Ok(value)
    }
}

/// Parse an integer value
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse artifact kind
fn parse_kind(value: &str) -> Result<ArtifactKind, ParseError> {
    match parse_string(value)? {
        "script" => Ok(ArtifactKind::Script),
        "data" => Ok(ArtifactKind::Data),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a quoted string into a bounded heapless string
fn parse_bounded<const N: usize>(value: &str) -> Result<String<N>, ParseError> {
    String::try_from(parse_string(value)?).map_err(|_| ParseError::InvalidValue)
}

/// Apply a parsed value to the appropriate config field
fn apply_value(
    section: &Section,
    key: &str,
    value: &str,
    config: &mut OtaConfig,
    base_url: &mut String<MAX_URL_LEN>,
    pending: &mut Vec<PendingTarget, MAX_TARGETS>,
) -> Result<(), ParseError> {
    match section {
        Section::Ota => match key {
            "enabled" => config.enabled = parse_bool(value)?,
            "check_interval_s" => config.check_interval_s = parse_int(value)?,
            "max_verify_boots" => config.max_verify_boots = parse_int(value)?,
            "min_artifact_size" => config.min_artifact_size = parse_int(value)?,
            "max_artifact_size" => config.max_artifact_size = parse_int(value)?,
            "version_timeout_ms" => config.version_timeout_ms = parse_int(value)?,
            "fetch_timeout_ms" => config.fetch_timeout_ms = parse_int(value)?,
            "base_url" => *base_url = parse_bounded(value)?,
            "version_file" => config.version_file = parse_bounded(value)?,
            "manifest_path" => config.manifest_path = parse_bounded(value)?,
            "confirm_marker_path" => config.confirm_marker_path = parse_bounded(value)?,
            _ => {} // Ignore unknown keys
        },
        Section::Target(_) => {
            let t = pending.last_mut().ok_or(ParseError::InvalidSection)?;
            match key {
                "url" => t.url = Some(parse_bounded(value)?),
                "kind" => t.kind = Some(parse_kind(value)?),
                _ => {}
            }
        }
        Section::Root => {
            // No root-level keys
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_section_header() {
        match parse_section_header("ota").unwrap() {
            Section::Ota => {}
            _ => panic!("Wrong section type"),
        }

        match parse_section_header("target version_history.txt").unwrap() {
            Section::Target(name) => assert_eq!(name.as_str(), "version_history.txt"),
            _ => panic!("Wrong section type"),
        }

        assert_eq!(
            parse_section_header("display").unwrap_err(),
            ParseError::InvalidSection
        );
        assert_eq!(
            parse_section_header("target").unwrap_err(),
            ParseError::InvalidSection
        );
    }

    #[test]
    fn test_parse_empty_config_gives_defaults() {
        let config = parse_ota_config("# nothing here\n").unwrap();
        assert_eq!(config, OtaConfig::default());
    }

    #[test]
    fn test_parse_ota_section() {
        let config_str = r#"
[ota]
enabled = false
check_interval_s = 3600   # hourly
max_verify_boots = 5
min_artifact_size = 16
"#;

        let config = parse_ota_config(config_str).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.check_interval_s, 3600);
        assert_eq!(config.max_verify_boots, 5);
        assert_eq!(config.min_artifact_size, 16);
        assert_eq!(config.targets.len(), 3);
    }

    #[test]
    fn test_base_url_applies_to_default_targets() {
        let config_str = r#"
[ota]
base_url = "http://updates.local/fw"
"#;

        let config = parse_ota_config(config_str).unwrap();
        assert_eq!(
            config.target("code.py").unwrap().url.as_str(),
            "http://updates.local/fw/code.py"
        );
    }

    #[test]
    fn test_explicit_targets_replace_defaults() {
        let config_str = r#"
[ota]
base_url = "http://updates.local/fw"
version_file = "VERSION"

[target code.py]

[target VERSION]

[target font.bdf]
url = "http://cdn.local/font.bdf"
kind = "data"
"#;

        let config = parse_ota_config(config_str).unwrap();
        assert_eq!(config.targets.len(), 3);
        assert_eq!(config.targets[0].name.as_str(), "code.py");
        assert_eq!(config.targets[0].kind, ArtifactKind::Script);
        assert_eq!(
            config.targets[1].url.as_str(),
            "http://updates.local/fw/VERSION"
        );
        assert_eq!(config.targets[2].url.as_str(), "http://cdn.local/font.bdf");
        assert_eq!(config.targets[2].kind, ArtifactKind::Data);
        assert_eq!(config.version_target().unwrap().name.as_str(), "VERSION");
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            parse_ota_config("[ota]\nenabled = maybe\n").unwrap_err(),
            ParseError::InvalidValue
        );
        assert_eq!(
            parse_ota_config("[ota]\nmax_verify_boots = 300\n").unwrap_err(),
            ParseError::InvalidValue
        );
        assert_eq!(
            parse_ota_config("[target code.py]\nkind = \"binary\"\n").unwrap_err(),
            ParseError::InvalidValue
        );
    }

    #[test]
    fn test_validation_runs_after_parse() {
        assert_eq!(
            parse_ota_config("[ota]\nmax_verify_boots = 0\n").unwrap_err(),
            ParseError::Invalid(ConfigError::ZeroVerifyBoots)
        );
        // Version file must be among explicit targets
        assert_eq!(
            parse_ota_config("[target code.py]\n").unwrap_err(),
            ParseError::Invalid(ConfigError::MissingVersionTarget)
        );
    }

    #[test]
    fn test_too_many_targets() {
        let mut input = std::string::String::new();
        for i in 0..=MAX_TARGETS {
            input.push_str(&std::format!("[target file{}.txt]\n", i));
        }
        assert_eq!(
            parse_ota_config(&input).unwrap_err(),
            ParseError::TooManyItems
        );
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let input = "[target code.py]\n[target code.py]\n";
        assert_eq!(
            parse_ota_config(input).unwrap_err(),
            ParseError::InvalidSection
        );
    }
}
