//! Serde model of the YAML compose file.
//!
//! A compose file declares a set of services, each created from an image
//! with optional overrides, plus named volumes shared between them:
//!
//! ```yaml
//! services:
//!   db:
//!     image: postgres:16
//!     volumes:
//!       - pgdata:/var/lib/postgresql/data
//!   api:
//!     image: api:latest
//!     ports:
//!       - "8080:80"
//!     environment:
//!       DATABASE_URL: postgres://db/app
//!     depends_on:
//!       - db
//!     restart: on-failure:3
//! volumes:
//!   pgdata:
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use vessel_common::error::{Result, VesselError};

/// Root of a parsed compose file.
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeFile {
    /// Service definitions, keyed by service name.
    pub services: BTreeMap<String, ServiceSpec>,
    /// Named volumes created before any service starts.
    #[serde(default)]
    pub volumes: BTreeMap<String, Option<serde_yaml::Value>>,
}

/// A single service definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSpec {
    /// Image reference the service runs from.
    pub image: String,
    /// Command override, as a string or a list.
    #[serde(default)]
    pub command: Option<CommandLine>,
    /// Environment variables, as a map or a `KEY=VALUE` list.
    #[serde(default)]
    pub environment: Option<EnvSpec>,
    /// Published ports (`"HOST:CONTAINER"`).
    #[serde(default)]
    pub ports: Vec<String>,
    /// Volume mounts (`SOURCE:/TARGET[:ro]`).
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Services that must start before this one.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Restart policy (`no`, `always`, `on-failure[:N]`).
    #[serde(default)]
    pub restart: Option<String>,
    /// Memory limit (`128m`, `1g`, `256MiB`, plain bytes).
    #[serde(default)]
    pub mem_limit: Option<String>,
    /// CPU weight (relative share).
    #[serde(default)]
    pub cpu_shares: Option<u64>,
    /// Explicit container name instead of `<project>-<service>`.
    #[serde(default)]
    pub container_name: Option<String>,
    /// Hostname inside the container.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Run with a read-only rootfs.
    #[serde(default)]
    pub read_only: Option<bool>,
}

/// A command given either as a shell-ish string or an argv list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    /// Whitespace-split string form.
    Line(String),
    /// Explicit argv form.
    Argv(Vec<String>),
}

impl CommandLine {
    /// Returns the command as an argv vector.
    #[must_use]
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            Self::Argv(argv) => argv.clone(),
        }
    }
}

/// Environment variables in either mapping or `KEY=VALUE` list form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EnvSpec {
    /// Mapping form.
    Map(BTreeMap<String, String>),
    /// List form.
    List(Vec<String>),
}

impl EnvSpec {
    /// Normalizes to key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a list entry lacks the `KEY=VALUE` shape.
    pub fn to_pairs(&self) -> Result<Vec<(String, String)>> {
        match self {
            Self::Map(map) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            Self::List(list) => list
                .iter()
                .map(|item| {
                    item.split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .ok_or_else(|| VesselError::Config {
                            message: format!("invalid environment entry (expected KEY=VALUE): {item}"),
                        })
                })
                .collect(),
        }
    }
}

/// Loads and validates a compose file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid YAML, or
/// fails [`validate`].
pub fn load_compose(path: &Path) -> Result<ComposeFile> {
    let content =
        std::fs::read_to_string(path).map_err(|e| VesselError::io(path.to_path_buf(), e))?;
    let file = parse_compose(&content)?;
    validate(&file)?;
    tracing::info!(path = %path.display(), services = file.services.len(), "compose file loaded");
    Ok(file)
}

/// Parses compose YAML from a string without validating it.
///
/// # Errors
///
/// Returns an error if the YAML does not match the compose model.
pub fn parse_compose(content: &str) -> Result<ComposeFile> {
    serde_yaml::from_str(content).map_err(|e| VesselError::Config {
        message: format!("invalid compose file: {e}"),
    })
}

/// Validates cross-references and parseable fields of a compose file.
///
/// # Errors
///
/// Returns an error for an empty service set, a `depends_on` naming an
/// unknown service, a self-dependency, or malformed port, volume,
/// restart, environment, or memory values.
pub fn validate(file: &ComposeFile) -> Result<()> {
    if file.services.is_empty() {
        return Err(VesselError::Config {
            message: "compose file declares no services".into(),
        });
    }

    for (name, service) in &file.services {
        if service.image.trim().is_empty() {
            return Err(VesselError::Config {
                message: format!("service {name} has an empty image reference"),
            });
        }
        for dep in &service.depends_on {
            if dep == name {
                return Err(VesselError::Config {
                    message: format!("service {name} depends on itself"),
                });
            }
            if !file.services.contains_key(dep) {
                return Err(VesselError::Config {
                    message: format!("service {name} depends on unknown service {dep}"),
                });
            }
        }
        for port in &service.ports {
            let _: vessel_common::types::PortMapping = port.parse()?;
        }
        for volume in &service.volumes {
            let _: vessel_runtime::volume::VolumeMount = volume.parse()?;
        }
        if let Some(restart) = &service.restart {
            let _: vessel_common::types::RestartPolicy = restart.parse()?;
        }
        if let Some(env) = &service.environment {
            let _ = env.to_pairs()?;
        }
        if let Some(mem) = &service.mem_limit {
            let _ = parse_memory(mem)?;
        }
    }
    Ok(())
}

/// Parses memory strings like `128m`, `1g`, `256MiB`, `1GB`, or plain
/// bytes into a byte count.
///
/// # Errors
///
/// Returns an error for an unknown suffix or unparseable number.
pub fn parse_memory(s: &str) -> Result<u64> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);

    let multiplier: u64 = match suffix.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kib" => 1024,
        "m" | "mib" => 1024 * 1024,
        "g" | "gib" => 1024 * 1024 * 1024,
        "kb" => 1000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        other => {
            return Err(VesselError::Config {
                message: format!("unknown memory suffix {other:?} in {s:?}"),
            });
        }
    };

    let value: u64 = number.parse().map_err(|_| VesselError::Config {
        message: format!("invalid memory value: {s:?}"),
    })?;
    Ok(value * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r"
services:
  db:
    image: postgres:16
    volumes:
      - pgdata:/var/lib/postgresql/data
  api:
    image: api:latest
    ports:
      - 8080:80
    environment:
      DATABASE_URL: postgres://db/app
    depends_on:
      - db
    restart: on-failure:3
volumes:
  pgdata:
";

    #[test]
    fn parses_basic_two_service_file() {
        let file = parse_compose(BASIC).expect("parse");
        validate(&file).expect("validate");

        assert_eq!(file.services.len(), 2);
        assert!(file.volumes.contains_key("pgdata"));
        let api = &file.services["api"];
        assert_eq!(api.image, "api:latest");
        assert_eq!(api.depends_on, vec!["db"]);
        assert_eq!(api.restart.as_deref(), Some("on-failure:3"));
    }

    #[test]
    fn command_accepts_string_and_list() {
        let file = parse_compose(
            r#"
services:
  a:
    image: img
    command: /bin/sh -c "sleep 1"
  b:
    image: img
    command: ["/bin/sh", "-c", "sleep 1"]
"#,
        )
        .expect("parse");

        let a = file.services["a"].command.as_ref().expect("a command");
        assert_eq!(a.to_argv()[0], "/bin/sh");
        let b = file.services["b"].command.as_ref().expect("b command");
        assert_eq!(b.to_argv(), vec!["/bin/sh", "-c", "sleep 1"]);
    }

    #[test]
    fn environment_accepts_map_and_list() {
        let file = parse_compose(
            r"
services:
  a:
    image: img
    environment:
      KEY: value
  b:
    image: img
    environment:
      - KEY=value
      - OTHER=x
",
        )
        .expect("parse");

        let a = file.services["a"].environment.as_ref().expect("a env");
        assert_eq!(a.to_pairs().expect("pairs"), vec![("KEY".into(), "value".into())]);
        let b = file.services["b"].environment.as_ref().expect("b env");
        assert_eq!(b.to_pairs().expect("pairs").len(), 2);
    }

    #[test]
    fn environment_list_requires_key_value_shape() {
        let file = parse_compose(
            r"
services:
  a:
    image: img
    environment:
      - JUSTAKEY
",
        )
        .expect("parse");
        assert!(validate(&file).is_err());
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let file = parse_compose(
            r"
services:
  api:
    image: img
    depends_on:
      - ghost
",
        )
        .expect("parse");
        let err = validate(&file).unwrap_err();
        assert!(err.to_string().contains("unknown service"), "{err}");
    }

    #[test]
    fn self_dependency_is_rejected() {
        let file = parse_compose(
            r"
services:
  api:
    image: img
    depends_on:
      - api
",
        )
        .expect("parse");
        assert!(validate(&file).is_err());
    }

    #[test]
    fn empty_services_are_rejected() {
        let file = parse_compose("services: {}\n").expect("parse");
        assert!(validate(&file).is_err());
    }

    #[test]
    fn malformed_port_is_rejected() {
        let file = parse_compose(
            r"
services:
  api:
    image: img
    ports:
      - not-a-port
",
        )
        .expect("parse");
        assert!(validate(&file).is_err());
    }

    #[test]
    fn parse_memory_docker_suffixes() {
        assert_eq!(parse_memory("128m").expect("m"), 128 * 1024 * 1024);
        assert_eq!(parse_memory("1g").expect("g"), 1024 * 1024 * 1024);
        assert_eq!(parse_memory("512k").expect("k"), 512 * 1024);
    }

    #[test]
    fn parse_memory_explicit_units() {
        assert_eq!(parse_memory("256MiB").expect("mib"), 256 * 1024 * 1024);
        assert_eq!(parse_memory("1GB").expect("gb"), 1_000_000_000);
        assert_eq!(parse_memory("1048576").expect("bytes"), 1_048_576);
    }

    #[test]
    fn parse_memory_rejects_garbage() {
        assert!(parse_memory("lots").is_err());
        assert!(parse_memory("12x").is_err());
        assert!(parse_memory("").is_err());
    }
}
