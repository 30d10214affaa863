//! Domain primitive types used across the Vessel workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VesselError};

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from an existing string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a shortened prefix suitable for table output.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a container image.
///
/// Images are content-hash identified: the ID of an image is the digest of
/// its topmost layer, so identical content always yields the same ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Creates an image ID from an existing string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the image ID from the digest of its top layer.
    #[must_use]
    pub fn from_digest(digest: &Sha256Digest) -> Self {
        Self(digest.as_hex().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a shortened prefix suitable for table output.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 content digest used to address layers and verify blobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Creates a digest from a hex-encoded string.
    ///
    /// Accepts both bare hex and the `sha256:`-prefixed form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid 64-character hex string.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let hex = hex.into();
        let hex = hex.strip_prefix("sha256:").unwrap_or(&hex).to_string();
        if hex.len() != crate::constants::SHA256_HEX_LENGTH
            || !hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(VesselError::Config {
                message: format!("invalid SHA-256 hex string: {hex}"),
            });
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Returns the hex-encoded digest string without the algorithm prefix.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

/// Resource limits applied to a container's cgroup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU weight (relative share, 1-10000).
    pub cpu_shares: Option<u64>,
    /// Memory limit in bytes.
    pub memory_bytes: Option<u64>,
    /// I/O weight (1-10000).
    pub io_weight: Option<u16>,
}

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// Container has been created but not yet started.
    Created,
    /// Container is actively running.
    Running,
    /// Container exited cleanly or was stopped.
    Stopped,
    /// Container exited with a nonzero code or failed to start.
    Failed,
}

impl ContainerState {
    /// Returns whether a transition to `next` is allowed.
    ///
    /// `Created` containers may start; running containers may stop or fail;
    /// stopped and failed containers may be started again.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created | Self::Stopped | Self::Failed, Self::Running)
                | (Self::Running, Self::Stopped | Self::Failed)
        )
    }

    /// Validates a transition, returning it if allowed.
    ///
    /// # Errors
    ///
    /// Returns `VesselError::InvalidTransition` if the transition is not
    /// part of the lifecycle state machine.
    pub fn transition(self, next: Self) -> Result<Self> {
        if self.can_transition(next) {
            Ok(next)
        } else {
            Err(VesselError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Restart policy applied by the supervisor when a container exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Never restart.
    #[default]
    No,
    /// Restart only after a nonzero exit, up to an optional retry cap.
    OnFailure {
        /// Maximum number of consecutive restarts; unlimited when `None`.
        max_retries: Option<u32>,
    },
    /// Restart after any exit.
    Always,
}

impl RestartPolicy {
    /// Decides whether a container that exited with `exit_code` after
    /// `restarts` consecutive restarts should be started again.
    #[must_use]
    pub fn should_restart(self, exit_code: i32, restarts: u32) -> bool {
        match self {
            Self::No => false,
            Self::Always => true,
            Self::OnFailure { max_retries } => {
                exit_code != 0 && max_retries.is_none_or(|max| restarts < max)
            }
        }
    }
}

impl FromStr for RestartPolicy {
    type Err = VesselError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "no" | "" => Ok(Self::No),
            "always" => Ok(Self::Always),
            "on-failure" => Ok(Self::OnFailure { max_retries: None }),
            other => {
                if let Some(count) = other.strip_prefix("on-failure:") {
                    let max = count.parse::<u32>().map_err(|_| VesselError::Config {
                        message: format!("invalid restart retry count: {count}"),
                    })?;
                    Ok(Self::OnFailure {
                        max_retries: Some(max),
                    })
                } else {
                    Err(VesselError::Config {
                        message: format!("unknown restart policy: {other}"),
                    })
                }
            }
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::No => write!(f, "no"),
            Self::Always => write!(f, "always"),
            Self::OnFailure { max_retries: None } => write!(f, "on-failure"),
            Self::OnFailure {
                max_retries: Some(max),
            } => write!(f, "on-failure:{max}"),
        }
    }
}

/// A host-to-container port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port on the host.
    pub host: u16,
    /// Port inside the container.
    pub container: u16,
}

impl FromStr for PortMapping {
    type Err = VesselError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || VesselError::Config {
            message: format!("invalid port mapping (expected HOST:CONTAINER): {s}"),
        };
        let (host, container) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            host: host.parse().map_err(|_| invalid())?,
            container: container.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_container_ids_are_unique() {
        assert_ne!(ContainerId::generate(), ContainerId::generate());
    }

    #[test]
    fn container_id_short_truncates_to_twelve() {
        let id = ContainerId::generate();
        assert_eq!(id.short().len(), 12);
    }

    #[test]
    fn image_id_from_digest_uses_hex() {
        let digest = Sha256Digest::from_hex("a".repeat(64)).expect("digest");
        let id = ImageId::from_digest(&digest);
        assert_eq!(id.as_str(), digest.as_hex());
    }

    #[test]
    fn digest_accepts_prefixed_form() {
        let hex = "b".repeat(64);
        let digest = Sha256Digest::from_hex(format!("sha256:{hex}")).expect("digest");
        assert_eq!(digest.as_hex(), hex);
        assert_eq!(digest.to_string(), format!("sha256:{hex}"));
    }

    #[test]
    fn digest_rejects_wrong_length_and_non_hex() {
        assert!(Sha256Digest::from_hex("abc").is_err());
        assert!(Sha256Digest::from_hex("g".repeat(64)).is_err());
    }

    #[test]
    fn lifecycle_allows_created_to_running() {
        assert!(ContainerState::Created.can_transition(ContainerState::Running));
        assert!(
            ContainerState::Created
                .transition(ContainerState::Running)
                .is_ok()
        );
    }

    #[test]
    fn lifecycle_allows_restart_from_stopped_and_failed() {
        assert!(ContainerState::Stopped.can_transition(ContainerState::Running));
        assert!(ContainerState::Failed.can_transition(ContainerState::Running));
    }

    #[test]
    fn lifecycle_rejects_created_to_stopped() {
        let err = ContainerState::Created
            .transition(ContainerState::Stopped)
            .unwrap_err();
        assert!(err.to_string().contains("created -> stopped"), "{err}");
    }

    #[test]
    fn restart_policy_parses_all_forms() {
        assert_eq!("no".parse::<RestartPolicy>().expect("no"), RestartPolicy::No);
        assert_eq!(
            "always".parse::<RestartPolicy>().expect("always"),
            RestartPolicy::Always
        );
        assert_eq!(
            "on-failure".parse::<RestartPolicy>().expect("on-failure"),
            RestartPolicy::OnFailure { max_retries: None }
        );
        assert_eq!(
            "on-failure:3".parse::<RestartPolicy>().expect("on-failure:3"),
            RestartPolicy::OnFailure {
                max_retries: Some(3)
            }
        );
        assert!("sometimes".parse::<RestartPolicy>().is_err());
        assert!("on-failure:lots".parse::<RestartPolicy>().is_err());
    }

    #[test]
    fn restart_policy_on_failure_respects_retry_cap() {
        let policy = RestartPolicy::OnFailure {
            max_retries: Some(2),
        };
        assert!(policy.should_restart(1, 0));
        assert!(policy.should_restart(1, 1));
        assert!(!policy.should_restart(1, 2));
        assert!(!policy.should_restart(0, 0));
    }

    #[test]
    fn restart_policy_always_ignores_exit_code() {
        assert!(RestartPolicy::Always.should_restart(0, 100));
        assert!(!RestartPolicy::No.should_restart(1, 0));
    }

    #[test]
    fn port_mapping_parses_host_container_pair() {
        let mapping: PortMapping = "8080:80".parse().expect("mapping");
        assert_eq!(mapping.host, 8080);
        assert_eq!(mapping.container, 80);
        assert_eq!(mapping.to_string(), "8080:80");
    }

    #[test]
    fn port_mapping_rejects_malformed_specs() {
        assert!("8080".parse::<PortMapping>().is_err());
        assert!("web:80".parse::<PortMapping>().is_err());
        assert!("8080:80:443".parse::<PortMapping>().is_err());
    }
}
