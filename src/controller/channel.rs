//! Charm channel and revision comparison.
//!
//! Channels are `track/risk[/branch]` strings. The comparison here is a
//! conservative string-order heuristic: it never signals a move to a
//! lexically lower track, and it does not interpret tracks as versions
//! (`2023.10` sorts before `2023.9`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{ControllerError, Result};

use super::client::{DeploymentController, ModelStatus};

/// Track implied by a bare-risk channel.
pub const DEFAULT_TRACK: &str = "latest";

/// Risk level of a channel, ordered from most to least stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Risk {
    /// Production ready.
    Stable,
    /// Release candidate.
    Candidate,
    /// Beta.
    Beta,
    /// Latest build.
    Edge,
}

/// A parsed `track/risk[/branch]` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Opaque track; `latest` when the channel names only a risk.
    pub track: String,
    /// Risk level.
    pub risk: Risk,
    /// Optional branch.
    pub branch: Option<String>,
}

/// Charm name and revision parsed from a charm URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharmRef {
    /// Charm name, e.g. `cinder-k8s`.
    pub name: String,
    /// Revision, when the URL carries one.
    pub revision: Option<u64>,
}

impl Risk {
    /// Stability rank, higher is more stable.
    const fn rank(self) -> u8 {
        match self {
            Self::Stable => 3,
            Self::Candidate => 2,
            Self::Beta => 1,
            Self::Edge => 0,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Candidate => "candidate",
            Self::Beta => "beta",
            Self::Edge => "edge",
        }
    }
}

impl PartialOrd for Risk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Risk {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for Risk {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Self::Stable),
            "candidate" => Ok(Self::Candidate),
            "beta" => Ok(Self::Beta),
            "edge" => Ok(Self::Edge),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalised = normalise_channel(s);
        let mut parts = normalised.splitn(3, '/');
        let track = parts.next().unwrap_or_default();
        let risk = parts.next().unwrap_or_default();
        if track.is_empty() {
            return Err(format!("channel has an empty track: {s}"));
        }

        Ok(Self {
            track: track.to_string(),
            risk: risk.parse()?,
            branch: parts.next().filter(|b| !b.is_empty()).map(str::to_string),
        })
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.track, self.risk)?;
        if let Some(branch) = &self.branch {
            write!(f, "/{branch}")?;
        }
        Ok(())
    }
}

impl CharmRef {
    /// Parses `ch:arch/series/name-revision`.
    #[must_use]
    pub fn parse(charm_url: &str) -> Self {
        Self {
            name: extract_charm_name(charm_url).to_string(),
            revision: extract_charm_revision(charm_url).and_then(|r| r.parse().ok()),
        }
    }
}

/// Prefixes a bare-risk channel with the implicit `latest` track.
#[must_use]
pub fn normalise_channel(channel: &str) -> String {
    if channel.contains('/') {
        channel.to_string()
    } else {
        format!("{DEFAULT_TRACK}/{channel}")
    }
}

/// Last path segment of a charm URL.
fn charm_segment(charm_url: &str) -> &str {
    let without_schema = charm_url.split_once(':').map_or(charm_url, |(_, rest)| rest);
    without_schema.rsplit('/').next().unwrap_or(without_schema)
}

/// Splits `name-123` into (`name`, `123`).
fn split_revision(segment: &str) -> Option<(&str, &str)> {
    let (name, revision) = segment.rsplit_once('-')?;
    if !name.is_empty() && !revision.is_empty() && revision.bytes().all(|b| b.is_ascii_digit()) {
        Some((name, revision))
    } else {
        None
    }
}

/// Extracts the charm name from a charm URL, dropping any trailing revision.
#[must_use]
pub fn extract_charm_name(charm_url: &str) -> &str {
    let segment = charm_segment(charm_url);
    split_revision(segment).map_or(segment, |(name, _)| name)
}

/// Extracts the trailing revision digits from a charm URL.
#[must_use]
pub fn extract_charm_revision(charm_url: &str) -> Option<&str> {
    split_revision(charm_segment(charm_url)).map(|(_, revision)| revision)
}

/// Decides whether moving from `deployed` to `target` is an update.
///
/// Different tracks: an update only when the target track sorts at or
/// after the deployed one. Same track: an update iff the risk differs.
/// Unparseable channels (unknown risk) never need an update.
#[must_use]
pub fn channel_update_needed(deployed: &str, target: &str) -> bool {
    let parsed = (deployed.parse::<ChannelSpec>(), target.parse::<ChannelSpec>());
    let (deployed_spec, target_spec) = match parsed {
        (Ok(d), Ok(t)) => (d, t),
        (Err(e), _) | (_, Err(e)) => {
            debug!("Cannot compare channels {deployed} and {target}: {e}");
            return false;
        }
    };

    if deployed_spec.track == target_spec.track {
        deployed_spec.risk != target_spec.risk
    } else {
        target_spec.track >= deployed_spec.track
    }
}

/// Checks whether a newer revision of the deployed charm is published on
/// the channel the application tracks.
///
/// # Errors
///
/// Returns `ApplicationNotFound` if `status` has no such application, or
/// the controller error if the revision lookup fails.
pub async fn revision_update_needed(
    controller: &dyn DeploymentController,
    application: &str,
    model: &str,
    status: &ModelStatus,
) -> Result<bool> {
    let app_status = status.applications.get(application).ok_or_else(|| {
        ControllerError::application_not_found(format!(
            "Application {application} not found in model {model}"
        ))
    })?;

    let charm = CharmRef::parse(&app_status.charm);
    let Some(deployed) = charm.revision else {
        debug!("Charm URL {} carries no revision", app_status.charm);
        return Ok(false);
    };
    let channel = normalise_channel(app_status.charm_channel.as_deref().unwrap_or(DEFAULT_TRACK));

    let available = controller
        .get_available_charm_revision(model, &charm.name, &channel)
        .await?;
    debug!(
        "{application}: {} deployed revision {deployed}, available {available} on {channel}",
        charm.name
    );

    Ok(available > deployed)
}
