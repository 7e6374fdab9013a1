//! Deployment controller client contract, channel comparison and the
//! upgrade step built on top of them.

pub mod channel;
pub mod client;
pub mod upgrade;

pub use channel::{
    channel_update_needed, extract_charm_name, extract_charm_revision, normalise_channel,
    revision_update_needed, ChannelSpec, CharmRef, Risk, DEFAULT_TRACK,
};
pub use client::{
    Application, ApplicationStatus, DeploymentController, Machine, MachineUnit, ModelStatus, Unit,
};
pub use upgrade::{TargetCharm, UpgradeApplicationsStep, UPGRADE_ACCEPTED_STATUSES};
