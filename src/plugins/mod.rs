//! Optional cluster features.
//!
//! A plugin declares its requirements and the plans that enable or
//! disable it. [`PluginManager`] runs those plans through the regular
//! plan executor and records the result under `Plugin-<name>` in the
//! membership store.

mod info;
mod manager;
mod plugin;

pub use info::{plugin_key, PluginInfo, PLUGIN_KEY_PREFIX};
pub use manager::PluginManager;
pub use plugin::{FeaturePlugin, Plugin, PluginRequirement};
