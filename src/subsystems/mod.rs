//! Runtime subsystems hosting the plugin.

pub mod comms;
