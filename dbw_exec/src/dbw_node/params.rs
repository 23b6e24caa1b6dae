//! Parameters structure for the DBW node

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::twist_ctrl;
use super::DbwNodeInitError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the DBW node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Params {
    /// Twist controller parameters
    pub twist_ctrl: twist_ctrl::Params,

    /// Publication policy
    #[serde(default)]
    pub publish: PublishParams,
}

/// Publication policy of the node's actuator commands.
///
/// By default all three channels are published every cycle while the vehicle
/// is under autonomous control.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PublishParams {
    /// Publish commands while in manual mode. The neutral output of the cycle
    /// on which manual mode is entered is always published.
    #[serde(default)]
    pub publish_when_manual: bool,

    #[serde(default)]
    pub throttle: ChannelParams,

    #[serde(default)]
    pub brake: ChannelParams,

    #[serde(default)]
    pub steering: ChannelParams,
}

/// Publication settings for one actuator channel.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChannelParams {
    /// Whether this channel is published at all.
    pub enabled: bool,

    /// Publish once every this many cycles, `1` publishes every cycle.
    pub period_cycles: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            enabled: true,
            period_cycles: 1,
        }
    }
}

impl Params {
    /// Check that all the node's parameters are valid.
    pub fn validate(&self) -> Result<(), DbwNodeInitError> {
        self.twist_ctrl.validate()?;
        self.publish.validate()
    }
}

impl PublishParams {
    /// Check the publication parameters.
    pub fn validate(&self) -> Result<(), DbwNodeInitError> {
        let channels = [
            ("throttle", &self.throttle),
            ("brake", &self.brake),
            ("steering", &self.steering),
        ];

        for (name, c) in channels.iter() {
            if c.period_cycles == 0 {
                return Err(DbwNodeInitError::InvalidPublishParams(format!(
                    "{} period_cycles must be at least 1", name
                )));
            }
        }

        Ok(())
    }
}
