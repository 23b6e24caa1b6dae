//! # Drive-by-wire messages
//!
//! This module provides the messages exchanged by the DBW node: the inputs
//! it subscribes to (twist command, velocity report, DBW enabled flag) and
//! the actuator commands it publishes.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod input;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use serde_json::{self, Value};
use thiserror::Error;

pub use cmd::*;
pub use input::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A message delivered to the DBW node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DbwMsg {
    /// The motion the planner wants the vehicle to follow.
    Twist(TwistCmd),

    /// The measured velocity of the vehicle.
    Velocity(VelocityReport),

    /// Whether the vehicle is under autonomous control.
    DbwEnabled(bool),
}

/// The type tag of a message, as found in its JSON representation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MsgType {
    Twist,
    Velocity,
    DbwEnabled,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum MsgParseError {
    #[error("Message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Message has an invalid type ({0})")]
    InvalidType(String),

    #[error("Message of type {0:?} is expected to have a payload but it doesn't")]
    MissingPayload(MsgType),

    #[error("Message of type {0:?} has an invalid payload: {1}")]
    InvalidPayload(MsgType, serde_json::Error),
}

/// Payload of a `DBW` message.
#[derive(Deserialize)]
struct DbwEnabledPayload {
    enabled: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DbwMsg {

    /// Parse a new message from a JSON packet.
    ///
    /// The packet shall have the form `{"type": <TYPE>, "payload": {...}}`,
    /// where the type is one of `TWIST`, `VELOCITY` or `DBW`.
    pub fn from_json(json_str: &str) -> Result<Self, MsgParseError> {
        // Parse the JSON string into a value
        let mut val: Value = serde_json::from_str(json_str)
            .map_err(MsgParseError::InvalidJson)?;

        // Get the type of the message
        let type_str = match val["type"].as_str() {
            Some(s) => s,
            None => return Err(MsgParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };
        let msg_type = match MsgType::from_str(type_str) {
            Some(t) => t,
            None => return Err(MsgParseError::InvalidType(
                format!("{} is not a recognised message type", type_str)
            ))
        };

        // All messages carry a payload
        let payload = val["payload"].take();
        if payload.is_null() {
            return Err(MsgParseError::MissingPayload(msg_type))
        }

        let invalid = |e| MsgParseError::InvalidPayload(msg_type, e);

        Ok(match msg_type {
            MsgType::Twist => DbwMsg::Twist(
                serde_json::from_value(payload).map_err(invalid)?
            ),
            MsgType::Velocity => DbwMsg::Velocity(
                serde_json::from_value(payload).map_err(invalid)?
            ),
            MsgType::DbwEnabled => {
                let p: DbwEnabledPayload = serde_json::from_value(payload)
                    .map_err(invalid)?;
                DbwMsg::DbwEnabled(p.enabled)
            }
        })
    }
}

impl MsgType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "TWIST" => Some(MsgType::Twist),
            "VELOCITY" => Some(MsgType::Velocity),
            "DBW" => Some(MsgType::DbwEnabled),
            _ => None
        }
    }
}
