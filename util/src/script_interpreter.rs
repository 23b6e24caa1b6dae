//! # DBW script interpreter module
//!
//! This module provides an interpreter for DBW input scripts, allowing the
//! messages normally delivered by the transport layer to be replayed from a
//! file.
//!
//! A script is a list of timestamped messages, one per line:
//!
//! ```text
//! 0.0: {"type": "DBW", "payload": {"enabled": true}};
//! 0.0: {"type": "VELOCITY", "payload": {"linear_ms": 0.0}};
//! 0.5: {"type": "TWIST", "payload": {"linear_ms": 5.0, "angular_rads": 0.0}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::dbw::{DbwMsg, MsgParseError};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A message which is scripted to be delivered at a specific time.
#[derive(Debug)]
pub struct ScriptedMsg {
    /// The time the message is supposed to be delivered at
    exec_time_s: f64,

    /// The message to deliver
    msg: DbwMsg
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_msgs` to acquire a list of messages that need delivering.
#[derive(Debug)]
pub struct ScriptInterpreter {
    _script_path: Option<PathBuf>,
    msgs: VecDeque<ScriptedMsg>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid message at {0} s: {1}")]
    InvalidMsg(f64, MsgParseError),

    #[error("Script timestamps must not decrease, found {1} s after {0} s")]
    OutOfOrder(f64, f64)
}

/// Messages due for delivery.
#[derive(Debug)]
pub enum PendingMsgs {
    None,
    Some(Vec<DbwMsg>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.to_string_lossy().to_string()));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_str(&script)?;
        si._script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {

        // Empty queue of messages
        let mut msg_queue: VecDeque<ScriptedMsg> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        for cap in re.captures_iter(script) {
            // Both groups are non-optional in the regex so will always be
            // present on a match.
            let (time_str, payload) = match (cap.get(1), cap.get(3)) {
                (Some(t), Some(p)) => (t.as_str(), p.as_str()),
                _ => continue
            };

            // Parse the exec time
            let exec_time_s: f64 = time_str.parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(prev) = msg_queue.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(prev.exec_time_s, exec_time_s))
                }
            }

            // Parse the message from the payload. The scripts contain JSON only.
            let msg = DbwMsg::from_json(payload)
                .map_err(|e| ScriptError::InvalidMsg(exec_time_s, e))?;

            msg_queue.push_back(ScriptedMsg {
                exec_time_s,
                msg
            });
        }

        if msg_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            _script_path: None,
            msgs: msg_queue
        })
    }

    /// Return the messages which are due at the current session time.
    pub fn get_pending_msgs(&mut self) -> PendingMsgs {
        self.get_pending_msgs_at(get_elapsed_seconds())
    }

    /// Return the messages which are due at the given script time.
    ///
    /// Messages are delivered in script order, and all messages whose time is
    /// at or before `current_time_s` are returned together.
    pub fn get_pending_msgs_at(&mut self, current_time_s: f64) -> PendingMsgs {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.msgs.is_empty() {
            return PendingMsgs::EndOfScript
        }

        let mut msg_vec: Vec<DbwMsg> = vec![];

        // Pop items from the queue while the head's exec time has passed.
        while let Some(front) = self.msgs.front() {
            if front.exec_time_s > current_time_s {
                break;
            }
            if let Some(m) = self.msgs.pop_front() {
                msg_vec.push(m.msg);
            }
        }

        if msg_vec.is_empty() {
            PendingMsgs::None
        }
        else {
            PendingMsgs::Some(msg_vec)
        }
    }

    /// Get the number of messages remaining in the script
    pub fn get_num_msgs(&self) -> usize {
        self.msgs.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.msgs.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }
}
