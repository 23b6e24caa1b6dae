//! # Message processor module
//!
//! The message processor hands messages coming from any source to the
//! modules which consume them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use comms_if::dbw::DbwMsg;
use dbw_lib::data_store::DataStore;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Deliver a message.
///
/// Mutates the datastore to pass the message into the DBW node's input for
/// this cycle. If several messages of the same type arrive in one cycle the
/// last one wins.
pub(crate) fn exec(ds: &mut DataStore, msg: &DbwMsg) {

    match msg {
        DbwMsg::Twist(t) => {
            ds.dbw_node_input.twist_cmd = Some(*t)
        },
        DbwMsg::Velocity(v) => {
            ds.dbw_node_input.velocity = Some(*v)
        },
        DbwMsg::DbwEnabled(e) => {
            debug!("Recieved DBW enabled = {}", e);
            ds.dbw_node_input.dbw_enabled = Some(*e)
        }
    }

}
