//! Main DBW executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Message acquisition (replayed from a script)
//!         - DBW node processing:
//!             - Twist control
//!             - Actuator command packaging
//!         - Archiving
//!
//! # Modules
//!
//! All modules (e.g. `dbw_node`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use dbw_lib::data_store::DataStore;

mod msg_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use structopt::StructOpt;

// Internal
use util::{
    archive::Archived,
    module::State,
    logger::{logger_init, LevelFilter},
    session::Session,
    script_interpreter::{ScriptInterpreter, PendingMsgs},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive cycles the DBW node may hold its last safe output
/// before autonomous control is disabled.
const MAX_CONSEC_FALLBACKS: u64 = 10;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options of the executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "dbw_exec", about = "Drive-by-wire twist controller executive")]
struct Opts {
    /// Path to the script of messages to replay
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// DBW node parameter file, relative to $DBW_SW_ROOT/params
    #[structopt(long, default_value = "dbw_node.toml")]
    params: String,

    /// Target period of one cycle in seconds
    #[structopt(long, default_value = "0.02")]
    cycle_period_s: f64,

    /// Log every cycle's output at debug level instead of once per second
    #[structopt(long)]
    verbose: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opts = Opts::from_args();

    if !(opts.cycle_period_s.is_finite() && opts.cycle_period_s > 0.0) {
        return Err(eyre!(
            "The cycle period must be positive, found {}", opts.cycle_period_s
        ));
    }
    let cycle_frequency_hz = 1.0 / opts.cycle_period_s;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "dbw_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    let ctrl_level = if opts.verbose { LevelFilter::Trace } else { LevelFilter::Info };
    logger_init(
        LevelFilter::Debug,
        &[("dbw_lib::twist_ctrl", ctrl_level), ("dbw_lib::dbw_node", ctrl_level)],
        &session
    ).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("DBW Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD SCRIPT ----

    info!("Loading script from {:?}", &opts.script);

    let mut script = ScriptInterpreter::new(&opts.script)
        .wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} messages\n",
        script.get_duration(),
        script.get_num_msgs()
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.dbw_node.init(opts.params.clone(), &session)
        .wrap_err("Failed to initialise DbwNode")?;
    info!("DbwNode init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(opts.cycle_period_s);
    let mut prev_cycle_start: Option<Instant> = None;
    let mut end_of_script = false;

    loop {

        // Get cycle start time and the time since the last cycle
        let cycle_start_instant = Instant::now();
        let dt_s = match prev_cycle_start {
            Some(t) => (cycle_start_instant - t).as_secs_f64(),
            None => opts.cycle_period_s
        };
        prev_cycle_start = Some(cycle_start_instant);

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycle_frequency_hz, dt_s);

        // ---- MESSAGE PROCESSING ----

        match script.get_pending_msgs() {
            PendingMsgs::None => (),
            PendingMsgs::Some(msg_vec) => {
                for msg in msg_vec.iter() {
                    msg_processor::exec(&mut ds, msg);
                }
            },
            // At the end of the script hand back control, and run one more
            // cycle so the neutral output goes out.
            PendingMsgs::EndOfScript => {
                info!("End of script reached, stopping");
                ds.dbw_node.make_safe();
                end_of_script = true;
            }
        }

        // ---- CONTROL PROCESSING ----

        match ds.dbw_node.proc(&ds.dbw_node_input) {
            Ok((o, r)) => {
                ds.dbw_node_output = o;
                ds.dbw_node_status_rpt = r;
            },
            Err(e) => return Err(e).wrap_err("DbwNode processing failed")
        };

        if let Some(out) = ds.dbw_node.output() {
            if ds.is_1_hz_cycle {
                info!("t: {:.2}, b: {:.2}, s: {:.2}", out.throttle, out.brake_nm, out.steer_rad);
            }
            else if opts.verbose {
                debug!("t: {:.2}, b: {:.2}, s: {:.2}", out.throttle, out.brake_nm, out.steer_rad);
            }
        }

        // Stale output can only be held for so long
        if ds.dbw_node_status_rpt.fallback_used
            && ds.num_consec_fallbacks + 1 >= MAX_CONSEC_FALLBACKS
        {
            warn!(
                "DbwNode has held its last safe output for {} cycles, disabling autonomous control",
                MAX_CONSEC_FALLBACKS
            );
            ds.dbw_node.make_safe();
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.dbw_node.write() {
            warn!("Could not write DbwNode archives: {}", e);
        }

        ds.cycle_end();

        if end_of_script {
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution after {} cycles", ds.num_cycles);

    Ok(())
}
