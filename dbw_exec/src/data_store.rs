//! # Data Store

use comms_if::dbw::ActuatorCmds;

use crate::dbw_node;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    // DbwNode
    pub dbw_node: dbw_node::DbwNode,
    pub dbw_node_input: dbw_node::InputData,
    pub dbw_node_output: ActuatorCmds,
    pub dbw_node_status_rpt: dbw_node::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive cycles on which the DBW node used its fallback
    /// output
    pub num_consec_fallbacks: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, sets the
    /// 1Hz cycle flag and records the time since the previous cycle.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64, dt_s: f64) {
        let cycles_per_second = (cycle_frequency_hz.round() as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_second == 0;

        self.dbw_node_input = dbw_node::InputData {
            dt_s,
            ..Default::default()
        };
        self.dbw_node_output = ActuatorCmds::default();
        self.dbw_node_status_rpt = dbw_node::StatusReport::default();
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        if self.dbw_node_status_rpt.fallback_used {
            self.num_consec_fallbacks += 1;
        }
        else {
            self.num_consec_fallbacks = 0;
        }

        self.num_cycles += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_1_hz_cycles() {
        let mut ds = DataStore::default();
        let mut one_hz = vec![];

        for i in 0..120 {
            ds.cycle_start(50.0, 0.02);
            if ds.is_1_hz_cycle {
                one_hz.push(i);
            }
            assert_eq!(ds.dbw_node_input.dt_s, 0.02);
            ds.cycle_end();
        }

        assert_eq!(one_hz, vec![0, 50, 100]);
    }

    #[test]
    fn test_fallback_counter() {
        let mut ds = DataStore::default();

        for _ in 0..3 {
            ds.cycle_start(50.0, 0.02);
            ds.dbw_node_status_rpt.fallback_used = true;
            ds.cycle_end();
        }
        assert_eq!(ds.num_consec_fallbacks, 3);

        ds.cycle_start(50.0, 0.02);
        ds.cycle_end();
        assert_eq!(ds.num_consec_fallbacks, 0);
    }
}
