//! The save gate — the entirety of the autosave business logic.

/// Live simulator state feeding the gate, tracked from system events and the
/// on-ground subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimGates {
    pub enabled:     bool,
    pub sim_running: bool,
    pub sim_paused:  bool,
    pub on_ground:   bool,
}

/// Whether a timer tick is allowed to issue the vendor save call.
pub fn save_permitted(gates: SimGates, allow_while_paused: bool, allow_on_ground: bool) -> bool {
    gates.enabled
        && gates.sim_running
        && (allow_while_paused || !gates.sim_paused)
        && (allow_on_ground || !gates.on_ground)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(n: u8, bit: u8) -> bool {
        n & (1 << bit) != 0
    }

    #[test]
    fn gate_matches_truth_table_for_all_inputs() {
        for n in 0u8..64 {
            let gates = SimGates {
                enabled:     bits(n, 0),
                sim_running: bits(n, 1),
                sim_paused:  bits(n, 2),
                on_ground:   bits(n, 3),
            };
            let allow_paused = bits(n, 4);
            let allow_ground = bits(n, 5);

            let expected = gates.enabled
                && gates.sim_running
                && (allow_paused || !gates.sim_paused)
                && (allow_ground || !gates.on_ground);

            assert_eq!(
                save_permitted(gates, allow_paused, allow_ground),
                expected,
                "combination {n:#08b}"
            );
        }
    }

    #[test]
    fn disabled_never_saves() {
        let gates = SimGates { enabled: false, sim_running: true, ..SimGates::default() };
        assert!(!save_permitted(gates, true, true));
    }

    #[test]
    fn pause_blocks_only_when_disallowed() {
        let gates = SimGates {
            enabled: true,
            sim_running: true,
            sim_paused: true,
            on_ground: false,
        };
        assert!(!save_permitted(gates, false, true));
        assert!(save_permitted(gates, true, true));
    }

    #[test]
    fn ground_blocks_only_when_disallowed() {
        let gates = SimGates {
            enabled: true,
            sim_running: true,
            sim_paused: false,
            on_ground: true,
        };
        assert!(!save_permitted(gates, true, false));
        assert!(save_permitted(gates, true, true));
    }
}
