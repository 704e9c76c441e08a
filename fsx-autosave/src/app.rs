//! AutosaveApp — the client's state machine.
//!
//! This module is free of SimConnect and Win32 types so it can be fully
//! unit-tested via the `MockSimConnect` shim.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use autosave_core::{policy, rotation, store, Settings};
use chrono::Local;

use crate::shim::{ClientEvent, ShimResult, SimConnectApi, SimEvent};

/// Client name announced to the simulator and used as menu title.
pub const CLIENT_NAME: &str = "FSX AutoSave";

const SAVE_DESCRIPTION: &str = "FSX AutoSave autosaved flight";

// ── Pump interaction ─────────────────────────────────────────────────────────

/// A side effect the message pump must perform on the app's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpRequest {
    /// Spawn the settings dialog process.
    OpenOptions,
    /// The simulator quit; tear the window down.
    Shutdown,
}

/// What a timer tick did. The pump restarts its timer when `interval_changed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Sim-relative path of the issued save, if the gate allowed one.
    pub saved: Option<String>,
    /// Autosave files deleted by rotation.
    pub pruned: usize,
    pub interval_changed: bool,
}

// ── AutosaveApp ──────────────────────────────────────────────────────────────

pub struct AutosaveApp {
    sim: Box<dyn SimConnectApi>,
    settings: Settings,
    settings_path: Option<PathBuf>,
    /// Modification time of the settings file at the last (re)load.
    settings_seen: Option<SystemTime>,
    /// Absolute directory rotation prunes; `None` skips pruning.
    autosave_dir: Option<PathBuf>,
    save_enabled: bool,
    sim_running: bool,
    sim_paused: bool,
    on_ground: bool,
}

impl AutosaveApp {
    pub fn new(
        sim: Box<dyn SimConnectApi>,
        settings: Settings,
        settings_path: Option<PathBuf>,
        autosave_dir: Option<PathBuf>,
    ) -> Self {
        let settings_seen = settings_path.as_deref().and_then(store::modified);
        AutosaveApp {
            sim,
            save_enabled: settings.autosave_on_start,
            settings,
            settings_path,
            settings_seen,
            autosave_dir,
            sim_running: false,
            sim_paused: false,
            on_ground: false,
        }
    }

    /// Register the in-sim menu, the system events and the on-ground
    /// subscription. Call once after opening the connection.
    pub fn setup(&self) -> ShimResult<()> {
        self.sim.subscribe_system_event(ClientEvent::SimStart, "SimStart")?;
        self.sim.subscribe_system_event(ClientEvent::SimStop, "SimStop")?;
        self.sim.subscribe_system_event(ClientEvent::SimPause, "Pause")?;
        for event in [ClientEvent::SimStart, ClientEvent::SimStop, ClientEvent::SimPause] {
            self.sim.set_system_event_state(event, true)?;
        }

        self.sim.menu_add_item(CLIENT_NAME, ClientEvent::Menu)?;
        self.sim.menu_add_sub_item(ClientEvent::Menu, "Enable/Disable", ClientEvent::MenuToggle)?;
        self.sim.menu_add_sub_item(ClientEvent::Menu, "Options", ClientEvent::MenuOptions)?;

        self.sim.request_on_ground_updates()?;
        log::info!("SimConnect initialized");
        Ok(())
    }

    pub fn save_interval(&self) -> Duration {
        self.settings.save_interval()
    }

    pub fn autosave_enabled(&self) -> bool {
        self.save_enabled
    }

    // ── Vendor message handling ──────────────────────────────────────────────

    /// Drain vendor messages; returns the side effects for the pump.
    pub fn pump_sim_messages(&mut self) -> Vec<PumpRequest> {
        let mut requests = Vec::new();
        for event in self.sim.poll_events() {
            if let Some(request) = self.handle_event(event) {
                requests.push(request);
            }
        }
        requests
    }

    fn handle_event(&mut self, event: SimEvent) -> Option<PumpRequest> {
        match event {
            SimEvent::SimStart => {
                log::info!("sim started");
                self.sim_running = true;
                None
            }
            SimEvent::SimStop => {
                log::info!("sim stopped");
                self.sim_running = false;
                None
            }
            SimEvent::Paused(paused) => {
                log::info!("sim {}", if paused { "paused" } else { "unpaused" });
                self.sim_paused = paused;
                None
            }
            SimEvent::OnGround(on_ground) => {
                self.on_ground = on_ground;
                None
            }
            SimEvent::MenuToggle => {
                self.save_enabled = !self.save_enabled;
                log::info!(
                    "autosave {}",
                    if self.save_enabled { "enabled" } else { "disabled" }
                );
                None
            }
            SimEvent::MenuOptions => Some(PumpRequest::OpenOptions),
            SimEvent::Quit => {
                log::info!("simulator quit");
                Some(PumpRequest::Shutdown)
            }
        }
    }

    // ── Timer tick ───────────────────────────────────────────────────────────

    /// Periodic tick: pick up settings edits, then save if the gate allows.
    ///
    /// A flight-save failure comes back as `Err` so the pump can surface it;
    /// all tracked state stays valid across the failure.
    pub fn timer_tick(&mut self) -> ShimResult<TickOutcome> {
        let mut outcome = TickOutcome {
            interval_changed: self.reload_settings_if_changed(),
            ..TickOutcome::default()
        };

        let gates = policy::SimGates {
            enabled:     self.save_enabled,
            sim_running: self.sim_running,
            sim_paused:  self.sim_paused,
            on_ground:   self.on_ground,
        };
        if !policy::save_permitted(
            gates,
            self.settings.save_while_paused,
            self.settings.save_while_on_ground,
        ) {
            return Ok(outcome);
        }

        let stem = rotation::save_stem(Local::now().naive_local());
        let rel_path = rotation::sim_relative_path(&stem);
        self.sim.flight_save(&rel_path, &stem, SAVE_DESCRIPTION)?;
        log::info!("flight saved: {rel_path}");
        outcome.saved = Some(rel_path);

        if let Some(dir) = &self.autosave_dir {
            match rotation::prune_old_saves(dir, self.settings.max_saves_to_keep) {
                Ok(removed) => outcome.pruned = removed,
                Err(e) => log::warn!("autosave pruning failed: {e}"),
            }
        }
        Ok(outcome)
    }

    /// Re-read the settings file when its mtime moved (the dialog runs in a
    /// separate process). A runtime Enable/Disable toggle survives a reload.
    /// Returns whether the save interval changed.
    fn reload_settings_if_changed(&mut self) -> bool {
        let Some(path) = self.settings_path.clone() else {
            return false;
        };
        let mtime = store::modified(&path);
        if mtime.is_none() || mtime == self.settings_seen {
            return false;
        }
        self.settings_seen = mtime;

        let old_interval = self.settings.save_interval_minutes;
        self.settings = store::load(&path);
        log::info!("settings reloaded: {:?}", self.settings);
        self.settings.save_interval_minutes != old_interval
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shim::MockSimConnect;
    use std::fs;
    use std::sync::Arc;

    fn make_app(mock: &Arc<MockSimConnect>, settings: Settings) -> AutosaveApp {
        AutosaveApp::new(Box::new(Arc::clone(mock)), settings, None, None)
    }

    /// Settings whose gate only passes while running and airborne.
    fn strict_settings() -> Settings {
        Settings {
            save_while_paused: false,
            save_while_on_ground: false,
            autosave_on_start: true,
            ..Settings::default()
        }
    }

    fn airborne(app: &mut AutosaveApp, mock: &Arc<MockSimConnect>) {
        mock.push_event(SimEvent::SimStart);
        mock.push_event(SimEvent::OnGround(false));
        app.pump_sim_messages();
    }

    #[test]
    fn setup_registers_menu_events_and_ground_subscription() {
        let mock = Arc::new(MockSimConnect::new());
        let app = make_app(&mock, Settings::default());
        app.setup().unwrap();

        let names: Vec<String> =
            mock.subscriptions().into_iter().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["SimStart", "SimStop", "Pause"]);
        assert!(
            mock.event_states().iter().all(|&(_, on)| on),
            "every subscription is switched on"
        );
        assert_eq!(mock.event_states().len(), 3);
        assert_eq!(
            mock.menu_items(),
            vec!["FSX AutoSave", "Enable/Disable", "Options"]
        );
        assert!(mock.on_ground_requested());
    }

    #[test]
    fn menu_toggle_flips_the_enabled_flag() {
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, strict_settings());
        assert!(app.autosave_enabled(), "autosave_on_start arms the client");

        mock.push_event(SimEvent::MenuToggle);
        assert!(app.pump_sim_messages().is_empty());
        assert!(!app.autosave_enabled());

        mock.push_event(SimEvent::MenuToggle);
        app.pump_sim_messages();
        assert!(app.autosave_enabled());
    }

    #[test]
    fn autosave_on_start_false_leaves_the_client_disarmed() {
        let mock = Arc::new(MockSimConnect::new());
        let settings = Settings { autosave_on_start: false, ..strict_settings() };
        let mut app = make_app(&mock, settings);
        assert!(!app.autosave_enabled());

        airborne(&mut app, &mock);
        let outcome = app.timer_tick().unwrap();
        assert_eq!(outcome.saved, None);
    }

    #[test]
    fn tick_saves_when_running_and_airborne() {
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, strict_settings());
        airborne(&mut app, &mock);

        let outcome = app.timer_tick().unwrap();
        let saved = outcome.saved.expect("gate should have allowed a save");
        assert!(
            saved.starts_with("FSXAutoSave\\AutoSave_"),
            "unexpected save path: {saved}"
        );
        assert_eq!(mock.flight_saves().len(), 1);
    }

    #[test]
    fn no_save_before_sim_start() {
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, strict_settings());

        assert_eq!(app.timer_tick().unwrap().saved, None);
        assert!(mock.flight_saves().is_empty());
    }

    #[test]
    fn sim_stop_blocks_further_saves() {
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, strict_settings());
        airborne(&mut app, &mock);
        app.timer_tick().unwrap();

        mock.push_event(SimEvent::SimStop);
        app.pump_sim_messages();
        assert_eq!(app.timer_tick().unwrap().saved, None);
        assert_eq!(mock.flight_saves().len(), 1);
    }

    #[test]
    fn pause_blocks_saves_unless_allowed() {
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, strict_settings());
        airborne(&mut app, &mock);
        mock.push_event(SimEvent::Paused(true));
        app.pump_sim_messages();

        assert_eq!(app.timer_tick().unwrap().saved, None);

        let permissive = Settings { save_while_paused: true, ..strict_settings() };
        let mut app = make_app(&mock, permissive);
        airborne(&mut app, &mock);
        mock.push_event(SimEvent::Paused(true));
        app.pump_sim_messages();

        assert!(app.timer_tick().unwrap().saved.is_some());
    }

    #[test]
    fn ground_blocks_saves_unless_allowed() {
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, strict_settings());
        mock.push_event(SimEvent::SimStart);
        mock.push_event(SimEvent::OnGround(true));
        app.pump_sim_messages();

        assert_eq!(app.timer_tick().unwrap().saved, None);

        let permissive = Settings { save_while_on_ground: true, ..strict_settings() };
        let mut app = make_app(&mock, permissive);
        mock.push_event(SimEvent::SimStart);
        mock.push_event(SimEvent::OnGround(true));
        app.pump_sim_messages();

        assert!(app.timer_tick().unwrap().saved.is_some());
    }

    #[test]
    fn options_event_requests_the_dialog() {
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, Settings::default());
        mock.push_event(SimEvent::MenuOptions);
        assert_eq!(app.pump_sim_messages(), vec![PumpRequest::OpenOptions]);
    }

    #[test]
    fn quit_event_requests_shutdown() {
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, Settings::default());
        mock.push_event(SimEvent::Quit);
        assert_eq!(app.pump_sim_messages(), vec![PumpRequest::Shutdown]);
    }

    #[test]
    fn save_failure_surfaces_without_corrupting_state() {
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, strict_settings());
        airborne(&mut app, &mock);

        mock.set_fail_flight_save(true);
        assert!(app.timer_tick().is_err());

        mock.set_fail_flight_save(false);
        assert!(app.timer_tick().unwrap().saved.is_some(), "next tick recovers");
    }

    #[test]
    fn save_failure_leaves_event_handling_responsive() {
        // While the pump shows the failure box, vendor messages keep arriving
        // on the same thread; the app must be free for them immediately.
        let mock = Arc::new(MockSimConnect::new());
        let mut app = make_app(&mock, strict_settings());
        airborne(&mut app, &mock);

        mock.set_fail_flight_save(true);
        let interval = app.save_interval();
        assert!(app.timer_tick().is_err());

        assert_eq!(app.save_interval(), interval);
        mock.push_event(SimEvent::Paused(true));
        mock.push_event(SimEvent::MenuOptions);
        assert_eq!(app.pump_sim_messages(), vec![PumpRequest::OpenOptions]);
    }

    #[test]
    fn settings_edit_changes_the_interval_on_the_next_tick() {
        let dir = std::env::temp_dir()
            .join(format!("fsx-autosave-app-reload-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("settings.json");

        let mock = Arc::new(MockSimConnect::new());
        let mut app = AutosaveApp::new(
            Box::new(Arc::clone(&mock)),
            strict_settings(),
            Some(path.clone()),
            None,
        );

        // No file on disk yet — nothing to pick up.
        assert!(!app.timer_tick().unwrap().interval_changed);

        let edited = Settings { save_interval_minutes: 42, ..strict_settings() };
        store::save(&path, &edited).unwrap();

        let outcome = app.timer_tick().unwrap();
        assert!(outcome.interval_changed);
        assert_eq!(app.save_interval(), Duration::from_secs(42 * 60));

        // Unchanged file does not re-trigger.
        assert!(!app.timer_tick().unwrap().interval_changed);
    }

    #[test]
    fn reload_preserves_a_runtime_toggle() {
        let dir = std::env::temp_dir()
            .join(format!("fsx-autosave-app-toggle-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("settings.json");

        let mock = Arc::new(MockSimConnect::new());
        let mut app = AutosaveApp::new(
            Box::new(Arc::clone(&mock)),
            strict_settings(),
            Some(path.clone()),
            None,
        );

        mock.push_event(SimEvent::MenuToggle);
        app.pump_sim_messages();
        assert!(!app.autosave_enabled());

        store::save(&path, &strict_settings()).unwrap();
        app.timer_tick().unwrap();
        assert!(!app.autosave_enabled(), "reload must not re-arm the client");
    }

    #[test]
    fn tick_prunes_the_autosave_directory() {
        let dir = std::env::temp_dir()
            .join(format!("fsx-autosave-app-prune-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for n in 0..3 {
            fs::write(dir.join(format!("AutoSave_2020-01-0{}_00-00-00.fxml", n + 1)), b"x")
                .unwrap();
        }

        let mock = Arc::new(MockSimConnect::new());
        let settings = Settings { max_saves_to_keep: 2, ..strict_settings() };
        let mut app = AutosaveApp::new(
            Box::new(Arc::clone(&mock)),
            settings,
            None,
            Some(dir.clone()),
        );
        airborne(&mut app, &mock);

        let outcome = app.timer_tick().unwrap();
        assert!(outcome.saved.is_some());
        assert_eq!(outcome.pruned, 1, "three stems on disk, capacity two");
    }
}
