//! SimConnect abstraction layer.
//!
//! All vendor calls go through the `SimConnectApi` trait so that unit tests
//! can substitute `MockSimConnect` without a running simulator.

use std::fmt;
use std::sync::{Arc, Mutex};

// ── Client event IDs ─────────────────────────────────────────────────────────

/// Client-side event IDs registered with the simulator. The discriminants are
/// the raw IDs that come back in vendor event messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ClientEvent {
    SimStart    = 0,
    SimStop     = 1,
    SimPause    = 2,
    Menu        = 3,
    MenuToggle  = 4,
    MenuOptions = 5,
}

impl ClientEvent {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::SimStart),
            1 => Some(Self::SimStop),
            2 => Some(Self::SimPause),
            3 => Some(Self::Menu),
            4 => Some(Self::MenuToggle),
            5 => Some(Self::MenuOptions),
            _ => None,
        }
    }
}

/// Request ID of the on-ground data subscription.
pub const REQUEST_ON_GROUND: u32 = 0;
/// Data-definition ID of the on-ground subscription.
pub const DEFINE_ON_GROUND: u32 = 0;

// ── Decoded events ───────────────────────────────────────────────────────────

/// A vendor message decoded into the subset the client reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    SimStart,
    SimStop,
    Paused(bool),
    MenuToggle,
    MenuOptions,
    OnGround(bool),
    Quit,
}

/// Map a raw (event id, data) pair from an event message to a [`SimEvent`].
/// The top-level menu item itself never fires, only its sub items do. Pause
/// carries 1 = paused, 0 = unpaused; anything else leaves state untouched.
pub fn decode_client_event(event_id: u32, data: u32) -> Option<SimEvent> {
    match ClientEvent::from_u32(event_id)? {
        ClientEvent::SimStart    => Some(SimEvent::SimStart),
        ClientEvent::SimStop     => Some(SimEvent::SimStop),
        ClientEvent::SimPause    => match data {
            0 => Some(SimEvent::Paused(false)),
            1 => Some(SimEvent::Paused(true)),
            _ => None,
        },
        ClientEvent::MenuToggle  => Some(SimEvent::MenuToggle),
        ClientEvent::MenuOptions => Some(SimEvent::MenuOptions),
        ClientEvent::Menu        => None,
    }
}

// ── SimConnectError ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SimConnectError {
    /// `SimConnect_Open` failed — the simulator is probably not running.
    OpenFailed(i32),
    /// Any other vendor call returned a failure HRESULT.
    Call { func: &'static str, hr: i32 },
}

impl fmt::Display for SimConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed(hr) => {
                write!(f, "could not connect to the simulator (HRESULT {hr:#010x})")
            }
            Self::Call { func, hr } => write!(f, "{func} failed (HRESULT {hr:#010x})"),
        }
    }
}

impl std::error::Error for SimConnectError {}

pub type ShimResult<T> = Result<T, SimConnectError>;

// ── Trait ────────────────────────────────────────────────────────────────────

/// Abstraction over every SimConnect operation the client uses.
///
/// `Send + Sync` so the trait object can live behind the global app lock.
pub trait SimConnectApi: Send + Sync {
    fn subscribe_system_event(&self, event: ClientEvent, name: &str) -> ShimResult<()>;
    fn set_system_event_state(&self, event: ClientEvent, on: bool) -> ShimResult<()>;
    fn menu_add_item(&self, title: &str, event: ClientEvent) -> ShimResult<()>;
    fn menu_add_sub_item(
        &self,
        parent: ClientEvent,
        title: &str,
        event: ClientEvent,
    ) -> ShimResult<()>;
    /// Register the "SIM ON GROUND" variable and ask for once-a-second
    /// updates, delivered only when the value changes.
    fn request_on_ground_updates(&self) -> ShimResult<()>;
    fn flight_save(&self, path: &str, title: &str, description: &str) -> ShimResult<()>;
    /// Drain and decode every vendor message queued since the last call.
    fn poll_events(&self) -> Vec<SimEvent>;
}

// Tests hold on to the mock while the app owns a boxed clone of the Arc.
impl<T: SimConnectApi> SimConnectApi for Arc<T> {
    fn subscribe_system_event(&self, event: ClientEvent, name: &str) -> ShimResult<()> {
        (**self).subscribe_system_event(event, name)
    }
    fn set_system_event_state(&self, event: ClientEvent, on: bool) -> ShimResult<()> {
        (**self).set_system_event_state(event, on)
    }
    fn menu_add_item(&self, title: &str, event: ClientEvent) -> ShimResult<()> {
        (**self).menu_add_item(title, event)
    }
    fn menu_add_sub_item(
        &self,
        parent: ClientEvent,
        title: &str,
        event: ClientEvent,
    ) -> ShimResult<()> {
        (**self).menu_add_sub_item(parent, title, event)
    }
    fn request_on_ground_updates(&self) -> ShimResult<()> {
        (**self).request_on_ground_updates()
    }
    fn flight_save(&self, path: &str, title: &str, description: &str) -> ShimResult<()> {
        (**self).flight_save(path, title, description)
    }
    fn poll_events(&self) -> Vec<SimEvent> {
        (**self).poll_events()
    }
}

// ── MockSimConnect ───────────────────────────────────────────────────────────

struct MockInner {
    subscriptions: Vec<(ClientEvent, String)>,
    event_states: Vec<(ClientEvent, bool)>,
    menu_items: Vec<String>,
    on_ground_requested: bool,
    /// recorded flight_save calls: (path, description)
    flight_save_log: Vec<(String, String)>,
    queued: Vec<SimEvent>,
    fail_flight_save: bool,
}

/// Test implementation — records calls, replays queued events.
pub struct MockSimConnect {
    inner: Mutex<MockInner>,
}

impl MockSimConnect {
    pub fn new() -> Self {
        MockSimConnect {
            inner: Mutex::new(MockInner {
                subscriptions:       Vec::new(),
                event_states:        Vec::new(),
                menu_items:          Vec::new(),
                on_ground_requested: false,
                flight_save_log:     Vec::new(),
                queued:              Vec::new(),
                fail_flight_save:    false,
            }),
        }
    }

    /// Queue an event for the next `poll_events` call.
    pub fn push_event(&self, event: SimEvent) {
        self.inner.lock().unwrap().queued.push(event);
    }

    /// Make every subsequent `flight_save` call fail.
    pub fn set_fail_flight_save(&self, fail: bool) {
        self.inner.lock().unwrap().fail_flight_save = fail;
    }

    /// Snapshot the recorded flight_save calls (path, description).
    pub fn flight_saves(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().flight_save_log.clone()
    }

    /// Snapshot the recorded system-event subscriptions.
    pub fn subscriptions(&self) -> Vec<(ClientEvent, String)> {
        self.inner.lock().unwrap().subscriptions.clone()
    }

    /// Snapshot the registered menu item titles, parents first.
    pub fn menu_items(&self) -> Vec<String> {
        self.inner.lock().unwrap().menu_items.clone()
    }

    /// Snapshot the recorded `set_system_event_state` calls.
    pub fn event_states(&self) -> Vec<(ClientEvent, bool)> {
        self.inner.lock().unwrap().event_states.clone()
    }

    pub fn on_ground_requested(&self) -> bool {
        self.inner.lock().unwrap().on_ground_requested
    }
}

impl Default for MockSimConnect {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConnectApi for MockSimConnect {
    fn subscribe_system_event(&self, event: ClientEvent, name: &str) -> ShimResult<()> {
        self.inner.lock().unwrap().subscriptions.push((event, name.to_string()));
        Ok(())
    }

    fn set_system_event_state(&self, event: ClientEvent, on: bool) -> ShimResult<()> {
        self.inner.lock().unwrap().event_states.push((event, on));
        Ok(())
    }

    fn menu_add_item(&self, title: &str, _event: ClientEvent) -> ShimResult<()> {
        self.inner.lock().unwrap().menu_items.push(title.to_string());
        Ok(())
    }

    fn menu_add_sub_item(
        &self,
        _parent: ClientEvent,
        title: &str,
        _event: ClientEvent,
    ) -> ShimResult<()> {
        self.inner.lock().unwrap().menu_items.push(title.to_string());
        Ok(())
    }

    fn request_on_ground_updates(&self) -> ShimResult<()> {
        self.inner.lock().unwrap().on_ground_requested = true;
        Ok(())
    }

    fn flight_save(&self, path: &str, _title: &str, description: &str) -> ShimResult<()> {
        let mut g = self.inner.lock().unwrap();
        if g.fail_flight_save {
            return Err(SimConnectError::Call { func: "SimConnect_FlightSave", hr: -1 });
        }
        g.flight_save_log.push((path.to_string(), description.to_string()));
        Ok(())
    }

    fn poll_events(&self) -> Vec<SimEvent> {
        std::mem::take(&mut self.inner.lock().unwrap().queued)
    }
}

// ── RealSimConnect — only compiled in production (not test) builds ───────────

#[cfg(all(windows, not(test)))]
pub use real::RealSimConnect;

#[cfg(all(windows, not(test)))]
mod real {
    use std::ffi::{c_void, CString};

    use super::{
        decode_client_event, ClientEvent, ShimResult, SimConnectApi, SimConnectError, SimEvent,
        DEFINE_ON_GROUND, REQUEST_ON_GROUND,
    };
    use crate::simconnect_sys as sys;

    /// Production implementation — wraps raw SimConnect extern calls.
    ///
    /// The handle is only ever touched from the message-pump thread; the
    /// `Send + Sync` bound exists for the global app lock.
    pub struct RealSimConnect {
        handle: sys::HANDLE,
    }

    unsafe impl Send for RealSimConnect {}
    unsafe impl Sync for RealSimConnect {}

    fn check(func: &'static str, hr: sys::HRESULT) -> ShimResult<()> {
        if hr < 0 {
            Err(SimConnectError::Call { func, hr })
        } else {
            Ok(())
        }
    }

    fn c_string(s: &str) -> CString {
        // Vendor strings never contain interior NULs; replace rather than fail.
        CString::new(s).unwrap_or_else(|_| CString::new(s.replace('\0', "_")).unwrap_or_default())
    }

    impl RealSimConnect {
        /// Open a connection, registering `hwnd` + `user_msg` as the window
        /// message target the vendor posts to when data is pending.
        pub fn open(name: &str, hwnd: *mut c_void, user_msg: u32) -> ShimResult<Self> {
            let c_name = c_string(name);
            let mut handle: sys::HANDLE = std::ptr::null_mut();
            let hr = unsafe {
                sys::SimConnect_Open(
                    &mut handle,
                    c_name.as_ptr(),
                    hwnd,
                    user_msg,
                    std::ptr::null_mut(),
                    0,
                )
            };
            if hr < 0 || handle.is_null() {
                return Err(SimConnectError::OpenFailed(hr));
            }
            Ok(RealSimConnect { handle })
        }
    }

    impl Drop for RealSimConnect {
        fn drop(&mut self) {
            unsafe { sys::SimConnect_Close(self.handle) };
        }
    }

    impl SimConnectApi for RealSimConnect {
        fn subscribe_system_event(&self, event: ClientEvent, name: &str) -> ShimResult<()> {
            let c_name = c_string(name);
            check("SimConnect_SubscribeToSystemEvent", unsafe {
                sys::SimConnect_SubscribeToSystemEvent(self.handle, event as u32, c_name.as_ptr())
            })
        }

        fn set_system_event_state(&self, event: ClientEvent, on: bool) -> ShimResult<()> {
            let state = if on { sys::SIMCONNECT_STATE_ON } else { sys::SIMCONNECT_STATE_OFF };
            check("SimConnect_SetSystemEventState", unsafe {
                sys::SimConnect_SetSystemEventState(self.handle, event as u32, state)
            })
        }

        fn menu_add_item(&self, title: &str, event: ClientEvent) -> ShimResult<()> {
            let c_title = c_string(title);
            check("SimConnect_MenuAddItem", unsafe {
                sys::SimConnect_MenuAddItem(self.handle, c_title.as_ptr(), event as u32, 0)
            })
        }

        fn menu_add_sub_item(
            &self,
            parent: ClientEvent,
            title: &str,
            event: ClientEvent,
        ) -> ShimResult<()> {
            let c_title = c_string(title);
            check("SimConnect_MenuAddSubItem", unsafe {
                sys::SimConnect_MenuAddSubItem(
                    self.handle,
                    parent as u32,
                    c_title.as_ptr(),
                    event as u32,
                    0,
                )
            })
        }

        fn request_on_ground_updates(&self) -> ShimResult<()> {
            let datum = c_string("SIM ON GROUND");
            let units = c_string("Bool");
            check("SimConnect_AddToDataDefinition", unsafe {
                sys::SimConnect_AddToDataDefinition(
                    self.handle,
                    DEFINE_ON_GROUND,
                    datum.as_ptr(),
                    units.as_ptr(),
                    sys::SIMCONNECT_DATATYPE_INT32,
                    0.0,
                    sys::SIMCONNECT_UNUSED,
                )
            })?;
            check("SimConnect_RequestDataOnSimObject", unsafe {
                sys::SimConnect_RequestDataOnSimObject(
                    self.handle,
                    REQUEST_ON_GROUND,
                    DEFINE_ON_GROUND,
                    sys::SIMCONNECT_OBJECT_ID_USER,
                    sys::SIMCONNECT_PERIOD_SECOND,
                    sys::SIMCONNECT_DATA_REQUEST_FLAG_CHANGED,
                    0,
                    0,
                    0,
                )
            })
        }

        fn flight_save(&self, path: &str, title: &str, description: &str) -> ShimResult<()> {
            let c_path = c_string(path);
            let c_title = c_string(title);
            let c_desc = c_string(description);
            check("SimConnect_FlightSave", unsafe {
                sys::SimConnect_FlightSave(
                    self.handle,
                    c_path.as_ptr(),
                    c_title.as_ptr(),
                    c_desc.as_ptr(),
                    0,
                )
            })
        }

        fn poll_events(&self) -> Vec<SimEvent> {
            let mut events = Vec::new();
            loop {
                let mut recv: *mut sys::SIMCONNECT_RECV = std::ptr::null_mut();
                let mut size: u32 = 0;
                let hr =
                    unsafe { sys::SimConnect_GetNextDispatch(self.handle, &mut recv, &mut size) };
                // GetNextDispatch fails with E_FAIL once the queue is empty.
                if hr < 0 || recv.is_null() {
                    break;
                }
                match unsafe { (*recv).dwID } {
                    sys::RECV_ID_EVENT => {
                        let ev = unsafe { &*(recv as *const sys::SIMCONNECT_RECV_EVENT) };
                        if let Some(decoded) = decode_client_event(ev.uEventID, ev.dwData) {
                            events.push(decoded);
                        }
                    }
                    sys::RECV_ID_SIMOBJECT_DATA => {
                        let data =
                            unsafe { &*(recv as *const sys::SIMCONNECT_RECV_SIMOBJECT_DATA) };
                        if data.dwRequestID == REQUEST_ON_GROUND {
                            events.push(SimEvent::OnGround(data.dwData != 0));
                        }
                    }
                    sys::RECV_ID_QUIT => events.push(SimEvent::Quit),
                    _ => {}
                }
            }
            events
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_maps_every_registered_event() {
        assert_eq!(decode_client_event(0, 0), Some(SimEvent::SimStart));
        assert_eq!(decode_client_event(1, 0), Some(SimEvent::SimStop));
        assert_eq!(decode_client_event(2, 1), Some(SimEvent::Paused(true)));
        assert_eq!(decode_client_event(2, 0), Some(SimEvent::Paused(false)));
        assert_eq!(decode_client_event(4, 0), Some(SimEvent::MenuToggle));
        assert_eq!(decode_client_event(5, 0), Some(SimEvent::MenuOptions));
    }

    #[test]
    fn decode_drops_the_parent_menu_and_unknown_ids() {
        assert_eq!(decode_client_event(3, 0), None);
        assert_eq!(decode_client_event(99, 0), None);
    }

    #[test]
    fn decode_ignores_pause_payloads_other_than_zero_and_one() {
        assert_eq!(decode_client_event(2, 2), None);
        assert_eq!(decode_client_event(2, u32::MAX), None);
    }

    #[test]
    fn mock_records_and_replays() {
        let mock = MockSimConnect::new();
        mock.push_event(SimEvent::SimStart);
        mock.push_event(SimEvent::Paused(true));

        assert_eq!(
            mock.poll_events(),
            vec![SimEvent::SimStart, SimEvent::Paused(true)]
        );
        assert!(mock.poll_events().is_empty(), "queue drains on poll");

        mock.flight_save("FSXAutoSave\\AutoSave_X", "AutoSave_X", "desc").unwrap();
        assert_eq!(mock.flight_saves().len(), 1);

        mock.set_fail_flight_save(true);
        assert!(mock.flight_save("p", "t", "d").is_err());
    }
}
