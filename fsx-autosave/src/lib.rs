//! FSX AutoSave client.
//!
//! `AutosaveApp` carries all behavior and is free of vendor and Win32 types,
//! so unit tests drive it through `MockSimConnect`. The Windows-only `pump`
//! module owns the message-only window the vendor library needs and nothing
//! else.

pub mod app;
pub mod options;
pub mod shim;

#[cfg(all(windows, not(test)))]
pub mod pump;

// Raw SimConnect extern declarations — only needed for production builds.
// Resolved against the SimConnect import library at link time.
#[cfg(all(windows, not(test)))]
pub(crate) mod simconnect_sys {
    #![allow(non_snake_case, non_camel_case_types, dead_code)]

    use std::ffi::{c_char, c_void};

    pub type HANDLE = *mut c_void;
    pub type HRESULT = i32;

    // SIMCONNECT_RECV_ID values the client dispatches on.
    pub const RECV_ID_QUIT: u32 = 3;
    pub const RECV_ID_EVENT: u32 = 4;
    pub const RECV_ID_SIMOBJECT_DATA: u32 = 8;

    pub const SIMCONNECT_OBJECT_ID_USER: u32 = 0;
    pub const SIMCONNECT_STATE_OFF: u32 = 0;
    pub const SIMCONNECT_STATE_ON: u32 = 1;
    pub const SIMCONNECT_PERIOD_SECOND: u32 = 4;
    pub const SIMCONNECT_DATATYPE_INT32: u32 = 1;
    pub const SIMCONNECT_DATA_REQUEST_FLAG_CHANGED: u32 = 1;
    pub const SIMCONNECT_UNUSED: u32 = 0xFFFF_FFFF;

    #[repr(C)]
    pub struct SIMCONNECT_RECV {
        pub dwSize: u32,
        pub dwVersion: u32,
        pub dwID: u32,
    }

    #[repr(C)]
    pub struct SIMCONNECT_RECV_EVENT {
        pub base: SIMCONNECT_RECV,
        pub uGroupID: u32,
        pub uEventID: u32,
        pub dwData: u32,
    }

    #[repr(C)]
    pub struct SIMCONNECT_RECV_SIMOBJECT_DATA {
        pub base: SIMCONNECT_RECV,
        pub dwRequestID: u32,
        pub dwObjectID: u32,
        pub dwDefineID: u32,
        pub dwFlags: u32,
        pub dwentrynumber: u32,
        pub dwoutof: u32,
        pub dwDefineCount: u32,
        /// First DWORD of the data blob; our only definition is one Int32.
        pub dwData: u32,
    }

    #[link(name = "SimConnect")]
    extern "C" {
        pub fn SimConnect_Open(
            phSimConnect: *mut HANDLE,
            szName: *const c_char,
            hWnd: *mut c_void,
            UserEventWin32: u32,
            hEventHandle: *mut c_void,
            ConfigIndex: u32,
        ) -> HRESULT;
        pub fn SimConnect_Close(hSimConnect: HANDLE) -> HRESULT;
        pub fn SimConnect_SubscribeToSystemEvent(
            hSimConnect: HANDLE,
            EventID: u32,
            SystemEventName: *const c_char,
        ) -> HRESULT;
        pub fn SimConnect_SetSystemEventState(
            hSimConnect: HANDLE,
            EventID: u32,
            dwState: u32,
        ) -> HRESULT;
        pub fn SimConnect_MenuAddItem(
            hSimConnect: HANDLE,
            szMenuItem: *const c_char,
            MenuEventID: u32,
            dwData: u32,
        ) -> HRESULT;
        pub fn SimConnect_MenuAddSubItem(
            hSimConnect: HANDLE,
            MenuEventID: u32,
            szMenuItem: *const c_char,
            SubMenuEventID: u32,
            dwData: u32,
        ) -> HRESULT;
        pub fn SimConnect_AddToDataDefinition(
            hSimConnect: HANDLE,
            DefineID: u32,
            DatumName: *const c_char,
            UnitsName: *const c_char,
            DatumType: u32,
            fEpsilon: f32,
            DatumID: u32,
        ) -> HRESULT;
        pub fn SimConnect_RequestDataOnSimObject(
            hSimConnect: HANDLE,
            RequestID: u32,
            DefineID: u32,
            ObjectID: u32,
            Period: u32,
            Flags: u32,
            origin: u32,
            interval: u32,
            limit: u32,
        ) -> HRESULT;
        pub fn SimConnect_GetNextDispatch(
            hSimConnect: HANDLE,
            ppData: *mut *mut SIMCONNECT_RECV,
            pcbData: *mut u32,
        ) -> HRESULT;
        pub fn SimConnect_FlightSave(
            hSimConnect: HANDLE,
            szFileName: *const c_char,
            szTitle: *const c_char,
            szDescription: *const c_char,
            Flags: u32,
        ) -> HRESULT;
    }
}
