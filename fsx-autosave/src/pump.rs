//! Win32 message pump hosting the SimConnect callback window.
//!
//! The vendor library delivers its messages by posting `WM_USER_SIMCONNECT`
//! to a window we own, so a message-only window exists for that purpose and
//! nothing else. The save timer is a plain `SetTimer` on the same window, so
//! every callback runs on this one thread.

use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use anyhow::{bail, Context, Result};
use autosave_core::{rotation, Settings};

use crate::app::{AutosaveApp, PumpRequest, CLIENT_NAME};
use crate::shim::RealSimConnect;

/// Private window message SimConnect posts when data is pending.
pub const WM_USER_SIMCONNECT: u32 = 0x0402;

const SAVE_TIMER_ID: usize = 1;

static APP: OnceLock<Mutex<AutosaveApp>> = OnceLock::new();

// Raw user32/kernel32 declarations — the handful of calls a message-only
// window and its timer need.
#[allow(non_snake_case, non_camel_case_types, dead_code)]
mod sys {
    use std::ffi::c_void;

    pub type HWND = *mut c_void;
    pub type HINSTANCE = *mut c_void;
    pub type WPARAM = usize;
    pub type LPARAM = isize;
    pub type LRESULT = isize;

    pub const WM_DESTROY: u32 = 0x0002;
    pub const WM_TIMER: u32 = 0x0113;
    pub const MB_OK: u32 = 0x0000_0000;
    pub const MB_ICONERROR: u32 = 0x0000_0010;
    pub const MB_ICONWARNING: u32 = 0x0000_0030;
    /// Parent handle that makes `CreateWindowExW` produce a message-only window.
    pub const HWND_MESSAGE: HWND = -3isize as HWND;

    #[repr(C)]
    pub struct POINT {
        pub x: i32,
        pub y: i32,
    }

    #[repr(C)]
    pub struct MSG {
        pub hwnd: HWND,
        pub message: u32,
        pub wParam: WPARAM,
        pub lParam: LPARAM,
        pub time: u32,
        pub pt: POINT,
    }

    #[repr(C)]
    pub struct WNDCLASSW {
        pub style: u32,
        pub lpfnWndProc: Option<unsafe extern "system" fn(HWND, u32, WPARAM, LPARAM) -> LRESULT>,
        pub cbClsExtra: i32,
        pub cbWndExtra: i32,
        pub hInstance: HINSTANCE,
        pub hIcon: *mut c_void,
        pub hCursor: *mut c_void,
        pub hbrBackground: *mut c_void,
        pub lpszMenuName: *const u16,
        pub lpszClassName: *const u16,
    }

    #[link(name = "user32")]
    extern "system" {
        pub fn RegisterClassW(lpWndClass: *const WNDCLASSW) -> u16;
        pub fn CreateWindowExW(
            dwExStyle: u32,
            lpClassName: *const u16,
            lpWindowName: *const u16,
            dwStyle: u32,
            X: i32,
            Y: i32,
            nWidth: i32,
            nHeight: i32,
            hWndParent: HWND,
            hMenu: *mut c_void,
            hInstance: HINSTANCE,
            lpParam: *mut c_void,
        ) -> HWND;
        pub fn DefWindowProcW(hWnd: HWND, Msg: u32, wParam: WPARAM, lParam: LPARAM) -> LRESULT;
        pub fn DestroyWindow(hWnd: HWND) -> i32;
        pub fn GetMessageW(
            lpMsg: *mut MSG,
            hWnd: HWND,
            wMsgFilterMin: u32,
            wMsgFilterMax: u32,
        ) -> i32;
        pub fn TranslateMessage(lpMsg: *const MSG) -> i32;
        pub fn DispatchMessageW(lpMsg: *const MSG) -> LRESULT;
        pub fn PostQuitMessage(nExitCode: i32);
        pub fn SetTimer(
            hWnd: HWND,
            nIDEvent: usize,
            uElapse: u32,
            lpTimerFunc: *mut c_void,
        ) -> usize;
        pub fn KillTimer(hWnd: HWND, uIDEvent: usize) -> i32;
        pub fn MessageBoxW(
            hWnd: HWND,
            lpText: *const u16,
            lpCaption: *const u16,
            uType: u32,
        ) -> i32;
    }

    #[link(name = "kernel32")]
    extern "system" {
        pub fn GetModuleHandleW(lpModuleName: *const u16) -> HINSTANCE;
    }
}

fn wide(s: &str) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    std::ffi::OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

// ── Message boxes ────────────────────────────────────────────────────────────

fn message_box(text: &str, flags: u32) {
    let text_w = wide(text);
    let caption_w = wide(CLIENT_NAME);
    unsafe {
        sys::MessageBoxW(std::ptr::null_mut(), text_w.as_ptr(), caption_w.as_ptr(), flags);
    }
}

pub fn error_box(text: &str) {
    message_box(text, sys::MB_OK | sys::MB_ICONERROR);
}

pub fn warning_box(text: &str) {
    message_box(text, sys::MB_OK | sys::MB_ICONWARNING);
}

// ── Window + run loop ────────────────────────────────────────────────────────

fn create_message_window() -> Result<sys::HWND> {
    let class_name = wide("FsxAutoSaveMsgWindow");
    let window_name = wide(CLIENT_NAME);
    unsafe {
        let hinstance = sys::GetModuleHandleW(std::ptr::null());
        let wc = sys::WNDCLASSW {
            style: 0,
            lpfnWndProc: Some(wnd_proc),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: hinstance,
            hIcon: std::ptr::null_mut(),
            hCursor: std::ptr::null_mut(),
            hbrBackground: std::ptr::null_mut(),
            lpszMenuName: std::ptr::null(),
            lpszClassName: class_name.as_ptr(),
        };
        if sys::RegisterClassW(&wc) == 0 {
            bail!("RegisterClassW failed");
        }
        let hwnd = sys::CreateWindowExW(
            0,
            class_name.as_ptr(),
            window_name.as_ptr(),
            0,
            0,
            0,
            0,
            0,
            sys::HWND_MESSAGE,
            std::ptr::null_mut(),
            hinstance,
            std::ptr::null_mut(),
        );
        if hwnd.is_null() {
            bail!("CreateWindowExW failed");
        }
        Ok(hwnd)
    }
}

/// Open the SimConnect connection and run the message loop until the
/// simulator quits or the window dies.
pub fn run(settings: Settings, settings_path: Option<PathBuf>) -> Result<()> {
    let hwnd = create_message_window().context("failed to create the SimConnect callback window")?;

    let sim = match RealSimConnect::open(CLIENT_NAME, hwnd as *mut c_void, WM_USER_SIMCONNECT) {
        Ok(sim) => sim,
        Err(e) => {
            error_box("Please start the simulator before launching FSX AutoSave.");
            unsafe { sys::DestroyWindow(hwnd) };
            return Err(e).context("SimConnect_Open failed");
        }
    };

    let autosave_dir = rotation::autosave_dir();
    if let Some(dir) = &autosave_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let app = AutosaveApp::new(Box::new(sim), settings, settings_path, autosave_dir);
    let interval = app.save_interval();
    // Seed the global before registering anything so vendor messages that
    // arrive mid-setup already find the app.
    if APP.set(Mutex::new(app)).is_err() {
        bail!("message pump already running");
    }
    let setup_result = match APP.get().map(|cell| cell.lock()) {
        Some(Ok(app)) => app.setup(),
        _ => bail!("app state unavailable"),
    };
    if let Err(e) = setup_result {
        error_box(&format!("SimConnect setup failed: {e}"));
        unsafe { sys::DestroyWindow(hwnd) };
        return Err(e).context("SimConnect setup failed");
    }
    unsafe {
        sys::SetTimer(hwnd, SAVE_TIMER_ID, interval.as_millis() as u32, std::ptr::null_mut());
    }
    log::info!("autosave timer armed, every {}s", interval.as_secs());

    // Standard message loop; GetMessageW returns 0 on WM_QUIT, -1 on error.
    unsafe {
        let mut msg: sys::MSG = std::mem::zeroed();
        loop {
            match sys::GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) {
                0 => break,
                -1 => bail!("GetMessageW failed"),
                _ => {
                    sys::TranslateMessage(&msg);
                    sys::DispatchMessageW(&msg);
                }
            }
        }
    }
    log::info!("message pump stopped");
    Ok(())
}

// ── Callbacks ────────────────────────────────────────────────────────────────

unsafe extern "system" fn wnd_proc(
    hwnd: sys::HWND,
    msg: u32,
    wparam: sys::WPARAM,
    lparam: sys::LPARAM,
) -> sys::LRESULT {
    match msg {
        WM_USER_SIMCONNECT => {
            on_sim_message(hwnd);
            0
        }
        sys::WM_TIMER if wparam == SAVE_TIMER_ID => {
            on_timer(hwnd);
            0
        }
        sys::WM_DESTROY => {
            sys::KillTimer(hwnd, SAVE_TIMER_ID);
            sys::PostQuitMessage(0);
            0
        }
        _ => sys::DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn on_sim_message(hwnd: sys::HWND) {
    let Some(app) = APP.get() else { return };
    let requests = match app.lock() {
        Ok(mut app) => app.pump_sim_messages(),
        Err(_) => return,
    };
    for request in requests {
        match request {
            PumpRequest::OpenOptions => spawn_options_dialog(),
            PumpRequest::Shutdown => unsafe {
                sys::DestroyWindow(hwnd);
            },
        }
    }
}

fn on_timer(hwnd: sys::HWND) {
    let Some(app) = APP.get() else { return };
    // MessageBoxW runs a modal loop that dispatches this thread's queued
    // messages back into wnd_proc, so the app lock must be released before
    // any UI call.
    let result = match app.lock() {
        Ok(mut app) => app.timer_tick().map(|outcome| (outcome, app.save_interval())),
        Err(_) => return,
    };
    match result {
        Ok((outcome, interval)) => {
            if outcome.interval_changed {
                unsafe {
                    sys::KillTimer(hwnd, SAVE_TIMER_ID);
                    sys::SetTimer(
                        hwnd,
                        SAVE_TIMER_ID,
                        interval.as_millis() as u32,
                        std::ptr::null_mut(),
                    );
                }
                log::info!("save timer restarted, every {}s", interval.as_secs());
            }
        }
        Err(e) => {
            log::error!("flight save failed: {e}");
            error_box(&format!("FSX AutoSave could not save the flight: {e}"));
        }
    }
}

/// The dialog is its own process; the running client notices the saved file
/// on its next timer tick.
fn spawn_options_dialog() {
    match std::env::current_exe() {
        Ok(exe) => {
            if let Err(e) = std::process::Command::new(exe).arg("options").spawn() {
                log::error!("failed to open the options dialog: {e}");
            }
        }
        Err(e) => log::error!("could not locate our own executable: {e}"),
    }
}
