//! Core logic for the FSX AutoSave client: the persisted settings record,
//! the save-gating predicate and autosave file rotation.
//!
//! Nothing in this crate touches SimConnect or Win32, so everything here
//! unit-tests without a running simulator.

pub mod policy;
pub mod rotation;
pub mod settings;
pub mod store;

pub use policy::{save_permitted, SimGates};
pub use settings::Settings;
