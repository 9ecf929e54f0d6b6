// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod config;
pub mod controller;
pub mod editor;
pub mod error;
pub mod goal;
pub mod history;
pub mod lockdown;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod timers;
