//! Seasonal thermal energy storage charging controller.
//!
//! Plans daily PV-driven charge windows for a seasonal TES tank, drives the
//! heat/cool mode and pump flags each control step, and runs offline against
//! a simple tank plant.

pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod forecast;
pub mod io;
pub mod logging;
pub mod runner;
pub mod scenario;
/// Control loop, planners, state machines and offline engine.
pub mod sim;
