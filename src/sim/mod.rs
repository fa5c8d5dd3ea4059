/// Simulation clock for timestep management.
pub mod clock;
pub mod controller;
pub mod engine;
/// Simulation-host slot interface.
pub mod host;
pub mod kpi;
pub mod mode;
/// Charging-window planners.
pub mod planner;
pub mod pump;
pub mod time;
pub mod types;
