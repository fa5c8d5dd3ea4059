//! Plant and site models for the offline host.

/// Building electrical base-load profile generator.
pub mod baseload;
/// Yearly thermal demand generator.
pub mod demand;
/// Solar photovoltaic production model.
pub mod solar;
/// Seasonal thermal energy storage tank.
pub mod tank;
pub mod types;

// Re-export the main types for convenience
pub use baseload::BaseLoad;
pub use demand::SeasonalDemand;
pub use solar::SolarPv;
pub use tank::TesTank;
pub use types::Profile;
