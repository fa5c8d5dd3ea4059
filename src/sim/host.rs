//! Simulation-host slot interface.
//!
//! The host invokes the controller once or more per timestep, exposing its
//! current simulation time, numbered input slots and numbered output slots.

use std::fmt;

use crate::error::ControlError;

use super::types::{ControlOutputs, SensorSnapshot};

/// Numbered input slots read every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSlot {
    Soc = 1,
    DayOfYear = 2,
    Pv = 3,
    UserDemand = 4,
    ElectricalTotal = 5,
    TankBottomTemp = 6,
    MixTemp = 7,
    StoredEnergy = 8,
}

impl InputSlot {
    pub const ALL: [InputSlot; 8] = [
        InputSlot::Soc,
        InputSlot::DayOfYear,
        InputSlot::Pv,
        InputSlot::UserDemand,
        InputSlot::ElectricalTotal,
        InputSlot::TankBottomTemp,
        InputSlot::MixTemp,
        InputSlot::StoredEnergy,
    ];

    pub fn number(self) -> usize {
        self as usize
    }
}

impl fmt::Display for InputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Numbered output slots written every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSlot {
    HeatCharge = 1,
    CoolCharge = 2,
    Pump = 3,
    DemandMetric = 4,
}

impl OutputSlot {
    pub fn number(self) -> usize {
        self as usize
    }
}

/// Access to the host's time and slots.
pub trait HostSlots {
    /// Current simulation time in hours.
    fn simulation_time(&self) -> f64;

    fn input(&self, slot: InputSlot) -> f64;

    fn set_output(&mut self, slot: OutputSlot, value: f64);
}

/// Reads a snapshot from the host, rejecting non-finite values.
///
/// # Errors
///
/// Returns `ControlError::NonFiniteInput` for a NaN/inf slot and
/// `ControlError::InvalidDayOfYear` for a negative or fractional day.
pub fn read_snapshot(host: &impl HostSlots) -> Result<SensorSnapshot, ControlError> {
    for slot in InputSlot::ALL {
        let value = host.input(slot);
        if !value.is_finite() {
            return Err(ControlError::NonFiniteInput { slot, value });
        }
    }

    let day = host.input(InputSlot::DayOfYear);
    if day < 0.0 || day.fract() != 0.0 || day > f64::from(u32::MAX) {
        return Err(ControlError::InvalidDayOfYear(day));
    }

    Ok(SensorSnapshot {
        soc: host.input(InputSlot::Soc),
        day_of_year: day as u32,
        pv_w: host.input(InputSlot::Pv),
        demand_w: host.input(InputSlot::UserDemand),
        el_total_w: host.input(InputSlot::ElectricalTotal),
        t_bottom_c: host.input(InputSlot::TankBottomTemp),
        t_mix_c: host.input(InputSlot::MixTemp),
        total_q_tes: host.input(InputSlot::StoredEnergy),
    })
}

/// Writes control outputs as 0/1 flags plus the echoed demand metric.
pub fn write_outputs(host: &mut impl HostSlots, outputs: &ControlOutputs) {
    host.set_output(OutputSlot::HeatCharge, f64::from(u8::from(outputs.heat_charge)));
    host.set_output(OutputSlot::CoolCharge, f64::from(u8::from(outputs.cool_charge)));
    host.set_output(OutputSlot::Pump, f64::from(u8::from(outputs.pump)));
    host.set_output(OutputSlot::DemandMetric, outputs.demand_metric);
}

/// In-memory slot bank used by the offline engine and in tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotBank {
    pub time_h: f64,
    pub inputs: [f64; 8],
    pub outputs: [f64; 4],
}

impl SlotBank {
    pub fn new(time_h: f64, snapshot: &SensorSnapshot) -> Self {
        let mut bank = Self {
            time_h,
            ..Self::default()
        };
        bank.load(snapshot);
        bank
    }

    /// Overwrites every input slot from a snapshot.
    pub fn load(&mut self, snapshot: &SensorSnapshot) {
        self.inputs = [
            snapshot.soc,
            f64::from(snapshot.day_of_year),
            snapshot.pv_w,
            snapshot.demand_w,
            snapshot.el_total_w,
            snapshot.t_bottom_c,
            snapshot.t_mix_c,
            snapshot.total_q_tes,
        ];
    }

    pub fn output(&self, slot: OutputSlot) -> f64 {
        self.outputs[slot.number() - 1]
    }
}

impl HostSlots for SlotBank {
    fn simulation_time(&self) -> f64 {
        self.time_h
    }

    fn input(&self, slot: InputSlot) -> f64 {
        self.inputs[slot.number() - 1]
    }

    fn set_output(&mut self, slot: OutputSlot, value: f64) {
        self.outputs[slot.number() - 1] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SensorSnapshot {
        SensorSnapshot {
            soc: 0.3,
            day_of_year: 45,
            pv_w: 20_000.0,
            demand_w: 4_000.0,
            el_total_w: 3_000.0,
            t_bottom_c: 38.0,
            t_mix_c: 35.0,
            total_q_tes: 80.0,
        }
    }

    #[test]
    fn snapshot_survives_slot_bank() {
        let bank = SlotBank::new(12.0, &snapshot());
        assert_eq!(bank.simulation_time(), 12.0);
        assert_eq!(bank.input(InputSlot::DayOfYear), 45.0);
        assert_eq!(read_snapshot(&bank), Ok(snapshot()));
    }

    #[test]
    fn non_finite_slot_is_rejected() {
        let mut bank = SlotBank::new(0.0, &snapshot());
        bank.inputs[InputSlot::Pv.number() - 1] = f64::NAN;
        let err = read_snapshot(&bank).unwrap_err();
        assert!(matches!(
            err,
            ControlError::NonFiniteInput {
                slot: InputSlot::Pv,
                ..
            }
        ));
    }

    #[test]
    fn fractional_day_is_rejected() {
        let mut bank = SlotBank::new(0.0, &snapshot());
        bank.inputs[InputSlot::DayOfYear.number() - 1] = 3.5;
        assert_eq!(
            read_snapshot(&bank),
            Err(ControlError::InvalidDayOfYear(3.5))
        );
    }

    #[test]
    fn outputs_are_written_as_flags() {
        let mut bank = SlotBank::default();
        write_outputs(
            &mut bank,
            &ControlOutputs {
                heat_charge: true,
                cool_charge: false,
                pump: true,
                demand_metric: 0.7,
            },
        );
        assert_eq!(bank.output(OutputSlot::HeatCharge), 1.0);
        assert_eq!(bank.output(OutputSlot::CoolCharge), 0.0);
        assert_eq!(bank.output(OutputSlot::Pump), 1.0);
        assert_eq!(bank.output(OutputSlot::DemandMetric), 0.7);
    }
}
