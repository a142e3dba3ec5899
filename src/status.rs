use std::collections::BTreeMap;

/// One electrical phase's measurements.
///
/// Every field except `phase` is optional: `None` means the device did not
/// report the value, which is distinct from a reported zero. `extra_metrics`
/// holds per-phase numeric fields the device reports that are not one of the
/// known attributes, keyed by the metric-name suffix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseReading {
    pub phase: String,
    pub power_w: Option<f64>,
    pub voltage_v: Option<f64>,
    pub current_a: Option<f64>,
    pub energy_wh: Option<f64>,
    pub returned_energy_wh: Option<f64>,
    pub apparent_power_va: Option<f64>,
    pub reactive_power_var: Option<f64>,
    pub power_factor: Option<f64>,
    pub extra_metrics: BTreeMap<String, f64>,
}

impl PhaseReading {
    /// True if any of the known attributes carries a value.
    ///
    /// Unknown fields in `extra_metrics` do not count: a response that only
    /// contains unrecognized phase-prefixed fields is not treated as a match
    /// for the energy-meter schema.
    pub fn has_known_metric(&self) -> bool {
        self.power_w.is_some()
            || self.voltage_v.is_some()
            || self.current_a.is_some()
            || self.energy_wh.is_some()
            || self.returned_energy_wh.is_some()
            || self.apparent_power_va.is_some()
            || self.reactive_power_var.is_some()
            || self.power_factor.is_some()
    }
}

/// Canonical result of one resolution cycle.
///
/// Both schema parsers produce this model and the emission mapper consumes
/// it; emission never needs to know which device API the data came from.
/// Values are cycle-scoped: built from one HTTP response, emitted once,
/// then discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellyStatus {
    pub phases: Vec<PhaseReading>,
    pub total_power_w: Option<f64>,
    pub total_apparent_power_va: Option<f64>,
    pub total_reactive_power_var: Option<f64>,
    pub total_energy_wh: Option<f64>,
    pub total_returned_energy_wh: Option<f64>,
    pub frequency_hz: Option<f64>,
    pub misc_metrics: BTreeMap<String, f64>,
}
