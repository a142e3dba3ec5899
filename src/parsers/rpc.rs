use serde_json::Value;

use super::numeric_field;
use crate::status::{PhaseReading, ShellyStatus};

/// Phase prefixes in the order the readings are emitted.
const PHASE_PREFIXES: [&str; 3] = ["a", "b", "c"];

/// Suffixes the parser maps onto known `PhaseReading` attributes. Any other
/// numeric `<prefix>_<suffix>` key lands in `extra_metrics` instead.
const KNOWN_SUFFIXES: [&str; 9] = [
    "act_power",
    "power",
    "voltage",
    "current",
    "act_energy",
    "act_ret_energy",
    "apparent_power",
    "reactive_power",
    "pf",
];

/// System-wide keys mapped onto the recognized totals and frequency. These
/// are excluded from `misc_metrics`.
const RECOGNIZED_SYSTEM_KEYS: [&str; 8] = [
    "total_act_power",
    "total_power",
    "total_apparent_power",
    "total_reactive_power",
    "total_act_energy",
    "total_act_ret_energy",
    "freq",
    "frequency",
];

/// Parse the RPC `EM.GetStatus` response shape: a flat JSON object whose
/// per-phase fields are prefixed `a_`/`b_`/`c_`, plus system-wide keys.
///
/// Returns `None` ("not applicable") when no phase yields any known metric.
/// Unknown fields never satisfy that check: a response carrying only
/// unrecognized phase-prefixed keys does not match this schema, which keeps
/// unrelated RPC endpoints from being mistaken for meter data.
///
/// On a match all three phases are present (labels "A", "B", "C"), each
/// possibly with absent individual fields. Vendor fields added after this
/// code was written surface automatically: every other numeric
/// `<prefix>_*` key becomes an `extra_metrics` entry keyed by its suffix,
/// and every unrecognized numeric top-level key becomes a `misc_metrics`
/// entry under its literal name.
pub fn parse_rpc_status(data: &Value) -> Option<ShellyStatus> {
    let obj = data.as_object()?;

    let mut phases = Vec::with_capacity(PHASE_PREFIXES.len());
    let mut found_known_metric = false;

    for prefix in PHASE_PREFIXES {
        let mut reading = PhaseReading {
            phase: prefix.to_uppercase(),
            // The device reports active power under act_power on newer
            // firmware and under a bare power key on older revisions.
            power_w: prefixed(obj, prefix, "act_power").or_else(|| prefixed(obj, prefix, "power")),
            voltage_v: prefixed(obj, prefix, "voltage"),
            current_a: prefixed(obj, prefix, "current"),
            energy_wh: prefixed(obj, prefix, "act_energy"),
            returned_energy_wh: prefixed(obj, prefix, "act_ret_energy"),
            apparent_power_va: prefixed(obj, prefix, "apparent_power"),
            reactive_power_var: prefixed(obj, prefix, "reactive_power"),
            power_factor: prefixed(obj, prefix, "pf"),
            ..PhaseReading::default()
        };

        if reading.has_known_metric() {
            found_known_metric = true;
        }

        let phase_prefix = format!("{prefix}_");
        for (key, value) in obj {
            if let Some(suffix) = key.strip_prefix(&phase_prefix) {
                if !KNOWN_SUFFIXES.contains(&suffix) {
                    if let Some(n) = value.as_f64() {
                        reading.extra_metrics.insert(suffix.to_string(), n);
                    }
                }
            }
        }

        phases.push(reading);
    }

    if !found_known_metric {
        return None;
    }

    let mut misc_metrics = std::collections::BTreeMap::new();
    for (key, value) in obj {
        let Some(n) = value.as_f64() else { continue };
        let phase_prefixed = PHASE_PREFIXES
            .iter()
            .any(|p| key.starts_with(&format!("{p}_")));
        if phase_prefixed || RECOGNIZED_SYSTEM_KEYS.contains(&key.as_str()) {
            continue;
        }
        misc_metrics.insert(key.clone(), n);
    }

    Some(ShellyStatus {
        phases,
        total_power_w: numeric_field(obj, "total_act_power")
            .or_else(|| numeric_field(obj, "total_power")),
        total_apparent_power_va: numeric_field(obj, "total_apparent_power"),
        total_reactive_power_var: numeric_field(obj, "total_reactive_power"),
        total_energy_wh: numeric_field(obj, "total_act_energy"),
        total_returned_energy_wh: numeric_field(obj, "total_act_ret_energy"),
        frequency_hz: numeric_field(obj, "freq").or_else(|| numeric_field(obj, "frequency")),
        misc_metrics,
    })
}

fn prefixed(obj: &serde_json::Map<String, Value>, prefix: &str, suffix: &str) -> Option<f64> {
    obj.get(&format!("{prefix}_{suffix}")).and_then(Value::as_f64)
}
