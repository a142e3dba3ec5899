use serde_json::Value;

use crate::status::{PhaseReading, ShellyStatus};

/// Parse the legacy `/status` response shape: a JSON object carrying an
/// `emeters` list with one object per meter.
///
/// Returns `None` ("not applicable") when the object lacks a non-empty
/// meter list. That is a schema mismatch, not an error; the resolver falls
/// through to the RPC endpoints in that case.
///
/// Phase identifiers are the 1-based entry index as a string; the parser
/// does not assume exactly three meters. Total active power is the sum of
/// the phase powers that were actually reported; if no entry reported a
/// power the total stays absent rather than becoming a fabricated zero.
pub fn parse_legacy_status(data: &Value) -> Option<ShellyStatus> {
    let emeters = data.get("emeters")?.as_array()?;
    if emeters.is_empty() {
        return None;
    }

    let mut phases = Vec::with_capacity(emeters.len());
    let mut total_power = 0.0;
    let mut has_power = false;

    for (idx, meter) in emeters.iter().enumerate() {
        let power = meter.get("power").and_then(Value::as_f64);
        if let Some(p) = power {
            total_power += p;
            has_power = true;
        }

        phases.push(PhaseReading {
            phase: (idx + 1).to_string(),
            power_w: power,
            voltage_v: meter.get("voltage").and_then(Value::as_f64),
            current_a: meter.get("current").and_then(Value::as_f64),
            energy_wh: meter.get("total").and_then(Value::as_f64),
            returned_energy_wh: meter.get("total_returned").and_then(Value::as_f64),
            ..PhaseReading::default()
        });
    }

    Some(ShellyStatus {
        phases,
        total_power_w: has_power.then_some(total_power),
        ..ShellyStatus::default()
    })
}
