use std::collections::BTreeMap;

use crate::status::{PhaseReading, ShellyStatus};

/// One exported measurement: a metric name, a label set and a gauge value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub help: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    fn gauge(name: &str, help: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            labels: Vec::new(),
            value,
        }
    }

    fn phase_gauge(name: &str, help: &str, phase: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            labels: vec![("phase".to_string(), phase.to_string())],
            value,
        }
    }
}

/// The reachability gauge. Emitted exactly once per cycle, before any other
/// sample, and it is the sole output when resolution fails terminally.
pub fn up_sample(reachable: bool) -> Sample {
    Sample::gauge(
        "shelly_up",
        "Shelly device reachable",
        if reachable { 1.0 } else { 0.0 },
    )
}

const SYSTEM_GAUGES: &[(&str, &str, fn(&ShellyStatus) -> Option<f64>)] = &[
    (
        "shelly_total_power_watts",
        "Total active power across all phases",
        |s| s.total_power_w,
    ),
    (
        "shelly_total_apparent_power_va",
        "Total apparent power across all phases",
        |s| s.total_apparent_power_va,
    ),
    (
        "shelly_total_reactive_power_var",
        "Total reactive power across all phases",
        |s| s.total_reactive_power_var,
    ),
    (
        "shelly_total_energy_wh",
        "Total delivered energy across all phases",
        |s| s.total_energy_wh,
    ),
    (
        "shelly_total_returned_energy_wh",
        "Total returned energy across all phases",
        |s| s.total_returned_energy_wh,
    ),
    (
        "shelly_frequency_hz",
        "Measured grid frequency",
        |s| s.frequency_hz,
    ),
];

const PHASE_GAUGES: &[(&str, &str, fn(&PhaseReading) -> Option<f64>)] = &[
    ("shelly_phase_power_watts", "Phase active power", |r| {
        r.power_w
    }),
    ("shelly_phase_voltage_volts", "Phase voltage", |r| {
        r.voltage_v
    }),
    ("shelly_phase_current_amperes", "Phase current", |r| {
        r.current_a
    }),
    ("shelly_phase_energy_wh", "Total delivered energy", |r| {
        r.energy_wh
    }),
    (
        "shelly_phase_returned_energy_wh",
        "Total returned energy",
        |r| r.returned_energy_wh,
    ),
    (
        "shelly_phase_apparent_power_va",
        "Phase apparent power",
        |r| r.apparent_power_va,
    ),
    (
        "shelly_phase_reactive_power_var",
        "Phase reactive power",
        |r| r.reactive_power_var,
    ),
    ("shelly_phase_power_factor", "Phase power factor", |r| {
        r.power_factor
    }),
];

/// Derived metric name for an unknown per-phase field, keyed by the suffix
/// the parser stripped from the device key.
pub fn phase_metric_name(suffix: &str) -> String {
    format!("shelly_phase_{}", sanitize_name(suffix))
}

/// Derived metric name for an unrecognized system-wide field, keyed by the
/// literal device key.
pub fn misc_metric_name(key: &str) -> String {
    format!("shelly_{}", sanitize_name(key))
}

/// Restrict a device-supplied key to the Prometheus metric-name charset.
fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Map one canonical status onto its flat sample set.
///
/// Absent values emit nothing (never a zero and never a NaN); a family may
/// legitimately carry zero samples in a cycle. Samples of one family are
/// emitted adjacently so each family renders exactly once, including the
/// dynamically named ones: a field appearing on two phases becomes one
/// family with two labeled samples, not two families.
pub fn collect_status(status: &ShellyStatus) -> Vec<Sample> {
    let mut out = Vec::new();

    for (name, help, field) in SYSTEM_GAUGES {
        if let Some(value) = field(status) {
            out.push(Sample::gauge(name, help, value));
        }
    }

    for (name, help, field) in PHASE_GAUGES {
        for reading in &status.phases {
            if let Some(value) = field(reading) {
                out.push(Sample::phase_gauge(name, help, &reading.phase, value));
            }
        }
    }

    let mut dynamic: BTreeMap<String, Vec<Sample>> = BTreeMap::new();
    for reading in &status.phases {
        for (suffix, value) in &reading.extra_metrics {
            let name = phase_metric_name(suffix);
            let help = format!("Phase metric reported by the device ({suffix})");
            let sample = Sample::phase_gauge(&name, &help, &reading.phase, *value);
            dynamic.entry(name).or_default().push(sample);
        }
    }
    for (_, samples) in dynamic {
        out.extend(samples);
    }

    for (key, value) in &status.misc_metrics {
        let help = format!("Metric reported by the device ({key})");
        out.push(Sample::gauge(&misc_metric_name(key), &help, *value));
    }

    out
}

/// Escape a label value for the Prometheus text exposition format.
fn escape_label_value(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
}

/// Escape HELP text for the Prometheus text exposition format. Help strings
/// embed raw device keys, so a key containing a newline or backslash must
/// not be allowed to break the line structure.
fn escape_help(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
}

/// Render samples as Prometheus text exposition format.
///
/// `# HELP`/`# TYPE` headers are written the first time a family name
/// appears. `collect_status` keeps each family's samples adjacent; the
/// seen-set additionally keeps a derived name that collides with one of the
/// fixed families from re-declaring headers a strict scraper would reject
/// as a duplicate.
pub fn render_text(samples: &[Sample]) -> String {
    // Heuristic capacity: ~96 bytes per sample plus headers.
    let mut out = String::with_capacity(samples.len().saturating_mul(128));
    let mut seen_families: std::collections::HashSet<&str> = std::collections::HashSet::new();

    for sample in samples {
        if seen_families.insert(sample.name.as_str()) {
            out.push_str("# HELP ");
            out.push_str(&sample.name);
            out.push(' ');
            escape_help(&sample.help, &mut out);
            out.push('\n');
            out.push_str("# TYPE ");
            out.push_str(&sample.name);
            out.push_str(" gauge\n");
        }

        out.push_str(&sample.name);
        if !sample.labels.is_empty() {
            out.push('{');
            for (i, (key, value)) in sample.labels.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(key);
                out.push_str("=\"");
                escape_label_value(value, &mut out);
                out.push('"');
            }
            out.push('}');
        }
        out.push(' ');
        out.push_str(&sample.value.to_string());
        out.push('\n');
    }

    out
}
