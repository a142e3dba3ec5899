pub mod legacy;
pub mod rpc;

pub use legacy::parse_legacy_status;
pub use rpc::parse_rpc_status;

use serde_json::Value;

/// Numeric lookup on a JSON object field.
///
/// Integers and floats both count; booleans and strings do not.
pub(crate) fn numeric_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}
