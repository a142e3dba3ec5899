use serde_json::Value;

use crate::client::{ClientError, DeviceApi};
use crate::parsers::{parse_legacy_status, parse_rpc_status};
use crate::status::ShellyStatus;

/// Terminal failures of one resolution cycle. Transport errors and schema
/// mismatches at the earlier steps are recovered internally by falling
/// through the attempt chain and never escape.
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("device returned no data on any endpoint: {0}")]
    NoDeviceData(ClientError),
    #[error("device response matched no known energy-meter schema")]
    UnparseableResponse,
}

/// The fixed attempt order of the fallback chain.
///
/// Older firmware only exposes the legacy `/status` endpoint. Newer
/// firmware deprecates it but may still answer with an empty body instead
/// of a 404, which is why a schema mismatch (not just a transport failure)
/// also advances the chain. The id-qualified RPC call is tried before the
/// bare one because some firmware revisions reject the unqualified call
/// while others require it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Legacy,
    RpcIndexed,
    RpcBare,
}

impl Attempt {
    fn endpoint(self) -> &'static str {
        match self {
            Attempt::Legacy => "legacy",
            Attempt::RpcIndexed => "rpc_indexed",
            Attempt::RpcBare => "rpc_bare",
        }
    }
}

/// Run one resolution cycle: at most three sequential calls,
/// short-circuiting on the first response either parser accepts.
///
/// Holds no state across cycles; concurrent scrapes may call this freely
/// against the same client.
pub async fn resolve_status(api: &dyn DeviceApi) -> Result<ShellyStatus, ResolveError> {
    let mut attempt = Attempt::Legacy;
    loop {
        metrics::counter!("shelly_resolve_attempts_total", "endpoint" => attempt.endpoint())
            .increment(1);

        attempt = match attempt {
            Attempt::Legacy => match api.get_json("/status", &[]).await {
                Ok(data) => match parse_legacy_status(&data) {
                    Some(status) => return Ok(status),
                    None => {
                        tracing::debug!("/status carried no meter list, trying RPC API");
                        Attempt::RpcIndexed
                    }
                },
                Err(e) => {
                    tracing::debug!(error = %e, "legacy /status endpoint unavailable");
                    Attempt::RpcIndexed
                }
            },
            Attempt::RpcIndexed => match api.get_json("/rpc/EM.GetStatus", &[("id", "0")]).await {
                Ok(data) => return finish_rpc(&data),
                Err(e) => {
                    tracing::debug!(error = %e, "EM.GetStatus with id=0 failed");
                    Attempt::RpcBare
                }
            },
            Attempt::RpcBare => {
                let data = api
                    .get_json("/rpc/EM.GetStatus", &[])
                    .await
                    .map_err(ResolveError::NoDeviceData)?;
                return finish_rpc(&data);
            }
        };
    }
}

/// A JSON body from either RPC attempt is final: if it does not match the
/// EM schema there is no further fallback.
fn finish_rpc(data: &Value) -> Result<ShellyStatus, ResolveError> {
    parse_rpc_status(data).ok_or(ResolveError::UnparseableResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Plays back a fixed script of responses and records what was called.
    struct ScriptedApi {
        responses: Mutex<VecDeque<Result<Value, ClientError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn new(responses: Vec<Result<Value, ClientError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeviceApi for ScriptedApi {
        async fn get_json(
            &self,
            path: &str,
            query: &[(&str, &str)],
        ) -> Result<Value, ClientError> {
            let mut call = path.to_string();
            for (k, v) in query {
                call.push_str(&format!("?{k}={v}"));
            }
            self.calls.lock().unwrap().push(call);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted API called more times than scripted")
        }
    }

    fn http_err(code: u16) -> ClientError {
        ClientError::Status(reqwest::StatusCode::from_u16(code).unwrap())
    }

    #[tokio::test]
    async fn legacy_success_short_circuits() {
        let api = ScriptedApi::new(vec![Ok(json!({
            "emeters": [{"power": 100.0}]
        }))]);

        let status = resolve_status(&api).await.unwrap();
        assert_eq!(status.total_power_w, Some(100.0));
        assert_eq!(api.calls(), ["/status"]);
    }

    #[tokio::test]
    async fn empty_meter_list_falls_through_to_indexed_rpc() {
        let api = ScriptedApi::new(vec![
            Ok(json!({"emeters": []})),
            Ok(json!({"a_act_power": 42.0})),
        ]);

        let status = resolve_status(&api).await.unwrap();
        assert_eq!(status.phases[0].power_w, Some(42.0));
        assert_eq!(api.calls(), ["/status", "/rpc/EM.GetStatus?id=0"]);
    }

    #[tokio::test]
    async fn legacy_transport_failure_falls_through() {
        let api = ScriptedApi::new(vec![
            Err(http_err(404)),
            Ok(json!({"a_voltage": 230.0})),
        ]);

        let status = resolve_status(&api).await.unwrap();
        assert_eq!(status.phases[0].voltage_v, Some(230.0));
        assert_eq!(api.calls(), ["/status", "/rpc/EM.GetStatus?id=0"]);
    }

    #[tokio::test]
    async fn indexed_rpc_failure_falls_back_to_bare_call() {
        let api = ScriptedApi::new(vec![
            Err(http_err(404)),
            Err(http_err(500)),
            Ok(json!({"b_act_power": 7.5})),
        ]);

        let status = resolve_status(&api).await.unwrap();
        assert_eq!(status.phases[1].power_w, Some(7.5));
        assert_eq!(
            api.calls(),
            ["/status", "/rpc/EM.GetStatus?id=0", "/rpc/EM.GetStatus"]
        );
    }

    #[tokio::test]
    async fn unrecognized_final_body_is_unparseable() {
        // Scenario: 404 on /status, 500 on the indexed call, and a bare
        // call that answers with JSON neither parser accepts.
        let api = ScriptedApi::new(vec![
            Err(http_err(404)),
            Err(http_err(500)),
            Ok(json!({"foo": 1})),
        ]);

        let err = resolve_status(&api).await.unwrap_err();
        assert!(matches!(err, ResolveError::UnparseableResponse));
    }

    #[tokio::test]
    async fn all_transports_failing_is_no_device_data() {
        let api = ScriptedApi::new(vec![
            Err(http_err(404)),
            Err(http_err(502)),
            Err(http_err(503)),
        ]);

        let err = resolve_status(&api).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoDeviceData(_)));
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn mismatched_indexed_rpc_body_is_terminal() {
        // Once an RPC call answers with a JSON body, a schema mismatch is
        // final; the bare call is only a fallback for transport failures.
        let api = ScriptedApi::new(vec![
            Err(http_err(404)),
            Ok(json!({"switch:0": {"output": true}})),
        ]);

        let err = resolve_status(&api).await.unwrap_err();
        assert!(matches!(err, ResolveError::UnparseableResponse));
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn legacy_body_that_is_not_json_object_falls_through() {
        let api = ScriptedApi::new(vec![
            Ok(json!("pong")),
            Ok(json!({"c_current": 0.2})),
        ]);

        let status = resolve_status(&api).await.unwrap();
        assert_eq!(status.phases[2].current_a, Some(0.2));
    }
}
