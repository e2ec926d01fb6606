//! JSON-lines protocol server
//!
//! One request object per input line, tagged by `method`; one response
//! object per output line carrying the request `id`, an optional `result`
//! and the diagnostics. Logs never go to stdout.

use crate::diagnostics::{Diagnostic, Outcome};
use crate::provider::Provider;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;
use uuid::Uuid;

type Object = Map<String, Value>;

#[derive(Debug, Deserialize)]
#[serde(tag = "method")]
pub enum Request {
    GetSchema,
    ConfigureProvider {
        #[serde(default)]
        config: Value,
    },
    ValidateResourceConfig {
        type_name: String,
        #[serde(default)]
        config: Object,
    },
    ValidateDataSourceConfig {
        type_name: String,
        #[serde(default)]
        config: Object,
    },
    PlanResourceChange {
        type_name: String,
        #[serde(default)]
        prior_state: Option<Object>,
        #[serde(default)]
        config: Option<Object>,
    },
    ApplyResourceChange {
        type_name: String,
        #[serde(default)]
        prior_state: Option<Object>,
        #[serde(default)]
        planned_state: Option<Object>,
    },
    ReadResource {
        type_name: String,
        state: Object,
    },
    ImportResourceState {
        type_name: String,
        import_id: String,
    },
    ReadDataSource {
        type_name: String,
        #[serde(default)]
        config: Object,
    },
    Stop,
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Request::GetSchema => "GetSchema",
            Request::ConfigureProvider { .. } => "ConfigureProvider",
            Request::ValidateResourceConfig { .. } => "ValidateResourceConfig",
            Request::ValidateDataSourceConfig { .. } => "ValidateDataSourceConfig",
            Request::PlanResourceChange { .. } => "PlanResourceChange",
            Request::ApplyResourceChange { .. } => "ApplyResourceChange",
            Request::ReadResource { .. } => "ReadResource",
            Request::ImportResourceState { .. } => "ImportResourceState",
            Request::ReadDataSource { .. } => "ReadDataSource",
            Request::Stop => "Stop",
        }
    }
}

/// A request line: the caller's correlation `id` plus the request itself
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Value,
    #[serde(flatten)]
    request: Request,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Response {
    fn diagnostics(id: Value, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            id,
            result: None,
            diagnostics,
        }
    }

    fn from_outcome<T: Serialize>(id: Value, outcome: Outcome<T>) -> Self {
        let mut diagnostics = outcome.diagnostics;
        let result = match outcome.result.map(serde_json::to_value).transpose() {
            Ok(result) => result,
            Err(err) => {
                diagnostics.push(Diagnostic::error("Failed to encode result").with_detail(err.to_string()));
                None
            },
        };
        Self {
            id,
            result,
            diagnostics,
        }
    }
}

/// Serve requests until EOF or `Stop`
pub async fn serve<R, W>(provider: &mut Provider, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }

        let envelope = match serde_json::from_str::<Envelope>(&line) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!("Malformed request: {}", err);
                let id = serde_json::from_str::<Value>(&line)
                    .ok()
                    .and_then(|v| v.get("id").cloned())
                    .unwrap_or(Value::Null);
                let diagnostic = Diagnostic::error("Malformed request").with_detail(err.to_string());
                write_response(&mut writer, &Response::diagnostics(id, vec![diagnostic])).await?;
                continue;
            },
        };

        let stop = matches!(envelope.request, Request::Stop);
        let span = tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = envelope.request.method()
        );
        let response = handle(provider, envelope.id, envelope.request)
            .instrument(span)
            .await;
        write_response(&mut writer, &response).await?;

        if stop {
            tracing::info!("Stop requested, shutting down");
            break;
        }
    }

    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<()> {
    let mut line = serde_json::to_vec(response).context("Failed to encode response")?;
    line.push(b'\n');
    writer.write_all(&line).await.context("Failed to write response")?;
    writer.flush().await.context("Failed to flush response")?;
    Ok(())
}

/// Dispatch one request to the provider
pub async fn handle(provider: &mut Provider, id: Value, request: Request) -> Response {
    tracing::debug!("Handling {}", request.method());

    match request {
        Request::GetSchema => Response::from_outcome(id, Outcome::ok(provider.schema())),
        Request::ConfigureProvider { config } => {
            Response::diagnostics(id, provider.configure_from_value(&config))
        },
        Request::ValidateResourceConfig { type_name, config } => {
            Response::diagnostics(id, provider.validate_resource_config(&type_name, &config))
        },
        Request::ValidateDataSourceConfig { type_name, config } => {
            Response::diagnostics(id, provider.validate_data_source_config(&type_name, &config))
        },
        Request::PlanResourceChange {
            type_name,
            prior_state,
            config,
        } => Response::from_outcome(
            id,
            provider.plan_resource_change(&type_name, prior_state.as_ref(), config.as_ref()),
        ),
        Request::ApplyResourceChange {
            type_name,
            prior_state,
            planned_state,
        } => Response::from_outcome(
            id,
            provider
                .apply_resource_change(&type_name, prior_state.as_ref(), planned_state.as_ref())
                .await,
        ),
        Request::ReadResource { type_name, state } => {
            Response::from_outcome(id, provider.read_resource(&type_name, &state).await)
        },
        Request::ImportResourceState {
            type_name,
            import_id,
        } => Response::from_outcome(
            id,
            provider.import_resource_state(&type_name, &import_id).await,
        ),
        Request::ReadDataSource { type_name, config } => {
            Response::from_outcome(id, provider.read_data_source(&type_name, &config).await)
        },
        Request::Stop => Response::diagnostics(id, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn run(input: &str) -> Vec<Value> {
        let mut provider = Provider::new();
        let mut output = Vec::new();
        serve(&mut provider, input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_stop_ends_loop() {
        let reader = tokio_test::io::Builder::new()
            .read(b"{\"id\":1,\"method\":\"Stop\"}\n")
            .build();
        let writer = tokio_test::io::Builder::new()
            .write(b"{\"id\":1,\"diagnostics\":[]}\n")
            .build();
        let mut provider = Provider::new();
        serve(&mut provider, tokio::io::BufReader::new(reader), writer)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_lines_after_stop_are_ignored() {
        let responses = run(concat!(
            "{\"id\":1,\"method\":\"Stop\"}\n",
            "{\"id\":2,\"method\":\"GetSchema\"}\n"
        ))
        .await;
        assert_eq!(responses.len(), 1);
    }

    #[tokio::test]
    async fn test_get_schema() {
        let responses = run("{\"id\":\"a\",\"method\":\"GetSchema\"}\n").await;
        assert_eq!(responses[0]["id"], "a");
        assert!(responses[0]["result"]["resources"]["betteruptime_monitor"].is_object());
        assert_eq!(responses[0]["diagnostics"], json!([]));
    }

    #[tokio::test]
    async fn test_malformed_line_keeps_serving() {
        let responses = run(concat!(
            "not json\n",
            "\n",
            "{\"id\":7,\"method\":\"Teleport\"}\n",
            "{\"id\":8,\"method\":\"ValidateResourceConfig\",\"type_name\":\"betteruptime_monitor_group\",\"config\":{\"name\":\"web\"}}\n"
        ))
        .await;
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["diagnostics"][0]["summary"], "Malformed request");
        assert_eq!(responses[1]["id"], 7);
        assert_eq!(responses[1]["diagnostics"][0]["severity"], "error");
        assert_eq!(responses[2]["id"], 8);
        assert_eq!(responses[2]["diagnostics"], json!([]));
    }

    #[tokio::test]
    async fn test_plan_destroy_returns_null_result() {
        let responses = run(
            "{\"id\":1,\"method\":\"PlanResourceChange\",\"type_name\":\"betteruptime_monitor_group\",\"prior_state\":{\"id\":\"1\",\"name\":\"web\"}}\n",
        )
        .await;
        assert!(responses[0]["result"].is_null());
        assert!(responses[0].as_object().unwrap().contains_key("result"));
    }

    #[tokio::test]
    async fn test_read_without_configuration_fails() {
        let responses = run(
            "{\"id\":1,\"method\":\"ReadResource\",\"type_name\":\"betteruptime_monitor\",\"state\":{\"id\":\"5\"}}\n",
        )
        .await;
        assert!(!responses[0].as_object().unwrap().contains_key("result"));
        assert_eq!(responses[0]["diagnostics"][0]["summary"], "Provider not configured");
    }
}
