use crate::config::ViewerConfig;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::warn;

/// One raw observation as returned by the broker: value coerced to float,
/// timestamp left as the broker string for downstream normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub recv_time: String,
}

#[derive(Debug, Deserialize)]
struct SthEnvelope {
    #[serde(rename = "contextResponses", default)]
    context_responses: Vec<ContextResponse>,
}

#[derive(Debug, Deserialize)]
struct ContextResponse {
    #[serde(rename = "contextElement")]
    context_element: ContextElement,
}

#[derive(Debug, Deserialize)]
struct ContextElement {
    #[serde(default)]
    attributes: Vec<AttributeHistory>,
}

#[derive(Debug, Deserialize)]
struct AttributeHistory {
    #[serde(default)]
    values: Vec<RawSample>,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    #[serde(rename = "attrValue")]
    attr_value: JsonValue,
    #[serde(rename = "recvTime")]
    recv_time: String,
}

/// Client for the STH-Comet short-term-history query endpoint. One instance
/// serves all attributes of the configured entity.
#[derive(Debug, Clone)]
pub struct SthClient {
    http: reqwest::Client,
    base_url: String,
    entity_id: String,
    fiware_service: String,
    fiware_service_path: String,
}

impl SthClient {
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .context("failed to build STH http client")?;
        Ok(Self {
            http,
            base_url: config.sth_base_url.as_str().trim_end_matches('/').to_string(),
            entity_id: config.entity_id.clone(),
            fiware_service: config.fiware_service.clone(),
            fiware_service_path: config.fiware_service_path.clone(),
        })
    }

    /// Fetches the `last_n` most recent samples for one attribute. A failed
    /// or malformed fetch degrades to an empty sequence so a single bad tick
    /// never takes down the polling loop.
    pub async fn fetch(&self, attribute: &str, last_n: u32) -> Vec<Sample> {
        match self.try_fetch(attribute, last_n).await {
            Ok(samples) => samples,
            Err(err) => {
                warn!(attribute, "sensor fetch failed: {err:#}");
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, attribute: &str, last_n: u32) -> Result<Vec<Sample>> {
        let url = format!(
            "{}/STH/v1/contextEntities/type/Sensor/id/{}/attributes/{}",
            self.base_url, self.entity_id, attribute
        );
        let response = self
            .http
            .get(&url)
            .header("fiware-service", &self.fiware_service)
            .header("fiware-servicepath", &self.fiware_service_path)
            .query(&[("lastN", last_n)])
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("unexpected status {status} from {url}");
        }

        let envelope: SthEnvelope = response
            .json()
            .await
            .with_context(|| format!("invalid JSON body from {url}"))?;
        extract_samples(envelope)
    }
}

fn extract_samples(envelope: SthEnvelope) -> Result<Vec<Sample>> {
    let values = envelope
        .context_responses
        .into_iter()
        .next()
        .map(|response| response.context_element.attributes)
        .and_then(|attributes| attributes.into_iter().next())
        .map(|attribute| attribute.values)
        .unwrap_or_default();

    values
        .into_iter()
        .map(|raw| {
            let value = coerce_value(&raw.attr_value)
                .with_context(|| format!("uncoercible attrValue {:?}", raw.attr_value))?;
            Ok(Sample {
                value,
                recv_time: raw.recv_time,
            })
        })
        .collect()
}

fn coerce_value(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(num) => num.as_f64(),
        JsonValue::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_envelope(values: JsonValue) -> SthEnvelope {
        serde_json::from_value(json!({
            "contextResponses": [{
                "contextElement": {
                    "attributes": [{ "values": values }]
                }
            }]
        }))
        .expect("envelope")
    }

    #[test]
    fn extracts_string_encoded_values() {
        let envelope = make_envelope(json!([
            { "attrValue": "10.5", "recvTime": "2024-01-01T12:00:00.000Z" },
            { "attrValue": "11", "recvTime": "2024-01-01T12:00:10.000Z" },
        ]));
        let samples = extract_samples(envelope).expect("samples");
        assert_eq!(
            samples,
            vec![
                Sample {
                    value: 10.5,
                    recv_time: "2024-01-01T12:00:00.000Z".to_string()
                },
                Sample {
                    value: 11.0,
                    recv_time: "2024-01-01T12:00:10.000Z".to_string()
                },
            ]
        );
    }

    #[test]
    fn extracts_numeric_values() {
        let envelope = make_envelope(json!([
            { "attrValue": 21.25, "recvTime": "2024-01-01T12:00:00.000Z" },
        ]));
        let samples = extract_samples(envelope).expect("samples");
        assert_eq!(samples[0].value, 21.25);
    }

    #[test]
    fn missing_response_fields_yield_empty() {
        let envelope: SthEnvelope = serde_json::from_value(json!({})).expect("envelope");
        assert!(extract_samples(envelope).expect("samples").is_empty());

        let envelope: SthEnvelope = serde_json::from_value(json!({
            "contextResponses": [{ "contextElement": {} }]
        }))
        .expect("envelope");
        assert!(extract_samples(envelope).expect("samples").is_empty());
    }

    #[test]
    fn malformed_value_is_an_error() {
        let envelope = make_envelope(json!([
            { "attrValue": "not-a-number", "recvTime": "2024-01-01T12:00:00.000Z" },
        ]));
        assert!(extract_samples(envelope).is_err());

        let envelope = make_envelope(json!([
            { "attrValue": { "nested": true }, "recvTime": "2024-01-01T12:00:00.000Z" },
        ]));
        assert!(extract_samples(envelope).is_err());
    }
}
