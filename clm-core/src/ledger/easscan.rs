//! Read-only client for the hosted EAS attestation index.
//!
//! Fetches the document's record set over the index's GraphQL endpoint and
//! decodes each attestation into the record schema. Appending and revoking
//! records requires a transaction signer, which is an external capability;
//! those operations report [`LedgerError::ReadOnly`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{DecodeFailure, Ledger, LedgerError, RecordBatch};
use crate::types::{LedgerRecord, RecordPayload, RecordUid};

const ACTIVE_QUERY: &str = r#"
  query GetClmAttestations($schemaId: String!) {
    attestations(
      where: { schemaId: { equals: $schemaId }, revoked: { equals: false } }
      orderBy: { time: asc }
      take: 100
    ) {
      id
      revoked
      time
      decodedDataJson
    }
  }
"#;

const ALL_QUERY: &str = r#"
  query GetClmAttestations($schemaId: String!) {
    attestations(
      where: { schemaId: { equals: $schemaId } }
      orderBy: { time: asc }
      take: 100
    ) {
      id
      revoked
      time
      decodedDataJson
    }
  }
"#;

/// GraphQL client for the attestation index.
pub struct EasScanLedger {
    http_client: reqwest::Client,
    graphql_url: String,
    schema_uid: String,
}

impl EasScanLedger {
    /// Create a client for the given GraphQL endpoint and schema uid.
    pub fn new(graphql_url: impl Into<String>, schema_uid: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            graphql_url: graphql_url.into(),
            schema_uid: schema_uid.into(),
        }
    }

    /// The schema uid this client queries.
    pub fn schema_uid(&self) -> &str {
        &self.schema_uid
    }

    async fn fetch(&self, query: &str) -> Result<Vec<RawAttestation>, LedgerError> {
        let body = json!({
            "query": query,
            "variables": { "schemaId": self.schema_uid },
        });

        let response = self
            .http_client
            .post(&self.graphql_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                self.graphql_url
            )));
        }

        let parsed: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Protocol(format!("Invalid response body: {e}")))?;

        if let Some(errors) = parsed.errors {
            let message = errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "unknown GraphQL error".to_string());
            return Err(LedgerError::Protocol(format!("GraphQL error: {message}")));
        }

        Ok(parsed.data.map(|d| d.attestations).unwrap_or_default())
    }
}

#[async_trait]
impl Ledger for EasScanLedger {
    async fn submit_record(&self, payload: RecordPayload) -> Result<RecordUid, LedgerError> {
        Err(LedgerError::ReadOnly(format!(
            "cannot submit \"{}\": submission requires an external signer",
            payload.section_id
        )))
    }

    async fn revoke_record(&self, uid: RecordUid) -> Result<(), LedgerError> {
        Err(LedgerError::ReadOnly(format!(
            "cannot revoke {uid}: revocation requires an external signer"
        )))
    }

    async fn query_records(&self, active_only: bool) -> Result<RecordBatch, LedgerError> {
        let query = if active_only { ACTIVE_QUERY } else { ALL_QUERY };
        let raw = self.fetch(query).await?;
        tracing::debug!(
            count = raw.len(),
            schema = %self.schema_uid,
            "Fetched attestations from index"
        );

        let mut batch = RecordBatch::default();
        for attestation in raw {
            match decode_attestation(&attestation) {
                Ok(record) => batch.records.push(record),
                Err(reason) => {
                    tracing::warn!(uid = %attestation.id, %reason, "Skipping undecodable attestation");
                    batch.undecodable.push(DecodeFailure {
                        uid: attestation.id.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(batch)
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<QueryData>,
    errors: Option<Vec<GraphqlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    attestations: Vec<RawAttestation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttestation {
    id: String,
    #[serde(default)]
    revoked: bool,
    #[serde(default)]
    time: i64,
    decoded_data_json: String,
}

#[derive(Debug, Deserialize)]
struct DecodedField {
    name: String,
    value: DecodedValue,
}

#[derive(Debug, Deserialize)]
struct DecodedValue {
    value: serde_json::Value,
}

fn decode_attestation(raw: &RawAttestation) -> Result<LedgerRecord, String> {
    let uid: RecordUid = raw.id.parse().map_err(|e| format!("bad uid: {e}"))?;

    let fields: Vec<DecodedField> = serde_json::from_str(&raw.decoded_data_json)
        .map_err(|e| format!("bad decodedDataJson: {e}"))?;
    let get = |name: &str| {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value.value)
            .ok_or_else(|| format!("missing field \"{name}\""))
    };

    let as_str = |value: &serde_json::Value, name: &str| {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("field \"{name}\" is not a string"))
    };

    let section_id = as_str(get("sectionId")?, "sectionId")?;
    let title = as_str(get("title")?, "title")?;
    let content = as_str(get("content")?, "content")?;
    let version = get("version")?
        .as_u64()
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| "field \"version\" is not a u16".to_string())?;
    let content_digest = as_str(get("contentHash")?, "contentHash")?
        .parse()
        .map_err(|e| format!("bad contentHash: {e}"))?;
    let parent = as_str(get("parent")?, "parent")?
        .parse()
        .map_err(|e| format!("bad parent: {e}"))?;
    let immutable = get("immutable")?
        .as_bool()
        .ok_or_else(|| "field \"immutable\" is not a bool".to_string())?;

    let created_at = chrono::DateTime::from_timestamp(raw.time, 0)
        .ok_or_else(|| format!("bad timestamp {}", raw.time))?;

    Ok(LedgerRecord {
        uid,
        payload: RecordPayload {
            section_id,
            version,
            title,
            content,
            content_digest,
            parent,
            immutable,
        },
        revoked: raw.revoked,
        created_at,
    })
}
