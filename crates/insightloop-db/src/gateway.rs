use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use insightloop_core::{SaveOutcome, TranscriptGateway, TranscriptRecord};

use crate::{Database, PersistenceError};

pub const DEFAULT_TABLE: &str = "interview_responses";

/// Writes transcripts to the local SQLite store
pub struct SqliteGateway {
    db: Arc<Database>,
}

impl SqliteGateway {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TranscriptGateway for SqliteGateway {
    fn name(&self) -> &str {
        "SQLite"
    }

    async fn save(&self, record: &TranscriptRecord) -> SaveOutcome {
        let db = Arc::clone(&self.db);
        let record = record.clone();

        match tokio::task::spawn_blocking(move || db.transcripts().save(&record)).await {
            Ok(Ok(id)) => SaveOutcome::saved(format!("Saved transcript #{}", id)),
            Ok(Err(e)) => SaveOutcome::failed(e.to_string()),
            Err(e) => SaveOutcome::failed(format!("save task failed: {}", e)),
        }
    }
}

/// Target of an HTTP relay that inserts rows into a remote database
#[derive(Debug)]
pub struct BridgeConfig {
    pub endpoint: String,
    pub host: String,
    pub user: String,
    pub password: SecretString,
    pub database: String,
    pub table: String,
    pub timeout: Duration,
}

impl BridgeConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: SecretString::from(String::new()),
            database: "research_db".to_string(),
            table: DEFAULT_TABLE.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: SecretString) -> Self {
        self.password = password;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct RelayResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Posts transcripts to an HTTP relay as `{config, data}` JSON
pub struct BridgeGateway {
    client: reqwest::Client,
    config: BridgeConfig,
}

impl BridgeGateway {
    pub fn new(config: BridgeConfig) -> Result<Self, PersistenceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PersistenceError::Bridge(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// The relay request body for `record`
    pub fn payload(&self, record: &TranscriptRecord) -> Result<serde_json::Value, PersistenceError> {
        Ok(json!({
            "config": {
                "HOST": self.config.host,
                "USER": self.config.user,
                "PASSWORD": self.config.password.expose_secret(),
                "DATABASE": self.config.database,
                "TABLE": self.config.table,
            },
            "data": {
                "study_name": record.study_name,
                "respondent_id": record.respondent_id.as_str(),
                "interview_json": record.interview_json()?,
                "summary_text": record.summary_text(),
                "timestamp": record.completed_at.to_rfc3339(),
            }
        }))
    }

    /// Send a transcript to the relay, returning its confirmation message
    pub async fn post(&self, record: &TranscriptRecord) -> Result<String, PersistenceError> {
        let payload = self.payload(record)?;
        debug!(endpoint = %self.config.endpoint, table = %self.config.table, "Posting transcript to relay");

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<RelayResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let detail = parsed
                .and_then(|r| r.error)
                .unwrap_or_else(|| body.trim().to_string());
            return Err(PersistenceError::Bridge(format!(
                "relay returned {}: {}",
                status, detail
            )));
        }

        match parsed {
            Some(RelayResponse {
                error: Some(error), ..
            }) => Err(PersistenceError::Bridge(error)),
            Some(RelayResponse {
                success: true, id, ..
            }) => Ok(match id {
                Some(serde_json::Value::String(id)) => {
                    format!("Saved to {} (id {})", self.config.table, id)
                }
                Some(id) => format!("Saved to {} (id {})", self.config.table, id),
                None => format!("Saved to {}", self.config.table),
            }),
            _ => Err(PersistenceError::Bridge(format!(
                "unexpected relay response: {}",
                body.trim()
            ))),
        }
    }

    /// Ask the relay whether it is up
    pub async fn health(&self) -> Result<String, PersistenceError> {
        let response = self.client.get(&self.config.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PersistenceError::Bridge(format!("relay returned {}", status)));
        }

        let parsed: RelayResponse = response.json().await?;
        Ok(parsed.message.unwrap_or_else(|| "relay is up".to_string()))
    }
}

#[async_trait]
impl TranscriptGateway for BridgeGateway {
    fn name(&self) -> &str {
        "Bridge"
    }

    async fn save(&self, record: &TranscriptRecord) -> SaveOutcome {
        match self.post(record).await {
            Ok(message) => SaveOutcome::saved(message),
            Err(e) => {
                warn!(endpoint = %self.config.endpoint, error = %e, "Relay save failed");
                SaveOutcome::failed(e.to_string())
            }
        }
    }
}

/// Logs the transcript instead of storing it
pub struct MockGateway {
    table: String,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptGateway for MockGateway {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn save(&self, record: &TranscriptRecord) -> SaveOutcome {
        info!(
            table = %self.table,
            study = %record.study_name,
            respondent = %record.respondent_id,
            steps = record.steps.len(),
            "Mock save"
        );
        debug!(summary = %record.summary_text(), "Mock save payload");
        SaveOutcome::saved("Mock save successful. Configure an endpoint to sync.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insightloop_core::{InterviewStep, RespondentId, StepKind};

    fn record() -> TranscriptRecord {
        let mut step = InterviewStep::open(StepKind::Core, "How are you?");
        step.response = Some("Fine".to_string());
        TranscriptRecord::new("Study".to_string(), RespondentId::from("abc123xyz"), vec![step])
    }

    #[test]
    fn test_bridge_payload_shape() {
        let gateway = BridgeGateway::new(
            BridgeConfig::new("http://localhost:3001/api/save")
                .with_table("responses")
                .with_password(SecretString::from("hunter2".to_string())),
        )
        .unwrap();

        let payload = gateway.payload(&record()).unwrap();
        assert_eq!(payload["config"]["TABLE"], "responses");
        assert_eq!(payload["config"]["PASSWORD"], "hunter2");
        assert_eq!(payload["data"]["respondent_id"], "abc123xyz");
        assert_eq!(payload["data"]["summary_text"], "Q: How are you?\nA: Fine");

        let steps: serde_json::Value =
            serde_json::from_str(payload["data"]["interview_json"].as_str().unwrap()).unwrap();
        assert_eq!(steps[0]["question"], "How are you?");
    }

    #[test]
    fn test_bridge_config_debug_hides_password() {
        let config = BridgeConfig::new("http://relay")
            .with_password(SecretString::from("hunter2".to_string()));
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_mock_gateway_always_succeeds() {
        let outcome = MockGateway::new().save(&record()).await;
        assert!(outcome.is_saved());
    }

    #[tokio::test]
    async fn test_sqlite_gateway_stores_row() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let gateway = SqliteGateway::new(Arc::clone(&db));

        let outcome = gateway.save(&record()).await;
        assert!(outcome.is_saved(), "{}", outcome.message());

        let rows = db.transcripts().list(&Default::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].respondent_id, "abc123xyz");
    }
}
