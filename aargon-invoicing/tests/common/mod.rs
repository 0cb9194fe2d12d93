//! Shared test harness: lifecycle service over in-memory storage and a
//! temp-dir artifact store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use aargon_core::error::AppError;
use aargon_invoicing::models::Client;
use aargon_invoicing::services::{
    ArtifactStore, FsArtifactStore, InMemoryStore, InvoiceNumberGenerator, InvoiceNumberSource,
    InvoiceRenderer, InvoiceService,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub service: Arc<InvoiceService>,
    pub artifact_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(None, None).await
    }

    pub async fn spawn_with(
        numbers: Option<Arc<dyn InvoiceNumberSource>>,
        artifacts: Option<Arc<dyn ArtifactStore>>,
    ) -> Self {
        let artifact_dir = TempDir::new().expect("temp dir");
        let store = Arc::new(InMemoryStore::new());
        let artifacts = match artifacts {
            Some(a) => a,
            None => Arc::new(
                FsArtifactStore::new(artifact_dir.path())
                    .await
                    .expect("artifact store"),
            ),
        };
        let numbers =
            numbers.unwrap_or_else(|| Arc::new(InvoiceNumberGenerator::default()));

        let service = Arc::new(InvoiceService::new(
            store.clone(),
            store.clone(),
            artifacts,
            numbers,
            InvoiceRenderer::new("Aargon Management"),
            Duration::from_secs(5),
        ));

        Self {
            store,
            service,
            artifact_dir,
        }
    }

    pub fn seed_client(&self) -> Client {
        self.store
            .insert_client("Acme Telecom", Some("12 Harbor Road, Lagos".to_string()))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Number source that replays a fixed script before falling back to the real
/// generator, for forcing collisions deterministically.
pub struct ScriptedNumbers {
    script: Mutex<Vec<String>>,
    fallback: InvoiceNumberGenerator,
}

impl ScriptedNumbers {
    pub fn new(script: Vec<&str>) -> Self {
        let mut script: Vec<String> = script.into_iter().map(String::from).collect();
        script.reverse();
        Self {
            script: Mutex::new(script),
            fallback: InvoiceNumberGenerator::default(),
        }
    }
}

impl InvoiceNumberSource for ScriptedNumbers {
    fn next(&self, creation_date: NaiveDate) -> String {
        match self.script.lock().unwrap().pop() {
            Some(number) => number,
            None => self.fallback.next(creation_date),
        }
    }
}

/// Artifact store whose writes always fail, for exercising the create path's
/// no-partial-state guarantee.
pub struct FailingArtifactStore;

#[async_trait]
impl ArtifactStore for FailingArtifactStore {
    async fn write(&self, _name: &str, _bytes: &[u8]) -> Result<String, AppError> {
        Err(AppError::StorageFailure(anyhow::anyhow!(
            "simulated write failure"
        )))
    }

    async fn exists(&self, _path: &str) -> bool {
        false
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, AppError> {
        Err(AppError::NotFound(anyhow::anyhow!(
            "artifact missing from storage: {}",
            path
        )))
    }

    async fn remove(&self, _path: &str) -> Result<(), AppError> {
        Ok(())
    }
}
