use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::TranscriptStore;
use crate::Result;
use crate::types::Transcript;

/// In-memory [`TranscriptStore`].
#[derive(Default)]
pub struct MemoryTranscriptStore {
    transcripts: RwLock<HashMap<String, Transcript>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transcripts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn insert(&self, transcript: Transcript) -> Result<()> {
        self.transcripts
            .write()
            .await
            .insert(transcript.id.clone(), transcript);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Transcript>> {
        Ok(self.transcripts.read().await.get(id).cloned())
    }

    async fn list(&self, application_id: &str) -> Result<Vec<Transcript>> {
        let mut found: Vec<Transcript> = self
            .transcripts
            .read()
            .await
            .values()
            .filter(|t| t.application_id == application_id)
            .cloned()
            .collect();
        // UUIDv7 ids sort by creation time.
        found.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(found)
    }
}
