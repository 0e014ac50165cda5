//! File-based transcript store for raw generations

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;

use crate::application::ports::outbound::{TranscriptEntry, TranscriptPort};

/// Writes one plain-text file per successful generation.
pub struct FileTranscriptStore {
    dir: PathBuf,
}

impl FileTranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the transcript directory if it does not exist yet.
    pub async fn init(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    fn file_name(entry: &TranscriptEntry) -> String {
        let safe_model: String = entry
            .model_name
            .chars()
            .map(|c| if matches!(c, ':' | '/' | '.') { '_' } else { c })
            .collect();
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        format!(
            "character_profile_text_{}_{safe_model}_{stamp}.txt",
            entry.user_id
        )
    }
}

#[async_trait]
impl TranscriptPort for FileTranscriptStore {
    type Error = std::io::Error;

    async fn append(&self, entry: &TranscriptEntry) -> Result<(), Self::Error> {
        let content = format!(
            "UserID: {}\nМодель: {}\nТемпература: {}\n\n\
             --- ЗАПРОС ПОЛЬЗОВАТЕЛЯ (обработанный) ---\n{}\n\n\
             --- ОТВЕТ LLM (СЫРОЙ) ---\n{}\n",
            entry.user_id,
            entry.model_name,
            entry.temperature,
            entry.task_description,
            entry.raw_response,
        );
        let path = self.dir.join(Self::file_name(entry));
        tokio::fs::write(path, content).await
    }
}
