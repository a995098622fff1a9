//! Data extraction: single-page scrapes and the batch runner
//!
//! The batch runner is deliberately boring: sequential, one attempt per
//! URL, and a failed item never aborts the batch. Per-item progress goes
//! over the UI bridge; the aggregate output is one labeled block per URL
//! in queue order.

use crate::agent::dispatch::{UiDispatcher, UiEvent};
use crate::client::RemoteClient;
use crate::error::Result;
use crate::validate::check_url;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for one scrape call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Target page URL
    pub url: String,

    /// Include hyperlinks in the extracted output
    pub scrape_links: bool,

    /// Strip navigation, ads, and boilerplate
    pub only_main_content: bool,

    /// Optional natural-language extraction instructions
    pub instructions: Option<String>,
}

impl ScrapeConfig {
    /// Same extraction parameters aimed at a different URL
    pub fn for_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }
}

/// Progress of one batch entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Queued,
    InProgress,
    Done,
    Failed,
}

/// One URL in the batch queue
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub url: String,
    pub status: BatchStatus,
}

/// Ordered queue of URLs awaiting extraction
#[derive(Debug, Default)]
pub struct BatchQueue {
    items: Vec<BatchItem>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a URL after validation.
    pub fn add(&mut self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        check_url(&url)?;
        self.items.push(BatchItem {
            url: url.trim().to_string(),
            status: BatchStatus::Queued,
        });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Import URLs from a text or CSV file, one entry per line (first
    /// column for CSV rows). Lines that do not validate are skipped with
    /// a warning; returns the number of URLs added.
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let contents = std::fs::read_to_string(path)?;
        let mut added = 0;
        for line in contents.lines() {
            let candidate = line
                .split(',')
                .next()
                .unwrap_or("")
                .trim()
                .trim_matches('"');
            if candidate.is_empty() {
                continue;
            }
            match self.add(candidate) {
                Ok(()) => added += 1,
                Err(e) => {
                    tracing::warn!(line = candidate, %e, "Skipping unimportable batch entry");
                }
            }
        }
        Ok(added)
    }
}

/// Scrape one URL after validating it.
pub async fn run_single(client: &dyn RemoteClient, config: &ScrapeConfig) -> Result<String> {
    check_url(&config.url)?;
    client.scrape(config).await
}

/// Run the queued batch sequentially and return the aggregated output.
///
/// Every URL gets exactly one attempt; item failures are recorded in
/// their output block and the batch continues. The queue is cleared
/// afterwards so a re-run starts from an explicit queue, not a stale one.
pub async fn run_batch(
    client: &dyn RemoteClient,
    template: &ScrapeConfig,
    queue: &mut BatchQueue,
    ui: &UiDispatcher,
) -> String {
    let total = queue.len();
    let mut output = String::new();

    for index in 0..total {
        let url = queue.items[index].url.clone();
        queue.items[index].status = BatchStatus::InProgress;
        ui.dispatch(UiEvent::BatchItem {
            index,
            status: BatchStatus::InProgress,
        });
        tracing::info!(index, total, %url, "Scraping batch entry");

        let header = format!("=== [{}/{}] {} ===\n", index + 1, total, url);
        output.push_str(&header);

        let status = match client.scrape(&template.for_url(&url)).await {
            Ok(data) => {
                output.push_str(&data);
                BatchStatus::Done
            }
            Err(e) => {
                tracing::warn!(%url, %e, "Batch entry failed");
                output.push_str(&format!("ERROR: {}", e));
                BatchStatus::Failed
            }
        };
        output.push_str("\n\n");

        queue.items[index].status = status;
        ui.dispatch(UiEvent::BatchItem { index, status });
    }

    queue.clear();
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testutil::MockRemoteClient;
    use std::io::Write;

    fn template() -> ScrapeConfig {
        ScrapeConfig {
            url: String::new(),
            scrape_links: false,
            only_main_content: true,
            instructions: None,
        }
    }

    #[test]
    fn test_queue_add_validates() {
        let mut queue = BatchQueue::new();
        queue.add("https://a.example/").unwrap();
        assert!(queue.add("ftp://b.example/").is_err());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.items()[0].status, BatchStatus::Queued);
    }

    #[test]
    fn test_import_file_first_csv_column() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("urls.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "https://a.example/,label one").unwrap();
        writeln!(file, "\"https://b.example/\",label two").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not a url,skip me").unwrap();
        writeln!(file, "https://c.example/page").unwrap();

        let mut queue = BatchQueue::new();
        let added = queue.import_file(&path).unwrap();
        assert_eq!(added, 3);
        let urls: Vec<_> = queue.items().iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.example/", "https://b.example/", "https://c.example/page"]
        );
    }

    #[tokio::test]
    async fn test_single_rejects_invalid_url() {
        let client = MockRemoteClient::new();
        let mut config = template();
        config.url = "file:///etc/passwd".to_string();
        assert!(matches!(
            run_single(&client, &config).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(client.scrape_calls(), 0);
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let client = MockRemoteClient::new();
        client.push_scrape(Ok("data A".to_string()));
        client.push_scrape(Err(Error::RemoteCall("timeout".to_string())));
        client.push_scrape(Ok("data C".to_string()));

        let mut queue = BatchQueue::new();
        queue.add("https://a.example/").unwrap();
        queue.add("https://b.example/").unwrap();
        queue.add("https://c.example/").unwrap();

        let (ui, mut rx) = UiDispatcher::channel();
        let output = run_batch(&client, &template(), &mut queue, &ui).await;

        // All three attempted, in order, failure recorded inline
        assert_eq!(client.scrape_calls(), 3);
        let pos_a = output.find("data A").unwrap();
        let pos_b = output.find("ERROR: Remote call failed: timeout").unwrap();
        let pos_c = output.find("data C").unwrap();
        assert!(pos_a < pos_b && pos_b < pos_c);
        assert!(output.contains("=== [2/3] https://b.example/ ==="));

        // Queue cleared for the next batch
        assert!(queue.is_empty());

        // Per-item progress in order: in-progress then terminal status
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let UiEvent::BatchItem { index, status } = event {
                events.push((index, status));
            }
        }
        assert_eq!(
            events,
            vec![
                (0, BatchStatus::InProgress),
                (0, BatchStatus::Done),
                (1, BatchStatus::InProgress),
                (1, BatchStatus::Failed),
                (2, BatchStatus::InProgress),
                (2, BatchStatus::Done),
            ]
        );
    }

    #[tokio::test]
    async fn test_batch_empty_queue() {
        let client = MockRemoteClient::new();
        let mut queue = BatchQueue::new();
        let (ui, _rx) = UiDispatcher::channel();
        let output = run_batch(&client, &template(), &mut queue, &ui).await;
        assert!(output.is_empty());
        assert_eq!(client.scrape_calls(), 0);
    }
}
