//! Analysis is an external collaborator: this module only fixes the
//! trait boundary (`CharFilter` → `Tokenizer` → `TokenFilter` chain,
//! composed by an `Analyzer`) and a worker pool that runs it off the
//! caller's thread. The pool itself is grounded in the teacher's
//! `crossbeam_channel`-based dispatch (see `meilidb-core`'s update
//! pipeline), generalized from a single-shot channel hookup to a fixed
//! pool of long-lived workers with cooperative shutdown: dropping the
//! queue's job sender closes the channel, each worker's `recv()` then
//! returns an error and the loop exits.

pub mod tokenizer;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Sender};

use crate::error::{BackendError, Result};
use crate::row::stored::StoredValueType;

pub use tokenizer::{SimpleAnalyzer, Token};

/// Strips or rewrites raw text before tokenization (HTML stripping,
/// accent folding at the byte level, and so on).
pub trait CharFilter: Send + Sync {
    fn filter<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str>;
}

/// Splits filtered text into a stream of terms with byte offsets.
pub trait Tokenizer: Send + Sync {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<Token<'a>>;
}

/// Transforms a token stream (lowercasing, stop-word removal, stemming).
pub trait TokenFilter: Send + Sync {
    fn filter<'a>(&self, tokens: Vec<Token<'a>>) -> Vec<Token<'a>>;
}

/// The composed char-filter → tokenizer → token-filter chain for one field.
pub trait Analyzer: Send + Sync {
    fn analyze<'a>(&self, text: &'a str) -> Vec<Token<'a>>;
}

/// One field's contribution to a document, as handed to the analysis
/// queue. `text` drives indexing (absent for fields that are stored but
/// not searchable); `store` carries the raw bytes to keep verbatim.
#[derive(Debug, Clone)]
pub struct PendingField {
    pub field_id: u16,
    pub array_positions: Vec<u64>,
    pub text: Option<String>,
    pub store: Option<(StoredValueType, Vec<u8>)>,
}

/// One term occurrence produced by analysis, ready to become a
/// TermFrequency row's term-vector entry once grouped by `(field_id, term)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermOccurrence {
    pub field_id: u16,
    pub term: Vec<u8>,
    pub pos: u64,
    pub start: u64,
    pub end: u64,
    pub array_positions: Vec<u64>,
}

/// One Stored row's worth of material, pending key construction by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub field_id: u16,
    pub array_positions: Vec<u64>,
    pub value_type: StoredValueType,
    pub raw_value: Vec<u8>,
}

/// The output of analyzing one document: every term occurrence across
/// every field, plus every value to store, still unkeyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub doc_id: Vec<u8>,
    pub occurrences: Vec<TermOccurrence>,
    pub stored: Vec<StoredEntry>,
}

fn analyze_document(analyzer: &dyn Analyzer, doc_id: Vec<u8>, fields: Vec<PendingField>) -> AnalysisResult {
    let mut occurrences = Vec::new();
    let mut stored = Vec::new();

    for field in fields {
        if let Some(text) = &field.text {
            for token in analyzer.analyze(text) {
                occurrences.push(TermOccurrence {
                    field_id: field.field_id,
                    term: token.term.as_bytes().to_vec(),
                    pos: token.position as u64,
                    start: token.start as u64,
                    end: token.end as u64,
                    array_positions: field.array_positions.clone(),
                });
            }
        }
        if let Some((value_type, raw_value)) = field.store {
            stored.push(StoredEntry {
                field_id: field.field_id,
                array_positions: field.array_positions.clone(),
                value_type,
                raw_value,
            });
        }
    }

    AnalysisResult { doc_id, occurrences, stored }
}

struct Job {
    doc_id: Vec<u8>,
    fields: Vec<PendingField>,
    analyzer: Arc<dyn Analyzer>,
    reply: Sender<AnalysisResult>,
}

/// A fixed pool of analysis workers fed over an unbounded channel. Submit
/// blocks the caller until its own result comes back, but independent
/// documents analyze concurrently across the pool.
pub struct AnalysisQueue {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl AnalysisQueue {
    pub fn new(worker_count: usize) -> AnalysisQueue {
        let (sender, receiver) = unbounded::<Job>();
        let worker_count = worker_count.max(1);
        let workers = (0..worker_count)
            .map(|_| {
                let receiver = receiver.clone();
                thread::spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        let result = analyze_document(job.analyzer.as_ref(), job.doc_id, job.fields);
                        let _ = job.reply.send(result);
                    }
                })
            })
            .collect();
        AnalysisQueue { sender: Some(sender), workers }
    }

    /// Submits a document for analysis and blocks until its result is ready.
    pub fn submit(
        &self,
        doc_id: Vec<u8>,
        fields: Vec<PendingField>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<AnalysisResult> {
        let (reply, reply_receiver) = bounded(1);
        let sender = self.sender.as_ref().ok_or(BackendError::ExecuteFailed("analysis queue is shut down".into()))?;
        sender
            .send(Job { doc_id, fields, analyzer, reply })
            .map_err(|_| BackendError::ExecuteFailed("analysis queue is shut down".into()))?;
        reply_receiver
            .recv()
            .map_err(|_| BackendError::ExecuteFailed("analysis worker dropped its reply".into()).into())
    }

    /// Closes the job channel and waits for every worker to drain and exit.
    pub fn shutdown(mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for AnalysisQueue {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_analyzes_text_fields_and_passes_through_stored_fields() {
        let queue = AnalysisQueue::new(2);
        let analyzer: Arc<dyn Analyzer> = Arc::new(SimpleAnalyzer::default());
        let fields = vec![
            PendingField { field_id: 0, array_positions: Vec::new(), text: Some("hello world".into()), store: None },
            PendingField {
                field_id: 1,
                array_positions: vec![0],
                text: None,
                store: Some((StoredValueType::I64, 7i64.to_le_bytes().to_vec())),
            },
        ];
        let result = queue.submit(b"doc-1".to_vec(), fields, analyzer).unwrap();
        assert_eq!(result.doc_id, b"doc-1");
        assert_eq!(result.occurrences.len(), 2);
        assert_eq!(result.stored.len(), 1);
        queue.shutdown();
    }

    #[test]
    fn independent_documents_analyze_concurrently() {
        let queue = AnalysisQueue::new(4);
        let analyzer: Arc<dyn Analyzer> = Arc::new(SimpleAnalyzer::default());
        for i in 0..16 {
            let fields = vec![PendingField {
                field_id: 0,
                array_positions: Vec::new(),
                text: Some(format!("doc number {}", i)),
                store: None,
            }];
            let result = queue.submit(format!("doc-{}", i).into_bytes(), fields, Arc::clone(&analyzer)).unwrap();
            assert_eq!(result.occurrences.len(), 3);
        }
        queue.shutdown();
    }
}
