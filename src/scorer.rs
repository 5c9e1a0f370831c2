//! The BM25 scoring boundary. Consumes [`TermFieldDoc`](crate::reader::TermFieldDoc)
//! postings and a Dictionary-counter-derived document frequency, produces
//! a score and (optionally) an [`Explanation`] tree — this crate stops at
//! per-term scoring; combining term scores into a ranked result set for a
//! boolean/phrase query is a search-layer concern above this boundary.
//!
//! Grounded in `kite_rocksdb`'s scorer module shape (a small struct
//! holding `k1`/`b` plus corpus statistics, with a `score` entry point),
//! adapted to this crate's row layout: document frequency comes from the
//! Dictionary counter rather than a separate postings-list length field.

use crate::reader::TermFieldDoc;

/// Okapi BM25's usual `k1`. Controls how quickly additional occurrences
/// of a term stop adding to the score.
pub const DEFAULT_K1: f32 = 1.2;
/// Okapi BM25's usual `b`. Controls how strongly document length is
/// normalized against the corpus average.
pub const DEFAULT_B: f32 = 0.75;
/// Assumed document length when none is recorded for a document.
pub const DEFAULT_DOC_LENGTH: f32 = 1024.0;
/// Assumed corpus-average document length when none has been computed.
pub const DEFAULT_AVG_DOC_LENGTH: f32 = 512.0;

/// A node in the scoring breakdown returned when `explain` is requested.
/// Mirrors the way Lucene/bleve's `Explanation` nests "this score is the
/// sum/product of these sub-scores" so a caller can render or log why a
/// document ranked where it did.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub value: f32,
    pub description: String,
    pub children: Vec<Explanation>,
}

impl Explanation {
    fn leaf(value: f32, description: impl Into<String>) -> Explanation {
        Explanation { value, description: description.into(), children: Vec::new() }
    }

    fn node(value: f32, description: impl Into<String>, children: Vec<Explanation>) -> Explanation {
        Explanation { value, description: description.into(), children }
    }
}

/// One scored document, for one term or summed across several.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMatch {
    pub doc_id: Vec<u8>,
    pub score: f32,
    pub explanation: Option<Explanation>,
}

/// Scores postings against corpus-wide statistics (`total_docs`,
/// `avg_doc_length`). One scorer is shared across every term in a query
/// since those statistics don't vary per term.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Scorer {
    k1: f32,
    b: f32,
    total_docs: u64,
    avg_doc_length: f32,
}

impl Bm25Scorer {
    pub fn new(total_docs: u64, avg_doc_length: f32) -> Bm25Scorer {
        Bm25Scorer { k1: DEFAULT_K1, b: DEFAULT_B, total_docs, avg_doc_length }
    }

    pub fn with_params(total_docs: u64, avg_doc_length: f32, k1: f32, b: f32) -> Bm25Scorer {
        Bm25Scorer { k1, b, total_docs, avg_doc_length }
    }

    /// `idf = 1 + ln(N / (docFreq + 1))`.
    pub fn idf(&self, doc_freq: u64) -> f32 {
        1.0 + (self.total_docs as f32 / (doc_freq as f32 + 1.0)).ln()
    }

    /// `tf = ((k1+1)*freq) / (k1*(1 - b + b*dl/adl) + freq)`.
    pub fn tf(&self, freq: u64, doc_length: f32) -> f32 {
        let freq = freq as f32;
        let length_norm = 1.0 - self.b + self.b * (doc_length / self.avg_doc_length);
        ((self.k1 + 1.0) * freq) / (self.k1 * length_norm + freq)
    }

    /// Scores one term's posting for one document: `idf * tf`.
    pub fn score_term(&self, posting: &TermFieldDoc, doc_freq: u64, doc_length: f32, explain: bool) -> DocumentMatch {
        let idf = self.idf(doc_freq);
        let tf = self.tf(posting.freq, doc_length);
        let score = idf * tf;

        let explanation = explain.then(|| {
            Explanation::node(
                score,
                format!("bm25(freq={}, docFreq={})", posting.freq, doc_freq),
                vec![
                    Explanation::leaf(idf, format!("idf, docFreq={}, N={}", doc_freq, self.total_docs)),
                    Explanation::leaf(tf, format!("tf, freq={}, docLength={}", posting.freq, doc_length)),
                ],
            )
        });

        DocumentMatch { doc_id: posting.doc_id.clone(), score, explanation }
    }

    /// Sums several terms' scores for the same document, e.g. the terms
    /// of a multi-word query that all matched. `doc_id` must be the same
    /// across every entry in `matches`.
    pub fn sum(doc_id: Vec<u8>, matches: Vec<DocumentMatch>, explain: bool) -> DocumentMatch {
        let score = matches.iter().map(|m| m.score).sum();
        let explanation = explain.then(|| {
            let children = matches.iter().filter_map(|m| m.explanation.clone()).collect();
            Explanation::node(score, "sum of term scores", children)
        });
        DocumentMatch { doc_id, score, explanation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(doc_id: &[u8], freq: u64) -> TermFieldDoc {
        TermFieldDoc { doc_id: doc_id.to_vec(), freq, pre_score: 1.0, vectors: Vec::new() }
    }

    #[test]
    fn idf_decreases_as_document_frequency_rises() {
        let scorer = Bm25Scorer::new(1000, DEFAULT_AVG_DOC_LENGTH);
        assert!(scorer.idf(1) > scorer.idf(100));
    }

    #[test]
    fn tf_saturates_as_frequency_grows() {
        let scorer = Bm25Scorer::new(1000, DEFAULT_AVG_DOC_LENGTH);
        let low = scorer.tf(1, DEFAULT_AVG_DOC_LENGTH);
        let high = scorer.tf(100, DEFAULT_AVG_DOC_LENGTH);
        assert!(high > low);
        assert!(high < scorer.k1 + 1.0);
    }

    #[test]
    fn longer_than_average_documents_score_lower_for_the_same_frequency() {
        let scorer = Bm25Scorer::new(1000, DEFAULT_AVG_DOC_LENGTH);
        let short = scorer.tf(5, DEFAULT_AVG_DOC_LENGTH);
        let long = scorer.tf(5, DEFAULT_AVG_DOC_LENGTH * 4.0);
        assert!(long < short);
    }

    #[test]
    fn explain_builds_idf_and_tf_children() {
        let scorer = Bm25Scorer::new(1000, DEFAULT_AVG_DOC_LENGTH);
        let result = scorer.score_term(&posting(b"1", 3), 10, DEFAULT_DOC_LENGTH, true);
        let explanation = result.explanation.unwrap();
        assert_eq!(explanation.children.len(), 2);
        assert!((explanation.value - result.score).abs() < f32::EPSILON);
    }

    #[test]
    fn no_explain_means_no_explanation_tree() {
        let scorer = Bm25Scorer::new(1000, DEFAULT_AVG_DOC_LENGTH);
        let result = scorer.score_term(&posting(b"1", 3), 10, DEFAULT_DOC_LENGTH, false);
        assert!(result.explanation.is_none());
    }

    #[test]
    fn sum_adds_scores_across_terms() {
        let scorer = Bm25Scorer::new(1000, DEFAULT_AVG_DOC_LENGTH);
        let a = scorer.score_term(&posting(b"1", 2), 5, DEFAULT_DOC_LENGTH, false);
        let b = scorer.score_term(&posting(b"1", 1), 50, DEFAULT_DOC_LENGTH, false);
        let expected = a.score + b.score;
        let combined = Bm25Scorer::sum(b"1".to_vec(), vec![a, b], false);
        assert!((combined.score - expected).abs() < f32::EPSILON);
    }
}
