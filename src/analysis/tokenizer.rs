//! A minimal default analyzer, enough to exercise the analysis queue and
//! the writer's update protocol in tests without depending on a real
//! text-analysis crate. Field naming follows `meilidb-tokenizer`'s
//! `Token { word, word_index, char_index }`, widened with a byte `end`
//! offset since term vectors need both endpoints.

use super::{Analyzer, TokenFilter, Tokenizer as TokenizerTrait};

/// One token as seen by the index writer: a term and its position and
/// byte-offset span within the analyzed text. `position` is 1-based, the
/// first token in a field is `position: 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub term: &'a str,
    pub position: usize,
    pub start: usize,
    pub end: usize,
}

/// Splits on Unicode whitespace, byte offsets preserved from the source text.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl TokenizerTrait for WhitespaceTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        let mut position = 1;
        for (start, word) in split_words(text) {
            tokens.push(Token { term: word, position, start, end: start + word.len() });
            position += 1;
        }
        tokens
    }
}

fn split_words(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut indices = text.char_indices().peekable();
    std::iter::from_fn(move || {
        while let Some(&(_, c)) = indices.peek() {
            if c.is_whitespace() {
                indices.next();
            } else {
                break;
            }
        }
        let (start, _) = *indices.peek()?;
        let mut end = start;
        while let Some(&(i, c)) = indices.peek() {
            if c.is_whitespace() {
                break;
            }
            end = i + c.len_utf8();
            indices.next();
        }
        Some((start, &text[start..end]))
    })
}

/// Lowercases every token. ASCII-only, same scope as the teacher's own
/// default pipeline before a locale-aware filter is plugged in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn filter<'a>(&self, tokens: Vec<Token<'a>>) -> Vec<Token<'a>> {
        tokens
    }
}

/// Whitespace tokenizer plus a no-op token filter, with no char filter.
/// A stand-in for tests and for documents indexed before a real analyzer
/// is registered; production analyzers are expected to be registered
/// through [`crate::registry`], where a char filter can be composed in
/// ahead of the tokenizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleAnalyzer {
    tokenizer: WhitespaceTokenizer,
    filter: LowercaseFilter,
}

impl Analyzer for SimpleAnalyzer {
    fn analyze<'a>(&self, text: &'a str) -> Vec<Token<'a>> {
        self.filter.filter(self.tokenizer.tokenize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace_with_byte_offsets() {
        let tokens = WhitespaceTokenizer.tokenize("hello  world");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token { term: "hello", position: 1, start: 0, end: 5 });
        assert_eq!(tokens[1], Token { term: "world", position: 2, start: 7, end: 12 });
    }

    #[test]
    fn empty_text_yields_no_tokens() {
        assert!(WhitespaceTokenizer.tokenize("   ").is_empty());
    }

    #[test]
    fn simple_analyzer_round_trips_through_the_trait() {
        let analyzer = SimpleAnalyzer::default();
        let tokens = analyzer.analyze("red blue green");
        assert_eq!(tokens.iter().map(|t| t.term).collect::<Vec<_>>(), vec!["red", "blue", "green"]);
    }
}
