//! KOL Text Pipeline
//!
//! Cleaning, chunking, and encoding of influencer commentary into the
//! numeric features that lead the state vector. These are simple,
//! stateless collaborators of the RL core; the encoder emits
//! deterministic surface statistics until a transformer backend is
//! integrated.

/// Normalizes raw KOL text before downstream processing.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    lowercase: bool,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self { lowercase: true }
    }
}

impl TextCleaner {
    pub fn new(lowercase: bool) -> Self {
        Self { lowercase }
    }

    /// Trim, collapse runs of whitespace, optionally lowercase.
    pub fn clean(&self, text: &str) -> String {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.lowercase {
            normalized.to_lowercase()
        } else {
            normalized
        }
    }
}

/// Splits cleaned text into bounded word windows for encoding.
#[derive(Debug, Clone)]
pub struct TextChunker {
    max_words: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self { max_words: 128 }
    }
}

impl TextChunker {
    pub fn new(max_words: usize) -> Self {
        Self {
            max_words: max_words.max(1),
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        words
            .chunks(self.max_words)
            .map(|w| w.join(" "))
            .collect()
    }
}

/// Encodes text chunks into a dense feature vector.
///
/// Empty input yields an empty vector, degrading the state to market
/// features only.
#[derive(Debug, Clone, Default)]
pub struct KolTextEncoder;

impl KolTextEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Output: `[mean chunk length, exclamation ratio]`.
    pub fn encode(&self, chunks: &[String]) -> Vec<f64> {
        if chunks.is_empty() {
            return Vec::new();
        }

        let total_chars: usize = chunks.iter().map(|c| c.len()).sum();
        let mean_len = total_chars as f64 / chunks.len() as f64;

        let exclamations: usize = chunks
            .iter()
            .map(|c| c.matches('!').count())
            .sum();
        let exclamation_ratio = exclamations as f64 / total_chars.max(1) as f64;

        vec![mean_len, exclamation_ratio]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaner_collapses_whitespace_and_lowercases() {
        let cleaner = TextCleaner::default();
        assert_eq!(cleaner.clean("  BTC   to\tthe\n MOON "), "btc to the moon");
    }

    #[test]
    fn cleaner_can_keep_case() {
        let cleaner = TextCleaner::new(false);
        assert_eq!(cleaner.clean(" Buy BTC "), "Buy BTC");
    }

    #[test]
    fn chunker_bounds_window_size() {
        let chunker = TextChunker::new(3);
        let chunks = chunker.chunk("a b c d e f g");
        assert_eq!(chunks, vec!["a b c", "d e f", "g"]);
    }

    #[test]
    fn encoder_is_empty_for_empty_input() {
        assert!(KolTextEncoder::new().encode(&[]).is_empty());
    }

    #[test]
    fn encoder_is_deterministic() {
        let encoder = KolTextEncoder::new();
        let chunks = vec!["buy now!".to_string(), "sell later".to_string()];
        assert_eq!(encoder.encode(&chunks), encoder.encode(&chunks));
        assert_eq!(encoder.encode(&chunks).len(), 2);
    }
}
