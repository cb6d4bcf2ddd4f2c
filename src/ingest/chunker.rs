//! Sentence-aligned text chunking.
//!
//! Chunks never split a sentence. Consecutive chunks share up to
//! `overlap` characters worth of trailing sentences.

use regex::Regex;
use std::sync::OnceLock;

fn sentence_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+\s+").expect("Invalid regex"))
}

/// Split text into sentences at terminal punctuation followed by an uppercase letter.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in sentence_boundary().find_iter(&normalized) {
        let next_is_upper = normalized[m.end()..]
            .chars()
            .next()
            .is_some_and(char::is_uppercase);
        if !next_is_upper {
            continue;
        }

        let sentence = normalized[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }

    let rest = normalized[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

/// Groups sentences into chunks of bounded size.
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    chunk_size: usize,
    overlap: usize,
}

impl SentenceChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }

    /// Chunk text. A single sentence longer than the chunk size becomes its own chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        let lengths: Vec<usize> = sentences.iter().map(|s| s.chars().count()).collect();
        let mut chunks = Vec::new();
        let mut i = 0;

        while i < sentences.len() {
            let mut size = 0;
            let mut end = i;
            while end < sentences.len() {
                let space = usize::from(end > i);
                if end > i && size + space + lengths[end] > self.chunk_size {
                    break;
                }
                size += space + lengths[end];
                end += 1;
            }

            chunks.push(sentences[i..end].join(" "));
            if end == sentences.len() {
                break;
            }

            // Carry trailing sentences that fit in the overlap into the next chunk
            let mut carried = 0;
            let mut carried_size = 0;
            for k in (i..end).rev() {
                if carried_size + lengths[k] > self.overlap {
                    break;
                }
                carried_size += lengths[k];
                carried += 1;
            }

            i = (end - carried).max(i + 1);
        }

        chunks
    }
}
