use std::collections::VecDeque;

use tracing::warn;

use super::loader::Document;

/// Separators tried in order, coarsest first. The empty separator splits
/// between characters and always applies.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A chunk of one document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub content: String,
    pub page: Option<u32>,
}

/// Recursive character splitter with a sliding overlap window.
///
/// Lengths are counted in `char`s. Text is cut at the coarsest separator it
/// contains; the pieces are merged back into chunks of at most `chunk_size`,
/// and each new chunk starts with up to `chunk_overlap` characters carried
/// over from the end of the previous one. A piece that is too large on its
/// own is split again with the next separator.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextSplitter {
    /// Callers must ensure `chunk_overlap < chunk_size` (see `Config::validate`).
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Split every document, keeping each chunk's page.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<TextChunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .map(|content| TextChunk {
                        content,
                        page: doc.page,
                    })
            })
            .collect()
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, finer) = match separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s.as_str()))
        {
            Some(i) if separators[i].is_empty() => ("", &separators[..0]),
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => ("", &separators[..0]),
        };

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge_pieces(&small));
                small.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge_pieces(&small));
        }
        chunks
    }

    /// Greedily merge small pieces into chunks, sliding the window forward
    /// so that at most `chunk_overlap` characters repeat between chunks.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {total}, which is longer than the specified {}",
                        self.chunk_size
                    );
                }
                if !window.is_empty() {
                    if let Some(chunk) = join_window(&window) {
                        chunks.push(chunk);
                    }
                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match window.pop_front() {
                            Some((_, dropped)) => total -= dropped,
                            None => break,
                        }
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if let Some(chunk) = join_window(&window) {
            chunks.push(chunk);
        }
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split `text` at every occurrence of `separator`, keeping the separator at
/// the start of the piece that follows it. Empty pieces are dropped.
fn split_keep_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keep_separator() {
        assert_eq!(split_keep_separator("a\n\nb\n\nc", "\n\n"), vec!["a", "\n\nb", "\n\nc"]);
        assert_eq!(split_keep_separator("\n\nlead", "\n\n"), vec!["\n\nlead"]);
        assert_eq!(split_keep_separator("a\n\n\n\nb", "\n\n"), vec!["a", "\n\n", "\n\nb"]);
        assert_eq!(split_keep_separator("héllo", ""), vec!["h", "é", "l", "l", "o"]);
    }

    #[test]
    fn test_short_text_single_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split_text("Paragraph 1\n\nParagraph 2\n\nParagraph 3");
        assert_eq!(chunks, vec!["Paragraph 1\n\nParagraph 2\n\nParagraph 3"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        let splitter = TextSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n   \n\n   ").is_empty());
    }

    #[test]
    fn test_large_paragraphs_split_on_blank_lines() {
        let splitter = TextSplitter::default();
        let first = "a".repeat(600);
        let second = "b".repeat(600);
        let chunks = splitter.split_text(&format!("{first}\n\n{second}"));
        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn test_unbroken_text_uses_sliding_window() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split_text(&"a".repeat(2500));
        let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lengths, vec![1000, 1000, 900]);
    }

    #[test]
    fn test_words_overlap_between_chunks() {
        let splitter = TextSplitter::default();
        let text: Vec<String> = (0..600).map(|i| format!("w{i}")).collect();
        let chunks = splitter.split_text(&text.join(" "));

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
            assert_eq!(chunk, chunk.trim());
        }
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(
                pair[1].split_whitespace().any(|w| w == last_word),
                "{last_word} should be carried into the next chunk"
            );
            let carried: usize = pair[1]
                .split_whitespace()
                .take_while(|w| pair[0].split_whitespace().any(|p| p == *w))
                .map(|w| w.len() + 1)
                .sum();
            assert!(carried <= 201, "overlap of {carried} chars exceeds window");
        }
    }

    #[test]
    fn test_splitting_is_deterministic() {
        let splitter = TextSplitter::default();
        let text = "Lorem ipsum dolor sit amet.\n".repeat(200);
        let first = splitter.split_text(&text);
        let second = splitter.split_text(&text);
        assert_eq!(first, second);
        assert!(first.len() > 1);
    }

    #[test]
    fn test_multibyte_lengths_counted_in_chars() {
        let splitter = TextSplitter::new(10, 2);
        let chunks = splitter.split_text(&"日本語".repeat(10));
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
        assert!(chunks.len() >= 4);
    }

    #[test]
    fn test_split_documents_keeps_pages() {
        let splitter = TextSplitter::new(20, 5);
        let docs = vec![
            Document {
                content: "page zero text".to_string(),
                page: Some(0),
            },
            Document {
                content: "page one has a bit more text in it".to_string(),
                page: Some(1),
            },
        ];
        let chunks = splitter.split_documents(&docs);
        assert_eq!(chunks[0].page, Some(0));
        assert!(chunks.len() >= 3);
        assert!(chunks[1..].iter().all(|c| c.page == Some(1)));
    }
}
