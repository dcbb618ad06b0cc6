//! Sentence-aware text chunking with overlap.

/// Words ending in `.` that don't end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "no", "fig", "inc", "ltd", "approx",
];

/// Packs sentences into chunks of at most `chunk_size` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// `chunk_overlap` is capped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Normalize whitespace, split into sentences and pack them.
    ///
    /// Each chunk after the first starts with the trailing sentences of the
    /// previous one, up to `chunk_overlap` characters.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Vec::new();
        }

        let pieces: Vec<String> = split_sentences(&normalized)
            .into_iter()
            .flat_map(|s| {
                if char_len(&s) > self.chunk_size {
                    force_split(&s, self.chunk_size)
                } else {
                    vec![s]
                }
            })
            .collect();

        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for sentence in pieces {
            let len = char_len(&sentence);
            if !current.is_empty() && joined_len(&current) + 1 + len > self.chunk_size {
                chunks.push(current.join(" "));
                current = self.carry_over(&current, len);
            }
            current.push(sentence);
        }
        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }

    /// Trailing sentences to repeat at the start of the next chunk.
    fn carry_over(&self, previous: &[String], incoming: usize) -> Vec<String> {
        let mut carried: Vec<String> = Vec::new();
        for sentence in previous.iter().rev() {
            let candidate = if carried.is_empty() {
                char_len(sentence)
            } else {
                joined_len(&carried) + 1 + char_len(sentence)
            };
            if candidate > self.chunk_overlap {
                break;
            }
            carried.insert(0, sentence.clone());
        }
        while !carried.is_empty() && joined_len(&carried) + 1 + incoming > self.chunk_size {
            carried.remove(0);
        }
        carried
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn joined_len(parts: &[String]) -> usize {
    if parts.is_empty() {
        return 0;
    }
    parts.iter().map(|p| char_len(p)).sum::<usize>() + parts.len() - 1
}

fn is_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(' ')
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.is_empty() {
        return false;
    }
    // Initials ("J.") and initialisms ("e.g.", "U.S.")
    if word.chars().count() == 1 && word.chars().all(char::is_alphabetic) {
        return true;
    }
    if word.contains('.') {
        return true;
    }
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

fn opens_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '“' | '‘')
}

/// Split whitespace-normalized text after `.`, `!` or `?` when the next
/// word looks like the start of a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if !matches!(c, '.' | '!' | '?') {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && matches!(chars[j].1, '.' | '!' | '?' | '"' | '\'' | ')' | '”' | '’') {
            j += 1;
        }

        let boundary = j + 1 < chars.len()
            && chars[j].1 == ' '
            && opens_sentence(chars[j + 1].1)
            && !(c == '.' && is_abbreviation(&text[start..pos]));

        if boundary {
            let sentence = text[start..chars[j].0].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = chars[j + 1].0;
            i = j + 1;
        } else {
            i = j;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Cut an oversized sentence into pieces of at most `size` characters,
/// preferring the last space inside each window.
fn force_split(sentence: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
        if start >= chars.len() {
            break;
        }
        let remaining = chars.len() - start;
        if remaining <= size {
            pieces.push(chars[start..].iter().collect::<String>());
            break;
        }

        let window_end = start + size;
        let cut = chars[start..=window_end.min(chars.len() - 1)]
            .iter()
            .rposition(|c| c.is_whitespace())
            .map(|offset| start + offset)
            .filter(|&at| at > start)
            .unwrap_or(window_end);

        let piece: String = chars[start..cut].iter().collect();
        pieces.push(piece.trim_end().to_string());
        start = cut;
    }
    pieces
}
