use std::collections::HashMap;
use std::{fs, path::Path};

use anyhow::Context as _;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";
pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";

// Longer words are mapped straight to [UNK].
const MAX_CHARS_PER_WORD: usize = 100;

/// Turns text into the token ids the scoring model was trained on.
pub trait Tokenizer: Send + Sync {
    /// Full id sequence including control tokens, never truncated or padded.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Id used to pad sequences to the model's fixed input length.
    fn pad_id(&self) -> u32;
}

/// Encode `text` padded to exactly `max_len` ids, or `None` if it does not fit.
pub fn encode_padded(tokenizer: &impl Tokenizer, text: &str, max_len: usize) -> Option<Vec<u32>> {
    let mut ids = tokenizer.encode(text);
    if ids.len() > max_len {
        return None;
    }
    ids.resize(max_len, tokenizer.pad_id());
    Some(ids)
}

/// Uncased BERT WordPiece tokenizer backed by a `vocab.txt` file.
#[derive(Clone, Debug)]
pub struct WordPieceTokenizer {
    vocab: HashMap<String, u32>,
    cls_id: u32,
    sep_id: u32,
    pad_id: u32,
    unk_id: u32,
}

impl WordPieceTokenizer {
    /// Load a vocabulary with one token per line; the line number is the id.
    pub fn from_vocab_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read vocabulary `{}`", path.display()))?;
        Self::from_tokens(contents.lines())
    }

    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> anyhow::Result<Self> {
        let mut vocab = HashMap::new();
        for (id, token) in tokens.into_iter().enumerate() {
            let id = u32::try_from(id).context("vocabulary too large")?;
            vocab.entry(token.trim_end().to_owned()).or_insert(id);
        }

        let lookup = |token: &str| {
            vocab
                .get(token)
                .copied()
                .with_context(|| format!("vocabulary is missing `{token}`"))
        };

        let cls_id = lookup(CLS_TOKEN)?;
        let sep_id = lookup(SEP_TOKEN)?;
        let pad_id = lookup(PAD_TOKEN)?;
        let unk_id = lookup(UNK_TOKEN)?;

        Ok(Self {
            vocab,
            cls_id,
            sep_id,
            pad_id,
            unk_id,
        })
    }

    fn push_word_pieces(&self, word: &str, ids: &mut Vec<u32>) {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > MAX_CHARS_PER_WORD {
            ids.push(self.unk_id);
            return;
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let mut end = chars.len();
            let mut found = None;
            while start < end {
                let mut candidate: String = chars[start..end].iter().collect();
                if start > 0 {
                    candidate.insert_str(0, "##");
                }
                if let Some(id) = self.vocab.get(&candidate) {
                    found = Some(*id);
                    break;
                }
                end -= 1;
            }

            match found {
                Some(id) => pieces.push(id),
                None => {
                    ids.push(self.unk_id);
                    return;
                }
            }
            start = end;
        }

        ids.extend(pieces);
    }
}

impl Tokenizer for WordPieceTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        let mut ids = vec![self.cls_id];
        for word in basic_tokens(text) {
            self.push_word_pieces(&word, &mut ids);
        }
        ids.push(self.sep_id);
        ids
    }

    fn pad_id(&self) -> u32 {
        self.pad_id
    }
}

/// Uncased BERT pre-tokenization: lower-case, strip accents, drop control
/// characters, and split on whitespace, punctuation and every CJK ideograph.
fn basic_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    // Accents are stripped by decomposing and dropping the combining marks,
    // so `й` reads as `и` and `café` as `cafe`.
    let chars = text
        .chars()
        .flat_map(char::to_lowercase)
        .nfd()
        .filter(|ch| !is_combining_mark(*ch));

    for ch in chars {
        if ch.is_whitespace() {
            flush(&mut current, &mut tokens);
        } else if ch.is_control() || ch == '\u{FFFD}' {
            continue;
        } else if is_punctuation(ch) || is_cjk(ch) {
            flush(&mut current, &mut tokens);
            tokens.push(ch.to_string());
        } else {
            current.push(ch);
        }
    }
    flush(&mut current, &mut tokens);

    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

// CJK Unified Ideographs blocks, as split by the BERT tokenizer.
fn is_cjk(ch: char) -> bool {
    matches!(
        u32::from(ch),
        0x4E00..=0x9FFF
            | 0x3400..=0x4DBF
            | 0x2_0000..=0x2_A6DF
            | 0x2_A700..=0x2_B73F
            | 0x2_B740..=0x2_B81F
            | 0x2_B820..=0x2_CEAF
            | 0xF900..=0xFAFF
            | 0x2_F800..=0x2_FA1F
    )
}

fn is_punctuation(ch: char) -> bool {
    ch.is_ascii_punctuation() || (!ch.is_alphanumeric() && !ch.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::{Tokenizer, WordPieceTokenizer, encode_padded};

    const VOCAB: &[&str] = &[
        "[PAD]", "[UNK]", "[CLS]", "[SEP]", "you", "are", "un", "##believ", "##able", "!", "a",
    ];

    fn tokenizer() -> WordPieceTokenizer {
        WordPieceTokenizer::from_tokens(VOCAB.iter().copied()).unwrap()
    }

    #[test]
    fn splits_words_into_pieces() {
        assert_eq!(
            tokenizer().encode("You are UNBELIEVABLE!"),
            vec![2, 4, 5, 6, 7, 8, 9, 3]
        );
    }

    #[test]
    fn unknown_words_become_unk() {
        assert_eq!(tokenizer().encode("you xyz"), vec![2, 4, 1, 3]);
        // A word that only partially matches is a single [UNK].
        assert_eq!(tokenizer().encode("unknown"), vec![2, 1, 3]);
    }

    #[test]
    fn empty_text_is_only_control_tokens() {
        assert_eq!(tokenizer().encode(""), vec![2, 3]);
    }

    #[test]
    fn pads_to_length_or_rejects_overflow() {
        let tokenizer = tokenizer();
        assert_eq!(
            encode_padded(&tokenizer, "you are", 6),
            Some(vec![2, 4, 5, 3, 0, 0])
        );
        assert_eq!(encode_padded(&tokenizer, "you are", 4), Some(vec![2, 4, 5, 3]));
        assert_eq!(encode_padded(&tokenizer, "you are a", 4), None);
    }

    #[test]
    fn accents_are_stripped_before_lookup() {
        let tokenizer = WordPieceTokenizer::from_tokens([
            "[PAD]", "[UNK]", "[CLS]", "[SEP]", "и", "cafe", "ёлка", "елка",
        ])
        .unwrap();

        assert_eq!(tokenizer.encode("й"), vec![2, 4, 3]);
        assert_eq!(tokenizer.encode("Café"), vec![2, 5, 3]);
        assert_eq!(tokenizer.encode("Ёлка"), vec![2, 7, 3]);
    }

    #[test]
    fn cjk_ideographs_are_separate_tokens() {
        let tokenizer =
            WordPieceTokenizer::from_tokens(["[PAD]", "[UNK]", "[CLS]", "[SEP]", "中", "文", "a"])
                .unwrap();

        assert_eq!(tokenizer.encode("a中文a"), vec![2, 6, 4, 5, 6, 3]);
    }

    #[test]
    fn missing_control_tokens_are_rejected() {
        assert!(WordPieceTokenizer::from_tokens(["[PAD]", "[CLS]", "word"]).is_err());
    }
}
