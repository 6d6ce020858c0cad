//! Text normalization applied to every message before it is scored.
//!
//! The output is lower-case, free of markup, links and the symbol noise
//! chat clients tend to add, with all whitespace collapsed to single spaces.
//! Running it twice gives the same result as running it once.

use std::sync::LazyLock;

use regex::Regex;

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

// `[id123|Name], ...` mentions that some clients prepend when replying.
static ID_CITATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[id\d*[^\]]*\][,\s]*").unwrap());

static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:quot|lt|gt|amp|apos);|&#\d+;").unwrap());

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{2,256}\.[a-z]{2,6}\b[-a-zA-Z0-9@:%_+.~#?&/=]*",
    )
    .unwrap()
});

static WIKI_LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\[\]]+\|([^\[\]]+)\]").unwrap());

static WHITESPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const NOISE_SYMBOLS: &[char] = &[
    '(', '_', '#', '*', '=', '^', '/', '`', '@', '«', '»', '©', '…', '“', '•', '—', '<', '>', '[',
    ']', '"', '\'', '+', '%', '|', '&',
];

const SENTENCE_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', ')', '('];

/// Normalize raw message text into the form the scorer expects.
pub fn normalize(raw: &str) -> String {
    let text = TAG_PATTERN.replace_all(raw, " ");
    let text = ID_CITATION_PATTERN.replace(&text, "");
    let text = ENTITY_PATTERN.replace_all(&text, " ");
    let text = URL_PATTERN.replace_all(&text, " ");
    let text = WIKI_LINK_PATTERN.replace_all(&text, "$1");

    let text = replace_chars(&text, |ch| NOISE_SYMBOLS.contains(&ch));
    let text = replace_chars(&text, |ch| {
        NOISE_SYMBOLS.contains(&ch) || SENTENCE_PUNCTUATION.contains(&ch)
    });

    let text = text.replace("--", " ").replace('\n', " ");
    let text = WHITESPACE_PATTERN.replace_all(&text, " ");

    text.to_lowercase()
}

fn replace_chars(text: &str, is_noise: impl Fn(char) -> bool) -> String {
    text.chars()
        .map(|ch| if is_noise(ch) { ' ' } else { ch })
        .collect()
}
