pub mod gate;
pub mod oracle;
pub mod tokenizer;

pub use gate::{MAX_TOKENS, ScoringGate};
pub use oracle::{HttpOracle, ToxicityModel};
pub use tokenizer::{Tokenizer, WordPieceTokenizer};

/// Gate wired to the production tokenizer and HTTP model.
pub type ToxicityScorer = ScoringGate<WordPieceTokenizer, HttpOracle>;
