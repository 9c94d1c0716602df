//! # Tokenizer for the Perceptron Tagger
//!
//! Splits running text into tokens with byte offsets. Whitespace separates
//! tokens and punctuation characters become tokens of their own.

/// A token extracted from a text with positional information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token text content
    pub text: String,
    /// Start byte position in the original string
    pub start: usize,
    /// End byte position in the original string
    pub end: usize,
    /// Token index in the sequence
    pub index: usize,
}

/// Characters that close a sentence.
const SENTENCE_END: &[&str] = &[".", "!", "?", "…"];

/// Whitespace/punctuation tokenizer.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer;

impl Tokenizer {
    /// Create a new tokenizer instance.
    pub fn new() -> Self {
        Self
    }

    /// Tokenize a text into a sequence of tokens.
    ///
    /// # Examples
    /// ```
    /// use nerc_core::model::Tokenizer;
    ///
    /// let tokens = Tokenizer::new().tokenize("I like London.");
    /// let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
    /// assert_eq!(texts, ["I", "like", "London", "."]);
    /// ```
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut current_start: Option<usize> = None;

        let push = |tokens: &mut Vec<Token>, start: usize, end: usize| {
            let index = tokens.len();
            tokens.push(Token {
                text: input[start..end].to_string(),
                start,
                end,
                index,
            });
        };

        for (idx, c) in input.char_indices() {
            if c.is_whitespace() || is_split_punctuation(c) {
                if let Some(start) = current_start.take() {
                    push(&mut tokens, start, idx);
                }
                if !c.is_whitespace() {
                    push(&mut tokens, idx, idx + c.len_utf8());
                }
            } else if current_start.is_none() {
                current_start = Some(idx);
            }
        }

        // Emit final token if non-empty
        if let Some(start) = current_start {
            push(&mut tokens, start, input.len());
        }

        tokens
    }

    /// Groups tokens into sentences, each ending after sentence-final punctuation.
    pub fn sentences<'a>(&self, tokens: &'a [Token]) -> Vec<&'a [Token]> {
        let mut sentences = Vec::new();
        let mut start = 0;
        for (i, token) in tokens.iter().enumerate() {
            if SENTENCE_END.contains(&token.text.as_str()) {
                sentences.push(&tokens[start..=i]);
                start = i + 1;
            }
        }
        if start < tokens.len() {
            sentences.push(&tokens[start..]);
        }
        sentences
    }
}

/// Punctuation split off words. Hyphens, apostrophes and periods inside
/// words are split too, so "U.S." tokenizes as "U", ".", "S", ".".
fn is_split_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '«' | '»' | '“' | '”' | '‘' | '’' | '…' | '¿' | '¡')
}
