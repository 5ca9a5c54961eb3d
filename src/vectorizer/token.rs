use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Split raw text into lower-cased alphabetic word tokens.
///
/// A token is a maximal run of word characters (letters, marks, `_`);
/// digits and everything else separate tokens.
///
/// # Examples
/// ```
/// use soft_vsm_eval::vectorizer::token::tokenize;
/// assert_eq!(tokenize("The cat sat on 2 mats!"), vec!["the", "cat", "sat", "on", "mats"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in lowered.chars() {
        if is_token_char(c) {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[inline]
fn is_token_char(c: char) -> bool {
    (c.is_alphanumeric() || c == '_') && !c.is_numeric()
}

/// Summed character length of a token sequence.
/// This is the document length used by pivoted weighting and `avgdl`.
#[inline]
pub fn char_length<T: AsRef<str>>(tokens: &[T]) -> usize {
    tokens.iter().map(|t| t.as_ref().chars().count()).sum()
}

///  TokenFrequency 構造体
/// tokenの出現頻度を管理するための構造体です
/// Keeps first-seen token order, which the vocabulary relies on.
///
/// # Examples
/// ```
/// use soft_vsm_eval::vectorizer::token::TokenFrequency;
/// let mut freq = TokenFrequency::new();
/// freq.add_tokens(&["b", "a", "b"]);
/// assert_eq!(freq.token_count("b"), 2);
/// assert_eq!(freq.token_sum(), 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TokenFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    token_count: IndexMap<String, u32>,
    total_token_count: u64,
}

impl TokenFrequency {
    /// 新しいTokenFrequencyを作成するメソッド
    pub fn new() -> Self {
        TokenFrequency {
            token_count: IndexMap::new(),
            total_token_count: 0,
        }
    }

    /// tokenを追加する
    ///
    /// # Arguments
    /// * `token` - 追加するトークン
    #[inline]
    pub fn add_token(&mut self, token: &str) -> &mut Self {
        let count = self.token_count.entry(token.to_string()).or_insert(0);
        *count += 1;
        self.total_token_count += 1;
        self
    }

    /// 複数のtokenを追加する
    ///
    /// # Arguments
    /// * `tokens` - 追加するトークンのスライス
    #[inline]
    pub fn add_tokens<T>(&mut self, tokens: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for token in tokens {
            self.add_token(token.as_ref());
        }
        self
    }

    #[inline]
    pub fn token_count(&self, token: &str) -> u32 {
        self.token_count.get(token).copied().unwrap_or(0)
    }

    /// total number of tokens added, repetitions included
    #[inline]
    pub fn token_sum(&self) -> u64 {
        self.total_token_count
    }

    /// number of distinct tokens
    #[inline]
    pub fn token_num(&self) -> usize {
        self.token_count.len()
    }

    /// (token, count) in first-seen order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.token_count.iter().map(|(t, &c)| (t.as_str(), c))
    }
}

impl<T: AsRef<str>> From<&[T]> for TokenFrequency {
    fn from(tokens: &[T]) -> Self {
        let mut freq = TokenFrequency::new();
        freq.add_tokens(tokens);
        freq
    }
}
