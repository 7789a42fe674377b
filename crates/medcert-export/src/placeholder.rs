//! Placeholder substitution over run-structured text.
//!
//! Word processors split a visually contiguous token such as
//! `{nome_paciente}` across several formatting runs whenever the text was
//! edited, spell-checked or partially restyled. Substitution therefore works
//! on the concatenated text of a whole block and then writes the result back
//! into the block's first run.

use std::borrow::Cow;

/// Mapping from placeholder token to literal replacement, kept ordered from
/// the longest key to the shortest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements {
    entries: Vec<(String, String)>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a token. Empty keys are ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
            return;
        }
        // Stable position among keys of equal length keeps insertion order.
        let at = self
            .entries
            .iter()
            .position(|(k, _)| k.len() < key.len())
            .unwrap_or(self.entries.len());
        self.entries.insert(at, (key, value));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in the order they are tried at each text position.
    pub fn keys_by_length(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Copy of the map with every value passed through `f(key, value)`.
    pub fn map_values(&self, mut f: impl FnMut(&str, &str) -> String) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), f(k, v)))
                .collect(),
        }
    }

    /// Substitute every token in `text`.
    ///
    /// One left-to-right pass: at each position the keys are tried longest
    /// first, a match emits the value verbatim and skips past the key.
    /// Values are never rescanned, so a value that happens to contain a
    /// token stays literal. Returns the input unchanged (borrowed) when no
    /// key occurs in it.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !self.entries.iter().any(|(k, _)| text.contains(k.as_str())) {
            return Cow::Borrowed(text);
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        'scan: while let Some(ch) = rest.chars().next() {
            for (key, value) in &self.entries {
                if let Some(tail) = rest.strip_prefix(key.as_str()) {
                    out.push_str(value);
                    rest = tail;
                    continue 'scan;
                }
            }
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
        Cow::Owned(out)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Replacements {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// A paragraph-like unit of text made of formatting runs.
pub trait TextBlock {
    /// Text of each run, in document order.
    fn run_texts(&self) -> Vec<String>;

    /// Write `text` into the first run, keeping that run's formatting, and
    /// clear the text of every other run. A block without runs gains one.
    fn rewrite(&mut self, text: String);

    /// Logical text of the block.
    fn text(&self) -> String {
        self.run_texts().concat()
    }
}

/// Substitute placeholders across the runs of `block`.
///
/// Returns `true` when the block was rewritten. Blocks whose text contains
/// no key, or whose substituted text equals the original, keep their run
/// structure untouched.
pub fn substitute_block<B>(block: &mut B, replacements: &Replacements) -> bool
where
    B: TextBlock + ?Sized,
{
    let original = block.text();
    match replacements.apply(&original) {
        Cow::Owned(text) if text != original => {
            block.rewrite(text);
            true
        }
        _ => false,
    }
}

/// Every `{...}` token in `text`, in order of first appearance, without
/// duplicates. Braces never nest and a token never spans a line break.
pub fn find_placeholders(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find(['{', '}', '\n']) {
            Some(end) if after[end..].starts_with('}') && end > 0 => {
                let token = &rest[open..open + end + 2];
                if !found.iter().any(|t| t == token) {
                    found.push(token.to_string());
                }
                rest = &after[end + 1..];
            }
            Some(end) if after[end..].starts_with('}') => rest = &after[end + 1..],
            Some(end) => rest = &after[end..],
            None => break,
        }
    }
    found
}

/// In-memory block: plain run texts, used for template inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Block {
    pub runs: Vec<String>,
}

impl Block {
    pub fn new<S: Into<String>>(runs: impl IntoIterator<Item = S>) -> Self {
        Self {
            runs: runs.into_iter().map(Into::into).collect(),
        }
    }
}

impl TextBlock for Block {
    fn run_texts(&self) -> Vec<String> {
        self.runs.clone()
    }

    fn rewrite(&mut self, text: String) {
        match self.runs.split_first_mut() {
            Some((first, others)) => {
                *first = text;
                others.iter_mut().for_each(String::clear);
            }
            None => self.runs.push(text),
        }
    }
}
