//! Word dictionary collaborator.

use super::errors::{ServiceError, ServiceResult};
use crate::puzzle::layout::{MIN_WORD_LEN, is_puzzle_word};
use anyhow::Context;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use std::{collections::BTreeSet, path::Path};
use tokio::sync::RwLock;

/// Trait for the word dictionary
#[async_trait]
pub trait WordRepository: Send + Sync {
    /// Add a word, false if it was already present
    async fn add_word(&self, word: &str) -> ServiceResult<bool>;

    /// Remove a word, false if it was absent
    async fn remove_word(&self, word: &str) -> ServiceResult<bool>;

    /// Check whether a word is present
    async fn check_word(&self, word: &str) -> ServiceResult<bool>;

    /// Random word with at least `min_len` letters
    async fn random_word(&self, min_len: usize) -> ServiceResult<Option<String>>;

    /// Random word containing `letter`, skipping anything in `exclude`
    async fn random_word_containing(
        &self,
        letter: char,
        exclude: &[String],
    ) -> ServiceResult<Option<String>>;
}

/// Trimmed, lowercased form, or `None` when it is not a puzzle word
fn normalize(word: &str) -> Option<String> {
    let word = word.trim().to_lowercase();
    is_puzzle_word(&word).then_some(word)
}

/// Word dictionary kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryWordRepository {
    words: RwLock<BTreeSet<String>>,
}

impl InMemoryWordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any list of words. Blank entries and entries with anything
    /// other than letters are skipped.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: RwLock::new(
                words
                    .into_iter()
                    .filter_map(|w| normalize(w.as_ref()))
                    .collect(),
            ),
        }
    }

    /// Build from newline-separated text
    pub fn parse(text: &str) -> Self {
        Self::from_words(text.lines())
    }

    /// Load a newline-separated word list from disk
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read word list {}", path.display()))?;
        let repo = Self::parse(&text);
        log::info!("Loaded {} words from {}", repo.len_blocking(), path.display());
        Ok(repo)
    }

    /// Word count without an async context, for startup logging
    fn len_blocking(&self) -> usize {
        self.words.try_read().map(|w| w.len()).unwrap_or(0)
    }

    /// Number of words
    pub async fn len(&self) -> usize {
        self.words.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.words.read().await.is_empty()
    }
}

#[async_trait]
impl WordRepository for InMemoryWordRepository {
    async fn add_word(&self, word: &str) -> ServiceResult<bool> {
        let Some(word) = normalize(word) else {
            return Err(ServiceError::InvalidWord(word.trim().to_string()));
        };
        Ok(self.words.write().await.insert(word))
    }

    async fn remove_word(&self, word: &str) -> ServiceResult<bool> {
        let Some(word) = normalize(word) else {
            return Ok(false);
        };
        Ok(self.words.write().await.remove(&word))
    }

    async fn check_word(&self, word: &str) -> ServiceResult<bool> {
        let Some(word) = normalize(word) else {
            return Ok(false);
        };
        Ok(self.words.read().await.contains(&word))
    }

    async fn random_word(&self, min_len: usize) -> ServiceResult<Option<String>> {
        let words = self.words.read().await;
        let candidates: Vec<&String> = words
            .iter()
            .filter(|w| w.chars().count() >= min_len)
            .collect();
        let pick = candidates.choose(&mut rand::rng()).map(|w| (*w).clone());
        Ok(pick)
    }

    async fn random_word_containing(
        &self,
        letter: char,
        exclude: &[String],
    ) -> ServiceResult<Option<String>> {
        let words = self.words.read().await;
        let candidates: Vec<&String> = words
            .iter()
            .filter(|w| w.chars().count() >= MIN_WORD_LEN)
            .filter(|w| w.contains(letter))
            .filter(|w| !exclude.contains(w))
            .collect();
        let pick = candidates.choose(&mut rand::rng()).map(|w| (*w).clone());
        Ok(pick)
    }
}
