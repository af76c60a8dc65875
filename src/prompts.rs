//! Prompt catalogue and filler answers

use crate::types::{Prompt, PromptId};
use rand::seq::IndexedRandom;
use std::path::Path;

/// Errors loading a prompt file
#[derive(Debug, thiserror::Error)]
pub enum PromptLoadError {
    #[error("Failed to read prompt file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse prompt file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Prompt file contains no prompts")]
    Empty,
}

/// Built-in prompts as (category, text)
const DEFAULT_PROMPTS: &[(&str, &str)] = &[
    ("life", "The worst advice you could give a new parent"),
    ("life", "Something you should never say at a job interview"),
    ("life", "The real reason the dinosaurs went extinct"),
    ("food", "A terrible name for a restaurant"),
    ("food", "The secret ingredient in grandma's soup"),
    ("food", "A pizza topping that should be illegal"),
    ("tech", "What the computer is really thinking when it freezes"),
    ("tech", "A new feature nobody asked for in the next phone"),
    ("tech", "The worst possible password"),
    ("pop", "The title of a movie that would flop instantly"),
    ("pop", "A superhero with the most useless power"),
    ("pop", "The lyrics nobody knows in the national anthem"),
    ("animals", "What cats actually do when nobody is home"),
    ("animals", "The most ridiculous pet to bring on a plane"),
    ("misc", "A bad slogan for a dentist"),
    ("misc", "What aliens would think of Mondays"),
    ("misc", "The first thing you would do as a ghost"),
    ("misc", "A strange thing to find in your pocket"),
];

/// Texts used for players who missed the answering deadline
pub const FILLER_ANSWERS: &[&str] = &[
    "¯\\_(ツ)_/¯",
    "No comment...",
    "I'll sit this one out",
    "404 - Answer not found",
    "Error: creativity unavailable",
    "I ran out of ideas",
    "...",
    "Ask a chatbot",
    "I don't know what to say",
    "Awkward silence",
    "*Connection lost*",
    "Zzz...",
    "Next question please",
    "🤷",
];

/// Pick a random filler text
pub fn random_filler() -> &'static str {
    FILLER_ANSWERS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or("...")
}

/// The set of prompts rounds are drawn from
#[derive(Debug, Clone)]
pub struct PromptBank {
    prompts: Vec<Prompt>,
}

impl Default for PromptBank {
    fn default() -> Self {
        let prompts = DEFAULT_PROMPTS
            .iter()
            .enumerate()
            .map(|(i, (category, text))| Prompt {
                id: format!("builtin-{}", i + 1),
                text: text.to_string(),
                category: Some(category.to_string()),
            })
            .collect();
        Self { prompts }
    }
}

impl PromptBank {
    pub fn new(prompts: Vec<Prompt>) -> Self {
        Self { prompts }
    }

    /// Load prompts from a JSON array of `{id, text, category}` objects
    pub fn from_file(path: &Path) -> Result<Self, PromptLoadError> {
        let raw = std::fs::read_to_string(path)?;
        let prompts: Vec<Prompt> = serde_json::from_str(&raw)?;
        let prompts: Vec<Prompt> = prompts
            .into_iter()
            .filter(|p| !p.text.trim().is_empty())
            .collect();
        if prompts.is_empty() {
            return Err(PromptLoadError::Empty);
        }
        Ok(Self { prompts })
    }

    /// Load from `path` when given, otherwise or on failure use the built-in prompts
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match Self::from_file(path) {
            Ok(bank) => {
                tracing::info!("Loaded {} prompts from {}", bank.len(), path.display());
                bank
            }
            Err(e) => {
                tracing::warn!(
                    "Could not load prompts from {}: {}. Using built-in prompts.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Pick a random prompt not in `used`, or any prompt once all have been used
    pub fn random_prompt(&self, used: &[PromptId]) -> Option<Prompt> {
        let mut rng = rand::rng();
        let unused: Vec<&Prompt> = self
            .prompts
            .iter()
            .filter(|p| !used.contains(&p.id))
            .collect();

        match unused.choose(&mut rng) {
            Some(prompt) => Some((*prompt).clone()),
            None => self.prompts.choose(&mut rng).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn prompt(id: &str) -> Prompt {
        Prompt {
            id: id.to_string(),
            text: format!("Prompt {}", id),
            category: None,
        }
    }

    #[test]
    fn test_default_bank_is_populated() {
        let bank = PromptBank::default();
        assert!(!bank.is_empty());
        assert!(bank.random_prompt(&[]).is_some());
    }

    #[test]
    fn test_random_prompt_prefers_unused() {
        let bank = PromptBank::new(vec![prompt("a"), prompt("b"), prompt("c")]);
        let used = vec!["a".to_string(), "b".to_string()];

        for _ in 0..20 {
            assert_eq!(bank.random_prompt(&used).unwrap().id, "c");
        }
    }

    #[test]
    fn test_random_prompt_falls_back_when_all_used() {
        let bank = PromptBank::new(vec![prompt("a"), prompt("b")]);
        let used = vec!["a".to_string(), "b".to_string()];

        let picked = bank.random_prompt(&used).unwrap();
        assert!(picked.id == "a" || picked.id == "b");
    }

    #[test]
    fn test_empty_bank_returns_none() {
        let bank = PromptBank::new(vec![]);
        assert!(bank.random_prompt(&[]).is_none());
    }

    #[test]
    fn test_filler_comes_from_list() {
        let filler = random_filler();
        assert!(FILLER_ANSWERS.contains(&filler));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "p1", "text": "Why is the sky?", "category": "science"}},
                {{"id": "p2", "text": "   "}}]"#
        )
        .unwrap();

        let bank = PromptBank::from_file(file.path()).unwrap();
        assert_eq!(bank.len(), 1);
        let prompt = bank.random_prompt(&[]).unwrap();
        assert_eq!(prompt.id, "p1");
        assert_eq!(prompt.category.as_deref(), Some("science"));
    }

    #[test]
    fn test_load_invalid_file_falls_back_to_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(
            PromptBank::from_file(file.path()),
            Err(PromptLoadError::Parse(_))
        ));

        let bank = PromptBank::load_or_default(Some(file.path()));
        assert_eq!(bank.len(), PromptBank::default().len());
    }

    #[test]
    fn test_load_empty_list_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();

        assert!(matches!(
            PromptBank::from_file(file.path()),
            Err(PromptLoadError::Empty)
        ));
    }
}
