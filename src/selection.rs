//! Selection filters.
//!
//! A selection is three sets (subjects, variants, exercises) applied as an
//! intersection predicate before any file is loaded.

use crate::models::{ClassifiedFile, SelectionAxis, TrialKey};
use crate::scanner::AvailableOptions;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Resolved selection over the three axes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub subjects: BTreeSet<String>,
    pub variants: BTreeSet<String>,
    pub exercises: BTreeSet<String>,
}

impl Selection {
    /// Select everything that is available.
    #[allow(dead_code)] // Equivalent to resolving `all` on every axis
    pub fn all(options: &AvailableOptions) -> Self {
        Self {
            subjects: options.subjects.clone(),
            variants: options.variants.clone(),
            exercises: options.exercises.clone(),
        }
    }

    /// Resolve user tokens for each axis against the available options.
    pub fn resolve(
        subjects: &[String],
        variants: &[String],
        exercises: &[String],
        options: &AvailableOptions,
    ) -> Self {
        Self {
            subjects: resolve_tokens(subjects, &options.subjects),
            variants: resolve_tokens(variants, &options.variants),
            exercises: resolve_tokens(exercises, &options.exercises),
        }
    }

    /// First axis (subjects, variants, exercises) that selects nothing.
    pub fn empty_axis(&self) -> Option<SelectionAxis> {
        if self.subjects.is_empty() {
            Some(SelectionAxis::Subjects)
        } else if self.variants.is_empty() {
            Some(SelectionAxis::Variants)
        } else if self.exercises.is_empty() {
            Some(SelectionAxis::Exercises)
        } else {
            None
        }
    }

    pub fn matches(&self, key: &TrialKey) -> bool {
        self.subjects.contains(&key.subject)
            && self.variants.contains(&key.variant)
            && self.exercises.contains(&key.exercise)
    }

    /// Keep the files this selection matches, preserving order.
    pub fn apply<'a>(&self, files: &'a [ClassifiedFile]) -> Vec<&'a ClassifiedFile> {
        files.iter().filter(|f| self.matches(&f.key)).collect()
    }
}

/// Resolve a token list against one axis.
///
/// `all` selects every option; an empty list or `none` selects nothing.
/// Other tokens match options case-insensitively; unknown tokens are
/// logged and ignored.
pub fn resolve_tokens(tokens: &[String], options: &BTreeSet<String>) -> BTreeSet<String> {
    let tokens: Vec<String> = tokens
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.iter().any(|t| t.eq_ignore_ascii_case("all")) {
        return options.clone();
    }

    let by_lower: HashMap<String, &String> =
        options.iter().map(|o| (o.to_lowercase(), o)).collect();

    let mut selected = BTreeSet::new();
    for token in tokens {
        if token.eq_ignore_ascii_case("none") {
            continue;
        }
        match by_lower.get(&token.to_lowercase()) {
            Some(option) => {
                selected.insert((*option).clone());
            }
            None => warn!("'{}' not found in available options, skipping", token),
        }
    }
    selected
}
