//! Two-level grouping of loaded series.
//!
//! Series are partitioned by exercise, then by (subject, variant) within
//! each exercise. Keys compare by exact string equality.

use crate::analysis::aggregator::mean_of_means;
use crate::models::SeriesRecord;
use std::collections::{BTreeMap, BTreeSet};

/// All records for one exercise, in encounter order.
#[derive(Debug, Clone, Default)]
pub struct ExerciseGroup {
    pub exercise: String,
    pub records: Vec<SeriesRecord>,
}

/// Aggregated value for one (subject, variant) pair within an exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectVariantCell {
    pub subject: String,
    pub variant: String,
    /// One mean per matching series.
    pub means: Vec<f64>,
}

impl SubjectVariantCell {
    /// Mean of the per-series means.
    pub fn value(&self) -> f64 {
        // A cell is only created with at least one mean
        mean_of_means(&self.means).unwrap_or(f64::NAN)
    }
}

impl ExerciseGroup {
    /// Build the cells keyed by (subject, variant).
    pub fn cells(&self) -> BTreeMap<(String, String), SubjectVariantCell> {
        let mut cells: BTreeMap<(String, String), SubjectVariantCell> = BTreeMap::new();
        for record in &self.records {
            let key = (record.key.subject.clone(), record.key.variant.clone());
            cells
                .entry(key)
                .or_insert_with(|| SubjectVariantCell {
                    subject: record.key.subject.clone(),
                    variant: record.key.variant.clone(),
                    means: Vec::new(),
                })
                .means
                .push(record.mean);
        }
        cells
    }

    /// Distinct subjects, sorted lexicographically.
    pub fn subjects(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.key.subject.clone()).collect()
    }

    /// Distinct variants (unordered by canonical rank).
    pub fn variants(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.key.variant.clone()).collect()
    }
}

/// Records partitioned by exercise, iterated in exercise-label order.
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    groups: BTreeMap<String, ExerciseGroup>,
}

impl GroupIndex {
    /// Group records, preserving encounter order within each exercise.
    pub fn build(records: impl IntoIterator<Item = SeriesRecord>) -> Self {
        let mut groups: BTreeMap<String, ExerciseGroup> = BTreeMap::new();
        for record in records {
            groups
                .entry(record.key.exercise.clone())
                .or_insert_with(|| ExerciseGroup {
                    exercise: record.key.exercise.clone(),
                    records: Vec::new(),
                })
                .records
                .push(record);
        }
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[allow(dead_code)] // Lookup by exercise label
    pub fn get(&self, exercise: &str) -> Option<&ExerciseGroup> {
        self.groups.get(exercise)
    }

    pub fn into_groups(self) -> impl Iterator<Item = ExerciseGroup> {
        self.groups.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanedSeries, TrialKey};

    fn record(subject: &str, variant: &str, exercise: &str, mean: f64) -> SeriesRecord {
        SeriesRecord {
            key: TrialKey::new(subject, variant, exercise),
            series: CleanedSeries::from_absolute(vec![(0, mean)]).unwrap(),
            mean,
            geometric_mean: mean,
        }
    }

    #[test]
    fn test_build_partitions_by_exercise() {
        let index = GroupIndex::build(vec![
            record("Alice", "FFP3", "Talk", 10.0),
            record("Bob", "FFP3", "Cough", 20.0),
            record("Alice", "FFP3", "Cough", 30.0),
        ]);

        assert_eq!(index.len(), 2);
        let cough = index.get("Cough").unwrap();
        let subjects: Vec<_> = cough.records.iter().map(|r| r.key.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Bob", "Alice"]);

        let order: Vec<_> = index.into_groups().map(|g| g.exercise).collect();
        assert_eq!(order, vec!["Cough", "Talk"]);
    }

    #[test]
    fn test_cells_average_duplicates() {
        let index = GroupIndex::build(vec![
            record("Alice", "FFP3", "Cough", 100.0),
            record("Alice", "FFP3", "Cough", 300.0),
            record("Alice", "EMProS", "Cough", 42.5),
        ]);
        let group = index.get("Cough").unwrap();
        assert_eq!(group.records.len(), 3);

        let cells = group.cells();
        assert_eq!(cells.len(), 2);
        let dup = &cells[&("Alice".to_string(), "FFP3".to_string())];
        assert_eq!(dup.means, vec![100.0, 300.0]);
        assert_eq!(dup.value(), 200.0);
        assert_eq!(
            cells[&("Alice".to_string(), "EMProS".to_string())].value(),
            42.5
        );
    }

    #[test]
    fn test_keys_are_exact() {
        let index = GroupIndex::build(vec![
            record("alice", "FFP3", "Cough", 1.0),
            record("Alice", "FFP3", "Cough", 2.0),
            record("Alice", "ffp3", "Cough", 3.0),
        ]);
        let group = index.get("Cough").unwrap();
        assert_eq!(group.cells().len(), 3);
        assert_eq!(group.subjects().len(), 2);
        assert_eq!(group.variants().len(), 2);
    }

    #[test]
    fn test_empty_index() {
        let index = GroupIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.get("Cough").is_none());
    }
}
