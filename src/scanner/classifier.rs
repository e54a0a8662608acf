//! Trial file name classification.
//!
//! Trial files are named `SUBJECT_VARIANT._Action_EXERCISE.csv`. Subject and
//! variant contain neither `_` nor `.`; the exercise contains no `.` but may
//! contain underscores.

use crate::models::TrialKey;
use regex::Regex;
use std::sync::LazyLock;

static TRIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^._]+)_([^._]+)\._Action_([^.]+)\.(?i:csv)$")
        .expect("trial file pattern is a valid regex")
});

/// Outcome of classifying a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Matched(TrialKey),
    Unclassified,
}

/// Parse a file name (not a path) into its trial key.
pub fn classify(file_name: &str) -> Classification {
    match TRIAL_PATTERN.captures(file_name) {
        Some(caps) => Classification::Matched(TrialKey::new(&caps[1], &caps[2], &caps[3])),
        None => Classification::Unclassified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(name: &str) -> TrialKey {
        match classify(name) {
            Classification::Matched(key) => key,
            Classification::Unclassified => panic!("{} should classify", name),
        }
    }

    #[test]
    fn test_classify_basic() {
        assert_eq!(
            classify("Alice_FFP3._Action_Cough.csv"),
            Classification::Matched(TrialKey::new("Alice", "FFP3", "Cough"))
        );
    }

    #[test]
    fn test_classify_exercise_with_underscores() {
        let key = key_of("Bob_EMProS._Action_Deep_Breathing.csv");
        assert_eq!(key.subject, "Bob");
        assert_eq!(key.variant, "EMProS");
        assert_eq!(key.exercise, "Deep_Breathing");
    }

    #[test]
    fn test_classify_uppercase_extension() {
        assert!(matches!(
            classify("Bob_FFP3._Action_Talk.CSV"),
            Classification::Matched(_)
        ));
    }

    #[test]
    fn test_classify_rejects_non_matching() {
        for name in [
            "weird-file.csv",
            "Alice_FFP3_Action_Cough.csv",
            "Alice_FF.P3._Action_Cough.csv",
            "Al.ice_FFP3._Action_Cough.csv",
            "Alice_FFP3._Action_Cough.txt",
            "Alice_FFP3._Action_Cough.csv.bak",
            "Alice_FFP3._Action_Co.ugh.csv",
            "_FFP3._Action_Cough.csv",
            "Alice_._Action_Cough.csv",
            "Alice_FFP3._Action_.csv",
            "",
        ] {
            assert_eq!(classify(name), Classification::Unclassified, "{}", name);
        }
    }

    #[test]
    fn test_classify_round_trip() {
        for name in [
            "Alice_FFP3._Action_Cough.csv",
            "Dr-Who_3M6200P100._Action_Bend_Over.csv",
            "x_y._Action_z.csv",
            "Carol_Versaflo._Action_Normal Breathing.csv",
        ] {
            let key = key_of(name);
            assert_eq!(key.file_name(), name);
        }
    }
}
