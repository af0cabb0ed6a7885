//! Stage and sequence resolution
//!
//! Resolves the effective `(stage, sequence)` pair for a deployment
//! trigger: an explicit override wins, otherwise the first stage and that
//! stage's first sequence in declaration order. The no-override sequence
//! default always reads the *first* stage's sequence list, even when a
//! stage override selected a different stage.

use crate::error::{ExtractError, Result};
use flotilla_types::Shipyard;

/// Resolve the effective stage and sequence from overrides and the shipyard.
pub fn resolve_stage_and_sequence(
    shipyard: &Shipyard,
    stage_override: Option<&str>,
    sequence_override: Option<&str>,
) -> Result<(String, String)> {
    let stage = match stage_override.filter(|s| !s.is_empty()) {
        Some(wanted) => shipyard
            .stages
            .iter()
            .find(|s| s.name == wanted)
            .map(|s| s.name.clone())
            .ok_or_else(|| ExtractError::StageNotFound {
                stage: wanted.to_string(),
            })?,
        None => shipyard
            .stages
            .first()
            .map(|s| s.name.clone())
            .ok_or(ExtractError::NoStagesDefined)?,
    };

    let sequence = match sequence_override.filter(|s| !s.is_empty()) {
        Some(wanted) => shipyard
            .stage(&stage)
            .and_then(|s| s.sequences.iter().find(|name| name.as_str() == wanted))
            .cloned()
            .ok_or_else(|| ExtractError::SequenceNotFound {
                sequence: wanted.to_string(),
                stage: stage.clone(),
            })?,
        // The default deliberately mirrors the long-standing behavior of
        // reading the first stage's sequences, not the selected stage's.
        None => shipyard
            .stages
            .first()
            .and_then(|s| s.sequences.first())
            .cloned()
            .ok_or_else(|| ExtractError::NoSequencesDefined {
                stage: stage.clone(),
            })?,
    };

    Ok((stage, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_types::ShipyardStage;

    fn shipyard() -> Shipyard {
        Shipyard {
            stages: vec![
                ShipyardStage {
                    name: "one".into(),
                    sequences: vec!["rick".into(), "astley".into()],
                },
                ShipyardStage {
                    name: "two".into(),
                    sequences: vec!["paul".into()],
                },
            ],
        }
    }

    #[test]
    fn test_no_override_takes_first_stage_first_sequence() {
        let (stage, sequence) =
            resolve_stage_and_sequence(&shipyard(), None, None).unwrap();
        assert_eq!(stage, "one");
        assert_eq!(sequence, "rick");
    }

    #[test]
    fn test_stage_override_selects_stage_and_its_sequence() {
        let (stage, sequence) =
            resolve_stage_and_sequence(&shipyard(), Some("two"), Some("paul")).unwrap();
        assert_eq!(stage, "two");
        assert_eq!(sequence, "paul");
    }

    #[test]
    fn test_stage_override_without_sequence_falls_back_to_first_stage() {
        // The sequence default reads the first stage's list even though the
        // override selected stage "two".
        let (stage, sequence) =
            resolve_stage_and_sequence(&shipyard(), Some("two"), None).unwrap();
        assert_eq!(stage, "two");
        assert_eq!(sequence, "rick");
    }

    #[test]
    fn test_unknown_stage_override_fails() {
        let err = resolve_stage_and_sequence(&shipyard(), Some("three"), None).unwrap_err();
        assert!(matches!(err, ExtractError::StageNotFound { stage } if stage == "three"));
    }

    #[test]
    fn test_unknown_sequence_override_fails() {
        let err =
            resolve_stage_and_sequence(&shipyard(), None, Some("nonexistent")).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::SequenceNotFound { sequence, stage }
                if sequence == "nonexistent" && stage == "one"
        ));
    }

    #[test]
    fn test_empty_shipyard_fails() {
        let empty = Shipyard { stages: vec![] };
        let err = resolve_stage_and_sequence(&empty, None, None).unwrap_err();
        assert!(matches!(err, ExtractError::NoStagesDefined));
    }

    #[test]
    fn test_stage_without_sequences_fails() {
        let shipyard = Shipyard {
            stages: vec![ShipyardStage {
                name: "one".into(),
                sequences: vec![],
            }],
        };
        let err = resolve_stage_and_sequence(&shipyard, None, None).unwrap_err();
        assert!(matches!(err, ExtractError::NoSequencesDefined { stage } if stage == "one"));
    }
}
