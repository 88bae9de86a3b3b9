//! Pause/resume checkpoints.
//!
//! A checkpoint captures everything needed to re-enter the loop: the problem,
//! target confidence, the iteration that was about to run, the serialized
//! knowledge graph, the probability audit trail, and the adapted problem
//! profile. Files are written to a temporary sibling and renamed into place,
//! so a crash mid-write never leaves a truncated checkpoint behind.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CheckpointError, KnowledgeError};
use crate::knowledge::KnowledgeGraph;
use crate::probability::{ProbabilityLog, ProblemProfile};

/// Result type for checkpoint file operations.
pub type CheckpointResult<T> = std::result::Result<T, CheckpointError>;

/// Snapshot of a paused discovery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub problem: String,
    pub target_confidence: f64,
    /// The iteration that will run first after resuming.
    pub iteration: u64,
    /// Serialized [`KnowledgeGraph`].
    pub knowledge: serde_json::Value,
    pub probability_logs: Vec<ProbabilityLog>,
    /// Descriptors as adapted by the iterations run so far.
    #[serde(default)]
    pub profile: ProblemProfile,
    #[serde(default)]
    pub custom_factors: BTreeMap<String, f64>,
}

impl Checkpoint {
    /// Deserialize the knowledge graph stored in this checkpoint.
    pub fn restore_knowledge(&self) -> Result<KnowledgeGraph, KnowledgeError> {
        KnowledgeGraph::from_value(self.knowledge.clone())
    }

    /// Write the checkpoint as pretty JSON, atomically.
    pub fn save(&self, path: &Path) -> CheckpointResult<()> {
        let io_err = |source| CheckpointError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let temp_path = path.with_extension("tmp");
        let written = self
            .write_json(&temp_path)
            .and_then(|()| fs::rename(&temp_path, path).map_err(io_err));
        if let Err(err) = written {
            // Best-effort cleanup.
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
        tracing::debug!(path = %path.display(), iteration = self.iteration, "checkpoint saved");
        Ok(())
    }

    fn write_json(&self, temp_path: &Path) -> CheckpointResult<()> {
        let io_err = |source| CheckpointError::Io {
            path: temp_path.display().to_string(),
            source,
        };
        let file = File::create(temp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| CheckpointError::Encode {
            message: e.to_string(),
        })?;
        writer.flush().map_err(io_err)
    }

    /// Read a checkpoint written by [`save`](Self::save).
    pub fn load(path: &Path) -> CheckpointResult<Self> {
        let file = File::open(path).map_err(|source| CheckpointError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| CheckpointError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::{Angle, AngleCategory, AngleResult};

    fn sample() -> Checkpoint {
        let mut kg = KnowledgeGraph::new();
        let angle = Angle::new(AngleCategory::Relational, "r");
        kg.add_angle(angle.clone()).unwrap();
        kg.add_result(AngleResult::no_signal(angle)).unwrap();
        Checkpoint {
            problem: "decode the archive".into(),
            target_confidence: 0.9,
            iteration: 4,
            knowledge: kg.to_value().unwrap(),
            probability_logs: Vec::new(),
            profile: ProblemProfile::default(),
            custom_factors: BTreeMap::from([("lead".to_string(), 1.5)]),
        }
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run").join("checkpoint.json");
        let checkpoint = sample();
        checkpoint.save(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = Checkpoint::load(&path).unwrap();
        assert_eq!(loaded, checkpoint);
        let kg = loaded.restore_knowledge().unwrap();
        assert_eq!(kg.angle_count(), 1);
        assert_eq!(kg.failed_approaches().len(), 1);
    }

    #[test]
    fn failed_save_leaves_no_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        // A non-empty directory in the way makes the final rename fail.
        let path = dir.path().join("checkpoint.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupant"), "x").unwrap();

        assert!(matches!(sample().save(&path), Err(CheckpointError::Io { .. })));
        assert!(!path.with_extension("tmp").exists());
        assert!(path.join("occupant").exists());
    }

    #[test]
    fn garbage_file_is_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{\"problem\": 3").unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(CheckpointError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Checkpoint::load(Path::new("/nonexistent/checkpoint.json")),
            Err(CheckpointError::Io { .. })
        ));
    }
}
