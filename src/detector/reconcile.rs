//! Detection result reconciliation.
//!
//! The engine reports detections as floating-point time intervals in a
//! CSV file. The Vesper clip store works in sample indices and requires
//! start indices to be unique per channel, while the engine may emit
//! several detections whose rounded start times coincide. Reconciliation
//! converts each row to sample indices, nudges colliding start indices
//! forward by whole samples, and streams the resulting clips to a
//! listener.

use std::collections::HashSet;
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::constants::{CLASSIFICATION_PREFIX, annotations as names};
use crate::error::{Error, Result};

/// One raw record from the engine's detection CSV file.
///
/// Times and probabilities are kept as strings so annotations and
/// diagnostics can carry the file's values verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRow {
    /// Detection start time in seconds, verbatim.
    pub start_sec: String,
    /// Detection end time in seconds, verbatim.
    pub end_sec: String,
    /// Predicted class label.
    #[serde(rename = "class")]
    pub class_label: String,
    /// Class probability.
    pub prob: String,
    /// Taxonomic order label.
    pub order: String,
    /// Order probability.
    pub prob_order: String,
    /// Taxonomic family label.
    pub family: String,
    /// Family probability.
    pub prob_family: String,
    /// Species group label.
    pub group: String,
    /// Group probability.
    pub prob_group: String,
    /// Species label.
    pub species: String,
    /// Species probability.
    pub prob_species: String,
}

/// Insertion-ordered clip annotation mapping.
///
/// Serializes as a JSON object whose keys appear in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations(Vec<(String, String)>);

impl Annotations {
    /// Create an empty annotation mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation. Order of insertion is preserved.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.0.push((name.to_string(), value.into()));
    }

    /// Look up an annotation value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of annotations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Annotations {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A reconciled detection in sample-index coordinates.
#[derive(Debug, Clone)]
pub struct Clip {
    /// Start sample index, unique within a reconciliation pass.
    pub start_index: u64,
    /// Clip length in samples.
    pub length: u64,
    /// Clip annotations, in storage order.
    pub annotations: Annotations,
}

/// Receiver of reconciled clips.
///
/// `process_clip` is invoked once per reconciled detection and
/// `complete_processing` exactly once per pass, after the last clip,
/// including when no clips were produced.
pub trait ClipListener {
    /// Handle one reconciled clip.
    fn process_clip(&mut self, start_index: u64, length: u64, annotations: &Annotations);

    /// Signal that the reconciliation pass is complete.
    fn complete_processing(&mut self);
}

/// Convert a time in seconds to the nearest sample index.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn time_to_index(seconds: f64, sample_rate: u32) -> u64 {
    (seconds * f64::from(sample_rate)).round() as u64
}

#[derive(Debug, thiserror::Error)]
enum RowError {
    #[error("Bad start time \"{value}\" in detection file row")]
    BadStartTime { value: String },

    #[error("Bad end time \"{value}\" in detection file row")]
    BadEndTime { value: String },

    #[error("Bad probability value \"{value}\" in detection file row")]
    BadProbability { value: String },

    #[error(
        "For clip starting {start_sec} seconds into recording file, incrementing start index \
         to make it unique moved it past end index"
    )]
    StartMovedPastEnd { start_sec: String },
}

/// Read the engine's detection CSV file and stream reconciled clips to
/// the listener.
///
/// Rows are processed in file order in a single pass. A row that cannot
/// be reconciled (malformed fields, or a repaired start index past the
/// end index) is logged and skipped without aborting the pass. The
/// listener's `complete_processing` is always called exactly once.
///
/// # Errors
///
/// Returns an error only if the detection file itself cannot be opened.
pub fn reconcile_detections<L: ClipListener + ?Sized>(
    path: &Path,
    sample_rate: u32,
    listener: &mut L,
) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::DetectionOpen {
            path: path.to_path_buf(),
            source: e,
        })?;

    // Start indices already handed to the listener during this pass.
    let mut used_start_indices = HashSet::new();

    for record in reader.deserialize::<DetectionRow>() {
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                warn!("{e}. Clip will be ignored.");
                continue;
            }
        };

        match reconcile_row(&row, sample_rate, &mut used_start_indices) {
            Ok(clip) => listener.process_clip(clip.start_index, clip.length, &clip.annotations),
            Err(e) => warn!("{e}. Clip will be ignored."),
        }
    }

    listener.complete_processing();

    Ok(())
}

/// Reconcile one detection row into a clip, claiming a unique start index
/// from `used_start_indices`.
fn reconcile_row(
    row: &DetectionRow,
    sample_rate: u32,
    used_start_indices: &mut HashSet<u64>,
) -> std::result::Result<Clip, RowError> {
    let start_sec: f64 = row.start_sec.parse().map_err(|_| RowError::BadStartTime {
        value: row.start_sec.clone(),
    })?;
    let end_sec: f64 = row.end_sec.parse().map_err(|_| RowError::BadEndTime {
        value: row.end_sec.clone(),
    })?;

    let raw_start_index = time_to_index(start_sec, sample_rate);

    let start_index = claim_unique_start_index(raw_start_index, used_start_indices);

    // The end index is never incremented, even when the start index is,
    // since that could push it past the end of the input. Incrementing
    // the start index shortens the clip instead.
    let end_index = time_to_index(end_sec, sample_rate);

    // A clip usually has thousands of samples, so repair moving the start
    // past the end would be extremely surprising, but check anyway.
    if start_index > end_index {
        return Err(RowError::StartMovedPastEnd {
            start_sec: row.start_sec.clone(),
        });
    }

    let length = end_index - start_index;

    let mut annotations = build_annotations(row)?;

    if start_index != raw_start_index {
        let offset = start_index - raw_start_index;
        annotations.push(names::START_INDEX_UNIQUENESS_OFFSET, offset.to_string());
    }

    Ok(Clip {
        start_index,
        length,
        annotations,
    })
}

/// Increment the start index as needed to make it unique, and mark the
/// claimed value as used.
fn claim_unique_start_index(start_index: u64, used: &mut HashSet<u64>) -> u64 {
    let mut index = start_index;
    while used.contains(&index) {
        index += 1;
    }
    used.insert(index);
    index
}

fn build_annotations(row: &DetectionRow) -> std::result::Result<Annotations, RowError> {
    let prob: f64 = row
        .prob
        .parse()
        .map_err(|_| RowError::BadProbability {
            value: row.prob.clone(),
        })?;

    let score = (100.0 * prob).to_string();
    let classification = format!("{CLASSIFICATION_PREFIX}{}", row.class_label);

    let mut annotations = Annotations::new();
    annotations.push(names::DETECTOR_SCORE, score.clone());
    annotations.push(names::CLASSIFICATION, classification);
    annotations.push(names::CLASSIFIER_SCORE, score);
    annotations.push(names::CLASS, row.class_label.clone());
    annotations.push(names::CLASS_PROBABILITY, row.prob.clone());
    annotations.push(names::ORDER, row.order.clone());
    annotations.push(names::ORDER_PROBABILITY, row.prob_order.clone());
    annotations.push(names::FAMILY, row.family.clone());
    annotations.push(names::FAMILY_PROBABILITY, row.prob_family.clone());
    annotations.push(names::GROUP, row.group.clone());
    annotations.push(names::GROUP_PROBABILITY, row.prob_group.clone());
    annotations.push(names::SPECIES, row.species.clone());
    annotations.push(names::SPECIES_PROBABILITY, row.prob_species.clone());

    Ok(annotations)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "start_sec,end_sec,class,prob,order,prob_order,family,prob_family,\
                          group,prob_group,species,prob_species";

    fn write_detection_file(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[derive(Default)]
    struct RecordingListener {
        clips: Vec<Clip>,
        completions: usize,
    }

    impl ClipListener for RecordingListener {
        fn process_clip(&mut self, start_index: u64, length: u64, annotations: &Annotations) {
            self.clips.push(Clip {
                start_index,
                length,
                annotations: annotations.clone(),
            });
        }

        fn complete_processing(&mut self) {
            self.completions += 1;
        }
    }

    fn reconcile(rows: &[&str], sample_rate: u32) -> RecordingListener {
        let file = write_detection_file(rows);
        let mut listener = RecordingListener::default();
        reconcile_detections(file.path(), sample_rate, &mut listener).unwrap();
        listener
    }

    #[test]
    fn test_time_to_index_rounds_to_nearest() {
        assert_eq!(time_to_index(0.0, 22050), 0);
        assert_eq!(time_to_index(1.0, 22050), 22050);
        assert_eq!(time_to_index(1.5, 10), 15);
        assert_eq!(time_to_index(0.04, 100), 4);
    }

    #[test]
    fn test_single_row() {
        let listener = reconcile(
            &["1.0,2.5,AMRE,0.85,Passeriformes,0.99,Parulidae,0.97,Warbler,0.9,AMRE,0.85"],
            10000,
        );

        assert_eq!(listener.completions, 1);
        assert_eq!(listener.clips.len(), 1);

        let clip = &listener.clips[0];
        assert_eq!(clip.start_index, 10000);
        assert_eq!(clip.length, 15000);

        let a = &clip.annotations;
        assert_eq!(a.get("Detector Score"), Some("85"));
        assert_eq!(a.get("Classification"), Some("Call.AMRE"));
        assert_eq!(a.get("Classifier Score"), Some("85"));
        assert_eq!(a.get("Nighthawk Class"), Some("AMRE"));
        assert_eq!(a.get("Nighthawk Class Probability"), Some("0.85"));
        assert_eq!(a.get("Nighthawk Order"), Some("Passeriformes"));
        assert_eq!(a.get("Nighthawk Order Probability"), Some("0.99"));
        assert_eq!(a.get("Nighthawk Family"), Some("Parulidae"));
        assert_eq!(a.get("Nighthawk Family Probability"), Some("0.97"));
        assert_eq!(a.get("Nighthawk Group"), Some("Warbler"));
        assert_eq!(a.get("Nighthawk Group Probability"), Some("0.9"));
        assert_eq!(a.get("Nighthawk Species"), Some("AMRE"));
        assert_eq!(a.get("Nighthawk Species Probability"), Some("0.85"));
        assert_eq!(a.get("Start Index Uniqueness Offset"), None);
        assert_eq!(a.len(), 13);
    }

    #[test]
    fn test_annotation_order() {
        let listener = reconcile(
            &["1.0,2.0,AMRE,0.85,Passeriformes,0.99,Parulidae,0.97,Warbler,0.9,AMRE,0.85"],
            10000,
        );

        let annotation_names: Vec<&str> =
            listener.clips[0].annotations.iter().map(|(n, _)| n).collect();
        assert_eq!(
            annotation_names,
            vec![
                "Detector Score",
                "Classification",
                "Classifier Score",
                "Nighthawk Class",
                "Nighthawk Class Probability",
                "Nighthawk Order",
                "Nighthawk Order Probability",
                "Nighthawk Family",
                "Nighthawk Family Probability",
                "Nighthawk Group",
                "Nighthawk Group Probability",
                "Nighthawk Species",
                "Nighthawk Species Probability",
            ]
        );
    }

    #[test]
    fn test_start_index_uniqueness_repair() {
        let row = "1.0,2.0,AMRE,0.85,Passeriformes,0.99,Parulidae,0.97,Warbler,0.9,AMRE,0.85";
        let listener = reconcile(&[row, row, row], 10000);

        assert_eq!(listener.clips.len(), 3);
        assert_eq!(listener.clips[0].start_index, 10000);
        assert_eq!(listener.clips[1].start_index, 10001);
        assert_eq!(listener.clips[2].start_index, 10002);

        assert_eq!(
            listener.clips[0]
                .annotations
                .get("Start Index Uniqueness Offset"),
            None
        );
        assert_eq!(
            listener.clips[1]
                .annotations
                .get("Start Index Uniqueness Offset"),
            Some("1")
        );
        assert_eq!(
            listener.clips[2]
                .annotations
                .get("Start Index Uniqueness Offset"),
            Some("2")
        );

        // Repair shortens the clip; the end index stays put.
        assert_eq!(listener.clips[1].length, 9999);
        assert_eq!(listener.clips[2].length, 9998);
    }

    #[test]
    fn test_repair_past_end_discards_row() {
        // Second and third rows collide with a zero-length first clip, so
        // repair pushes their starts past their ends. The fourth row is
        // still processed.
        let colliding = "1.0,1.0,AMRE,0.85,o,0.1,f,0.1,g,0.1,s,0.1";
        let later = "5.0,6.0,AMRE,0.85,o,0.1,f,0.1,g,0.1,s,0.1";
        let listener = reconcile(&[colliding, colliding, colliding, later], 10);

        assert_eq!(listener.clips.len(), 2);
        assert_eq!(listener.clips[0].start_index, 10);
        assert_eq!(listener.clips[1].start_index, 50);
        assert_eq!(listener.completions, 1);
    }

    #[test]
    fn test_malformed_row_is_skipped() {
        let good = "1.0,2.0,AMRE,0.85,o,0.1,f,0.1,g,0.1,s,0.1";
        let bad = "oops,2.0,AMRE,0.85,o,0.1,f,0.1,g,0.1,s,0.1";
        let bad_end = "3.0,never,AMRE,0.85,o,0.1,f,0.1,g,0.1,s,0.1";
        let bad_prob = "5.0,6.0,AMRE,maybe,o,0.1,f,0.1,g,0.1,s,0.1";
        let listener = reconcile(&[bad, good, bad_end, bad_prob], 10);

        assert_eq!(listener.clips.len(), 1);
        assert_eq!(listener.clips[0].start_index, 10);
        assert_eq!(listener.completions, 1);
    }

    #[test]
    fn test_discard_message_names_verbatim_start_time() {
        // The logged warning carries the row's start time as written in
        // the file, not a reformatted number.
        let err = RowError::StartMovedPastEnd {
            start_sec: "1.0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "For clip starting 1.0 seconds into recording file, incrementing start index \
             to make it unique moved it past end index"
        );
    }

    #[test]
    fn test_empty_file_completes() {
        let listener = reconcile(&[], 10);
        assert!(listener.clips.is_empty());
        assert_eq!(listener.completions, 1);
    }

    #[test]
    fn test_annotations_serialize_in_order() {
        let mut annotations = Annotations::new();
        annotations.push("b", "1");
        annotations.push("a", "2");
        let json = serde_json::to_string(&annotations).unwrap();
        assert_eq!(json, r#"{"b":"1","a":"2"}"#);
    }
}
