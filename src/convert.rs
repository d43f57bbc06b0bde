//! Standalone detection CSV to JSON conversion.
//!
//! Converts an engine detection CSV file into a Vesper JSON detection
//! document with sample-index intervals:
//!
//! ```json
//! {
//!     "detections": [
//!         {"start_index": 22050, "end_index": 55125, "annotations": {...}}
//!     ]
//! }
//! ```
//!
//! Unlike detector-driven reconciliation, conversion does not repair
//! start-index collisions and passes probability and class values through
//! to annotations verbatim.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::constants::{DETECTION_FILE_SUFFIX, annotations as names};
use crate::detector::reconcile::{Annotations, DetectionRow, time_to_index};
use crate::error::{Error, Result};

/// One converted detection.
#[derive(Debug, Serialize)]
pub struct JsonDetection {
    /// Start sample index.
    pub start_index: u64,
    /// End sample index.
    pub end_index: u64,
    /// Detection annotations, in storage order.
    pub annotations: Annotations,
}

/// The JSON detection document.
#[derive(Debug, Serialize)]
pub struct DetectionsDocument {
    /// Converted detections, in file order.
    pub detections: Vec<JsonDetection>,
}

/// Outcome of one conversion.
#[derive(Debug)]
pub struct ConvertSummary {
    /// Path of the written JSON file.
    pub json_path: PathBuf,
    /// Number of detections converted.
    pub detection_count: usize,
}

/// Convert the detection CSV for `input_file` into a JSON detection file.
///
/// The CSV is expected at `<stem>_detections.csv` in `output_dir` (or in
/// the input file's directory when no output directory is given), and the
/// JSON document is written next to it as `<stem>_detections.json`. The
/// sample rate used for the time-to-index conversion is read from the
/// input audio file.
///
/// # Errors
///
/// Fails if the input audio or CSV cannot be read, any CSV record is
/// malformed, or the JSON file cannot be written.
pub fn convert_detections(
    input_file: &Path,
    output_dir: Option<&Path>,
) -> Result<ConvertSummary> {
    let sample_rate = read_sample_rate(input_file)?;

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input_file.parent().map_or_else(PathBuf::new, Path::to_path_buf),
    };

    let stem = input_file
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::NoFileStem {
            path: input_file.to_path_buf(),
        })?;

    let csv_path = dir.join(format!("{stem}{DETECTION_FILE_SUFFIX}.csv"));
    let json_path = dir.join(format!("{stem}{DETECTION_FILE_SUFFIX}.json"));

    let detections = read_detections(&csv_path, sample_rate)?;
    let detection_count = detections.len();

    write_document(&json_path, &DetectionsDocument { detections })?;

    Ok(ConvertSummary {
        json_path,
        detection_count,
    })
}

fn read_sample_rate(path: &Path) -> Result<u32> {
    let reader = hound::WavReader::open(path).map_err(|e| Error::AudioOpen {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(reader.spec().sample_rate)
}

fn read_detections(path: &Path, sample_rate: u32) -> Result<Vec<JsonDetection>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::DetectionOpen {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut detections = Vec::new();

    for (line_num, record) in reader.deserialize::<DetectionRow>().enumerate() {
        let row = record.map_err(|e| Error::DetectionFormat {
            message: format!("line {}: {e}", line_num + 2),
        })?;
        let detection =
            convert_row(&row, sample_rate).map_err(|message| Error::DetectionFormat {
                message: format!("line {}: {message}", line_num + 2),
            })?;
        detections.push(detection);
    }

    Ok(detections)
}

fn convert_row(
    row: &DetectionRow,
    sample_rate: u32,
) -> std::result::Result<JsonDetection, String> {
    let start_sec: f64 = row
        .start_sec
        .parse()
        .map_err(|_| format!("bad start time \"{}\"", row.start_sec))?;
    let end_sec: f64 = row
        .end_sec
        .parse()
        .map_err(|_| format!("bad end time \"{}\"", row.end_sec))?;

    let mut annotations = Annotations::new();
    annotations.push(names::DETECTOR_SCORE, row.prob.clone());
    annotations.push(names::CLASSIFICATION, row.class_label.clone());
    annotations.push(names::CLASSIFIER_SCORE, row.prob.clone());
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

    Ok(JsonDetection {
        start_index: time_to_index(start_sec, sample_rate),
        end_index: time_to_index(end_sec, sample_rate),
        annotations,
    })
}

fn write_document(path: &Path, document: &DetectionsDocument) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, document).map_err(|e| Error::JsonWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::io::Write;
    use tempfile::tempdir;

    fn write_wav(path: &Path, sample_rate: u32) {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn write_csv(path: &Path, rows: &[&str]) {
        let mut file = File::create(path).unwrap();
        writeln!(
            file,
            "start_sec,end_sec,class,prob,order,prob_order,family,prob_family,\
             group,prob_group,species,prob_species"
        )
        .unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
    }

    #[test]
    fn test_convert_detections() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("recording.wav");
        write_wav(&input, 10000);
        write_csv(
            &dir.path().join("recording_detections.csv"),
            &[
                "1.0,2.5,AMRE,0.85,Passeriformes,0.99,Parulidae,0.97,Warbler,0.9,AMRE,0.85",
                "1.0,3.0,OVEN,0.7,o,0.1,f,0.1,g,0.1,s,0.1",
            ],
        );

        let summary = convert_detections(&input, None).unwrap();
        assert_eq!(summary.detection_count, 2);
        assert_eq!(summary.json_path, dir.path().join("recording_detections.json"));

        let content = std::fs::read_to_string(&summary.json_path).unwrap();
        let document: serde_json::Value = serde_json::from_str(&content).unwrap();
        let detections = document["detections"].as_array().unwrap();
        assert_eq!(detections.len(), 2);

        assert_eq!(detections[0]["start_index"], 10000);
        assert_eq!(detections[0]["end_index"], 25000);
        // No uniqueness repair: coincident start indices pass through.
        assert_eq!(detections[1]["start_index"], 10000);

        // Verbatim values, no scaling and no classification prefix.
        let annotations = &detections[0]["annotations"];
        assert_eq!(annotations["Detector Score"], "0.85");
        assert_eq!(annotations["Classification"], "AMRE");
        assert_eq!(annotations["Classifier Score"], "0.85");
        assert_eq!(annotations["Nighthawk Species Probability"], "0.85");
    }

    #[test]
    fn test_convert_empty_csv() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("recording.wav");
        write_wav(&input, 22050);
        write_csv(&dir.path().join("recording_detections.csv"), &[]);

        let summary = convert_detections(&input, None).unwrap();
        assert_eq!(summary.detection_count, 0);

        let content = std::fs::read_to_string(&summary.json_path).unwrap();
        let document: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(document["detections"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_convert_with_output_dir() {
        let input_dir = tempdir().unwrap();
        let output_dir = tempdir().unwrap();
        let input = input_dir.path().join("night.wav");
        write_wav(&input, 22050);
        write_csv(
            &output_dir.path().join("night_detections.csv"),
            &["1.0,2.0,AMRE,0.85,o,0.1,f,0.1,g,0.1,s,0.1"],
        );

        let summary = convert_detections(&input, Some(output_dir.path())).unwrap();
        assert_eq!(
            summary.json_path,
            output_dir.path().join("night_detections.json")
        );
    }

    #[test]
    fn test_malformed_record_fails() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("recording.wav");
        write_wav(&input, 22050);
        write_csv(
            &dir.path().join("recording_detections.csv"),
            &["oops,2.0,AMRE,0.85,o,0.1,f,0.1,g,0.1,s,0.1"],
        );

        let err = convert_detections(&input, None).unwrap_err();
        assert!(matches!(err, Error::DetectionFormat { .. }));
    }

    #[test]
    fn test_missing_csv_fails() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("recording.wav");
        write_wav(&input, 22050);

        let err = convert_detections(&input, None).unwrap_err();
        assert!(matches!(err, Error::DetectionOpen { .. }));
    }
}
