// THEORY:
// The on-disk form of an `AnnotationLog` is a two-column CSV: a fixed header line,
// then one `name,start_ms` row per segment with the start written to four decimals,
// ending with the `VIDEO_END` row. Reading accepts exactly that shape back, so a
// saved session can be analysed later without the video.

use crate::core_modules::action_catalog::Behavior;
use crate::core_modules::segment_encoder::{AnnotationLog, Segment, SegmentTag, VIDEO_END};
use crate::error::LogFileError;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// File name of the log inside a results directory.
pub const LOG_FILE_NAME: &str = "annotations.csv";

const HEADER: [&str; 2] = ["Behaviour", " start_time(ms)"];

pub fn write_log<W: Write>(log: &AnnotationLog, writer: W) -> Result<(), LogFileError> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(HEADER)?;
    for segment in log.segments() {
        csv_writer.write_record([segment.tag.name(), &format!("{:.4}", segment.start_ms)])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn read_log<R: Read>(reader: R) -> Result<AnnotationLog, LogFileError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut segments: Vec<Segment> = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        // Row numbers count the header as row 1.
        let row = index + 2;
        if segments.last().is_some_and(|last| last.tag == SegmentTag::VideoEnd) {
            return Err(malformed(row, format!("row after {VIDEO_END}")));
        }
        if record.len() != 2 {
            return Err(malformed(row, format!("expected 2 fields, found {}", record.len())));
        }

        let name = &record[0];
        let start_ms: f64 = record[1]
            .parse()
            .map_err(|_| malformed(row, format!("start time {:?} is not a number", &record[1])))?;
        if !start_ms.is_finite() {
            return Err(malformed(row, "start time is not finite".to_string()));
        }
        if segments.last().is_some_and(|last| start_ms < last.start_ms) {
            return Err(malformed(row, "start times go backwards".to_string()));
        }

        let tag = if name == VIDEO_END {
            SegmentTag::VideoEnd
        } else {
            SegmentTag::Behavior(Behavior::from(name))
        };
        segments.push(Segment { tag, start_ms });
    }

    Ok(AnnotationLog::from_segments(segments))
}

pub fn save(log: &AnnotationLog, path: &Path) -> Result<(), LogFileError> {
    write_log(log, File::create(path)?)
}

pub fn load(path: &Path) -> Result<AnnotationLog, LogFileError> {
    read_log(File::open(path)?)
}

fn malformed(row: usize, reason: String) -> LogFileError {
    LogFileError::MalformedRow { row, reason }
}
