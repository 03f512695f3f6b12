//! CSV edge: archive sink for the consumer and batch input for the
//! orchestrator's `process-batch` path.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::info;

use crate::{FeedError, FeedEvent};

/// Append events to a CSV archive, writing the header only when the file is
/// new. Quoting handles multi-line recipe text.
pub fn append_events_csv(path: &Path, events: &[FeedEvent]) -> Result<usize, FeedError> {
    if events.is_empty() {
        return Ok(0);
    }
    let write_header = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    info!(count = events.len(), path = %path.display(), "appended events to csv");
    Ok(events.len())
}

/// Read a whole CSV feed dump into events; `char_count` is recomputed when
/// the dump omitted it.
pub fn read_events_csv(path: &Path) -> Result<Vec<FeedEvent>, FeedError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut events = Vec::new();
    for row in reader.deserialize::<FeedEvent>() {
        let mut event = row?;
        if event.char_count == 0 {
            event.char_count = event.text.chars().count();
        }
        events.push(event);
    }
    Ok(events)
}
