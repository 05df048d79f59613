use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{ArtifactError, EcotopeResult};

#[derive(Serialize)]
struct EventLine<'a> {
    tick: i32,
    mean: &'a BTreeMap<String, f64>,
}

/// Per-tick NDJSON event stream: one line per tick holding the mean of
/// every non-derived field. Appends are sequential; lines are flushed when
/// the stream is finished.
#[derive(Debug)]
pub struct EventStream {
    writer: BufWriter<File>,
}

impl EventStream {
    pub fn create(path: impl AsRef<Path>) -> EcotopeResult<Self> {
        let file = File::create(path).map_err(ArtifactError::Io)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, tick: i32, means: &BTreeMap<String, f64>) -> EcotopeResult<()> {
        let line = serde_json::to_string(&EventLine { tick, mean: means })
            .map_err(ArtifactError::Json)?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(ArtifactError::Io)?;
        Ok(())
    }

    pub fn finish(mut self) -> EcotopeResult<()> {
        self.writer.flush().map_err(|e| ArtifactError::Io(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_valid_json_with_sorted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        let mut stream = EventStream::create(&path).unwrap();
        let mut means = BTreeMap::new();
        means.insert("vegetation".to_string(), 0.25);
        means.insert("hydration".to_string(), 0.5);
        stream.append(0, &means).unwrap();
        stream.append(1, &means).unwrap();
        stream.finish().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["tick"], 0);
        assert_eq!(parsed["mean"]["hydration"], 0.5);
    }
}
