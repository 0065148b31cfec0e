use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldState {
    Present,
    Null,
    Empty,
}

impl FieldState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldState::Present => "present",
            FieldState::Null => "null",
            FieldState::Empty => "empty",
        }
    }

    pub fn is_hidden(&self) -> bool {
        !matches!(self, FieldState::Present)
    }
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub entity_id: String,
    pub field: String,
    pub classification: FieldState,
}

/// Destination for field classification records. Records are observability
/// only; nothing read back from a sink may influence rendering.
pub trait TraceSink: Send + Sync {
    fn record(&self, record: &TraceRecord);

    fn flush(&self) {}
}

/// Routes records to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn record(&self, record: &TraceRecord) {
        match record.classification {
            FieldState::Present => {
                log::info!("{} {} ALL GOOD!!", record.entity_id, record.field)
            }
            state => log::info!("{} {} is {}!", record.entity_id, record.field, state),
        }
    }
}

/// Keeps records in memory, in emission order.
#[derive(Debug, Clone, Default)]
pub struct MemoryTraceSink {
    records: Arc<Mutex<Vec<TraceRecord>>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TraceSink for MemoryTraceSink {
    fn record(&self, record: &TraceRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

/// JSON-lines file sink with per-classification counters.
#[derive(Clone)]
pub struct JsonlTraceSink {
    inner: Arc<Mutex<JsonlState>>,
}

struct JsonlState {
    writer: BufWriter<File>,
    counters: BTreeMap<FieldState, u64>,
}

#[derive(Serialize)]
struct TraceLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    record: &'a TraceRecord,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    context: &'a str,
    counts: BTreeMap<&'static str, u64>,
}

impl JsonlTraceSink {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(JsonlState {
                writer: BufWriter::new(file),
                counters: BTreeMap::new(),
            })),
        })
    }

    /// Writes a `trace.summary` line with the counters gathered so far and resets them.
    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let summary = SummaryLine {
                kind: "trace.summary",
                context,
                counts: counters
                    .into_iter()
                    .map(|(state, count)| (state.as_str(), count))
                    .collect(),
            };
            if let Ok(json) = serde_json::to_string(&summary) {
                let _ = writeln!(state.writer, "{json}");
            }
        }
    }
}

impl TraceSink for JsonlTraceSink {
    fn record(&self, record: &TraceRecord) {
        let line = TraceLine {
            kind: "trace.field",
            record,
        };
        let Ok(json) = serde_json::to_string(&line) else {
            return;
        };
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(record.classification).or_insert(0);
            *entry = entry.saturating_add(1);
            let _ = writeln!(state.writer, "{json}");
        }
    }

    fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}
