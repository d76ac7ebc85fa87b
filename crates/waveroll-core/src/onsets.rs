//! Original onset index
//!
//! Notes may be split into fragments for rendering or analysis. All fragments
//! keep the `source_index` of the note they came from, so the true onset of a
//! note is the earliest time recorded for its `(file_id, source_index)` key.

use std::collections::HashMap;

use crate::types::Note;

/// Tolerance used when comparing a fragment time against its original onset
pub const ONSET_MATCH_EPSILON: f64 = 1e-6;

/// Map of `file_id -> source_index -> onset time`
#[derive(Debug, Clone, Default)]
pub struct OriginalOnsets {
    by_file: HashMap<String, HashMap<u32, f64>>,
}

impl OriginalOnsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from unsplit (or split) notes, keeping the earliest time per key
    pub fn from_notes(notes: &[Note]) -> Self {
        let mut onsets = Self::new();
        for note in notes {
            let Some(index) = note.source_index else {
                continue;
            };
            let entry = onsets
                .by_file
                .entry(note.file_id.clone())
                .or_default()
                .entry(index)
                .or_insert(note.time);
            if note.time < *entry {
                *entry = note.time;
            }
        }
        onsets
    }

    /// Record (or overwrite) the onset of one source note
    pub fn record(&mut self, file_id: impl Into<String>, source_index: u32, time: f64) {
        self.by_file
            .entry(file_id.into())
            .or_default()
            .insert(source_index, time);
    }

    pub fn get(&self, file_id: &str, source_index: u32) -> Option<f64> {
        self.by_file.get(file_id)?.get(&source_index).copied()
    }

    /// Whether `note` starts at its source note's onset
    ///
    /// Notes without a source index, or whose key is unknown, are not original onsets.
    pub fn is_original_onset(&self, note: &Note) -> bool {
        note.source_index
            .and_then(|index| self.get(&note.file_id, index))
            .is_some_and(|onset| (note.time - onset).abs() < ONSET_MATCH_EPSILON)
    }

    pub fn len(&self) -> usize {
        self.by_file.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.values().all(HashMap::is_empty)
    }
}
