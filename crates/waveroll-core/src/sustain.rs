//! Sustain pedal segment extraction
//!
//! Segments are derived fresh on every render pass from the control-change
//! stream: events are filtered to the sustain controller, grouped per file,
//! sorted by time and edge-detected at [`SUSTAIN_THRESHOLD`].

use std::collections::BTreeMap;

use crate::types::{ControlChangeEvent, Note, SustainSegment, SUSTAIN_CONTROLLER, SUSTAIN_THRESHOLD};

/// Derive pedal-down intervals for every file
///
/// A pedal still down at the end of a file's events closes at the latest note
/// end over all notes, or at that file's last event time when there are no
/// notes. Segments are returned grouped by file id (sorted), in time order.
pub fn extract_sustain_segments(events: &[ControlChangeEvent], notes: &[Note]) -> Vec<SustainSegment> {
    let mut by_file: BTreeMap<&str, Vec<&ControlChangeEvent>> = BTreeMap::new();
    for event in events.iter().filter(|e| e.controller == SUSTAIN_CONTROLLER) {
        by_file.entry(event.file_id.as_str()).or_default().push(event);
    }

    let last_note_end = notes
        .iter()
        .map(Note::end)
        .filter(|end| end.is_finite())
        .fold(None, |acc: Option<f64>, end| Some(acc.map_or(end, |a| a.max(end))));

    let mut segments = Vec::new();
    for (file_id, mut file_events) in by_file {
        file_events.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut down_since: Option<f64> = None;
        for event in &file_events {
            let down = event.value >= SUSTAIN_THRESHOLD;
            match (down, down_since) {
                (true, None) => down_since = Some(event.time),
                (false, Some(start)) => {
                    segments.push(SustainSegment {
                        start,
                        end: event.time,
                        file_id: file_id.to_string(),
                    });
                    down_since = None;
                }
                _ => {}
            }
        }

        if let Some(start) = down_since {
            let fallback = file_events.last().map_or(start, |e| e.time);
            segments.push(SustainSegment {
                start,
                end: last_note_end.unwrap_or(fallback),
                file_id: file_id.to_string(),
            });
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pedal(time: f64, value: f32) -> ControlChangeEvent {
        ControlChangeEvent::sustain(time, value, "a")
    }

    #[test]
    fn test_unterminated_pedal_closes_at_last_event() {
        let events = vec![pedal(1.0, 1.0), pedal(3.0, 0.0), pedal(5.0, 1.0)];
        let segments = extract_sustain_segments(&events, &[]);
        let spans: Vec<(f64, f64)> = segments.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(spans, vec![(1.0, 3.0), (5.0, 5.0)]);
    }

    #[test]
    fn test_unterminated_pedal_closes_at_last_note_end() {
        let events = vec![pedal(2.0, 0.8)];
        let notes = vec![Note::new(0.0, 4.0, 60, "a"), Note::new(6.0, 1.5, 62, "b")];
        let segments = extract_sustain_segments(&events, &notes);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].end, 7.5);
    }

    #[test]
    fn test_events_are_sorted_and_edge_triggered() {
        // Unsorted input with a repeated "down" that must not restart the segment
        let events = vec![pedal(4.0, 0.2), pedal(1.0, 0.5), pedal(2.0, 0.9)];
        let segments = extract_sustain_segments(&events, &[]);
        assert_eq!(segments.len(), 1);
        assert_eq!((segments[0].start, segments[0].end), (1.0, 4.0));
    }

    #[test]
    fn test_other_controllers_and_files_are_separated() {
        let events = vec![
            ControlChangeEvent::new(0.0, 7, 1.0, "a"),
            ControlChangeEvent::sustain(1.0, 1.0, "b"),
            ControlChangeEvent::sustain(1.5, 1.0, "a"),
            ControlChangeEvent::sustain(2.0, 0.0, "b"),
            ControlChangeEvent::sustain(3.0, 0.0, "a"),
        ];
        let segments = extract_sustain_segments(&events, &[]);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].file_id, "a");
        assert_eq!((segments[0].start, segments[0].end), (1.5, 3.0));
        assert_eq!(segments[1].file_id, "b");
        assert_eq!((segments[1].start, segments[1].end), (1.0, 2.0));
    }
}
