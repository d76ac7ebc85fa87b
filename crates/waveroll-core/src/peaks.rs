//! Audio peak registry
//!
//! Waveform data is produced elsewhere (decoding and peak extraction are not
//! part of this crate). Once a track's peaks have been computed they are handed
//! to the registry with [`AudioPeakRegistry::set_peaks`]; from then on the
//! renderer only reads them synchronously through the [`PeakSource`] trait.
//!
//! The registry is an explicit collaborator: the engine receives an
//! `Arc<dyn PeakSource>` at construction instead of reaching for a global.

use std::sync::RwLock;

/// Default waveform colour (slate)
pub const DEFAULT_WAVEFORM_COLOR: u32 = 0x475569;

/// One peak column of one track, positioned in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakDatum {
    pub time: f64,
    pub min: f32,
    pub max: f32,
    pub color: u32,
}

/// A peak column without its time (result of a point query)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakSample {
    pub min: f32,
    pub max: f32,
    pub color: u32,
}

/// Pre-computed per-bucket minimum and maximum amplitudes (-1.0 to 1.0)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakBuffers {
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

impl PeakBuffers {
    pub fn new(min: Vec<f32>, max: Vec<f32>) -> Self {
        Self { min, max }
    }

    /// Number of usable buckets (the shorter of the two arrays)
    pub fn len(&self) -> usize {
        self.min.len().min(self.max.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only access to waveform peaks, as consumed by the background layer
pub trait PeakSource {
    /// All columns of all visible tracks
    fn visible_peaks(&self) -> Vec<PeakDatum>;

    /// Loudest visible track's column nearest to `time`, `None` when no visible track has data
    fn sample_at_time(&self, time: f64) -> Option<PeakSample>;
}

/// A registered audio track
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredAudio {
    pub id: String,
    pub name: String,
    /// Where the audio came from, informational only
    pub url: Option<String>,
    pub color: u32,
    pub is_visible: bool,
    pub is_muted: bool,
    /// Stereo position, -1.0 (left) to 1.0 (right)
    pub pan: f32,
    /// Track duration in seconds, known once decoded
    pub duration: Option<f64>,
    pub peaks: Option<PeakBuffers>,
}

impl RegisteredAudio {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: None,
            color: DEFAULT_WAVEFORM_COLOR,
            is_visible: true,
            is_muted: false,
            pan: 0.0,
            duration: None,
            peaks: None,
        }
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Peaks and a positive duration, when the track is visible
    fn readable(&self) -> Option<(&PeakBuffers, f64)> {
        if !self.is_visible {
            return None;
        }
        let peaks = self.peaks.as_ref().filter(|p| !p.is_empty())?;
        let duration = self.duration.filter(|d| *d > 0.0 && d.is_finite())?;
        Some((peaks, duration))
    }
}

/// Registry of audio tracks and their waveform peaks
///
/// Interior mutability lets the UI thread mutate visibility/mute while the
/// registry is shared with the renderer behind an `Arc`.
#[derive(Debug, Default)]
pub struct AudioPeakRegistry {
    items: RwLock<Vec<RegisteredAudio>>,
}

impl AudioPeakRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all registered tracks
    pub fn files(&self) -> Vec<RegisteredAudio> {
        self.items.read().map(|items| items.clone()).unwrap_or_default()
    }

    pub fn add_item(&self, entry: RegisteredAudio) {
        if let Ok(mut items) = self.items.write() {
            log::info!("[PEAKS] Registered audio '{}' ({})", entry.name, entry.id);
            items.push(entry);
        }
    }

    /// Attach decoded peaks to a track
    ///
    /// Returns false if no track with this id is registered.
    pub fn set_peaks(&self, id: &str, duration: f64, peaks: PeakBuffers) -> bool {
        let updated = self.with_item(id, |item| {
            item.duration = Some(duration);
            item.peaks = Some(peaks);
        });
        if updated {
            log::debug!("[PEAKS] Peaks ready for {} ({:.2}s)", id, duration);
        } else {
            log::warn!("[PEAKS] set_peaks for unknown audio id {}", id);
        }
        updated
    }

    pub fn set_visibility(&self, id: &str, visible: bool) {
        self.with_item(id, |item| item.is_visible = visible);
    }

    pub fn toggle_visibility(&self, id: &str) {
        self.with_item(id, |item| item.is_visible = !item.is_visible);
    }

    pub fn set_mute(&self, id: &str, muted: bool) {
        self.with_item(id, |item| item.is_muted = muted);
    }

    pub fn toggle_mute(&self, id: &str) {
        self.with_item(id, |item| item.is_muted = !item.is_muted);
    }

    pub fn set_pan(&self, id: &str, pan: f32) {
        let pan = if pan.is_finite() { pan.clamp(-1.0, 1.0) } else { 0.0 };
        self.with_item(id, |item| item.pan = pan);
    }

    pub fn update_name(&self, id: &str, name: impl Into<String>) {
        let name = name.into();
        self.with_item(id, |item| item.name = name);
    }

    pub fn update_color(&self, id: &str, color: u32) {
        self.with_item(id, |item| item.color = color & 0x00ff_ffff);
    }

    fn with_item(&self, id: &str, f: impl FnOnce(&mut RegisteredAudio)) -> bool {
        let Ok(mut items) = self.items.write() else {
            return false;
        };
        match items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }
}

impl PeakSource for AudioPeakRegistry {
    fn visible_peaks(&self) -> Vec<PeakDatum> {
        let Ok(items) = self.items.read() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for item in items.iter() {
            let Some((peaks, duration)) = item.readable() else {
                continue;
            };
            let len = peaks.len();
            out.extend((0..len).map(|i| PeakDatum {
                time: i as f64 / len as f64 * duration,
                min: peaks.min[i],
                max: peaks.max[i],
                color: item.color,
            }));
        }
        out
    }

    fn sample_at_time(&self, time: f64) -> Option<PeakSample> {
        let items = self.items.read().ok()?;
        let mut loudest: Option<PeakSample> = None;
        for item in items.iter() {
            let Some((peaks, duration)) = item.readable() else {
                continue;
            };
            let len = peaks.len();
            let idx = ((time / duration) * len as f64).floor().clamp(0.0, (len - 1) as f64) as usize;
            let sample = PeakSample {
                min: peaks.min[idx],
                max: peaks.max[idx],
                color: item.color,
            };
            if loudest.map_or(true, |best| sample.max > best.max) {
                loudest = Some(sample);
            }
        }
        loudest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AudioPeakRegistry {
        let registry = AudioPeakRegistry::new();
        registry.add_item(RegisteredAudio::new("quiet", "Quiet").with_color(0x111111));
        registry.add_item(RegisteredAudio::new("loud", "Loud").with_color(0x222222));
        registry.set_peaks("quiet", 4.0, PeakBuffers::new(vec![-0.1; 4], vec![0.1, 0.2, 0.3, 0.4]));
        registry.set_peaks("loud", 4.0, PeakBuffers::new(vec![-0.5; 4], vec![0.5, 0.6, 0.7, 0.8]));
        registry
    }

    #[test]
    fn test_sample_picks_loudest_visible_track() {
        let registry = registry();
        let sample = registry.sample_at_time(2.5).unwrap();
        assert_eq!(sample.max, 0.7);
        assert_eq!(sample.color, 0x222222);

        registry.set_visibility("loud", false);
        let sample = registry.sample_at_time(2.5).unwrap();
        assert_eq!(sample.max, 0.3, "Hidden tracks must be ignored");
    }

    #[test]
    fn test_sample_index_is_clamped() {
        let registry = registry();
        assert_eq!(registry.sample_at_time(-3.0).unwrap().max, 0.5);
        assert_eq!(registry.sample_at_time(99.0).unwrap().max, 0.8);
    }

    #[test]
    fn test_no_data_yields_none() {
        let registry = AudioPeakRegistry::new();
        registry.add_item(RegisteredAudio::new("pending", "Still decoding"));
        assert!(registry.sample_at_time(1.0).is_none());
        assert!(registry.visible_peaks().is_empty());
        assert!(!registry.set_peaks("missing", 1.0, PeakBuffers::default()));
    }

    #[test]
    fn test_visible_peaks_spread_over_duration() {
        let registry = registry();
        registry.toggle_visibility("quiet");
        let peaks = registry.visible_peaks();
        let times: Vec<f64> = peaks.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mutators() {
        let registry = registry();
        registry.set_pan("loud", 3.0);
        registry.toggle_mute("loud");
        registry.update_name("loud", "Renamed");
        let loud = registry.files().into_iter().find(|f| f.id == "loud").unwrap();
        assert_eq!(loud.pan, 1.0);
        assert!(loud.is_muted);
        assert_eq!(loud.name, "Renamed");
    }
}
