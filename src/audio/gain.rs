use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared linear volume, stored as f32 bits for lock-free per-frame reads
#[derive(Debug, Clone)]
pub struct VolumeControl {
    bits: Arc<AtomicU32>,
}

impl VolumeControl {
    pub fn new(volume: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(volume.clamp(0.0, 1.0).to_bits())),
        }
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Store a volume already validated to [0.0, 1.0]
    pub fn set(&self, volume: f32) {
        self.bits.store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

impl Default for VolumeControl {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Scale every sample by `volume`, flooring and clamping to the i16 range
pub fn apply_gain(samples: &mut [i16], volume: f32) {
    if volume == 1.0 {
        return;
    }
    let volume = volume as f64;
    for sample in samples.iter_mut() {
        let scaled = (*sample as f64 * volume).floor();
        *sample = scaled.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
    }
}
