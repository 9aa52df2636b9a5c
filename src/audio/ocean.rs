use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rodio::Source;
use std::f32::consts::TAU;
use std::time::Duration;

/// Synthesized surf, used when no ambient loop URL is configured or the fetch
/// fails. Brown noise shaped by a slow swell so it rises and recedes like waves.
pub struct OceanWaves {
    sample_rate: u32,
    last_brown: f32,
    // One-pole low-pass state, softens the hiss at the crest
    smoothed: f32,
    swell_phase: f32,
    rng: StdRng,
}

impl OceanWaves {
    /// Roughly one wave every eight seconds.
    const SWELL_HZ: f32 = 0.125;

    pub fn new() -> Self {
        Self {
            sample_rate: 44100,
            last_brown: 0.0,
            smoothed: 0.0,
            swell_phase: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    fn brown_sample(&mut self) -> f32 {
        let white: f32 = self.rng.gen_range(-1.0..1.0);
        self.last_brown = ((self.last_brown + white * 0.02) * 0.9995).clamp(-1.0, 1.0);
        self.last_brown
    }
}

impl Default for OceanWaves {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for OceanWaves {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let brown = self.brown_sample();

        self.swell_phase += Self::SWELL_HZ / self.sample_rate as f32;
        if self.swell_phase > 1.0 {
            self.swell_phase -= 1.0;
        }
        // 0.2 in the trough, 1.0 at the crest
        let swell = 0.6 - 0.4 * (self.swell_phase * TAU).cos();

        // Brighter when the wave breaks
        let cutoff = 0.05 + 0.25 * swell;
        self.smoothed += cutoff * (brown - self.smoothed);

        Some(self.smoothed * swell * 0.5)
    }
}

impl Source for OceanWaves {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_range() {
        let waves = OceanWaves::new();
        assert!(waves.take(44100 * 2).all(|sample| (-1.0..=1.0).contains(&sample)));
    }
}
