use chrono::{DateTime, Duration as ChronoDuration, Local};
use image::{Rgb, RgbImage};
use motioncore::interface::{Frame, FrameSource};
use motioncore::prelude::StageResult;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};

/// Configuration for the synthetic camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Peak per-channel sensor noise.
    pub noise: u8,
    pub seed: u64,
    /// Quiet frames before the intruder enters.
    pub quiet_frames: usize,
    /// Frames the intruder spends crossing the scene.
    pub intruder_frames: usize,
    pub intruder_size: (u32, u32),
    /// Pace frames at `fps` and stamp them with wall-clock time.
    pub realtime: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 16,
            noise: 2,
            seed: 0,
            quiet_frames: 32,
            intruder_frames: 48,
            intruder_size: (80, 120),
            realtime: false,
        }
    }
}

/// Deterministic stand-in for a camera: a still, slightly noisy room that an
/// intruder walks across after a quiet period, then the cycle repeats.
pub struct SyntheticCamera {
    config: SceneConfig,
    rng: StdRng,
    backdrop: RgbImage,
    frame_index: usize,
    /// Anchored at the first frame unless set with `starting_at`.
    started_at: Option<DateTime<Local>>,
    last_emit: Option<Instant>,
}

impl SyntheticCamera {
    pub fn new(config: SceneConfig) -> Self {
        let backdrop = build_backdrop(config.width, config.height);
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            backdrop,
            frame_index: 0,
            started_at: None,
            last_emit: None,
        }
    }

    /// Fixes the timestamp of the first frame.
    pub fn starting_at(mut self, started_at: DateTime<Local>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    fn cycle_len(&self) -> usize {
        (self.config.quiet_frames + self.config.intruder_frames).max(1)
    }

    /// Left edge of the intruder for the current frame, if it is in view.
    fn intruder_x(&self) -> Option<u32> {
        let phase = self.frame_index % self.cycle_len();
        let step = phase.checked_sub(self.config.quiet_frames)?;
        let travel = self.config.width.saturating_sub(self.config.intruder_size.0);
        let span = self.config.intruder_frames.max(1) as u64;
        Some((travel as u64 * step as u64 / span) as u32)
    }

    fn render(&mut self) -> RgbImage {
        let mut image = self.backdrop.clone();
        let noise = self.config.noise as i16;
        if noise > 0 {
            for pixel in image.pixels_mut() {
                for channel in pixel.0.iter_mut() {
                    let jitter = self.rng.gen_range(-noise..=noise);
                    *channel = (*channel as i16 + jitter).clamp(0, 255) as u8;
                }
            }
        }

        if let Some(x0) = self.intruder_x() {
            let (w, h) = self.config.intruder_size;
            let y0 = self.config.height.saturating_sub(h) / 2;
            for y in y0..(y0 + h).min(self.config.height) {
                for x in x0..(x0 + w).min(self.config.width) {
                    image.put_pixel(x, y, Rgb([235, 220, 200]));
                }
            }
        }
        image
    }

    fn timestamp(&mut self) -> DateTime<Local> {
        if !self.config.realtime {
            let started_at = *self.started_at.get_or_insert_with(Local::now);
            let micros = self.frame_index as i64 * 1_000_000 / self.config.fps.max(1) as i64;
            return started_at + ChronoDuration::microseconds(micros);
        }

        let interval = Duration::from_secs_f64(1.0 / self.config.fps.max(1) as f64);
        if let Some(last) = self.last_emit {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        self.last_emit = Some(Instant::now());
        Local::now()
    }
}

impl FrameSource for SyntheticCamera {
    fn next_frame(&mut self) -> StageResult<Option<Frame>> {
        let captured_at = self.timestamp();
        let image = self.render();
        self.frame_index += 1;
        Ok(Some(Frame::new(image, captured_at)))
    }
}

fn build_backdrop(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let shade = (40 + (y * 60 / height.max(1))) as u8;
        if (x / 64 + y / 64) % 2 == 0 {
            Rgb([shade, shade, shade + 10])
        } else {
            Rgb([shade + 15, shade + 12, shade])
        }
    })
}
