//! Demo settings.

use glhello_core::RenderConfig;
use std::path::PathBuf;

const FRAMES_VAR: &str = "GLHELLO_FRAMES";
const OUT_DIR_VAR: &str = "GLHELLO_OUT_DIR";

/// Everything the demo driver needs besides the backend itself.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    /// Window title (windowed backends).
    pub title: String,
    /// Logical window or framebuffer size.
    pub width: u32,
    pub height: u32,
    /// Rotation speed in radians per second.
    pub angular_speed: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Seconds for one full scale pulse.
    pub pulse_period: f32,
    /// Animation steps per second for the headless driver.
    pub frame_rate: f32,
    /// Frames rendered by the headless driver.
    pub frames: u32,
    /// Directory the headless driver writes PNG frames to.
    pub out_dir: PathBuf,
    pub render: RenderConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "glhello".to_string(),
            width: 800,
            height: 600,
            angular_speed: 1.0,
            min_scale: 0.5,
            max_scale: 1.5,
            pulse_period: 3.0,
            frame_rate: 60.0,
            frames: 60,
            out_dir: PathBuf::from("target/glhello-frames"),
            render: RenderConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Defaults overridden by `GLHELLO_FRAMES` and `GLHELLO_OUT_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(frames) = lookup(FRAMES_VAR) {
            match frames.trim().parse() {
                Ok(n) => config.frames = n,
                Err(err) => log::warn!("ignoring {FRAMES_VAR}={frames:?}: {err}"),
            }
        }
        if let Some(dir) = lookup(OUT_DIR_VAR).filter(|d| !d.is_empty()) {
            config.out_dir = PathBuf::from(dir);
        }

        config
    }

    /// Seconds between animation steps.
    pub fn frame_time(&self) -> f32 {
        if self.frame_rate > 0.0 {
            1.0 / self.frame_rate
        } else {
            0.0
        }
    }
}
