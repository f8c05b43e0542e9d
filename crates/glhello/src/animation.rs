//! Angle and scale animation for the demo quad.

use crate::DemoConfig;
use glhello_core::Backend;
use std::f32::consts::TAU;

/// Rotates at a constant speed while the scale pulses between two bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    angle: f32,
    elapsed: f32,
    angular_speed: f32,
    min_scale: f32,
    max_scale: f32,
    pulse_period: f32,
}

impl Animation {
    /// Start at angle zero and the minimum scale.
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            angle: 0.0,
            elapsed: 0.0,
            angular_speed: config.angular_speed,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            pulse_period: config.pulse_period,
        }
    }

    /// Step the animation by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        self.angle = (self.angle + self.angular_speed * dt).rem_euclid(TAU);
    }

    /// Current rotation in radians, in `[0, 2π)`.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Current scale, in `[min_scale, max_scale]`.
    pub fn scale(&self) -> f32 {
        if self.pulse_period <= 0.0 {
            return self.min_scale;
        }
        let phase = (self.elapsed / self.pulse_period).fract() * TAU;
        let t = 0.5 * (1.0 - phase.cos());
        self.min_scale + (self.max_scale - self.min_scale) * t
    }

    /// `(angle, scale)` for the current frame.
    pub fn frame(&self) -> (f32, f32) {
        (self.angle(), self.scale())
    }
}

/// Draw `frames` frames, advancing the animation by `dt` after each.
pub fn render_frames<'s, B: Backend<'s>>(
    backend: &mut B,
    animation: &mut Animation,
    frames: u32,
    dt: f32,
) {
    for _ in 0..frames {
        let (angle, scale) = animation.frame();
        backend.draw(angle, scale);
        animation.advance(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glhello_core::{BackendError, DeviceSize, RenderConfig};

    const EPSILON: f32 = 1e-5;

    fn config() -> DemoConfig {
        DemoConfig {
            angular_speed: 1.0,
            min_scale: 0.5,
            max_scale: 1.5,
            pulse_period: 4.0,
            ..Default::default()
        }
    }

    #[test]
    fn starts_at_rest() {
        let anim = Animation::new(&config());
        assert_eq!(anim.frame(), (0.0, 0.5));
    }

    #[test]
    fn angle_wraps_into_one_turn() {
        let mut anim = Animation::new(&config());
        anim.advance(TAU + 0.25);
        assert!((anim.angle() - 0.25).abs() < EPSILON);
        assert!(anim.angle() >= 0.0 && anim.angle() < TAU);
    }

    #[test]
    fn scale_peaks_at_half_period() {
        let mut anim = Animation::new(&config());
        anim.advance(2.0);
        assert!((anim.scale() - 1.5).abs() < EPSILON);
        anim.advance(2.0);
        assert!((anim.scale() - 0.5).abs() < EPSILON);
    }

    #[test]
    fn scale_stays_in_bounds() {
        let mut anim = Animation::new(&config());
        for _ in 0..500 {
            anim.advance(0.037);
            let s = anim.scale();
            assert!((0.5 - EPSILON..=1.5 + EPSILON).contains(&s), "scale {s}");
        }
    }

    #[test]
    fn zero_period_holds_min_scale() {
        let mut anim = Animation::new(&DemoConfig {
            pulse_period: 0.0,
            ..config()
        });
        anim.advance(1.0);
        assert_eq!(anim.scale(), 0.5);
    }

    struct CountingBackend {
        frames: Vec<(f32, f32)>,
    }

    impl<'s> Backend<'s> for CountingBackend {
        type Surface = ();

        fn create_with(_: &'s (), _: &RenderConfig) -> Result<Self, BackendError> {
            Ok(Self { frames: Vec::new() })
        }

        fn draw(&mut self, angle: f32, scale: f32) {
            self.frames.push((angle, scale));
        }

        fn resize(&mut self, _size: DeviceSize) {}

        fn frame_count(&self) -> u64 {
            self.frames.len() as u64
        }
    }

    #[test]
    fn render_frames_draws_each_animation_step() {
        let mut backend = CountingBackend::create(&()).unwrap();
        let mut anim = Animation::new(&config());

        render_frames(&mut backend, &mut anim, 3, 0.5);

        assert_eq!(backend.frame_count(), 3);
        assert_eq!(backend.frames[0].0, 0.0);
        assert!((backend.frames[2].0 - 1.0).abs() < EPSILON);
        assert!((anim.angle() - 1.5).abs() < EPSILON);
    }
}
