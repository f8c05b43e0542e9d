//! Demo driver for glhello: animates a textured quad on the platform backend.
//!
//! # Quick start
//!
//! ```no_run
//! use glhello::{Animation, DemoConfig};
//!
//! let config = DemoConfig::from_env();
//! let mut animation = Animation::new(&config);
//!
//! // Each frame:
//! let (angle, scale) = animation.frame();
//! // backend.draw(angle, scale);
//! animation.advance(config.frame_time());
//! # let _ = (angle, scale);
//! ```

pub mod animation;
pub mod config;
pub mod logging;

pub use animation::{render_frames, Animation};
pub use config::DemoConfig;
pub use logging::init_logging;
