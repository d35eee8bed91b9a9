//! Offline chart generation and online scheduling/judging core for a
//! vertical-scrolling rhythm game.
//!
//! Five cooperating components, in dependency order: the [`analysis`]
//! Audio Analyser feeds the [`chart`] Builder, whose output the
//! [`clock`]/[`scheduler`]/[`judge`] trio consumes at play time.
//! [`recorder`] and [`calibrator`] reuse the same clock/scheduler/judge
//! machinery with the input direction reversed.

pub mod analysis;
pub mod audio;
pub mod calibrator;
pub mod chart;
pub mod clock;
pub mod config;
pub mod error;
pub mod judge;
pub mod playfield;
pub mod recorder;
pub mod scheduler;

pub use chart::Chart;
pub use config::{Config, Difficulty};
pub use error::{CoreError, Result};
