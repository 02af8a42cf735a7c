#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![warn(clippy::pedantic)]

//! Interactive multi-criteria analysis of linear and mixed-integer models.
//!
//! A substantive model (an LP/MIP) has several outcome variables that are
//! declared as criteria, each minimized or maximized. The engine computes
//! the payoff table (utopia and nadir of every criterion), explores the
//! corners of the Pareto front and then fills it uniformly by repeatedly
//! placing aspiration/reservation levels at the corners of the largest
//! empty cuboid spanned by two known Pareto solutions. Every iteration
//! optimizes an achievement scalarizing function linked to the model.
//!
//! # Getting Started
//!
//! ```
//! use mcma::{Analysis, AnalysisConfig, models};
//!
//! let mut config = AnalysisConfig::new("tiny", models::tiny_criteria());
//! config.maxIter = 40;
//! let mut analysis = Analysis::builder(config).build().unwrap();
//! let report = analysis.run().unwrap();
//! assert!(report.summary.n_unique >= 2);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Analysis`] | Run the iteration loop and produce a [`Report`]. |
//! | [`AnalysisConfig`] | Options read from `cfg.toml`. |
//! | [`Criteria`](criterion::Criteria) | Criterion attributes: utopia, nadir, A/R, current value. |
//! | [`WorkFlow`](workflow::WorkFlow) | Stage machine: payoff, corners, neutral, Pareto front. |
//! | [`ParRep`](parrep::ParRep) | Unique Pareto solutions and the candidate cuboids between them. |
//! | [`AsfBlock`](asf::AsfBlock) | Scalarizing constraints linked to the model for one iteration. |
//! | [`Solver`] | LP/MIP engine; [`MicrolpSolver`] by default. |
//!
//! # Analysis directory
//!
//! | File | Role |
//! |------|------|
//! | `cfg.toml` | configuration |
//! | `<model_id>.json` | persisted [`LinearModel`](model::LinearModel), optional for built-in models |
//! | `payOff.txt` | payoff table, reused by later runs |
//! | `<resDir>/` | `iters.csv`, `modelVars.csv`, `parFront.csv`, `summary.json`, `parFront.html` |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at stage transitions, iterations and admissions | on |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod analysis;
pub mod asf;
pub mod cluster;
pub mod config;
pub mod corners;
pub mod criterion;
mod error;
mod install;
pub mod model;
pub mod models;
pub mod pareto;
pub mod parrep;
pub mod payoff;
pub mod preference;
pub mod solver;
mod types;
pub mod visualization;
pub mod workflow;

pub use analysis::{Analysis, AnalysisBuilder, Report, Summary};
pub use config::{AnalysisConfig, CritDef};
pub use error::{Error, Result};
pub use install::{USER_PREFS_TEMPLATE, install};
pub use solver::{MicrolpSolver, Solution, Solver};
pub use types::{Sense, SolveStatus};
