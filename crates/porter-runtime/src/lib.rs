//! `porter-runtime` – the mission control loop.
//!
//! # Modules
//!
//! - [`supervisor`] – [`Supervisor`]: polls the abort switch and the shared
//!   [`MissionCell`], dispatching one behavior at a time until the delivery
//!   quota is met.
//! - [`lane`] – [`BehaviorLane`]: the single worker thread that owns the
//!   [`Rig`][porter_hal::Rig] and runs behaviors to completion.
//! - [`cell`] – [`MissionCell`]: atomic mission state and delivery counter
//!   with compare-and-swap transitions.
//! - [`behavior`] – [`run_behavior`][behavior::run_behavior] and the
//!   [`BehaviorContext`][behavior::BehaviorContext] each routine borrows.
//! - [`search`], [`handling`], [`carry`] – the four behavior routines
//!   (search, pick up / deposit, carry).
//! - [`heading`] – wrap-aware heading arithmetic.
//! - [`config`] – [`MissionConfig`]: every tuning constant, serde-ready.
//! - [`bus`] – [`MissionBus`]: broadcast channel of
//!   [`MissionEvent`][porter_types::MissionEvent]s.
//! - [`telemetry`] – [`init_tracing`]: `tracing-subscriber` setup with
//!   optional OTLP export.
//!
//! # Example
//!
//! ```rust,no_run
//! use porter_hal::{FlagAbort, SimRig};
//! use porter_runtime::{MissionConfig, Supervisor};
//!
//! # async fn run() -> Result<(), porter_types::PorterError> {
//! let (rig, _probe) = SimRig::builder().build();
//! let mut supervisor = Supervisor::new(rig, Box::new(FlagAbort::new()), MissionConfig::default())?;
//! let report = supervisor.run_mission(2).await?;
//! let _rig = supervisor.quiesce().await?;
//! println!("{} delivered", report.delivered);
//! # Ok(())
//! # }
//! ```

pub mod behavior;
pub mod bus;
pub mod carry;
pub mod cell;
pub mod config;
pub mod handling;
pub mod heading;
pub mod lane;
pub mod search;
pub mod supervisor;
pub mod telemetry;

pub use bus::MissionBus;
pub use cell::MissionCell;
pub use config::{MissionConfig, TimedDrive};
pub use lane::{BehaviorLane, LaneReport};
pub use supervisor::{BehaviorSpan, MissionEnd, MissionReport, Supervisor};
pub use telemetry::{TracerProviderGuard, init_tracing};
