//! [`Supervisor`] – owns the mission lifecycle.
//!
//! The supervisor never drives a motor.  It polls the abort switch and the
//! [`MissionCell`], and whenever the robot is free it claims it
//! (`<state>` → `Dispatched`) and hands the matching behavior to the
//! [`BehaviorLane`].  One pass of [`Supervisor::run_mission`]:
//!
//! 1. drain finished-job reports from the lane;
//! 2. stop if the abort switch is pressed;
//! 3. once the lane is idle, stop if the quota is met, otherwise act on the
//!    current state:
//!
//! | State | Action |
//! |---|---|
//! | `Searching`, `PickingUp`, `CarryingLoad`, `Depositing` | claim and dispatch |
//! | `Stuck` | end with [`MissionEnd::Stuck`] |
//! | `Faulted` | end with [`MissionEnd::Faulted`] |
//! | `Idle` | closed elsewhere; end as aborted |
//!
//! An abort never interrupts a running behavior.  The supervisor simply
//! stops dispatching and returns; [`Supervisor::quiesce`] waits for the lane
//! to go quiet.  A later [`Supervisor::run_mission`] on the same supervisor
//! first waits for that behavior's report, so its late writes land on the
//! closed mission and never on the new one.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use porter_hal::{AbortSwitch, Rig};
use porter_types::{Behavior, MissionEventPayload, MissionState, PorterError};
use tracing::{debug, error, info, instrument, warn};

use crate::bus::MissionBus;
use crate::cell::MissionCell;
use crate::config::MissionConfig;
use crate::lane::{BehaviorLane, LaneReport};

const SOURCE: &str = "porter-runtime::supervisor";

// ─────────────────────────────────────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────────────────────────────────────

/// Why a mission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionEnd {
    QuotaReached,
    Aborted,
    /// The gripper never stalled on the luggage.
    Stuck,
    /// A behavior hit a hardware error.
    Faulted(String),
}

impl fmt::Display for MissionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionEnd::QuotaReached => write!(f, "quota reached"),
            MissionEnd::Aborted => write!(f, "aborted"),
            MissionEnd::Stuck => write!(f, "stuck"),
            MissionEnd::Faulted(reason) => write!(f, "faulted: {reason}"),
        }
    }
}

/// When the supervisor handed a behavior to the lane and when it took the
/// lane's report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BehaviorSpan {
    pub behavior: Behavior,
    pub dispatched: Instant,
    /// `None` if the mission ended while the behavior was still running.
    pub reported: Option<Instant>,
}

/// Summary returned by [`Supervisor::run_mission`].
#[derive(Debug, Clone, PartialEq)]
pub struct MissionReport {
    pub end: MissionEnd,
    pub delivered: u32,
    /// Behaviors handed to the lane during this mission.
    pub dispatches: u32,
    pub elapsed: Duration,
    /// One entry per dispatch, in order.
    pub spans: Vec<BehaviorSpan>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Supervisor
// ─────────────────────────────────────────────────────────────────────────────

pub struct Supervisor {
    config: Arc<MissionConfig>,
    cell: Arc<MissionCell>,
    bus: MissionBus,
    abort: Box<dyn AbortSwitch>,
    lane: BehaviorLane,
    last_fault: Option<String>,
    spans: Vec<BehaviorSpan>,
}

impl Supervisor {
    /// Move `rig` onto a fresh behavior lane and wire up the shared cell and
    /// event bus.
    ///
    /// # Errors
    ///
    /// [`PorterError::LaneClosed`] if the lane thread cannot be spawned.
    pub fn new(
        rig: Rig,
        abort: Box<dyn AbortSwitch>,
        config: MissionConfig,
    ) -> Result<Self, PorterError> {
        Self::with_bus(rig, abort, config, MissionBus::default())
    }

    /// Like [`new`](Self::new) but publishing on an existing bus.
    pub fn with_bus(
        rig: Rig,
        abort: Box<dyn AbortSwitch>,
        config: MissionConfig,
        bus: MissionBus,
    ) -> Result<Self, PorterError> {
        let config = Arc::new(config);
        let cell = Arc::new(MissionCell::new());
        let lane = BehaviorLane::spawn(
            rig,
            Arc::clone(&config),
            Arc::clone(&cell),
            bus.clone(),
        )?;
        Ok(Self {
            config,
            cell,
            bus,
            abort,
            lane,
            last_fault: None,
            spans: Vec::new(),
        })
    }

    pub fn bus(&self) -> &MissionBus {
        &self.bus
    }

    pub fn cell(&self) -> &Arc<MissionCell> {
        &self.cell
    }

    /// Run until `quota` deliveries are complete or the abort switch reads
    /// pressed.  The cell is `Idle` when this returns, whatever the outcome.
    ///
    /// A behavior still running from an earlier aborted mission is waited
    /// out before the cell is reset.
    ///
    /// # Errors
    ///
    /// Abort-switch read failures, dispatch conflicts, and a dead lane are
    /// returned as-is after the mission is closed.
    #[instrument(name = "mission", skip(self))]
    pub async fn run_mission(&mut self, quota: u32) -> Result<MissionReport, PorterError> {
        let poll = self.config.poll_interval();
        self.settle_lane(poll).await?;
        self.last_fault = None;
        self.spans.clear();

        let started = Instant::now();
        self.cell.start();
        info!(abort = self.abort.id(), "mission started");

        let mut dispatches = 0u32;
        let outcome = loop {
            match self.step(quota) {
                Ok(Step::Dispatched) => dispatches += 1,
                Ok(Step::Wait) => {}
                Ok(Step::End(end)) => break Ok(end),
                Err(e) => break Err(e),
            }
            tokio::time::sleep(poll).await;
        };

        let closed_from = self.cell.close();
        debug!(?closed_from, "mission cell closed");
        let end = outcome.inspect_err(|e| error!(error = %e, "mission aborted by error"))?;

        let delivered = self.cell.delivered();
        info!(%end, delivered, dispatches, "mission ended");
        self.bus.emit(
            SOURCE,
            MissionEventPayload::MissionEnded {
                delivered,
                reason: end.to_string(),
            },
        );
        Ok(MissionReport {
            end,
            delivered,
            dispatches,
            elapsed: started.elapsed(),
            spans: std::mem::take(&mut self.spans),
        })
    }

    // Drain the report of a behavior that outlived the previous mission.
    async fn settle_lane(&mut self, poll: Duration) -> Result<(), PorterError> {
        if self.lane.is_busy() {
            info!("waiting for the previous mission's behavior to finish");
        }
        while self.lane.is_busy() {
            match self.lane.poll_finished()? {
                Some(report) => self.absorb(report),
                None => tokio::time::sleep(poll).await,
            }
        }
        Ok(())
    }

    /// Wait for the lane to finish whatever it is running and take the rig
    /// back.
    pub async fn quiesce(self) -> Result<Rig, PorterError> {
        let lane = self.lane;
        tokio::task::spawn_blocking(move || lane.join())
            .await
            .map_err(|e| PorterError::LaneClosed(format!("join task failed: {e}")))?
    }

    fn step(&mut self, quota: u32) -> Result<Step, PorterError> {
        while let Some(report) = self.lane.poll_finished()? {
            self.absorb(report);
        }

        if self.abort.is_pressed()? {
            info!("abort requested");
            return Ok(Step::End(MissionEnd::Aborted));
        }
        // The deposit counts before it returns, so the quota is only read once
        // the lane has handed the robot back.
        if self.lane.is_busy() {
            return Ok(Step::Wait);
        }
        if self.cell.delivered() >= quota {
            return Ok(Step::End(MissionEnd::QuotaReached));
        }

        let state = self.cell.state();
        if let Some(behavior) = Behavior::for_state(state) {
            self.dispatch(state, behavior)?;
            return Ok(Step::Dispatched);
        }
        match state {
            MissionState::Stuck => Ok(Step::End(MissionEnd::Stuck)),
            MissionState::Faulted => Ok(Step::End(MissionEnd::Faulted(
                self.last_fault
                    .take()
                    .unwrap_or_else(|| "unknown fault".to_string()),
            ))),
            MissionState::Idle => {
                warn!("mission closed outside the supervisor");
                Ok(Step::End(MissionEnd::Aborted))
            }
            // Claimed but nothing running: the lane lost the job.
            other => Err(PorterError::DispatchConflict {
                expected: MissionState::Dispatched,
                found: other,
            }),
        }
    }

    fn dispatch(&mut self, state: MissionState, behavior: Behavior) -> Result<(), PorterError> {
        self.cell
            .begin_dispatch(state)
            .inspect_err(|e| error!(error = %e, %behavior, "dispatch claim failed"))?;
        debug_assert_eq!(behavior.entry_state(), state);
        debug!(%behavior, ?state, "dispatching");
        self.lane.dispatch(behavior)?;
        self.spans.push(BehaviorSpan {
            behavior,
            dispatched: Instant::now(),
            reported: None,
        });
        Ok(())
    }

    fn absorb(&mut self, report: LaneReport) {
        let ran_ms = (report.finished - report.started).num_milliseconds();
        debug!(behavior = %report.behavior, next = ?report.next, ran_ms, "lane report");
        if let Some(span) = self.spans.last_mut()
            && span.behavior == report.behavior
            && span.reported.is_none()
        {
            span.reported = Some(Instant::now());
        }
        if let Some(fault) = report.error {
            self.last_fault = Some(fault);
        }
    }
}

enum Step {
    Dispatched,
    Wait,
    End(MissionEnd),
}
