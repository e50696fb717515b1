//! [`BehaviorLane`] – the single worker thread that runs behaviors.
//!
//! The lane owns the [`Rig`] for its whole life.  Jobs arrive over an
//! unbounded [`tokio::sync::mpsc`] channel and are executed strictly one at a
//! time, so two behaviors can never drive the robot at once.  For each job
//! the lane:
//!
//! 1. publishes [`MissionEventPayload::BehaviorStarted`];
//! 2. runs the routine to completion (timed drives block this thread only);
//! 3. writes the outcome through [`MissionCell::finish`], `Faulted` on error;
//! 4. publishes [`MissionEventPayload::BehaviorFinished`];
//! 5. sends a [`LaneReport`] back to whoever holds the lane.
//!
//! Dropping the job sender (via [`BehaviorLane::join`]) lets the worker drain
//! and exit, handing the rig back.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use porter_hal::Rig;
use porter_types::{Behavior, MissionEventPayload, MissionState, PorterError};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::behavior::{BehaviorContext, run_behavior};
use crate::bus::MissionBus;
use crate::cell::MissionCell;
use crate::config::MissionConfig;

const SOURCE: &str = "porter-runtime::lane";
const THREAD_NAME: &str = "behavior-lane";

/// Outcome of one job, sent back once the lane is free again.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneReport {
    pub behavior: Behavior,
    /// State the lane tried to write.  Not applied if the mission was
    /// closed meanwhile.
    pub next: MissionState,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    /// Hardware error that turned the job into `Faulted`.
    pub error: Option<String>,
}

// Shared handles the worker needs besides the rig.
struct Worker {
    config: Arc<MissionConfig>,
    cell: Arc<MissionCell>,
    bus: MissionBus,
}

pub struct BehaviorLane {
    jobs: Option<mpsc::UnboundedSender<Behavior>>,
    reports: mpsc::UnboundedReceiver<LaneReport>,
    worker: Option<JoinHandle<Rig>>,
    in_flight: Option<Behavior>,
}

impl BehaviorLane {
    /// Start the worker thread, moving `rig` onto it.
    ///
    /// # Errors
    ///
    /// [`PorterError::LaneClosed`] if the OS refuses to spawn the thread.
    pub fn spawn(
        rig: Rig,
        config: Arc<MissionConfig>,
        cell: Arc<MissionCell>,
        bus: MissionBus,
    ) -> Result<Self, PorterError> {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let worker = Worker { config, cell, bus };

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || worker.run(rig, job_rx, report_tx))
            .map_err(|e| PorterError::LaneClosed(format!("failed to spawn {THREAD_NAME}: {e}")))?;

        Ok(Self {
            jobs: Some(job_tx),
            reports: report_rx,
            worker: Some(handle),
            in_flight: None,
        })
    }

    /// Hand `behavior` to the worker.
    ///
    /// # Errors
    ///
    /// - [`PorterError::LaneBusy`] if the previous job has not reported yet.
    /// - [`PorterError::LaneClosed`] if the worker is gone.
    pub fn dispatch(&mut self, behavior: Behavior) -> Result<(), PorterError> {
        if let Some(running) = self.in_flight {
            debug!(%running, requested = %behavior, "lane busy");
            return Err(PorterError::LaneBusy);
        }
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| PorterError::LaneClosed("lane already joined".to_string()))?;
        jobs.send(behavior)
            .map_err(|_| PorterError::LaneClosed("worker thread exited".to_string()))?;
        self.in_flight = Some(behavior);
        Ok(())
    }

    /// Take the report of the finished job, if there is one.
    ///
    /// # Errors
    ///
    /// [`PorterError::LaneClosed`] if the worker died with a job in flight.
    pub fn poll_finished(&mut self) -> Result<Option<LaneReport>, PorterError> {
        match self.reports.try_recv() {
            Ok(report) => {
                self.in_flight = None;
                Ok(Some(report))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => match self.in_flight.take() {
                Some(lost) => Err(PorterError::LaneClosed(format!(
                    "worker exited while running {lost}"
                ))),
                None => Ok(None),
            },
        }
    }

    /// `true` from [`dispatch`](Self::dispatch) until the job's report has
    /// been taken.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Close the job channel, wait for the worker to finish whatever it is
    /// running, and take the rig back.  Blocks.
    ///
    /// # Errors
    ///
    /// [`PorterError::LaneClosed`] if the worker panicked.
    pub fn join(mut self) -> Result<Rig, PorterError> {
        drop(self.jobs.take());
        let handle = self
            .worker
            .take()
            .ok_or_else(|| PorterError::LaneClosed("lane already joined".to_string()))?;
        handle
            .join()
            .map_err(|_| PorterError::LaneClosed(format!("{THREAD_NAME} panicked")))
    }
}

impl Worker {
    fn run(
        self,
        mut rig: Rig,
        mut jobs: mpsc::UnboundedReceiver<Behavior>,
        reports: mpsc::UnboundedSender<LaneReport>,
    ) -> Rig {
        debug!("behavior lane up");
        while let Some(behavior) = jobs.blocking_recv() {
            let report = self.execute(&mut rig, behavior);
            if reports.send(report).is_err() {
                debug!(%behavior, "lane holder gone; report dropped");
            }
        }
        debug!("behavior lane drained");
        rig
    }

    fn execute(&self, rig: &mut Rig, behavior: Behavior) -> LaneReport {
        let started = Utc::now();
        self.bus
            .emit(SOURCE, MissionEventPayload::BehaviorStarted { behavior });
        info!(%behavior, "behavior started");

        let outcome = {
            let mut ctx = BehaviorContext {
                rig,
                config: &self.config,
                cell: &self.cell,
                bus: &self.bus,
            };
            run_behavior(behavior, &mut ctx)
        };
        let (next, fault) = match outcome {
            Ok(next) => (next, None),
            Err(e) => {
                error!(%behavior, error = %e, "behavior failed");
                (MissionState::Faulted, Some(e.to_string()))
            }
        };

        match self.cell.finish(next) {
            Ok(()) if next.is_terminal() => warn!(%behavior, ?next, "behavior ended the mission"),
            Ok(()) => info!(%behavior, ?next, "behavior finished"),
            Err(PorterError::MissionClosed) => {
                warn!(%behavior, ?next, "mission closed while behavior ran; outcome discarded");
            }
            Err(e) => error!(%behavior, error = %e, "state write rejected"),
        }

        let finished = Utc::now();
        self.bus
            .emit(SOURCE, MissionEventPayload::BehaviorFinished { behavior, next });

        LaneReport {
            behavior,
            next,
            started,
            finished,
            error: fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_hal::SimRig;
    use porter_types::ColorClass;
    use std::time::Duration;

    fn lane_with(rig: Rig) -> (BehaviorLane, Arc<MissionCell>, MissionBus) {
        let cell = Arc::new(MissionCell::new());
        let bus = MissionBus::default();
        let lane = BehaviorLane::spawn(
            rig,
            Arc::new(MissionConfig::default()),
            Arc::clone(&cell),
            bus.clone(),
        )
        .unwrap();
        (lane, cell, bus)
    }

    fn wait_report(lane: &mut BehaviorLane) -> LaneReport {
        for _ in 0..500 {
            if let Some(report) = lane.poll_finished().unwrap() {
                return report;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("lane never reported");
    }

    #[test]
    fn job_writes_next_state_and_reports() {
        let (rig, _probe) = SimRig::builder()
            .with_colors([ColorClass::Green])
            .build();
        let (mut lane, cell, _bus) = lane_with(rig);

        cell.begin_dispatch(MissionState::Searching).unwrap();
        // Drive the cell to CarryingLoad by hand so Carry is a legal job.
        cell.finish(MissionState::CarryingLoad).unwrap();
        cell.begin_dispatch(MissionState::CarryingLoad).unwrap();
        lane.dispatch(Behavior::Carry).unwrap();

        let report = wait_report(&mut lane);
        assert_eq!(report.behavior, Behavior::Carry);
        assert_eq!(report.next, MissionState::Depositing);
        assert!(report.error.is_none());
        assert!(report.started <= report.finished);
        assert_eq!(cell.state(), MissionState::Depositing);
        assert!(!lane.is_busy());
        lane.join().unwrap();
    }

    #[test]
    fn second_dispatch_before_report_is_refused() {
        let (rig, _probe) = SimRig::builder()
            .with_colors([ColorClass::Green])
            .time_scale(0.01)
            .build();
        let (mut lane, cell, _bus) = lane_with(rig);
        cell.begin_dispatch(MissionState::Searching).unwrap();
        lane.dispatch(Behavior::Deposit).unwrap();
        assert_eq!(lane.dispatch(Behavior::Search), Err(PorterError::LaneBusy));
        wait_report(&mut lane);
        lane.join().unwrap();
    }

    #[test]
    fn hardware_error_becomes_faulted() {
        let (rig, _probe) = SimRig::builder().with_drive_fault().build();
        let (mut lane, cell, _bus) = lane_with(rig);

        cell.begin_dispatch(MissionState::Searching).unwrap();
        lane.dispatch(Behavior::Search).unwrap();
        let report = wait_report(&mut lane);

        assert_eq!(report.next, MissionState::Faulted);
        assert!(report.error.unwrap().contains("sim_drive"));
        assert_eq!(cell.state(), MissionState::Faulted);
        lane.join().unwrap();
    }

    #[test]
    fn finish_after_close_leaves_cell_idle() {
        let (rig, _probe) = SimRig::builder()
            .with_colors([ColorClass::Green])
            .build();
        let (mut lane, cell, _bus) = lane_with(rig);
        cell.begin_dispatch(MissionState::Searching).unwrap();
        cell.close();
        lane.dispatch(Behavior::Carry).unwrap();

        let report = wait_report(&mut lane);
        assert_eq!(report.next, MissionState::Depositing);
        assert_eq!(cell.state(), MissionState::Idle);
        lane.join().unwrap();
    }

    #[test]
    fn events_bracket_each_job() {
        let (rig, _probe) = SimRig::builder()
            .with_colors([ColorClass::Green])
            .build();
        let (mut lane, cell, bus) = lane_with(rig);
        let mut rx = bus.subscribe();
        cell.begin_dispatch(MissionState::Searching).unwrap();
        lane.dispatch(Behavior::Carry).unwrap();
        wait_report(&mut lane);

        let first = rx.try_recv().unwrap();
        assert_eq!(
            first.payload,
            MissionEventPayload::BehaviorStarted {
                behavior: Behavior::Carry
            }
        );
        let last = rx.try_recv().unwrap();
        assert_eq!(
            last.payload,
            MissionEventPayload::BehaviorFinished {
                behavior: Behavior::Carry,
                next: MissionState::Depositing,
            }
        );
        assert_eq!(last.source, "porter-runtime::lane");
        lane.join().unwrap();
    }

    #[test]
    fn join_returns_the_rig() {
        let (rig, probe) = SimRig::builder().build();
        let (lane, _cell, _bus) = lane_with(rig);
        let mut rig = lane.join().unwrap();
        rig.speaker.play(porter_types::Cue::GameOver).unwrap();
        assert_eq!(probe.cues(), vec![porter_types::Cue::GameOver]);
    }
}
