//! `porter` – runs a luggage-delivery mission on the simulated rig.
//!
//! 1. Loads `~/.porter/config.toml`, writing the defaults on first run.
//! 2. Plays the start-up cues and counts down.
//! 3. Runs the mission until the quota is met or **Ctrl-C** is pressed,
//!    printing mission events as they arrive.
//! 4. Waits for the running behavior to finish, plays the end cues, and
//!    prints the report.
//!
//! `porter 3` overrides the configured quota for one run.

mod config;

use std::process::ExitCode;

use colored::Colorize;
use porter_hal::{FlagAbort, Rig};
use porter_runtime::{MissionReport, Supervisor};
use porter_types::{Cue, MissionEvent, MissionEventPayload, PorterError, StopMode};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

const STARTUP_CUES: [Cue; 7] = [
    Cue::Snoring,
    Cue::ErrorAlarm,
    Cue::Hello,
    Cue::Three,
    Cue::Two,
    Cue::One,
    Cue::MotorStart,
];

fn main() -> ExitCode {
    // Tracing goes up before the runtime so the OTLP simple exporter never
    // starts inside a tokio context.
    let _telemetry = porter_runtime::init_tracing("porter");

    print_banner();

    let abort = FlagAbort::new();
    let ctrlc_abort = abort.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping after the current behavior …"
                .yellow()
                .bold()
        );
        ctrlc_abort.trigger();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run can only end at quota");
    }

    let mut cfg = load_or_init();
    config::apply_env_overrides(&mut cfg);
    if let Some(quota) = config::quota_from_args(std::env::args().skip(1)) {
        cfg.quota = quota;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start runtime".red(), e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cfg, abort)) {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Mission error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: config::Config, abort: FlagAbort) -> Result<MissionReport, PorterError> {
    let (mut rig, _probe) = cfg.sim.rig_builder().build();

    println!(
        "  Target: {} deliveries  (sim time ×{})\n",
        cfg.quota.to_string().bold(),
        cfg.sim.time_scale
    );
    for cue in STARTUP_CUES {
        announce(cue);
        rig.speaker.play(cue)?;
    }
    println!();

    let mut supervisor = Supervisor::new(rig, Box::new(abort), cfg.mission)?;
    let printer = tokio::spawn(print_events(supervisor.bus().subscribe()));

    let outcome = supervisor.run_mission(cfg.quota).await;
    // Always take the rig back so the motors get stopped, even on error.
    let mut rig = supervisor.quiesce().await?;
    if printer.await.is_err() {
        warn!("event printer task failed");
    }
    shut_down(&mut rig)?;

    outcome
}

fn shut_down(rig: &mut Rig) -> Result<(), PorterError> {
    rig.drive.stop(StopMode::Coast)?;
    for cue in [Cue::MotorStop, Cue::GameOver] {
        announce(cue);
        rig.speaker.play(cue)?;
    }
    Ok(())
}

fn load_or_init() -> config::Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

// Ends once the supervisor and lane have dropped their bus handles.
async fn print_events(mut rx: broadcast::Receiver<MissionEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => print_event(&event),
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "event printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &MissionEvent) {
    let time = event.timestamp.format("%H:%M:%S%.3f").to_string().dimmed();
    let line = match &event.payload {
        MissionEventPayload::BehaviorStarted { behavior } => {
            format!("▶ {}", behavior.to_string().bold())
        }
        MissionEventPayload::BehaviorFinished { behavior, next } => {
            format!("■ {} → {:?}", behavior, next)
        }
        MissionEventPayload::AvoidanceManeuver { behavior, color } => {
            format!("  ↺ {behavior}: avoiding {color:?}").yellow().to_string()
        }
        MissionEventPayload::AlignmentSkipped { heading_deg } => {
            format!("  · already aligned at {heading_deg:.1}°, searching again")
        }
        MissionEventPayload::HeadingCorrected { offset_deg } => {
            format!("  ⟲ corrected {offset_deg:+.1}° of heading error")
        }
        MissionEventPayload::Delivered { total } => {
            format!("  ✓ delivery #{total}").green().bold().to_string()
        }
        MissionEventPayload::StallTimeout { after_ms } => {
            format!("  ✗ gripper did not stall within {after_ms} ms")
                .red()
                .to_string()
        }
        MissionEventPayload::MissionEnded { delivered, reason } => {
            format!("● mission ended ({reason}), {delivered} delivered")
        }
    };
    println!("  {time} {line}");
}

fn announce(cue: Cue) {
    println!("  {} {:?}", "♪".magenta(), cue);
}

fn print_report(report: &MissionReport) {
    println!();
    println!("{}", "  Mission report".bold().underline());
    println!("    Outcome     : {}", report.end.to_string().bold());
    println!("    Delivered   : {}", report.delivered);
    println!("    Dispatches  : {}", report.dispatches);
    println!("    Elapsed     : {:.2?}", report.elapsed);
    println!();
}

fn print_banner() {
    println!();
    println!("{}", r#"   ___  ____  ___  ______ ______ ___ "#.bold().cyan());
    println!("{}", r#"  / _ \/ __ \/ _ \/_  __// __/ _ \ "#.bold().cyan());
    println!("{}", r#" / ___/ /_/ / , _/ / /  / _// , _/ "#.bold().cyan());
    println!("{}", r#"/_/   \____/_/|_| /_/  /___/_/|_|  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Porter".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Autonomous luggage delivery");
    println!();
}
