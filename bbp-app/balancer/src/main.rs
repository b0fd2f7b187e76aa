use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
};

use anyhow::{Context, Result, bail};
use bbp_core::utils::{
    BalancerConfig, ControlLoop, Feedback, ServoActuator, Simulation, Vector2,
    connection::{
        serial::SerialServo,
        tracking::{FeedStatus, TrackingFeed},
    },
    controllers::AxisReadings,
    math::{calibration::Calibration, trajectory::SetpointTrajectory},
};
use clap::{Parser, Subcommand};
use embedded_io_adapters::std::FromStd;
use tracing::{info, warn};

#[derive(Parser)]
#[clap(version = "1.0", about = "Three-servo ball balancing platform")]
struct Opts {
    #[clap(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Drive the servos from the ball tracker's output
    Run {
        /// JSON configuration file
        #[clap(long)]
        config: Option<PathBuf>,
        /// serial port, overrides the configuration
        #[clap(long)]
        port: Option<String>,
        /// baud rate, overrides the configuration
        #[clap(long)]
        baud: Option<u32>,
        /// tracker executable; tracking lines are read from stdin when unset
        #[clap(long)]
        tracker: Option<String>,
        /// do not wait for an acknowledgement line after each command
        #[clap(long)]
        no_ack: bool,
    },
    /// Run the controller against the simulated platform
    Simulate {
        #[clap(long)]
        config: Option<PathBuf>,
        #[clap(long, default_value_t = 300)]
        steps: u32,
        /// loop rate used to advance the setpoint trajectory
        #[clap(long, default_value_t = 30.0)]
        rate: f32,
        #[clap(long, value_parser = parse_point, default_value = "0,0")]
        start: Vector2,
        #[clap(long, value_parser = parse_point, default_value = "0,0")]
        setpoint: Vector2,
        /// write one JSON line per step
        #[clap(long)]
        samples: Option<PathBuf>,
    },
    /// Derive projection axes from the three servo corners in camera space
    Calibrate {
        #[clap(long, value_parser = parse_point)]
        top: Vector2,
        #[clap(long, value_parser = parse_point)]
        left: Vector2,
        #[clap(long, value_parser = parse_point)]
        right: Vector2,
        #[clap(long, default_value_t = Calibration::DEFAULT_TARGET_SIDE)]
        side: f32,
    },
}

fn parse_point(s: &str) -> Result<Vector2, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let x = x.trim().parse::<f32>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f32>().map_err(|e| e.to_string())?;
    Ok(Vector2::new(x, y))
}

fn load_config(path: Option<&Path>) -> Result<BalancerConfig> {
    let cfg = match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => BalancerConfig::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

fn run(
    mut cfg: BalancerConfig,
    tracker: Option<String>,
) -> Result<()> {
    let controller = cfg.per_axis_controller()?;

    let port = serialport::new(&cfg.serial.port, cfg.serial.baud_rate)
        .timeout(cfg.serial.timeout())
        .open()
        .with_context(|| format!("opening serial port {}", cfg.serial.port))?;
    info!(port = %cfg.serial.port, baud = cfg.serial.baud_rate, "serial port open");
    let servos = SerialServo::new(FromStd::new(port), cfg.serial.wait_for_ack);
    let mut control = ControlLoop::new(controller, servos, cfg.servo_offset);

    if tracker.is_some() {
        cfg.tracker.program = tracker;
    }
    let (mut child, reader): (Option<Child>, Box<dyn BufRead>) = match &cfg.tracker.program {
        Some(program) => {
            let mut child = Command::new(program)
                .args(&cfg.tracker.args)
                .stdout(Stdio::piped())
                .spawn()
                .with_context(|| format!("starting tracker {program}"))?;
            let stdout = child.stdout.take().context("tracker stdout not captured")?;
            info!(%program, "tracker started");
            (Some(child), Box::new(BufReader::new(stdout)))
        }
        None => {
            info!("reading tracking lines from stdin");
            (None, Box::new(io::stdin().lock()))
        }
    };

    let mut feed = TrackingFeed::new(reader);
    let outcome = drive(&mut feed, &mut control);
    info!(
        ticks = control.ticks(),
        failed_sends = control.failed_sends(),
        skipped_lines = feed.skipped(),
        "tracking ended"
    );
    match child.as_mut() {
        Some(child) => finish_tracker(child, outcome),
        None => outcome,
    }
}

/// Tick once per tracking line until the feed ends.
fn drive<R: BufRead, A: ServoActuator>(
    feed: &mut TrackingFeed<R>,
    control: &mut ControlLoop<A>,
) -> Result<()> {
    let mut readings = AxisReadings::default();
    let mut have_readings = false;
    loop {
        match feed.next(&mut readings)? {
            FeedStatus::Updated => have_readings = true,
            FeedStatus::Skipped if have_readings => {}
            FeedStatus::Skipped => continue,
            FeedStatus::Ended => return Ok(()),
        }
        let report = control.tick(&Feedback::PerAxis(readings));
        if report.failures > 0 {
            warn!(failures = report.failures, "servo commands failed this tick");
        }
    }
}

/// Reap the tracker. On a loop error it is killed first so it does not
/// outlive the balancer.
fn finish_tracker(
    child: &mut Child,
    outcome: Result<()>,
) -> Result<()> {
    if let Err(error) = outcome {
        if let Err(kill_error) = child.kill() {
            warn!(%kill_error, "failed to stop tracker");
        }
        if let Err(wait_error) = child.wait() {
            warn!(%wait_error, "failed to reap tracker");
        }
        return Err(error);
    }
    let status = child.wait()?;
    if !status.success() {
        bail!("tracker exited with {status}");
    }
    Ok(())
}

fn simulate(
    cfg: BalancerConfig,
    steps: u32,
    rate: f32,
    start: Vector2,
    setpoint: Vector2,
    samples: Option<PathBuf>,
) -> Result<()> {
    if !(rate > 0.0) {
        bail!("rate must be positive");
    }
    let controller = cfg.planar_controller()?;
    let mut trajectory = SetpointTrajectory::new(start, cfg.setpoint_speed);
    trajectory.retarget(setpoint, 0.0);
    let mut sim = Simulation::new(controller, cfg.kinematics, start, trajectory.sample(0.0));

    let mut out = match &samples {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };

    for i in 0..steps {
        sim.set_setpoint(trajectory.sample(i as f32 / rate));
        let step = sim.step();
        if let Some(out) = out.as_mut() {
            serde_json::to_writer(&mut *out, &step)?;
            out.write_all(b"\n")?;
        }
    }
    if let Some(mut out) = out {
        out.flush()?;
    }

    let ball = sim.ball();
    info!(
        steps,
        position = ?ball.position,
        distance = ball.position.distance(setpoint),
        actions = ?sim.actions(),
        "simulation finished"
    );
    Ok(())
}

fn calibrate(
    points: [Vector2; 3],
    side: f32,
) -> Result<()> {
    let cal = Calibration::from_points(points, side)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &cal)?;
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();
    match opts.command {
        Cmd::Run {
            config,
            port,
            baud,
            tracker,
            no_ack,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(port) = port {
                cfg.serial.port = port;
            }
            if let Some(baud) = baud {
                cfg.serial.baud_rate = baud;
            }
            if no_ack {
                cfg.serial.wait_for_ack = false;
            }
            run(cfg, tracker)
        }
        Cmd::Simulate {
            config,
            steps,
            rate,
            start,
            setpoint,
            samples,
        } => simulate(load_config(config.as_deref())?, steps, rate, start, setpoint, samples),
        Cmd::Calibrate {
            top,
            left,
            right,
            side,
        } => calibrate([top, left, right], side),
    }
}
