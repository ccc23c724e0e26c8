//! beeper CLI: headless playback, WAV render and video export.
//!
//! Usage:
//!   bp-cli play --seconds 10
//!   bp-cli wav out.wav
//!   bp-cli wav out.flac
//!   bp-cli export --loops 2

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bp_master::{BeeperConfig, Composition, Controller};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bp-cli", version, about = "Headless beeper synth")]
struct Cli {
    /// Config file (defaults to $BEEPER_CONFIG, then ./beeper.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play the demo through the configured audio backend
    Play {
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Render the sequence to an audio file (.wav directly, other
    /// extensions through ffmpeg)
    Wav {
        out: PathBuf,
        #[arg(long)]
        loops: Option<u32>,
    },
    /// Render audio and video through ffmpeg
    Export {
        #[arg(long)]
        loops: Option<u32>,
        /// Video output (defaults to the configured path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    beeper::init_logging();
    if let Err(e) = run(Cli::parse()) {
        tracing::error!("{e}");
        eprintln!("bp-cli: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> bp_master::Result<()> {
    let mut config = match &cli.config {
        Some(path) => BeeperConfig::from_file(path)?,
        None => BeeperConfig::load()?,
    };

    match cli.command {
        Command::Play { seconds } => {
            let mut ctrl = Controller::new(Composition::demo(), config)?;
            print_summary(ctrl.composition());
            play_audio(&mut ctrl, Duration::from_secs(seconds))
        }
        Command::Wav { out, loops } => {
            if let Some(loops) = loops {
                config.export.loops = loops;
            }
            let ctrl = Controller::new(Composition::demo(), config)?;
            print_summary(ctrl.composition());
            render_to_file(&ctrl, &out)
        }
        Command::Export { loops, out } => {
            if let Some(loops) = loops {
                config.export.loops = loops;
            }
            if let Some(out) = out {
                config.export.video_path = out;
            }
            let mut ctrl = Controller::new(Composition::demo(), config)?;
            print_summary(ctrl.composition());
            let report = ctrl.export()?;
            println!(
                "Exported {} of {} frames{}",
                report.frames,
                report.frames_total,
                if report.finished_early { " (encoder stopped early)" } else { "" }
            );
            Ok(())
        }
    }
}

fn print_summary(comp: &Composition) {
    println!("Title:  {}", comp.title);
    println!("Steps:  {} at {}/s", comp.step_count, comp.steps_per_second);
    for track in &comp.tracks {
        println!("Track:  {:<6} {:<8} gain {:.2}", track.name, track.role.name(), track.gain);
    }
    println!();
}

fn play_audio(ctrl: &mut Controller, duration: Duration) -> bp_master::Result<()> {
    ctrl.start_audio()?;
    ctrl.play();
    println!("Playing...");

    let start = Instant::now();
    while start.elapsed() < duration {
        print!(
            "\rStep: {:>3}/{}",
            ctrl.current_step() + 1,
            ctrl.composition().step_count
        );
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(10));
    }

    ctrl.pause();
    ctrl.stop_audio();
    println!("\rDone.          ");
    Ok(())
}

fn render_to_file(ctrl: &Controller, path: &Path) -> bp_master::Result<()> {
    println!(
        "Rendering to {} at {} Hz...",
        path.display(),
        ctrl.config().audio.sample_rate
    );
    let report = ctrl.render_to_file(path)?;
    println!("Rendered {} samples", report.samples);
    println!("Done.");
    Ok(())
}
