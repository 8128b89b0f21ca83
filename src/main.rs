//! GuessTheSignal entry point
//!
//! Native headless driver: plays one round in demo mode and prints the hidden
//! shape, the naive TOF reconstruction and the Dice score.
//!
//! Run with `--help` for the arguments. Set `RUST_LOG=debug` to see every emission.

#[cfg(not(target_arch = "wasm32"))]
use std::process::ExitCode;

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use glam::Vec2;
#[cfg(not(target_arch = "wasm32"))]
use guess_the_signal::cli::CliArgs;
#[cfg(not(target_arch = "wasm32"))]
use guess_the_signal::settings::RoundSetup;
#[cfg(not(target_arch = "wasm32"))]
use guess_the_signal::sim::{
    GuessMask, Layout, OccupancyGrid, RoundEvent, RoundPhase, RoundSession, TickInput, tick,
};
#[cfg(not(target_arch = "wasm32"))]
use guess_the_signal::{ConfigError, Difficulty, SimConfig};

/// Simulated frame length (~60 fps)
#[cfg(not(target_arch = "wasm32"))]
const FRAME_MS: u64 = 16;
/// Square game area the layout is derived from
#[cfg(not(target_arch = "wasm32"))]
const AREA_SIZE: f32 = 800.0;
/// Safety stop for the simulated clock (one hour)
#[cfg(not(target_arch = "wasm32"))]
const MAX_SIM_MS: u64 = 60 * 60 * 1000;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    env_logger::init();
    let args = CliArgs::parse();
    log::info!("GuessTheSignal (headless) starting...");

    let config = match &args.config {
        Some(path) => match SimConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => SimConfig::default(),
    };

    match run_round(args.difficulty, args.seed, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No headless driver on the web
}

#[cfg(not(target_arch = "wasm32"))]
fn run_round(difficulty: Difficulty, seed: Option<u64>, config: SimConfig) -> Result<(), ConfigError> {
    let setup = RoundSetup::from_difficulty(difficulty, seed);
    let center = Vec2::splat(AREA_SIZE / 2.0);
    let layout = Layout::from_area(center, AREA_SIZE, setup.grid_size, &config);

    let mut session = RoundSession::new(setup, layout, config, 0)?;
    println!("{} - {}", difficulty.as_str(), difficulty.description());
    println!(
        "Seed {}, {} emissions",
        session.seed,
        session.total_emissions()
    );

    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };
    let mut now = 0;
    while session.phase != RoundPhase::Results && now < MAX_SIM_MS {
        now += FRAME_MS;
        tick(&mut session, &input, now);

        for event in session.drain_events() {
            match event {
                RoundEvent::EmissionFired(record) => {
                    let (first, second) = record.blink_order();
                    log::info!(
                        "t={}ms cell {:?}: detector {} then {} after {} ms",
                        record.fired_at,
                        record.cell,
                        first,
                        second,
                        record.delay_difference()
                    );
                }
                RoundEvent::PhaseChanged(phase) => log::info!("t={}ms phase {:?}", now, phase),
                RoundEvent::Scored(_) => {}
            }
        }
    }

    let Some(report) = session.score else {
        log::warn!("Round did not finish within {} ms of simulated time", MAX_SIM_MS);
        return Ok(());
    };

    println!();
    print_masks(session.true_mask(), &session.guesses);
    println!();
    println!(
        "Dice {:.3} ({}%): {} true cells, {} marked, {} correct, {} missed, {} wrong",
        report.dice,
        report.percent(),
        report.true_count,
        report.guessed_count,
        report.correct_count,
        report.missed_count(),
        report.wrong_count()
    );
    Ok(())
}

/// Hidden shape and reconstruction side by side
#[cfg(not(target_arch = "wasm32"))]
fn print_masks(truth: &OccupancyGrid, guesses: &GuessMask) {
    let n = truth.nrows();
    println!("{:<w$}   reconstruction", "shape", w = n * 2);
    for row in 0..n {
        let left: String = (0..n)
            .map(|col| if truth[(row, col)] { "# " } else { ". " })
            .collect();
        let right: String = (0..n)
            .map(|col| match (guesses.contains(row, col), truth[(row, col)]) {
                (true, true) => "# ",
                (true, false) => "x ",
                (false, true) => "o ",
                (false, false) => ". ",
            })
            .collect();
        println!("{}   {}", left, right);
    }
    println!("(# hit, x wrong, o missed)");
}
