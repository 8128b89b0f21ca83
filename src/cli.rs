//! Command-line arguments for the headless driver

use std::path::PathBuf;

use clap::Parser;

use crate::settings::Difficulty;

#[derive(Parser, Debug)]
#[command(version, about = "GuessTheSignal - headless PET round in demo mode")]
pub struct CliArgs {
    /// Difficulty preset: very_easy, easy, medium, hard or expert.
    #[arg(value_parser = parse_difficulty, default_value = "very_easy")]
    pub difficulty: Difficulty,

    /// Seed for the shape and emission order. Random when omitted.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// JSON file with timing and layout overrides.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    Difficulty::from_str(s).ok_or_else(|| {
        let names: Vec<&str> = Difficulty::ALL.iter().map(|d| d.as_str()).collect();
        format!("unknown difficulty '{}', expected one of: {}", s, names.join(", "))
    })
}
