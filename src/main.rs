// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use tracing_subscriber::EnvFilter;

use pianovoice::audio;
use pianovoice::config;
use pianovoice::note::{note_name, parse_note, PitchIndex};
use pianovoice::samples::catalog::{CATALOG, DEFAULT_EXTENSION};
use pianovoice::samples::engine::load_samples;
use pianovoice::samples::{NoteEngine, Synthesizer};

/// Velocity used for notes played from the command line.
const CLI_VELOCITY: u8 = 100;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sampled piano with a synthesized fallback."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the recorded samples the engine looks for.
    Catalog {},
    /// Shows which sample and envelope each note would use with every sample loaded.
    Resolve {
        /// Notes to resolve, e.g. C4, D#3, Eb5 or 61.
        #[arg(required = true)]
        notes: Vec<String>,
    },
    /// Plays notes one after another.
    Play {
        /// The path to the engine config.
        config_path: String,
        /// Notes to play, e.g. C4, D#3, Eb5 or 61.
        #[arg(required = true)]
        notes: Vec<String>,
        /// How long each note is held before it is released.
        #[arg(short = 'H', long, default_value = "500ms")]
        hold: String,
    },
}

fn parse_notes(notes: &[String]) -> Result<Vec<PitchIndex>, Box<dyn Error>> {
    Ok(notes
        .iter()
        .map(|note| parse_note(note))
        .collect::<Result<Vec<_>, _>>()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Catalog {} => {
            println!("Samples (count: {}):", CATALOG.len());
            for key in CATALOG.iter() {
                println!(
                    "- {} (pitch {}, {})",
                    key.file_name(DEFAULT_EXTENSION),
                    key.pitch(),
                    note_name(key.pitch())
                );
            }
        }
        Commands::Resolve { notes } => {
            let synthesizer = Synthesizer::default();
            for pitch in parse_notes(&notes)? {
                let plan = synthesizer.plan(pitch, &CATALOG);
                let sample = match plan.resolved {
                    Some(resolved) => format!(
                        "{} shift {:+} ({:?})",
                        resolved.key, resolved.shift, resolved.resolution
                    ),
                    None => "none".to_string(),
                };
                println!(
                    "{} ({}): sample {}, path {:?}, attack {:.0}ms, decay {:.0}ms, release {:.0}ms",
                    note_name(pitch),
                    pitch,
                    sample,
                    plan.path,
                    plan.envelope.attack_time * 1000.0,
                    plan.envelope.decay_time * 1000.0,
                    plan.envelope.release_time * 1000.0,
                );
            }
        }
        Commands::Play {
            config_path,
            notes,
            hold,
        } => {
            let pitches = parse_notes(&notes)?;
            let hold: Duration = DurationString::from_string(hold)?.into();
            let config = config::Engine::deserialize(&PathBuf::from(config_path))?;

            let bank = load_samples(&config, |percent| {
                print!("\rLoading samples: {}%", percent);
                let _ = io::stdout().flush();
            })
            .await;
            println!();
            if bank.is_empty() {
                println!("No samples loaded, every note will be synthesized.");
            }

            let engine = NoteEngine::open(&config, bank)?;
            if !engine.is_available() {
                println!("Audio output unavailable.");
                return Ok(());
            }

            for pitch in pitches {
                println!("Playing {}", note_name(pitch));
                engine.note_on(pitch, CLI_VELOCITY);
                tokio::time::sleep(hold).await;
                engine.note_off(pitch);
            }

            // Let the last release fade out.
            tokio::time::sleep(engine.release()).await;
            engine.shutdown();
        }
    }

    Ok(())
}
