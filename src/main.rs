use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use clap::Parser;

use levelgen::{GenError, GeneratedLevel, LevelConfig, LevelGenPlugin};

/// Generate a platformer level and dump it.
#[derive(Parser, Debug)]
#[command(name = "levelgen", version, about)]
struct Args {
    /// JSON configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured seed (0 = random).
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print every room as ASCII (`#` solid, `=` platform, `.` open).
    #[arg(long)]
    ascii: bool,

    /// Write the generated level as JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the default configuration as JSON and exit.
    #[arg(long)]
    dump_config: Option<PathBuf>,

    /// Log debug output from every pipeline stage.
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<LevelConfig, GenError> {
    let mut config = match &args.config {
        Some(path) => LevelConfig::from_json_file(path)?,
        None => LevelConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn print_level(level: &GeneratedLevel, ascii: bool) {
    println!("seed {}  tile set '{}'", level.seed, level.tile_set);
    for room in &level.rooms {
        println!(
            "room {} at ({}, {}): {} path cells",
            room.index,
            room.origin.x,
            room.origin.y,
            room.graph.critical_path().len()
        );
        if ascii {
            for y in 0..room.archetypes.height() {
                let row: Vec<&str> = (0..room.archetypes.width())
                    .map(|x| room.archetypes.get(x, y).map_or("-", |a| a.name()))
                    .collect();
                println!("  {}", row.join(" | "));
            }
            print!("{}", room.map.to_ascii());
        }
    }
    for corridor in &level.corridors {
        println!(
            "corridor {} -> {}: {} points, length {:.1}",
            corridor.from_room,
            corridor.to_room,
            corridor.points.len(),
            corridor.length()
        );
    }
    println!("spawn {}  exit {}", level.spawn_point, level.exit_point);
    for warning in &level.warnings {
        println!("warning: {warning}");
    }
}

fn run(args: Args) -> Result<(), GenError> {
    if let Some(path) = &args.dump_config {
        fs::write(path, LevelConfig::default().to_json()?)?;
        return Ok(());
    }

    let config = load_config(&args)?;
    config.validate()?;

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let mut app = App::new();
    app.add_plugins((
        LogPlugin {
            level,
            ..default()
        },
        LevelGenPlugin { config },
    ));
    app.update();

    let Some(level) = app.world_mut().remove_resource::<GeneratedLevel>() else {
        return Err(GenError::invalid("generation produced no level, see log"));
    };

    print_level(&level, args.ascii);
    if let Some(path) = &args.output {
        fs::write(path, level.to_json()?)?;
        info!("level written to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("levelgen: {e}");
            ExitCode::FAILURE
        }
    }
}
