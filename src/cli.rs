//! Command-line interface implementation

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, PxfConfig};
use crate::models::{Artwork, Background};
use crate::persist::{deserialize_compact, serialize_compact, PersistError};
use crate::session::Session;
use crate::storage::FileStorage;

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// Pixelframe - edit layered pixel-art animations stored in a session directory
#[derive(Parser)]
#[command(name = "pxf")]
#[command(about = "Pixelframe - edit layered pixel-art animations stored in a session directory")]
#[command(version)]
pub struct Cli {
    /// Session directory (overrides storage.dir from pxf.toml)
    #[arg(short, long, global = true)]
    pub session: Option<PathBuf>,

    /// Path to pxf.toml (default: discovered from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Duration (ms) for new frames (overrides timeline.default_duration)
    #[arg(long, global = true, value_name = "MS")]
    pub frame_duration: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new artwork, discarding the current one and its history
    New {
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, value_enum)]
        background: Option<Background>,
    },
    /// Print layers, frames and history position
    Show,
    /// Append a layer
    AddLayer,
    /// Append a frame
    AddFrame,
    /// Delete the layer at INDEX (0-based)
    DeleteLayer { index: usize },
    /// Delete the frame at INDEX (0-based)
    DeleteFrame { index: usize },
    /// Move the layer at INDEX one position up
    MoveUp { index: usize },
    /// Move the layer at INDEX one position down
    MoveDown { index: usize },
    /// Toggle visibility of the layer at INDEX
    ToggleVisible { index: usize },
    /// Toggle lock of the layer at INDEX
    ToggleLocked { index: usize },
    /// Set the duration (ms) of the frame at INDEX
    Duration { index: usize, ms: u32 },
    /// Undo the last edit
    Undo,
    /// Redo the last undone edit
    Redo,
    /// Reset to an empty artwork and clear history
    Reset,
    /// Write one layer's frame raster to a PNG file
    ExportFrame {
        #[arg(long, default_value = "0")]
        layer: usize,
        #[arg(long, default_value = "0")]
        frame: usize,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write the artwork as JSON with PNG data URLs
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Replace the artwork with one written by `export`
    Import { input: PathBuf },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let mut overrides = CliOverrides {
        session_dir: cli.session.clone(),
        default_duration: cli.frame_duration,
        ..Default::default()
    };
    if let Commands::New {
        width,
        height,
        background,
    } = &cli.command
    {
        overrides.width = *width;
        overrides.height = *height;
        overrides.background = *background;
    }

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    merge_cli_overrides(&mut config, &overrides);
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("Error: {}", e);
        }
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let mut session = match open_session(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: Cannot open session '{}': {}", config.storage.dir.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let result = match cli.command {
        Commands::ExportFrame {
            layer,
            frame,
            output,
        } => return run_export_frame(session.artwork(), layer, frame, &output),
        Commands::Export { output } => return run_export(session.artwork(), &output),
        Commands::Import { input } => return run_import(&mut session, &input),
        command => execute(&mut session, command, &config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CommandError::InvalidIndex(msg)) => {
            eprintln!("Error: {}", msg);
            ExitCode::from(EXIT_INVALID_ARGS)
        }
        Err(CommandError::Persist(e)) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Execute an editing command against the session
fn execute(
    session: &mut Session<FileStorage>,
    command: Commands,
    config: &PxfConfig,
) -> Result<(), CommandError> {
    match command {
        Commands::New { .. } => {
            session.start_new(&config.canvas_config())?;
        }
        Commands::Show => print_summary(session),
        Commands::AddLayer => {
            session.add_layer()?;
        }
        Commands::AddFrame => {
            session.add_frame()?;
        }
        Commands::DeleteLayer { index } => {
            check_layer(session, index)?;
            session.delete_layer(index)?;
        }
        Commands::DeleteFrame { index } => {
            check_frame(session, index)?;
            session.delete_frame(index)?;
        }
        Commands::MoveUp { index } => {
            check_layer(session, index)?;
            session.move_layer_up(index)?;
        }
        Commands::MoveDown { index } => {
            check_layer(session, index)?;
            session.move_layer_down(index)?;
        }
        Commands::ToggleVisible { index } => {
            check_layer(session, index)?;
            session.toggle_visible(index)?;
        }
        Commands::ToggleLocked { index } => {
            check_layer(session, index)?;
            session.toggle_locked(index)?;
        }
        Commands::Duration { index, ms } => {
            check_frame(session, index)?;
            session.set_frame_duration(index, ms)?;
        }
        Commands::Undo => {
            if !session.undo()? {
                println!("Nothing to undo");
            }
        }
        Commands::Redo => {
            if !session.redo()? {
                println!("Nothing to redo");
            }
        }
        Commands::Reset => {
            session.reset()?;
        }
        Commands::ExportFrame { .. } | Commands::Export { .. } | Commands::Import { .. } => {}
    }
    Ok(())
}

#[derive(Debug)]
enum CommandError {
    InvalidIndex(String),
    Persist(PersistError),
}

impl From<PersistError> for CommandError {
    fn from(e: PersistError) -> Self {
        CommandError::Persist(e)
    }
}

fn open_session(config: &PxfConfig) -> Result<Session<FileStorage>, PersistError> {
    let storage = FileStorage::open(&config.storage.dir)?;
    Session::open(storage, config.session_settings())
}

fn check_layer(session: &Session<FileStorage>, index: usize) -> Result<(), CommandError> {
    let count = session.artwork().layers.len();
    if index >= count {
        return Err(CommandError::InvalidIndex(format!(
            "layer index {} out of range ({} layers)",
            index, count
        )));
    }
    Ok(())
}

fn check_frame(session: &Session<FileStorage>, index: usize) -> Result<(), CommandError> {
    let count = session.artwork().frames.len();
    if index >= count {
        return Err(CommandError::InvalidIndex(format!(
            "frame index {} out of range ({} frames)",
            index, count
        )));
    }
    Ok(())
}

fn print_summary(session: &Session<FileStorage>) {
    let artwork = session.artwork();
    println!("Layers ({}):", artwork.layers.len());
    for (i, layer) in artwork.layers.iter().enumerate() {
        let size = layer
            .frame(1)
            .map(|r| format!("{}x{}", r.width, r.height))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [{}] {} ({}) opacity={} visible={} locked={} size={}",
            i, layer.name, layer.id, layer.opacity, layer.visible, layer.locked, size
        );
    }
    let durations: Vec<String> = artwork.frames.iter().map(|d| format!("{}ms", d)).collect();
    println!(
        "Frames ({}): {} (total {}ms)",
        artwork.frames.len(),
        durations.join(" "),
        artwork.total_duration()
    );
    // before the first edit the current artwork is the only state
    let history = session.history();
    let (position, len) = if history.is_empty() {
        (1, 1)
    } else {
        (history.pointer() + 1, history.len())
    };
    println!("History: {}/{}", position, len);
}

fn run_export_frame(artwork: &Artwork, layer: usize, frame: usize, output: &Path) -> ExitCode {
    let Some(target) = artwork.layers.get(layer) else {
        eprintln!("Error: layer index {} out of range", layer);
        return ExitCode::from(EXIT_INVALID_ARGS);
    };
    let Some(raster) = target.frame(frame as u32 + 1) else {
        eprintln!("Error: frame index {} out of range", frame);
        return ExitCode::from(EXIT_INVALID_ARGS);
    };

    let image = match raster.to_image() {
        Ok(img) => img,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error: Failed to create '{}': {}", parent.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }
    if let Err(e) = image.save_with_format(output, image::ImageFormat::Png) {
        eprintln!("Error: Failed to save '{}': {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!("Saved: {}", output.display());
    ExitCode::from(EXIT_SUCCESS)
}

fn run_export(artwork: &Artwork, output: &Path) -> ExitCode {
    let json = match serialize_compact(artwork) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if let Err(e) = fs::write(output, json) {
        eprintln!("Error: Failed to write '{}': {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Saved: {}", output.display());
    ExitCode::from(EXIT_SUCCESS)
}

fn run_import(session: &mut Session<FileStorage>, input: &Path) -> ExitCode {
    let json = match fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: Cannot open input file '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let imported = match runtime.block_on(deserialize_compact(&json)) {
        Ok(artwork) => artwork,
        Err(e) => {
            eprintln!("Error: '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match session.apply(|_| imported) {
        Ok(_) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
