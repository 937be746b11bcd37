//! SpriteForge CLI - Bridge interface for tooling
//!
//! Commands: presets, analyze, game-ready, forge
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on integrity failure, 1 on any other error

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use spriteforge_core::{
    extract::{build_edge_map, extract_palette},
    ForgeError, ForgeRequest, PixelData, PresetRegistry, ReplayExecutor, SpritePipeline,
};

#[derive(Parser)]
#[command(name = "spriteforge-cli")]
#[command(about = "SpriteForge CLI - Sprite Integrity Pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to presets directory
    #[arg(short, long, default_value = "presets")]
    presets_dir: PathBuf,

    /// Preset name to run with
    #[arg(long, default_value = "default")]
    preset: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List available presets
    Presets,

    /// Print identity hash, skeleton and ratios of a sprite
    Analyze {
        input: PathBuf,

        /// Also write the alpha edge map as a PNG
        #[arg(long)]
        edges: Option<PathBuf>,
    },

    /// Run the cleanup-only chain on a stored asset
    GameReady {
        input: PathBuf,
        output: PathBuf,

        /// Snap colors onto the palette of this image
        #[arg(long)]
        palette_from: Option<PathBuf>,
    },

    /// Validate and post-process an already generated sprite against its base
    Forge {
        #[arg(long)]
        base: PathBuf,

        /// Synthesis output to replay through the pipeline
        #[arg(long)]
        generated: PathBuf,

        #[arg(long)]
        outfit: String,

        #[arg(long)]
        class_type: String,

        #[arg(long)]
        theme: String,

        /// Emit a mirrored two-pose sheet
        #[arg(long)]
        sheet: bool,

        #[arg(short, long)]
        out: PathBuf,

        /// Embed the result PNG as base64 in the JSON output
        #[arg(long)]
        inline: bool,
    },
}

fn emit(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => println!(r#"{{"success": false, "error": "{}"}}"#, e),
    }
}

fn fail(err: &ForgeError) -> ExitCode {
    emit(&json!({
        "success": false,
        "error": err.to_string(),
    }));
    if err.is_identity_drift() {
        ExitCode::from(2) // Integrity failure
    } else {
        ExitCode::FAILURE
    }
}

fn load_pipeline(presets_dir: &Path, preset: &str) -> Result<(PresetRegistry, SpritePipeline), ForgeError> {
    let registry = PresetRegistry::load_from_dir(presets_dir)?;
    let config = registry
        .get(preset)
        .cloned()
        .ok_or_else(|| ForgeError::Config(format!("Preset not found: {}", preset)))?;
    let pipeline = SpritePipeline::with_config(config)?;
    Ok((registry, pipeline))
}

async fn run(cli: Cli) -> Result<Value, ForgeError> {
    let (registry, pipeline) = load_pipeline(&cli.presets_dir, &cli.preset)?;

    match cli.command {
        Commands::Presets => {
            let presets: Vec<_> = registry
                .list()
                .iter()
                .map(|p| json!({
                    "name": p.name,
                    "engine_min_version": p.engine_min_version,
                    "pose_tolerance": p.integrity.pose_tolerance,
                    "snap_step": p.post.snap_step,
                }))
                .collect();
            Ok(json!(presets))
        }

        Commands::Analyze { input, edges } => {
            let img = PixelData::load(&input)?;
            let report = pipeline.analyze_identity(&img);

            if let Some(path) = &edges {
                build_edge_map(&img).to_pixels()?.save_png(path)?;
            }

            Ok(json!({
                "success": true,
                "report": report,
                "palette_size": extract_palette(&img).len(),
                "edges": edges,
            }))
        }

        Commands::GameReady { input, output, palette_from } => {
            let img = PixelData::load(&input)?;
            let palette = match &palette_from {
                Some(path) => Some(extract_palette(&PixelData::load(path)?)),
                None => None,
            };

            let processed = pipeline.process_game_ready(img, palette.as_deref());
            processed.save_png(&output)?;

            Ok(json!({
                "success": true,
                "output": output,
                "size": [processed.width(), processed.height()],
            }))
        }

        Commands::Forge { base, generated, outfit, class_type, theme, sheet, out, inline } => {
            let request = ForgeRequest {
                base_image: PixelData::load(&base)?,
                outfit,
                class_type,
                theme,
                sheet_mode: sheet,
                rigging: vec![],
            };
            let executor = ReplayExecutor::new(PixelData::load(&generated)?);

            let result = pipeline.forge_sprite(&request, &executor).await?;
            result.image.save_png(&out)?;
            let manifest = pipeline.seal(&result, &request.directive_params())?;

            let mut output = json!({
                "success": true,
                "output": out,
                "manifest": manifest,
            });
            if inline {
                output["data_base64"] = json!(result.image.to_png_base64()?);
            }
            Ok(output)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            emit(&output);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
