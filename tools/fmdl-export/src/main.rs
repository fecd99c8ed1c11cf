//! fmdl-export - FMDL conversion tool
//!
//! Exports host scenes (JSON) into FMDL documents (JSON), imports documents
//! back into scenes, and reports what an export would contain.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use fmdl_export::{io, ConversionContext, FmdlConfig, FmdlError, Scene, SkeletonTable};

#[derive(Parser)]
#[command(name = "fmdl-export")]
#[command(about = "FMDL mesh conversion tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene into an FMDL document
    Export {
        /// Input scene file
        scene: PathBuf,

        /// Output document file
        #[arg(short, long)]
        output: PathBuf,

        /// Object to export (overrides fmdl.toml)
        #[arg(long)]
        root: Option<String>,

        /// Path to fmdl.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skeleton table (TOML)
        #[arg(short, long)]
        skeleton: Option<PathBuf>,
    },

    /// Import an FMDL document into a new scene
    Import {
        /// Input document file
        document: PathBuf,

        /// Output scene file
        #[arg(short, long)]
        output: PathBuf,

        /// Path to fmdl.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skeleton table (TOML)
        #[arg(short, long)]
        skeleton: Option<PathBuf>,
    },

    /// Print what an export would contain
    Summary {
        /// Input scene file
        scene: PathBuf,

        /// Object to summarize
        #[arg(long)]
        root: Option<String>,

        /// Skeleton table (TOML)
        #[arg(short, long)]
        skeleton: Option<PathBuf>,
    },

    /// Run an export and report problems without writing
    Check {
        /// Input scene file
        scene: PathBuf,

        /// Object to export (overrides fmdl.toml)
        #[arg(long)]
        root: Option<String>,

        /// Path to fmdl.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skeleton table (TOML)
        #[arg(short, long)]
        skeleton: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<FmdlConfig> {
    match path {
        Some(path) => FmdlConfig::load(path),
        None => Ok(FmdlConfig::default()),
    }
}

fn load_skeleton(path: Option<&Path>) -> Result<SkeletonTable> {
    match path {
        Some(path) => SkeletonTable::load(path),
        None => Ok(SkeletonTable::new()),
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            scene,
            output,
            root,
            config,
            skeleton,
        } => {
            let config = load_config(config.as_deref())?;
            let skeleton = load_skeleton(skeleton.as_deref())?;
            let mut settings = config.export.clone();
            if root.is_some() {
                settings.root_object = root;
            }

            tracing::info!("Exporting {:?} -> {:?}", scene, output);
            let scene = io::load_scene(&scene)?;
            let ctx = ConversionContext::new(&skeleton).with_weld_policy(config.weld);
            let doc = fmdl_export::export_fmdl(&scene, &settings, &ctx)?;
            io::save_document(&doc, &output)?;
            tracing::info!("Done!");
        }

        Commands::Import {
            document,
            output,
            config,
            skeleton,
        } => {
            let config = load_config(config.as_deref())?;
            let skeleton = load_skeleton(skeleton.as_deref())?;

            tracing::info!("Importing {:?} -> {:?}", document, output);
            let doc = io::load_document(&document)?;
            let ctx = ConversionContext::new(&skeleton).with_weld_policy(config.weld);
            let mut scene = Scene::new();
            fmdl_export::import_fmdl(&mut scene, doc, &document, &config.import, &ctx)?;
            io::save_scene(&scene, &output)?;
            tracing::info!("Done!");
        }

        Commands::Summary {
            scene,
            root,
            skeleton,
        } => {
            let skeleton = load_skeleton(skeleton.as_deref())?;
            let scene = io::load_scene(&scene)?;
            print!("{}", fmdl_export::export_summary(&scene, root.as_deref(), &skeleton));
        }

        Commands::Check {
            scene,
            root,
            config,
            skeleton,
        } => {
            let config = load_config(config.as_deref())?;
            let skeleton = load_skeleton(skeleton.as_deref())?;
            let mut settings = config.export.clone();
            if root.is_some() {
                settings.root_object = root;
            }

            tracing::info!("Checking {:?}", scene);
            let scene = io::load_scene(&scene)?;
            let ctx = ConversionContext::new(&skeleton).with_weld_policy(config.weld);
            match fmdl_export::export_fmdl(&scene, &settings, &ctx) {
                Ok(doc) => {
                    tracing::info!("Scene is valid! ({} meshes)", doc.meshes.len());
                }
                Err(err) => {
                    let messages = err.messages();
                    for message in &messages {
                        tracing::error!("{}", message);
                    }
                    match err {
                        FmdlError::Validation(_) => {
                            anyhow::bail!("Export would fail with {} errors", messages.len())
                        }
                        other => return Err(other.into()),
                    }
                }
            }
        }
    }

    Ok(())
}
