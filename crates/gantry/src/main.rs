//! Gantry CLI - static site asset pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gantry_tasks::Task;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Static site asset pipeline with live reload")]
#[command(version)]
pub struct Cli {
    /// Task to run; defaults to watch
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project root
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Path to gantry.toml, relative to the root
    #[arg(short, long, default_value = "gantry.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build HTML pages, resolving includes
    Html,

    /// Compile the Sass entry point
    Css,

    /// Bundle, transpile and minify the script entry point
    Js,

    /// Optimize images and add webp variants
    Images,

    /// Convert fonts to WOFF and WOFF2
    Fonts,

    /// Generate the font manifest if it is empty
    #[command(alias = "fontsStyle")]
    FontsStyle,

    /// Remove the output folder
    Clean,

    /// Clean, then run every asset task
    Build,

    /// Build, serve with live reload and rebuild on change
    #[command(alias = "default")]
    Watch {
        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Convert TrueType-flavoured OTF fonts to TTF in the source folder
    Otf2ttf,

    /// Pack icons into a stack SVG sprite
    #[command(alias = "svgSprite")]
    SvgSprite,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let root = cli.root.as_path();
    let config = cli.config.as_path();

    // Execute command
    match cli.command.unwrap_or(Commands::Watch { no_open: false }) {
        Commands::Html => commands::task::run(root, config, Task::Html).await?,
        Commands::Css => commands::task::run(root, config, Task::Css).await?,
        Commands::Js => commands::task::run(root, config, Task::Js).await?,
        Commands::Images => commands::task::run(root, config, Task::Images).await?,
        Commands::Fonts => commands::task::run(root, config, Task::Fonts).await?,
        Commands::FontsStyle => commands::task::run(root, config, Task::FontsStyle).await?,
        Commands::Otf2ttf => commands::task::run(root, config, Task::Otf2Ttf).await?,
        Commands::SvgSprite => commands::task::run(root, config, Task::SvgSprite).await?,
        Commands::Clean => commands::task::clean(root, config).await?,
        Commands::Build => commands::build::run(root, config).await?,
        Commands::Watch { no_open } => commands::watch::run(root, config, !no_open).await?,
    }

    Ok(())
}
