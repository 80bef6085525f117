use clap::{Parser, Subcommand};
use sg_core::Preset;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shortgen")]
#[command(author, version, about = "Cut a video into vertical shorts")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Generation parameters that override the config file.
#[derive(clap::Args, Debug, Default)]
pub struct ParamArgs {
    /// Segment length in seconds (1-120)
    #[arg(short, long)]
    pub length: Option<u32>,

    /// Start offset in seconds
    #[arg(short, long)]
    pub offset: Option<u32>,

    /// x264 quality (18-32, lower is better)
    #[arg(long)]
    pub crf: Option<u8>,

    /// x264 speed preset
    #[arg(long)]
    pub preset: Option<Preset>,

    /// Output width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    pub height: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shorts from a video file
    Generate {
        /// Source video
        #[arg(required = true)]
        input: PathBuf,

        /// Cut one clip at the offset instead of splitting the whole video
        #[arg(long)]
        single: bool,

        #[command(flatten)]
        params: ParamArgs,

        /// Directory the clips are written to
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Source duration in seconds (skips probing with ffprobe)
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Show the windows a generation would cut, without transcoding
    Plan {
        /// Source duration in seconds
        #[arg(long, required = true)]
        duration: f64,

        /// Plan a single clip at the offset
        #[arg(long)]
        single: bool,

        /// Segment length in seconds (1-120)
        #[arg(short, long)]
        length: Option<u32>,

        /// Start offset in seconds
        #[arg(short, long)]
        offset: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
