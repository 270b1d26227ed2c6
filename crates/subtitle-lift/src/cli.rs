use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};

use crate::aggregator::{CandidateStrategy, ReappearancePolicy};
use crate::geometry::RectifyMode;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    JoinLines,
    BestLine,
}

impl StrategyArg {
    pub fn to_strategy(self) -> CandidateStrategy {
        match self {
            StrategyArg::JoinLines => CandidateStrategy::JoinLines,
            StrategyArg::BestLine => CandidateStrategy::BestLine,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReappearanceArg {
    Suppress,
    Reopen,
}

impl ReappearanceArg {
    pub fn to_policy(self) -> ReappearancePolicy {
        match self {
            ReappearanceArg::Suppress => ReappearancePolicy::Suppress,
            ReappearanceArg::Reopen => ReappearancePolicy::Reopen,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RectifyArg {
    Quad,
    MinAreaRect,
}

impl RectifyArg {
    pub fn to_mode(self) -> RectifyMode {
        match self {
            RectifyArg::Quad => RectifyMode::Quad,
            RectifyArg::MinAreaRect => RectifyMode::MinAreaRect,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum EngineArg {
    Noop,
}

#[derive(Debug, Default)]
pub struct CliSources {
    pub fps_from_cli: bool,
    pub sample_rate_from_cli: bool,
    pub confidence_threshold_from_cli: bool,
    pub disappear_threshold_from_cli: bool,
    pub similarity_threshold_from_cli: bool,
    pub history_capacity_from_cli: bool,
    pub strategy_from_cli: bool,
    pub reappearance_from_cli: bool,
    pub rectify_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            fps_from_cli: value_from_cli(matches, "fps"),
            sample_rate_from_cli: value_from_cli(matches, "sample_rate"),
            confidence_threshold_from_cli: value_from_cli(matches, "confidence_threshold"),
            disappear_threshold_from_cli: value_from_cli(matches, "disappear_threshold"),
            similarity_threshold_from_cli: value_from_cli(matches, "similarity_threshold"),
            history_capacity_from_cli: value_from_cli(matches, "history_capacity"),
            strategy_from_cli: value_from_cli(matches, "strategy"),
            reappearance_from_cli: value_from_cli(matches, "reappearance"),
            rectify_from_cli: value_from_cli(matches, "rectify"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    let command = CliArgs::command();
    let matches = command.get_matches();
    let args = match CliArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };
    let sources = CliSources::from_matches(&matches);
    (args, sources)
}

#[derive(Debug, Parser)]
#[command(
    name = "subtitle-lift",
    about = "Extract burned-in subtitles from a frame sequence into SRT",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Final output path for the generated SRT file
    #[arg(long = "output", value_name = "FILE")]
    pub output: PathBuf,

    /// Nominal frame rate of the input sequence
    #[arg(long = "fps", id = "fps", default_value_t = 30.0)]
    pub fps: f64,

    /// Frames analyzed per second of video
    #[arg(long = "sample-rate", id = "sample_rate", default_value_t = 5.0)]
    pub sample_rate: f64,

    /// Minimum recognizer confidence for a line to count
    #[arg(
        long = "confidence-threshold",
        id = "confidence_threshold",
        default_value_t = 0.6
    )]
    pub confidence_threshold: f32,

    /// Consecutive empty samples before the open cue closes
    #[arg(
        long = "disappear-threshold",
        id = "disappear_threshold",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub disappear_threshold: u32,

    /// Similarity ratio treating a candidate as a re-read of a recent cue
    #[arg(
        long = "similarity-threshold",
        id = "similarity_threshold",
        default_value_t = 0.8
    )]
    pub similarity_threshold: f64,

    /// Recent cue texts kept for deduplication
    #[arg(
        long = "history-capacity",
        id = "history_capacity",
        default_value_t = 10,
        value_parser = clap::value_parser!(usize)
    )]
    pub history_capacity: usize,

    /// How multiple recognized lines combine into one cue candidate
    #[arg(long = "strategy", id = "strategy", value_enum, default_value_t = StrategyArg::JoinLines)]
    pub strategy: StrategyArg,

    /// Whether a re-read of a recent cue reopens it or is suppressed
    #[arg(
        long = "reappearance",
        id = "reappearance",
        value_enum,
        default_value_t = ReappearanceArg::Suppress
    )]
    pub reappearance: ReappearanceArg,

    /// Corner source for crop rectification
    #[arg(long = "rectify", id = "rectify", value_enum, default_value_t = RectifyArg::Quad)]
    pub rectify: RectifyArg,

    /// Text engine used for detection and recognition
    #[arg(long = "engine", value_enum, default_value_t = EngineArg::Noop)]
    pub engine: EngineArg,

    /// Directory for writing every rectified crop as a PNG file
    #[arg(long = "dump-crops", value_name = "DIR")]
    pub dump_crops: Option<PathBuf>,

    /// Path for a JSON dump of the extracted cues
    #[arg(long = "dump-json", value_name = "FILE")]
    pub dump_json: Option<PathBuf>,

    /// Input directory containing the frame image sequence
    pub input: Option<PathBuf>,
}
