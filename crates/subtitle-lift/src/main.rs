use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use indicatif::ProgressBar;
use subtitle_lift::cli::{parse_cli, EngineArg};
use subtitle_lift::extractor::{ExtractError, SubtitleExtractor};
use subtitle_lift::output::{write_cues_json, CropDumper, OutputError};
use subtitle_lift::progress::{extraction_bar_style, extraction_spinner_style};
use subtitle_lift::settings::{resolve_settings, ConfigError};
use subtitle_lift::source::{FrameSource, ImageSequenceSource};
use subtitle_lift::srt;
use subtitle_lift_ocr::{NoopEngine, TextEngine};
use subtitle_lift_types::FrameError;

#[derive(Debug)]
enum AppError {
    Config(ConfigError),
    Source(FrameError),
    Extract(ExtractError),
    Output(OutputError),
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "{err}"),
            AppError::Source(err) => write!(f, "{err}"),
            AppError::Extract(err) => write!(f, "{err}"),
            AppError::Output(err) => write!(f, "{err}"),
            AppError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<FrameError> for AppError {
    fn from(value: FrameError) -> Self {
        AppError::Source(value)
    }
}

impl From<ExtractError> for AppError {
    fn from(value: ExtractError) -> Self {
        AppError::Extract(value)
    }
}

impl From<OutputError> for AppError {
    fn from(value: OutputError) -> Self {
        AppError::Output(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

fn usage() {
    println!("usage: subtitle-lift --output <file.srt> [options] <frame-dir>");
    println!("       see --help for the full option list");
}

fn main() -> Result<(), AppError> {
    let (args, sources) = parse_cli();

    let Some(input) = args.input.clone() else {
        usage();
        return Ok(());
    };

    let settings = resolve_settings(&args, &sources)?;
    if let Some(path) = settings.config_path.as_ref() {
        eprintln!("using config file {}", path.display());
    }

    let mut source = ImageSequenceSource::open(&input, settings.fps)?;
    let engine: Box<dyn TextEngine> = match args.engine {
        EngineArg::Noop => Box::new(NoopEngine),
    };

    let mut extractor = SubtitleExtractor::new(settings.extractor);
    if let Some(dir) = args.dump_crops.clone() {
        extractor = extractor.with_crop_dumper(CropDumper::new(dir));
    }

    let progress = match source.metadata().calculate_total_frames() {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(extraction_bar_style());
            bar
        }
        None => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(extraction_spinner_style());
            spinner
        }
    };
    progress.enable_steady_tick(Duration::from_millis(100));

    let cancel = AtomicBool::new(false);
    let report = extractor.run_with_progress(&mut source, engine.as_ref(), &cancel, &mut |read| {
        progress.set_position(read);
    })?;

    if let Some(err) = report.failure.as_ref() {
        progress.abandon_with_message(format!("failed after {} frames", report.frames_read));
        eprintln!("warning: source failed mid-stream: {err}; writing cues collected so far");
    } else {
        progress.finish_with_message(format!(
            "completed {} frames, {} sampled",
            report.frames_read, report.frames_sampled
        ));
    }

    write_srt_atomically(&args.output, &report.cues)?;
    if let Some(json_path) = args.dump_json.as_ref() {
        write_cues_json(json_path, &report.cues, true)?;
    }

    println!(
        "wrote {} cue(s) to {} ({} frames read, {} sampled)",
        report.cues.len(),
        args.output.display(),
        report.frames_read,
        report.frames_sampled
    );
    Ok(())
}

/// Writes the SRT to a sibling temp file and renames it into place so a
/// failed run never leaves a truncated output file.
fn write_srt_atomically(
    output: &Path,
    cues: &[subtitle_lift_types::SubtitleCue],
) -> Result<(), AppError> {
    let mut tmp = output.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    srt::write_srt_file(&tmp, cues)?;
    if let Err(err) = fs::rename(&tmp, output) {
        if let Err(cleanup_err) = fs::remove_file(&tmp) {
            eprintln!(
                "warning: failed to remove temporary file {}: {cleanup_err}",
                tmp.display()
            );
        }
        return Err(AppError::Io(err));
    }
    Ok(())
}
