//! SRT timestamp formatting and cue serialization.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use subtitle_lift_types::SubtitleCue;

/// Cue with its timestamps rendered in SRT form, used for both the SRT body
/// and the JSON dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedCue {
    pub start_time: String,
    pub end_time: String,
    pub text: String,
}

impl TimedCue {
    pub fn from_cue(cue: &SubtitleCue) -> Self {
        Self {
            start_time: format_timestamp(cue.start),
            end_time: format_timestamp(cue.end.unwrap_or(cue.start)),
            text: cue.text.clone(),
        }
    }
}

/// Formats a time in seconds as `HH:MM:SS,mmm` (comma before the
/// milliseconds, per the SRT grammar).
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let millis = total_millis % 1_000;
    let total_seconds = total_millis / 1_000;
    let secs = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3_600;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Renders cues as an SRT document: `n\n{start} --> {end}\n{text}\n\n` with
/// 1-based indices.
pub fn render_srt(cues: &[SubtitleCue]) -> String {
    let mut output = String::new();
    for (idx, cue) in cues.iter().enumerate() {
        let timed = TimedCue::from_cue(cue);
        let _ = writeln!(&mut output, "{}", idx + 1);
        let _ = writeln!(&mut output, "{} --> {}", timed.start_time, timed.end_time);
        let _ = writeln!(&mut output, "{}", timed.text);
        output.push('\n');
    }
    output
}

/// Writes the SRT document, creating parent directories as needed.
pub fn write_srt_file(path: &Path, cues: &[SubtitleCue]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, render_srt(cues))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_formats_as_all_zeros() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
    }

    #[test]
    fn fractional_seconds_keep_milliseconds() {
        assert_eq!(format_timestamp(3661.234), "01:01:01,234");
        assert_eq!(format_timestamp(1.8), "00:00:01,800");
    }

    #[test]
    fn negative_input_clamps_to_zero() {
        assert_eq!(format_timestamp(-2.5), "00:00:00,000");
    }

    #[test]
    fn render_uses_srt_grammar() {
        let cues = vec![
            SubtitleCue {
                start: 0.0,
                end: Some(1.8),
                text: "Hello".into(),
            },
            SubtitleCue {
                start: 2.0,
                end: Some(3.5),
                text: "two\nlines".into(),
            },
        ];
        let rendered = render_srt(&cues);
        assert_eq!(
            rendered,
            "1\n00:00:00,000 --> 00:00:01,800\nHello\n\n\
             2\n00:00:02,000 --> 00:00:03,500\ntwo\nlines\n\n"
        );
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.srt");
        let cues = vec![SubtitleCue {
            start: 0.0,
            end: Some(1.0),
            text: "hi".into(),
        }];
        write_srt_file(&path, &cues).unwrap();
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("1\n00:00:00,000 --> 00:00:01,000\nhi"));
    }
}
