use std::fs;
use std::path::Path;

use subtitle_lift_types::SubtitleCue;

use crate::output::error::OutputError;
use crate::srt::TimedCue;

/// Serializes the cue list as JSON with SRT-formatted timestamps.
pub fn write_cues_json(path: &Path, cues: &[SubtitleCue], pretty: bool) -> Result<(), OutputError> {
    let records: Vec<TimedCue> = cues.iter().map(TimedCue::from_cue).collect();
    let encoded = if pretty {
        serde_json::to_vec_pretty(&records)?
    } else {
        serde_json::to_vec(&records)?
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, encoded)?;
    Ok(())
}
