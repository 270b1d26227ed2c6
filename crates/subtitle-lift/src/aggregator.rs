//! Temporal consolidation of per-frame recognitions into subtitle cues.
//!
//! Each sampled frame contributes a set of recognized lines. The aggregator
//! runs a two-state machine (no active cue / one active cue) that decides
//! when a cue starts, keeps running under flicker, and closes after the text
//! has been absent long enough. Near-duplicate re-reads of a line already
//! emitted are suppressed through a bounded similarity history.

use std::collections::VecDeque;

use subtitle_lift_types::{RecognizedText, SubtitleCue};

use crate::similarity;

/// How the surviving lines of one frame become a single cue candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStrategy {
    /// Join all lines in reading order into one multi-line candidate.
    JoinLines,
    /// Keep only the best line, ranked by confidence, then text length,
    /// then fewer embedded spaces.
    BestLine,
}

impl CandidateStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStrategy::JoinLines => "join-lines",
            CandidateStrategy::BestLine => "best-line",
        }
    }
}

/// What to do when a candidate matches the similarity history while no cue
/// is open: treat it as a late re-read of the emitted cue, or start a new
/// cue for the reappearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReappearancePolicy {
    Suppress,
    Reopen,
}

impl ReappearancePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ReappearancePolicy::Suppress => "suppress",
            ReappearancePolicy::Reopen => "reopen",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Minimum recognizer confidence for a line to count.
    pub confidence_threshold: f32,
    /// Consecutive sampled frames without a qualifying line before the open
    /// cue closes.
    pub disappear_threshold: u32,
    /// Similarity ratio at or above which a candidate is a re-read of a
    /// recent cue.
    pub similarity_threshold: f64,
    /// Number of recent cue texts kept for deduplication.
    pub history_capacity: usize,
    pub strategy: CandidateStrategy,
    pub reappearance: ReappearancePolicy,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            disappear_threshold: 10,
            similarity_threshold: 0.8,
            history_capacity: 10,
            strategy: CandidateStrategy::JoinLines,
            reappearance: ReappearancePolicy::Suppress,
        }
    }
}

/// Bounded record of recently emitted cue texts, oldest evicted first.
#[derive(Debug)]
pub struct SimilarityHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl SimilarityHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, text: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(text);
    }

    /// True when `candidate` scores at or above `threshold` against any
    /// remembered text.
    pub fn matches(&self, candidate: &str, threshold: f64) -> bool {
        self.entries
            .iter()
            .any(|entry| similarity::ratio(candidate, entry) >= threshold)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Consolidates sampled-frame recognitions into closed subtitle cues.
///
/// One instance per video; instances never share history or cue state.
pub struct CueAggregator {
    config: AggregatorConfig,
    history: SimilarityHistory,
    current: Option<SubtitleCue>,
    absent_run: u32,
    last_valid_time: f64,
}

impl CueAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        let history = SimilarityHistory::new(config.history_capacity);
        Self {
            config,
            history,
            current: None,
            absent_run: 0,
            last_valid_time: 0.0,
        }
    }

    /// Feeds the recognitions of one sampled frame, in reading order.
    /// Returns a cue when this sample closed one.
    pub fn push_sample(&mut self, time: f64, texts: &[RecognizedText]) -> Option<SubtitleCue> {
        let qualifying: Vec<&RecognizedText> = texts
            .iter()
            .filter(|item| {
                item.confidence >= self.config.confidence_threshold && !item.text.trim().is_empty()
            })
            .collect();

        if qualifying.is_empty() {
            return self.record_absence();
        }

        let candidate = self.build_candidate(&qualifying);
        if candidate.is_empty() {
            return self.record_absence();
        }

        if self
            .history
            .matches(&candidate, self.config.similarity_threshold)
        {
            // Re-read of a recent cue: keep the active cue (if any) alive.
            self.absent_run = 0;
            self.last_valid_time = time;
            if self.current.is_none() && self.config.reappearance == ReappearancePolicy::Reopen {
                self.current = Some(SubtitleCue::open(time, candidate));
            }
            return None;
        }

        let closed = self.close_current();
        self.current = Some(SubtitleCue::open(time, candidate.clone()));
        self.history.push(candidate);
        self.absent_run = 0;
        self.last_valid_time = time;
        closed
    }

    /// Ends the stream: the open cue, if any, closes at the last time a
    /// qualifying detection was seen.
    pub fn finish(&mut self) -> Option<SubtitleCue> {
        self.close_current()
    }

    fn record_absence(&mut self) -> Option<SubtitleCue> {
        self.absent_run += 1;
        if self.current.is_some() && self.absent_run >= self.config.disappear_threshold {
            return self.close_current();
        }
        None
    }

    fn close_current(&mut self) -> Option<SubtitleCue> {
        let mut cue = self.current.take()?;
        cue.close(self.last_valid_time);
        Some(cue)
    }

    fn build_candidate(&self, qualifying: &[&RecognizedText]) -> String {
        match self.config.strategy {
            CandidateStrategy::JoinLines => {
                let joined = qualifying
                    .iter()
                    .map(|item| item.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                similarity::normalize(&joined)
            }
            CandidateStrategy::BestLine => qualifying
                .iter()
                .max_by(|a, b| {
                    a.confidence
                        .total_cmp(&b.confidence)
                        .then_with(|| a.text.len().cmp(&b.text.len()))
                        .then_with(|| count_spaces(&b.text).cmp(&count_spaces(&a.text)))
                })
                .map(|best| similarity::normalize(&best.text))
                .unwrap_or_default(),
        }
    }
}

fn count_spaces(text: &str) -> usize {
    text.chars().filter(|c| *c == ' ').count()
}
