//! Playback-lyric synchronization.
//!
//! `active_cue_index` is the pure lookup; `LyricTracker` is the caller-side
//! state that receives every playback tick and only reports changes.

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{LyricCue, PlaybackState};
use crate::ports::PlaybackSource;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LyricError {
  #[error("cue {index} has an invalid time ({time})")]
  InvalidTime { index: usize, time: f64 },

  #[error("cue {index} ({time}s) starts before the previous cue ({previous}s)")]
  OutOfOrder { index: usize, time: f64, previous: f64 },
}

/// Outcome of [`validate_cues`] for a usable sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueOrder {
  StrictlyIncreasing,
  /// Some cues share a timestamp. Only the last cue of each tied group can
  /// ever be active.
  HasTies,
}

/// Returns the index `i` with `cues[i].time <= t` and either `i` last or
/// `cues[i + 1].time > t`, scanning in sequence order and taking the first
/// match.
///
/// `None` when `t` precedes the first cue, when `cues` is empty or when `t`
/// is NaN.
pub fn active_cue_index(cues: &[LyricCue], t: f64) -> Option<usize> {
  (0..cues.len()).find(|&i| is_active(cues, i, t))
}

/// Same result as [`active_cue_index`] for a sorted sheet, checking `hint`
/// and `hint + 1` before falling back to the full scan.
///
/// The shortcut is only sound when the cues are non-decreasing; callers with
/// unvalidated data should use [`active_cue_index`].
pub fn active_cue_index_from(cues: &[LyricCue], t: f64, hint: Option<usize>) -> Option<usize> {
  if let Some(h) = hint {
    for i in [h, h + 1] {
      if i < cues.len() && is_active(cues, i, t) {
        return Some(i);
      }
    }
  }
  active_cue_index(cues, t)
}

fn is_active(cues: &[LyricCue], i: usize, t: f64) -> bool {
  cues[i].time <= t && cues.get(i + 1).is_none_or(|next| next.time > t)
}

pub fn validate_cues(cues: &[LyricCue]) -> Result<CueOrder, LyricError> {
  let mut order = CueOrder::StrictlyIncreasing;

  for (index, cue) in cues.iter().enumerate() {
    if !cue.time.is_finite() || cue.time < 0.0 {
      return Err(LyricError::InvalidTime { index, time: cue.time });
    }

    if index > 0 {
      let previous = cues[index - 1].time;
      if cue.time < previous {
        return Err(LyricError::OutOfOrder { index, time: cue.time, previous });
      }
      if cue.time == previous {
        order = CueOrder::HasTies;
      }
    }
  }

  Ok(order)
}

/// Change of the highlighted cue, emitted by [`LyricTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueChange {
  pub previous: Option<usize>,
  pub current: Option<usize>,
}

/// Follows the playback clock for one song's lyric sheet.
///
/// Redundant updates are suppressed here, not in [`active_cue_index`].
#[derive(Debug, Clone, Default)]
pub struct LyricTracker {
  cues: Vec<LyricCue>,
  sorted: bool,
  current: Option<usize>,
}

impl LyricTracker {
  pub fn new(cues: Vec<LyricCue>) -> Self {
    let sorted = match validate_cues(&cues) {
      Ok(CueOrder::StrictlyIncreasing) => true,
      Ok(CueOrder::HasTies) => {
        warn!("lyric sheet has duplicate timestamps, first match wins");
        true
      }
      Err(e) => {
        warn!(error = %e, "lyric sheet failed validation, falling back to plain scan");
        false
      }
    };

    Self { cues, sorted, current: None }
  }

  /// Tracker for a song without lyrics: never emits anything.
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn cues(&self) -> &[LyricCue] {
    &self.cues
  }

  pub fn current(&self) -> Option<usize> {
    self.current
  }

  pub fn current_cue(&self) -> Option<&LyricCue> {
    self.current.and_then(|i| self.cues.get(i))
  }

  /// Forgets the highlighted cue (song change or playback restart).
  pub fn reset(&mut self) {
    self.current = None;
  }

  pub fn on_time(&mut self, t: f64) -> Option<CueChange> {
    let next = if self.sorted {
      active_cue_index_from(&self.cues, t, self.current)
    } else {
      active_cue_index(&self.cues, t)
    };

    if next == self.current {
      return None;
    }

    debug!(time = t, previous = ?self.current, current = ?next, "active cue changed");
    let change = CueChange { previous: self.current, current: next };
    self.current = next;
    Some(change)
  }

  pub fn on_tick(&mut self, state: &PlaybackState) -> Option<CueChange> {
    self.on_time(state.current_time)
  }

  pub fn poll<S: PlaybackSource + ?Sized>(&mut self, source: &S) -> Option<CueChange> {
    self.on_tick(&source.playback_state())
  }
}
