use std::{fmt, sync::Arc};

/// Transcoding stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Decode,
    ExtractCover,
    Loop,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Decode => "Decoding",
            Self::ExtractCover => "Extracting cover",
            Self::Loop => "Rendering video",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Transcode { stage: Stage, percent: u8 },
    /// Always sent once a stage succeeds, after a final 100% update.
    StageFinished { stage: Stage },
    Download { received: u64, total: Option<u64> },
    DownloadFinished { received: u64 },
}

impl ProgressEvent {
    pub fn percent(&self) -> Option<u8> {
        match self {
            Self::Transcode { percent, .. } => Some(*percent),
            Self::StageFinished { .. } | Self::DownloadFinished { .. } => Some(100),
            Self::Download { received, total } => {
                total.map(|total| progress_percent(*received, total))
            }
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A callback that drops every event.
pub fn silent() -> ProgressCallback {
    Arc::new(|_| {})
}

/// `floor(elapsed * 100 / total)`, clamped to 100. A zero total reports 0.
pub fn progress_percent(elapsed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = u128::from(elapsed) * 100 / u128::from(total);
    percent.min(100) as u8
}

/// Parse a `H:MM:SS` timecode into whole seconds. Fractions are dropped.
pub fn parse_timecode(timecode: &str) -> Option<u64> {
    let timecode = timecode.trim();
    let whole = timecode.split('.').next()?;

    let mut parts = whole.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }

    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Turns ffmpeg `-progress` output into monotonic percentages for one stage.
pub struct TimecodeProgress {
    stage: Stage,
    total_seconds: u64,
    last: Option<u8>,
}

impl TimecodeProgress {
    pub fn new(stage: Stage, total_seconds: u64) -> Self {
        Self {
            stage,
            total_seconds,
            last: None,
        }
    }

    /// Returns an event only when the percentage moved forward.
    pub fn update(&mut self, timecode: &str) -> Option<ProgressEvent> {
        let elapsed = parse_timecode(timecode)?;
        let percent = progress_percent(elapsed, self.total_seconds);
        if self.last.is_some_and(|last| percent <= last) {
            return None;
        }

        self.last = Some(percent);
        Some(ProgressEvent::Transcode {
            stage: self.stage,
            percent,
        })
    }

    /// Feed one `key=value` line of `ffmpeg -progress` output.
    pub fn feed_line(&mut self, line: &str) -> Option<ProgressEvent> {
        let timecode = line.trim().strip_prefix("out_time=")?;
        self.update(timecode)
    }
}
