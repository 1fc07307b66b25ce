//! Parser for ffmpeg's `-progress` key=value stream.
//!
//! ffmpeg writes one block per reporting interval, each terminated by a
//! `progress=continue` or `progress=end` line.

use tf_core::events::ProgressSnapshot;

const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "stream_",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

/// Accumulates one progress block at a time.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: ProgressSnapshot,
    finished: bool,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the engine reported `progress=end`.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Whether `line` belongs to the progress stream rather than to the
    /// engine's log output.
    pub fn is_progress_line(line: &str) -> bool {
        match line.split_once('=') {
            Some((key, _)) => PROGRESS_KEYS.iter().any(|k| key.trim().starts_with(k)),
            None => false,
        }
    }

    /// Feed one stderr line. Returns the completed snapshot when `line`
    /// closes a block.
    pub fn feed(&mut self, line: &str) -> Option<ProgressSnapshot> {
        let (key, value) = line.split_once('=')?;
        let value = value.trim();
        let known = |v: &str| (v != "N/A").then_some(());

        match key.trim() {
            "frame" => {
                if let Ok(frames) = value.parse() {
                    self.current.frames = frames;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    self.current.current_fps = fps;
                }
            }
            "out_time_us" => self.current.out_time_us = value.parse().ok(),
            "total_size" => self.current.total_size = value.parse().ok(),
            "bitrate" => self.current.bitrate = known(value).map(|()| value.to_string()),
            "speed" => {
                self.current.speed = known(value).and_then(|()| value.trim_end_matches('x').trim().parse().ok())
            }
            "progress" => {
                self.finished = value == "end";
                return Some(self.current.clone());
            }
            _ => {}
        }
        None
    }
}
