use serde::Serialize;
use thiserror::Error;

/// OTA failure categories, kept deliberately coarse: they exist for logging
/// and status reporting, not for recovery decisions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtaError {
    #[error("auth failed: {0}")]
    Auth(String),
    #[error("begin failed: {0}")]
    Begin(String),
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("end failed: {0}")]
    End(String),
}

impl OtaError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Begin(_) => "begin",
            Self::Connect(_) => "connect",
            Self::Receive(_) => "receive",
            Self::End(_) => "end",
        }
    }
}

/// Progress snapshot exposed by the update listener.
#[derive(Debug, Default, Clone, Serialize)]
pub struct OtaProgress {
    #[serde(rename = "inProgress")]
    pub in_progress: bool,
    #[serde(rename = "bytesWritten")]
    pub bytes_written: u64,
    #[serde(rename = "totalBytes")]
    pub total_bytes: Option<u64>,
    #[serde(rename = "progressPct")]
    pub progress_pct: Option<u8>,
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
    #[serde(rename = "lastCompletedEpoch")]
    pub last_completed_epoch: Option<i64>,
}

impl OtaProgress {
    pub fn record_written(&mut self, bytes_written: u64) {
        self.bytes_written = bytes_written;
        if let Some(total) = self.total_bytes.filter(|total| *total > 0) {
            let pct = (bytes_written.saturating_mul(100) / total).min(100);
            self.progress_pct = Some(pct as u8);
        }
    }

    pub fn record_failure(&mut self, err: &OtaError) {
        self.in_progress = false;
        self.last_error = Some(format!("[{}] {err}", err.category()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn progress_percent_tracks_bytes() {
        let mut progress = OtaProgress {
            in_progress: true,
            total_bytes: Some(1_000),
            ..OtaProgress::default()
        };

        progress.record_written(250);
        assert_eq!(progress.progress_pct, Some(25));
        progress.record_written(2_000);
        assert_eq!(progress.progress_pct, Some(100));
    }

    #[test]
    fn unknown_total_leaves_percent_unset() {
        let mut progress = OtaProgress::default();
        progress.record_written(4_096);
        assert_eq!(progress.progress_pct, None);
        assert_eq!(progress.bytes_written, 4_096);
    }

    #[test]
    fn failures_are_categorized_for_logging() {
        let mut progress = OtaProgress::default();
        progress.record_failure(&OtaError::Receive("short read".to_string()));
        assert_eq!(
            progress.last_error.as_deref(),
            Some("[receive] receive failed: short read")
        );

        assert_eq!(OtaError::Auth(String::new()).category(), "auth");
        assert_eq!(OtaError::Begin(String::new()).category(), "begin");
        assert_eq!(OtaError::Connect(String::new()).category(), "connect");
        assert_eq!(OtaError::End(String::new()).category(), "end");
    }
}
