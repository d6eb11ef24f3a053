//! Retry schedules for the two blocking reconnect paths. The schedules are
//! pure state machines over failure counts; the backends own the actual
//! delays, so the policies test without real time passing.

pub const WIFI_ATTEMPTS_PER_RESET: u32 = 10;
pub const WIFI_RETRY_DELAY_MS: u64 = 1_000;
pub const WIFI_RESET_PAUSE_MS: u64 = 1_000;

pub const MQTT_CONNECT_ATTEMPTS: u32 = 3;
pub const MQTT_RETRY_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Wait the given delay, then attempt again.
    RetryAfter(u64),
    /// Power-cycle the radio (disconnect, radio off, pause), then resume.
    ResetRadio { pause_ms: u64 },
    /// Stop until the next poll cycle.
    GiveUp,
}

/// WiFi association: retry every second, and after ten consecutive failures
/// force exactly one radio power-cycle before the attempt count restarts.
/// Never gives up.
#[derive(Debug, Clone, Default)]
pub struct WifiRetrySchedule {
    failures: u32,
}

impl WifiRetrySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_failure(&mut self) -> RetryStep {
        self.failures += 1;
        if self.failures >= WIFI_ATTEMPTS_PER_RESET {
            self.failures = 0;
            RetryStep::ResetRadio {
                pause_ms: WIFI_RESET_PAUSE_MS,
            }
        } else {
            RetryStep::RetryAfter(WIFI_RETRY_DELAY_MS)
        }
    }

    pub fn on_success(&mut self) {
        self.failures = 0;
    }
}

/// MQTT broker connection: three attempts, each failure followed by a five
/// second wait, then give up silently until the next cycle calls `reset()`.
#[derive(Debug, Clone, Default)]
pub struct MqttRetrySchedule {
    failures: u32,
}

impl MqttRetrySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_failure(&mut self) -> RetryStep {
        self.failures += 1;
        if self.failures > MQTT_CONNECT_ATTEMPTS {
            RetryStep::GiveUp
        } else {
            RetryStep::RetryAfter(MQTT_RETRY_DELAY_MS)
        }
    }

    pub fn gave_up(&self) -> bool {
        self.failures > MQTT_CONNECT_ATTEMPTS
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wifi_resets_radio_exactly_once_per_ten_failures() {
        let mut schedule = WifiRetrySchedule::new();

        for _ in 0..9 {
            assert_eq!(
                schedule.on_failure(),
                RetryStep::RetryAfter(WIFI_RETRY_DELAY_MS)
            );
        }
        assert_eq!(
            schedule.on_failure(),
            RetryStep::ResetRadio { pause_ms: 1_000 }
        );

        // Attempt counter restarts after the reset.
        assert_eq!(
            schedule.on_failure(),
            RetryStep::RetryAfter(WIFI_RETRY_DELAY_MS)
        );
    }

    #[test]
    fn wifi_never_gives_up() {
        let mut schedule = WifiRetrySchedule::new();
        for _ in 0..100 {
            assert_ne!(schedule.on_failure(), RetryStep::GiveUp);
        }
    }

    #[test]
    fn wifi_success_clears_failure_count() {
        let mut schedule = WifiRetrySchedule::new();
        for _ in 0..9 {
            schedule.on_failure();
        }
        schedule.on_success();
        assert_eq!(
            schedule.on_failure(),
            RetryStep::RetryAfter(WIFI_RETRY_DELAY_MS)
        );
    }

    #[test]
    fn mqtt_gives_up_after_three_attempts() {
        let mut schedule = MqttRetrySchedule::new();

        for _ in 0..MQTT_CONNECT_ATTEMPTS {
            assert_eq!(
                schedule.on_failure(),
                RetryStep::RetryAfter(MQTT_RETRY_DELAY_MS)
            );
        }
        assert_eq!(schedule.on_failure(), RetryStep::GiveUp);
        assert!(schedule.gave_up());

        // Next cycle starts fresh.
        schedule.reset();
        assert!(!schedule.gave_up());
        assert_eq!(
            schedule.on_failure(),
            RetryStep::RetryAfter(MQTT_RETRY_DELAY_MS)
        );
    }

    // Every one of the three failed attempts waits out the full delay
    // before the schedule reports give-up, a 15 second blocking profile.
    #[test]
    fn mqtt_waits_after_each_failed_attempt() {
        let mut schedule = MqttRetrySchedule::new();

        let mut waited_ms = 0;
        loop {
            match schedule.on_failure() {
                RetryStep::RetryAfter(delay_ms) => waited_ms += delay_ms,
                RetryStep::GiveUp => break,
                step => panic!("unexpected step: {step:?}"),
            }
        }
        assert_eq!(
            waited_ms,
            u64::from(MQTT_CONNECT_ATTEMPTS) * MQTT_RETRY_DELAY_MS
        );
    }
}
