use crate::{
    config::ControlConfig,
    types::{ChannelReadings, HeaterState, TelemetrySample},
};

/// Relay command produced by one cycle's evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineAction {
    HeaterOn,
    HeaterOff,
}

/// Control-loop state machine. Owns the last readings, the commanded heater
/// state, and the completion tick of the previous cycle. Time is an injected
/// monotonic millisecond count; the engine never sleeps or reads a clock.
#[derive(Debug, Clone)]
pub struct IncubatorEngine {
    config: ControlConfig,
    heater: HeaterState,
    readings: Option<ChannelReadings>,
    last_cycle_ms: Option<u64>,
}

impl IncubatorEngine {
    pub fn new(mut config: ControlConfig) -> Self {
        config.sanitize();
        Self {
            config,
            // The relay pin idles high at power-on, so the boot sequence
            // drives it low before the first cycle; start from Off to match.
            heater: HeaterState::Off,
            readings: None,
            last_cycle_ms: None,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn heater(&self) -> HeaterState {
        self.heater
    }

    pub fn heater_on(&self) -> bool {
        self.heater.is_on()
    }

    pub fn readings(&self) -> Option<ChannelReadings> {
        self.readings
    }

    /// True when at least one poll period has elapsed since the previous
    /// cycle completed. The first cycle after boot is due immediately.
    pub fn cycle_due(&self, now_ms: u64) -> bool {
        match self.last_cycle_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.config.poll_period_ms,
            None => true,
        }
    }

    /// Store the cycle's readings and apply two-point hysteresis to the
    /// egg-cup channel. A command is emitted every cycle the temperature sits
    /// outside the band, even when the relay is already in that state; inside
    /// the band the prior state is retained and nothing is emitted.
    pub fn evaluate(&mut self, readings: ChannelReadings) -> Vec<EngineAction> {
        self.readings = Some(readings);

        let temp = readings.egg_cup_c;
        if temp < self.config.low_threshold_c {
            self.heater = HeaterState::On;
            vec![EngineAction::HeaterOn]
        } else if temp >= self.config.high_threshold_c {
            self.heater = HeaterState::Off;
            vec![EngineAction::HeaterOff]
        } else {
            Vec::new()
        }
    }

    /// Record the cycle's completion; the next cycle is measured from here.
    pub fn complete_cycle(&mut self, now_ms: u64) {
        self.last_cycle_ms = Some(now_ms);
    }

    pub fn last_cycle_ms(&self) -> Option<u64> {
        self.last_cycle_ms
    }

    /// Snapshot for the telemetry publishers. None before the first
    /// successful sensor read.
    pub fn sample(&self) -> Option<TelemetrySample> {
        self.readings.map(|readings| TelemetrySample {
            readings,
            heater: self.heater,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn readings(egg_cup_c: f32) -> ChannelReadings {
        ChannelReadings {
            egg_cup_c,
            heater_c: 34.0,
            box_c: 28.5,
        }
    }

    #[test]
    fn cold_egg_cup_turns_heater_on() {
        let mut engine = IncubatorEngine::new(ControlConfig::default());
        let actions = engine.evaluate(readings(29.5));

        assert_eq!(actions, vec![EngineAction::HeaterOn]);
        assert!(engine.heater_on());
        assert_eq!(engine.sample().unwrap().heater.as_u8(), 1);
    }

    #[test]
    fn warm_egg_cup_turns_heater_off() {
        let mut engine = IncubatorEngine::new(ControlConfig::default());
        engine.evaluate(readings(29.5));

        let actions = engine.evaluate(readings(30.3));
        assert_eq!(actions, vec![EngineAction::HeaterOff]);
        assert!(!engine.heater_on());
        assert_eq!(engine.sample().unwrap().heater.as_u8(), 0);
    }

    #[test]
    fn high_threshold_is_inclusive() {
        let mut engine = IncubatorEngine::new(ControlConfig::default());
        engine.evaluate(readings(29.5));

        let actions = engine.evaluate(readings(30.2));
        assert_eq!(actions, vec![EngineAction::HeaterOff]);
    }

    #[test]
    fn band_retains_prior_state_when_on() {
        let mut engine = IncubatorEngine::new(ControlConfig::default());
        engine.evaluate(readings(29.5));
        assert!(engine.heater_on());

        let actions = engine.evaluate(readings(30.1));
        assert!(actions.is_empty());
        assert!(engine.heater_on());
    }

    #[test]
    fn band_retains_prior_state_when_off() {
        let mut engine = IncubatorEngine::new(ControlConfig::default());
        engine.evaluate(readings(30.3));
        assert!(!engine.heater_on());

        let actions = engine.evaluate(readings(30.1));
        assert!(actions.is_empty());
        assert!(!engine.heater_on());
    }

    #[test]
    fn command_repeats_while_outside_band() {
        let mut engine = IncubatorEngine::new(ControlConfig::default());

        // The pin is rewritten every cycle the temperature sits outside
        // the band.
        assert_eq!(engine.evaluate(readings(29.0)), vec![EngineAction::HeaterOn]);
        assert_eq!(engine.evaluate(readings(29.1)), vec![EngineAction::HeaterOn]);
    }

    #[test]
    fn heater_starts_off_at_boot() {
        let engine = IncubatorEngine::new(ControlConfig::default());
        assert!(!engine.heater_on());
        assert!(engine.sample().is_none());
    }

    #[test]
    fn first_cycle_is_due_immediately() {
        let engine = IncubatorEngine::new(ControlConfig::default());
        assert!(engine.cycle_due(0));
    }

    #[test]
    fn cycle_cadence_measured_from_completion() {
        let mut engine = IncubatorEngine::new(ControlConfig::default());

        engine.complete_cycle(1_000);
        assert!(!engine.cycle_due(1_001));
        assert!(!engine.cycle_due(10_999));
        assert!(engine.cycle_due(11_000));

        // A late completion pushes the next cycle out by a full period.
        engine.complete_cycle(14_000);
        assert!(!engine.cycle_due(21_000));
        assert!(engine.cycle_due(24_000));
    }

    #[test]
    fn failed_probe_sentinel_commands_heat() {
        // A DS18B20 read failure reports -127.0, which falls below the low
        // threshold and commands heat.
        let mut engine = IncubatorEngine::new(ControlConfig::default());
        let actions = engine.evaluate(readings(-127.0));
        assert_eq!(actions, vec![EngineAction::HeaterOn]);
    }
}
