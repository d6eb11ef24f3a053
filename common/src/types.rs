use serde::{Deserialize, Serialize};

/// Logical sensor channels, in bus discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    EggCup,
    Heater,
    Box,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; 3] = [Self::EggCup, Self::Heater, Self::Box];

    /// Position of the probe in 1-Wire discovery order.
    pub fn index(self) -> usize {
        match self {
            Self::EggCup => 0,
            Self::Heater => 1,
            Self::Box => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EggCup => "temp_egg_cup",
            Self::Heater => "temp_heater",
            Self::Box => "temp_box",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeaterState {
    Off,
    On,
}

impl HeaterState {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// Wire value for the status feed and the database field.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }
}

/// One poll cycle's worth of temperatures, degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelReadings {
    pub egg_cup_c: f32,
    pub heater_c: f32,
    pub box_c: f32,
}

impl ChannelReadings {
    pub fn get(&self, channel: SensorChannel) -> f32 {
        match channel {
            SensorChannel::EggCup => self.egg_cup_c,
            SensorChannel::Heater => self.heater_c,
            SensorChannel::Box => self.box_c,
        }
    }
}

/// Snapshot handed to the telemetry publishers after a cycle's evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetrySample {
    pub readings: ChannelReadings,
    pub heater: HeaterState,
}
