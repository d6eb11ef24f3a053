use crate::types::{SensorChannel, TelemetrySample};

/// MQTT feed names, derived from the broker username the way Adafruit IO
/// keys its feeds: `<user>/feeds/incubator_<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTopics {
    egg_cup: String,
    heater: String,
    box_: String,
    status: String,
}

impl FeedTopics {
    pub fn for_user(username: &str) -> Self {
        Self {
            egg_cup: format!("{username}/feeds/incubator_temp_egg_cup"),
            heater: format!("{username}/feeds/incubator_temp_heater"),
            box_: format!("{username}/feeds/incubator_temp_box"),
            status: format!("{username}/feeds/incubator_status_heater"),
        }
    }

    pub fn temperature(&self, channel: SensorChannel) -> &str {
        match channel {
            SensorChannel::EggCup => &self.egg_cup,
            SensorChannel::Heater => &self.heater,
            SensorChannel::Box => &self.box_,
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// The four (topic, payload) pairs for one cycle: temperatures with one
    /// decimal, heater status as `0`/`1`.
    pub fn payloads(&self, sample: &TelemetrySample) -> Vec<(&str, String)> {
        let mut pairs: Vec<(&str, String)> = SensorChannel::ALL
            .iter()
            .map(|&channel| {
                (
                    self.temperature(channel),
                    format!("{:.1}", sample.readings.get(channel)),
                )
            })
            .collect();
        pairs.push((self.status(), sample.heater.as_u8().to_string()));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelReadings, HeaterState};
    use pretty_assertions::assert_eq;

    #[test]
    fn topics_derive_from_username() {
        let topics = FeedTopics::for_user("gecko_keeper");
        assert_eq!(
            topics.temperature(SensorChannel::EggCup),
            "gecko_keeper/feeds/incubator_temp_egg_cup"
        );
        assert_eq!(
            topics.temperature(SensorChannel::Box),
            "gecko_keeper/feeds/incubator_temp_box"
        );
        assert_eq!(
            topics.temperature(SensorChannel::Heater),
            "gecko_keeper/feeds/incubator_temp_heater"
        );
        assert_eq!(topics.status(), "gecko_keeper/feeds/incubator_status_heater");
    }

    #[test]
    fn payloads_cover_all_four_feeds() {
        let topics = FeedTopics::for_user("u");
        let sample = TelemetrySample {
            readings: ChannelReadings {
                egg_cup_c: 29.54,
                heater_c: 35.0,
                box_c: 27.96,
            },
            heater: HeaterState::On,
        };

        let pairs = topics.payloads(&sample);
        assert_eq!(
            pairs,
            vec![
                ("u/feeds/incubator_temp_egg_cup", "29.5".to_string()),
                ("u/feeds/incubator_temp_heater", "35.0".to_string()),
                ("u/feeds/incubator_temp_box", "28.0".to_string()),
                ("u/feeds/incubator_status_heater", "1".to_string()),
            ]
        );
    }
}
