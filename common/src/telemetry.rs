use std::fmt::Write;

use log::{info, warn};
use thiserror::Error;

use crate::{topics::FeedTopics, types::TelemetrySample};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("record has no fields")]
    EmptyRecord,
}

/// One publish seam per backend: rumqttc on the host, the esp-idf MQTT
/// client on device, a mock in tests. Publishing is fire-and-forget from the
/// control loop's point of view.
pub trait FeedPublisher {
    type Error: std::fmt::Display;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error>;
}

/// Outcome of one cycle's feed fan-out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub published: Vec<String>,
    pub failed: Vec<String>,
}

impl FeedReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Publish the four feeds independently. A failure on one feed is logged and
/// recorded but never prevents the remaining feeds from going out.
pub fn publish_sample<P: FeedPublisher>(
    publisher: &mut P,
    topics: &FeedTopics,
    sample: &TelemetrySample,
) -> FeedReport {
    let mut report = FeedReport::default();

    for (topic, payload) in topics.payloads(sample) {
        match publisher.publish(topic, &payload) {
            Ok(()) => {
                info!("published {payload} to {topic}");
                report.published.push(topic.to_string());
            }
            Err(err) => {
                warn!("failed to publish to {topic}: {err}");
                report.failed.push(topic.to_string());
            }
        }
    }

    report
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Bool(bool),
}

/// Influx line-protocol record builder. Built once per cycle, written, then
/// cleared for reuse.
#[derive(Debug, Clone, Default)]
pub struct Record {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new(measurement: &str) -> Self {
        Self {
            measurement: measurement.to_string(),
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn tag(&mut self, key: &str, value: &str) -> &mut Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    pub fn field_f64(&mut self, key: &str, value: f64) -> &mut Self {
        self.fields.push((key.to_string(), FieldValue::Float(value)));
        self
    }

    pub fn field_bool(&mut self, key: &str, value: bool) -> &mut Self {
        self.fields.push((key.to_string(), FieldValue::Bool(value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Empty tags and fields so the builder can be reused next cycle.
    pub fn clear(&mut self) {
        self.tags.clear();
        self.fields.clear();
    }

    /// Render the record as one line of Influx line protocol:
    /// `measurement,tag=value field=1.0,other=true`.
    pub fn line_protocol(&self) -> Result<String, TelemetryError> {
        if self.fields.is_empty() {
            return Err(TelemetryError::EmptyRecord);
        }

        let mut line = escape_measurement(&self.measurement);

        for (key, value) in &self.tags {
            let _ = write!(line, ",{}={}", escape_tag(key), escape_tag(value));
        }

        for (index, (key, value)) in self.fields.iter().enumerate() {
            let sep = if index == 0 { ' ' } else { ',' };
            let _ = match value {
                FieldValue::Float(v) => write!(line, "{sep}{}={v}", escape_tag(key)),
                FieldValue::Bool(v) => write!(line, "{sep}{}={v}", escape_tag(key)),
            };
        }

        Ok(line)
    }
}

fn escape_measurement(raw: &str) -> String {
    raw.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(raw: &str) -> String {
    raw.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// Fill a (cleared) record with one cycle's database payload: measurement
/// `incubator`, fixed `type=gecko_incubator` tag, three temperature fields
/// and the heater flag. The builder is cleared and refilled every cycle.
pub fn fill_incubator_record(record: &mut Record, sample: &TelemetrySample) {
    record
        .tag("type", "gecko_incubator")
        .field_f64("temp_egg_cup", f64::from(sample.readings.egg_cup_c))
        .field_f64("temp_box", f64::from(sample.readings.box_c))
        .field_f64("temp_heater", f64::from(sample.readings.heater_c))
        .field_bool("heater_status", sample.heater.is_on());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelReadings, HeaterState};
    use pretty_assertions::assert_eq;

    fn sample(heater: HeaterState) -> TelemetrySample {
        TelemetrySample {
            readings: ChannelReadings {
                egg_cup_c: 29.5,
                heater_c: 36.0,
                box_c: 28.25,
            },
            heater,
        }
    }

    struct MockPublisher {
        fail_topics: Vec<&'static str>,
        sent: Vec<(String, String)>,
    }

    impl FeedPublisher for MockPublisher {
        type Error = String;

        fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
            if self.fail_topics.iter().any(|t| topic.ends_with(t)) {
                return Err("connection reset".to_string());
            }
            self.sent.push((topic.to_string(), payload.to_string()));
            Ok(())
        }
    }

    #[test]
    fn all_four_feeds_published() {
        let topics = FeedTopics::for_user("u");
        let mut publisher = MockPublisher {
            fail_topics: vec![],
            sent: vec![],
        };

        let report = publish_sample(&mut publisher, &topics, &sample(HeaterState::On));

        assert!(report.all_ok());
        assert_eq!(report.published.len(), 4);
        assert_eq!(publisher.sent.last().unwrap().1, "1");
    }

    #[test]
    fn one_failed_feed_does_not_block_the_others() {
        let topics = FeedTopics::for_user("u");
        let mut publisher = MockPublisher {
            fail_topics: vec!["incubator_temp_box"],
            sent: vec![],
        };

        let report = publish_sample(&mut publisher, &topics, &sample(HeaterState::Off));

        assert_eq!(report.failed, vec!["u/feeds/incubator_temp_box".to_string()]);
        assert_eq!(report.published.len(), 3);
        assert!(publisher
            .sent
            .iter()
            .any(|(topic, payload)| topic.ends_with("incubator_status_heater") && payload == "0"));
    }

    #[test]
    fn record_renders_line_protocol() {
        let mut record = Record::new("incubator");
        fill_incubator_record(&mut record, &sample(HeaterState::On));
        assert_eq!(
            record.line_protocol().unwrap(),
            "incubator,type=gecko_incubator \
             temp_egg_cup=29.5,temp_box=28.25,temp_heater=36,heater_status=true"
        );
    }

    #[test]
    fn cleared_record_is_empty_and_unwritable() {
        let mut record = Record::new("incubator");
        fill_incubator_record(&mut record, &sample(HeaterState::Off));
        record.clear();
        assert!(record.is_empty());
        assert_eq!(record.line_protocol(), Err(TelemetryError::EmptyRecord));
    }

    #[test]
    fn record_builder_is_reusable_across_cycles() {
        let mut record = Record::new("incubator");
        fill_incubator_record(&mut record, &sample(HeaterState::On));
        let first = record.line_protocol().unwrap();

        record.clear();
        fill_incubator_record(&mut record, &sample(HeaterState::On));
        assert_eq!(record.line_protocol().unwrap(), first);
    }

    #[test]
    fn tags_and_measurements_are_escaped() {
        let mut record = Record::new("egg box");
        record.tag("room type", "rack,shelf=2").field_f64("t", 1.0);
        assert_eq!(
            record.line_protocol().unwrap(),
            "egg\\ box,room\\ type=rack\\,shelf\\=2 t=1"
        );
    }
}
