pub mod config;
pub mod engine;
pub mod ota;
pub mod retry;
pub mod telemetry;
pub mod topics;
pub mod types;

pub use config::{ControlConfig, NetworkConfig, RuntimeConfig};
pub use engine::{EngineAction, IncubatorEngine};
pub use ota::{OtaError, OtaProgress};
pub use retry::{MqttRetrySchedule, RetryStep, WifiRetrySchedule};
pub use telemetry::{
    fill_incubator_record, publish_sample, FeedPublisher, FeedReport, Record,
};
pub use topics::FeedTopics;
pub use types::{ChannelReadings, HeaterState, SensorChannel, TelemetrySample};
