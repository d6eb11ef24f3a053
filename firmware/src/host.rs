use std::time::{Duration, Instant};

use rumqttc::{AsyncClient, MqttOptions, QoS};
use tracing::{info, warn};

use incubator_common::{
    fill_incubator_record, publish_sample, ChannelReadings, EngineAction, FeedPublisher,
    FeedTopics, IncubatorEngine, Record, RuntimeConfig,
};

/// How often the loop wakes to service housekeeping between poll cycles.
const LOOP_TICK_MS: u64 = 250;

struct MqttFeedPublisher {
    client: AsyncClient,
}

impl FeedPublisher for MqttFeedPublisher {
    type Error = rumqttc::ClientError;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
    }
}

/// Stand-in for the relay pin. Logs transitions the way the device backend
/// logs pin writes.
#[derive(Default)]
struct SimulatedRelay {
    on: bool,
}

impl SimulatedRelay {
    fn set(&mut self, on: bool) {
        self.on = on;
        if on {
            info!("turn ON heater");
        } else {
            info!("turn OFF heater");
        }
    }
}

/// Crude thermal model of the incubator box so the hysteresis band is
/// actually exercised during host runs: the heater element relaxes toward a
/// hot setpoint while powered and toward ambient while not, and the egg cup
/// trails between the element and the box.
struct SimulatedProbes {
    egg_cup_c: f32,
    heater_c: f32,
    box_c: f32,
}

impl SimulatedProbes {
    fn new() -> Self {
        Self {
            egg_cup_c: 28.0,
            heater_c: 28.0,
            box_c: 26.5,
        }
    }

    fn read_all(&mut self, heater_on: bool) -> ChannelReadings {
        let element_target = if heater_on { 45.0 } else { self.box_c };
        self.heater_c += (element_target - self.heater_c) * 0.25;
        self.egg_cup_c +=
            (self.heater_c - self.egg_cup_c) * 0.08 + (self.box_c - self.egg_cup_c) * 0.04;
        self.box_c += (self.egg_cup_c - self.box_c) * 0.02;

        ChannelReadings {
            egg_cup_c: self.egg_cup_c,
            heater_c: self.heater_c,
            box_c: self.box_c,
        }
    }
}

fn env_overrides(config: &mut RuntimeConfig) {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.network.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        config.network.mqtt_user = user;
    }
    if let Ok(key) = std::env::var("MQTT_KEY") {
        config.network.mqtt_key = key;
    }
    if let Ok(host) = std::env::var("DB_HOST") {
        config.network.db_host = host;
    }
    if let Some(port) = std::env::var("DB_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.network.db_port = port;
    }
    if let Ok(name) = std::env::var("DB_NAME") {
        config.network.db_name = name;
    }
    if let Ok(user) = std::env::var("DB_USER") {
        config.network.db_user = user;
    }
    if let Ok(pass) = std::env::var("DB_PASS") {
        config.network.db_pass = pass;
    }
    if let Some(period) = std::env::var("POLL_PERIOD_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
    {
        config.control.poll_period_ms = period;
    }
    config.control.sanitize();
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = RuntimeConfig::from_build_env();
    env_overrides(&mut config);

    let mut engine = IncubatorEngine::new(config.control);
    let topics = FeedTopics::for_user(&config.network.mqtt_user);

    let mut mqtt_options = MqttOptions::new(
        "incubator-firmware",
        config.network.mqtt_host.clone(),
        config.network.mqtt_port,
    );
    if !config.network.mqtt_user.is_empty() {
        mqtt_options.set_credentials(
            config.network.mqtt_user.clone(),
            config.network.mqtt_key.clone(),
        );
    }

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 32);

    // rumqttc reconnects on its own as long as the event loop keeps polling.
    tokio::spawn(async move {
        loop {
            if let Err(err) = eventloop.poll().await {
                warn!("mqtt poll error: {err}");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    });

    let http = reqwest::Client::new();
    let write_url = format!(
        "http://{}:{}/write?db={}",
        config.network.db_host, config.network.db_port, config.network.db_name
    );

    info!(
        "incubator control loop started (band {:.1}..{:.1} C, period {} ms)",
        config.control.low_threshold_c,
        config.control.high_threshold_c,
        config.control.poll_period_ms
    );

    let started = Instant::now();
    let mut relay = SimulatedRelay::default();
    let mut probes = SimulatedProbes::new();
    let mut publisher = MqttFeedPublisher { client };
    let mut record = Record::new("incubator");

    loop {
        let now_ms = started.elapsed().as_millis() as u64;

        if engine.cycle_due(now_ms) {
            let readings = probes.read_all(relay.on);
            info!("temperature in egg_cup: {:.2}", readings.egg_cup_c);

            for action in engine.evaluate(readings) {
                match action {
                    EngineAction::HeaterOn => relay.set(true),
                    EngineAction::HeaterOff => relay.set(false),
                }
            }

            if let Some(sample) = engine.sample() {
                publish_sample(&mut publisher, &topics, &sample);

                fill_incubator_record(&mut record, &sample);
                write_record(&http, &write_url, &config, &record).await;
                record.clear();
            }

            engine.complete_cycle(started.elapsed().as_millis() as u64);
        }

        tokio::time::sleep(Duration::from_millis(LOOP_TICK_MS)).await;
    }
}

/// Best-effort database write: success and failure are logged only and never
/// block the cycle.
async fn write_record(
    http: &reqwest::Client,
    write_url: &str,
    config: &RuntimeConfig,
    record: &Record,
) {
    let line = match record.line_protocol() {
        Ok(line) => line,
        Err(err) => {
            warn!("skipping database write: {err}");
            return;
        }
    };

    let mut request = http.post(write_url).body(line);
    if !config.network.db_user.is_empty() {
        request = request.basic_auth(&config.network.db_user, Some(&config.network.db_pass));
    }

    match request.send().await {
        Ok(response) if response.status().is_success() => info!("database write ok"),
        Ok(response) => warn!("database write failed: HTTP {}", response.status()),
        Err(err) => warn!("database write failed: {err}"),
    }
}
