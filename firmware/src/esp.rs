use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use ds18b20::{Ds18b20, Resolution};
use embedded_svc::{
    http::{client::Client as HttpClient, Headers, Method, Status},
    io::{Read, Write},
    mqtt::client::QoS,
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_hal::{
    delay::Ets,
    gpio::{AnyIOPin, AnyOutputPin, IOPin, InputOutput, Output, OutputPin, PinDriver, Pull},
};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::prelude::Peripherals,
    http::{
        client::{Configuration as HttpClientConfiguration, EspHttpConnection},
        server::{Configuration as HttpConfiguration, EspHttpServer},
    },
    log::EspLogger,
    mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration},
    nvs::EspDefaultNvsPartition,
    ota::EspOta,
    wifi::{BlockingWifi, EspWifi},
};
use log::{info, warn};
use one_wire_bus::{Address, OneWire};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use incubator_common::{
    fill_incubator_record, publish_sample, ChannelReadings, EngineAction, FeedPublisher,
    FeedTopics, IncubatorEngine, MqttRetrySchedule, NetworkConfig, OtaError, OtaProgress, Record,
    RetryStep, RuntimeConfig, SensorChannel, WifiRetrySchedule,
};

/// Heater relay, active high. GPIO5 idles high at power-on.
const RELAY_PIN: i32 = 5;
/// DS18B20 multi-drop data line.
const ONE_WIRE_PIN: i32 = 13;

/// Reported instead of a temperature when a probe read fails, matching the
/// DS18B20 driver convention.
const TEMP_READ_FAILED_C: f32 = -127.0;

/// Housekeeping cadence between poll cycles.
const LOOP_TICK_MS: u64 = 200;

const MAX_HTTP_BODY: usize = 4096;
const OTA_CHUNK_SIZE: usize = 4096;
const WATCHDOG_TIMEOUT_SEC: u32 = 90;

struct EspFeedPublisher {
    client: EspMqttClient<'static>,
}

impl FeedPublisher for EspFeedPublisher {
    type Error = esp_idf_svc::sys::EspError;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload.as_bytes())
            .map(|_| ())
    }
}

/// The three DS18B20 probes on the shared 1-Wire bus. Channel mapping is
/// positional over discovery order (index 0 = egg cup, 1 = heater, 2 = box);
/// replacing a probe reshuffles the channels, so every discovered address is
/// logged at scan time for diagnosis.
struct ProbeBus {
    one_wire: OneWire<PinDriver<'static, AnyIOPin, InputOutput>>,
    addresses: Vec<Address>,
    delay: Ets,
}

impl ProbeBus {
    fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut one_wire_pin = PinDriver::input_output_od(pin)?;
        one_wire_pin.set_pull(Pull::Up)?;
        one_wire_pin.set_high()?;

        let one_wire = OneWire::new(one_wire_pin)
            .map_err(|err| anyhow!("failed to initialize one-wire bus: {err:?}"))?;

        let mut bus = Self {
            one_wire,
            addresses: Vec::new(),
            delay: Ets,
        };
        bus.scan();
        Ok(bus)
    }

    fn scan(&mut self) {
        let mut found = Vec::new();

        for addr in self.one_wire.devices(false, &mut self.delay) {
            match addr {
                Ok(address) if address.family_code() == ds18b20::FAMILY_CODE => {
                    found.push(address);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("one-wire device scan failed: {err:?}");
                    break;
                }
            }
        }

        for (index, address) in found.iter().enumerate() {
            info!("one-wire probe {index} on GPIO{ONE_WIRE_PIN}: {address:?}");
        }
        if found.len() < SensorChannel::ALL.len() {
            warn!(
                "expected {} DS18B20 probes on GPIO{}, found {}",
                SensorChannel::ALL.len(),
                ONE_WIRE_PIN,
                found.len()
            );
        }

        self.addresses = found;
    }

    /// Start one simultaneous conversion for the whole bus, wait it out, then
    /// read each channel. A failed channel reports the -127.0 sentinel.
    fn read_all(&mut self) -> ChannelReadings {
        if self.addresses.len() < SensorChannel::ALL.len() {
            self.scan();
        }

        if let Err(err) =
            ds18b20::start_simultaneous_temp_measurement(&mut self.one_wire, &mut self.delay)
        {
            warn!("failed to start DS18B20 conversion: {err:?}");
            return ChannelReadings {
                egg_cup_c: TEMP_READ_FAILED_C,
                heater_c: TEMP_READ_FAILED_C,
                box_c: TEMP_READ_FAILED_C,
            };
        }

        Resolution::Bits12.delay_for_measurement_time(&mut self.delay);

        ChannelReadings {
            egg_cup_c: self.read_channel(SensorChannel::EggCup),
            heater_c: self.read_channel(SensorChannel::Heater),
            box_c: self.read_channel(SensorChannel::Box),
        }
    }

    fn read_channel(&mut self, channel: SensorChannel) -> f32 {
        let Some(&address) = self.addresses.get(channel.index()) else {
            return TEMP_READ_FAILED_C;
        };

        let sensor = match Ds18b20::new::<core::convert::Infallible>(address) {
            Ok(sensor) => sensor,
            Err(err) => {
                warn!("invalid DS18B20 address {address:?}: {err:?}");
                self.addresses.clear();
                return TEMP_READ_FAILED_C;
            }
        };

        match sensor.read_data(&mut self.one_wire, &mut self.delay) {
            Ok(data) => data.temperature,
            Err(err) => {
                warn!("failed to read {} probe: {err:?}", channel.as_str());
                self.addresses.clear();
                TEMP_READ_FAILED_C
            }
        }
    }
}

fn set_relay(relay: &mut PinDriver<'static, AnyOutputPin, Output>, action: EngineAction) {
    let result = match action {
        EngineAction::HeaterOn => {
            info!("turn ON heater");
            relay.set_high()
        }
        EngineAction::HeaterOff => {
            info!("turn OFF heater");
            relay.set_low()
        }
    };

    // No hardware read-back exists; the engine flag stays optimistic.
    if let Err(err) = result {
        warn!("failed to drive relay on GPIO{RELAY_PIN}: {err:?}");
    }
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let config = RuntimeConfig::from_build_env();

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let Peripherals { modem, pins, .. } = Peripherals::take()?;

    // Relay first: the pin is held high while the MCU initializes, which
    // would leave the heater stuck on. Force it off before anything else.
    let mut relay = PinDriver::output(pins.gpio5.downgrade_output())?;
    relay.set_low()?;
    info!("turn OFF heater");

    let mut probes =
        ProbeBus::new(pins.gpio13.downgrade()).context("failed to initialize probe bus")?;

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(modem, sys_loop.clone(), Some(nvs_partition))?,
        sys_loop,
    )?;
    configure_wifi(&mut wifi, &config.network)?;
    wifi.start()?;

    let mut wifi_schedule = WifiRetrySchedule::new();
    ensure_wifi_connected(&mut wifi, &mut wifi_schedule)?;
    disable_wifi_power_save();

    if let Ok(mut ota) = EspOta::new() {
        if let Err(err) = ota.mark_running_slot_valid() {
            warn!("failed to mark running OTA slot valid: {err:?}");
        }
    }

    init_watchdog(WATCHDOG_TIMEOUT_SEC)?;
    add_current_task_to_watchdog()?;

    let ota_progress = Arc::new(Mutex::new(OtaProgress::default()));
    let _update_server =
        start_update_listener(ota_progress, config.network.ota_password.clone())?;

    let (mqtt, mut mqtt_events) = create_mqtt_client(&config.network)?;
    let mqtt_connected = Arc::new(AtomicBool::new(false));
    {
        let mqtt_connected = mqtt_connected.clone();
        thread::Builder::new()
            .name("mqtt-events".to_string())
            .stack_size(8192)
            .spawn(move || loop {
                match mqtt_events.next() {
                    Ok(event) => match event.payload() {
                        EventPayload::Connected(_) => {
                            info!("MQTT connected");
                            mqtt_connected.store(true, Ordering::SeqCst);
                        }
                        EventPayload::Disconnected => {
                            warn!("MQTT disconnected");
                            mqtt_connected.store(false, Ordering::SeqCst);
                        }
                        _ => {}
                    },
                    Err(err) => {
                        warn!("mqtt event error: {err:?}");
                        thread::sleep(Duration::from_secs(2));
                    }
                }
            })
            .expect("failed to spawn mqtt event thread");
    }

    let topics = FeedTopics::for_user(&config.network.mqtt_user);
    let mut publisher = EspFeedPublisher { client: mqtt };
    let mut engine = IncubatorEngine::new(config.control);
    let mut mqtt_schedule = MqttRetrySchedule::new();
    let mut record = Record::new("incubator");

    info!(
        "incubator control loop ready (band {:.1}..{:.1} C, period {} ms)",
        config.control.low_threshold_c, config.control.high_threshold_c,
        config.control.poll_period_ms
    );

    let started = Instant::now();

    loop {
        feed_watchdog();
        ensure_wifi_connected(&mut wifi, &mut wifi_schedule)?;

        let now_ms = started.elapsed().as_millis() as u64;
        if engine.cycle_due(now_ms) {
            mqtt_schedule.reset();
            ensure_mqtt_connected(&mqtt_connected, &mut mqtt_schedule);

            let readings = probes.read_all();
            info!("temperature in egg_cup: {:.2}", readings.egg_cup_c);

            for action in engine.evaluate(readings) {
                set_relay(&mut relay, action);
            }

            if let Some(sample) = engine.sample() {
                // Publishes and the database write are best-effort; each
                // failure is logged and the cycle carries on.
                publish_sample(&mut publisher, &topics, &sample);

                fill_incubator_record(&mut record, &sample);
                write_record(&config.network, &record);
                record.clear();
            }

            engine.complete_cycle(started.elapsed().as_millis() as u64);
        }

        thread::sleep(Duration::from_millis(LOOP_TICK_MS));
    }
}

fn configure_wifi(
    wifi: &mut BlockingWifi<EspWifi<'static>>,
    network: &NetworkConfig,
) -> anyhow::Result<()> {
    let auth_method = if network.wifi_pass.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPAWPA2Personal
    };

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: network
            .wifi_ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi ssid too long"))?,
        password: network
            .wifi_pass
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi password too long"))?,
        auth_method,
        ..Default::default()
    }))?;

    Ok(())
}

/// Block until the station is associated. Retries once per second; every
/// tenth consecutive failure power-cycles the radio (disconnect, stop, one
/// second pause) before the attempt sequence restarts. Never gives up.
/// The watchdog is fed on every retry: blocking here through a long outage
/// is an intended state, not a hang, and a watchdog reset would drop the
/// relay low on reboot instead of holding the last commanded state.
fn ensure_wifi_connected(
    wifi: &mut BlockingWifi<EspWifi<'static>>,
    schedule: &mut WifiRetrySchedule,
) -> anyhow::Result<()> {
    if wifi.is_connected().unwrap_or(false) {
        return Ok(());
    }

    info!("connecting to AP");
    loop {
        match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
            Ok(()) => {
                schedule.on_success();
                info!("wifi connected");
                return Ok(());
            }
            Err(err) => {
                warn!("wifi connect failed: {err:?}");
                match schedule.on_failure() {
                    RetryStep::RetryAfter(delay_ms) => {
                        feed_watchdog();
                        thread::sleep(Duration::from_millis(delay_ms));
                    }
                    RetryStep::ResetRadio { pause_ms } => {
                        feed_watchdog();
                        let _ = wifi.disconnect();
                        let _ = wifi.stop();
                        thread::sleep(Duration::from_millis(pause_ms));
                        info!("retrying to connect ...");
                        wifi.start()?;
                    }
                    RetryStep::GiveUp => {}
                }
            }
        }
    }
}

/// The esp-idf MQTT client reconnects in the background; this waits on the
/// connection flag with the firmware's bounded schedule (three attempts, five
/// seconds after each failure), then gives up silently until the next cycle.
fn ensure_mqtt_connected(connected: &AtomicBool, schedule: &mut MqttRetrySchedule) -> bool {
    if connected.load(Ordering::SeqCst) {
        return true;
    }

    info!("connecting to MQTT...");
    loop {
        if connected.load(Ordering::SeqCst) {
            schedule.reset();
            info!("MQTT connected");
            return true;
        }

        match schedule.on_failure() {
            RetryStep::RetryAfter(delay_ms) => {
                info!("retrying MQTT connection in {} seconds...", delay_ms / 1000);
                thread::sleep(Duration::from_millis(delay_ms));
            }
            RetryStep::GiveUp => {
                warn!("MQTT unavailable; publishes will be skipped until next cycle");
                return false;
            }
            RetryStep::ResetRadio { .. } => {}
        }
    }
}

fn create_mqtt_client(
    network: &NetworkConfig,
) -> anyhow::Result<(
    EspMqttClient<'static>,
    esp_idf_svc::mqtt::client::EspMqttConnection,
)> {
    let url = format!("mqtt://{}:{}", network.mqtt_host, network.mqtt_port);

    let conf = MqttClientConfiguration {
        client_id: Some("incubator-firmware"),
        username: if network.mqtt_user.is_empty() {
            None
        } else {
            Some(network.mqtt_user.as_str())
        },
        password: if network.mqtt_key.is_empty() {
            None
        } else {
            Some(network.mqtt_key.as_str())
        },
        ..Default::default()
    };

    Ok(EspMqttClient::new(&url, &conf)?)
}

/// One fresh HTTP write per cycle, line protocol against the 1.x `/write`
/// endpoint with credentials as query parameters. Success or failure is
/// logged only.
fn write_record(network: &NetworkConfig, record: &Record) {
    let line = match record.line_protocol() {
        Ok(line) => line,
        Err(err) => {
            warn!("skipping database write: {err}");
            return;
        }
    };

    let mut url = format!(
        "http://{}:{}/write?db={}",
        network.db_host, network.db_port, network.db_name
    );
    if !network.db_user.is_empty() {
        use std::fmt::Write as _;
        let _ = write!(url, "&u={}&p={}", network.db_user, network.db_pass);
    }

    match post_line(&url, &line) {
        Ok(status) if (200..300).contains(&status) => info!("database write ok"),
        Ok(status) => warn!("database write failed: HTTP {status}"),
        Err(err) => warn!("database write failed: {err:#}"),
    }
}

fn post_line(url: &str, line: &str) -> anyhow::Result<u16> {
    let http_conf = HttpClientConfiguration {
        timeout: Some(Duration::from_secs(10)),
        ..Default::default()
    };
    let mut client = HttpClient::wrap(EspHttpConnection::new(&http_conf)?);

    let mut request = client.request(
        Method::Post,
        url,
        &[("Content-Type", "text/plain; charset=utf-8")],
    )?;
    request.write_all(line.as_bytes())?;
    let response = request.submit().map_err(|err| anyhow!("{err:?}"))?;
    Ok(response.status())
}

#[derive(Debug, Deserialize)]
struct OtaApplyRequest {
    url: String,
    #[serde(default)]
    sha256: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct OtaApplyResponse {
    accepted: bool,
}

/// Background update listener: a small HTTP surface that accepts a firmware
/// image URL, streams it into the inactive OTA slot, and restarts the device
/// on success. Runs for the lifetime of the process, independent of the poll
/// period.
fn start_update_listener(
    progress: Arc<Mutex<OtaProgress>>,
    ota_password: String,
) -> anyhow::Result<EspHttpServer<'static>> {
    let conf = HttpConfiguration {
        stack_size: 16 * 1024,
        ..Default::default()
    };

    let mut server = EspHttpServer::new(&conf)?;

    {
        let progress = progress.clone();
        server.fn_handler("/api/ota/status", Method::Get, move |req| {
            let snapshot = progress.lock().unwrap().clone();
            write_json(req, &snapshot)
        })?;
    }

    {
        let progress = progress.clone();
        server.fn_handler::<anyhow::Error, _>("/api/ota/apply", Method::Post, move |mut req| {
            let body = read_request_body(&mut req)?;
            let apply: OtaApplyRequest =
                serde_json::from_slice(&body).context("invalid ota payload")?;

            match begin_update(&progress, &ota_password, apply) {
                Ok(()) => write_json(req, &OtaApplyResponse { accepted: true }),
                Err(err) => {
                    warn!("OTA Error[{}]: {err}", err.category());
                    let status = match err {
                        OtaError::Auth(_) => 403,
                        OtaError::Begin(_) => 409,
                        _ => 500,
                    };
                    write_error(req, status, &err.to_string())
                }
            }
        })?;
    }

    server.fn_handler("/api/restart", Method::Post, move |req| {
        thread::Builder::new()
            .name("restart-request".into())
            .spawn(|| {
                thread::sleep(Duration::from_millis(500));
                unsafe { esp_idf_svc::sys::esp_restart() };
            })
            .expect("failed to spawn restart thread");

        let payload = serde_json::json!({ "restarting": true });
        write_json(req, &payload)
    })?;

    Ok(server)
}

fn begin_update(
    progress: &Arc<Mutex<OtaProgress>>,
    ota_password: &str,
    apply: OtaApplyRequest,
) -> Result<(), OtaError> {
    if !ota_password.is_empty() {
        let supplied = apply.password.as_deref().unwrap_or_default();
        if supplied != ota_password {
            return Err(OtaError::Auth("invalid OTA password".to_string()));
        }
    }

    {
        let mut state = progress.lock().unwrap();
        if state.in_progress {
            return Err(OtaError::Begin("update already in progress".to_string()));
        }
        *state = OtaProgress {
            in_progress: true,
            ..OtaProgress::default()
        };
    }

    let progress = progress.clone();
    let expected_sha = apply
        .sha256
        .as_ref()
        .map(|value| value.trim().to_ascii_lowercase());

    thread::Builder::new()
        .name("ota-apply".into())
        .stack_size(16 * 1024)
        .spawn(move || {
            match download_and_apply(&progress, &apply.url, expected_sha.as_deref()) {
                Ok(bytes_written) => {
                    {
                        let mut state = progress.lock().unwrap();
                        state.in_progress = false;
                        state.progress_pct = Some(100);
                        state.last_completed_epoch = Some(chrono::Utc::now().timestamp());
                    }
                    info!("flash successful ({bytes_written} bytes)");

                    // The flash-write path leaves the device in a
                    // non-resumable state; a full restart is mandatory.
                    thread::sleep(Duration::from_millis(800));
                    unsafe { esp_idf_svc::sys::esp_restart() };
                }
                Err(err) => {
                    warn!("OTA Error[{}]: {err}", err.category());
                    let mut state = progress.lock().unwrap();
                    state.record_failure(&err);
                    state.last_completed_epoch = Some(chrono::Utc::now().timestamp());
                }
            }
        })
        .map_err(|err| OtaError::Begin(format!("failed to spawn OTA thread: {err}")))?;

    Ok(())
}

fn download_and_apply(
    progress: &Arc<Mutex<OtaProgress>>,
    url: &str,
    expected_sha256: Option<&str>,
) -> Result<u64, OtaError> {
    let http_conf = HttpClientConfiguration {
        timeout: Some(Duration::from_secs(30)),
        crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
        ..Default::default()
    };
    let mut client = HttpClient::wrap(
        EspHttpConnection::new(&http_conf).map_err(|err| OtaError::Connect(format!("{err:?}")))?,
    );
    let request = client
        .request(Method::Get, url, &[])
        .map_err(|err| OtaError::Connect(format!("{err:?}")))?;
    let mut response = request
        .submit()
        .map_err(|err| OtaError::Connect(format!("{err:?}")))?;

    let status = response.status();
    if !(200..300).contains(&status) {
        return Err(OtaError::Connect(format!("download returned HTTP {status}")));
    }

    let content_length = response
        .header("content-length")
        .or_else(|| response.header("Content-Length"))
        .and_then(|value| value.parse::<u64>().ok());
    progress.lock().unwrap().total_bytes = content_length;

    let mut ota = EspOta::new().map_err(|err| OtaError::Begin(format!("{err:?}")))?;
    let mut update = ota
        .initiate_update()
        .map_err(|err| OtaError::Begin(format!("{err:?}")))?;

    let mut hasher = Sha256::new();
    let mut total_written = 0_u64;
    let mut last_logged_pct = 0_u8;
    let mut chunk = [0_u8; OTA_CHUNK_SIZE];

    loop {
        let read = response
            .read(&mut chunk)
            .map_err(|err| OtaError::Receive(format!("{err:?}")))?;
        if read == 0 {
            break;
        }

        update
            .write(&chunk[..read])
            .map_err(|err| OtaError::Receive(format!("{err:?}")))?;
        hasher.update(&chunk[..read]);
        total_written = total_written.saturating_add(read as u64);

        let mut state = progress.lock().unwrap();
        state.record_written(total_written);
        if let Some(pct) = state.progress_pct {
            if pct >= last_logged_pct + 10 {
                last_logged_pct = pct - pct % 10;
                info!("ota progress: {pct}%");
            }
        }
    }

    if total_written == 0 {
        return Err(OtaError::Receive("download body is empty".to_string()));
    }

    let digest = hasher.finalize();
    let mut digest_hex = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut digest_hex, "{byte:02x}");
    }

    if let Some(expected) = expected_sha256 {
        if digest_hex != expected {
            return Err(OtaError::End(format!(
                "sha256 mismatch (expected {expected}, got {digest_hex})"
            )));
        }
    }

    update
        .complete()
        .map_err(|err| OtaError::End(format!("{err:?}")))?;

    Ok(total_written)
}

fn read_request_body(
    req: &mut esp_idf_svc::http::server::Request<
        &mut esp_idf_svc::http::server::EspHttpConnection<'_>,
    >,
) -> anyhow::Result<Vec<u8>> {
    let len = req.content_len().unwrap_or(0) as usize;
    if len > MAX_HTTP_BODY {
        return Err(anyhow!("request body too large"));
    }

    let mut body = vec![0_u8; len];
    if len > 0 {
        req.read_exact(&mut body)?;
    }
    Ok(body)
}

fn write_json<T: Serialize>(
    mut req: esp_idf_svc::http::server::Request<
        &mut esp_idf_svc::http::server::EspHttpConnection<'_>,
    >,
    payload: &T,
) -> anyhow::Result<()> {
    let body = serde_json::to_vec(payload)?;
    req.into_response(
        200,
        Some("OK"),
        &[("Content-Type", "application/json; charset=utf-8")],
    )?
    .write_all(&body)?;
    Ok(())
}

fn write_error(
    mut req: esp_idf_svc::http::server::Request<
        &mut esp_idf_svc::http::server::EspHttpConnection<'_>,
    >,
    status_code: u16,
    message: &str,
) -> anyhow::Result<()> {
    let payload = serde_json::json!({ "error": message });
    let body = serde_json::to_vec(&payload)?;
    req.into_response(
        status_code,
        None,
        &[("Content-Type", "application/json; charset=utf-8")],
    )?
    .write_all(&body)?;
    Ok(())
}

fn init_watchdog(timeout_sec: u32) -> anyhow::Result<()> {
    let config = esp_idf_svc::sys::esp_task_wdt_config_t {
        timeout_ms: timeout_sec.saturating_mul(1000),
        idle_core_mask: 0,
        trigger_panic: true,
    };
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_init(&config) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_init failed with code {}", rc))
}

fn add_current_task_to_watchdog() -> anyhow::Result<()> {
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_add(core::ptr::null_mut()) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_add failed with code {}", rc))
}

fn feed_watchdog() {
    let _ = unsafe { esp_idf_svc::sys::esp_task_wdt_reset() };
}

fn disable_wifi_power_save() {
    let rc = unsafe { esp_idf_svc::sys::esp_wifi_set_ps(0) };
    if rc == esp_idf_svc::sys::ESP_OK {
        info!("wifi power save disabled");
    } else {
        warn!("failed to disable wifi power save: esp_err_t={rc}");
    }
}
