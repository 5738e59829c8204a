use crate::config::ViewerConfig;
use crate::snapshot::Snapshot;
use crate::sth::{Sample, SthClient};
use crate::time::normalize_timestamp;
use chrono_tz::Tz;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const ATTR_LUMINOSITY: &str = "luminosity";
pub const ATTR_HUMIDITY: &str = "humidity";
pub const ATTR_TEMPERATURE: &str = "temperature";

/// Timer-driven refresh loop. Sole writer of the snapshot cell: a tick either
/// replaces the whole snapshot or leaves the previous one untouched.
pub struct SensorPoller {
    config: ViewerConfig,
    client: SthClient,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl SensorPoller {
    pub fn new(
        config: ViewerConfig,
        client: SthClient,
        snapshot_tx: watch::Sender<Snapshot>,
    ) -> Self {
        Self {
            config,
            client,
            snapshot_tx,
        }
    }

    pub fn start(self, cancel: CancellationToken) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.poll_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => self.poll_once().await,
                }
            }
        });
    }

    async fn poll_once(&self) {
        let last_n = self.config.last_n;
        let (luminosity, humidity, temperature) = tokio::join!(
            self.client.fetch(ATTR_LUMINOSITY, last_n),
            self.client.fetch(ATTR_HUMIDITY, last_n),
            self.client.fetch(ATTR_TEMPERATURE, last_n),
        );

        match assemble_snapshot(self.config.timezone, luminosity, humidity, temperature) {
            Some(snapshot) => {
                debug!(samples = snapshot.len(), "snapshot replaced");
                self.snapshot_tx.send_replace(snapshot);
            }
            None => debug!("incomplete poll, previous snapshot retained"),
        }
    }
}

/// Builds the next snapshot from one tick's fetches, or `None` when the tick
/// must be discarded (any series empty, or no timestamp survived parsing).
/// The luminosity series supplies the reference timestamps; the three series
/// are assumed index-aligned by the broker.
pub(crate) fn assemble_snapshot(
    tz: Tz,
    luminosity: Vec<Sample>,
    humidity: Vec<Sample>,
    temperature: Vec<Sample>,
) -> Option<Snapshot> {
    if luminosity.is_empty() || humidity.is_empty() || temperature.is_empty() {
        return None;
    }

    let len = luminosity.len().min(humidity.len()).min(temperature.len());
    if len < luminosity.len() || len < humidity.len() || len < temperature.len() {
        warn!(
            luminosity = luminosity.len(),
            humidity = humidity.len(),
            temperature = temperature.len(),
            "attribute series lengths differ, truncating to shortest"
        );
    }

    let mut snapshot = Snapshot::empty();
    for i in 0..len {
        match normalize_timestamp(&luminosity[i].recv_time, tz) {
            Ok(ts) => {
                snapshot.timestamps.push(ts);
                snapshot.luminosity.push(luminosity[i].value);
                snapshot.humidity.push(humidity[i].value);
                snapshot.temperature.push(temperature[i].value);
            }
            Err(err) => {
                warn!(raw = %luminosity[i].recv_time, error = %err, "skipping sample with unparseable timestamp");
            }
        }
    }

    if snapshot.is_empty() {
        return None;
    }
    Some(snapshot)
}
