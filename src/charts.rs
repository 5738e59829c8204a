use crate::snapshot::Snapshot;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub mode: &'static str,
    pub name: &'static str,
    pub line: Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: &'static str,
    pub xaxis: Axis,
    pub yaxis: Axis,
}

/// One Plotly-compatible figure: traces plus layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    pub luminosity: ChartSpec,
    pub humidity: ChartSpec,
    pub temperature: ChartSpec,
}

fn layout(title: &'static str, y_title: &'static str) -> Layout {
    Layout {
        title,
        xaxis: Axis { title: "Timestamp" },
        yaxis: Axis { title: y_title },
    }
}

fn format_timestamp(ts: &DateTime<Tz>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

fn series_trace(
    x: &[String],
    y: &[f64],
    name: &'static str,
    color: &'static str,
) -> Trace {
    Trace {
        x: x.to_vec(),
        y: y.to_vec(),
        mode: "lines+markers",
        name,
        line: Line { color, dash: None },
    }
}

/// Renders the three figures from the current snapshot. Pure: equal
/// snapshots yield equal chart sets, and an empty snapshot yields three
/// placeholder figures with no traces.
pub fn render(snapshot: &Snapshot) -> ChartSet {
    let luminosity_layout = layout("Luminosity Over Time", "Luminosity");
    let humidity_layout = layout("Humidity Over Time", "Humidity");
    let temperature_layout = layout("Temperature Over Time", "Temperature");

    if snapshot.is_empty() {
        return ChartSet {
            luminosity: ChartSpec {
                data: Vec::new(),
                layout: luminosity_layout,
            },
            humidity: ChartSpec {
                data: Vec::new(),
                layout: humidity_layout,
            },
            temperature: ChartSpec {
                data: Vec::new(),
                layout: temperature_layout,
            },
        };
    }

    let x: Vec<String> = snapshot.timestamps.iter().map(format_timestamp).collect();

    let mean_luminosity =
        snapshot.luminosity.iter().sum::<f64>() / snapshot.luminosity.len() as f64;
    let mean_overlay = Trace {
        x: vec![x[0].clone(), x[x.len() - 1].clone()],
        y: vec![mean_luminosity, mean_luminosity],
        mode: "lines",
        name: "Mean Luminosity",
        line: Line {
            color: "blue",
            dash: Some("dash"),
        },
    };

    ChartSet {
        luminosity: ChartSpec {
            data: vec![
                series_trace(&x, &snapshot.luminosity, "Luminosity", "orange"),
                mean_overlay,
            ],
            layout: luminosity_layout,
        },
        humidity: ChartSpec {
            data: vec![series_trace(&x, &snapshot.humidity, "Humidity", "green")],
            layout: humidity_layout,
        },
        temperature: ChartSpec {
            data: vec![series_trace(
                &x,
                &snapshot.temperature,
                "Temperature",
                "red",
            )],
            layout: temperature_layout,
        },
    }
}

/// Re-renders whenever the snapshot cell is replaced. This is the downstream
/// reaction to a poll, decoupled from the timer itself.
pub fn start_render_task(
    mut snapshot_rx: watch::Receiver<Snapshot>,
    charts_tx: watch::Sender<ChartSet>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = snapshot_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshot_rx.borrow_and_update().clone();
                    charts_tx.send_replace(render(&snapshot));
                }
            }
        }
    });
}
