use axum::extract::ws::{Message, WebSocket};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::aggregate::Aggregation;
use crate::core::engine::Snapshot;
use crate::core::error::EnvLogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    Power,
    Plug,
    Climate,
    Co2,
}

impl FromStr for Series {
    type Err = EnvLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "power" => Ok(Series::Power),
            "plug" => Ok(Series::Plug),
            "climate" => Ok(Series::Climate),
            "co2" => Ok(Series::Co2),
            other => Err(EnvLogError::Config(format!("unknown series: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    pub columns: Vec<String>,
    pub rows: Vec<(i64, Vec<Option<f64>>)>,
}

#[derive(Serialize)]
struct SeriesPayload<'a> {
    timestamp: i64,
    values: &'a [Option<f64>],
    #[serde(skip_serializing_if = "no_columns")]
    columns: &'a [String],
    seq: u64,
    end_flag: bool,
}

fn no_columns(columns: &&[String]) -> bool {
    columns.is_empty()
}

fn dense(v: &[f64]) -> Vec<Option<f64>> {
    v.iter().copied().map(Some).collect()
}

/// Flatten one category of `agg` into named columns.
/// Climate rows carry temperature, RH and absolute humidity per sensor.
pub fn series_table(agg: &Aggregation, series: Series) -> SeriesTable {
    match series {
        Series::Power => SeriesTable {
            columns: agg.power_names.clone(),
            rows: agg.power.iter().map(|p| (p.ut, dense(&p.pwr))).collect(),
        },
        Series::Plug => SeriesTable {
            columns: agg.plug_names.clone(),
            rows: agg.power.iter().map(|p| (p.ut, dense(&p.plg))).collect(),
        },
        Series::Climate => {
            let columns = ["dc", "rh", "vh"]
                .iter()
                .flat_map(|q| agg.climate_names.iter().map(move |n| format!("{}/{}", n, q)))
                .collect();
            let rows = agg
                .climate
                .iter()
                .map(|c| {
                    let values = c.dc.iter().chain(&c.rh).chain(&c.vh).copied().collect();
                    (c.ut, values)
                })
                .collect();
            SeriesTable { columns, rows }
        }
        Series::Co2 => SeriesTable {
            columns: agg.co2_names.clone(),
            rows: agg.co2.iter().map(|c| (c.ut, c.co2.clone())).collect(),
        },
    }
}

pub async fn handle_ws_stream(mut socket: WebSocket, snapshot: Arc<Snapshot>, series: Series) {
    info!("ws stream started: {:?} (snapshot {})", series, snapshot.revision);

    let table = snapshot
        .aggregation
        .as_ref()
        .map(|agg| series_table(agg, series))
        .unwrap_or(SeriesTable {
            columns: Vec::new(),
            rows: Vec::new(),
        });

    let mut seq: u64 = 0;
    for (timestamp, values) in &table.rows {
        let payload = SeriesPayload {
            timestamp: *timestamp,
            values,
            columns: if seq == 0 { table.columns.as_slice() } else { &[] },
            seq,
            end_flag: false,
        };

        let json = match serde_json::to_string(&payload) {
            Ok(j) => j,
            Err(e) => {
                error!("json serialize error: {}", e);
                return;
            }
        };

        if let Err(e) = socket.send(Message::Text(json.into())).await {
            warn!("ws send failed: {}", e);
            return;
        }

        seq += 1;
    }

    let end_payload = SeriesPayload {
        timestamp: 0,
        values: &[],
        columns: &[],
        seq,
        end_flag: true,
    };

    if let Ok(json) = serde_json::to_string(&end_payload) {
        let _ = socket.send(Message::Text(json.into())).await;
    }

    info!("ws stream finished: {:?}, {} points", series, seq);
}
