// CSV export of archive samples

use chrono::DateTime;
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use tracing::debug;

use crate::core::calendar::DayClock;
use crate::core::error::Result;
use crate::core::format::Sample;

const TIME_FMT: &str = "%Y/%m/%d %H:%M";

fn temp_col(name: &str) -> String {
    format!("{} temp[°C]", name)
}

fn rh_col(name: &str) -> String {
    format!("{} RH[%]", name)
}

fn co2_col(name: &str) -> String {
    format!("{} CO2[ppm]", name)
}

fn watt_col(name: &str) -> String {
    format!("{}[W]", name)
}

/// Column set for a run of samples: climate columns (descending), then
/// generation circuits, then consumption circuits (each ascending).
#[derive(Debug, Clone, Default)]
pub struct CsvLayout {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl CsvLayout {
    pub fn scan<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut climate = BTreeSet::new();
        let mut gen = BTreeSet::new();
        let mut usage = BTreeSet::new();

        for sample in samples {
            for entry in sample.devices.values() {
                if let Some(c) = entry.dat.climate() {
                    climate.insert(temp_col(c.name));
                    climate.insert(rh_col(c.name));
                }
                if let Some((name, _)) = entry.dat.co2() {
                    climate.insert(co2_col(name));
                }
                if let Some(agg) = entry.dat.aggregate() {
                    gen.extend(agg.gen.iter().map(|(_, n)| watt_col(n)));
                    usage.extend(agg.consumption.iter().map(|(_, n)| watt_col(n)));
                }
            }
        }

        let mut layout = Self::default();
        for col in climate.into_iter().rev().chain(gen).chain(usage) {
            if !layout.index.contains_key(&col) {
                layout.index.insert(col.clone(), layout.columns.len());
                layout.columns.push(col);
            }
        }
        layout
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn set(&self, row: &mut [String], col: String, value: f64) {
        if let Some(&i) = self.index.get(&col) {
            row[i] = value.to_string();
        }
    }

    fn row(&self, sample: &Sample, clock: &DayClock) -> Vec<String> {
        let mut row = vec![String::new(); self.columns.len()];
        for entry in sample.devices.values() {
            if let Some(c) = entry.dat.climate() {
                self.set(&mut row, temp_col(c.name), c.celsius);
                self.set(&mut row, rh_col(c.name), c.rh);
            }
            if let Some((name, ppm)) = entry.dat.co2() {
                self.set(&mut row, co2_col(name), ppm);
            }
            if let Some(agg) = entry.dat.aggregate() {
                for (w, name) in agg.gen.iter().chain(&agg.consumption) {
                    self.set(&mut row, watt_col(name), *w);
                }
            }
        }

        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(local_time_label(sample.timestamp, clock));
        record.extend(row);
        record
    }
}

/// `YYYY/MM/DD HH:MM` in the clock's local time.
pub fn local_time_label(timestamp: i64, clock: &DayClock) -> String {
    DateTime::from_timestamp(timestamp + clock.utc_offset_minutes() * 60, 0)
        .map(|t| t.naive_utc().format(TIME_FMT).to_string())
        .unwrap_or_default()
}

/// Write a header plus one row per sample. Returns the number of rows.
pub fn write_csv<W: Write>(writer: W, samples: &[Sample], clock: &DayClock) -> Result<usize> {
    let layout = CsvLayout::scan(samples);
    debug!("CSV layout: {} columns", layout.columns().len());

    let mut out = csv::Writer::from_writer(writer);
    let mut header = vec!["time".to_string()];
    header.extend(layout.columns().iter().cloned());
    out.write_record(&header)?;

    for sample in samples {
        out.write_record(layout.row(sample, clock))?;
    }
    out.flush()?;
    Ok(samples.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Sample> {
        let json = r#"[
            [1704034800, {
                "aiseg": {"dat": {"gen": [[900, "solar"]], "use": [[300, "kitchen"], [100, "aircon"]]}, "ut": 0},
                "m": {"dat": {"name": "living", "sq": 1, "dcE1": 215, "rh": 45}, "ut": 0}
            }],
            [1704034860, {
                "c": {"dat": {"name": "study", "sq": 1, "dcE1": 200, "rh": 40, "CO2": 650}, "ut": 0},
                "p": {"dat": {"name": "tv", "sq": 1, "on": 1, "pwrE1": 100}, "ut": 0}
            }]
        ]"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_column_order() {
        let layout = CsvLayout::scan(&samples());
        assert_eq!(
            layout.columns(),
            &[
                "study temp[°C]",
                "study RH[%]",
                "study CO2[ppm]",
                "living temp[°C]",
                "living RH[%]",
                "solar[W]",
                "aircon[W]",
                "kitchen[W]",
            ]
        );
    }

    #[test]
    fn test_write_rows_in_local_time() {
        let mut buf = Vec::new();
        let rows = write_csv(&mut buf, &samples(), &DayClock::new(9 * 60)).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("time,study temp[°C]"));
        assert_eq!(lines[1], "2024/01/01 00:00,,,,21.5,45,900,100,300");
        assert_eq!(lines[2], "2024/01/01 00:01,20,40,650,,,,,");
    }

    #[test]
    fn test_time_label_utc() {
        assert_eq!(local_time_label(0, &DayClock::new(0)), "1970/01/01 00:00");
        assert_eq!(local_time_label(59, &DayClock::new(-60)), "1969/12/31 23:00");
    }
}
