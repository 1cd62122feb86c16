// Aggregation engine: per-device series, min/max tables and power-flow summary
//
// Energy totals are sums of per-minute watt readings (watt-minutes).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::constants::*;
use crate::core::format::{AggregatePower, Sample};
use crate::core::psychro::{calc_vh, in_comfort_zone};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateOptions {
    /// Device key of the whole-house power monitor.
    pub aggregate_key: String,
    /// Reserve the first power slot for generation even when none is reported.
    pub fix_top_generation: bool,
    pub top_generation_name: String,
    /// Only chart climate sensors that carry a sequence number (BLE meters).
    pub sequenced_climate_only: bool,
    /// Leading climate slots (e.g. outdoor sensors) left out of window-wide min/max.
    pub skip_leading_climate: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            aggregate_key: AGGREGATE_KEY.to_string(),
            fix_top_generation: true,
            top_generation_name: TOP_GENERATION_NAME.to_string(),
            sequenced_climate_only: false,
            skip_leading_climate: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    fn update(slot: &mut Option<MinMax>, v: f64) {
        match slot {
            Some(mm) => {
                mm.min = mm.min.min(v);
                mm.max = mm.max.max(v);
            }
            None => *slot = Some(MinMax { min: v, max: v }),
        }
    }

    fn merge<'a>(ranges: impl Iterator<Item = &'a Option<MinMax>>) -> Option<MinMax> {
        ranges.flatten().fold(None, |acc, mm| match acc {
            None => Some(*mm),
            Some(a) => Some(MinMax {
                min: a.min.min(mm.min),
                max: a.max.max(mm.max),
            }),
        })
    }
}

/// One stacked power record; every slot is present (zero when unreported).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerPoint {
    pub ut: i64,
    pub pwr: Vec<f64>,
    pub plg: Vec<f64>,
}

/// Climate slots are sparse: `None` means the sensor did not report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimatePoint {
    pub ut: i64,
    pub dc: Vec<Option<f64>>,
    pub rh: Vec<Option<f64>>,
    pub vh: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Co2Point {
    pub ut: i64,
    pub co2: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClimateStats {
    pub dc: Vec<Option<MinMax>>,
    pub rh: Vec<Option<MinMax>>,
    pub vh: Vec<Option<MinMax>>,
    pub co2: Vec<Option<MinMax>>,
    pub dc_all: Option<MinMax>,
    pub rh_all: Option<MinMax>,
    pub vh_all: Option<MinMax>,
    pub co2_all: Option<MinMax>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnergyTotals {
    /// Per power slot, magnitude of generation or consumption.
    pub circuit_use: Vec<f64>,
    /// Per power slot, share of purchased energy (zero for generation slots).
    pub circuit_purchase: Vec<f64>,
    pub plug_use: Vec<f64>,
    pub generation: f64,
    pub consumption: f64,
    pub self_consumed: f64,
    pub self_sufficiency: Option<f64>,
    pub self_consumption: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowDirection {
    /// Generation covers consumption; surplus is sold.
    Export,
    /// Consumption exceeds generation; shortfall is bought.
    Import,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitShare {
    pub name: String,
    pub watts: f64,
    pub slot: usize,
}

/// At-a-glance summary from the newest power-monitor reading in the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentFlow {
    pub ut: i64,
    pub generation: f64,
    pub consumption: f64,
    /// Generation minus consumption; non-negative means net export.
    pub balance: f64,
    pub direction: FlowDirection,
    pub self_sufficiency: Option<f64>,
    pub self_consumption: Option<f64>,
    pub circuits: Vec<CircuitShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsyPoint {
    pub slot: usize,
    pub name: String,
    pub dc: f64,
    pub rh: f64,
    pub vh: f64,
    pub comfortable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Co2Level {
    Normal,
    Caution,
    Warning,
}

impl Co2Level {
    pub fn of(ppm: f64) -> Self {
        if ppm > CO2_WARNING {
            Co2Level::Warning
        } else if ppm > CO2_CAUTION {
            Co2Level::Caution
        } else {
            Co2Level::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatestCo2 {
    pub ppm: f64,
    pub level: Co2Level,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub power_names: Vec<String>,
    pub plug_names: Vec<String>,
    pub climate_names: Vec<String>,
    pub co2_names: Vec<String>,

    pub power: Vec<PowerPoint>,
    pub climate: Vec<ClimatePoint>,
    pub co2: Vec<Co2Point>,

    pub power_range: MinMax,
    pub climate_stats: ClimateStats,
    pub totals: EnergyTotals,

    pub current: Option<CurrentFlow>,
    pub psy_points: Vec<PsyPoint>,
    pub latest_co2: Option<LatestCo2>,
    pub first_aggregate_ut: Option<i64>,
    pub last_aggregate_ut: Option<i64>,
    pub last_climate_ut: Option<i64>,
    /// Covered time, rounded to 0.1h.
    pub hours: f64,
}

/// Insertion-ordered accumulator keyed by device name.
struct Tally<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Tally<V> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn entry(&mut self, name: &str, init: impl FnOnce() -> V) -> &mut V {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.entries.push((name.to_string(), init()));
                self.index.insert(name.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[i].1
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Stable sort, then hand out slot numbers in sorted order.
    fn into_slots(mut self, cmp: impl Fn(&V, &V) -> Ordering) -> Slots {
        self.entries.sort_by(|a, b| cmp(&a.1, &b.1));
        let names: Vec<String> = self.entries.into_iter().map(|(n, _)| n).collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Slots { names, index }
    }
}

struct Slots {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Slots {
    fn get(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}

/// Generation (negative sums) first, most negative leading; then consumption
/// with the largest sum first.
pub fn power_order(a: f64, b: f64) -> Ordering {
    match (a < 0.0, b < 0.0) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => a.total_cmp(&b),
        (false, false) => b.total_cmp(&a),
    }
}

fn aggregate_of<'a>(sample: &'a Sample, key: &str) -> Option<&'a AggregatePower> {
    sample.devices.get(key).and_then(|e| e.dat.aggregate())
}

/// Derive every presentation structure for `samples`. `None` for an empty view.
pub fn aggregate(samples: &[Sample], options: &AggregateOptions) -> Option<Aggregation> {
    let last_sample = samples.last()?;
    let key = options.aggregate_key.as_str();

    // Pass 1: discover devices and their sort weights
    let mut pwr_tally: Tally<f64> = Tally::new();
    let mut plg_tally: Tally<f64> = Tally::new();
    let mut trv_tally: Tally<String> = Tally::new();
    let mut co2_tally: Tally<String> = Tally::new();
    let mut first_aggregate_ut = None;
    let mut last_aggregate: Option<(i64, &AggregatePower)> = None;

    for sample in samples {
        if let Some(entry) = sample.devices.get(key) {
            if let Some(agg) = entry.dat.aggregate() {
                first_aggregate_ut.get_or_insert(entry.ut);
                last_aggregate = Some((entry.ut, agg));

                let signed = agg
                    .gen
                    .iter()
                    .map(|(w, n)| (-w, n))
                    .chain(agg.consumption.iter().map(|(w, n)| (*w, n)));
                for (w, name) in signed {
                    if w != 0.0 {
                        *pwr_tally.entry(name, || 0.0) += w;
                    }
                }
            }
        }

        for (id, entry) in &sample.devices {
            if let Some(plug) = entry.dat.plug() {
                let w = plug.watts();
                if w != 0.0 {
                    *plg_tally.entry(&plug.name, || 0.0) += w;
                }
            }
            if let Some(c) = entry.dat.climate() {
                if !options.sequenced_climate_only || c.sequenced {
                    trv_tally.entry(c.name, || id.clone());
                }
            }
            if let Some((name, _)) = entry.dat.co2() {
                co2_tally.entry(name, || id.clone());
            }
        }
    }

    if options.fix_top_generation
        && !pwr_tally.entries.iter().any(|(_, w)| *w < 0.0)
        && !pwr_tally.contains(&options.top_generation_name)
    {
        pwr_tally.entry(&options.top_generation_name, || -1.0);
    }

    let pwr = pwr_tally.into_slots(|a, b| power_order(*a, *b));
    let plg = plg_tally.into_slots(|a, b| b.total_cmp(a));
    let trv = trv_tally.into_slots(|a, b| a.cmp(b));
    let co2 = co2_tally.into_slots(|a, b| a.cmp(b));

    // Pass 2: build the series and statistics
    let mut power = Vec::with_capacity(samples.len());
    let mut climate = Vec::with_capacity(samples.len());
    let mut co2_series = Vec::with_capacity(samples.len());
    let mut totals = EnergyTotals {
        circuit_use: vec![0.0; pwr.len()],
        circuit_purchase: vec![0.0; pwr.len()],
        plug_use: vec![0.0; plg.len()],
        ..Default::default()
    };
    let mut stats = ClimateStats {
        dc: vec![None; trv.len()],
        rh: vec![None; trv.len()],
        vh: vec![None; trv.len()],
        co2: vec![None; co2.len()],
        ..Default::default()
    };
    let mut power_range = MinMax { min: 0.0, max: 0.0 };

    for sample in samples {
        let mut pc = PowerPoint {
            ut: sample.timestamp,
            pwr: vec![0.0; pwr.len()],
            plg: vec![0.0; plg.len()],
        };

        if let Some(agg) = aggregate_of(sample, key) {
            for (w, name) in &agg.gen {
                if let Some(i) = pwr.get(name) {
                    pc.pwr[i] = -w;
                    totals.circuit_use[i] += w;
                }
            }
            for (w, name) in &agg.consumption {
                if let Some(i) = pwr.get(name) {
                    pc.pwr[i] = *w;
                    totals.circuit_use[i] += w;
                }
            }

            let gen_all = agg.generation_total();
            let use_all = agg.consumption_total();
            let purchase_ratio = if use_all > gen_all {
                (use_all - gen_all) / use_all
            } else {
                0.0
            };
            for (w, name) in &agg.consumption {
                if let Some(i) = pwr.get(name) {
                    totals.circuit_purchase[i] += w * purchase_ratio;
                }
            }

            totals.generation += gen_all;
            totals.consumption += use_all;
            totals.self_consumed += gen_all.min(use_all);

            power_range.min = power_range.min.min(-gen_all);
            power_range.max = power_range.max.max(use_all - gen_all);
        }

        let mut tc = ClimatePoint {
            ut: sample.timestamp,
            dc: vec![None; trv.len()],
            rh: vec![None; trv.len()],
            vh: vec![None; trv.len()],
        };
        let mut cc = Co2Point {
            ut: sample.timestamp,
            co2: vec![None; co2.len()],
        };

        for entry in sample.devices.values() {
            if let Some(c) = entry.dat.climate() {
                if let Some(n) = trv.get(c.name) {
                    let vh = calc_vh(c.celsius, c.rh);
                    tc.dc[n] = Some(c.celsius);
                    tc.rh[n] = Some(c.rh);
                    tc.vh[n] = Some(vh);
                    MinMax::update(&mut stats.dc[n], c.celsius);
                    MinMax::update(&mut stats.rh[n], c.rh);
                    MinMax::update(&mut stats.vh[n], vh);
                }
            }
            if let Some((name, ppm)) = entry.dat.co2() {
                if let Some(n) = co2.get(name) {
                    cc.co2[n] = Some(ppm);
                    MinMax::update(&mut stats.co2[n], ppm);
                }
            }
            if let Some(plug) = entry.dat.plug() {
                if let Some(n) = plg.get(&plug.name) {
                    let w = plug.watts();
                    pc.plg[n] = w;
                    totals.plug_use[n] += w;
                    power_range.min = power_range.min.min(w);
                    power_range.max = power_range.max.max(w);
                }
            }
        }

        power.push(pc);
        climate.push(tc);
        co2_series.push(cc);
    }

    let skip = options.skip_leading_climate;
    stats.dc_all = MinMax::merge(stats.dc.iter().skip(skip));
    stats.rh_all = MinMax::merge(stats.rh.iter().skip(skip));
    stats.vh_all = MinMax::merge(stats.vh.iter().skip(skip));
    stats.co2_all = MinMax::merge(stats.co2.iter().skip(skip));

    totals.self_sufficiency = ratio(totals.self_consumed, totals.consumption);
    totals.self_consumption = ratio(totals.self_consumed, totals.generation);

    let current = last_aggregate.map(|(ut, agg)| current_flow(ut, agg, &pwr));

    // Newest climate plot and CO2 level come from the last sample unconditionally
    let mut psy_points = Vec::new();
    let mut latest_co2 = None;
    let mut last_climate_ut = None;
    for entry in last_sample.devices.values() {
        if let Some(c) = entry.dat.climate() {
            if let Some(slot) = trv.get(c.name) {
                psy_points.push(PsyPoint {
                    slot,
                    name: c.name.to_string(),
                    dc: c.celsius,
                    rh: c.rh,
                    vh: calc_vh(c.celsius, c.rh),
                    comfortable: in_comfort_zone(c.celsius, c.rh),
                });
                last_climate_ut = last_climate_ut.max(Some(entry.ut));
            }
        }
        if let Some((_, ppm)) = entry.dat.co2() {
            latest_co2 = Some(LatestCo2 {
                ppm,
                level: Co2Level::of(ppm),
            });
        }
    }
    psy_points.sort_by_key(|p| p.slot);

    Some(Aggregation {
        power_names: pwr.names,
        plug_names: plg.names,
        climate_names: trv.names,
        co2_names: co2.names,
        power,
        climate,
        co2: co2_series,
        power_range,
        climate_stats: stats,
        totals,
        current,
        psy_points,
        latest_co2,
        first_aggregate_ut,
        last_aggregate_ut: last_aggregate.map(|(ut, _)| ut),
        last_climate_ut,
        hours: (samples.len() as f64 / 6.0).round() / 10.0,
    })
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    (den > 0.0).then(|| num / den)
}

fn current_flow(ut: i64, agg: &AggregatePower, pwr: &Slots) -> CurrentFlow {
    let generation = agg.generation_total();
    let consumption = agg.consumption_total();
    let direction = if consumption == 0.0 {
        FlowDirection::Idle
    } else if consumption <= generation {
        FlowDirection::Export
    } else {
        FlowDirection::Import
    };
    let local = generation.min(consumption);

    let circuits = agg
        .consumption
        .iter()
        .filter_map(|(w, name)| {
            pwr.get(name).map(|slot| CircuitShare {
                name: name.clone(),
                watts: *w,
                slot,
            })
        })
        .collect();

    CurrentFlow {
        ut,
        generation,
        consumption,
        balance: generation - consumption,
        direction,
        self_sufficiency: ratio(local, consumption),
        self_consumption: ratio(local, generation),
        circuits,
    }
}
