//! Daily charging-window planners.
//!
//! Both variants rate each quantized step by its predicted PV overproduction
//! `pv - (el_baseline + min_pv)`. A step missing from either forecast table,
//! or with negative overproduction, is never usable for charging.

use tracing::{debug, info};

use crate::forecast::ForecastRepository;

use super::time::TimeKey;
use super::types::{Season, TesMode};

/// A fixed-span charging window chosen by [`FixedSpanPlanner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeWindow {
    pub start: TimeKey,
    pub span_steps: i64,
    pub mode: Season,
}

impl ChargeWindow {
    /// Inclusive at both ends: `start <= key <= start + span`.
    pub fn contains(&self, key: TimeKey) -> bool {
        key >= self.start && key <= self.start.offset(self.span_steps)
    }
}

/// Per-step charge decisions over the prediction horizon, from [`GreedyPlanner`].
///
/// Entry `i` is the decision for `start + i`; keys outside the horizon read as
/// `false`. Rebuilt wholesale at every planning cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeSchedule {
    pub start: TimeKey,
    pub mode: Season,
    pub enabled: Vec<bool>,
}

impl ChargeSchedule {
    pub fn is_enabled(&self, key: TimeKey) -> bool {
        usize::try_from(key.steps_since(self.start))
            .ok()
            .and_then(|idx| self.enabled.get(idx).copied())
            .unwrap_or(false)
    }

    /// First key after the horizon covered by this schedule.
    pub fn end(&self) -> TimeKey {
        self.start.offset(self.enabled.len() as i64)
    }

    /// Number of enabled steps.
    pub fn enabled_steps(&self) -> usize {
        self.enabled.iter().filter(|on| **on).count()
    }

    /// Contiguous enabled runs as half-open `[start, end)` key ranges.
    pub fn windows(&self) -> Vec<(TimeKey, TimeKey)> {
        let mut runs = Vec::new();
        let mut run_start = None;
        for (i, on) in self.enabled.iter().enumerate() {
            let key = self.start.offset(i as i64);
            match (on, run_start) {
                (true, None) => run_start = Some(key),
                (false, Some(s)) => {
                    runs.push((s, key));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = run_start {
            runs.push((s, self.end()));
        }
        runs
    }
}

/// One row of the plan trace.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTraceRow {
    pub time_h: f64,
    pub enabled: bool,
    pub pv_over_pred_w: Option<f64>,
    pub pv_pred_w: Option<f64>,
    pub el_pred_w: Option<f64>,
}

/// The planner's output for one day.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ChargePlan {
    /// Do not charge until the next decision.
    #[default]
    NoCharge,
    Window(ChargeWindow),
    Schedule(ChargeSchedule),
}

impl ChargePlan {
    /// Mode the plan charges in, `Off` for [`ChargePlan::NoCharge`].
    pub fn mode(&self) -> TesMode {
        match self {
            ChargePlan::NoCharge => TesMode::Off,
            ChargePlan::Window(w) => w.mode.into(),
            ChargePlan::Schedule(s) => s.mode.into(),
        }
    }

    /// Whether the plan allows charging at `key`.
    pub fn allows(&self, key: TimeKey) -> bool {
        match self {
            ChargePlan::NoCharge => false,
            ChargePlan::Window(w) => w.contains(key),
            ChargePlan::Schedule(s) => s.is_enabled(key),
        }
    }

    /// Start of the earliest charging opportunity, if any.
    pub fn start(&self) -> Option<TimeKey> {
        match self {
            ChargePlan::NoCharge => None,
            ChargePlan::Window(w) => Some(w.start),
            ChargePlan::Schedule(s) => s.windows().first().map(|(start, _)| *start),
        }
    }

    /// Plan trace rows with the forecast values behind each decision.
    ///
    /// A schedule is traced over its own horizon; a window or no-charge plan
    /// over `horizon_steps` from `now`. Overproduction is clipped at zero.
    pub fn trace(
        &self,
        now: TimeKey,
        horizon_steps: i64,
        forecasts: &ForecastRepository,
        min_pv_w: f64,
    ) -> Vec<PlanTraceRow> {
        let (start, len) = match self {
            ChargePlan::Schedule(s) => (s.start, s.enabled.len() as i64),
            _ => (now, horizon_steps.max(0)),
        };
        (0..len)
            .map(|i| {
                let key = start.offset(i);
                PlanTraceRow {
                    time_h: key.hours(),
                    enabled: self.allows(key),
                    pv_over_pred_w: forecasts
                        .overproduction(key, min_pv_w)
                        .map(|v| v.max(0.0)),
                    pv_pred_w: forecasts.pv.get(key),
                    el_pred_w: forecasts.el_baseline.get(key),
                }
            })
            .collect()
    }
}

/// Daily planning strategy used by the control loop.
pub trait Planner {
    /// Computes the charge plan for the horizon starting at `now`.
    fn plan(&self, now: TimeKey, season: Season, forecasts: &ForecastRepository) -> ChargePlan;

    /// SOC the TES should be charged to, given the day's demand metric.
    fn target_soc(&self, season: Season, demand_metric: f64) -> f64;

    /// Prediction horizon in quantization steps.
    fn horizon_steps(&self) -> i64;

    /// Minimum PV production reserved for other loads (W).
    fn min_pv_w(&self) -> f64;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Fixed-span best window.
///
/// Scans every start in the horizon and keeps the window whose summed
/// overproduction is strictly largest, so ties go to the earliest start.
#[derive(Debug, Clone)]
pub struct FixedSpanPlanner {
    pub horizon_steps: i64,
    pub span_steps: i64,
    pub min_pv_w: f64,
    pub max_soc: f64,
    pub min_soc: f64,
}

impl FixedSpanPlanner {
    /// Summed overproduction of the window starting at `start`, `None` if any
    /// step in it is missing or negative.
    pub fn window_sum(&self, start: TimeKey, forecasts: &ForecastRepository) -> Option<f64> {
        let mut sum = 0.0;
        for i in 0..self.span_steps {
            let key = start.offset(i);
            match forecasts.overproduction(key, self.min_pv_w) {
                None => {
                    debug!(%key, "forecast key missing, window discarded");
                    return None;
                }
                Some(over) if over < 0.0 => return None,
                Some(over) => sum += over,
            }
        }
        Some(sum)
    }
}

impl Planner for FixedSpanPlanner {
    fn plan(&self, now: TimeKey, season: Season, forecasts: &ForecastRepository) -> ChargePlan {
        let mut best: Option<(TimeKey, f64)> = None;
        for offset in 0..self.horizon_steps {
            let start = now.offset(offset);
            let Some(sum) = self.window_sum(start, forecasts) else {
                continue;
            };
            if sum > best.map_or(0.0, |(_, s)| s) {
                best = Some((start, sum));
            }
        }

        match best {
            Some((start, sum)) => {
                info!(%now, %start, overproduction_sum = sum, %season, "selected charge window");
                ChargePlan::Window(ChargeWindow {
                    start,
                    span_steps: self.span_steps,
                    mode: season,
                })
            }
            None => {
                info!(%now, "no viable charge window, not charging today");
                ChargePlan::NoCharge
            }
        }
    }

    fn target_soc(&self, season: Season, _demand_metric: f64) -> f64 {
        match season {
            Season::Heat => self.max_soc,
            Season::Cool => self.min_soc,
        }
    }

    fn horizon_steps(&self) -> i64 {
        self.horizon_steps
    }

    fn min_pv_w(&self) -> f64 {
        self.min_pv_w
    }

    fn name(&self) -> &'static str {
        "fixed_span"
    }
}

/// Greedy segment covering with a demand-tracking SOC target.
///
/// Walks the horizon left to right, growing a run while overproduction stays
/// available. Runs at least `min_span_steps` long are enabled; the step that
/// terminates a run is always disabled and the walk resumes after it.
#[derive(Debug, Clone)]
pub struct GreedyPlanner {
    pub horizon_steps: i64,
    pub min_span_steps: i64,
    pub min_pv_w: f64,
    /// Hard end of the simulation; the horizon never extends past it.
    pub simulation_end: Option<TimeKey>,
    pub max_soc: f64,
    pub min_soc: f64,
    /// Usable capacity band `MAX_Q_TES - MIN_Q_TES` (kWh).
    pub q_band: f64,
}

impl GreedyPlanner {
    fn horizon_end(&self, now: TimeKey) -> TimeKey {
        let end = now.offset(self.horizon_steps);
        match self.simulation_end {
            Some(sim_end) => end.min(sim_end),
            None => end,
        }
    }

    fn usable(&self, key: TimeKey, forecasts: &ForecastRepository) -> bool {
        match forecasts.overproduction(key, self.min_pv_w) {
            Some(over) => over >= 0.0,
            None => {
                debug!(%key, "forecast key missing, run truncated");
                false
            }
        }
    }
}

impl Planner for GreedyPlanner {
    fn plan(&self, now: TimeKey, season: Season, forecasts: &ForecastRepository) -> ChargePlan {
        let len = usize::try_from(self.horizon_end(now).steps_since(now)).unwrap_or(0);
        let min_run = usize::try_from(self.min_span_steps).unwrap_or(0);
        let mut enabled = vec![false; len];

        let mut pos = 0;
        while pos < len {
            let mut run = 0;
            while pos + run < len && self.usable(now.offset((pos + run) as i64), forecasts) {
                run += 1;
            }
            if run > 0 && run >= min_run {
                enabled[pos..pos + run].fill(true);
            }
            pos += run + 1;
        }

        let schedule = ChargeSchedule {
            start: now,
            mode: season,
            enabled,
        };
        if schedule.enabled_steps() == 0 {
            info!(%now, %season, "no viable charge window, not charging today");
        } else {
            info!(
                %now,
                %season,
                windows = schedule.windows().len(),
                enabled_steps = schedule.enabled_steps(),
                "built charge schedule"
            );
        }
        ChargePlan::Schedule(schedule)
    }

    fn target_soc(&self, _season: Season, demand_metric: f64) -> f64 {
        let raw = (1.0 + demand_metric / self.q_band) / 2.0;
        raw.max(self.min_soc).min(self.max_soc)
    }

    fn horizon_steps(&self) -> i64 {
        self.horizon_steps
    }

    fn min_pv_w(&self) -> f64 {
        self.min_pv_w
    }

    fn name(&self) -> &'static str {
        "greedy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{DemandTable, ForecastTable};
    use approx::assert_relative_eq;

    /// Repository over `[0, hours)` with zero baseline and the given PV curve.
    fn repo_from(hours: i64, pv: impl Fn(TimeKey) -> f64) -> ForecastRepository {
        let keys: Vec<TimeKey> = (0..hours * 10).map(TimeKey::new).collect();
        ForecastRepository::new(
            ForecastTable::from_keyed(keys.iter().map(|&k| (k, pv(k)))),
            ForecastTable::from_keyed(keys.iter().map(|&k| (k, 0.0))),
            DemandTable::default(),
        )
    }

    fn fixed(span_h: i64) -> FixedSpanPlanner {
        FixedSpanPlanner {
            horizon_steps: 240,
            span_steps: span_h * 10,
            min_pv_w: 0.0,
            max_soc: 1.0,
            min_soc: 0.0,
        }
    }

    fn greedy(min_span_steps: i64) -> GreedyPlanner {
        GreedyPlanner {
            horizon_steps: 240,
            min_span_steps,
            min_pv_w: 0.0,
            simulation_end: None,
            max_soc: 1.0,
            min_soc: 0.0,
            q_band: 129.0,
        }
    }

    #[test]
    fn fixed_span_picks_the_only_positive_span() {
        // 5 W of overproduction for hours 10..14, negative elsewhere
        let repo = repo_from(48, |k| if (100..140).contains(&k.index()) { 5.0 } else { -1.0 });
        let plan = fixed(4).plan(TimeKey::from_hours(6.0), Season::Heat, &repo);
        match plan {
            ChargePlan::Window(w) => {
                assert_eq!(w.start, TimeKey::from_hours(10.0));
                assert_eq!(w.mode, Season::Heat);
            }
            other => panic!("expected a window, got {other:?}"),
        }
    }

    #[test]
    fn fixed_span_with_zero_elsewhere_selects_full_span() {
        let repo = repo_from(48, |k| if (100..140).contains(&k.index()) { 5.0 } else { 0.0 });
        let planner = fixed(4);
        let plan = planner.plan(TimeKey::from_hours(6.0), Season::Cool, &repo);
        assert_eq!(plan.start(), Some(TimeKey::from_hours(10.0)));
        assert_eq!(plan.mode(), TesMode::Cool);
        assert_relative_eq!(
            planner
                .window_sum(TimeKey::from_hours(10.0), &repo)
                .unwrap_or_default(),
            200.0
        );
    }

    #[test]
    fn fixed_span_tie_goes_to_earliest_window() {
        // Two identical 1 h plateaus separated by a negative gap
        let repo = repo_from(48, |k| {
            let i = k.index();
            if (80..90).contains(&i) || (150..160).contains(&i) {
                3.0
            } else {
                -1.0
            }
        });
        let plan = fixed(1).plan(TimeKey::from_hours(6.0), Season::Heat, &repo);
        assert_eq!(plan.start(), Some(TimeKey::from_hours(8.0)));
    }

    #[test]
    fn fixed_span_missing_key_discards_window() {
        let mut pairs: Vec<(TimeKey, f64)> = (0..480)
            .map(|i| (TimeKey::new(i), if (100..140).contains(&i) { 5.0 } else { -1.0 }))
            .collect();
        pairs.retain(|(k, _)| k.index() != 120);
        let repo = ForecastRepository::new(
            ForecastTable::from_keyed(pairs),
            ForecastTable::from_keyed((0..480).map(|i| (TimeKey::new(i), 0.0))),
            DemandTable::default(),
        );
        let planner = fixed(4);
        assert_eq!(planner.window_sum(TimeKey::from_hours(10.0), &repo), None);
        assert_eq!(
            planner.plan(TimeKey::from_hours(6.0), Season::Heat, &repo),
            ChargePlan::NoCharge
        );
    }

    #[test]
    fn fixed_span_without_overproduction_is_no_charge() {
        let repo = repo_from(48, |_| -10.0);
        assert_eq!(
            fixed(4).plan(TimeKey::from_hours(6.0), Season::Heat, &repo),
            ChargePlan::NoCharge
        );
        let zeros = repo_from(48, |_| 0.0);
        assert_eq!(
            fixed(4).plan(TimeKey::from_hours(6.0), Season::Heat, &zeros),
            ChargePlan::NoCharge
        );
    }

    #[test]
    fn fixed_span_beyond_table_is_no_charge() {
        assert_eq!(
            fixed(4).plan(TimeKey::from_hours(100.0), Season::Heat, &repo_from(24, |_| 5.0)),
            ChargePlan::NoCharge
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = ChargeWindow {
            start: TimeKey::from_hours(10.0),
            span_steps: 40,
            mode: Season::Heat,
        };
        assert!(!w.contains(TimeKey::from_hours(9.9)));
        assert!(w.contains(TimeKey::from_hours(10.0)));
        assert!(w.contains(TimeKey::from_hours(14.0)));
        assert!(!w.contains(TimeKey::from_hours(14.1)));
    }

    #[test]
    fn greedy_schedule_has_one_entry_per_step() {
        let repo = repo_from(48, |k| if k.hour_of_day() >= 9 && k.hour_of_day() < 15 { 1.0 } else { -1.0 });
        let now = TimeKey::from_hours(6.0);
        let ChargePlan::Schedule(s) = greedy(5).plan(now, Season::Heat, &repo) else {
            panic!("greedy planner must produce a schedule");
        };
        assert_eq!(s.enabled.len(), 240);
        assert_eq!(s.start, now);
        assert_eq!(s.end(), TimeKey::from_hours(30.0));
        assert_eq!(
            s.windows(),
            vec![(TimeKey::from_hours(9.0), TimeKey::from_hours(15.0))]
        );
    }

    #[test]
    fn greedy_drops_sub_minimum_runs() {
        // a 3-step run and a 6-step run; minimum is 5 steps
        let repo = repo_from(48, |k| match k.index() {
            70..73 => 2.0,
            100..106 => 2.0,
            _ => -1.0,
        });
        let plan = greedy(5).plan(TimeKey::from_hours(6.0), Season::Heat, &repo);
        let ChargePlan::Schedule(s) = plan else {
            panic!("expected schedule");
        };
        assert!(!s.is_enabled(TimeKey::new(70)));
        assert!(!s.is_enabled(TimeKey::new(72)));
        assert!(s.is_enabled(TimeKey::new(100)));
        assert!(s.is_enabled(TimeKey::new(105)));
        assert!(!s.is_enabled(TimeKey::new(106)));
        for (start, end) in s.windows() {
            assert!(end.steps_since(start) >= 5);
        }
    }

    #[test]
    fn greedy_missing_key_truncates_run_at_gap() {
        let mut pairs: Vec<(TimeKey, f64)> = (0..480).map(|i| (TimeKey::new(i), 1.0)).collect();
        pairs.retain(|(k, _)| k.index() != 80);
        let repo = ForecastRepository::new(
            ForecastTable::from_keyed(pairs),
            ForecastTable::from_keyed((0..480).map(|i| (TimeKey::new(i), 0.0))),
            DemandTable::default(),
        );
        let ChargePlan::Schedule(s) = greedy(5).plan(TimeKey::from_hours(6.0), Season::Heat, &repo)
        else {
            panic!("expected schedule");
        };
        assert!(s.is_enabled(TimeKey::new(79)));
        assert!(!s.is_enabled(TimeKey::new(80)));
        assert!(s.is_enabled(TimeKey::new(81)));
    }

    #[test]
    fn greedy_horizon_stops_at_simulation_end() {
        let repo = repo_from(48, |_| 1.0);
        let planner = GreedyPlanner {
            simulation_end: Some(TimeKey::from_hours(12.0)),
            ..greedy(5)
        };
        let ChargePlan::Schedule(s) = planner.plan(TimeKey::from_hours(6.0), Season::Cool, &repo)
        else {
            panic!("expected schedule");
        };
        assert_eq!(s.enabled.len(), 60);
        assert!(s.enabled.iter().all(|on| *on));
        assert!(!s.is_enabled(TimeKey::from_hours(12.0)));
    }

    #[test]
    fn greedy_keeps_season_mode_even_without_windows() {
        let repo = repo_from(48, |_| -1.0);
        let plan = greedy(5).plan(TimeKey::from_hours(6.0), Season::Cool, &repo);
        assert_eq!(plan.mode(), TesMode::Cool);
        assert_eq!(plan.start(), None);
        assert!(!plan.allows(TimeKey::from_hours(12.0)));
    }

    #[test]
    fn greedy_target_tracks_daily_demand() {
        let p = greedy(5);
        assert_relative_eq!(p.target_soc(Season::Heat, 0.0), 0.5);
        assert_relative_eq!(p.target_soc(Season::Heat, 64.5), 0.75);
        assert_relative_eq!(p.target_soc(Season::Cool, -64.5), 0.25);
        assert_relative_eq!(p.target_soc(Season::Heat, 1_000.0), 1.0);
        assert_relative_eq!(p.target_soc(Season::Cool, -1_000.0), 0.0);
    }

    #[test]
    fn fixed_target_is_soc_bound() {
        let p = fixed(4);
        assert_eq!(p.target_soc(Season::Heat, 0.2), 1.0);
        assert_eq!(p.target_soc(Season::Cool, 0.9), 0.0);
    }

    #[test]
    fn schedule_trace_clips_overproduction() {
        let repo = repo_from(24, |k| if k.index() < 5 { 3.0 } else { -2.0 });
        let s = ChargeSchedule {
            start: TimeKey::new(0),
            mode: Season::Heat,
            enabled: vec![true, true, true, true, true, false, false],
        };
        let rows = ChargePlan::Schedule(s).trace(TimeKey::new(0), 240, &repo, 0.0);
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].pv_over_pred_w, Some(3.0));
        assert_eq!(rows[6].pv_over_pred_w, Some(0.0));
        assert_eq!(rows[6].pv_pred_w, Some(-2.0));
        assert!(rows[4].enabled && !rows[5].enabled);
    }

    #[test]
    fn window_trace_spans_prediction_horizon() {
        let repo = repo_from(24, |_| 1.0);
        let plan = ChargePlan::Window(ChargeWindow {
            start: TimeKey::new(20),
            span_steps: 5,
            mode: Season::Heat,
        });
        let rows = plan.trace(TimeKey::new(10), 30, &repo, 0.0);
        assert_eq!(rows.len(), 30);
        assert_eq!(rows.iter().filter(|r| r.enabled).count(), 6);
        assert_eq!(rows[0].time_h, 1.0);
    }
}
