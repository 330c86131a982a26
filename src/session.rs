use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info};

use crate::alerts::{AlertCategory, AlertDraft, AlertStore};
use crate::config::{AppConfig, ConfigError};
use crate::detail::AlertDetailView;
use crate::events::{Event, EventLog, SimEvent};
use crate::generator::AlertGenerator;
use crate::map::MapView;
use crate::policy::{PolicySimulationView, Simulator};
use crate::portfolio::Portfolio;
use crate::presentation::{AlertsPanel, AudioSink, RecordingSink, Toast, ToastTray};
use crate::types::{Millis, TimerId, View};

/// What a timer belongs to. Tearing the owner down cancels the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    /// Top bar and live alerts panel, mounted for the whole session.
    Shell,
    Page(View),
}

/// Registry of armed periodic timers. A timer event whose id is no longer
/// registered is stale and is dropped without dispatch.
#[derive(Debug, Default)]
struct Timers {
    next_id: u64,
    active: HashMap<TimerId, TimerOwner>,
}

impl Timers {
    fn arm(&mut self, owner: TimerOwner) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.active.insert(id, owner);
        id
    }

    fn cancel_owned_by(&mut self, owner: TimerOwner) -> usize {
        let before = self.active.len();
        self.active.retain(|_, o| *o != owner);
        before - self.active.len()
    }

    fn is_active(&self, id: TimerId) -> bool {
        self.active.contains_key(&id)
    }
}

/// Single-threaded UI runtime. Owns every state slice; each event is
/// dispatched to completion before the next one is popped.
pub struct Session<A: AudioSink = RecordingSink> {
    queue: BinaryHeap<Reverse<SimEvent>>,
    /// Dispatched events in order. Stale timer events are not recorded.
    pub log: EventLog,
    rng: ChaCha20Rng,
    now: Millis,
    next_seq: u64,
    max_time: Option<Millis>,
    max_events: Option<usize>,
    timers: Timers,
    forced_draws: VecDeque<f64>,
    config: AppConfig,
    pub store: AlertStore,
    pub generator: AlertGenerator,
    pub toasts: ToastTray,
    pub panel: AlertsPanel,
    pub audio: A,
    pub active_view: Option<View>,
    /// Page-local state; present only while the page is mounted.
    pub map: Option<MapView>,
    pub portfolio: Option<Portfolio>,
    pub policy: Option<PolicySimulationView>,
    shell_mounted: bool,
    /// Set by `SessionEnd`. Nothing is dispatched afterwards.
    ended: bool,
}

impl Session<RecordingSink> {
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        Self::with_audio(config, RecordingSink::default())
    }
}

impl<A: AudioSink> Session<A> {
    /// Fails when the config is invalid; a zero timer period would reschedule
    /// at the same instant forever.
    pub fn with_audio(config: AppConfig, audio: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut store = AlertStore::with_capacity(config.max_alerts);
        if config.seed_alerts {
            store.seed(config.started_at);
        }
        Ok(Session {
            queue: BinaryHeap::new(),
            log: Vec::new(),
            rng: ChaCha20Rng::seed_from_u64(config.seed),
            now: Millis(0),
            next_seq: 0,
            max_time: None,
            max_events: None,
            timers: Timers::default(),
            forced_draws: VecDeque::new(),
            store,
            generator: AlertGenerator::new(config.generator_period_ms),
            toasts: ToastTray::new(config.toast_duration_ms),
            panel: AlertsPanel::new(config.sound_on),
            audio,
            active_view: None,
            map: None,
            portfolio: None,
            policy: None,
            shell_mounted: false,
            ended: false,
            config,
        })
    }

    /// Stop before dispatching anything later than `t`.
    pub fn until(mut self, t: Millis) -> Self {
        self.max_time = Some(t);
        self
    }

    /// Stop after N events (test safety valve).
    pub fn with_max_events(mut self, n: usize) -> Self {
        self.max_events = Some(n);
        self
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Schedule the bootstrap event at time zero.
    pub fn start(&mut self) {
        let landing = self.config.landing_view;
        self.schedule(Millis(0), Event::SessionStart { landing });
    }

    pub fn schedule(&mut self, at: Millis, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(SimEvent { at, seq, event }));
    }

    /// Use `draw` instead of a random value for the next generator tick.
    pub fn force_next_draw(&mut self, draw: f64) {
        self.forced_draws.push_back(draw);
    }

    /// Run until the queue drains or a stopping condition is met.
    pub fn run(&mut self) {
        let horizon = self.max_time;
        self.run_through(horizon);
    }

    /// Dispatch everything due at or before `t`, then move the clock to `t`.
    pub fn advance_to(&mut self, t: Millis) {
        self.run_through(Some(t));
        if t > self.now {
            self.now = t;
        }
    }

    fn run_through(&mut self, horizon: Option<Millis>) {
        let mut count = 0;
        loop {
            if let Some(max) = self.max_events
                && count >= max
            {
                break;
            }

            let next_at = match self.queue.peek() {
                Some(Reverse(ev)) => ev.at,
                None => break,
            };

            if let Some(h) = horizon
                && next_at > h
            {
                break;
            }

            let Some(Reverse(ev)) = self.queue.pop() else { break };
            self.now = ev.at;
            if self.ended {
                debug!(at = ev.at.0, event = ?ev.event, "event after session end dropped");
                continue;
            }
            if self.is_stale(&ev.event) {
                debug!(at = ev.at.0, event = ?ev.event, "stale timer dropped");
                continue;
            }
            self.log.push(ev.clone());
            self.dispatch(ev.event);
            count += 1;
        }
    }

    fn is_stale(&self, event: &Event) -> bool {
        match event {
            Event::GeneratorTick { timer_id } | Event::PortfolioTick { timer_id } => {
                !self.timers.is_active(*timer_id)
            }
            _ => false,
        }
    }

    /// Session time mapped onto the wall clock.
    pub fn wall_clock(&self) -> DateTime<Utc> {
        self.config.started_at + Duration::milliseconds(self.now.0 as i64)
    }

    pub fn visible_toasts(&self) -> Vec<&Toast> {
        self.toasts.visible_at(self.now)
    }

    pub fn alert_detail(&self) -> AlertDetailView {
        AlertDetailView::render(&self.store)
    }

    fn dispatch(&mut self, event: Event) {
        let now = self.now;
        match event {
            Event::SessionStart { landing } => {
                self.mount_shell();
                self.schedule(now, Event::Navigate { view: landing });
            }

            Event::SessionEnd => {
                if let Some(view) = self.active_view.take() {
                    self.unmount(view);
                }
                if self.shell_mounted {
                    self.shell_mounted = false;
                    self.timers.cancel_owned_by(TimerOwner::Shell);
                }
                self.toasts.clear();
                self.ended = true;
                info!(at = now.0, alerts = self.store.len(), "session ended");
            }

            Event::Navigate { view } => {
                if self.active_view == Some(view) {
                    return;
                }
                if let Some(current) = self.active_view.take() {
                    self.unmount(current);
                }
                self.mount(view);
            }

            Event::GeneratorTick { timer_id } => {
                let draft = match self.forced_draws.pop_front() {
                    Some(draw) => self.generator.on_tick_with_draw(draw),
                    None => self.generator.on_tick(&mut self.rng),
                };
                let category = draft.category.unwrap_or(AlertCategory::Warning);
                self.schedule(now, Event::AlertRaised { category, message: draft.message });
                self.schedule(now.offset(self.generator.period_ms), Event::GeneratorTick { timer_id });
            }

            Event::AlertRaised { category, message } => {
                let wall = self.wall_clock();
                let alert = self.store.add_alert(AlertDraft::new(category, message), wall);
                let (expires, expiry) = self.toasts.push(&alert, now);
                self.schedule(expires, expiry);
                self.panel.on_alert_added(&alert, self.store.is_panel_open(), &mut self.audio);
                info!(
                    alert = alert.id.0,
                    category = ?alert.category,
                    severity = alert.severity.label(),
                    "alert raised"
                );
            }

            Event::ToastExpired { toast_id } => {
                self.toasts.expire(toast_id);
            }

            Event::OpenPanel => self.panel.open(&mut self.store),

            Event::ClosePanel => self.store.close_panel(),

            Event::TogglePanel => {
                if self.store.is_panel_open() {
                    self.store.close_panel();
                } else {
                    self.panel.open(&mut self.store);
                }
            }

            Event::ToggleSound => self.panel.toggle_sound(),

            Event::AlertClicked { alert_id } => {
                let follow_up = self.panel.on_alert_clicked(&mut self.store, alert_id, now);
                for (at, e) in follow_up {
                    self.schedule(at, e);
                }
            }

            Event::ClearAlerts => self.panel.on_clear_all(&mut self.store),

            Event::ShapeCompleted { shape } => {
                let Some(map) = self.map.as_mut() else {
                    debug!("shape completed with no map mounted");
                    return;
                };
                map.zones.on_shape_completed(&shape, &mut self.rng);
            }

            Event::OverlaySelected { overlay } => {
                if let Some(map) = self.map.as_mut() {
                    map.overlay.select(overlay);
                }
            }

            Event::OpacityChanged { opacity } => {
                if let Some(map) = self.map.as_mut() {
                    map.overlay.set_opacity(opacity);
                }
            }

            Event::PortfolioTick { timer_id } => {
                if let Some(portfolio) = self.portfolio.as_mut() {
                    portfolio.on_tick(&mut self.rng);
                }
                self.schedule(
                    now.offset(self.config.portfolio_period_ms),
                    Event::PortfolioTick { timer_id },
                );
            }

            Event::ScenarioSelected { scenario } => {
                if let Some(policy) = self.policy.as_mut() {
                    policy.select_scenario(scenario);
                }
            }

            Event::RunSimulation => {
                if let Some(policy) = self.policy.as_mut() {
                    policy.run(&mut self.rng);
                }
            }

            Event::ResetSimulation => {
                if let Some(policy) = self.policy.as_mut() {
                    policy.reset();
                }
            }
        }
    }

    fn mount_shell(&mut self) {
        if self.shell_mounted {
            return;
        }
        self.shell_mounted = true;
        let timer_id = self.timers.arm(TimerOwner::Shell);
        let first = self.now.offset(self.generator.period_ms);
        self.schedule(first, Event::GeneratorTick { timer_id });
    }

    fn mount(&mut self, view: View) {
        info!(at = self.now.0, route = view.route(), "view mounted");
        match view {
            View::Map => {
                let c = &self.config;
                self.map = Some(MapView::new(c.map_center, c.map_zoom, c.zone_cap));
            }
            View::Portfolio => {
                let today = self.wall_clock().date_naive();
                self.portfolio = Some(Portfolio::mock(today, &mut self.rng));
                let timer_id = self.timers.arm(TimerOwner::Page(View::Portfolio));
                let first = self.now.offset(self.config.portfolio_period_ms);
                self.schedule(first, Event::PortfolioTick { timer_id });
            }
            View::PolicySimulation => {
                let simulator = Simulator::new(self.config.payout_trigger);
                let params = self.config.policy_defaults.clone();
                self.policy = Some(PolicySimulationView::new(params, simulator, &mut self.rng));
            }
            View::Dashboard | View::Alerts => {}
        }
        self.active_view = Some(view);
    }

    fn unmount(&mut self, view: View) {
        let cancelled = self.timers.cancel_owned_by(TimerOwner::Page(view));
        debug!(route = view.route(), cancelled, "view unmounted");
        match view {
            View::Map => self.map = None,
            View::Portfolio => self.portfolio = None,
            View::PolicySimulation => self.policy = None,
            View::Dashboard | View::Alerts => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::Severity;
    use crate::generator::{SUCCESS_SAMPLE, WARNING_SAMPLE};
    use crate::map::{DrawnShape, LatLng, Overlay};
    use crate::policy::WeatherScenario;
    use crate::presentation::{AudioCue, PlaybackError};

    fn started(config: AppConfig) -> Session {
        let mut session = Session::from_config(config).unwrap();
        session.start();
        session.advance_to(Millis(0));
        session
    }

    fn run_for(config: AppConfig, secs: u64) -> Session {
        let mut session = started(config);
        session.advance_to(Millis::from_secs(secs));
        session
    }

    fn count(session: &Session, pred: impl Fn(&Event) -> bool) -> usize {
        session.log.iter().filter(|e| pred(&e.event)).count()
    }

    // ── Core loop invariants ─────────────────────────────────────────────────

    #[test]
    fn log_is_time_ordered() {
        let session = run_for(AppConfig::canonical(), 120);
        let times: Vec<u64> = session.log.iter().map(|e| e.at.0).collect();
        let mut sorted = times.clone();
        sorted.sort_unstable();
        assert_eq!(times, sorted);
    }

    #[test]
    fn same_seed_produces_identical_logs() {
        let run = || serde_json::to_string(&run_for(AppConfig::canonical(), 200).log).unwrap();
        assert_eq!(run(), run());
    }

    #[test]
    fn generator_fires_every_fifteen_seconds() {
        let session = run_for(AppConfig::canonical(), 60);
        let ticks: Vec<u64> = session
            .log
            .iter()
            .filter(|e| matches!(e.event, Event::GeneratorTick { .. }))
            .map(|e| e.at.0)
            .collect();
        assert_eq!(ticks, [15_000, 30_000, 45_000, 60_000]);
    }

    #[test]
    fn store_never_exceeds_five() {
        let session = run_for(AppConfig::canonical(), 600);
        assert_eq!(session.store.len(), 5);
        assert_eq!(count(&session, |e| matches!(e, Event::AlertRaised { .. })), 40);
    }

    // ── Alerts end to end ────────────────────────────────────────────────────

    #[test]
    fn forced_warning_tick_prepends_and_toasts() {
        let mut session = started(AppConfig::canonical());
        assert_eq!(session.store.len(), 2);
        session.force_next_draw(0.9);
        session.advance_to(Millis(15_000));

        assert_eq!(session.store.len(), 3);
        let top = session.store.alerts().next().unwrap();
        assert_eq!(top.category, AlertCategory::Warning);
        assert_eq!(top.message, WARNING_SAMPLE);
        assert_eq!(top.severity, Severity::High);
        assert_eq!(top.region, "Unknown Region");

        let toasts = session.visible_toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].category, AlertCategory::Warning);
        assert_eq!(session.audio.played, [AudioCue::Warning]);
    }

    #[test]
    fn forced_success_tick() {
        let mut session = started(AppConfig::canonical());
        session.force_next_draw(0.2);
        session.advance_to(Millis(15_000));
        let top = session.store.alerts().next().unwrap();
        assert_eq!(top.message, SUCCESS_SAMPLE);
        assert_eq!(top.severity, Severity::Low);
    }

    #[test]
    fn toast_lives_exactly_four_seconds() {
        let mut session = started(AppConfig::canonical());
        session.advance_to(Millis(15_000));
        assert_eq!(session.visible_toasts().len(), 1);
        session.advance_to(Millis(18_999));
        assert_eq!(session.visible_toasts().len(), 1);
        session.advance_to(Millis(19_001));
        assert!(session.visible_toasts().is_empty());
        assert!(session.toasts.is_empty());
        assert_eq!(session.store.len(), 3, "toast expiry must not touch the store");
    }

    #[test]
    fn alert_timestamp_follows_session_clock() {
        let mut session = started(AppConfig::canonical());
        session.advance_to(Millis(15_000));
        let top = session.store.alerts().next().unwrap();
        assert_eq!(top.created_at, session.config().started_at + Duration::seconds(15));
    }

    #[test]
    fn badge_set_only_while_panel_closed() {
        let mut session = started(AppConfig::canonical());
        session.advance_to(Millis(15_000));
        assert!(session.panel.has_new_alert);

        session.schedule(Millis(16_000), Event::OpenPanel);
        session.advance_to(Millis(16_000));
        assert!(!session.panel.has_new_alert);

        session.advance_to(Millis(30_000));
        assert!(!session.panel.has_new_alert, "panel open: no badge");
    }

    #[test]
    fn muted_session_plays_nothing() {
        let mut session = started(AppConfig::canonical());
        session.schedule(Millis(1), Event::ToggleSound);
        session.advance_to(Millis(45_000));
        assert!(session.audio.played.is_empty());
        assert_eq!(session.store.len(), 5);
    }

    #[test]
    fn blocked_audio_does_not_disturb_the_feed() {
        let sink = RecordingSink { played: vec![], fail_with: Some(PlaybackError::NotAllowed) };
        let mut session = Session::with_audio(AppConfig::canonical(), sink).unwrap();
        session.start();
        session.advance_to(Millis(30_000));
        assert_eq!(session.audio.played.len(), 2);
        assert_eq!(session.store.len(), 4);
    }

    #[test]
    fn clicking_an_alert_selects_closes_and_navigates() {
        let mut session = started(AppConfig::canonical());
        let target = session.store.alerts().nth(1).unwrap().id;
        session.schedule(Millis(1_000), Event::OpenPanel);
        session.schedule(Millis(2_000), Event::AlertClicked { alert_id: target });
        session.advance_to(Millis(2_000));

        assert_eq!(session.store.selected().map(|a| a.id), Some(target));
        assert!(!session.store.is_panel_open());
        assert_eq!(session.active_view, Some(View::Alerts));
        assert!(matches!(session.alert_detail(), AlertDetailView::Detail(d) if d.alert_id == target));
    }

    #[test]
    fn clear_all_empties_store_and_detail_view() {
        let mut session = started(AppConfig::canonical());
        session.schedule(Millis(500), Event::ClearAlerts);
        session.advance_to(Millis(500));
        assert!(session.store.is_empty());
        assert_eq!(session.alert_detail(), AlertDetailView::Empty);
    }

    // ── Lifecycle and cancellation ───────────────────────────────────────────

    #[test]
    fn portfolio_timer_runs_only_while_mounted() {
        let mut session = started(AppConfig::canonical());
        session.schedule(Millis(0), Event::Navigate { view: View::Portfolio });
        session.schedule(Millis(12_000), Event::Navigate { view: View::Map });
        session.advance_to(Millis(60_000));

        let ticks: Vec<u64> = session
            .log
            .iter()
            .filter(|e| matches!(e.event, Event::PortfolioTick { .. }))
            .map(|e| e.at.0)
            .collect();
        assert_eq!(ticks, [5_000, 10_000]);
        assert!(session.portfolio.is_none());
        assert!(session.map.is_some());
    }

    #[test]
    fn remounting_portfolio_arms_a_fresh_timer() {
        let mut session = started(AppConfig::canonical());
        session.schedule(Millis(0), Event::Navigate { view: View::Portfolio });
        session.schedule(Millis(7_000), Event::Navigate { view: View::Dashboard });
        session.schedule(Millis(8_000), Event::Navigate { view: View::Portfolio });
        session.advance_to(Millis(14_000));
        let ticks: Vec<u64> = session
            .log
            .iter()
            .filter(|e| matches!(e.event, Event::PortfolioTick { .. }))
            .map(|e| e.at.0)
            .collect();
        assert_eq!(ticks, [5_000, 13_000]);
    }

    #[test]
    fn session_end_cancels_every_timer() {
        let mut session = started(AppConfig::canonical());
        session.schedule(Millis(0), Event::Navigate { view: View::Portfolio });
        session.schedule(Millis(16_000), Event::SessionEnd);
        session.run();

        let last = session.log.last().unwrap();
        assert_eq!(last.event, Event::SessionEnd, "nothing may follow SessionEnd");
        assert_eq!(last.at, Millis(16_000));
        assert_eq!(count(&session, |e| matches!(e, Event::GeneratorTick { .. })), 1);
        assert_eq!(count(&session, |e| matches!(e, Event::ToastExpired { .. })), 0);
        assert!(session.active_view.is_none());
        assert!(session.toasts.is_empty(), "shell teardown clears the tray");
        assert!(session.has_ended());
    }

    #[test]
    fn events_after_session_end_are_dropped() {
        let mut session = started(AppConfig::canonical());
        session.schedule(Millis(1_000), Event::SessionEnd);
        session.schedule(Millis(2_000), Event::Navigate { view: View::Portfolio });
        session.schedule(Millis(3_000), Event::ClearAlerts);
        // Terminates without a horizon: the late navigation arms no timer.
        session.run();

        assert_eq!(session.log.last().map(|e| &e.event), Some(&Event::SessionEnd));
        assert!(session.portfolio.is_none());
        assert!(session.active_view.is_none());
        assert_eq!(session.store.len(), 2);
        assert_eq!(count(&session, |e| matches!(e, Event::PortfolioTick { .. })), 0);
    }

    #[test]
    fn zero_timer_periods_are_rejected() {
        let generator = AppConfig { generator_period_ms: 0, ..AppConfig::canonical() };
        assert!(matches!(Session::from_config(generator), Err(ConfigError::Invalid(_))));
        let portfolio = AppConfig { portfolio_period_ms: 0, ..AppConfig::canonical() };
        assert!(matches!(Session::from_config(portfolio), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn navigating_to_same_view_is_a_no_op() {
        let mut session = started(AppConfig::canonical());
        session.schedule(Millis(0), Event::Navigate { view: View::Portfolio });
        session.schedule(Millis(3_000), Event::Navigate { view: View::Portfolio });
        session.advance_to(Millis(5_000));
        assert_eq!(count(&session, |e| matches!(e, Event::PortfolioTick { .. })), 1);
    }

    // ── Pages ────────────────────────────────────────────────────────────────

    #[test]
    fn shape_recorded_only_on_map_page() {
        let shape = DrawnShape::Circle { center: LatLng::new(-1.0, 37.0), radius_m: 1_000.0 };
        let mut session = started(AppConfig::canonical());
        session.schedule(Millis(100), Event::ShapeCompleted { shape: shape.clone() });
        session.schedule(Millis(200), Event::Navigate { view: View::Map });
        session.schedule(Millis(300), Event::ShapeCompleted { shape: shape.clone() });
        session.schedule(Millis(400), Event::ShapeCompleted { shape });
        session.schedule(Millis(500), Event::OverlaySelected { overlay: Overlay::RiskHeatmap });
        session.schedule(Millis(600), Event::OpacityChanged { opacity: 0.3 });
        session.advance_to(Millis(600));

        let map = session.map.as_ref().unwrap();
        assert_eq!(map.zones.len(), 2);
        assert!(map.zones.zones().iter().all(|z| z.risk_score <= 100));
        assert_eq!(map.overlay.overlay, Overlay::RiskHeatmap);
        assert_eq!(map.overlay.opacity(), 0.3);
    }

    #[test]
    fn policy_page_runs_simulation() {
        let mut session = started(AppConfig::canonical());
        session.schedule(Millis(0), Event::Navigate { view: View::PolicySimulation });
        session.schedule(
            Millis(1_000),
            Event::ScenarioSelected { scenario: WeatherScenario::SevereDrought },
        );
        session.schedule(Millis(2_000), Event::RunSimulation);
        session.advance_to(Millis(2_000));

        let policy = session.policy.as_ref().unwrap();
        assert!(policy.has_simulated);
        assert_eq!(policy.series.len(), 12);
        assert!(policy.metrics().payout_months > 6);

        session.schedule(Millis(3_000), Event::ResetSimulation);
        session.advance_to(Millis(3_000));
        let policy = session.policy.as_ref().unwrap();
        assert_eq!(policy.scenario, WeatherScenario::Normal);
        assert!(!policy.has_simulated);
    }

    #[test]
    fn unseeded_store_starts_empty() {
        let config = AppConfig { seed_alerts: false, ..AppConfig::canonical() };
        let session = started(config);
        assert!(session.store.is_empty());
    }

    #[test]
    fn max_events_stops_the_loop() {
        let mut session = Session::from_config(AppConfig::canonical()).unwrap().with_max_events(3);
        session.start();
        session.run();
        assert_eq!(session.log.len(), 3);
    }
}
