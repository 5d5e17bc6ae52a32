use crate::config::MonitorConfig;
use crate::seed;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use vigil_alert::engine::{AlertRule, AlertTrigger, CompareOp, RuleEngine, RuleEvent, RuleStatus};
use vigil_alert::lifecycle::AlertLifecycleManager;
use vigil_common::types::{Alert, SecurityEvent, Severity, ThreatKind, ThreatSignal};
use vigil_metrics::{MetricDef, MetricRegistry};
use vigil_notify::{Channel, NotificationDispatcher};
use vigil_threat::{ThreatDetector, ThreatOutcome};

struct MonitorInner {
    registry: MetricRegistry,
    rules: Mutex<RuleEngine>,
    alerts: AlertLifecycleManager,
    dispatcher: NotificationDispatcher,
    threats: ThreatDetector,
    /// Taken (and thereby closed) on shutdown so the dispatch worker drains
    /// and exits.
    dispatch_tx: Mutex<Option<mpsc::Sender<Alert>>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_grace: Duration,
}

/// The monitoring context: metric registry, rule engine, alert lifecycle,
/// notification dispatch, and threat detection behind one handle.
///
/// Constructed once at process start with [`Monitor::start`] and passed by
/// clone to collaborators; there are no global singletons. Metric-driven
/// alerting runs on a single periodic evaluation task, while
/// [`Monitor::push_security_event`] is safe to call inline from concurrent
/// request-handling paths.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

fn threat_severity(kind: ThreatKind) -> Severity {
    match kind {
        ThreatKind::BruteForce => Severity::Critical,
        ThreatKind::SuspiciousAccess => Severity::Critical,
        ThreatKind::RateLimit => Severity::Warning,
    }
}

fn threat_message(signal: &ThreatSignal) -> String {
    let what = match signal.kind {
        ThreatKind::BruteForce => "Brute-force login pattern",
        ThreatKind::RateLimit => "API rate abuse",
        ThreatKind::SuspiciousAccess => "Suspicious data-access pattern",
    };
    format!(
        "{}: {} events from {} within {}s",
        what, signal.evidence_count, signal.identifier, signal.window_secs
    )
}

impl Monitor {
    /// Build the context from `config` and spawn its background tasks.
    ///
    /// Must be called from within a tokio runtime. Fails when a configured
    /// notification channel cannot be constructed.
    pub fn start(config: MonitorConfig) -> anyhow::Result<Self> {
        let registry = MetricRegistry::new();
        for def in seed::default_metrics() {
            if let Err(e) = registry.register(def) {
                tracing::debug!(error = %e, "Skipping default metric");
            }
        }
        for name in [
            "notification_failures_total",
            "notification_dispatched_total",
            "active_alerts_count",
            "threat_identifiers_tracked",
        ] {
            if let Err(e) = registry.register(MetricDef::new(
                name,
                vigil_metrics::MetricKind::Gauge,
                "vigil internal",
            )) {
                tracing::debug!(error = %e, "Skipping internal metric");
            }
        }

        let mut engine = RuleEngine::new();
        let rules = if config.rules.is_empty() {
            seed::default_rules()
        } else {
            config.rules.clone()
        };
        for rule in rules {
            if let Err(e) = engine.add_rule(rule) {
                tracing::error!(error = %e, "Failed to register alert rule");
            }
        }

        let mut dispatcher = NotificationDispatcher::new(config.dispatch_timeout_secs);
        for spec in &config.channels {
            let channel = Channel::build(&spec.channel)
                .with_context(|| format!("building notification channel '{}'", spec.name))?;
            dispatcher.add_channel(&spec.name, channel, spec.min_severity, spec.enabled);
        }

        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.dispatch_queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(MonitorInner {
            registry,
            rules: Mutex::new(engine),
            alerts: AlertLifecycleManager::new(config.history_capacity),
            dispatcher,
            threats: ThreatDetector::new(&config.threat),
            dispatch_tx: Mutex::new(Some(dispatch_tx)),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        });

        let worker = tokio::spawn(dispatch_worker(Arc::clone(&inner), dispatch_rx));
        let evaluator = tokio::spawn(evaluation_loop(
            Arc::clone(&inner),
            config.evaluation_interval_secs.max(1),
            shutdown_rx,
        ));
        inner.tasks.lock().unwrap().extend([worker, evaluator]);

        tracing::info!(
            interval_secs = config.evaluation_interval_secs,
            channels = config.channels.len(),
            "Monitor started"
        );
        Ok(Self { inner })
    }

    // ── Inbound surface ──

    /// Push one metric sample. Non-blocking and infallible: writes to
    /// unknown metrics are logged no-ops inside the registry.
    pub fn push_metric(&self, name: &str, value: f64, labels: &HashMap<String, String>) {
        self.inner.registry.record(name, value, labels);
    }

    /// Feed one security event through threat detection, inline with the
    /// caller's request handling. Fails open: detection errors are logged
    /// and the event dropped, never surfaced to the caller.
    pub fn push_security_event(&self, event: &SecurityEvent) {
        if let Some(outcome) = self.inner.threats.observe(event, event.timestamp) {
            self.inner.handle_threat_outcome(outcome, event.timestamp);
        }
    }

    /// Register an additional metric definition.
    pub fn register_metric(&self, def: MetricDef) -> vigil_metrics::Result<()> {
        self.inner.registry.register(def)
    }

    pub fn add_rule(&self, rule: AlertRule) -> vigil_alert::Result<()> {
        self.inner.rules.lock().unwrap().add_rule(rule)
    }

    /// Remove a rule. Any alert still active for it is force-resolved and
    /// the resolution dispatched. Returns false when the rule is unknown.
    pub fn remove_rule(&self, name: &str) -> bool {
        let removed = self.inner.rules.lock().unwrap().remove_rule(name);
        if removed.is_some() {
            self.inner.resolve_and_dispatch(name, Utc::now());
            true
        } else {
            false
        }
    }

    pub fn set_rule_enabled(&self, name: &str, enabled: bool) -> vigil_alert::Result<()> {
        self.inner.rules.lock().unwrap().set_enabled(name, enabled)
    }

    pub fn set_rule_threshold(&self, name: &str, threshold: f64) -> vigil_alert::Result<()> {
        self.inner.rules.lock().unwrap().set_threshold(name, threshold)
    }

    pub fn set_rule_condition(&self, name: &str, condition: CompareOp) -> vigil_alert::Result<()> {
        self.inner.rules.lock().unwrap().set_condition(name, condition)
    }

    pub fn enable_channel(&self, name: &str) -> bool {
        self.inner.dispatcher.enable_channel(name)
    }

    pub fn disable_channel(&self, name: &str) -> bool {
        self.inner.dispatcher.disable_channel(name)
    }

    // ── Outbound surface ──

    pub fn get_active_alerts(&self) -> Vec<Alert> {
        self.inner.alerts.list_active()
    }

    pub fn get_alert_history(&self, limit: usize) -> Vec<Alert> {
        self.inner.alerts.list_history(limit)
    }

    pub fn get_rule_status(&self) -> HashMap<String, RuleStatus> {
        self.inner.rules.lock().unwrap().rule_status()
    }

    /// Silence an active alert for `duration_secs`. The silence auto-reverts
    /// on the evaluation tick after the deadline passes, unless the alert
    /// resolves naturally first.
    pub fn silence_alert(
        &self,
        rule_name: &str,
        duration_secs: u64,
    ) -> vigil_alert::Result<DateTime<Utc>> {
        self.inner.alerts.silence(rule_name, duration_secs, Utc::now())
    }

    pub fn metrics(&self) -> &MetricRegistry {
        &self.inner.registry
    }

    pub fn notification_failures_total(&self) -> u64 {
        self.inner.dispatcher.failures_total()
    }

    /// Run one evaluation cycle at `now`: snapshot the registry, evaluate
    /// every rule, apply lifecycle transitions, expire silences, and sweep
    /// threat windows. The periodic task calls this each tick; tests drive
    /// it directly with a synthetic clock.
    pub fn evaluate_once(&self, now: DateTime<Utc>) {
        self.inner.evaluate_once(now);
    }

    /// Stop the background tasks, letting in-flight notification dispatch
    /// finish within the configured grace period before aborting it.
    pub async fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(true);
        // Closing the queue lets the worker drain what is already enqueued.
        drop(self.inner.dispatch_tx.lock().unwrap().take());

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inner.tasks.lock().unwrap());
        for mut task in tasks {
            if tokio::time::timeout(self.inner.shutdown_grace, &mut task)
                .await
                .is_err()
            {
                tracing::warn!("Background task did not stop within grace period, aborting");
                task.abort();
            }
        }
        tracing::info!("Monitor stopped");
    }
}

impl MonitorInner {
    fn evaluate_once(&self, now: DateTime<Utc>) {
        let samples = self.registry.snapshot();

        let events: Vec<RuleEvent> = {
            let mut engine = self.rules.lock().unwrap();
            samples
                .iter()
                .flat_map(|sample| engine.evaluate(sample, now))
                .collect()
        };

        for event in events {
            match event {
                RuleEvent::Triggered(trigger) => self.trigger_and_dispatch(trigger, now),
                RuleEvent::Cleared { rule_name } => self.resolve_and_dispatch(&rule_name, now),
            }
        }

        for rule in self.alerts.expire_silences(now) {
            tracing::debug!(rule = %rule, "Alert eligible for notification again");
        }

        for outcome in self.threats.sweep(now) {
            self.handle_threat_outcome(outcome, now);
        }

        let none = HashMap::new();
        self.registry
            .set("notification_failures_total", self.dispatcher.failures_total() as f64, &none);
        self.registry.set(
            "notification_dispatched_total",
            self.dispatcher.dispatched_total() as f64,
            &none,
        );
        self.registry
            .set("active_alerts_count", self.alerts.active_count() as f64, &none);
        self.registry.set(
            "threat_identifiers_tracked",
            self.threats.tracked_identifiers() as f64,
            &none,
        );
    }

    fn trigger_and_dispatch(&self, trigger: AlertTrigger, now: DateTime<Utc>) {
        match self.alerts.trigger(trigger, now) {
            Ok(alert) => self.enqueue_dispatch(alert),
            Err(vigil_alert::AlertError::AlreadyActive(rule)) => {
                tracing::debug!(rule = %rule, "Trigger suppressed, alert already active");
            }
            Err(e) => {
                tracing::error!(error = %e, "Unexpected trigger failure");
            }
        }
    }

    fn resolve_and_dispatch(&self, rule_name: &str, now: DateTime<Utc>) {
        if let Some(alert) = self.alerts.resolve(rule_name, now) {
            self.enqueue_dispatch(alert);
        }
    }

    fn handle_threat_outcome(&self, outcome: ThreatOutcome, now: DateTime<Utc>) {
        match outcome {
            ThreatOutcome::Raised(signal) => {
                let mut labels = HashMap::new();
                labels.insert("identifier".to_string(), signal.identifier.clone());
                labels.insert("threat_kind".to_string(), signal.kind.as_str().to_string());
                let trigger = AlertTrigger {
                    rule_name: signal.rule_name(),
                    message: threat_message(&signal),
                    severity: threat_severity(signal.kind),
                    value: signal.evidence_count as f64,
                    labels,
                    annotations: HashMap::new(),
                };
                self.trigger_and_dispatch(trigger, now);
            }
            ThreatOutcome::Cleared { kind, identifier } => {
                self.resolve_and_dispatch(&kind.rule_name(&identifier), now);
            }
        }
    }

    fn enqueue_dispatch(&self, alert: Alert) {
        let tx = self.dispatch_tx.lock().unwrap().clone();
        match tx {
            Some(tx) => {
                if let Err(e) = tx.try_send(alert) {
                    tracing::warn!(error = %e, "Dispatch queue unavailable, dropping notification");
                }
            }
            None => {
                tracing::warn!("Monitor shutting down, dropping notification");
            }
        }
    }
}

async fn dispatch_worker(inner: Arc<MonitorInner>, mut rx: mpsc::Receiver<Alert>) {
    while let Some(alert) = rx.recv().await {
        inner.dispatcher.dispatch(&alert).await;
    }
    tracing::debug!("Dispatch worker stopped");
}

async fn evaluation_loop(
    inner: Arc<MonitorInner>,
    interval_secs: u64,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut tick = interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                inner.evaluate_once(Utc::now());
            }
            _ = shutdown_rx.changed() => {
                tracing::debug!("Evaluation loop stopped");
                return;
            }
        }
    }
}
