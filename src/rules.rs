//! Threshold rules over a feed snapshot.
//!
//! Three independent categories (supplies, Jet-A, avgas). Each one always
//! produces exactly one event per evaluation, matches or not, and a row that
//! fails one rule is still considered by the others.

use tracing::info;

use crate::config::Thresholds;
use crate::feed::{FboRecord, FeedSnapshot};
use crate::notification::NotificationEvent;
use crate::utils::table::{format_quantity, two_column_table};

pub const SUPPLY_TITLE: &str = "FSE FBO Update";
pub const SUPPLY_WARNING_HEADING: &str = "Airports with supply warnings:";
pub const NO_SUPPLY_WARNINGS: &str = "No Airport Supply Warnings";
pub const JET_A_ORDERS_TITLE: &str = "Airports requiring JetA Orders:";
pub const NO_JET_A_ORDERS_TITLE: &str = "No JetA Orders Required";
pub const AVGAS_ORDERS_TITLE: &str = "Airports requiring Avgas Orders:";
pub const NO_AVGAS_ORDERS_TITLE: &str = "No Avgas Orders Required";

/// Evaluates the rule set against snapshots using a fixed set of thresholds.
#[derive(Debug, Clone, Copy)]
pub struct RuleEvaluator {
    thresholds: Thresholds,
}

impl RuleEvaluator {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            thresholds: *thresholds,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Run every rule. Always returns three events: supplies, Jet-A, avgas.
    pub fn evaluate(&self, snapshot: &FeedSnapshot) -> Vec<NotificationEvent> {
        let events = vec![
            self.supply_warnings(snapshot),
            self.jet_a_orders(snapshot),
            self.avgas_orders(snapshot),
        ];
        for ev in &events {
            info!(target: "fbowatch::rules", title = %ev.title, body = %ev.body, "Rule result");
        }
        events
    }

    /// Airports whose supplies will run out sooner than the threshold.
    pub fn supply_warnings(&self, snapshot: &FeedSnapshot) -> NotificationEvent {
        let rows = collect(snapshot, |r| {
            (r.supplied_days < self.thresholds.supplies_days).then_some(r.supplied_days)
        });
        if rows.is_empty() {
            NotificationEvent::new(SUPPLY_TITLE, NO_SUPPLY_WARNINGS)
        } else {
            let table = two_column_table(("Airport", "SuppliedDays"), &rows);
            NotificationEvent::new(SUPPLY_TITLE, format!("{SUPPLY_WARNING_HEADING}\n{table}"))
        }
    }

    /// Airports selling Jet-A with stock below the threshold.
    pub fn jet_a_orders(&self, snapshot: &FeedSnapshot) -> NotificationEvent {
        let rows = collect(snapshot, |r| {
            (r.sells_jet_a() && r.jet_a_quantity < self.thresholds.jet_a_kg)
                .then_some(r.jet_a_quantity)
        });
        order_event(rows, ("Airport", "FuelJetA"), JET_A_ORDERS_TITLE, NO_JET_A_ORDERS_TITLE)
    }

    /// Airports selling avgas with stock below the threshold.
    pub fn avgas_orders(&self, snapshot: &FeedSnapshot) -> NotificationEvent {
        let rows = collect(snapshot, |r| {
            (r.sells_avgas() && r.avgas_quantity < self.thresholds.avgas_kg)
                .then_some(r.avgas_quantity)
        });
        order_event(rows, ("Airport", "Fuel100LL"), AVGAS_ORDERS_TITLE, NO_AVGAS_ORDERS_TITLE)
    }
}

/// `(airport, value)` for every matching row, in snapshot order.
fn collect<F>(snapshot: &FeedSnapshot, matches: F) -> Vec<(String, String)>
where
    F: Fn(&FboRecord) -> Option<f64>,
{
    snapshot
        .iter()
        .filter_map(|r| matches(r).map(|v| (r.airport_code.clone(), format_quantity(v))))
        .collect()
}

fn order_event(
    rows: Vec<(String, String)>,
    headers: (&str, &str),
    title: &str,
    empty_title: &str,
) -> NotificationEvent {
    if rows.is_empty() {
        NotificationEvent::new(empty_title, "")
    } else {
        NotificationEvent::new(title, two_column_table(headers, &rows))
    }
}
