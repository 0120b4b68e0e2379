//! Monthly maintenance cost report.
//!
//! On the first of each month, pull the previous month's flight log, total
//! the flight hours of each configured aircraft, and queue one message per
//! aircraft with the hours and the maintenance cost at its hourly rate.

use anyhow::Result;
use chrono::{Datelike, Months, NaiveDate};
use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;
use tracing::info;

use crate::config::{AircraftRates, Config};
use crate::feed::decode::{self, Columns};
use crate::feed::{DataShapeError, FeedError};
use crate::notification::NotificationEvent;
use crate::utils::interpolation::interpolate_string;
use crate::utils::table::format_quantity;

/// One flown leg from the flight log.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightLeg {
    pub aircraft: String,
    /// Duration in hours, rounded to 0.1.
    pub hours: f64,
}

/// `(month, year)` of the month before `today`.
pub fn previous_month(today: NaiveDate) -> (u32, i32) {
    let prev = today
        .with_day(1)
        .and_then(|d| d.checked_sub_months(Months::new(1)))
        .unwrap_or(today);
    (prev.month(), prev.year())
}

/// Parse an `H:MM` duration into hours rounded to one decimal.
pub fn parse_flight_time(raw: &str) -> Option<f64> {
    let (h, m) = raw.trim().split_once(':')?;
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    Some(round_to(hours as f64 + minutes as f64 / 60.0, 1))
}

/// Decode a flight log CSV, keeping only `Type == flight` rows.
pub fn parse_flight_log<R: Read>(input: R) -> Result<Vec<FlightLeg>, DataShapeError> {
    let mut rdr = decode::reader(input);
    let headers = rdr
        .headers()
        .map_err(|e| DataShapeError::Malformed {
            row: 0,
            reason: e.to_string(),
        })?
        .clone();
    let cols = Columns::resolve(&headers, ["Type", "Aircraft", "FlightTime"])?;

    let mut legs = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = result.map_err(|e| DataShapeError::Malformed {
            row,
            reason: e.to_string(),
        })?;
        if cols.text(&record, 0, row)? != "flight" {
            continue;
        }
        let raw_time = cols.text(&record, 2, row)?;
        let hours = parse_flight_time(raw_time).ok_or_else(|| DataShapeError::Malformed {
            row,
            reason: format!("flight time '{raw_time}' is not H:MM"),
        })?;
        legs.push(FlightLeg {
            aircraft: cols.text(&record, 1, row)?.to_string(),
            hours,
        });
    }
    Ok(legs)
}

/// One event per configured aircraft, in registration order.
pub fn aircraft_totals(legs: &[FlightLeg], rates: &AircraftRates) -> Vec<NotificationEvent> {
    rates
        .iter()
        .map(|(reg, rate)| {
            let hours = round_to(
                legs.iter()
                    .filter(|leg| &leg.aircraft == reg)
                    .map(|leg| leg.hours)
                    .sum(),
                1,
            );
            let cost = round_to(hours * rate, 2);
            NotificationEvent::new(
                format!("Monthly totals for {reg}:"),
                format!("{hours:.1} Hours at ${} = ${cost:.2}", format_quantity(*rate)),
            )
        })
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Fetches the flight log and builds the report.
#[derive(Debug, Clone)]
pub struct MonthlyReport {
    client: reqwest::Client,
    url_template: String,
    user_key: String,
    rates: AircraftRates,
}

impl MonthlyReport {
    /// `None` when no aircraft are configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        if !cfg.maintenance.is_enabled() {
            return Ok(None);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.feed.timeout_secs))
            .build()?;
        Ok(Some(Self {
            client,
            url_template: cfg.maintenance.url_template.clone(),
            user_key: cfg.feed.user_key.clone(),
            rates: cfg.maintenance.aircraft.clone(),
        }))
    }

    fn url_for(&self, today: NaiveDate) -> String {
        let (month, year) = previous_month(today);
        let vars = HashMap::from([
            ("user_key", self.user_key.clone()),
            ("month", format!("{month:02}")),
            ("year", year.to_string()),
        ]);
        interpolate_string(&self.url_template, &vars)
    }

    /// Build the report for the month before `today`.
    pub async fn build(&self, today: NaiveDate) -> Result<Vec<NotificationEvent>, FeedError> {
        let origin = "flight log";
        let bytes = self
            .client
            .get(self.url_for(today))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| FeedError::unavailable(origin, e.without_url()))?
            .bytes()
            .await
            .map_err(|e| FeedError::unavailable(origin, e.without_url()))?;
        let legs = parse_flight_log(&bytes[..])?;
        info!(
            target: "fbowatch::report",
            legs = legs.len(),
            aircraft = self.rates.len(),
            "Flight log loaded"
        );
        Ok(aircraft_totals(&legs, &self.rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_server::TestServer;

    #[test]
    fn previous_month_wraps_year() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(previous_month(d(2024, 1, 1)), (12, 2023));
        assert_eq!(previous_month(d(2024, 3, 31)), (2, 2024));
    }

    #[test]
    fn flight_time_rounds_to_tenths() {
        assert_eq!(parse_flight_time("1:30"), Some(1.5));
        assert_eq!(parse_flight_time("0:05"), Some(0.1));
        assert_eq!(parse_flight_time("2:00"), Some(2.0));
        assert_eq!(parse_flight_time("abc"), None);
    }

    #[test]
    fn only_flights_are_counted() {
        let csv = "Id,Type,Aircraft,FlightTime\n\
1,flight,N123AB,1:30\n\
2,refuel,N123AB,0:00\n\
3,flight,N999ZZ,2:00\n\
4,flight,N123AB,0:45\n";
        let legs = parse_flight_log(csv.as_bytes()).unwrap();
        assert_eq!(legs.len(), 3);
        assert_eq!(legs[2], FlightLeg { aircraft: "N123AB".into(), hours: 0.8 });
    }

    #[test]
    fn totals_per_configured_aircraft() {
        let legs = vec![
            FlightLeg { aircraft: "N123AB".into(), hours: 1.5 },
            FlightLeg { aircraft: "N123AB".into(), hours: 0.8 },
            FlightLeg { aircraft: "N999ZZ".into(), hours: 2.0 },
        ];
        let rates = AircraftRates::from([
            ("N123AB".to_string(), 85.0),
            ("N555QQ".to_string(), 40.5),
        ]);
        let events = aircraft_totals(&legs, &rates);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Monthly totals for N123AB:");
        assert_eq!(events[0].body, "2.3 Hours at $85 = $195.50");
        assert_eq!(events[1].title, "Monthly totals for N555QQ:");
        assert_eq!(events[1].body, "0.0 Hours at $40.5 = $0.00");
    }

    #[test]
    fn url_targets_previous_month() {
        let mut cfg = Config::default();
        cfg.feed.user_key = "U".into();
        cfg.maintenance.aircraft.insert("N1".into(), 1.0);
        let report = MonthlyReport::from_config(&cfg).unwrap().unwrap();
        let url = report.url_for(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(url.contains("month=12&year=2023"));
        assert!(url.contains("query=flightlogs"));
    }

    fn local_report(base: &str) -> MonthlyReport {
        let mut cfg = Config::default();
        cfg.feed.user_key = "U".into();
        cfg.maintenance.url_template =
            format!("{base}/data?userkey={{{{user_key}}}}&month={{{{month}}}}&year={{{{year}}}}");
        cfg.maintenance.aircraft.insert("N123AB".into(), 85.0);
        MonthlyReport::from_config(&cfg).unwrap().unwrap()
    }

    #[tokio::test]
    async fn build_fetches_previous_month_and_totals() {
        let server = TestServer::start(|_| {
            let log = "Type,Aircraft,FlightTime\n\
flight,N123AB,1:30\n\
refuel,N123AB,0:00\n\
flight,N123AB,0:45\n";
            (200, log.to_string())
        })
        .await;
        let report = local_report(server.base());

        let events = report
            .build(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Monthly totals for N123AB:");
        assert_eq!(events[0].body, "2.3 Hours at $85 = $195.50");
        assert!(server.requests()[0].target.ends_with("month=02&year=2024"));
    }

    #[tokio::test]
    async fn build_reports_unavailable_log() {
        let server = TestServer::start(|_| (502, String::new())).await;
        let report = local_report(server.base());
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(matches!(
            report.build(today).await,
            Err(FeedError::Unavailable { .. })
        ));
    }

    #[test]
    fn disabled_without_aircraft() {
        assert!(MonthlyReport::from_config(&Config::default()).unwrap().is_none());
    }
}
