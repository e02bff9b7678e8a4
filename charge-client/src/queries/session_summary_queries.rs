use std::{collections::HashMap, hash::Hash};

use time::Date;

use crate::domain::{
    ChargeSession, Column, DashboardMetrics, LocationSummary, MissingColumn, MonthlySummary,
    SessionTable, WeekdaySummary, WEEKDAY_ORDER,
};

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    consumption_kwh: f64,
    cost_eur: f64,
    sessions: usize,
    duration_minutes: f64,
}

impl Totals {
    fn add(&mut self, s: &ChargeSession) {
        // Null values are skipped; an all-null group sums to zero.
        self.consumption_kwh += s.consumption_kwh.unwrap_or(0.0);
        self.cost_eur += s.derived.cost_eur.unwrap_or(0.0);
        self.duration_minutes += s.duration_minutes.unwrap_or(0.0);
        self.sessions += 1;
    }

    fn avg_kwh_per_session(&self) -> Option<f64> {
        ratio(self.consumption_kwh, self.sessions as f64)
    }

    fn duration_minutes(&self, has_duration: bool) -> Option<f64> {
        has_duration.then_some(self.duration_minutes)
    }

    fn duration_hours(&self, has_duration: bool) -> Option<f64> {
        self.duration_minutes(has_duration).map(|m| m / 60.0)
    }

    fn avg_rate_kwh_per_hour(&self, has_duration: bool) -> Option<f64> {
        self.duration_hours(has_duration)
            .and_then(|hours| ratio(self.consumption_kwh, hours))
    }
}

/// `None` instead of a division by zero or a non-finite result.
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator).filter(|v| v.is_finite())
}

/// Group sessions by exact key, keeping groups in first-seen order.
/// Sessions whose key is `None` are left out.
fn group_by<K, F>(sessions: &[ChargeSession], key: F) -> Vec<(K, Totals)>
where
    K: Eq + Hash + Clone,
    F: Fn(&ChargeSession) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Totals)> = Vec::new();

    for s in sessions {
        let Some(k) = key(s) else { continue };
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            groups.push((k, Totals::default()));
            groups.len() - 1
        });
        groups[slot].1.add(s);
    }

    groups
}

/// Roll sessions up per `YYYY-MM`, in chronological order.
pub fn summarize_by_month(table: &SessionTable) -> Vec<MonthlySummary> {
    let has_duration = table.has_column(Column::Duration);

    let mut rows: Vec<MonthlySummary> = group_by(table.sessions(), |s| {
        let label = s.derived.year_month.clone()?;
        let month_start = s.derived.month_start()?;
        Some((label, month_start))
    })
    .into_iter()
    .map(|((month, month_start), t)| MonthlySummary {
        month,
        month_start,
        consumption_kwh: t.consumption_kwh,
        cost_eur: t.cost_eur,
        sessions: t.sessions,
        duration_minutes: t.duration_minutes(has_duration),
        duration_hours: t.duration_hours(has_duration),
        avg_kwh_per_session: t.avg_kwh_per_session(),
        avg_rate_kwh_per_hour: t.avg_rate_kwh_per_hour(has_duration),
    })
    .collect();

    rows.sort_by_key(|r| r.month_start);
    rows
}

/// Roll sessions up per charging site, highest consumption first.
///
/// Ties keep the order in which the sites first appear in the table.
pub fn summarize_by_location(table: &SessionTable) -> Result<Vec<LocationSummary>, MissingColumn> {
    table.require(Column::Location)?;
    let has_duration = table.has_column(Column::Duration);

    let mut rows: Vec<LocationSummary> = group_by(table.sessions(), |s| s.location.clone())
        .into_iter()
        .map(|(location, t)| LocationSummary {
            location,
            consumption_kwh: t.consumption_kwh,
            cost_eur: t.cost_eur,
            sessions: t.sessions,
            duration_minutes: t.duration_minutes(has_duration),
            duration_hours: t.duration_hours(has_duration),
            avg_kwh_per_session: t.avg_kwh_per_session(),
            avg_rate_kwh_per_hour: t.avg_rate_kwh_per_hour(has_duration),
        })
        .collect();

    // `sort_by` is stable.
    rows.sort_by(|a, b| b.consumption_kwh.total_cmp(&a.consumption_kwh));
    Ok(rows)
}

/// Roll sessions up per weekday in Monday..Sunday order. Days without sessions are omitted.
pub fn summarize_by_weekday(table: &SessionTable) -> Vec<WeekdaySummary> {
    let mut rows: Vec<WeekdaySummary> = group_by(table.sessions(), |s| s.derived.weekday_index)
        .into_iter()
        .filter_map(|(idx, t)| {
            let day = *WEEKDAY_ORDER.get(idx as usize)?;
            Some(WeekdaySummary {
                day,
                weekday_index: idx,
                consumption_kwh: t.consumption_kwh,
                cost_eur: t.cost_eur,
                sessions: t.sessions,
                avg_kwh_per_session: t.avg_kwh_per_session(),
            })
        })
        .collect();

    rows.sort_by_key(|r| r.weekday_index);
    rows
}

/// Headline figures for the whole table.
pub fn summarize_dashboard(table: &SessionTable) -> DashboardMetrics {
    let has_duration = table.has_column(Column::Duration);
    let mut totals = Totals::default();
    for s in table.sessions() {
        totals.add(s);
    }
    let range = table.start_date_range();

    DashboardMetrics {
        total_consumption_kwh: totals.consumption_kwh,
        total_cost_eur: totals.cost_eur,
        sessions: totals.sessions,
        avg_kwh_per_session: totals.avg_kwh_per_session(),
        total_duration_hours: totals.duration_hours(has_duration),
        avg_rate_kwh_per_hour: totals.avg_rate_kwh_per_hour(has_duration),
        first_session: range.map(|(first, _)| first),
        last_session: range.map(|(_, last)| last),
        tariff_eur_per_kwh: table.tariff_eur_per_kwh(),
    }
}

/// Sessions whose start date lies in `[start, end]`, both inclusive.
///
/// An inverted range yields an empty table. Sessions without a start never match.
pub fn filter_by_start_date(table: &SessionTable, start: Date, end: Date) -> SessionTable {
    let sessions = table
        .sessions()
        .iter()
        .filter(|s| matches!(s.start_date(), Some(d) if d >= start && d <= end))
        .cloned()
        .collect();
    table.with_sessions(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DerivedFields;
    use time::{macros::{date, datetime}, PrimitiveDateTime};

    const TARIFF: f64 = 0.49;

    const ALL_COLUMNS: [Column; 4] = [
        Column::StartTime,
        Column::Location,
        Column::Consumption,
        Column::Duration,
    ];

    fn session(start: Option<PrimitiveDateTime>, location: &str, kwh: f64, minutes: Option<f64>) -> ChargeSession {
        ChargeSession {
            session_id: Some(format!("s-{location}-{kwh}")),
            start_time: start,
            location: Some(location.to_string()),
            consumption_kwh: Some(kwh),
            duration_minutes: minutes,
            derived: DerivedFields::derive(start, Some(kwh), minutes, TARIFF),
            ..ChargeSession::default()
        }
    }

    fn table(sessions: Vec<ChargeSession>) -> SessionTable {
        SessionTable::with_columns(&ALL_COLUMNS, TARIFF, sessions)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn monthly_summary_matches_worked_example() {
        let t = table(vec![
            session(Some(datetime!(2024-01-05 10:00:00)), "Home", 10.0, Some(120.0)),
            session(Some(datetime!(2024-01-20 18:00:00)), "Work", 5.0, Some(60.0)),
        ]);

        let monthly = summarize_by_month(&t);
        assert_eq!(monthly.len(), 1);
        let jan = &monthly[0];
        assert_eq!(jan.month, "2024-01");
        assert_eq!(jan.month_start, date!(2024-01-01));
        assert_eq!(jan.sessions, 2);
        assert_close(jan.consumption_kwh, 15.0);
        assert_close(jan.cost_eur, 7.35);
        assert_eq!(jan.duration_minutes, Some(180.0));
        assert_eq!(jan.duration_hours, Some(3.0));
        assert_eq!(jan.avg_kwh_per_session, Some(7.5));
        assert_close(jan.avg_rate_kwh_per_hour.unwrap(), 5.0);
    }

    #[test]
    fn monthly_summary_is_chronological_regardless_of_input_order() {
        let t = table(vec![
            session(Some(datetime!(2024-03-02 10:00:00)), "A", 1.0, Some(10.0)),
            session(Some(datetime!(2023-11-02 10:00:00)), "A", 1.0, Some(10.0)),
            session(Some(datetime!(2024-01-02 10:00:00)), "A", 1.0, Some(10.0)),
            session(Some(datetime!(2023-12-02 10:00:00)), "A", 1.0, Some(10.0)),
            session(Some(datetime!(2024-01-28 10:00:00)), "A", 1.0, Some(10.0)),
        ]);

        let monthly = summarize_by_month(&t);
        let labels: Vec<_> = monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["2023-11", "2023-12", "2024-01", "2024-03"]);
        assert!(monthly.windows(2).all(|w| w[0].month_start < w[1].month_start));
        assert_eq!(monthly[2].sessions, 2);
    }

    #[test]
    fn zero_duration_session_counts_in_totals_but_has_no_rate() {
        let t = table(vec![
            session(Some(datetime!(2024-02-01 09:00:00)), "Depot", 3.0, Some(0.0)),
        ]);

        assert_eq!(t.sessions()[0].derived.charging_rate_kwh_per_hour, None);

        let monthly = summarize_by_month(&t);
        assert_close(monthly[0].consumption_kwh, 3.0);
        assert_eq!(monthly[0].duration_minutes, Some(0.0));
        assert_eq!(monthly[0].avg_rate_kwh_per_hour, None);

        let locations = summarize_by_location(&t).unwrap();
        assert_close(locations[0].consumption_kwh, 3.0);
        assert_eq!(locations[0].avg_rate_kwh_per_hour, None);
    }

    #[test]
    fn sessions_without_start_are_left_out_of_time_groupings() {
        let t = table(vec![
            session(None, "Home", 4.0, Some(60.0)),
            session(Some(datetime!(2024-04-01 12:00:00)), "Home", 6.0, Some(60.0)),
        ]);

        let monthly = summarize_by_month(&t);
        assert_eq!(monthly.len(), 1);
        assert_close(monthly[0].consumption_kwh, 6.0);

        let weekdays = summarize_by_weekday(&t);
        assert_eq!(weekdays.iter().map(|w| w.sessions).sum::<usize>(), 1);

        let locations = summarize_by_location(&t).unwrap();
        assert_eq!(locations[0].sessions, 2);
        assert_close(locations[0].consumption_kwh, 10.0);
    }

    #[test]
    fn location_summary_sorts_descending_with_stable_ties() {
        let t = table(vec![
            session(Some(datetime!(2024-01-01 10:00:00)), "Beta", 5.0, Some(30.0)),
            session(Some(datetime!(2024-01-02 10:00:00)), "Alpha", 5.0, Some(30.0)),
            session(Some(datetime!(2024-01-03 10:00:00)), "Gamma", 12.0, Some(30.0)),
            session(Some(datetime!(2024-01-04 10:00:00)), "Delta", 1.0, Some(30.0)),
        ]);

        let locations = summarize_by_location(&t).unwrap();
        let names: Vec<_> = locations.iter().map(|l| l.location.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Beta", "Alpha", "Delta"]);
        assert!(locations
            .windows(2)
            .all(|w| w[0].consumption_kwh >= w[1].consumption_kwh));
    }

    #[test]
    fn location_grouping_uses_exact_names() {
        let t = table(vec![
            session(Some(datetime!(2024-01-01 10:00:00)), "Garage", 1.0, Some(30.0)),
            session(Some(datetime!(2024-01-01 11:00:00)), "garage", 1.0, Some(30.0)),
            session(Some(datetime!(2024-01-01 12:00:00)), "Garage ", 1.0, Some(30.0)),
        ]);

        assert_eq!(summarize_by_location(&t).unwrap().len(), 3);
    }

    #[test]
    fn location_summary_requires_location_column() {
        let t = SessionTable::with_columns(
            &[Column::StartTime, Column::Consumption],
            TARIFF,
            vec![session(Some(datetime!(2024-01-01 10:00:00)), "x", 1.0, None)],
        );

        assert_eq!(summarize_by_location(&t), Err(MissingColumn(Column::Location)));
    }

    #[test]
    fn missing_duration_column_leaves_duration_fields_empty() {
        let t = SessionTable::with_columns(
            &[Column::StartTime, Column::Location, Column::Consumption],
            TARIFF,
            vec![session(Some(datetime!(2024-01-01 10:00:00)), "x", 2.0, None)],
        );

        let monthly = summarize_by_month(&t);
        assert_eq!(monthly[0].duration_minutes, None);
        assert_eq!(monthly[0].duration_hours, None);
        assert_eq!(monthly[0].avg_rate_kwh_per_hour, None);
        assert_eq!(monthly[0].avg_kwh_per_session, Some(2.0));
    }

    #[test]
    fn weekday_summary_uses_canonical_order_and_omits_absent_days() {
        // 2024-01-07 Sunday, 2024-01-03 Wednesday, 2024-01-01 Monday
        let t = table(vec![
            session(Some(datetime!(2024-01-07 10:00:00)), "A", 2.0, Some(30.0)),
            session(Some(datetime!(2024-01-03 10:00:00)), "A", 4.0, Some(30.0)),
            session(Some(datetime!(2024-01-01 10:00:00)), "A", 6.0, Some(30.0)),
            session(Some(datetime!(2024-01-14 10:00:00)), "A", 2.0, Some(30.0)),
        ]);

        let weekdays = summarize_by_weekday(&t);
        let days: Vec<_> = weekdays.iter().map(|w| w.day).collect();
        assert_eq!(days, vec!["Monday", "Wednesday", "Sunday"]);

        let sunday = &weekdays[2];
        assert_eq!(sunday.sessions, 2);
        assert_close(sunday.consumption_kwh, 4.0);
        assert_close(sunday.cost_eur, 4.0 * TARIFF);
        assert_eq!(sunday.avg_kwh_per_session, Some(2.0));

        let mut canonical = WEEKDAY_ORDER.iter();
        assert!(days.iter().all(|d| canonical.any(|c| c == d)));
    }

    #[test]
    fn dashboard_metrics_cover_whole_table() {
        let t = table(vec![
            session(Some(datetime!(2024-01-05 10:00:00)), "Home", 10.0, Some(120.0)),
            session(Some(datetime!(2024-03-20 18:00:00)), "Work", 5.0, Some(60.0)),
        ]);

        let m = summarize_dashboard(&t);
        assert_eq!(m.sessions, 2);
        assert_close(m.total_consumption_kwh, 15.0);
        assert_close(m.total_cost_eur, 7.35);
        assert_eq!(m.avg_kwh_per_session, Some(7.5));
        assert_eq!(m.total_duration_hours, Some(3.0));
        assert_close(m.avg_rate_kwh_per_hour.unwrap(), 5.0);
        assert_eq!(m.first_session, Some(date!(2024-01-05)));
        assert_eq!(m.last_session, Some(date!(2024-03-20)));
        assert_eq!(m.tariff_eur_per_kwh, TARIFF);
    }

    #[test]
    fn dashboard_metrics_on_empty_table_have_no_averages() {
        let m = summarize_dashboard(&table(Vec::new()));
        assert_eq!(m.sessions, 0);
        assert_eq!(m.avg_kwh_per_session, None);
        assert_eq!(m.avg_rate_kwh_per_hour, None);
        assert_eq!(m.first_session, None);
    }

    #[test]
    fn date_filter_is_inclusive_on_both_bounds() {
        let t = table(vec![
            session(Some(datetime!(2024-01-01 00:00:00)), "A", 1.0, Some(10.0)),
            session(Some(datetime!(2024-01-10 23:59:59)), "A", 2.0, Some(10.0)),
            session(Some(datetime!(2024-01-11 00:00:00)), "A", 3.0, Some(10.0)),
            session(None, "A", 4.0, Some(10.0)),
        ]);

        let filtered = filter_by_start_date(&t, date!(2024-01-01), date!(2024-01-10));
        let kwh: Vec<_> = filtered.sessions().iter().map(|s| s.consumption_kwh).collect();
        assert_eq!(kwh, vec![Some(1.0), Some(2.0)]);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn inverted_date_range_returns_empty_table() {
        let t = table(vec![
            session(Some(datetime!(2024-01-05 10:00:00)), "A", 1.0, Some(10.0)),
        ]);

        let filtered = filter_by_start_date(&t, date!(2024-02-01), date!(2024-01-01));
        assert!(filtered.is_empty());
        assert!(filtered.has_column(Column::Location));
    }
}
