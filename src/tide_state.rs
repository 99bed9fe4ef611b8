//! # Tide State Calculator
//!
//! Derives the current tide situation from a sorted extremum table: height
//! by linear interpolation between the bracketing pair, trend from the kind
//! of the next extremum, and the next extremum itself.
//!
//! The calculator never fails. Degenerate inputs map to degenerate values:
//! fewer than two extrema yields an indeterminate state, an exhausted table
//! yields [`NextTide::Pending`] (the adapters' lookahead entries make that
//! rare in practice), and instants outside the table snap to the nearest
//! endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{TideExtremum, TideKind};

/// Direction the water is moving, taken from the next extremum's kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TideTrend {
    Rising,
    Falling,
    Unknown,
}

/// The first extremum strictly after "now", or the signal that the supplied
/// table is exhausted and the following day's data is needed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum NextTide {
    At(TideExtremum),
    Pending,
}

/// Instantaneous tide situation. `height_m` is `None` when the table is too
/// short to interpolate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TideState {
    pub height_m: Option<f32>,
    pub trend: TideTrend,
    pub next: NextTide,
}

/// Compute the tide state at `now` from a sorted extremum table.
///
/// Interpolation is exact at both bracket endpoints; strictly between them
/// the height lies within the endpoint heights. Before the first extremum or
/// after the last, the nearest endpoint's height is used as-is.
pub fn current_state(extrema: &[TideExtremum], now: DateTime<Utc>) -> TideState {
    let next = next_after(extrema, now);
    let trend = match next {
        NextTide::At(e) => match e.kind {
            TideKind::High => TideTrend::Rising,
            TideKind::Low => TideTrend::Falling,
        },
        NextTide::Pending => TideTrend::Unknown,
    };

    if extrema.len() < 2 {
        // Indeterminate: nothing to interpolate against, no trend either
        return TideState {
            height_m: None,
            trend: TideTrend::Unknown,
            next,
        };
    }

    let first = &extrema[0];
    let last = &extrema[extrema.len() - 1];
    let height_m = if now <= first.time {
        Some(first.height_m)
    } else if now >= last.time {
        Some(last.height_m)
    } else {
        extrema
            .windows(2)
            .find(|pair| pair[0].time <= now && now <= pair[1].time)
            .map(|pair| interpolate(&pair[0], &pair[1], now))
    };

    TideState {
        height_m,
        trend,
        next,
    }
}

/// First extremum strictly after `now`.
fn next_after(extrema: &[TideExtremum], now: DateTime<Utc>) -> NextTide {
    extrema
        .iter()
        .find(|e| e.time > now)
        .map_or(NextTide::Pending, |e| NextTide::At(*e))
}

/// Linear interpolation between two extrema; `now` must lie within the pair.
fn interpolate(a: &TideExtremum, b: &TideExtremum, now: DateTime<Utc>) -> f32 {
    let span = (b.time - a.time).num_seconds();
    if span == 0 {
        return a.height_m;
    }
    let alpha = (now - a.time).num_seconds() as f32 / span as f32;
    // Symmetric form: exact at both endpoints, unlike a + (b - a) * alpha
    // which can round away from b at alpha = 1
    (1.0 - alpha) * a.height_m + alpha * b.height_m
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn extremum(hour: u32, minute: u32, height: f32, kind: TideKind) -> TideExtremum {
        TideExtremum {
            time: Utc.with_ymd_and_hms(2026, 8, 25, hour, minute, 0).unwrap(),
            height_m: height,
            kind,
        }
    }

    fn day_table() -> Vec<TideExtremum> {
        vec![
            extremum(4, 30, 2.1, TideKind::High),
            extremum(10, 40, 0.4, TideKind::Low),
            extremum(16, 45, 1.9, TideKind::High),
            extremum(22, 50, 0.5, TideKind::Low),
        ]
    }

    #[test]
    fn interpolation_is_exact_at_extremum_times() {
        let table = day_table();
        for e in &table {
            let state = current_state(&table, e.time);
            assert_eq!(state.height_m, Some(e.height_m));
        }
    }

    #[test]
    fn interior_endpoint_is_exact_under_f32_rounding() {
        // 2.1 + (0.4 - 2.1) * 1.0 rounds to 0.39999998 in f32; the symmetric
        // form must hand back 0.4 exactly at the bracket's right edge
        let table = vec![
            extremum(4, 30, 2.1, TideKind::High),
            extremum(10, 40, 0.4, TideKind::Low),
            extremum(16, 45, 1.9, TideKind::High),
        ];
        let state = current_state(&table, table[1].time);
        assert_eq!(state.height_m, Some(0.4));
    }

    #[test]
    fn interpolated_height_stays_within_bracket() {
        let table = day_table();
        let (a, b) = (&table[0], &table[1]);
        let mut t = a.time;
        while t < b.time {
            let h = current_state(&table, t).height_m.unwrap();
            assert!(
                (b.height_m..=a.height_m).contains(&h),
                "height {} outside [{}, {}] at {}",
                h,
                b.height_m,
                a.height_m,
                t
            );
            t += Duration::minutes(17);
        }
    }

    #[test]
    fn midpoint_interpolates_halfway() {
        let table = vec![
            extremum(6, 0, 2.0, TideKind::High),
            extremum(12, 0, 1.0, TideKind::Low),
        ];
        let mid = Utc.with_ymd_and_hms(2026, 8, 25, 9, 0, 0).unwrap();
        let state = current_state(&table, mid);
        assert!((state.height_m.unwrap() - 1.5).abs() < 1e-6);
        assert_eq!(state.trend, TideTrend::Falling);
    }

    #[test]
    fn trend_follows_kind_of_next_extremum() {
        let table = day_table();
        // Between low at 10:40 and high at 16:45 the water is rising
        let t = Utc.with_ymd_and_hms(2026, 8, 25, 13, 0, 0).unwrap();
        assert_eq!(current_state(&table, t).trend, TideTrend::Rising);
        // Between high at 16:45 and low at 22:50 it is falling
        let t = Utc.with_ymd_and_hms(2026, 8, 25, 19, 0, 0).unwrap();
        assert_eq!(current_state(&table, t).trend, TideTrend::Falling);
    }

    #[test]
    fn before_first_extremum_snaps_to_it() {
        let table = day_table();
        let early = Utc.with_ymd_and_hms(2026, 8, 25, 1, 0, 0).unwrap();
        let state = current_state(&table, early);
        assert_eq!(state.height_m, Some(2.1));
        // Next extremum is the 04:30 high, so the trend reads rising
        assert_eq!(state.trend, TideTrend::Rising);
        assert_eq!(state.next, NextTide::At(table[0]));
    }

    #[test]
    fn after_last_extremum_snaps_and_reports_pending() {
        let table = day_table();
        let late = Utc.with_ymd_and_hms(2026, 8, 25, 23, 30, 0).unwrap();
        let state = current_state(&table, late);
        assert_eq!(state.height_m, Some(0.5));
        assert_eq!(state.trend, TideTrend::Unknown);
        assert_eq!(state.next, NextTide::Pending);
    }

    #[test]
    fn next_is_strictly_after_now() {
        let table = day_table();
        // Exactly at an extremum, "next" must be the following one
        let state = current_state(&table, table[1].time);
        assert_eq!(state.next, NextTide::At(table[2]));
    }

    #[test]
    fn fewer_than_two_extrema_is_indeterminate() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();

        let empty = current_state(&[], now);
        assert_eq!(empty.height_m, None);
        assert_eq!(empty.trend, TideTrend::Unknown);
        assert_eq!(empty.next, NextTide::Pending);

        let single = vec![extremum(16, 45, 1.9, TideKind::High)];
        let state = current_state(&single, now);
        assert_eq!(state.height_m, None);
        assert_eq!(state.trend, TideTrend::Unknown);
        // The lone future extremum is still worth reporting
        assert_eq!(state.next, NextTide::At(single[0]));
    }
}
