//! Pure session arithmetic over an activity log.

/// Total active seconds in `timestamps` under the heartbeat policy.
///
/// The earliest remaining timestamp starts a session; each following timestamp
/// extends it while the gap from the session cursor stays within
/// `0.0..=heartbeat`. A gap larger than the heartbeat ends the session, and
/// the gap itself is never counted. A negative gap (the system clock was
/// adjusted backwards) also ends the session instead of dragging the cursor
/// back in time. A session with a single timestamp contributes zero.
pub fn active_seconds(timestamps: &[f64], heartbeat: f64) -> f64 {
    let mut total = 0.0;
    let mut remaining = timestamps.iter().copied().peekable();

    while let Some(start) = remaining.next() {
        let mut current = start;
        while let Some(&next) = remaining.peek() {
            let gap = next - current;
            if !(0.0..=heartbeat).contains(&gap) {
                break;
            }
            current = next;
            remaining.next();
        }
        total += current - start;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::active_seconds;

    const T: f64 = 1_000_000_000.0;

    #[test]
    fn empty_log_yields_no_work() {
        assert_eq!(active_seconds(&[], 300.0), 0.0);
    }

    #[test]
    fn single_timestamp_yields_no_work() {
        assert_eq!(active_seconds(&[T], 300.0), 0.0);
    }

    #[test]
    fn contiguous_activity_spans_first_to_last() {
        let log: Vec<f64> = (0..11).map(|i| T + 60.0 * i as f64).collect();
        assert_eq!(active_seconds(&log, 70.0), 600.0);
    }

    #[test]
    fn gaps_beyond_heartbeat_split_sessions() {
        let log = [T, T + 60.0, T + 200.0, T + 260.0];
        assert_eq!(active_seconds(&log, 70.0), 120.0);
        assert_eq!(active_seconds(&log, 200.0), 260.0);
    }

    #[test]
    fn backward_clock_adjustment_starts_a_fresh_session() {
        let log = [T, T + 60.0, T - 1000.0, T - 1000.0 + 60.0];
        assert_eq!(active_seconds(&log, 200.0), 120.0);
    }

    #[test]
    fn calculation_is_idempotent() {
        let log = [T, T + 10.0, T + 500.0, T + 520.0];
        let first = active_seconds(&log, 300.0);
        let second = active_seconds(&log, 300.0);
        assert_eq!(first, second);
        assert_eq!(first, 30.0);
    }

    #[test]
    fn gap_exactly_at_heartbeat_extends_the_session() {
        let log = [T, T + 70.0];
        assert_eq!(active_seconds(&log, 70.0), 70.0);
    }
}
