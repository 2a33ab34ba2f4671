//! Sale phase evaluation. A pure function of the clock and the presale schedule.

use crate::constants::NUM_PHASES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    NotStarted,
    Vip,
    Phase1,
    Phase2,
    Phase3,
    Ended,
}

impl Phase {
    /// 0-based index into the per-phase tables, for numbered phases only.
    pub fn index(self) -> Option<usize> {
        match self {
            Phase::Phase1 => Some(0),
            Phase::Phase2 => Some(1),
            Phase::Phase3 => Some(2),
            _ => None,
        }
    }

    fn numbered(index: usize) -> Phase {
        match index {
            0 => Phase::Phase1,
            1 => Phase::Phase2,
            _ => Phase::Phase3,
        }
    }
}

/// Timing and pricing inputs, usually taken from a presale snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSchedule {
    pub vip_start: i64,
    pub vip_duration: i64,
    pub vip_buyers_count: u64,
    pub vip_max_buyers: u64,
    pub vip_price: u64,
    pub phase1_start: i64,
    pub phase_duration: i64,
    pub phase_prices: [u64; NUM_PHASES],
}

impl PhaseSchedule {
    pub fn vip_end(&self) -> i64 {
        self.vip_start.saturating_add(self.vip_duration.max(0))
    }

    pub fn vip_window_open(&self, now: i64) -> bool {
        self.vip_start <= now && now < self.vip_end()
    }

    pub fn vip_slots_full(&self) -> bool {
        self.vip_buyers_count >= self.vip_max_buyers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStatus {
    pub phase: Phase,
    /// Micro-dollars per whole token; `None` outside a selling phase.
    pub price: Option<u64>,
    /// Seconds until the next transition, never negative.
    pub remaining_secs: u64,
}

fn until(boundary: i64, now: i64) -> u64 {
    boundary.saturating_sub(now).max(0) as u64
}

/// Evaluates the sale phase at `now`.
///
/// VIP requires both an open time window and a free slot. Once VIP is over the
/// numbered phase is `floor((now - phase1_start) / phase_duration) + 1`; a gap
/// between an early VIP close and `phase1_start` counts as Phase 1.
pub fn evaluate(now: i64, schedule: &PhaseSchedule) -> PhaseStatus {
    if now < schedule.vip_start {
        return PhaseStatus {
            phase: Phase::NotStarted,
            price: None,
            remaining_secs: until(schedule.vip_start, now),
        };
    }
    if schedule.vip_window_open(now) && !schedule.vip_slots_full() {
        return PhaseStatus {
            phase: Phase::Vip,
            price: Some(schedule.vip_price),
            remaining_secs: until(schedule.vip_end(), now),
        };
    }
    let ended = PhaseStatus {
        phase: Phase::Ended,
        price: None,
        remaining_secs: 0,
    };
    if schedule.phase_duration <= 0 {
        return ended;
    }
    let elapsed = now.saturating_sub(schedule.phase1_start);
    let ordinal = elapsed.div_euclid(schedule.phase_duration).saturating_add(1).max(1);
    if ordinal > NUM_PHASES as i64 {
        return ended;
    }
    let index = (ordinal - 1) as usize;
    let boundary = schedule
        .phase1_start
        .saturating_add(schedule.phase_duration.saturating_mul(ordinal));
    PhaseStatus {
        phase: Phase::numbered(index),
        price: Some(schedule.phase_prices[index]),
        remaining_secs: until(boundary, now),
    }
}

/// Remaining time split for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    pub fn from_secs(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: total % 86_400 / 3_600,
            minutes: total % 3_600 / 60,
            seconds: total % 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    fn schedule() -> PhaseSchedule {
        PhaseSchedule {
            vip_start: 1_000,
            vip_duration: 7 * DAY,
            vip_buyers_count: 10,
            vip_max_buyers: 50,
            vip_price: 1_000,
            phase1_start: 1_000 + 7 * DAY,
            phase_duration: 30 * DAY,
            phase_prices: [4_000, 5_000, 6_000],
        }
    }

    #[test]
    fn test_not_started_counts_down_to_vip() {
        let status = evaluate(400, &schedule());
        assert_eq!(status.phase, Phase::NotStarted);
        assert_eq!(status.remaining_secs, 600);
        assert_eq!(status.price, None);
    }

    #[test]
    fn test_vip_window_uses_vip_price() {
        let status = evaluate(1_000, &schedule());
        assert_eq!(status.phase, Phase::Vip);
        assert_eq!(status.price, Some(1_000));
        assert_eq!(status.remaining_secs, (7 * DAY) as u64);
    }

    #[test]
    fn test_full_vip_closes_early_into_phase_one() {
        let mut s = schedule();
        s.vip_buyers_count = 50;
        let now = 1_000 + DAY;
        let status = evaluate(now, &s);
        assert_eq!(status.phase, Phase::Phase1);
        assert_eq!(status.price, Some(4_000));
        assert_eq!(status.remaining_secs, (s.phase1_start + 30 * DAY - now) as u64);
    }

    #[test]
    fn test_phase_rollover_is_exact() {
        let s = schedule();
        let boundary = s.phase1_start + s.phase_duration;
        assert_eq!(evaluate(boundary - 1, &s).phase, Phase::Phase1);
        assert_eq!(evaluate(boundary - 1, &s).remaining_secs, 1);
        assert_eq!(evaluate(boundary, &s).phase, Phase::Phase2);
        assert_eq!(evaluate(boundary, &s).price, Some(5_000));
        assert_eq!(evaluate(boundary + s.phase_duration, &s).phase, Phase::Phase3);
        assert_eq!(evaluate(boundary + 2 * s.phase_duration, &s).phase, Phase::Ended);
    }

    #[test]
    fn test_phase_never_goes_backward() {
        for vip_buyers_count in [0, 49, 50] {
            let mut s = schedule();
            s.vip_buyers_count = vip_buyers_count;
            let mut last = Phase::NotStarted;
            for now in (0..s.phase1_start + 4 * s.phase_duration).step_by(3_607) {
                let phase = evaluate(now, &s).phase;
                assert!(phase >= last, "{:?} after {:?} at {}", phase, last, now);
                last = phase;
            }
            assert_eq!(last, Phase::Ended);
        }
    }

    #[test]
    fn test_zero_phase_duration_ends_sale() {
        let mut s = schedule();
        s.phase_duration = 0;
        assert_eq!(evaluate(s.phase1_start, &s).phase, Phase::Ended);
    }

    #[test]
    fn test_countdown_split() {
        let c = Countdown::from_secs(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5);
        assert_eq!(
            c,
            Countdown {
                days: 2,
                hours: 3,
                minutes: 4,
                seconds: 5
            }
        );
    }
}
