use crate::model::PetState;
use chrono::{DateTime, Utc};

/// Coin Pop round length and how long a target sits on one pad.
pub(crate) const COIN_POP_ROUND_SECS: u64 = 15;
pub(crate) const COIN_POP_HOP_MS: u64 = 900;

/// Reaction go-signal delay window, seconds.
pub(crate) const REACTION_ARM_MIN_SECS: f32 = 1.2;
pub(crate) const REACTION_ARM_MAX_SECS: f32 = 3.2;

/// Coin Pop: raw hit count plus a tiered bonus.
pub(crate) fn coin_pop_reward(hits: u32) -> u32 {
    let bonus = if hits >= 10 {
        3
    } else if hits >= 6 {
        1
    } else {
        0
    };
    hits + bonus
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReactionOutcome {
    /// Pressed before the go signal.
    FalseStart,
    /// Valid press, measured from the go signal.
    Tapped { millis: u64 },
}

/// Reaction: reward tiers by press latency; a false start earns nothing.
pub(crate) fn reaction_reward(outcome: ReactionOutcome) -> u32 {
    match outcome {
        ReactionOutcome::FalseStart => 0,
        ReactionOutcome::Tapped { millis } => match millis {
            0..=220 => 8,
            221..=300 => 6,
            301..=420 => 4,
            421..=600 => 2,
            _ => 1,
        },
    }
}

/// Credits `max(0, floor(amount))` coins and logs the result; a zero award
/// still leaves a neutral log entry so the player sees the outcome.
pub(crate) fn award_coins(
    state: &mut PetState,
    amount: f64,
    reason: &str,
    now: DateTime<Utc>,
) -> u32 {
    let credited = amount.floor().max(0.0) as u32;
    state.coins += credited;
    if credited == 0 {
        state.push_log(now, format!("No reward ({reason})"));
    } else {
        state.push_log(now, format!("+{credited} coins ({reason})"));
    }
    credited
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn coin_pop_bonus_tiers() {
        assert_eq!(coin_pop_reward(0), 0);
        assert_eq!(coin_pop_reward(5), 5);
        assert_eq!(coin_pop_reward(6), 7);
        assert_eq!(coin_pop_reward(9), 10);
        assert_eq!(coin_pop_reward(10), 13);
        assert_eq!(coin_pop_reward(14), 17);
    }

    #[test]
    fn reaction_tier_boundaries() {
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 0 }), 8);
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 220 }), 8);
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 221 }), 6);
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 250 }), 6);
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 300 }), 6);
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 301 }), 4);
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 420 }), 4);
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 600 }), 2);
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 601 }), 1);
        assert_eq!(reaction_reward(ReactionOutcome::Tapped { millis: 5000 }), 1);
    }

    #[test]
    fn false_start_earns_nothing_and_logs_distinctly() {
        assert_eq!(reaction_reward(ReactionOutcome::FalseStart), 0);

        let mut p = PetState::new(t0(), 1);
        let coins = p.coins;
        award_coins(&mut p, 0.0, "false start", t0());
        assert_eq!(p.coins, coins);
        let entry = &p.log.front().unwrap().text;
        assert!(entry.contains("false start"));
        assert!(entry.starts_with("No reward"));

        award_coins(&mut p, 6.0, "reaction", t0());
        assert!(p.log.front().unwrap().text.contains("reaction"));
        assert!(!p.log.front().unwrap().text.contains("false start"));
    }

    #[test]
    fn award_floors_and_refuses_negative() {
        let mut p = PetState::new(t0(), 1);
        let base = p.coins;
        assert_eq!(award_coins(&mut p, 7.9, "coin pop", t0()), 7);
        assert_eq!(p.coins, base + 7);
        assert_eq!(award_coins(&mut p, -3.0, "glitch", t0()), 0);
        assert_eq!(p.coins, base + 7);
    }
}
