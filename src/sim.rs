use crate::model::{PetState, VitalDelta, LOW_VITAL_WARN};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Per-second vital drift while awake.
const AWAKE_RATES: VitalDelta = VitalDelta {
    hunger: -0.10,
    happy: -0.07,
    energy: -0.06,
    clean: -0.05,
};

/// Per-second drift while asleep: energy recovers, the rest decays slower.
const ASLEEP_RATES: VitalDelta = VitalDelta {
    hunger: -0.06,
    happy: -0.03,
    energy: 0.20,
    clean: -0.04,
};

pub(crate) struct TickReport {
    /// Awake and the lowest vital fell under the warning line.
    pub(crate) low_vital: bool,
}

/// Applies elapsed real time to the vitals and advances `last_tick`.
///
/// Callers clamp `elapsed_secs` to [0,60] for the periodic tick and [0,600]
/// for catch-up after an absence; negative or non-finite input is treated
/// as zero so `last_tick` stays monotonic.
pub(crate) fn advance(state: &mut PetState, elapsed_secs: f32) -> TickReport {
    let dt = if elapsed_secs.is_finite() {
        elapsed_secs.max(0.0)
    } else {
        0.0
    };

    let rates = if state.asleep { ASLEEP_RATES } else { AWAKE_RATES };
    state.vitals.apply(rates.scaled(dt));
    state.last_tick = state.last_tick + ChronoDuration::milliseconds((dt as f64 * 1000.0).round() as i64);

    TickReport {
        low_vital: !state.asleep && state.vitals.lowest() < LOW_VITAL_WARN,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PetAction {
    Feed,
    Play,
    Clean,
    ToggleSleep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Refusal {
    Asleep,
    GameOpen,
    NotEnoughCoins,
}

impl Refusal {
    pub(crate) fn message(self) -> &'static str {
        match self {
            Refusal::Asleep => "Shh, sleeping...",
            Refusal::GameOpen => "Finish the game first!",
            Refusal::NotEnoughCoins => "Not enough coins!",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ActionOutcome {
    Done { phrase: &'static str },
    Blocked(Refusal),
}

const FEED_DELTA: VitalDelta = VitalDelta {
    hunger: 18.0,
    happy: 0.0,
    energy: 0.0,
    clean: -6.0,
};

const PLAY_DELTA: VitalDelta = VitalDelta {
    hunger: -6.0,
    happy: 20.0,
    energy: -10.0,
    clean: 0.0,
};

const CLEAN_DELTA: VitalDelta = VitalDelta {
    hunger: 0.0,
    happy: -2.0,
    energy: 0.0,
    clean: 25.0,
};

pub(crate) const PLAY_COINS: u32 = 2;

/// Precondition shared by actions and shop purchases.
pub(crate) fn can_act(state: &PetState, game_open: bool) -> Result<(), Refusal> {
    if game_open {
        return Err(Refusal::GameOpen);
    }
    if state.asleep {
        return Err(Refusal::Asleep);
    }
    Ok(())
}

/// Validates, mutates per the fixed delta table, logs, and returns an ack
/// phrase for the speech bubble. Blocked outcomes leave state untouched.
pub(crate) fn apply_action(
    state: &mut PetState,
    action: PetAction,
    game_open: bool,
    now: DateTime<Utc>,
) -> ActionOutcome {
    if game_open {
        return ActionOutcome::Blocked(Refusal::GameOpen);
    }

    match action {
        // Sleep toggling is how the pet wakes, so it skips the asleep gate.
        PetAction::ToggleSleep => {
            state.asleep = !state.asleep;
            let (entry, phrase) = if state.asleep {
                ("Curled up to sleep", "Zzz...")
            } else {
                ("Woke up", "Good morning!")
            };
            state.push_log(now, entry);
            ActionOutcome::Done { phrase }
        }
        _ if state.asleep => ActionOutcome::Blocked(Refusal::Asleep),
        PetAction::Feed => {
            state.vitals.apply(FEED_DELTA);
            state.push_log(now, "Munched a snack");
            ActionOutcome::Done { phrase: "Nom nom!" }
        }
        PetAction::Play => {
            state.vitals.apply(PLAY_DELTA);
            state.coins += PLAY_COINS;
            state.push_log(now, format!("Played fetch (+{PLAY_COINS} coins)"));
            ActionOutcome::Done { phrase: "Wheee!" }
        }
        PetAction::Clean => {
            state.vitals.apply(CLEAN_DELTA);
            state.push_log(now, "Scrubbed squeaky clean");
            ActionOutcome::Done { phrase: "So fresh!" }
        }
    }
}
