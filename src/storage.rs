use crate::config::{atomic_rename, Paths};
use crate::model::{PetState, CATCHUP_CLAMP_SECS, SAVE_VERSION};
use crate::shop;
use crate::sim::advance;
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::{fs, path::Path};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct SaveFile {
    pub(crate) version: u32,
    pub(crate) last_seen_utc: DateTime<Utc>,
    pub(crate) state: PetState,
}

/// A non-object or otherwise unreadable snapshot is "no prior state",
/// never an error. Partial objects merge over defaults via serde.
pub(crate) fn decode(text: &str) -> Option<SaveFile> {
    serde_json::from_str(text).ok()
}

pub(crate) fn encode(save: &SaveFile) -> Result<String> {
    Ok(serde_json::to_string_pretty(save)?)
}

/// The v2 schema: flat fields, millisecond timestamps, one undifferentiated
/// owned list. Read once when no v3 save exists.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub(crate) struct LegacySaveV2 {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) coins: u32,
    #[serde(default)]
    pub(crate) hunger: f32,
    #[serde(default)]
    pub(crate) happy: f32,
    #[serde(default)]
    pub(crate) energy: f32,
    #[serde(default)]
    pub(crate) clean: f32,
    #[serde(default)]
    pub(crate) asleep: bool,
    #[serde(default)]
    pub(crate) created_ms: i64,
    #[serde(default)]
    pub(crate) last_ms: i64,
    #[serde(default)]
    pub(crate) owned: Vec<String>,
    #[serde(default)]
    pub(crate) accessory: Option<String>,
    #[serde(default)]
    pub(crate) shell: Option<String>,
    #[serde(default)]
    pub(crate) city: Option<String>,
}

fn ms_to_utc(ms: i64, fallback: DateTime<Utc>) -> DateTime<Utc> {
    match Utc.timestamp_millis_opt(ms) {
        chrono::LocalResult::Single(t) if ms > 0 => t,
        _ => fallback,
    }
}

/// Field-copies a v2 snapshot into the current schema. Owned keys are
/// re-sorted into slots via the catalog; unknown keys are dropped.
pub(crate) fn migrate_v2(old: LegacySaveV2, now: DateTime<Utc>) -> (PetState, DateTime<Utc>) {
    let seed = if old.created_ms > 0 {
        old.created_ms as u64
    } else {
        now.timestamp_millis() as u64
    };
    let mut state = PetState::new(now, seed);

    if !old.name.trim().is_empty() {
        state.name = old.name.trim().chars().take(crate::model::NAME_MAX).collect();
    }
    state.coins = old.coins;
    state.vitals.hunger = old.hunger.clamp(0.0, 100.0);
    state.vitals.happy = old.happy.clamp(0.0, 100.0);
    state.vitals.energy = old.energy.clamp(0.0, 100.0);
    state.vitals.clean = old.clean.clamp(0.0, 100.0);
    state.asleep = old.asleep;
    state.created_at = ms_to_utc(old.created_ms, now);
    state.last_tick = ms_to_utc(old.last_ms, now).max(state.created_at);
    state.city = old.city;

    for key in &old.owned {
        if let Some(slot) = shop::slot_of(key) {
            state.wardrobe.own(slot, key);
        }
    }
    for (slot, picked) in [
        (crate::model::CosmeticSlot::Accessory, old.accessory),
        (crate::model::CosmeticSlot::Shell, old.shell),
    ] {
        if let Some(key) = picked {
            state.wardrobe.equip(slot, &key);
        }
    }

    state.push_log(now, "Moved in from an old save");
    let last_seen = state.last_tick;
    (state, last_seen)
}

/// Loads the current save, falls back to a one-time v2 migration, and
/// otherwise starts fresh. Returns the prior `last_seen` when there was one
/// so the caller can bridge the gap.
pub(crate) fn load_or_init(
    paths: &Paths,
    now: DateTime<Utc>,
    seed: u64,
) -> (PetState, Option<DateTime<Utc>>) {
    if let Ok(s) = fs::read_to_string(&paths.save_path) {
        if let Some(save) = decode(&s) {
            return (save.state, Some(save.last_seen_utc));
        }
    }
    if let Ok(s) = fs::read_to_string(&paths.legacy_save_path) {
        if let Ok(old) = serde_json::from_str::<LegacySaveV2>(&s) {
            let (state, last_seen) = migrate_v2(old, now);
            return (state, Some(last_seen));
        }
    }
    (PetState::new(now, seed), None)
}

pub(crate) fn save_atomic(path: &Path, save: &SaveFile) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, encode(save)?)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn snapshot(state: &PetState, now: DateTime<Utc>) -> SaveFile {
    SaveFile {
        version: SAVE_VERSION,
        last_seen_utc: now,
        state: state.clone(),
    }
}

/// One-batch decay for the time the engine was not ticking, clamped to the
/// maximum bridged gap. Returns the seconds actually bridged.
pub(crate) fn catch_up(state: &mut PetState, last_seen: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let gap_ms = (now - last_seen).num_milliseconds().max(0);
    let gap_secs = ((gap_ms as f64 / 1000.0) as f32).min(CATCHUP_CLAMP_SECS);

    advance(state, gap_secs);
    // Time beyond the clamp is forgiven; ticking resumes from now.
    state.last_tick = state.last_tick.max(now);

    if gap_secs >= 60.0 {
        let mins = ((now - last_seen).num_seconds() / 60).max(1);
        state.push_log(now, format!("Welcome back! You were away {mins} min"));
    }
    gap_secs
}

/// Discards both save generations and starts over with defaults.
pub(crate) fn reset(paths: &Paths, now: DateTime<Utc>, seed: u64) -> PetState {
    let _ = fs::remove_file(&paths.save_path);
    let _ = fs::remove_file(&paths.legacy_save_path);
    let mut state = PetState::new(now, seed);
    state.push_log(now, "A new friend hatches!");
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn round_trip_preserves_state() {
        let mut p = PetState::new(t0(), 99);
        p.coins = 37;
        p.asleep = true;
        p.city = Some("Lisbon".to_string());
        p.wardrobe.own(crate::model::CosmeticSlot::Shell, "star_shell");
        p.wardrobe.equip(crate::model::CosmeticSlot::Shell, "star_shell");
        p.push_log(t0(), "hello");
        p.rng.next_u64();

        let save = snapshot(&p, t0());
        let text = encode(&save).unwrap();
        let back = decode(&text).unwrap();
        assert_eq!(back.state, p);
        assert_eq!(back.last_seen_utc, t0());
        assert_eq!(back.version, SAVE_VERSION);
    }

    #[test]
    fn non_object_snapshots_are_no_prior_state() {
        assert!(decode("").is_none());
        assert!(decode("42").is_none());
        assert!(decode("\"pet\"").is_none());
        assert!(decode("[1,2,3]").is_none());
        assert!(decode("{not json").is_none());
    }

    #[test]
    fn partial_snapshot_merges_over_defaults() {
        let text = "{\"version\":3,\"last_seen_utc\":\"2024-03-01T12:00:00Z\",\
             \"state\":{\"name\":\"Momo\",\"coins\":21,\
             \"created_at\":\"2024-02-01T00:00:00Z\",\"last_tick\":\"2024-03-01T11:00:00Z\"}}";
        let save = decode(text).unwrap();
        let s = save.state;
        assert_eq!(s.name, "Momo");
        assert_eq!(s.coins, 21);
        // absent fields gained defaults
        assert_eq!(s.vitals, crate::model::Vitals::default());
        assert!(!s.asleep);
        assert!(s.log.is_empty());
        assert_eq!(s.city, None);
        assert_eq!(s.wardrobe.shell, "default");
    }

    #[test]
    fn v2_snapshot_migrates_fields() {
        let old: LegacySaveV2 = serde_json::from_str(
            "{\"name\":\"Gus\",\"coins\":14,\"hunger\":55.0,\"happy\":61.0,\
             \"energy\":40.0,\"clean\":72.0,\"asleep\":false,\
             \"created_ms\":1706745600000,\"last_ms\":1709290800000,\
             \"owned\":[\"bow\",\"teal_shell\",\"mystery_thing\"],\
             \"accessory\":\"bow\",\"shell\":\"teal_shell\",\"city\":\"Oslo\"}",
        )
        .unwrap();

        let (s, last_seen) = migrate_v2(old, t0());
        assert_eq!(s.name, "Gus");
        assert_eq!(s.coins, 14);
        assert_eq!(s.vitals.hunger, 55.0);
        assert_eq!(s.city.as_deref(), Some("Oslo"));
        assert!(s.wardrobe.owns(crate::model::CosmeticSlot::Accessory, "bow"));
        assert!(s.wardrobe.owns(crate::model::CosmeticSlot::Shell, "teal_shell"));
        assert_eq!(s.wardrobe.accessory, "bow");
        assert_eq!(s.wardrobe.shell, "teal_shell");
        // unknown keys dropped, not misfiled
        assert!(!s.wardrobe.owned_accessories.contains("mystery_thing"));
        assert!(!s.wardrobe.owned_shells.contains("mystery_thing"));
        assert_eq!(last_seen, s.last_tick);
        assert!(s.last_tick >= s.created_at);
    }

    #[test]
    fn v2_defaults_when_fields_missing() {
        let old: LegacySaveV2 = serde_json::from_str("{}").unwrap();
        let (s, _) = migrate_v2(old, t0());
        assert_eq!(s.name, "Pip");
        assert_eq!(s.created_at, t0());
        assert_eq!(s.last_tick, t0());
    }

    #[test]
    fn catch_up_bridges_short_gaps_exactly() {
        let mut p = PetState::new(t0(), 1);
        let now = t0() + ChronoDuration::seconds(120);
        let bridged = catch_up(&mut p, t0(), now);
        assert_eq!(bridged, 120.0);
        assert!((p.vitals.hunger - 63.0).abs() < 1e-2);
        assert_eq!(p.last_tick, now);
        assert!(p.log.front().unwrap().text.contains("Welcome back"));
    }

    #[test]
    fn catch_up_clamps_long_absences() {
        let mut p = PetState::new(t0(), 1);
        let now = t0() + ChronoDuration::hours(6);
        let bridged = catch_up(&mut p, t0(), now);
        assert_eq!(bridged, 600.0);
        // only 600 seconds of decay applied, not six hours
        assert!((p.vitals.hunger - 15.0).abs() < 1e-2);
        assert!(p.vitals.happy > 0.0);
        assert_eq!(p.last_tick, now);
    }

    #[test]
    fn short_gaps_skip_the_welcome_entry() {
        let mut p = PetState::new(t0(), 1);
        let now = t0() + ChronoDuration::seconds(10);
        catch_up(&mut p, t0(), now);
        assert!(p.log.is_empty());
    }
}
