use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

pub(crate) const SAVE_VERSION: u32 = 3;
pub(crate) const NAME_MAX: usize = 12;
pub(crate) const LOG_CAP: usize = 12;
pub(crate) const LOW_VITAL_WARN: f32 = 18.0;
pub(crate) const TICK_CLAMP_SECS: f32 = 60.0;
pub(crate) const CATCHUP_CLAMP_SECS: f32 = 600.0;
pub(crate) const DEFAULT_COINS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mood {
    Happy,
    Okay,
    Grumpy,
    Tired,
    Grimy,
    Sleeping,
}

impl Mood {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Okay => "Okay",
            Mood::Grumpy => "Grumpy",
            Mood::Tired => "Tired",
            Mood::Grimy => "Grimy",
            Mood::Sleeping => "Sleeping",
        }
    }
}

/// The four bounded pet attributes. Every mutation goes through `apply`,
/// which clamps each to [0,100].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Vitals {
    pub(crate) hunger: f32,
    pub(crate) happy: f32,
    pub(crate) energy: f32,
    pub(crate) clean: f32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            hunger: 75.0,
            happy: 70.0,
            energy: 75.0,
            clean: 80.0,
        }
    }
}

impl Vitals {
    pub(crate) fn apply(&mut self, d: VitalDelta) {
        self.hunger = (self.hunger + d.hunger).clamp(0.0, 100.0);
        self.happy = (self.happy + d.happy).clamp(0.0, 100.0);
        self.energy = (self.energy + d.energy).clamp(0.0, 100.0);
        self.clean = (self.clean + d.clean).clamp(0.0, 100.0);
    }

    pub(crate) fn lowest(&self) -> f32 {
        self.hunger.min(self.happy).min(self.energy).min(self.clean)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct VitalDelta {
    pub(crate) hunger: f32,
    pub(crate) happy: f32,
    pub(crate) energy: f32,
    pub(crate) clean: f32,
}

impl VitalDelta {
    pub(crate) fn scaled(self, k: f32) -> Self {
        Self {
            hunger: self.hunger * k,
            happy: self.happy * k,
            energy: self.energy * k,
            clean: self.clean * k,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CosmeticSlot {
    Accessory,
    Shell,
}

/// Built-in slot values that need no purchase.
pub(crate) const ACCESSORY_NONE: &str = "none";
pub(crate) const SHELL_DEFAULT: &str = "default";

/// Cosmetic ownership and the two equip slots. Ownership is append-only;
/// an item may only be equipped if owned or a built-in default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Wardrobe {
    #[serde(default)]
    pub(crate) owned_accessories: BTreeSet<String>,
    #[serde(default)]
    pub(crate) owned_shells: BTreeSet<String>,
    #[serde(default = "default_accessory")]
    pub(crate) accessory: String,
    #[serde(default = "default_shell")]
    pub(crate) shell: String,
}

fn default_accessory() -> String {
    ACCESSORY_NONE.to_string()
}

fn default_shell() -> String {
    SHELL_DEFAULT.to_string()
}

impl Default for Wardrobe {
    fn default() -> Self {
        Self {
            owned_accessories: BTreeSet::new(),
            owned_shells: BTreeSet::new(),
            accessory: default_accessory(),
            shell: default_shell(),
        }
    }
}

impl Wardrobe {
    pub(crate) fn owns(&self, slot: CosmeticSlot, key: &str) -> bool {
        match slot {
            CosmeticSlot::Accessory => key == ACCESSORY_NONE || self.owned_accessories.contains(key),
            CosmeticSlot::Shell => key == SHELL_DEFAULT || self.owned_shells.contains(key),
        }
    }

    pub(crate) fn own(&mut self, slot: CosmeticSlot, key: &str) {
        match slot {
            CosmeticSlot::Accessory => {
                self.owned_accessories.insert(key.to_string());
            }
            CosmeticSlot::Shell => {
                self.owned_shells.insert(key.to_string());
            }
        }
    }

    /// Returns false (slot untouched) when the key is neither owned nor a
    /// built-in default.
    pub(crate) fn equip(&mut self, slot: CosmeticSlot, key: &str) -> bool {
        if !self.owns(slot, key) {
            return false;
        }
        match slot {
            CosmeticSlot::Accessory => self.accessory = key.to_string(),
            CosmeticSlot::Shell => self.shell = key.to_string(),
        }
        true
    }

    pub(crate) fn equipped(&self, slot: CosmeticSlot) -> &str {
        match slot {
            CosmeticSlot::Accessory => &self.accessory,
            CosmeticSlot::Shell => &self.shell,
        }
    }
}

/// Counter-based SplitMix64. Persisted with the pet so game randomness is
/// reproducible per save.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PetRng {
    pub(crate) seed: u64,
    pub(crate) draws: u64,
}

impl PetRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { seed, draws: 0 }
    }

    fn from_clock() -> Self {
        Self::new(Utc::now().timestamp_millis() as u64)
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut z = self.seed.wrapping_add(self.draws.wrapping_mul(0x9E3779B97F4A7C15));
        self.draws = self.draws.wrapping_add(1);

        z = z.wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    /// Uniform in [0,1).
    pub(crate) fn next_f32(&mut self) -> f32 {
        let v = self.next_u64() >> 40; // 24 bits
        (v as f32) / ((1u64 << 24) as f32)
    }

    /// Uniform in [lo,hi).
    pub(crate) fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.next_f32() * (hi - lo)
    }

    /// Uniform in 0..n (n > 0).
    pub(crate) fn pick(&mut self, n: u32) -> u32 {
        (self.next_u64() % n.max(1) as u64) as u32
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct LogEntry {
    pub(crate) at: DateTime<Utc>,
    pub(crate) text: String,
}

/// The sole persisted entity: everything the engine knows about one pet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PetState {
    #[serde(default = "default_name")]
    pub(crate) name: String,
    #[serde(default = "Utc::now")]
    pub(crate) created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub(crate) last_tick: DateTime<Utc>,
    #[serde(default)]
    pub(crate) asleep: bool,
    #[serde(default = "default_coins")]
    pub(crate) coins: u32,
    #[serde(default)]
    pub(crate) vitals: Vitals,
    #[serde(default)]
    pub(crate) wardrobe: Wardrobe,
    #[serde(default)]
    pub(crate) log: VecDeque<LogEntry>,
    #[serde(default)]
    pub(crate) city: Option<String>,
    #[serde(default = "PetRng::from_clock")]
    pub(crate) rng: PetRng,
}

fn default_name() -> String {
    "Pip".to_string()
}

fn default_coins() -> u32 {
    DEFAULT_COINS
}

impl PetState {
    pub(crate) fn new(now: DateTime<Utc>, seed: u64) -> Self {
        Self {
            name: default_name(),
            created_at: now,
            last_tick: now,
            asleep: false,
            coins: DEFAULT_COINS,
            vitals: Vitals::default(),
            wardrobe: Wardrobe::default(),
            log: VecDeque::new(),
            city: None,
            rng: PetRng::new(seed),
        }
    }

    /// Most-recent-first, capped; overflow silently drops the oldest.
    pub(crate) fn push_log(&mut self, at: DateTime<Utc>, text: impl Into<String>) {
        self.log.push_front(LogEntry {
            at,
            text: text.into(),
        });
        self.log.truncate(LOG_CAP);
    }

    pub(crate) fn mood(&self) -> Mood {
        if self.asleep {
            return Mood::Sleeping;
        }
        let v = &self.vitals;
        if v.hunger < 25.0 || v.happy < 25.0 {
            return Mood::Grumpy;
        }
        if v.energy < 25.0 {
            return Mood::Tired;
        }
        if v.clean < 25.0 {
            return Mood::Grimy;
        }
        if v.happy > 70.0 && v.hunger > 55.0 {
            return Mood::Happy;
        }
        Mood::Okay
    }

    pub(crate) fn age_label(&self, now: DateTime<Utc>) -> String {
        let secs = (now - self.created_at).num_seconds().max(0);
        let days = secs / 86400;
        let rem = secs % 86400;
        format!("{}d {:02}:{:02}", days, rem / 3600, (rem % 3600) / 60)
    }

    /// Trims and applies a new name; refuses empty or over-long input.
    pub(crate) fn rename(&mut self, raw: &str, now: DateTime<Utc>) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().count() > NAME_MAX {
            return false;
        }
        self.name = trimmed.to_string();
        self.push_log(now, format!("Now answering to {}", self.name));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_pet_defaults() {
        let p = PetState::new(t0(), 7);
        assert_eq!(p.coins, 10);
        assert_eq!(p.vitals.hunger, 75.0);
        assert_eq!(p.vitals.happy, 70.0);
        assert_eq!(p.vitals.energy, 75.0);
        assert_eq!(p.vitals.clean, 80.0);
        assert!(!p.asleep);
        assert!(p.log.is_empty());
        assert_eq!(p.wardrobe.accessory, ACCESSORY_NONE);
        assert_eq!(p.wardrobe.shell, SHELL_DEFAULT);
    }

    #[test]
    fn vitals_clamp_both_ends() {
        let mut v = Vitals::default();
        v.apply(VitalDelta {
            hunger: 1000.0,
            happy: -1000.0,
            energy: 0.0,
            clean: 0.0,
        });
        assert_eq!(v.hunger, 100.0);
        assert_eq!(v.happy, 0.0);
    }

    #[test]
    fn log_caps_at_twelve_dropping_oldest() {
        let mut p = PetState::new(t0(), 1);
        for i in 0..20 {
            p.push_log(t0(), format!("entry {i}"));
        }
        assert_eq!(p.log.len(), LOG_CAP);
        assert_eq!(p.log.front().unwrap().text, "entry 19");
        assert_eq!(p.log.back().unwrap().text, "entry 8");
    }

    #[test]
    fn equip_requires_ownership() {
        let mut w = Wardrobe::default();
        assert!(!w.equip(CosmeticSlot::Accessory, "tophat"));
        assert_eq!(w.accessory, ACCESSORY_NONE);

        w.own(CosmeticSlot::Accessory, "tophat");
        assert!(w.equip(CosmeticSlot::Accessory, "tophat"));
        assert_eq!(w.accessory, "tophat");

        // built-ins are always equippable
        assert!(w.equip(CosmeticSlot::Accessory, ACCESSORY_NONE));
        assert!(w.equip(CosmeticSlot::Shell, SHELL_DEFAULT));
    }

    #[test]
    fn rename_trims_and_bounds() {
        let mut p = PetState::new(t0(), 1);
        assert!(p.rename("  Bibbles  ", t0()));
        assert_eq!(p.name, "Bibbles");
        assert!(!p.rename("   ", t0()));
        assert!(!p.rename("averyveryverylongname", t0()));
        assert_eq!(p.name, "Bibbles");
    }

    #[test]
    fn age_label_formats_days_hours_minutes() {
        let p = PetState::new(t0(), 1);
        let later = t0() + chrono::Duration::seconds(3 * 86400 + 4 * 3600 + 27 * 60);
        assert_eq!(p.age_label(later), "3d 04:27");
        // clock moving backwards never yields a negative age
        assert_eq!(p.age_label(t0() - chrono::Duration::seconds(30)), "0d 00:00");
    }

    #[test]
    fn rng_is_deterministic_per_seed() {
        let mut a = PetRng::new(42);
        let mut b = PetRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let f = a.next_f32();
        assert!((0.0..1.0).contains(&f));
        let n = a.pick(9);
        assert!(n < 9);
    }
}
