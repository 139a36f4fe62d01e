use crate::model::{CosmeticSlot, PetState, VitalDelta};
use crate::sim::{can_act, Refusal};
use chrono::{DateTime, Utc};

/// Consumable: immediate vital delta, never tracked in the wardrobe.
pub(crate) struct BoostItem {
    pub(crate) key: &'static str,
    pub(crate) label: &'static str,
    pub(crate) price: u32,
    pub(crate) effect: VitalDelta,
}

/// Durable: owned once purchased, one equippable per slot.
pub(crate) struct CosmeticItem {
    pub(crate) key: &'static str,
    pub(crate) label: &'static str,
    pub(crate) price: u32,
    pub(crate) slot: CosmeticSlot,
}

pub(crate) const BOOSTS: &[BoostItem] = &[
    BoostItem {
        key: "snack",
        label: "Snack Pack",
        price: 4,
        effect: VitalDelta {
            hunger: 10.0,
            happy: 0.0,
            energy: 0.0,
            clean: 0.0,
        },
    },
    BoostItem {
        key: "tonic",
        label: "Zesty Tonic",
        price: 7,
        effect: VitalDelta {
            hunger: 0.0,
            happy: 0.0,
            energy: 22.0,
            clean: 0.0,
        },
    },
    BoostItem {
        key: "bubble_bath",
        label: "Bubble Bath",
        price: 5,
        effect: VitalDelta {
            hunger: 0.0,
            happy: 0.0,
            energy: 0.0,
            clean: 18.0,
        },
    },
    BoostItem {
        key: "party_horn",
        label: "Party Horn",
        price: 6,
        effect: VitalDelta {
            hunger: 0.0,
            happy: 15.0,
            energy: 0.0,
            clean: 0.0,
        },
    },
];

pub(crate) const COSMETICS: &[CosmeticItem] = &[
    CosmeticItem {
        key: "bow",
        label: "Red Bow",
        price: 12,
        slot: CosmeticSlot::Accessory,
    },
    CosmeticItem {
        key: "tophat",
        label: "Top Hat",
        price: 18,
        slot: CosmeticSlot::Accessory,
    },
    CosmeticItem {
        key: "crown",
        label: "Tiny Crown",
        price: 30,
        slot: CosmeticSlot::Accessory,
    },
    CosmeticItem {
        key: "teal_shell",
        label: "Teal Shell",
        price: 15,
        slot: CosmeticSlot::Shell,
    },
    CosmeticItem {
        key: "star_shell",
        label: "Star Shell",
        price: 25,
        slot: CosmeticSlot::Shell,
    },
];

pub(crate) fn boost(key: &str) -> Option<&'static BoostItem> {
    BOOSTS.iter().find(|b| b.key == key)
}

pub(crate) fn cosmetic(key: &str) -> Option<&'static CosmeticItem> {
    COSMETICS.iter().find(|c| c.key == key)
}

/// Which slot a cosmetic key belongs to, if any. Used by save migration.
pub(crate) fn slot_of(key: &str) -> Option<CosmeticSlot> {
    cosmetic(key).map(|c| c.slot)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ShopOutcome {
    Bought { label: &'static str },
    Equipped { label: &'static str },
    Blocked(Refusal),
    UnknownItem,
}

pub(crate) fn buy_boost(
    state: &mut PetState,
    key: &str,
    game_open: bool,
    now: DateTime<Utc>,
) -> ShopOutcome {
    let Some(item) = boost(key) else {
        return ShopOutcome::UnknownItem;
    };
    if let Err(r) = can_act(state, game_open) {
        return ShopOutcome::Blocked(r);
    }
    if state.coins < item.price {
        return ShopOutcome::Blocked(Refusal::NotEnoughCoins);
    }

    state.coins -= item.price;
    state.vitals.apply(item.effect);
    state.push_log(now, format!("Used {} (-{} coins)", item.label, item.price));
    ShopOutcome::Bought { label: item.label }
}

/// First purchase deducts the price and records ownership; from then on the
/// same call is a free, idempotent equip.
pub(crate) fn buy_or_equip_cosmetic(
    state: &mut PetState,
    key: &str,
    game_open: bool,
    now: DateTime<Utc>,
) -> ShopOutcome {
    let Some(item) = cosmetic(key) else {
        return ShopOutcome::UnknownItem;
    };
    if let Err(r) = can_act(state, game_open) {
        return ShopOutcome::Blocked(r);
    }

    if !state.wardrobe.owns(item.slot, item.key) {
        if state.coins < item.price {
            return ShopOutcome::Blocked(Refusal::NotEnoughCoins);
        }
        state.coins -= item.price;
        state.wardrobe.own(item.slot, item.key);
        state.push_log(now, format!("Bought {} (-{} coins)", item.label, item.price));
        state.wardrobe.equip(item.slot, item.key);
        return ShopOutcome::Bought { label: item.label };
    }

    state.wardrobe.equip(item.slot, item.key);
    ShopOutcome::Equipped { label: item.label }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn pet() -> PetState {
        PetState::new(t0(), 42)
    }

    #[test]
    fn boost_underfunded_is_blocked_without_mutation() {
        let mut p = pet();
        p.coins = 5;
        let before = p.clone();
        let out = buy_boost(&mut p, "tonic", false, t0()); // priced 7
        assert_eq!(out, ShopOutcome::Blocked(Refusal::NotEnoughCoins));
        assert_eq!(p, before);
        assert_eq!(p.coins, 5);
    }

    #[test]
    fn boost_purchase_deducts_and_applies() {
        let mut p = pet();
        p.coins = 9;
        p.vitals.energy = 50.0;
        let out = buy_boost(&mut p, "tonic", false, t0());
        assert_eq!(out, ShopOutcome::Bought { label: "Zesty Tonic" });
        assert_eq!(p.coins, 2);
        assert!((p.vitals.energy - 72.0).abs() < 1e-3);
        assert!(p.log.front().unwrap().text.contains("Zesty Tonic"));
    }

    #[test]
    fn boost_effect_clamps() {
        let mut p = pet();
        p.vitals.clean = 95.0;
        buy_boost(&mut p, "bubble_bath", false, t0());
        assert_eq!(p.vitals.clean, 100.0);
    }

    #[test]
    fn asleep_blocks_shop() {
        let mut p = pet();
        p.asleep = true;
        let before = p.clone();
        assert_eq!(
            buy_boost(&mut p, "snack", false, t0()),
            ShopOutcome::Blocked(Refusal::Asleep)
        );
        assert_eq!(
            buy_or_equip_cosmetic(&mut p, "bow", false, t0()),
            ShopOutcome::Blocked(Refusal::Asleep)
        );
        assert_eq!(p, before);
    }

    #[test]
    fn game_session_blocks_shop() {
        let mut p = pet();
        assert_eq!(
            buy_boost(&mut p, "snack", true, t0()),
            ShopOutcome::Blocked(Refusal::GameOpen)
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut p = pet();
        let before = p.clone();
        assert_eq!(buy_boost(&mut p, "nope", false, t0()), ShopOutcome::UnknownItem);
        assert_eq!(
            buy_or_equip_cosmetic(&mut p, "nope", false, t0()),
            ShopOutcome::UnknownItem
        );
        assert_eq!(p, before);
    }

    #[test]
    fn cosmetic_buy_then_earn_then_succeed() {
        let mut p = pet();
        p.coins = 10;
        let out = buy_or_equip_cosmetic(&mut p, "tophat", false, t0()); // priced 18
        assert_eq!(out, ShopOutcome::Blocked(Refusal::NotEnoughCoins));
        assert_eq!(p.coins, 10);
        assert!(!p.wardrobe.owns(CosmeticSlot::Accessory, "tophat"));

        p.coins += 8;
        let out = buy_or_equip_cosmetic(&mut p, "tophat", false, t0());
        assert_eq!(out, ShopOutcome::Bought { label: "Top Hat" });
        assert_eq!(p.coins, 0);
        assert!(p.wardrobe.owns(CosmeticSlot::Accessory, "tophat"));
        assert_eq!(p.wardrobe.accessory, "tophat");
    }

    #[test]
    fn re_equip_is_free_and_idempotent() {
        let mut p = pet();
        p.coins = 40;
        buy_or_equip_cosmetic(&mut p, "teal_shell", false, t0());
        assert_eq!(p.coins, 25);

        let before = p.clone();
        let out = buy_or_equip_cosmetic(&mut p, "teal_shell", false, t0());
        assert_eq!(out, ShopOutcome::Equipped { label: "Teal Shell" });
        assert_eq!(p, before);

        // switching between two owned shells costs nothing further
        buy_or_equip_cosmetic(&mut p, "star_shell", false, t0());
        assert_eq!(p.coins, 0);
        buy_or_equip_cosmetic(&mut p, "teal_shell", false, t0());
        assert_eq!(p.coins, 0);
        assert_eq!(p.wardrobe.shell, "teal_shell");
        assert!(p.wardrobe.owns(CosmeticSlot::Shell, "star_shell"));
    }

    #[test]
    fn catalog_keys_resolve() {
        for b in BOOSTS {
            assert!(boost(b.key).is_some());
        }
        for c in COSMETICS {
            assert_eq!(slot_of(c.key), Some(c.slot));
        }
        assert_eq!(slot_of("snack"), None);
    }
}
