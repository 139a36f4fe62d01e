use crate::app::Scene;
use crate::sim::PetAction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        match event::read()? {
            Event::Key(k) => {
                if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                    out.push(InputEvent {
                        key: k.code,
                        mods: k.modifiers,
                    });
                    if out.len() >= 32 {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UiAction {
    Pet(PetAction),
    OpenShop,
    OpenGames,
    OpenRename,
    OpenCity,
    OpenHelp,
    ToggleSound,
    NewPet,
    Back,
    Quit,

    ShopSwitchTab,
    ShopUp,
    ShopDown,
    ShopBuy,

    StartCoinPop,
    StartReaction,
    Pad(u8),
    Press,

    TextChar(char),
    TextBackspace,
    TextCommit,
}

pub(crate) fn map_key(scene: Scene, ev: InputEvent) -> Option<UiAction> {
    // Text-entry scenes swallow printable keys before any global binding.
    if matches!(scene, Scene::Rename | Scene::City) {
        return match ev.key {
            KeyCode::Enter => Some(UiAction::TextCommit),
            KeyCode::Esc => Some(UiAction::Back),
            KeyCode::Backspace => Some(UiAction::TextBackspace),
            KeyCode::Char(ch) => {
                if ch.is_ascii() && !ch.is_ascii_control() {
                    Some(UiAction::TextChar(ch))
                } else {
                    None
                }
            }
            _ => None,
        };
    }

    if matches!(ev.key, KeyCode::Char('n') | KeyCode::Char('N'))
        && ev.mods.contains(KeyModifiers::CONTROL)
    {
        return Some(UiAction::NewPet);
    }
    if ev.key == KeyCode::Esc {
        return Some(UiAction::Back);
    }

    match scene {
        Scene::Main => match ev.key {
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(UiAction::Quit),
            KeyCode::Char('f') | KeyCode::Char('F') => Some(UiAction::Pet(PetAction::Feed)),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(UiAction::Pet(PetAction::Play)),
            KeyCode::Char('c') | KeyCode::Char('C') => Some(UiAction::Pet(PetAction::Clean)),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(UiAction::Pet(PetAction::ToggleSleep)),
            KeyCode::Char('b') | KeyCode::Char('B') => Some(UiAction::OpenShop),
            KeyCode::Char('g') | KeyCode::Char('G') => Some(UiAction::OpenGames),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(UiAction::OpenRename),
            KeyCode::Char('w') | KeyCode::Char('W') => Some(UiAction::OpenCity),
            KeyCode::Char('h') | KeyCode::Char('H') => Some(UiAction::OpenHelp),
            KeyCode::Char('m') | KeyCode::Char('M') => Some(UiAction::ToggleSound),
            _ => None,
        },
        Scene::Shop => match ev.key {
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => Some(UiAction::ShopSwitchTab),
            KeyCode::Up => Some(UiAction::ShopUp),
            KeyCode::Down => Some(UiAction::ShopDown),
            KeyCode::Enter => Some(UiAction::ShopBuy),
            _ => None,
        },
        Scene::Games => match ev.key {
            KeyCode::Char('1') => Some(UiAction::StartCoinPop),
            KeyCode::Char('2') => Some(UiAction::StartReaction),
            _ => None,
        },
        Scene::CoinPop => match ev.key {
            KeyCode::Char(ch @ '1'..='9') => Some(UiAction::Pad(ch as u8 - b'0')),
            _ => None,
        },
        Scene::Reaction => match ev.key {
            KeyCode::Char(' ') | KeyCode::Enter => Some(UiAction::Press),
            _ => None,
        },
        Scene::Help => match ev.key {
            KeyCode::Char('h') | KeyCode::Char('H') => Some(UiAction::Back),
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(UiAction::Quit),
            _ => None,
        },
        Scene::Rename | Scene::City => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(key: KeyCode) -> InputEvent {
        InputEvent {
            key,
            mods: KeyModifiers::NONE,
        }
    }

    #[test]
    fn main_scene_pet_keys() {
        assert_eq!(
            map_key(Scene::Main, ev(KeyCode::Char('f'))),
            Some(UiAction::Pet(PetAction::Feed))
        );
        assert_eq!(
            map_key(Scene::Main, ev(KeyCode::Char('s'))),
            Some(UiAction::Pet(PetAction::ToggleSleep))
        );
        assert_eq!(map_key(Scene::Main, ev(KeyCode::Char('q'))), Some(UiAction::Quit));
    }

    #[test]
    fn text_scenes_swallow_action_keys() {
        assert_eq!(
            map_key(Scene::Rename, ev(KeyCode::Char('q'))),
            Some(UiAction::TextChar('q'))
        );
        assert_eq!(
            map_key(Scene::City, ev(KeyCode::Char('f'))),
            Some(UiAction::TextChar('f'))
        );
        assert_eq!(map_key(Scene::City, ev(KeyCode::Enter)), Some(UiAction::TextCommit));
        assert_eq!(map_key(Scene::Rename, ev(KeyCode::Esc)), Some(UiAction::Back));
    }

    #[test]
    fn coin_pop_pads() {
        assert_eq!(map_key(Scene::CoinPop, ev(KeyCode::Char('5'))), Some(UiAction::Pad(5)));
        assert_eq!(map_key(Scene::CoinPop, ev(KeyCode::Char('0'))), None);
    }

    #[test]
    fn esc_backs_out_everywhere() {
        for scene in [Scene::Shop, Scene::Games, Scene::CoinPop, Scene::Reaction, Scene::Help] {
            assert_eq!(map_key(scene, ev(KeyCode::Esc)), Some(UiAction::Back));
        }
    }
}
