use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::games::{
    award_coins, coin_pop_reward, reaction_reward, ReactionOutcome, COIN_POP_HOP_MS,
    COIN_POP_ROUND_SECS, REACTION_ARM_MAX_SECS, REACTION_ARM_MIN_SECS,
};
use crate::input::{collect_input_nonblocking, map_key, UiAction};
use crate::model::{PetState, NAME_MAX, TICK_CLAMP_SECS};
use crate::render::{center_box, draw_hud, draw_pet, Hud, Terminal};
use crate::shop::{buy_boost, buy_or_equip_cosmetic, ShopOutcome, BOOSTS, COSMETICS};
use crate::sim::{advance, apply_action, ActionOutcome};
use crate::storage::{catch_up, load_or_init, reset, save_atomic, snapshot};
use crate::weather::{spawn_lookup, WeatherEvent, WeatherReport};
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::Parser;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

const CITY_MAX: usize = 32;
const AUTOSAVE_SECS: u64 = 10;
const BUBBLE_MS: u64 = 2500;
const WARN_COOLDOWN_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "pocketpet")]
#[command(about = "A pocket pet that lives in your terminal")]
struct Cli {
    /// City for the weather panel (overrides the saved one)
    #[arg(long)]
    city: Option<String>,

    /// Monochrome output
    #[arg(long, default_value_t = false)]
    mono: bool,

    /// Frame cap override
    #[arg(long)]
    fps: Option<u32>,

    /// Discard any existing save and start over
    #[arg(long, default_value_t = false)]
    reset: bool,

    /// RNG seed for a fresh pet
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Main,
    Shop,
    Games,
    CoinPop,
    Reaction,
    Rename,
    City,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShopTab {
    Boosts,
    Cosmetics,
}

enum GameSession {
    CoinPop {
        ends_at: Instant,
        hop_at: Instant,
        pad: u8,
        hits: u32,
    },
    Reaction(ReactionPhase),
}

enum ReactionPhase {
    Armed { go_at: Instant },
    Go { since: Instant },
}

pub(crate) struct App {
    settings: Settings,
    paths: Paths,
    state: PetState,
    scene: Scene,
    term: Terminal,
    should_quit: bool,

    autosave_at: Instant,
    started: Instant,
    warn_at: Instant,
    tick_accum: Duration,
    bubble: Option<(String, Instant)>,

    shop_tab: ShopTab,
    shop_cursor: usize,
    text_edit: String,

    game: Option<GameSession>,

    weather_tx: Sender<WeatherEvent>,
    weather_rx: Receiver<WeatherEvent>,
    weather: Option<WeatherReport>,
    weather_err: Option<String>,
    weather_pending: bool,
}

impl App {
    fn init(cli: Cli) -> Result<Self> {
        let paths = project_paths()?;
        let mut settings = load_settings(&paths.settings_path);
        if cli.mono {
            settings.color = false;
        }
        if let Some(fps) = cli.fps {
            settings.fps_cap = fps;
        }

        let now = Utc::now();
        let seed = cli.seed.unwrap_or(now.timestamp_millis() as u64);

        let (mut state, last_seen) = if cli.reset {
            (reset(&paths, now, seed), None)
        } else {
            load_or_init(&paths, now, seed)
        };

        let mut bridged = 0.0;
        if let Some(last_seen) = last_seen {
            bridged = catch_up(&mut state, last_seen, now);
        }

        let (weather_tx, weather_rx) = channel();
        let mut weather_pending = false;
        let start_city = cli.city.or_else(|| state.city.clone());
        if let Some(city) = start_city {
            spawn_lookup(city, weather_tx.clone());
            weather_pending = true;
        }

        let term = Terminal::begin()?;
        let started = Instant::now();

        let mut app = Self {
            settings,
            paths,
            state,
            scene: Scene::Main,
            term,
            should_quit: false,
            autosave_at: started + Duration::from_secs(AUTOSAVE_SECS),
            started,
            warn_at: started,
            tick_accum: Duration::ZERO,
            bubble: None,
            shop_tab: ShopTab::Boosts,
            shop_cursor: 0,
            text_edit: String::new(),
            game: None,
            weather_tx,
            weather_rx,
            weather: None,
            weather_err: None,
            weather_pending,
        };

        if bridged >= 60.0 {
            app.set_bubble("Welcome back!");
        }
        Ok(app)
    }

    fn run_loop(&mut self) -> Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        let mut last_frame = Instant::now();

        while !self.should_quit {
            let _resized = self.term.resize_if_needed()?;

            let events = collect_input_nonblocking(frame_dt)?;
            for ev in events {
                if let Some(action) = map_key(self.scene, ev) {
                    self.handle(action)?;
                    if self.should_quit {
                        break;
                    }
                }
            }

            let now = Instant::now();
            let real_dt = now.saturating_duration_since(last_frame);
            last_frame = now;

            self.update_game(now);
            self.drain_weather();
            self.tick_engine(real_dt)?;

            if let Some((_, until)) = &self.bubble {
                if now >= *until {
                    self.bubble = None;
                }
            }

            self.render_frame()?;

            if Instant::now() >= self.autosave_at {
                self.save_now()?;
                self.autosave_at = Instant::now() + Duration::from_secs(AUTOSAVE_SECS);
            }

            spin_sleep(frame_dt, Instant::now());
        }

        self.save_now()?;
        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        Ok(())
    }

    /// The 1-second engine heartbeat. Elapsed wall time is accumulated and
    /// clamped before it reaches `advance`, per the decay contract.
    fn tick_engine(&mut self, real_dt: Duration) -> Result<()> {
        self.tick_accum = self.tick_accum.saturating_add(real_dt);
        if self.tick_accum < Duration::from_secs(1) {
            return Ok(());
        }
        let secs = self.tick_accum.as_secs_f32().min(TICK_CLAMP_SECS);
        self.tick_accum = Duration::ZERO;

        let report = advance(&mut self.state, secs);
        if report.low_vital && Instant::now() >= self.warn_at {
            self.warn_at = Instant::now() + Duration::from_secs(WARN_COOLDOWN_SECS);
            if self.settings.sound {
                self.term.bell()?;
            }
            self.set_bubble(format!("{} needs attention!", self.state.name));
        }
        Ok(())
    }

    fn game_open(&self) -> bool {
        self.game.is_some()
    }

    fn set_bubble(&mut self, text: impl Into<String>) {
        self.bubble = Some((text.into(), Instant::now() + Duration::from_millis(BUBBLE_MS)));
    }

    fn handle(&mut self, action: UiAction) -> Result<()> {
        let now_utc = Utc::now();
        match action {
            UiAction::Quit => self.should_quit = true,
            UiAction::Back => match self.scene {
                Scene::CoinPop | Scene::Reaction => {
                    // Leaving the stage cancels the session; no stale
                    // deadline can touch a later one.
                    self.game = None;
                    self.scene = Scene::Games;
                }
                Scene::Main => {}
                _ => self.scene = Scene::Main,
            },
            UiAction::Pet(act) => {
                let game_open = self.game_open();
                let outcome = apply_action(&mut self.state, act, game_open, now_utc);
                match outcome {
                    ActionOutcome::Done { phrase } => self.set_bubble(phrase),
                    ActionOutcome::Blocked(r) => self.set_bubble(r.message()),
                }
            }
            UiAction::OpenShop => {
                self.shop_cursor = 0;
                self.scene = Scene::Shop;
            }
            UiAction::OpenGames => self.scene = Scene::Games,
            UiAction::OpenRename => {
                self.text_edit = self.state.name.clone();
                self.scene = Scene::Rename;
            }
            UiAction::OpenCity => {
                self.text_edit = self.state.city.clone().unwrap_or_default();
                self.scene = Scene::City;
            }
            UiAction::OpenHelp => self.scene = Scene::Help,
            UiAction::ToggleSound => {
                self.settings.sound = !self.settings.sound;
                self.set_bubble(if self.settings.sound {
                    "Sound on"
                } else {
                    "Sound off"
                });
            }
            UiAction::NewPet => {
                let seed = now_utc.timestamp_millis() as u64;
                self.state = reset(&self.paths, now_utc, seed);
                self.game = None;
                self.scene = Scene::Main;
                self.set_bubble("A fresh start!");
            }
            UiAction::ShopSwitchTab => {
                self.shop_tab = match self.shop_tab {
                    ShopTab::Boosts => ShopTab::Cosmetics,
                    ShopTab::Cosmetics => ShopTab::Boosts,
                };
                self.shop_cursor = 0;
            }
            UiAction::ShopUp => {
                self.shop_cursor = self.shop_cursor.saturating_sub(1);
            }
            UiAction::ShopDown => {
                let len = match self.shop_tab {
                    ShopTab::Boosts => BOOSTS.len(),
                    ShopTab::Cosmetics => COSMETICS.len(),
                };
                self.shop_cursor = (self.shop_cursor + 1).min(len.saturating_sub(1));
            }
            UiAction::ShopBuy => {
                let game_open = self.game_open();
                let outcome = match self.shop_tab {
                    ShopTab::Boosts => {
                        let key = BOOSTS[self.shop_cursor].key;
                        buy_boost(&mut self.state, key, game_open, now_utc)
                    }
                    ShopTab::Cosmetics => {
                        let key = COSMETICS[self.shop_cursor].key;
                        buy_or_equip_cosmetic(&mut self.state, key, game_open, now_utc)
                    }
                };
                match outcome {
                    ShopOutcome::Bought { label } => self.set_bubble(format!("Got {label}!")),
                    ShopOutcome::Equipped { label } => self.set_bubble(format!("Wearing {label}")),
                    ShopOutcome::Blocked(r) => self.set_bubble(r.message()),
                    ShopOutcome::UnknownItem => {}
                }
            }
            UiAction::StartCoinPop => {
                let now = Instant::now();
                let pad = 1 + self.state.rng.pick(9) as u8;
                self.game = Some(GameSession::CoinPop {
                    ends_at: now + Duration::from_secs(COIN_POP_ROUND_SECS),
                    hop_at: now + Duration::from_millis(COIN_POP_HOP_MS),
                    pad,
                    hits: 0,
                });
                self.scene = Scene::CoinPop;
            }
            UiAction::StartReaction => {
                let delay = self
                    .state
                    .rng
                    .range_f32(REACTION_ARM_MIN_SECS, REACTION_ARM_MAX_SECS);
                self.game = Some(GameSession::Reaction(ReactionPhase::Armed {
                    go_at: Instant::now() + Duration::from_secs_f32(delay),
                }));
                self.scene = Scene::Reaction;
            }
            UiAction::Pad(n) => {
                if let Some(GameSession::CoinPop { hop_at, pad, hits, .. }) = &mut self.game {
                    if n == *pad {
                        *hits += 1;
                        *pad = 1 + self.state.rng.pick(9) as u8;
                        *hop_at = Instant::now() + Duration::from_millis(COIN_POP_HOP_MS);
                    }
                }
            }
            UiAction::Press => {
                let now = Instant::now();
                let result = match &self.game {
                    Some(GameSession::Reaction(ReactionPhase::Armed { .. })) => {
                        Some(ReactionOutcome::FalseStart)
                    }
                    Some(GameSession::Reaction(ReactionPhase::Go { since })) => {
                        Some(ReactionOutcome::Tapped {
                            millis: now.duration_since(*since).as_millis() as u64,
                        })
                    }
                    _ => None,
                };
                if let Some(outcome) = result {
                    self.finish_reaction(outcome, now_utc)?;
                }
            }
            UiAction::TextChar(ch) => {
                let limit = if self.scene == Scene::Rename {
                    NAME_MAX
                } else {
                    CITY_MAX
                };
                if self.text_edit.chars().count() < limit {
                    self.text_edit.push(ch);
                }
            }
            UiAction::TextBackspace => {
                self.text_edit.pop();
            }
            UiAction::TextCommit => match self.scene {
                Scene::Rename => {
                    if self.state.rename(&self.text_edit, now_utc) {
                        self.set_bubble(format!("Hi, {}!", self.state.name));
                    } else {
                        self.set_bubble("Pick a short, non-empty name");
                    }
                    self.scene = Scene::Main;
                }
                Scene::City => {
                    let city = self.text_edit.trim().to_string();
                    if !city.is_empty() {
                        spawn_lookup(city, self.weather_tx.clone());
                        self.weather_pending = true;
                        self.set_bubble("Checking the sky...");
                    }
                    self.scene = Scene::Main;
                }
                _ => {}
            },
        }
        Ok(())
    }

    fn finish_reaction(&mut self, outcome: ReactionOutcome, now_utc: DateTime<Utc>) -> Result<()> {
        let reward = reaction_reward(outcome);
        match outcome {
            ReactionOutcome::FalseStart => {
                award_coins(&mut self.state, 0.0, "false start", now_utc);
                self.set_bubble("False start!");
            }
            ReactionOutcome::Tapped { millis } => {
                award_coins(&mut self.state, reward as f64, "reaction", now_utc);
                self.set_bubble(format!("{millis} ms! +{reward} coins"));
                if self.settings.sound {
                    self.term.bell()?;
                }
            }
        }
        self.game = None;
        self.scene = Scene::Games;
        Ok(())
    }

    fn update_game(&mut self, now: Instant) {
        let mut finished_hits: Option<u32> = None;
        match &mut self.game {
            Some(GameSession::CoinPop {
                ends_at,
                hop_at,
                pad,
                hits,
            }) => {
                if now >= *ends_at {
                    finished_hits = Some(*hits);
                } else if now >= *hop_at {
                    *pad = 1 + self.state.rng.pick(9) as u8;
                    *hop_at = now + Duration::from_millis(COIN_POP_HOP_MS);
                }
            }
            Some(GameSession::Reaction(phase)) => {
                if let ReactionPhase::Armed { go_at } = phase {
                    if now >= *go_at {
                        // latency is measured from the scheduled go moment,
                        // not the frame that noticed it
                        *phase = ReactionPhase::Go { since: *go_at };
                    }
                }
            }
            None => {}
        }

        if let Some(hits) = finished_hits {
            let reward = coin_pop_reward(hits);
            award_coins(&mut self.state, reward as f64, "coin pop", Utc::now());
            self.set_bubble(format!("Coin Pop: {hits} hits, +{reward} coins"));
            self.game = None;
            self.scene = Scene::Games;
        }
    }

    fn drain_weather(&mut self) {
        while let Ok(event) = self.weather_rx.try_recv() {
            self.weather_pending = false;
            match event {
                WeatherEvent::Report(city, report) => {
                    self.state.city = Some(city);
                    self.state.push_log(
                        Utc::now(),
                        format!("{}: {:.1}°C, {}", report.label, report.temp_c, report.summary),
                    );
                    self.weather = Some(report);
                    self.weather_err = None;
                }
                WeatherEvent::Failed(msg) => {
                    self.weather_err = Some(msg);
                    self.set_bubble("Weather lookup failed");
                }
            }
        }
    }

    fn weather_line(&self) -> String {
        if self.weather_pending {
            return "Weather: fetching...".to_string();
        }
        if let Some(r) = &self.weather {
            return format!(
                "Weather: {}  {:.1}°C  wind {:.0} km/h  {}",
                r.label, r.temp_c, r.wind_kph, r.summary
            );
        }
        if let Some(e) = &self.weather_err {
            return format!("Weather: {e}").chars().take(70).collect();
        }
        "Weather: press w to set a city".to_string()
    }

    fn help_line(&self) -> &'static str {
        match self.scene {
            Scene::Main => {
                "f feed | p play | c clean | s sleep | b shop | g games | w weather | r rename | m sound | h help | q quit"
            }
            Scene::Shop => "Shop: tab switch | up/down select | enter buy | esc back",
            Scene::Games => "Games: 1 Coin Pop | 2 Reaction | esc back",
            Scene::CoinPop => "Coin Pop: press the pad number shown | esc cancel",
            Scene::Reaction => "Reaction: press space on GO | esc cancel",
            Scene::Rename => "Rename: type | enter save | esc cancel",
            Scene::City => "City: type | enter fetch | esc cancel",
            Scene::Help => "Help: esc back",
        }
    }

    fn render_frame(&mut self) -> Result<()> {
        self.term.cur.clear();

        let now_utc = Utc::now();
        let hud = Hud {
            state: &self.state,
            mood: self.state.mood(),
            age: self.state.age_label(now_utc),
            clock: Local::now().format("%H:%M:%S").to_string(),
            weather_line: self.weather_line(),
            bubble: self.bubble.as_ref().map(|(s, _)| s.as_str()),
            help_line: self.help_line(),
            sound_on: self.settings.sound,
            color: self.settings.color,
        };
        draw_hud(&mut self.term.cur, &hud);

        let cx = (self.term.cols as i32 * 2) / 3;
        let cy = (self.term.rows as i32) / 2;
        let bob = if self.state.asleep {
            0
        } else {
            ((self.started.elapsed().as_millis() / 600) % 2) as i32
        };
        draw_pet(
            &mut self.term.cur,
            cx,
            cy,
            self.state.mood(),
            &self.state.wardrobe.accessory,
            &self.state.wardrobe.shell,
            bob,
            self.settings.color,
        );

        match self.scene {
            Scene::Main => {}
            Scene::Shop => {
                let body = self.shop_body();
                center_box(&mut self.term.cur, "Shop", &body);
            }
            Scene::Games => {
                let body = format!(
                    "Coins: {}\n\n1) Coin Pop   15s of whack-a-pad\n2) Reaction   wait for GO, then tap\n\nEsc to go back",
                    self.state.coins
                );
                center_box(&mut self.term.cur, "Mini-games", &body);
            }
            Scene::CoinPop => {
                if let Some(GameSession::CoinPop { ends_at, pad, hits, .. }) = &self.game {
                    let left = ends_at.saturating_duration_since(Instant::now()).as_secs();
                    let body = format!(
                        "{}\n\nHits: {hits}   Time left: {left}s",
                        pad_grid(*pad)
                    );
                    center_box(&mut self.term.cur, "Coin Pop", &body);
                }
            }
            Scene::Reaction => {
                if let Some(GameSession::Reaction(phase)) = &self.game {
                    let body = match phase {
                        ReactionPhase::Armed { .. } => {
                            "Wait for it...\n\n(pressing early is a false start)"
                        }
                        ReactionPhase::Go { .. } => "GO! Press space NOW!",
                    };
                    center_box(&mut self.term.cur, "Reaction", body);
                }
            }
            Scene::Rename => {
                let body = format!(
                    "Type a name (max {NAME_MAX} chars).\n\nName: {}_\n\nEnter save | Esc cancel",
                    self.text_edit
                );
                center_box(&mut self.term.cur, "Rename pet", &body);
            }
            Scene::City => {
                let body = format!(
                    "Which city's sky should we watch?\n\nCity: {}_\n\nEnter fetch | Esc cancel",
                    self.text_edit
                );
                center_box(&mut self.term.cur, "Weather city", &body);
            }
            Scene::Help => {
                center_box(
                    &mut self.term.cur,
                    "How to play",
                    "Keep the four meters out of the red.\n\n\
                     f Feed: +hunger, a little messy.\n\
                     p Play: +happy, tires and hungers, earns coins.\n\
                     c Clean: scrub up, slightly annoying.\n\
                     s Sleep: restores energy; most actions pause.\n\n\
                     b Shop: boosts are one-shot, cosmetics are forever.\n\
                     g Games: earn coins with Coin Pop and Reaction.\n\
                     w Weather: type a city, the sky shows up in the panel.\n\
                     ctrl-n starts over with a brand-new pet.\n\n\
                     Esc closes this.",
                );
            }
        }

        self.term.present()?;
        Ok(())
    }

    fn shop_body(&self) -> String {
        let mut out = String::new();
        let tab = match self.shop_tab {
            ShopTab::Boosts => "[Boosts]  Cosmetics ",
            ShopTab::Cosmetics => " Boosts  [Cosmetics]",
        };
        out.push_str(&format!("{tab}      Coins: {}\n\n", self.state.coins));

        match self.shop_tab {
            ShopTab::Boosts => {
                for (i, b) in BOOSTS.iter().enumerate() {
                    let cursor = if i == self.shop_cursor { '>' } else { ' ' };
                    out.push_str(&format!("{cursor} {:<12} {:>3}c\n", b.label, b.price));
                }
            }
            ShopTab::Cosmetics => {
                for (i, c) in COSMETICS.iter().enumerate() {
                    let cursor = if i == self.shop_cursor { '>' } else { ' ' };
                    let owned = self.state.wardrobe.owns(c.slot, c.key);
                    let equipped = self.state.wardrobe.equipped(c.slot) == c.key;
                    let mark = if equipped {
                        "(worn)"
                    } else if owned {
                        "(owned)"
                    } else {
                        ""
                    };
                    out.push_str(&format!(
                        "{cursor} {:<12} {:>3}c {mark}\n",
                        c.label, c.price
                    ));
                }
            }
        }
        out
    }

    fn save_now(&self) -> Result<()> {
        let save = snapshot(&self.state, Utc::now());
        save_atomic(&self.paths.save_path, &save)?;
        Ok(())
    }
}

fn pad_grid(target: u8) -> String {
    let mut out = String::new();
    for row in 0u8..3 {
        for col in 0u8..3 {
            let n = row * 3 + col + 1;
            if n == target {
                out.push_str("[◉]");
            } else {
                out.push_str(&format!("[{n}]"));
            }
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

pub(crate) fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut app = App::init(cli)?;
    app.run_loop()?;
    Ok(())
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
