use crate::model::{Mood, PetState};
use chrono::Local;
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub(crate) fn clear(&mut self) {
        for c in &mut self.cells {
            *c = Cell::default();
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }

    /// Audible advisory; the terminal's analog of the original beep.
    pub(crate) fn bell(&mut self) -> anyhow::Result<()> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(
            xx,
            y,
            Cell {
                ch,
                fg,
                bg: Color::Black,
            },
        );
    }
}

pub(crate) fn bar(value01: f32, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::new();
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

/// Everything the left panel needs, assembled by the app per frame.
pub(crate) struct Hud<'a> {
    pub(crate) state: &'a PetState,
    pub(crate) mood: Mood,
    pub(crate) age: String,
    pub(crate) clock: String,
    pub(crate) weather_line: String,
    pub(crate) bubble: Option<&'a str>,
    pub(crate) help_line: &'a str,
    pub(crate) sound_on: bool,
    pub(crate) color: bool,
}

fn tint(color_on: bool, c: Color) -> Color {
    if color_on {
        c
    } else {
        Color::White
    }
}

pub(crate) fn draw_hud(buf: &mut CellBuffer, hud: &Hud) {
    let fg = Color::White;
    let accent = tint(hud.color, Color::Cyan);
    let gold = tint(hud.color, Color::Yellow);

    let title = format!(
        "pocketpet  |  {} ({})  |  age {}  |  {}",
        hud.state.name,
        hud.mood.label(),
        hud.age,
        hud.clock
    );
    draw_text(buf, 1, 0, &title, accent);

    let v = hud.state.vitals;
    let rows = [
        ("Hunger", v.hunger),
        ("Happy ", v.happy),
        ("Energy", v.energy),
        ("Clean ", v.clean),
    ];
    for (i, (label, val)) in rows.iter().enumerate() {
        let warn = *val < crate::model::LOW_VITAL_WARN;
        let color = if warn { tint(hud.color, Color::Red) } else { fg };
        let line = format!("{label}: {} {:>5.1}", bar(*val / 100.0, 14), val);
        draw_text(buf, 1, 2 + i as u16, &line, color);
    }

    let coins = format!(
        "Coins: {}   Sound: {}   {}",
        hud.state.coins,
        if hud.sound_on { "on" } else { "off" },
        if hud.state.asleep { "(sleeping)" } else { "" }
    );
    draw_text(buf, 1, 7, &coins, gold);

    draw_text(buf, 1, 8, &hud.weather_line, fg);

    draw_text(buf, 1, 10, "Recent:", accent);
    for (i, entry) in hud.state.log.iter().take(crate::model::LOG_CAP).enumerate() {
        let stamp = entry.at.with_timezone(&Local).format("%H:%M");
        let line = format!("{stamp}  {}", entry.text);
        draw_text(buf, 1, 11 + i as u16, &line, Color::Grey);
    }

    if let Some(text) = hud.bubble {
        let y = buf.h.saturating_sub(3);
        draw_text(buf, 1, y, &format!("({text})"), gold);
    }

    draw_text(buf, 1, buf.h.saturating_sub(1), hud.help_line, Color::Grey);
}

/// Pet sprite with the equipped cosmetics layered in: accessory above the
/// head, shell pattern in the body rows, mouth and eyes from the mood.
pub(crate) fn draw_pet(
    buf: &mut CellBuffer,
    cx: i32,
    cy: i32,
    mood: Mood,
    accessory: &str,
    shell: &str,
    bob: i32,
    color_on: bool,
) {
    let eyes = match mood {
        Mood::Sleeping => "-   -",
        Mood::Tired => "=   =",
        _ => "o   o",
    };
    let mouth = match mood {
        Mood::Happy => "\\___/",
        Mood::Grumpy => "/---\\",
        Mood::Grimy => " ~~~ ",
        Mood::Sleeping => " zZ  ",
        _ => " ___ ",
    };
    let fill = match shell {
        "teal_shell" => '~',
        "star_shell" => '*',
        _ => ' ',
    };
    let hat = match accessory {
        "bow" => "><",
        "tophat" => "[=]",
        "crown" => "\\^/",
        _ => "",
    };

    let f = fill;
    let body = [
        "   .-\"\"\"-.   ".to_string(),
        format!("  /{f} {f} {f} {f}\\  "),
        format!(" |  {eyes}  | "),
        format!(" |  {mouth}  | "),
        format!("  \\{f} {f} {f} {f}/  "),
        "   '-...-'   ".to_string(),
    ];

    let body_fg = match shell {
        "teal_shell" => tint(color_on, Color::Cyan),
        "star_shell" => tint(color_on, Color::Yellow),
        _ => Color::White,
    };

    let w = 13i32;
    let x0 = cx - w / 2;
    let y0 = cy - 3 + bob;

    if !hat.is_empty() {
        let hx = cx - (hat.chars().count() as i32) / 2;
        blit(buf, hx, y0 - 1, hat, tint(color_on, Color::Yellow));
    }
    for (i, line) in body.iter().enumerate() {
        blit(buf, x0, y0 + i as i32, line, body_fg);
    }
}

fn blit(buf: &mut CellBuffer, x0: i32, y: i32, s: &str, fg: Color) {
    if y < 0 || y >= buf.h as i32 {
        return;
    }
    let mut x = x0;
    for ch in s.chars() {
        if x >= 0 && x < buf.w as i32 && ch != ' ' {
            buf.set(
                x as u16,
                y as u16,
                Cell {
                    ch,
                    fg,
                    bg: Color::Black,
                },
            );
        }
        x += 1;
    }
}

/// Bordered modal in the middle of the screen, sized to its content.
pub(crate) fn center_box(buf: &mut CellBuffer, title: &str, body: &str) {
    let content_w = body
        .lines()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0) as u16;
    let lines = body.lines().count() as u16;

    let bw = (content_w + 4).min(buf.w.saturating_sub(2)).max(20);
    let bh = (lines + 4).min(buf.h.saturating_sub(2));

    let x0 = (buf.w.saturating_sub(bw)) / 2;
    let y0 = (buf.h.saturating_sub(bh)) / 2;

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            let ch = if y == y0 || y == y0 + bh - 1 {
                if x == x0 {
                    if y == y0 {
                        '┌'
                    } else {
                        '└'
                    }
                } else if x == x0 + bw - 1 {
                    if y == y0 {
                        '┐'
                    } else {
                        '┘'
                    }
                } else {
                    '─'
                }
            } else if x == x0 || x == x0 + bw - 1 {
                '│'
            } else {
                ' '
            };
            buf.set(
                x,
                y,
                Cell {
                    ch,
                    fg: Color::White,
                    bg: Color::Black,
                },
            );
        }
    }

    draw_text(buf, x0 + 2, y0 + 1, title, Color::White);
    let mut yy = y0 + 3;
    for line in body.lines() {
        if yy >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, yy, line, Color::White);
        yy += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar(0.0, 4), "[    ]");
        assert_eq!(bar(1.0, 4), "[████]");
        assert_eq!(bar(0.5, 4), "[██  ]");
        // out-of-range input is clamped, never panics
        assert_eq!(bar(7.0, 4), "[████]");
        assert_eq!(bar(-1.0, 4), "[    ]");
    }

    #[test]
    fn cell_buffer_set_ignores_out_of_bounds() {
        let mut buf = CellBuffer::new(4, 2);
        buf.set(10, 10, Cell::default());
        buf.set(3, 1, Cell {
            ch: 'x',
            fg: Color::White,
            bg: Color::Black,
        });
        let i = buf.idx(3, 1);
        assert_eq!(buf.cells[i].ch, 'x');
    }
}
