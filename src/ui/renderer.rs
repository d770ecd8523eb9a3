/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// World units map onto terminal cells. With a terminal-derived viewport
/// one column is 8 units and one row is 16, so the 32 × 32 player is a
/// 4 × 2 glyph block. A fixed `[viewport]` is scaled to fit instead.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::config::ViewportConfig;
use crate::domain::entity::Facing;
use crate::domain::layout::{PlatformKind, Viewport};
use crate::engine::scene::{ArcadeScene, Hud, ModalView};
use crate::sim::stage::Stage;

/// World units per terminal column / row for a terminal-derived viewport.
pub const UNITS_PER_COL: f64 = 8.0;
pub const UNITS_PER_ROW: f64 = 16.0;

/// Rows not available to the playfield: HUD, gap, help bar, bottom margin.
pub const RESERVED_ROWS: usize = 4;

const HUD_ROW: usize = 0;
const FIELD_ROW: usize = 1;

/// Viewport in world units for a terminal of `cols × rows`, unless config pins it.
pub fn viewport_for(cols: u16, rows: u16, cfg: &ViewportConfig) -> Viewport {
    let field_rows = (rows as usize).saturating_sub(RESERVED_ROWS).max(1);
    Viewport::new(
        cfg.width.unwrap_or(cols.max(1) as f64 * UNITS_PER_COL),
        cfg.height.unwrap_or(field_rows as f64 * UNITS_PER_ROW),
    )
}

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so row gaps
    /// on VTE terminals match the cell color.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    /// Signed variant for world-projected positions that may fall off-screen.
    fn set_i(&mut self, x: i64, y: i64, cell: Cell) {
        if x >= 0 && y >= 0 {
            self.set(x as usize, y as usize, cell);
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Projection: world units → terminal cells ──

#[derive(Clone, Copy, Debug)]
struct Projection {
    cam_x: f64,
    cam_y: f64,
    units_per_col: f64,
    units_per_row: f64,
    cols: i64,
    rows: i64,
}

impl Projection {
    fn new(scene: &ArcadeScene, cols: usize, rows: usize) -> Self {
        let vp = scene.viewport();
        let cols = cols.max(1);
        let rows = rows.max(1);
        Projection {
            cam_x: scene.camera_x(),
            cam_y: scene.shake_offset().1,
            units_per_col: vp.width / cols as f64,
            units_per_row: vp.height / rows as f64,
            cols: cols as i64,
            rows: rows as i64,
        }
    }

    fn col(&self, wx: f64) -> i64 {
        ((wx - self.cam_x) / self.units_per_col).floor() as i64
    }

    fn row(&self, wy: f64) -> i64 {
        FIELD_ROW as i64 + ((wy - self.cam_y) / self.units_per_row).floor() as i64
    }

    /// Half-open column span covering `[left, right)`.
    fn col_span(&self, left: f64, right: f64) -> (i64, i64) {
        let end = ((right - self.cam_x) / self.units_per_col).ceil() as i64;
        (self.col(left), end.max(self.col(left) + 1))
    }

    fn row_span(&self, top: f64, bottom: f64) -> (i64, i64) {
        let end = FIELD_ROW as i64 + ((bottom - self.cam_y) / self.units_per_row).ceil() as i64;
        (self.row(top), end.max(self.row(top) + 1))
    }

    fn in_field(&self, col: i64, row: i64) -> bool {
        col >= 0 && col < self.cols && row >= FIELD_ROW as i64 && row < FIELD_ROW as i64 + self.rows
    }
}

// ── Sprites ──

/// Player sprite sheet, drawn facing right; 4 × 2 cells per frame.
const IDLE_FRAMES: [[&str; 2]; 2] = [
    ["[•_]", "/||\\"],
    ["[•_]", " || "],
];
const WALK_FRAMES: [[&str; 2]; 4] = [
    ["[•_]", " /| "],
    ["[•_]", " || "],
    ["[•_]", " |\\ "],
    ["[•_]", " || "],
];

/// Mirror a sprite row for left-facing frames.
fn mirror(row: &str) -> String {
    row.chars()
        .rev()
        .map(|c| match c {
            '/' => '\\',
            '\\' => '/',
            '[' => ']',
            ']' => '[',
            other => other,
        })
        .collect()
}

/// Greedy word wrap; words longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = vec![];
    let mut line = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        let needed = if line.is_empty() { word.chars().count() } else { line.chars().count() + 1 + word.chars().count() };
        if needed > width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    modal_shown: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            modal_shown: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns the terminal size.
    pub fn init(&mut self) -> io::Result<(u16, u16)> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok((tw, th))
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, scene: &ArcadeScene) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Modal open/close → clean repaint so no box remnants survive
        let modal_shown = scene.hud().modal.is_some();
        if modal_shown != self.modal_shown {
            self.back.cells.fill(Cell::INVALID);
            self.modal_shown = modal_shown;
        }

        self.compose(scene);
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors, never ResetColor (terminal default may differ from BASE_BG).
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn field_rows(&self) -> usize {
        self.front.height.saturating_sub(RESERVED_ROWS).max(1)
    }

    fn compose(&mut self, scene: &ArcadeScene) {
        self.front.clear();
        let proj = Projection::new(scene, self.front.width, self.field_rows());

        self.compose_hills(scene, &proj);
        self.compose_platforms(scene, &proj);
        self.compose_coins(scene, &proj);
        self.compose_player(scene, &proj);
        self.compose_hud(scene.hud());
        self.compose_help();

        if let Some(modal) = &scene.hud().modal {
            self.compose_modal(modal);
        } else if scene.hud().finished {
            self.compose_finished(scene.hud());
        }
    }

    /// Rolling hills behind everything, scrolled at the parallax rate.
    fn compose_hills(&mut self, scene: &ArcadeScene, proj: &Projection) {
        let hill = Color::Rgb { r: 40, g: 70, b: 55 };
        let rows = proj.rows as f64;
        for col in 0..proj.cols {
            let hx = scene.parallax_x() + col as f64 * proj.units_per_col;
            let frac = 0.22 + 0.10 * (hx / 90.0).sin() + 0.05 * (hx / 37.0).sin();
            let height = (frac * rows).round().max(0.0) as i64;
            for r in (proj.rows - height).max(0)..proj.rows {
                self.front.set_i(col, FIELD_ROW as i64 + r, Cell::new('░', hill, Color::Reset));
            }
        }
    }

    fn compose_platforms(&mut self, scene: &ArcadeScene, proj: &Projection) {
        for p in scene.platforms() {
            let (fill, top, fg) = match p.placement.kind {
                PlatformKind::Ground => ('▓', '█', Color::Rgb { r: 150, g: 100, b: 60 }),
                PlatformKind::Floating => ('▒', '▀', Color::Rgb { r: 120, g: 170, b: 200 }),
            };
            let grass = Color::Rgb { r: 90, g: 190, b: 90 };
            let (c0, c1) = proj.col_span(p.aabb.left(), p.aabb.right());
            let (r0, r1) = proj.row_span(p.aabb.top(), p.aabb.bottom());
            for row in r0..r1 {
                for col in c0..c1 {
                    if !proj.in_field(col, row) { continue; }
                    let cell = if row == r0 {
                        Cell::new(top, if p.placement.kind == PlatformKind::Ground { grass } else { fg }, Color::Reset)
                    } else {
                        Cell::new(fill, fg, Color::Reset)
                    };
                    self.front.set_i(col, row, cell);
                }
            }
        }
    }

    fn compose_coins(&mut self, scene: &ArcadeScene, proj: &Projection) {
        let gold = Color::Rgb { r: 255, g: 210, b: 60 };
        for coin in scene.coins().iter().filter(|c| c.active) {
            let (x, y) = coin.body.position();
            let (col, row) = (proj.col(x), proj.row(y));
            if proj.in_field(col, row) {
                self.front.set_i(col, row, Cell::new('◉', gold, Color::Reset));
            }
        }
    }

    fn compose_player(&mut self, scene: &ArcadeScene, proj: &Projection) {
        let body = scene.player();
        let frame = scene.player_frame() as usize;
        let sprite = if scene.is_walking() {
            WALK_FRAMES[frame % WALK_FRAMES.len()]
        } else {
            IDLE_FRAMES[frame % IDLE_FRAMES.len()]
        };
        let c0 = proj.col(body.aabb.left());
        let r0 = proj.row(body.aabb.top());
        let color = Color::Rgb { r: 255, g: 140, b: 90 };

        for (dy, row) in sprite.iter().enumerate() {
            let row = match scene.facing() {
                Facing::Right => row.to_string(),
                Facing::Left => mirror(row),
            };
            for (dx, ch) in row.chars().enumerate() {
                let (col, r) = (c0 + dx as i64, r0 + dy as i64);
                if ch != ' ' && proj.in_field(col, r) {
                    self.front.set_i(col, r, Cell::new(ch, color, Color::Reset));
                }
            }
        }
    }

    fn compose_hud(&mut self, hud: &Hud) {
        let bg = Color::Rgb { r: 20, g: 20, b: 60 };
        self.front.fill_row(HUD_ROW, bg);
        let text = format!(" Score: {:<5}  Level: {}", hud.score, hud.level_name);
        self.front.put_str(0, HUD_ROW, &text, Color::White, bg);
    }

    fn compose_help(&mut self) {
        let row = FIELD_ROW + self.field_rows() + 1;
        let help = " ←/→ A/D: Run   ↑/W/Space: Jump   Enter/Esc: Continue   Q: Quit";
        self.front.put_str(0, row, help, Color::DarkGrey, Color::Reset);
    }

    /// Centered box sized to its content, clipped to the playfield.
    fn draw_box(&mut self, inner_w: usize, lines: &[(String, Color)], border: Color, bg: Color) {
        let box_w = (inner_w + 4).min(self.front.width);
        let box_h = (lines.len() + 2).min(self.field_rows());
        let x0 = (self.front.width.saturating_sub(box_w)) / 2;
        let y0 = FIELD_ROW + (self.field_rows().saturating_sub(box_h)) / 2;
        if box_w < 2 || box_h < 2 { return; }

        for y in y0..y0 + box_h {
            for x in x0..x0 + box_w {
                let ch = match (y == y0, y == y0 + box_h - 1, x == x0, x == x0 + box_w - 1) {
                    (true, _, true, _) => '┌',
                    (true, _, _, true) => '┐',
                    (_, true, true, _) => '└',
                    (_, true, _, true) => '┘',
                    (true, _, _, _) | (_, true, _, _) => '─',
                    (_, _, true, _) | (_, _, _, true) => '│',
                    _ => ' ',
                };
                self.front.set(x, y, Cell::new(ch, border, bg));
            }
        }
        for (i, (text, fg)) in lines.iter().take(box_h - 2).enumerate() {
            let clipped: String = text.chars().take(box_w.saturating_sub(4)).collect();
            self.front.put_str(x0 + 2, y0 + 1 + i, &clipped, *fg, bg);
        }
    }

    fn compose_modal(&mut self, modal: &ModalView) {
        let bg = Color::Rgb { r: 34, g: 34, b: 54 };
        let title_c = Color::Rgb { r: 255, g: 220, b: 50 };
        let text_c = Color::Rgb { r: 220, g: 220, b: 220 };
        let hint_c = Color::Rgb { r: 100, g: 200, b: 255 };

        let inner_w = 60.min(self.front.width.saturating_sub(8)).max(10);
        let mut lines = vec![(modal.title.clone(), title_c), (String::new(), text_c)];
        for line in &modal.lines {
            lines.extend(wrap(line, inner_w).into_iter().map(|l| (l, text_c)));
        }
        lines.push((String::new(), text_c));
        lines.push(("▸ Enter / Space: Continue".to_string(), hint_c));
        self.draw_box(inner_w, &lines, title_c, bg);
    }

    fn compose_finished(&mut self, hud: &Hud) {
        let bg = Color::Rgb { r: 30, g: 40, b: 30 };
        let gold = Color::Rgb { r: 255, g: 220, b: 50 };
        let lines = vec![
            ("★ Every section unlocked. Thanks for reading! ★".to_string(), gold),
            (format!("Coins collected: {}", hud.score), Color::White),
        ];
        let inner_w = lines.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
        self.draw_box(inner_w, &lines, gold, bg);
    }
}
