//! Frame composition and double-buffered terminal output.
//!
//! [`compose_frame`] maps world units onto a character grid and is pure, so
//! it can be tested without a terminal. [`Renderer`] diffs each composed row
//! against the previous frame, queues only changed rows, and flushes once.

use std::io::{self, BufWriter, Write};

use crossterm::event::{
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, execute, queue};

use skyrun_core::SimulationState;
use skyrun_core::config::ViewConfig;

use crate::assets::{Assets, Sprite};
use crate::config::ShellConfig;

const BACKGROUND: Color = Color::Rgb {
    r: 245,
    g: 245,
    b: 245,
};
const TEXT_FG: Color = Color::Black;
const GROUND_FG: Color = Color::Rgb {
    r: 150,
    g: 60,
    b: 40,
};
const PLATFORM_FG: Color = Color::Rgb {
    r: 120,
    g: 80,
    b: 30,
};
const PLAYER_FG: Color = Color::DarkBlue;

/// Where the distance readout is drawn, in world units.
const HUD_POS: (f32, f32) = (10.0, 10.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
}

impl Cell {
    const BLANK: Cell = Cell {
        ch: ' ',
        fg: TEXT_FG,
    };
}

/// One composed screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl Frame {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::BLANK; cols * rows],
        }
    }

    /// Out-of-bounds writes are clipped.
    fn set(&mut self, col: i64, row: i64, cell: Cell) {
        if col < 0 || row < 0 {
            return;
        }
        let (col, row) = (col as usize, row as usize);
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] = cell;
        }
    }

    fn put_str(&mut self, col: i64, row: i64, text: &str, fg: Color) {
        for (i, ch) in text.chars().enumerate() {
            self.set(col + i as i64, row, Cell { ch, fg });
        }
    }

    fn blit(&mut self, sprite: &Sprite, col: i64, row: i64, fg: Color) {
        for r in 0..sprite.height() {
            for c in 0..sprite.width() {
                if let Some(ch) = sprite.get(c, r) {
                    self.set(col + c as i64, row + r as i64, Cell { ch, fg });
                }
            }
        }
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_text(&self, row: usize) -> String {
        self.row(row).iter().map(|c| c.ch).collect()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Mapping from world units to terminal cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub cols: usize,
    pub rows: usize,
    cell_w: f32,
    cell_h: f32,
}

impl Layout {
    pub fn new(view: &ViewConfig, shell: &ShellConfig) -> Self {
        Self {
            cols: (view.width / shell.cell_width_px).ceil() as usize,
            rows: (view.height / shell.cell_height_px).ceil() as usize,
            cell_w: shell.cell_width_px,
            cell_h: shell.cell_height_px,
        }
    }

    fn to_cell(&self, x: f32, y: f32) -> (i64, i64) {
        (
            (x / self.cell_w).floor() as i64,
            (y / self.cell_h).floor() as i64,
        )
    }

    /// Cells covered by a `width` x `height` world-unit box, at least 1x1.
    pub fn cells_for(&self, width: f32, height: f32) -> (usize, usize) {
        (
            ((width / self.cell_w).round() as usize).max(1),
            ((height / self.cell_h).round() as usize).max(1),
        )
    }
}

/// Draw ground, floating platforms, the player, and the distance readout.
pub fn compose_frame(state: &SimulationState, assets: &Assets, layout: &Layout) -> Frame {
    let mut frame = Frame::new(layout.cols, layout.rows);
    let shift = state.world.shift;
    let block = state.config.world.block_size;

    for r in &state.world.ground {
        let (col, row) = layout.to_cell(r.x + shift, r.y);
        frame.blit(&assets.tile, col, row, GROUND_FG);
    }

    // A platform narrower than one block draws no tiles.
    for p in &state.world.platforms {
        let tiles = (p.width / block).floor() as usize;
        for i in 0..tiles {
            let (col, row) = layout.to_cell(p.x + shift + i as f32 * block, p.y);
            frame.blit(&assets.tile, col, row, PLATFORM_FG);
        }
    }

    let player = &state.player;
    let sprite = if player.facing_right {
        &assets.player_right
    } else {
        &assets.player_left
    };
    let (col, row) = layout.to_cell(player.x, player.y);
    frame.blit(sprite, col, row, PLAYER_FG);

    let (col, row) = layout.to_cell(HUD_POS.0, HUD_POS.1);
    let hud = format!("Distance: {} blocks", state.distance_blocks());
    frame.put_str(col, row, &hud, TEXT_FG);

    frame
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    back: Option<Frame>,
    term_size: (u16, u16),
    enhanced_keys: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            back: None,
            term_size: (0, 0),
            enhanced_keys: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the terminal
    /// accepted keyboard enhancement, i.e. whether key Release events can be
    /// trusted.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(BACKGROUND),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )?;
            self.enhanced_keys = true;
        }
        self.term_size = terminal::size().unwrap_or((80, 24));
        tracing::info!(
            "Terminal {}x{}, keyboard enhancement: {}",
            self.term_size.0,
            self.term_size.1,
            self.enhanced_keys
        );
        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Write the rows of `frame` that differ from the previous frame.
    pub fn present(&mut self, frame: Frame) -> io::Result<()> {
        let size = terminal::size().unwrap_or(self.term_size);
        if size != self.term_size {
            self.term_size = size;
            self.back = None;
            queue!(self.writer, SetBackgroundColor(BACKGROUND), Clear(ClearType::All))?;
        }
        let visible_cols = frame.cols().min(usize::from(size.0));
        let visible_rows = frame.rows().min(usize::from(size.1));

        queue!(self.writer, SetBackgroundColor(BACKGROUND))?;
        let mut last_fg = None;
        for row in 0..visible_rows {
            let cells = &frame.row(row)[..visible_cols];
            if let Some(back) = &self.back
                && back.cols() == frame.cols()
                && back.rows() == frame.rows()
                && &back.row(row)[..visible_cols] == cells
            {
                continue;
            }
            queue!(self.writer, cursor::MoveTo(0, row as u16))?;
            for cell in cells {
                if last_fg != Some(cell.fg) {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = Some(cell.fg);
                }
                queue!(self.writer, Print(cell.ch))?;
            }
        }
        self.writer.flush()?;
        self.back = Some(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use skyrun_core::config::SimConfig;
    use skyrun_core::test_helpers::ScriptedRandom;

    use super::*;

    fn fixture() -> (SimulationState, Assets, Layout) {
        let config = SimConfig::default();
        let shell = ShellConfig::default();
        let layout = Layout::new(&config.view, &shell);
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets");
        let player = layout.cells_for(config.physics.player_width, config.physics.player_height);
        let tile = layout.cells_for(config.world.block_size, config.world.block_size);
        let assets = Assets::load(&dir, player, tile).unwrap();
        let mut rng = ScriptedRandom::new(vec![0.0]);
        (SimulationState::new(config, &mut rng), assets, layout)
    }

    #[test]
    fn default_view_is_80_by_20_cells() {
        let (_, _, layout) = fixture();
        assert_eq!((layout.cols, layout.rows), (80, 20));
        assert_eq!(layout.cells_for(40.0, 40.0), (4, 2));
    }

    #[test]
    fn hud_shows_distance() {
        let (mut state, assets, layout) = fixture();
        let frame = compose_frame(&state, &assets, &layout);
        assert!(frame.row_text(0).starts_with(" Distance: 0 blocks"));

        state.world.shift = -130.0;
        let frame = compose_frame(&state, &assets, &layout);
        assert!(frame.row_text(0).starts_with(" Distance: 3 blocks"));
    }

    #[test]
    fn ground_fills_bottom_rows() {
        let (state, assets, layout) = fixture();
        let frame = compose_frame(&state, &assets, &layout);
        assert_eq!(frame.row_text(18), "[##]".repeat(20));
        assert_eq!(frame.row_text(19), "[==]".repeat(20));
    }

    #[test]
    fn platform_draws_one_tile_per_whole_block() {
        let (state, assets, layout) = fixture();
        let frame = compose_frame(&state, &assets, &layout);
        // Fixed platform at x 400, y 200, width 150: three tiles.
        let row = frame.row_text(10);
        assert_eq!(&row[40..52], "[##][##][##]");
        assert_eq!(&row[52..56], "    ");
    }

    #[test]
    fn player_sprite_mirrors_with_facing() {
        let (mut state, assets, layout) = fixture();
        let frame = compose_frame(&state, &assets, &layout);
        assert_eq!(&frame.row_text(15)[40..44], "{o>}");

        state.player.facing_right = false;
        let frame = compose_frame(&state, &assets, &layout);
        assert_eq!(&frame.row_text(15)[40..44], "{<o}");
        assert_eq!(frame.row(15)[41].fg, PLAYER_FG);
    }

    #[test]
    fn shift_moves_geometry_not_player() {
        let (mut state, assets, layout) = fixture();
        state.world.shift = -40.0;
        let frame = compose_frame(&state, &assets, &layout);
        let row = frame.row_text(10);
        assert_eq!(&row[36..48], "[##][##][##]");
        assert_eq!(&frame.row_text(15)[40..44], "{o>}");
    }

    #[test]
    fn offscreen_blits_are_clipped() {
        let mut frame = Frame::new(4, 2);
        let sprite = Sprite::parse(Path::new("t.txt"), "ab\ncd\n").unwrap();
        frame.blit(&sprite, -1, 1, TEXT_FG);
        frame.blit(&sprite, 3, -1, TEXT_FG);
        assert_eq!(frame.row_text(0), "   c");
        assert_eq!(frame.row_text(1), "b   ");
    }
}
