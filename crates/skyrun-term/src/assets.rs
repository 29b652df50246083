//! Text-art sprites loaded from the assets directory.
//!
//! Each asset is a rectangular grid of characters. Spaces are transparent
//! when blitted. Sprites are scaled once at startup to the number of cells
//! they cover on screen.

use std::io;
use std::path::{Path, PathBuf};

pub const PLAYER_FILE: &str = "player.txt";
pub const TILE_FILE: &str = "tile.txt";

#[derive(Debug)]
pub enum AssetError {
    Missing(PathBuf),
    Io { path: PathBuf, source: io::Error },
    Empty(PathBuf),
    /// Row `row` has a different width from the first row.
    Ragged { path: PathBuf, row: usize },
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(p) => write!(f, "asset not found: {}", p.display()),
            Self::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            Self::Empty(p) => write!(f, "asset is empty: {}", p.display()),
            Self::Ragged { path, row } => {
                write!(f, "asset {} has ragged row {row}", path.display())
            },
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    rows: Vec<Vec<char>>,
}

impl Sprite {
    /// Parse a text-art grid. Trailing blank lines are dropped; every
    /// remaining row must have the same number of characters.
    pub fn parse(path: &Path, text: &str) -> Result<Self, AssetError> {
        let mut rows: Vec<Vec<char>> = text
            .lines()
            .map(|l| l.trim_end_matches('\r').chars().collect())
            .collect();
        while rows.last().is_some_and(|r| r.iter().all(|c| c.is_whitespace())) {
            rows.pop();
        }
        let Some(width) = rows.first().map(Vec::len).filter(|&w| w > 0) else {
            return Err(AssetError::Empty(path.to_path_buf()));
        };
        if let Some(row) = rows.iter().position(|r| r.len() != width) {
            return Err(AssetError::Ragged {
                path: path.to_path_buf(),
                row,
            });
        }
        Ok(Self { rows })
    }

    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AssetError::Missing(path.to_path_buf()),
            _ => AssetError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        Self::parse(path, &text)
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Character at `(col, row)`, `None` where the sprite is transparent.
    pub fn get(&self, col: usize, row: usize) -> Option<char> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .filter(|&c| c != ' ')
    }

    /// Nearest-neighbour resample to `cols` x `rows`.
    pub fn scaled(&self, cols: usize, rows: usize) -> Self {
        let (w, h) = (self.width(), self.height());
        let rows = (0..rows.max(1))
            .map(|r| {
                let src = &self.rows[(r * h / rows.max(1)).min(h - 1)];
                (0..cols.max(1))
                    .map(|c| src[(c * w / cols.max(1)).min(w - 1)])
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Horizontal mirror, swapping characters that have a left/right pair.
    pub fn mirrored(&self) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|r| r.iter().rev().map(|&c| mirror_char(c)).collect())
            .collect();
        Self { rows }
    }
}

fn mirror_char(c: char) -> char {
    match c {
        '/' => '\\',
        '\\' => '/',
        '(' => ')',
        ')' => '(',
        '<' => '>',
        '>' => '<',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        other => other,
    }
}

/// Sprites used by the renderer, already scaled to their on-screen size.
#[derive(Debug, Clone)]
pub struct Assets {
    pub player_right: Sprite,
    pub player_left: Sprite,
    pub tile: Sprite,
}

impl Assets {
    pub fn load(
        dir: &Path,
        player_cells: (usize, usize),
        tile_cells: (usize, usize),
    ) -> Result<Self, AssetError> {
        let player =
            Sprite::load(&dir.join(PLAYER_FILE))?.scaled(player_cells.0, player_cells.1);
        let tile = Sprite::load(&dir.join(TILE_FILE))?.scaled(tile_cells.0, tile_cells.1);
        tracing::info!(
            "Loaded assets from {} (player {}x{}, tile {}x{})",
            dir.display(),
            player.width(),
            player.height(),
            tile.width(),
            tile.height()
        );
        Ok(Self {
            player_left: player.mirrored(),
            player_right: player,
            tile,
        })
    }
}
