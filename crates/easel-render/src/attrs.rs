#![forbid(unsafe_code)]

//! Text attributes and their run-length row storage.
//!
//! Every row carries an [`AttrRow`]: a sequence of [`AttrRun`]s that covers
//! the full row width contiguously, with no gaps and no overlaps. The frame
//! painter walks a row by asking "which attribute applies at this column,
//! and for how many more cells" ([`AttrRow::attr_at`]), emitting one text
//! segment per run.

use easel_core::color::Rgb;
use smallvec::{SmallVec, smallvec};

bitflags::bitflags! {
    /// Box-drawing edges inscribed around the cells of a run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GridLines: u8 {
        const TOP    = 0b0001;
        const BOTTOM = 0b0010;
        const LEFT   = 0b0100;
        const RIGHT  = 0b1000;
    }
}

/// A color as stored in the buffer: a reference, not a resolved value.
///
/// Resolution to [`Rgb`] is the data provider's job (palette, theme,
/// defaults); the orchestrator only forwards the resolved values to
/// backends via the brush-update protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorRef {
    /// The provider's default foreground or background.
    #[default]
    Default,
    /// A 16-color palette index.
    Indexed(u8),
    /// A direct 24-bit value.
    Rgb(Rgb),
}

/// The display attribute shared by every cell of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextAttribute {
    pub foreground: ColorRef,
    pub background: ColorRef,
    pub bold: bool,
    pub grid_lines: GridLines,
}

impl TextAttribute {
    /// Attribute with both colors at the provider defaults.
    pub const fn new() -> Self {
        Self {
            foreground: ColorRef::Default,
            background: ColorRef::Default,
            bold: false,
            grid_lines: GridLines::empty(),
        }
    }

    /// Builder: set the foreground reference.
    pub const fn with_foreground(mut self, fg: ColorRef) -> Self {
        self.foreground = fg;
        self
    }

    /// Builder: set the background reference.
    pub const fn with_background(mut self, bg: ColorRef) -> Self {
        self.background = bg;
        self
    }

    /// Builder: set the bold flag.
    pub const fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Builder: set the box-drawing edges.
    pub const fn with_grid_lines(mut self, lines: GridLines) -> Self {
        self.grid_lines = lines;
        self
    }

    /// Pack the indexed color pair into the 8-bit legacy attribute word.
    ///
    /// Low nibble foreground, high nibble background. `Default` maps to the
    /// conventional light-gray-on-black pair; direct RGB values keep their
    /// nearest legacy nibble unrepresented and fall back the same way.
    pub const fn legacy_index(&self) -> u16 {
        let fg = match self.foreground {
            ColorRef::Indexed(i) => (i & 0x0F) as u16,
            _ => 0x7,
        };
        let bg = match self.background {
            ColorRef::Indexed(i) => (i & 0x0F) as u16,
            _ => 0x0,
        };
        fg | (bg << 4)
    }
}

/// A run of consecutive cells sharing one [`TextAttribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrRun {
    /// Number of cells covered; always at least 1.
    pub length: usize,
    pub attr: TextAttribute,
}

/// Run-length attribute storage for one row.
///
/// Invariant: run lengths sum to exactly the row width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrRow {
    width: usize,
    runs: SmallVec<[AttrRun; 4]>,
}

impl AttrRow {
    /// A row of `width` cells uniformly covered by `attr`.
    ///
    /// # Panics
    ///
    /// Panics if `width` is 0.
    pub fn new(width: usize, attr: TextAttribute) -> Self {
        assert!(width > 0, "attribute row width must be > 0");
        Self {
            width,
            runs: smallvec![AttrRun {
                length: width,
                attr
            }],
        }
    }

    /// Row width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// The runs, left to right.
    #[inline]
    pub fn runs(&self) -> &[AttrRun] {
        &self.runs
    }

    /// The attribute applying at `column` and the number of cells (starting
    /// at `column`) it still applies to.
    ///
    /// Returns `None` when `column` is past the row end.
    pub fn attr_at(&self, column: usize) -> Option<(&TextAttribute, usize)> {
        if column >= self.width {
            return None;
        }
        let mut start = 0;
        for run in &self.runs {
            let end = start + run.length;
            if column < end {
                return Some((&run.attr, end - column));
            }
            start = end;
        }
        debug_assert!(false, "attribute runs must cover the full row");
        None
    }

    /// Replace the attribute over `start..start + length`, re-coalescing
    /// adjacent equal runs.
    ///
    /// The range is clamped to the row width; a clamped-to-empty range is a
    /// no-op.
    pub fn set_range(&mut self, start: usize, length: usize, attr: TextAttribute) {
        let start = start.min(self.width);
        let end = start.saturating_add(length).min(self.width);
        if start >= end {
            return;
        }

        let mut rebuilt: SmallVec<[AttrRun; 4]> = SmallVec::new();
        let mut cursor = 0;
        let mut replaced_pushed = false;
        for run in &self.runs {
            let run_start = cursor;
            let run_end = cursor + run.length;
            cursor = run_end;

            if run_end <= start || run_start >= end {
                // Untouched run, but the replacement must land in order.
                if run_start >= end && !replaced_pushed {
                    Self::push_coalesced(&mut rebuilt, end - start, attr);
                    replaced_pushed = true;
                }
                Self::push_coalesced(&mut rebuilt, run.length, run.attr);
                continue;
            }

            if run_start < start {
                Self::push_coalesced(&mut rebuilt, start - run_start, run.attr);
            }
            if !replaced_pushed {
                Self::push_coalesced(&mut rebuilt, end - start, attr);
                replaced_pushed = true;
            }
            if run_end > end {
                Self::push_coalesced(&mut rebuilt, run_end - end, run.attr);
            }
        }
        if !replaced_pushed {
            Self::push_coalesced(&mut rebuilt, end - start, attr);
        }

        self.runs = rebuilt;
        debug_assert_eq!(
            self.runs.iter().map(|r| r.length).sum::<usize>(),
            self.width,
            "attribute runs must cover the full row"
        );
    }

    fn push_coalesced(runs: &mut SmallVec<[AttrRun; 4]>, length: usize, attr: TextAttribute) {
        if length == 0 {
            return;
        }
        if let Some(last) = runs.last_mut()
            && last.attr == attr
        {
            last.length += length;
            return;
        }
        runs.push(AttrRun { length, attr });
    }
}
