#![forbid(unsafe_code)]

//! Cursor shapes understood by paint backends.

/// How the cursor cell should be struck.
///
/// `Legacy` draws a partial block whose height is the percentage reported
/// by the data provider; the other shapes ignore the height value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    /// Partial block sized by the provider's cursor height percentage.
    #[default]
    Legacy,
    /// Thin vertical bar at the left edge of the cell.
    VerticalBar,
    /// Single underscore at the cell baseline.
    Underscore,
    /// Unfilled box around the cell.
    EmptyBox,
    /// Fully filled box.
    FullBox,
}
