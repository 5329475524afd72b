#![forbid(unsafe_code)]

//! The per-backend frame pipeline.
//!
//! [`FramePainter`] runs the strictly linear paint sequence for one backend:
//! start the bracket, establish default brushes, replay the scroll, fill the
//! background, redraw the dirty rows (decomposed into attribute runs with
//! double-width pairs collapsed), composite the IME overlays, the selection
//! and the cursor, refresh the title, close the bracket. The caller holds
//! the console lock for all of it and calls `present` afterwards, unlocked.
//!
//! # Degradation
//!
//! A backend-protocol failure aborts the remaining steps for that backend's
//! frame (the bracket is still closed); an allocation failure while
//! collapsing a row skips only that row. Neither propagates past the
//! orchestrator.

use easel_core::geometry::{Point, Rect, Viewport};
use tracing::warn;

use crate::backend::{CursorPaint, PaintStatus, RenderBackend};
use crate::buffer::Row;
use crate::cell::WideMarker;
use crate::data::{ImeComposition, RenderData};
use crate::error::{RenderError, Result};

/// Paints one frame for one backend from a locked data provider.
pub(crate) struct FramePainter<'a, D: RenderData> {
    data: &'a D,
}

impl<'a, D: RenderData> FramePainter<'a, D> {
    pub(crate) fn new(data: &'a D) -> Self {
        Self { data }
    }

    /// Run the pipeline. Returns `Ok(true)` when the backend painted and
    /// needs a `present`, `Ok(false)` when it had nothing to do.
    ///
    /// `end_paint` is invoked whenever `start_paint` reported dirty, even
    /// if a later step failed; its own failure is logged, not propagated.
    pub(crate) fn paint(&self, backend: &mut dyn RenderBackend) -> Result<bool> {
        match backend.start_paint()? {
            PaintStatus::NothingToDo => return Ok(false),
            PaintStatus::Dirty => {}
        }

        let outcome = self.paint_body(backend);

        if let Err(err) = backend.end_paint() {
            warn!(error = %err, "end_paint failed");
        }
        outcome?;
        Ok(true)
    }

    fn paint_body(&self, backend: &mut dyn RenderBackend) -> Result<()> {
        self.update_brushes(backend, &self.data.default_attribute(), true)?;
        backend.scroll_frame()?;
        backend.paint_background()?;
        self.paint_buffer_output(backend)?;
        self.paint_ime_overlays(backend)?;
        self.paint_selection(backend)?;
        self.paint_cursor(backend)?;
        backend.update_title(&self.data.title())?;
        Ok(())
    }

    /// The backend's dirty region clamped to buffer ∩ viewport, in
    /// buffer-absolute coordinates. `None` means nothing visible to paint.
    ///
    /// Backends may legitimately report damage beyond both bounds
    /// (window-manager invalidation under scroll bars); the excess is
    /// clamped away silently.
    fn clamped_dirty(&self, backend: &dyn RenderBackend) -> Option<Rect> {
        let view = self.data.viewport();
        let dirty = view.from_origin(&backend.dirty_rect());
        dirty
            .intersect(&self.data.text_buffer().bounds())
            .and_then(|d| d.intersect(&view.bounds()))
    }

    fn paint_buffer_output(&self, backend: &mut dyn RenderBackend) -> Result<()> {
        let Some(dirty) = self.clamped_dirty(backend) else {
            return Ok(());
        };
        let view = self.data.viewport();
        let buffer = self.data.text_buffer();
        let grid_lines_allowed = self.data.is_grid_line_drawing_allowed();

        for y in dirty.top..=dirty.bottom {
            let Some(row) = buffer.row(y) else { continue };
            let left = dirty.left.max(0) as usize;
            let right = (dirty.right + 1).max(0) as usize;
            if right <= left {
                continue;
            }

            let target = view.point_to_origin(Point::new(dirty.left, y));
            let wrapped = row.wrap_forced() && right == row.measure_right();

            if let Err(err) =
                self.paint_row_segment(backend, row, left, right, target, wrapped, grid_lines_allowed)
            {
                match err {
                    RenderError::Allocation(what) => {
                        warn!(row = y, what, "row skipped: allocation failure");
                    }
                    other => return Err(other),
                }
            }
        }
        Ok(())
    }

    /// Paint row cells `[left, right)` (row-local columns) at `target`,
    /// one attribute run at a time.
    fn paint_row_segment(
        &self,
        backend: &mut dyn RenderBackend,
        row: &Row,
        left: usize,
        right: usize,
        target: Point,
        wrapped: bool,
        grid_lines_allowed: bool,
    ) -> Result<()> {
        let mut col = left;
        let mut target_x = target.x;

        while col < right {
            let Some((attr, applies)) = row.attrs().attr_at(col) else {
                break;
            };
            let attr = *attr;
            let segment = applies.min(right - col);
            if segment == 0 {
                break;
            }

            self.update_brushes(backend, &attr, false)?;
            self.emit_collapsed(backend, row, col, segment, Point::new(target_x, target.y), wrapped)?;

            if grid_lines_allowed && !attr.grid_lines.is_empty() {
                let color = self.data.foreground_color(&attr);
                backend.paint_grid_lines(
                    attr.grid_lines,
                    color,
                    segment,
                    Point::new(target_x, target.y),
                )?;
            }

            col += segment;
            target_x += segment as i32;
        }
        Ok(())
    }

    /// Collapse double-width pairs out of `length` cells starting at
    /// `start` and emit the run as one `paint_buffer_line` call.
    fn emit_collapsed(
        &self,
        backend: &mut dyn RenderBackend,
        row: &Row,
        start: usize,
        length: usize,
        target: Point,
        wrapped: bool,
    ) -> Result<()> {
        let end = (start + length).min(row.width());
        let cells = &row.cells()[start..end];

        let mut text = String::new();
        text.try_reserve(cells.len() * 4)
            .map_err(|_| RenderError::Allocation("row text collapse"))?;
        let mut widths: Vec<u8> = Vec::new();
        widths
            .try_reserve(cells.len())
            .map_err(|_| RenderError::Allocation("glyph width table"))?;

        let mut target = target;
        let mut trim_left = false;

        for (i, cell) in cells.iter().enumerate() {
            match cell.marker {
                WideMarker::Single => {
                    text.push(cell.ch);
                    widths.push(1);
                }
                WideMarker::Leading => {
                    text.push(cell.ch);
                    widths.push(2);
                }
                WideMarker::Trailing if i == 0 => {
                    // The repaint starts on the right half of a wide glyph.
                    // The glyph must be struck whole: back the target up one
                    // cell and have the backend clip the stale left half.
                    text.push(cell.ch);
                    widths.push(2);
                    target.x -= 1;
                    trim_left = true;
                }
                WideMarker::Trailing => {}
            }
        }

        backend.paint_buffer_line(&text, &widths, target, trim_left, wrapped)
    }

    fn paint_ime_overlays(&self, backend: &mut dyn RenderBackend) -> Result<()> {
        let compositions = self.data.ime_compositions();
        if compositions.is_empty() {
            return Ok(());
        }
        let view = self.data.viewport();
        for composition in compositions {
            if composition.hidden {
                continue;
            }
            self.paint_ime(backend, &view, composition)?;
        }
        Ok(())
    }

    fn paint_ime(
        &self,
        backend: &mut dyn RenderBackend,
        view: &Viewport,
        composition: &ImeComposition,
    ) -> Result<()> {
        // The overlay window is exclusive on its far edges while the dirty
        // rect is inclusive; +1 lifts the dirty rect into the exclusive
        // convention before intersecting.
        let dirty = view.from_origin(&backend.dirty_rect());
        let area_left = composition.origin.x.saturating_add(composition.window.left);
        let area_top = composition.origin.y.saturating_add(composition.window.top);
        let area_right = composition.origin.x.saturating_add(composition.window.right);
        let area_bottom = composition.origin.y.saturating_add(composition.window.bottom);

        let left = dirty.left.max(area_left);
        let top = dirty.top.max(area_top);
        let right = (dirty.right.saturating_add(1)).min(area_right);
        let bottom = (dirty.bottom.saturating_add(1)).min(area_bottom);
        if right <= left || bottom <= top {
            return Ok(());
        }

        for y in top..bottom {
            let Some(row) = composition.buffer.row(y - composition.origin.y) else {
                continue;
            };
            let src_left = (left - composition.origin.x).max(0) as usize;
            let src_right = ((right - composition.origin.x).max(0) as usize).min(row.width());
            if src_right <= src_left {
                continue;
            }

            let target = view.point_to_origin(Point::new(left, y));
            if let Err(err) =
                self.paint_row_segment(backend, row, src_left, src_right, target, false, false)
            {
                match err {
                    RenderError::Allocation(what) => {
                        warn!(row = y, what, "overlay row skipped: allocation failure");
                    }
                    other => return Err(other),
                }
            }
        }
        Ok(())
    }

    fn paint_selection(&self, backend: &mut dyn RenderBackend) -> Result<()> {
        let rects = self.data.selection_rects();
        if rects.is_empty() {
            return Ok(());
        }
        let view = self.data.viewport();
        let dirty = backend.dirty_rect();
        for rect in rects {
            let local = view.to_origin(&rect);
            if let Some(clipped) = dirty.intersect(&local) {
                backend.paint_selection(clipped)?;
            }
        }
        Ok(())
    }

    fn paint_cursor(&self, backend: &mut dyn RenderBackend) -> Result<()> {
        if !self.data.is_cursor_visible() {
            return Ok(());
        }
        let view = self.data.viewport();
        let position = self.data.cursor_position();
        if !view.contains(position) {
            return Ok(());
        }
        backend.paint_cursor(&CursorPaint {
            position: view.point_to_origin(position),
            height: self.data.cursor_height(),
            double_width: self.data.is_cursor_double_width(),
            style: self.data.cursor_style(),
            color: self.data.cursor_color(),
        })
    }

    /// Resolve an attribute into concrete brushes on the backend.
    pub(crate) fn update_brushes(
        &self,
        backend: &mut dyn RenderBackend,
        attr: &crate::attrs::TextAttribute,
        include_background: bool,
    ) -> Result<()> {
        let foreground = self.data.foreground_color(attr);
        let background = self.data.background_color(attr);
        backend.update_drawing_brushes(
            foreground,
            background,
            attr.legacy_index(),
            attr.bold,
            include_background,
        )
    }
}
