#![forbid(unsafe_code)]

//! The render orchestrator.
//!
//! [`Renderer`] owns the backend list, exposes the trigger API that
//! mutators call when console state changes, and drives the per-backend
//! frame pipeline when the paint scheduler fires. One backend failing
//! never affects another: failures are logged and that backend simply
//! stops updating its surface until a later frame succeeds (it keeps
//! being invoked every frame, so intermittent failures self-heal).
//!
//! # Locking
//!
//! Two locks, always acquired in this order:
//!
//! 1. the backend-list lock (backends + delta tracker),
//! 2. the console lock (`Arc<Mutex<D>>`, shared with the mutator side).
//!
//! Trigger methods acquire both themselves; callers must NOT hold the
//! console lock across a trigger call. The frame pipeline drops the
//! console guard before `present`, so buffer mutation overlaps with final
//! display transfer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use easel_core::geometry::{Delta, Point, Rect};
use tracing::{debug, warn};

use crate::backend::{FontInfo, FontRequest, FontSizePx, RenderBackend};
use crate::data::RenderData;
use crate::error::{RenderError, Result};
use crate::painter::FramePainter;
use crate::scheduler::PaintScheduler;
use crate::tracker::DeltaTracker;

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Backend list plus the frame-to-frame delta state, guarded together.
struct EngineState {
    backends: Vec<Box<dyn RenderBackend>>,
    tracker: DeltaTracker,
}

/// Drives every registered backend from one source of truth.
pub struct Renderer<D> {
    /// The console lock: buffer, viewport, selection, cursor, title.
    data: Arc<Mutex<D>>,
    state: Mutex<EngineState>,
    scheduler: PaintScheduler,
}

impl<D: RenderData + Send + 'static> Renderer<D> {
    /// Create an orchestrator over `data`, taking ownership of `backends`,
    /// and spawn the paint thread.
    ///
    /// Painting stays gated until [`enable_painting`](Self::enable_painting).
    pub fn new(data: Arc<Mutex<D>>, backends: Vec<Box<dyn RenderBackend>>) -> Result<Arc<Self>> {
        let renderer = Arc::new(Self {
            data,
            state: Mutex::new(EngineState {
                backends,
                tracker: DeltaTracker::new(),
            }),
            scheduler: PaintScheduler::new(),
        });

        let weak = Arc::downgrade(&renderer);
        renderer.scheduler.start(move || {
            if let Some(renderer) = weak.upgrade() {
                let _ = renderer.paint_frame();
            }
        })?;

        Ok(renderer)
    }

    /// Register another backend. Future frames and triggers include it.
    pub fn add_backend(&self, backend: Box<dyn RenderBackend>) -> Result<()> {
        let mut state = lock_unpoisoned(&self.state);
        state
            .backends
            .try_reserve(1)
            .map_err(|_| RenderError::Allocation("backend registration"))?;
        state.backends.push(backend);
        Ok(())
    }

    /// Number of registered backends.
    pub fn backend_count(&self) -> usize {
        lock_unpoisoned(&self.state).backends.len()
    }

    // ── Triggers ─────────────────────────────────────────────────────────

    /// A buffer region changed. Trimmed against the viewport; a region
    /// entirely outside it is a no-op.
    pub fn trigger_redraw(&self, region: &Rect) {
        let mut state = lock_unpoisoned(&self.state);
        let local = {
            let data = lock_unpoisoned(&self.data);
            let view = data.viewport();
            let Some(trimmed) = view.trim(region) else {
                return;
            };
            view.to_origin(&trimmed)
        };
        for backend in &mut state.backends {
            if let Err(err) = backend.invalidate(&local) {
                warn!(error = %err, "invalidate failed");
            }
        }
        drop(state);
        self.scheduler.notify_paint();
    }

    /// A single buffer cell changed.
    pub fn trigger_redraw_cell(&self, cell: Point) {
        self.trigger_redraw(&Rect::from_cell(cell));
    }

    /// Everything is potentially stale. A full redraw is not throttled by
    /// area; reserve this for global state changes.
    pub fn trigger_redraw_all(&self) {
        let mut state = lock_unpoisoned(&self.state);
        for backend in &mut state.backends {
            if let Err(err) = backend.invalidate_all() {
                warn!(error = %err, "invalidate_all failed");
            }
        }
        drop(state);
        self.scheduler.notify_paint();
    }

    /// The cursor moved. Lets backends distinguish cursor movement from
    /// other damage; a position outside the viewport is a no-op.
    pub fn trigger_redraw_cursor(&self, position: Point) {
        let mut state = lock_unpoisoned(&self.state);
        let (local, double_width) = {
            let data = lock_unpoisoned(&self.data);
            let view = data.viewport();
            if !view.contains(position) {
                return;
            }
            (view.point_to_origin(position), data.is_cursor_double_width())
        };
        for backend in &mut state.backends {
            if let Err(err) = backend.invalidate_cell(local) {
                warn!(error = %err, "cursor invalidate failed");
            }
            if double_width {
                let trailing = local.offset(Delta::new(1, 0));
                if let Err(err) = backend.invalidate_cell(trailing) {
                    warn!(error = %err, "cursor invalidate failed");
                }
            }
        }
        drop(state);
        self.scheduler.notify_paint();
    }

    /// Window-system damage, forwarded verbatim.
    pub fn trigger_system_redraw(&self, region: &Rect) {
        let mut state = lock_unpoisoned(&self.state);
        for backend in &mut state.backends {
            if let Err(err) = backend.invalidate_system(region) {
                warn!(error = %err, "system invalidate failed");
            }
        }
        drop(state);
        self.scheduler.notify_paint();
    }

    /// The viewport may have moved. Reconciles against the tracker and
    /// invalidates only the scroll-exposed strip, which is much cheaper
    /// than a full repaint. Schedules a frame only when movement occurred.
    pub fn trigger_scroll(&self) {
        let mut state = lock_unpoisoned(&self.state);
        let scrolled = {
            let data = lock_unpoisoned(&self.data);
            let EngineState { backends, tracker } = &mut *state;
            Self::reconcile_scroll(&*data, tracker, backends)
        };
        drop(state);
        if scrolled {
            self.scheduler.notify_paint();
        }
    }

    /// The buffer rotated under an unmoved viewport; shift backend frames
    /// by `delta` anyway.
    ///
    /// Deliberately does NOT consult the viewport tracker: the caller
    /// asserts the viewport did not move, the backing storage did.
    pub fn trigger_scroll_delta(&self, delta: Delta) {
        let mut state = lock_unpoisoned(&self.state);
        for backend in &mut state.backends {
            if let Err(err) = backend.invalidate_scroll(delta) {
                warn!(error = %err, "scroll invalidate failed");
            }
        }
        drop(state);
        self.scheduler.notify_paint();
    }

    /// The selection changed. Invalidates the union of the previous and
    /// current rect sets, so the old highlight is erased and the new one
    /// drawn, then replaces the stored previous set.
    pub fn trigger_selection(&self) {
        let mut state = lock_unpoisoned(&self.state);
        let (old_local, new_local, new_rects) = {
            let data = lock_unpoisoned(&self.data);
            let view = data.viewport();
            let new_rects = data.selection_rects();
            let to_local =
                |rects: &[Rect]| rects.iter().map(|r| view.to_origin(r)).collect::<Vec<_>>();
            (
                to_local(state.tracker.previous_selection()),
                to_local(&new_rects),
                new_rects,
            )
        };
        for backend in &mut state.backends {
            if let Err(err) = backend.invalidate_selection(&old_local) {
                warn!(error = %err, "selection invalidate failed");
            }
            if let Err(err) = backend.invalidate_selection(&new_local) {
                warn!(error = %err, "selection invalidate failed");
            }
        }
        state.tracker.replace_selection(new_rects);
        drop(state);
        self.scheduler.notify_paint();
    }

    /// The buffer is about to rotate its backing storage. Backends that
    /// want one last look get a synchronous frame before it happens.
    pub fn trigger_circling(&self) {
        let mut state = lock_unpoisoned(&self.state);
        for index in 0..state.backends.len() {
            let wants_repaint = match state.backends[index].invalidate_circling() {
                Ok(wants) => wants,
                Err(err) => {
                    warn!(backend = index, error = %err, "circling invalidate failed");
                    false
                }
            };
            if wants_repaint
                && let Err(err) = self.paint_frame_for_backend(&mut state, index)
            {
                warn!(backend = index, error = %err, "pre-circling frame failed");
            }
        }
    }

    /// The console title changed.
    pub fn trigger_title_change(&self) {
        let mut state = lock_unpoisoned(&self.state);
        let title = lock_unpoisoned(&self.data).title();
        for backend in &mut state.backends {
            if let Err(err) = backend.invalidate_title(&title) {
                warn!(error = %err, "title invalidate failed");
            }
        }
        drop(state);
        self.scheduler.notify_paint();
    }

    /// Font or DPI changed. The DPI update fans out before the font
    /// update, backend by backend; each backend fixes up `actual` with the
    /// font it selected.
    pub fn trigger_font_change(&self, dpi: u32, desired: &FontRequest, actual: &mut FontInfo) {
        let mut state = lock_unpoisoned(&self.state);
        for backend in &mut state.backends {
            if let Err(err) = backend.update_dpi(dpi) {
                warn!(error = %err, "dpi update failed");
            }
            if let Err(err) = backend.update_font(desired, actual) {
                warn!(error = %err, "font update failed");
            }
        }
        drop(state);
        self.scheduler.notify_paint();
    }

    // ── Speculative queries ──────────────────────────────────────────────

    /// The font a backend would select for `desired` at `dpi`, without
    /// selecting it. First definite answer wins; backends with no opinion
    /// are skipped.
    pub fn proposed_font(&self, dpi: u32, desired: &FontRequest) -> Result<FontInfo> {
        let mut state = lock_unpoisoned(&self.state);
        if state.backends.is_empty() {
            return Err(RenderError::NoBackend);
        }
        for backend in &mut state.backends {
            match backend.proposed_font(dpi, desired) {
                Ok(Some(info)) => return Ok(info),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "proposed_font failed"),
            }
        }
        Err(RenderError::NoBackend)
    }

    /// Pixel size of the active font cell. First definite answer wins;
    /// with backends registered but none opinionated, falls back to 1×1.
    pub fn font_size(&self) -> Result<FontSizePx> {
        let state = lock_unpoisoned(&self.state);
        if state.backends.is_empty() {
            return Err(RenderError::NoBackend);
        }
        for backend in &state.backends {
            match backend.font_size() {
                Ok(Some(size)) => return Ok(size),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "font_size failed"),
            }
        }
        Ok(FontSizePx::default())
    }

    /// Whether `glyph` renders full-width under the active font. First
    /// definite answer wins; falls back to half-width.
    pub fn is_glyph_wide_by_font(&self, glyph: &str) -> Result<bool> {
        let state = lock_unpoisoned(&self.state);
        if state.backends.is_empty() {
            return Err(RenderError::NoBackend);
        }
        for backend in &state.backends {
            match backend.is_glyph_wide(glyph) {
                Ok(Some(wide)) => return Ok(wide),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "is_glyph_wide failed"),
            }
        }
        Ok(false)
    }

    // ── Painting ─────────────────────────────────────────────────────────

    /// Compose a frame on every backend.
    ///
    /// Per-backend failures are logged and do not abort the loop; this
    /// never fails the caller. Normally invoked from the paint thread;
    /// callable directly for synchronous hosts and tests.
    pub fn paint_frame(&self) -> Result<()> {
        let mut state = lock_unpoisoned(&self.state);
        for index in 0..state.backends.len() {
            if let Err(err) = self.paint_frame_for_backend(&mut state, index) {
                warn!(backend = index, error = %err, "frame paint failed");
            }
        }
        Ok(())
    }

    fn paint_frame_for_backend(&self, state: &mut EngineState, index: usize) -> Result<()> {
        let painted = {
            let data = lock_unpoisoned(&self.data);

            // Last chance to catch a scroll that happened without an
            // explicit trigger since the previous frame.
            let EngineState { backends, tracker } = &mut *state;
            Self::reconcile_scroll(&*data, tracker, backends);

            let painter = FramePainter::new(&*data);
            painter.paint(state.backends[index].as_mut())?
            // Console guard dropped here; present runs unlocked.
        };

        if painted {
            debug!(backend = index, "presenting frame");
            state.backends[index].present()?;
        }
        Ok(())
    }

    /// Compare the stored viewport with the provider's, push the new
    /// viewport and scroll delta to every backend, and record the new
    /// viewport unconditionally. Returns true when movement occurred.
    fn reconcile_scroll(
        data: &D,
        tracker: &mut DeltaTracker,
        backends: &mut [Box<dyn RenderBackend>],
    ) -> bool {
        let current = data.viewport();
        let delta = tracker.reconcile(current);
        for backend in backends.iter_mut() {
            if let Err(err) = backend.update_viewport(current) {
                warn!(error = %err, "viewport update failed");
            }
            if let Err(err) = backend.invalidate_scroll(delta) {
                warn!(error = %err, "scroll invalidate failed");
            }
        }
        !delta.is_zero()
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Open the paint gate.
    pub fn enable_painting(&self) {
        self.scheduler.enable_painting();
    }

    /// Wait for any in-flight frame (up to `timeout`; `None` is unbounded)
    /// and close the paint gate. Returns false on timeout.
    pub fn wait_for_paint_completion_and_disable(&self, timeout: Option<Duration>) -> bool {
        self.scheduler.wait_for_paint_completion_and_disable(timeout)
    }

    /// Shut the pipeline down: drain the scheduler with an unbounded wait,
    /// then give each backend that asks for it one final synchronous frame.
    ///
    /// Must run before the backends are destroyed. This is the only paint
    /// path that bypasses the scheduler's throttling.
    pub fn trigger_teardown(&self) {
        self.scheduler.wait_for_paint_completion_and_disable(None);

        let mut state = lock_unpoisoned(&self.state);
        for index in 0..state.backends.len() {
            let wants_repaint = match state.backends[index].prepare_for_teardown() {
                Ok(wants) => wants,
                Err(err) => {
                    warn!(backend = index, error = %err, "teardown preparation failed");
                    false
                }
            };
            if wants_repaint
                && let Err(err) = self.paint_frame_for_backend(&mut state, index)
            {
                warn!(backend = index, error = %err, "final frame failed");
            }
        }
    }
}
