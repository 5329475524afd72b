//! End-to-end pipeline tests through the public API.
//!
//! Each test drives a [`Renderer`] over a [`StaticRenderData`] provider
//! with one or more [`RecordingBackend`]s and asserts on the recorded
//! paint protocol:
//! - requested damage is painted as exactly region ∩ buffer ∩ viewport
//! - scroll frames expose only the newly visible strip
//! - selection invalidation is the union of the old and new rect sets
//! - a scroll-then-paint is cell-equivalent to a full redraw

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use easel_core::geometry::{Delta, Point, Rect, Viewport};
use easel_render::Renderer;
use easel_render::headless::{PaintOp, RecordingBackend, RecordingHandle, StaticRenderData};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────────

fn renderer_over(
    data: StaticRenderData,
) -> (
    Arc<Renderer<StaticRenderData>>,
    Arc<Mutex<StaticRenderData>>,
    RecordingHandle,
) {
    let backend = RecordingBackend::new();
    let handle = backend.handle();
    let shared = Arc::new(Mutex::new(data));
    let renderer = Renderer::new(Arc::clone(&shared), vec![Box::new(backend)]).unwrap();
    (renderer, shared, handle)
}

fn filled_data(width: usize, height: usize) -> StaticRenderData {
    let mut data = StaticRenderData::new(width, height);
    for y in 0..height {
        let line: String = (0..width)
            .map(|x| char::from(b'a' + ((x + y) % 26) as u8))
            .collect();
        data.buffer.write_str(0, y, &line);
    }
    data
}

fn line_ops(ops: &[PaintOp]) -> Vec<(String, Vec<u8>, Point, bool, bool)> {
    ops.iter()
        .filter_map(|op| match op {
            PaintOp::Line {
                text,
                widths,
                target,
                trim_left,
                wrapped,
            } => Some((text.clone(), widths.clone(), *target, *trim_left, *wrapped)),
            _ => None,
        })
        .collect()
}

/// A model of the cells a backend would hold after replaying ops.
struct Screen {
    width: i32,
    height: i32,
    cells: Vec<Vec<char>>,
}

impl Screen {
    fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![vec![' '; width as usize]; height as usize],
        }
    }

    fn apply(&mut self, ops: &[PaintOp]) {
        for op in ops {
            match op {
                PaintOp::ScrollFrame(delta) if !delta.is_zero() => {
                    let mut next = vec![vec![' '; self.width as usize]; self.height as usize];
                    for y in 0..self.height {
                        for x in 0..self.width {
                            let src_y = y - delta.dy;
                            let src_x = x - delta.dx;
                            if (0..self.height).contains(&src_y) && (0..self.width).contains(&src_x)
                            {
                                next[y as usize][x as usize] =
                                    self.cells[src_y as usize][src_x as usize];
                            }
                        }
                    }
                    self.cells = next;
                }
                PaintOp::Line {
                    text,
                    widths,
                    target,
                    ..
                } => {
                    let mut x = target.x;
                    for (ch, w) in text.chars().zip(widths.iter()) {
                        for i in 0..*w as i32 {
                            let cx = x + i;
                            if (0..self.width).contains(&cx)
                                && (0..self.height).contains(&target.y)
                            {
                                self.cells[target.y as usize][cx as usize] = ch;
                            }
                        }
                        x += *w as i32;
                    }
                }
                _ => {}
            }
        }
    }
}

// ── Region clipping ──────────────────────────────────────────────────────

#[test]
fn hello_world_row_slice() {
    let mut data = StaticRenderData::new(80, 24);
    data.buffer.write_str(0, 5, "Hello World");
    let (renderer, _shared, handle) = renderer_over(data);

    renderer.trigger_redraw(&Rect::new(0, 5, 9, 5));
    renderer.paint_frame().unwrap();

    let lines = line_ops(&handle.take_ops());
    assert_eq!(lines.len(), 1);
    let (text, widths, target, trim_left, _) = &lines[0];
    assert_eq!(text, "Hello Worl");
    assert_eq!(widths.len(), 10);
    assert!(widths.iter().all(|w| *w == 1));
    assert_eq!(*target, Point::new(0, 5));
    assert!(!trim_left);
}

#[test]
fn region_outside_viewport_paints_nothing() {
    let (renderer, _shared, handle) = renderer_over(filled_data(80, 24));

    renderer.trigger_redraw(&Rect::new(0, 30, 79, 40));
    renderer.paint_frame().unwrap();

    assert!(handle.take_ops().is_empty());
}

#[test]
fn redraw_all_is_idempotent() {
    let (renderer, _shared, handle) = renderer_over(filled_data(80, 24));

    renderer.trigger_redraw_all();
    renderer.paint_frame().unwrap();
    let first = line_ops(&handle.take_ops());

    renderer.trigger_redraw_all();
    renderer.paint_frame().unwrap();
    let second = line_ops(&handle.take_ops());

    assert_eq!(first, second);
    assert_eq!(first.len(), 24);
}

// ── Scroll ───────────────────────────────────────────────────────────────

#[test]
fn scroll_invalidates_only_exposed_strip() {
    let mut data = filled_data(80, 48);
    data.viewport = Viewport::new(Point::new(0, 0), 80, 24);
    let (renderer, shared, handle) = renderer_over(data);

    renderer.trigger_redraw_all();
    renderer.paint_frame().unwrap();
    handle.take_ops();

    shared.lock().unwrap().viewport = Viewport::new(Point::new(0, 3), 80, 24);
    renderer.trigger_scroll();

    assert_eq!(handle.dirty_rect(), Rect::new(0, 21, 79, 23));
}

#[test]
fn scroll_with_unmoved_viewport_is_not_scheduled_twice() {
    let (renderer, _shared, handle) = renderer_over(filled_data(80, 24));

    renderer.trigger_redraw_all();
    renderer.paint_frame().unwrap();
    handle.take_ops();

    // Viewport did not move; the tracker reports zero and nothing new is
    // invalidated.
    renderer.trigger_scroll();
    assert!(handle.dirty_rect().is_empty());
}

#[test]
fn scroll_then_paint_matches_full_redraw() {
    // Path A: paint, scroll the viewport down 3 rows, paint again.
    let mut data_a = filled_data(80, 48);
    data_a.viewport = Viewport::new(Point::new(0, 0), 80, 24);
    let (renderer_a, shared_a, handle_a) = renderer_over(data_a);
    renderer_a.trigger_redraw_all();
    renderer_a.paint_frame().unwrap();
    let first_frame = handle_a.take_ops();
    shared_a.lock().unwrap().viewport = Viewport::new(Point::new(0, 3), 80, 24);
    renderer_a.trigger_scroll();
    renderer_a.paint_frame().unwrap();
    let second_frame = handle_a.take_ops();

    // Path B: a fresh frame of the post-scroll state.
    let mut data_b = filled_data(80, 48);
    data_b.viewport = Viewport::new(Point::new(0, 3), 80, 24);
    let (renderer_b, _shared_b, handle_b) = renderer_over(data_b);
    renderer_b.trigger_redraw_all();
    renderer_b.paint_frame().unwrap();
    let ops_b = handle_b.take_ops();

    let mut screen_a = Screen::new(80, 24);
    screen_a.apply(&first_frame);
    screen_a.apply(&second_frame);
    let mut screen_b = Screen::new(80, 24);
    screen_b.apply(&ops_b);
    assert_eq!(screen_a.cells, screen_b.cells);

    // The scroll path repaints only the exposed strip, not the frame.
    assert_eq!(line_ops(&second_frame).len(), 3);
    assert_eq!(line_ops(&ops_b).len(), 24);
}

#[test]
fn explicit_delta_scroll_skips_viewport_tracker() {
    let mut data = filled_data(80, 48);
    data.viewport = Viewport::new(Point::new(0, 0), 80, 24);
    let (renderer, shared, handle) = renderer_over(data);
    renderer.trigger_redraw_all();
    renderer.paint_frame().unwrap();
    handle.take_ops();

    // The buffer rotates underneath; the viewport stays put.
    shared
        .lock()
        .unwrap()
        .buffer
        .rotate_up(2, easel_render::attrs::TextAttribute::new());
    renderer.trigger_scroll_delta(Delta::new(0, -2));

    assert_eq!(handle.dirty_rect(), Rect::new(0, 22, 79, 23));

    // The pipeline still paints cleanly afterwards.
    renderer.paint_frame().unwrap();
    let lines = line_ops(&handle.take_ops());
    assert_eq!(lines.len(), 2);
}

// ── Selection ────────────────────────────────────────────────────────────

#[test]
fn selection_invalidates_union_of_old_and_new() {
    let (renderer, shared, handle) = renderer_over(filled_data(80, 24));
    renderer.trigger_redraw_all();
    renderer.paint_frame().unwrap();
    handle.take_ops();

    shared.lock().unwrap().selection = vec![Rect::new(2, 5, 10, 5), Rect::new(2, 6, 10, 6)];
    renderer.trigger_selection();
    assert_eq!(handle.dirty_rect(), Rect::new(2, 5, 10, 6));
    renderer.paint_frame().unwrap();
    handle.take_ops();

    // Move the selection; both the old and the new rows are invalidated.
    shared.lock().unwrap().selection = vec![Rect::new(20, 10, 30, 10)];
    renderer.trigger_selection();
    assert_eq!(handle.dirty_rect(), Rect::new(2, 5, 30, 10));
}

#[test]
fn deselect_invalidates_exactly_the_selected_rows() {
    let (renderer, shared, handle) = renderer_over(filled_data(80, 24));
    renderer.trigger_redraw_all();
    renderer.paint_frame().unwrap();
    handle.take_ops();

    let selected = vec![Rect::new(4, 8, 40, 8), Rect::new(4, 9, 40, 9)];
    shared.lock().unwrap().selection = selected.clone();
    renderer.trigger_selection();
    renderer.paint_frame().unwrap();
    handle.take_ops();

    shared.lock().unwrap().selection = Vec::new();
    renderer.trigger_selection();
    assert_eq!(handle.dirty_rect(), Rect::new(4, 8, 40, 9));
}

#[test]
fn selection_painted_within_dirty_region() {
    let mut data = filled_data(80, 24);
    data.selection = vec![Rect::new(0, 5, 79, 5)];
    let (renderer, _shared, handle) = renderer_over(data);

    renderer.trigger_redraw(&Rect::new(10, 5, 20, 5));
    renderer.paint_frame().unwrap();

    let sel: Vec<Rect> = handle
        .take_ops()
        .iter()
        .filter_map(|op| match op {
            PaintOp::Selection(r) => Some(*r),
            _ => None,
        })
        .collect();
    assert_eq!(sel, vec![Rect::new(10, 5, 20, 5)]);
}

// ── Title ────────────────────────────────────────────────────────────────

#[test]
fn title_change_reaches_backend() {
    let (renderer, shared, handle) = renderer_over(filled_data(80, 24));
    shared.lock().unwrap().title = "easel: session 1".into();
    renderer.trigger_title_change();
    renderer.paint_frame().unwrap();
    assert_eq!(handle.last_title(), Some("easel: session 1".into()));
}

// ── Font and DPI ─────────────────────────────────────────────────────────

#[test]
fn font_change_updates_dpi_before_font_per_backend() {
    use easel_render::backend::{FontInfo, FontRequest, FontSizePx};

    let (renderer, _shared, handle) = renderer_over(filled_data(80, 24));
    let desired = FontRequest {
        family: "Cascadia Mono".into(),
        size_pt: 12.0,
        weight: 400,
    };
    let selected = FontInfo {
        family: "Cascadia Mono".into(),
        size_pt: 12.0,
        weight: 400,
        cell_size: FontSizePx::new(9, 19),
    };
    handle.set_proposed_font(Some(selected.clone()));

    let mut actual = FontInfo {
        family: String::new(),
        size_pt: 0.0,
        weight: 0,
        cell_size: FontSizePx::new(1, 1),
    };
    renderer.trigger_font_change(144, &desired, &mut actual);

    assert_eq!(actual, selected);
    let ops = handle.take_ops();
    let dpi_index = ops
        .iter()
        .position(|op| matches!(op, PaintOp::UpdateDpi(144)))
        .unwrap();
    let font_index = ops
        .iter()
        .position(|op| matches!(op, PaintOp::UpdateFont(_)))
        .unwrap();
    assert!(dpi_index < font_index);
}

// ── Circling ─────────────────────────────────────────────────────────────

#[test]
fn circling_paints_synchronously_for_backends_that_ask() {
    let (renderer, _shared, handle) = renderer_over(filled_data(80, 24));
    handle.set_circling_repaint(true);

    renderer.trigger_redraw_all();
    renderer.trigger_circling();

    // The frame ran on the caller's thread, without the scheduler.
    assert_eq!(handle.present_count(), 1);
}

// ── Scheduler integration ────────────────────────────────────────────────

#[test]
fn scheduler_drives_frames_end_to_end() {
    let (renderer, _shared, handle) = renderer_over(filled_data(80, 24));

    renderer.enable_painting();
    renderer.trigger_redraw_all();

    let mut presented = false;
    for _ in 0..500 {
        if handle.present_count() >= 1 {
            presented = true;
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(presented, "scheduler never delivered a frame");

    // After the drain-and-disable, triggers no longer produce frames.
    assert!(renderer.wait_for_paint_completion_and_disable(None));
    let presents = handle.present_count();
    renderer.trigger_redraw_all();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(handle.present_count(), presents);
}

#[test]
fn teardown_after_enable_is_race_free() {
    let (renderer, _shared, handle) = renderer_over(filled_data(80, 24));
    renderer.enable_painting();
    renderer.trigger_redraw_all();
    renderer.trigger_teardown();

    // Whatever the scheduler managed before the drain, nothing runs after.
    let presents = handle.present_count();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(handle.present_count(), presents);
}

// ── Clipping property ────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn painted_region_is_exactly_the_clamped_intersection(
        left in -20i32..100,
        top in -10i32..40,
        width in 0i32..120,
        height in 0i32..40,
    ) {
        let region = Rect::new(left, top, left + width, top + height);
        let (renderer, _shared, handle) = renderer_over(filled_data(80, 24));

        renderer.trigger_redraw(&region);
        renderer.paint_frame().unwrap();
        let lines = line_ops(&handle.take_ops());

        let bounds = Rect::new(0, 0, 79, 23);
        match region.intersect(&bounds) {
            None => prop_assert!(lines.is_empty()),
            Some(expected) => {
                prop_assert_eq!(lines.len() as i32, expected.height());
                for (text, widths, target, _, _) in &lines {
                    prop_assert_eq!(target.x, expected.left);
                    prop_assert!(target.y >= expected.top && target.y <= expected.bottom);
                    let cells: i32 = widths.iter().map(|w| i32::from(*w)).sum();
                    prop_assert_eq!(cells, expected.width());
                    prop_assert_eq!(text.chars().count(), widths.len());
                }
            }
        }
    }
}
