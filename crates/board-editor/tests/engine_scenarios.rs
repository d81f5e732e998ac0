//! Integration tests: the engine driven end to end through input events.
//!
//! Every scenario feeds screen-space events into `Engine::dispatch` the way
//! a host would, then checks the scene, the selection, the history and the
//! overlays that come back out.

use board_core::geometry::{Axis, Bounds, Point};
use board_core::model::{Anchor, Element, ElementKind, Endpoint, PenStroke};
use board_core::store::ConnectorPolicy;
use board_core::{DocumentMetadata, ElementId, Transform};
use board_editor::*;
use board_render::draw::{DrawItem, DrawList, Overlay};
use board_render::pool::RenderHost;
use pretty_assertions::assert_eq;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn engine() -> Engine {
    init_logging();
    Engine::new(EngineConfig::default())
}

fn rect(engine: &mut Engine, b: Bounds) -> ElementId {
    engine
        .add_element(Element::in_bounds(ElementKind::Rectangle { corner_radius: 0.0 }, b))
        .unwrap()
}

fn drag(engine: &mut Engine, from: (f64, f64), to: (f64, f64)) {
    engine.dispatch(InputEvent::pointer_down(from.0, from.1));
    engine.dispatch(InputEvent::pointer_move(to.0, to.1));
    engine.dispatch(InputEvent::pointer_up(to.0, to.1));
}

fn bounds(engine: &Engine, id: ElementId) -> Bounds {
    engine.store().get(id).unwrap().bounds()
}

fn scene(engine: &Engine) -> Vec<Element> {
    engine
        .state()
        .elements_in_paint_order()
        .into_iter()
        .cloned()
        .collect()
}

// ─── Drawing ─────────────────────────────────────────────────────────────

#[test]
fn rectangle_tool_drag_creates_selected_rectangle() {
    let mut engine = engine();
    engine.dispatch(InputEvent::key("r"));
    engine.dispatch(InputEvent::pointer_down(10.0, 10.0));
    let out = engine.dispatch(InputEvent::pointer_move(110.0, 60.0));
    assert!(out.changed);
    assert!(matches!(engine.overlays().last(), Some(Overlay::Preview(_))));
    let out = engine.dispatch(InputEvent::pointer_up(110.0, 60.0));

    assert!(out.tool_switched);
    assert_eq!(out.tool, ToolKind::Select);
    assert_eq!(engine.store().len(), 1);
    let id = engine.store().selection()[0];
    let el = engine.store().get(id).unwrap();
    assert!(matches!(el.kind, ElementKind::Rectangle { .. }));
    assert_eq!(el.bounds(), Bounds::new(10.0, 10.0, 100.0, 50.0));
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn drawing_a_section_adopts_what_it_encloses() {
    let mut engine = engine();
    let inside = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let outside = rect(&mut engine, Bounds::new(600.0, 100.0, 100.0, 100.0));

    engine.dispatch(InputEvent::key("f"));
    drag(&mut engine, (50.0, 50.0), (450.0, 350.0));
    let section = engine.store().selection()[0];
    assert!(engine.store().get(section).unwrap().is_section());
    assert_eq!(engine.store().children_of(section), vec![inside]);
    assert_eq!(engine.store().get(outside).unwrap().container_id, None);

    // One undo step removes the section and the adoption together.
    assert_eq!(engine.undo().as_deref(), Some("add section"));
    assert_eq!(engine.store().get(inside).unwrap().container_id, None);
}

#[test]
fn section_drawn_inside_a_section_nests_and_takes_its_members() {
    let mut engine = engine();
    engine.dispatch(InputEvent::key("f"));
    drag(&mut engine, (100.0, 100.0), (900.0, 700.0));
    let outer = engine.store().selection()[0];
    let a = engine
        .add_element(
            Element::in_bounds(
                ElementKind::Rectangle { corner_radius: 0.0 },
                Bounds::new(300.0, 300.0, 50.0, 50.0),
            )
            .with_container(Some(outer)),
        )
        .unwrap();

    engine.dispatch(InputEvent::key("f"));
    drag(&mut engine, (250.0, 250.0), (500.0, 500.0));
    let inner = engine.store().selection()[0];
    assert_ne!(inner, outer);
    assert_eq!(bounds(&engine, inner), Bounds::new(250.0, 250.0, 250.0, 250.0));
    assert_eq!(engine.store().get(inner).unwrap().container_id, Some(outer));
    assert_eq!(engine.store().get(a).unwrap().container_id, Some(inner));
    assert_eq!(engine.store().children_of(outer), vec![inner]);

    let order: Vec<ElementId> = scene(&engine).iter().map(|el| el.id).collect();
    assert_eq!(order, vec![outer, inner, a]);

    assert_eq!(engine.undo().as_deref(), Some("add section"));
    assert_eq!(engine.store().get(a).unwrap().container_id, Some(outer));
}

#[test]
fn connector_tool_binds_to_anchors() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let b = rect(&mut engine, Bounds::new(300.0, 100.0, 100.0, 100.0));

    engine.dispatch(InputEvent::key("c"));
    drag(&mut engine, (202.0, 151.0), (297.0, 149.0));
    let c = engine.store().selection()[0];
    let conn = engine.store().get(c).unwrap().as_connector().unwrap().clone();
    assert_eq!(conn.start, Endpoint::bound(a, Anchor::Right));
    assert_eq!(conn.end, Endpoint::bound(b, Anchor::Left));
    assert_eq!(conn.points.first(), Some(&Point::new(200.0, 150.0)));
    assert_eq!(conn.points.last(), Some(&Point::new(300.0, 150.0)));
}

#[test]
fn short_connector_is_discarded() {
    let mut engine = engine();
    engine.dispatch(InputEvent::key("c"));
    drag(&mut engine, (500.0, 500.0), (504.0, 500.0));
    assert!(engine.store().is_empty());
    assert!(engine.history().is_empty());
}

// ─── Snapping ────────────────────────────────────────────────────────────

#[test]
fn free_connector_ends_snap_and_show_guides() {
    let mut engine = engine();
    engine.dispatch(InputEvent::key("c"));
    engine.dispatch(InputEvent::pointer_down(3.0, 400.0));
    engine.dispatch(InputEvent::pointer_move(3.0, 600.0));
    let guide = engine.overlays().into_iter().find_map(|o| match o {
        Overlay::Guide { axis, position, .. } => Some((axis, position)),
        _ => None,
    });
    assert_eq!(guide, Some((Axis::X, 0.0)));
    engine.dispatch(InputEvent::pointer_up(3.0, 600.0));

    let c = engine.store().selection()[0];
    let conn = engine.store().get(c).unwrap().as_connector().unwrap().clone();
    assert_eq!(conn.start, Endpoint::free(Point::new(0.0, 400.0)));
    assert_eq!(conn.end, Endpoint::free(Point::new(0.0, 600.0)));
    assert!(!engine.overlays().iter().any(|o| matches!(o, Overlay::Guide { .. })));
}

#[test]
fn dragged_edge_snaps_to_neighbour_with_guide() {
    let mut engine = engine();
    rect(&mut engine, Bounds::new(40.0, 300.0, 60.0, 40.0));
    let b = rect(&mut engine, Bounds::new(200.0, 600.0, 50.0, 20.0));

    engine.dispatch(InputEvent::pointer_down(225.0, 610.0));
    // Left edge of B would land at x = 99.
    engine.dispatch(InputEvent::pointer_move(124.0, 610.0));
    let guide = engine.overlays().into_iter().find_map(|o| match o {
        Overlay::Guide { axis, position, .. } => Some((axis, position)),
        _ => None,
    });
    assert_eq!(guide, Some((Axis::X, 100.0)));
    engine.dispatch(InputEvent::pointer_up(124.0, 610.0));

    assert_eq!(bounds(&engine, b).x, 100.0);
    assert!(!engine.overlays().iter().any(|o| matches!(o, Overlay::Guide { .. })));
}

#[test]
fn snap_threshold_is_exclusive() {
    let mut engine = engine();
    rect(&mut engine, Bounds::new(40.0, 300.0, 60.0, 40.0));
    let b = rect(&mut engine, Bounds::new(200.0, 600.0, 50.0, 20.0));

    // Left edge lands at x = 95, exactly 5 from the neighbour.
    drag(&mut engine, (225.0, 610.0), (120.0, 610.0));
    assert_eq!(bounds(&engine, b).x, 95.0);
}

// ─── Selection gestures and history ──────────────────────────────────────

#[test]
fn dragging_two_elements_is_one_history_entry() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let b = rect(&mut engine, Bounds::new(300.0, 100.0, 100.0, 100.0));
    engine.select(&[a, b]).unwrap();
    let before = engine.history().len();

    engine.dispatch(InputEvent::pointer_down(150.0, 150.0));
    for step in 1..=10 {
        let t = f64::from(step) / 10.0;
        engine.dispatch(InputEvent::pointer_move(150.0 + 20.0 * t, 150.0 + 30.0 * t));
    }
    engine.dispatch(InputEvent::pointer_up(170.0, 180.0));

    assert_eq!(bounds(&engine, a), Bounds::new(120.0, 130.0, 100.0, 100.0));
    assert_eq!(bounds(&engine, b), Bounds::new(320.0, 130.0, 100.0, 100.0));
    assert_eq!(engine.history().len(), before + 1);
    assert_eq!(engine.history().undo_label(), Some("move"));

    engine.dispatch(InputEvent::key("z").with_modifiers(Modifiers::CTRL));
    assert_eq!(bounds(&engine, a), Bounds::new(100.0, 100.0, 100.0, 100.0));
    assert_eq!(bounds(&engine, b), Bounds::new(300.0, 100.0, 100.0, 100.0));
}

#[test]
fn escape_mid_drag_leaves_scene_and_history_untouched() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let before = scene(&engine);
    let depth = engine.history().len();

    engine.dispatch(InputEvent::pointer_down(150.0, 150.0));
    engine.dispatch(InputEvent::pointer_move(250.0, 350.0));
    assert_ne!(bounds(&engine, a), before[0].bounds());
    engine.dispatch(InputEvent::key("Escape"));
    engine.dispatch(InputEvent::pointer_up(250.0, 350.0));

    assert_eq!(scene(&engine), before);
    assert_eq!(engine.history().len(), depth);
    assert!(!engine.is_gesture_active());
}

#[test]
fn click_on_empty_canvas_clears_and_marquee_selects() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let b = rect(&mut engine, Bounds::new(300.0, 100.0, 100.0, 100.0));
    engine.select(&[a]).unwrap();

    drag(&mut engine, (700.0, 700.0), (700.0, 700.0));
    assert!(engine.store().selection().is_empty());

    engine.dispatch(InputEvent::pointer_down(50.0, 50.0));
    engine.dispatch(InputEvent::pointer_move(350.0, 250.0));
    assert!(matches!(engine.overlays().as_slice(), [Overlay::Marquee(_)]));
    engine.dispatch(InputEvent::pointer_up(350.0, 250.0));
    assert_eq!(engine.store().selection(), &[a, b]);
}

#[test]
fn shift_click_toggles_membership() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let b = rect(&mut engine, Bounds::new(300.0, 100.0, 100.0, 100.0));
    let shift_click = |engine: &mut Engine, x: f64, y: f64| {
        engine.dispatch(InputEvent::pointer_down(x, y).with_modifiers(Modifiers::SHIFT));
        engine.dispatch(InputEvent::pointer_up(x, y).with_modifiers(Modifiers::SHIFT));
    };

    shift_click(&mut engine, 150.0, 150.0);
    shift_click(&mut engine, 350.0, 150.0);
    assert_eq!(engine.store().selection(), &[a, b]);
    shift_click(&mut engine, 150.0, 150.0);
    assert_eq!(engine.store().selection(), &[b]);
}

#[test]
fn dropping_into_a_section_reparents() {
    let mut engine = engine();
    let section = engine
        .add_element(Element::in_bounds(
            ElementKind::Section { title: "S".into() },
            Bounds::new(400.0, 400.0, 400.0, 300.0),
        ))
        .unwrap();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));

    drag(&mut engine, (150.0, 150.0), (523.0, 517.0));
    assert_eq!(engine.store().get(a).unwrap().container_id, Some(section));

    // Moving it back out releases it in the same gesture entry.
    drag(&mut engine, (523.0, 517.0), (150.0, 150.0));
    assert_eq!(engine.store().get(a).unwrap().container_id, None);
    assert_eq!(engine.history().undo_label(), Some("move"));
}

#[test]
fn undo_redo_restores_exact_states() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let s0 = scene(&engine);
    engine.select(&[a]).unwrap();
    drag(&mut engine, (150.0, 150.0), (181.0, 197.0));
    let s1 = scene(&engine);
    engine.dispatch(InputEvent::key("Delete"));
    let s2 = scene(&engine);

    assert_eq!(engine.undo().as_deref(), Some("delete"));
    assert_eq!(scene(&engine), s1);
    assert_eq!(engine.undo().as_deref(), Some("move"));
    assert_eq!(scene(&engine), s0);
    assert_eq!(engine.redo().as_deref(), Some("move"));
    assert_eq!(scene(&engine), s1);
    assert_eq!(engine.redo().as_deref(), Some("delete"));
    assert_eq!(scene(&engine), s2);
    assert_eq!(engine.redo(), None);
}

#[test]
fn new_edit_clears_redo() {
    let mut engine = engine();
    rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    engine.undo();
    assert!(engine.history().can_redo());
    rect(&mut engine, Bounds::new(300.0, 100.0, 100.0, 100.0));
    assert!(!engine.history().can_redo());
}

#[test]
fn history_depth_is_bounded() {
    init_logging();
    let mut engine = Engine::new(EngineConfig {
        history_depth: 3,
        ..EngineConfig::default()
    });
    for i in 0..5 {
        rect(&mut engine, Bounds::new(f64::from(i) * 200.0, 0.0, 50.0, 50.0));
    }
    assert_eq!(engine.history().len(), 3);
    while engine.undo().is_some() {}
    assert_eq!(engine.store().len(), 2);
}

// ─── Deletion and connector policy ───────────────────────────────────────

#[test]
fn deleting_section_keeps_children() {
    let mut engine = engine();
    let section = engine
        .add_element(Element::in_bounds(
            ElementKind::Section { title: "S".into() },
            Bounds::new(0.0, 0.0, 500.0, 500.0),
        ))
        .unwrap();
    let a = engine
        .add_element(
            Element::in_bounds(
                ElementKind::Ellipse,
                Bounds::new(100.0, 100.0, 50.0, 50.0),
            )
            .with_container(Some(section)),
        )
        .unwrap();

    engine.select(&[section]).unwrap();
    engine.dispatch(InputEvent::key("Backspace"));
    assert!(!engine.store().contains(section));
    assert_eq!(engine.store().get(a).unwrap().container_id, None);
}

fn connected_pair(engine: &mut Engine) -> (ElementId, ElementId, ElementId) {
    let a = rect(engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let b = rect(engine, Bounds::new(300.0, 100.0, 100.0, 100.0));
    engine.dispatch(InputEvent::key("l"));
    drag(engine, (200.0, 150.0), (300.0, 150.0));
    let c = engine.store().selection()[0];
    (a, b, c)
}

#[test]
fn detach_policy_frees_connector_end() {
    let mut engine = engine();
    let (a, b, c) = connected_pair(&mut engine);
    engine.select(&[a]).unwrap();
    engine.dispatch(InputEvent::key("Delete"));

    let conn = engine.store().get(c).unwrap().as_connector().unwrap().clone();
    assert_eq!(conn.start, Endpoint::free(Point::new(200.0, 150.0)));
    assert_eq!(conn.end, Endpoint::bound(b, Anchor::Left));
}

#[test]
fn remove_policy_deletes_connector() {
    let mut engine = engine();
    engine.set_connector_policy(ConnectorPolicy::Remove);
    let (a, b, c) = connected_pair(&mut engine);
    engine.select(&[a]).unwrap();
    engine.dispatch(InputEvent::key("Delete"));

    assert!(!engine.store().contains(c));
    assert!(engine.store().contains(b));
    engine.undo();
    assert!(engine.store().contains(c));
    assert!(engine.store().contains(a));
}

#[test]
fn moving_a_bound_element_reroutes_connector() {
    let mut engine = engine();
    let (a, _, c) = connected_pair(&mut engine);
    engine.select(&[a]).unwrap();
    drag(&mut engine, (150.0, 150.0), (150.0, 233.0));
    let conn = engine.store().get(c).unwrap().as_connector().unwrap().clone();
    assert_eq!(conn.points.first(), Some(&Point::new(200.0, 233.0)));
}

// ─── Clipboard ───────────────────────────────────────────────────────────

#[test]
fn copy_paste_remaps_ids() {
    let mut engine = engine();
    let (a, b, c) = connected_pair(&mut engine);
    engine.select(&[a, b, c]).unwrap();
    let text = engine.copy_selection().unwrap().unwrap();

    let pasted = engine.paste_text(&text).unwrap();
    assert_eq!(pasted.len(), 3);
    assert!(pasted.iter().all(|id| ![a, b, c].contains(id)));
    assert_eq!(engine.store().len(), 6);
    assert_eq!(engine.store().selection(), pasted.as_slice());

    let new_conn = pasted
        .iter()
        .copied()
        .find(|id| engine.store().get(*id).is_some_and(Element::is_connector))
        .unwrap();
    let targets = engine.store().get(new_conn).unwrap().bound_elements();
    assert!(targets.iter().all(|t| pasted.contains(t)));
    let moved = pasted
        .iter()
        .map(|id| bounds(&engine, *id))
        .find(|bb| bb.y == 120.0 && bb.x == 120.0);
    assert!(moved.is_some());
    assert_eq!(engine.history().undo_label(), Some("paste"));
}

#[test]
fn duplicate_and_cut_shortcuts() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    engine.select(&[a]).unwrap();

    engine.dispatch(InputEvent::key("d").with_modifiers(Modifiers::CTRL));
    assert_eq!(engine.store().len(), 2);
    let copy = engine.store().selection()[0];
    assert_eq!(bounds(&engine, copy), Bounds::new(120.0, 120.0, 100.0, 100.0));

    engine.dispatch(InputEvent::key("x").with_modifiers(Modifiers::CTRL));
    assert_eq!(engine.store().len(), 1);
    engine.dispatch(InputEvent::key("v").with_modifiers(Modifiers::CTRL));
    assert_eq!(engine.store().len(), 2);
}

#[test]
fn foreign_clipboard_text_is_rejected() {
    let mut engine = engine();
    assert!(matches!(
        engine.paste_text("hello"),
        Err(EditorError::Clipboard(ClipboardError::Json(_)))
    ));
    assert!(engine.store().is_empty());
}

// ─── Z-order ─────────────────────────────────────────────────────────────

#[test]
fn bring_to_front_shortcut() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let b = rect(&mut engine, Bounds::new(120.0, 120.0, 100.0, 100.0));
    engine.select(&[a]).unwrap();
    engine.dispatch(InputEvent::key("]").with_modifiers(Modifiers {
        ctrl: true,
        shift: true,
        ..Modifiers::NONE
    }));
    let order: Vec<ElementId> = scene(&engine).iter().map(|el| el.id).collect();
    assert_eq!(order, vec![b, a]);
    assert_eq!(engine.history().undo_label(), Some("bring to front"));
}

// ─── Pen and the simplification worker ───────────────────────────────────

fn pen_engine(threshold: usize) -> Engine {
    init_logging();
    Engine::new(EngineConfig {
        pen_worker_threshold: threshold,
        pen_sample_interval_ms: 16,
        ..EngineConfig::default()
    })
}

fn draw_line(engine: &mut Engine, samples: u32) {
    engine.dispatch(InputEvent::key("p"));
    engine.dispatch(InputEvent::pointer_down(100.0, 100.0).at_time(0));
    for i in 1..=samples {
        let x = 100.0 + f64::from(i) * 10.0;
        engine.dispatch(InputEvent::pointer_move(x, 100.0).at_time(u64::from(i) * 20));
    }
    let end = 100.0 + f64::from(samples) * 10.0;
    engine.dispatch(InputEvent::pointer_up(end, 100.0).at_time(u64::from(samples) * 20 + 20));
}

fn stroke_len(engine: &Engine, id: ElementId) -> usize {
    match &engine.store().get(id).unwrap().kind {
        ElementKind::PenStroke(PenStroke { points, .. }) => points.len(),
        other => panic!("not a stroke: {other:?}"),
    }
}

#[test]
fn short_stroke_is_simplified_inline() {
    let mut engine = pen_engine(512);
    draw_line(&mut engine, 10);
    let id = engine.store().selection()[0];
    assert_eq!(stroke_len(&engine, id), 2);
}

#[test]
fn long_stroke_is_simplified_by_worker() {
    let mut engine = pen_engine(4);
    draw_line(&mut engine, 10);
    let id = engine.store().selection()[0];
    engine.flush_worker();
    assert_eq!(stroke_len(&engine, id), 2);
    assert_eq!(
        engine.store().get(id).unwrap().stroke_world_points(),
        vec![Point::new(100.0, 100.0), Point::new(200.0, 100.0)]
    );
    // Simplification does not add an undo step.
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn single_point_stroke_is_discarded() {
    let mut engine = pen_engine(512);
    engine.dispatch(InputEvent::key("p"));
    engine.dispatch(InputEvent::pointer_down(100.0, 100.0));
    engine.dispatch(InputEvent::pointer_up(100.0, 100.0));
    assert!(engine.store().is_empty());
}

// ─── Camera ──────────────────────────────────────────────────────────────

#[test]
fn zoomed_hit_testing_uses_world_coordinates() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    // Zoom in about the origin: world 150 is now at screen 187.5.
    engine.dispatch(InputEvent::wheel(0.0, 0.0, 0.0, -1.0).with_modifiers(Modifiers::CTRL));
    assert_eq!(engine.camera().zoom, 1.25);

    engine.dispatch(InputEvent::pointer_down(187.5, 187.5));
    engine.dispatch(InputEvent::pointer_up(187.5, 187.5));
    assert_eq!(engine.store().selection(), &[a]);
}

// ─── Persistence ─────────────────────────────────────────────────────────

#[test]
fn failed_save_keeps_scene() {
    let mut engine = engine();
    rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    let before = scene(&engine);
    let mut backend = MemoryBackend::default();
    backend.fail_saves = true;

    let err = engine.save(&mut backend, DocumentMetadata::titled("board"));
    assert!(matches!(err, Err(EditorError::Persistence(PersistenceError::Backend(_)))));
    assert_eq!(scene(&engine), before);
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn save_and_load_round_trip() {
    let mut engine = engine();
    let (a, _, _) = connected_pair(&mut engine);
    engine
        .update_element(a, board_core::ElementPatch::new().transform(Transform::at(100.0, 120.0)))
        .unwrap();
    let before = scene(&engine);

    let mut backend = MemoryBackend::new(Encoding::Json);
    engine.save(&mut backend, DocumentMetadata::titled("board")).unwrap();

    let mut restored = Engine::default();
    restored.load(&mut backend).unwrap();
    assert_eq!(scene(&restored), before);
    assert!(restored.history().is_empty());
}

#[test]
fn image_drop_lands_centred_inside_section() {
    let mut engine = engine();
    let section = engine
        .add_element(Element::in_bounds(
            ElementKind::Section { title: "S".into() },
            Bounds::new(0.0, 0.0, 800.0, 600.0),
        ))
        .unwrap();
    let handle = board_core::model::ImageHandle {
        id: "img-1".into(),
        width: 200,
        height: 100,
    };
    let id = engine.drop_image(handle, 300.0, 300.0).unwrap();
    let el = engine.store().get(id).unwrap();
    assert_eq!(el.bounds(), Bounds::new(200.0, 250.0, 200.0, 100.0));
    assert_eq!(el.container_id, Some(section));
}

// ─── Rendering ───────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingHost {
    created: usize,
    frames: usize,
}

impl RenderHost for RecordingHost {
    type Node = usize;
    type Bitmap = ();

    fn create_node(&mut self, _tag: board_core::ElementTag) -> usize {
        self.created += 1;
        self.created
    }

    fn update_node(&mut self, _node: &mut usize, _item: &DrawItem, _cached: Option<&()>) {}

    fn hide_node(&mut self, _node: &mut usize) {}

    fn rasterize(&mut self, _section: &DrawItem, _members: &[DrawItem]) -> Option<()> {
        None
    }

    fn present(&mut self, _list: &DrawList) {
        self.frames += 1;
    }
}

#[test]
fn render_bridge_follows_engine() {
    let mut engine = engine();
    let mut bridge = engine.render_bridge(RecordingHost::default());
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    rect(&mut engine, Bounds::new(5000.0, 5000.0, 100.0, 100.0));

    let list = engine.render(&mut bridge);
    assert_eq!(list.ids(), vec![a]);
    assert_eq!(list.revision, engine.store().revision());

    engine.select(&[a]).unwrap();
    let list = engine.render(&mut bridge);
    assert!(matches!(list.overlays.as_slice(), [Overlay::Selection { .. }]));

    // Resizing the surface widens the visible world.
    engine.dispatch(InputEvent::ViewportResized {
        width: 6000.0,
        height: 6000.0,
    });
    let list = engine.render(&mut bridge);
    assert_eq!(list.items.len(), 2);
    assert_eq!(bridge.host().frames, 3);
    assert_eq!(bridge.host().created, 2);
}

#[test]
fn selection_overlay_carries_resize_and_rotate_handles() {
    let mut engine = engine();
    let a = rect(&mut engine, Bounds::new(100.0, 100.0, 100.0, 100.0));
    engine.select(&[a]).unwrap();
    let Some(Overlay::Selection { handles, rotate_handle, .. }) = engine.overlays().into_iter().next() else {
        panic!("expected selection overlay");
    };
    assert_eq!(handles.len(), 8);
    assert_eq!(rotate_handle, Point::new(150.0, 76.0));
}
