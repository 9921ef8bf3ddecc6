//! Behaviour of the hover cube driven the way the host drives it: pointer
//! moves and frame ticks interleaved, then teardown.
//!
//! Everything renders into a `FrameSink`, so no GPU is needed.

use std::f32::consts::TAU;

use hoverclip::camera::SurfaceRect;
use hoverclip::host::{ListenerKind, Surface};
use hoverclip::material::Color;
use hoverclip::scene::frame::FrameSink;
use hoverclip::views::CubeView;
use hoverclip::views::cube::{HOVER_COLOR, IDLE_COLOR, MAX_SCALE, MIN_SCALE, ROTATION_STEP};

const CENTER: (f32, f32) = (400.0, 300.0);
const CORNER: (f32, f32) = (2.0, 2.0);

fn mount() -> CubeView<FrameSink> {
    let surface = Surface::new(SurfaceRect::sized(800.0, 600.0), 1.0);
    CubeView::mount(Some(surface), FrameSink::default()).unwrap()
}

fn tick(view: &mut CubeView<FrameSink>) -> bool {
    let handle = view.frame_handle().unwrap();
    view.tick(handle)
}

fn scale(view: &CubeView<FrameSink>) -> f32 {
    view.cube().unwrap().transform.scale.x
}

#[test]
fn scale_grows_while_hovered_and_stops_at_the_maximum() {
    let mut view = mount();
    view.pointer_moved(CENTER.0, CENTER.1);

    let mut previous = scale(&view);
    for _ in 0..150 {
        tick(&mut view);
        let current = scale(&view);
        assert!(current >= previous);
        assert!(current <= MAX_SCALE);
        previous = current;
    }
    assert_eq!(scale(&view), MAX_SCALE);
}

#[test]
fn scale_shrinks_back_to_one_after_the_pointer_leaves() {
    let mut view = mount();
    view.pointer_moved(CENTER.0, CENTER.1);
    for _ in 0..30 {
        tick(&mut view);
    }
    assert!(scale(&view) > MIN_SCALE);

    view.pointer_moved(CORNER.0, CORNER.1);
    let mut previous = scale(&view);
    for _ in 0..60 {
        tick(&mut view);
        let current = scale(&view);
        assert!(current <= previous);
        assert!(current >= MIN_SCALE);
        previous = current;
    }
    assert_eq!(scale(&view), MIN_SCALE);
}

#[test]
fn rotation_advances_every_frame_regardless_of_hover() {
    let mut view = mount();
    for hovered in [false, true] {
        let (x, y) = if hovered { CENTER } else { CORNER };
        view.pointer_moved(x, y);

        let before = view.cube().unwrap().transform.rotation;
        tick(&mut view);
        let after = view.cube().unwrap().transform.rotation;
        let dx = (after.x - before.x).rem_euclid(TAU);
        let dy = (after.y - before.y).rem_euclid(TAU);
        assert!((dx - ROTATION_STEP).abs() < 1e-5);
        assert!((dy - ROTATION_STEP).abs() < 1e-5);
    }
}

#[test]
fn rotation_stays_within_one_turn() {
    let mut view = mount();
    for _ in 0..1000 {
        tick(&mut view);
    }
    let rotation = view.cube().unwrap().transform.rotation;
    assert!((0.0..TAU).contains(&rotation.x));
    assert!((0.0..TAU).contains(&rotation.y));
}

#[test]
fn hover_color_follows_the_latest_pointer_move() {
    let mut view = mount();
    view.pointer_moved(CENTER.0, CENTER.1);
    view.pointer_moved(CORNER.0, CORNER.1);
    view.pointer_moved(CENTER.0, CENTER.1);
    assert!(view.is_hovered());
    assert_eq!(view.cube().unwrap().material.color, Color::from_hex(HOVER_COLOR));

    // Only the last write before a tick counts.
    view.pointer_moved(CORNER.0, CORNER.1);
    tick(&mut view);
    assert_eq!(scale(&view), MIN_SCALE);
    assert_eq!(view.cube().unwrap().material.color, Color::from_hex(IDLE_COLOR));
}

#[test]
fn no_hysteresis_when_reentering() {
    let mut view = mount();
    view.pointer_moved(CENTER.0, CENTER.1);
    tick(&mut view);
    let grown = scale(&view);

    view.pointer_moved(CORNER.0, CORNER.1);
    tick(&mut view);
    view.pointer_moved(CENTER.0, CENTER.1);
    tick(&mut view);
    assert!((scale(&view) - grown).abs() < 1e-5);
}

#[test]
fn every_tick_renders_a_frame() {
    let mut view = mount();
    let before = view.renderer().frames_rendered();
    for _ in 0..5 {
        tick(&mut view);
    }
    assert_eq!(view.renderer().frames_rendered(), before + 5);

    let frame = view.renderer().latest().unwrap();
    let draw = frame.draw_for(view.cube_id()).unwrap();
    assert_eq!(draw.model, view.cube().unwrap().transform.matrix());
}

#[test]
fn teardown_leaves_nothing_running() {
    let mut view = mount();
    let handle = view.frame_handle().unwrap();
    tick(&mut view);

    view.teardown();
    assert!(view.is_torn_down());
    assert_eq!(view.frame_handle(), None);
    assert!(view.listeners().is_empty());
    assert!(view.renderer().is_disposed());

    let rendered = view.renderer().frames_rendered();
    assert!(!view.tick(handle));
    assert_eq!(view.renderer().frames_rendered(), rendered);

    // Pointer moves after teardown are dropped.
    view.pointer_moved(CENTER.0, CENTER.1);
    assert!(!view.is_hovered());
    assert!(!view.listeners().is_registered(ListenerKind::PointerMove));

    view.teardown();
    assert!(view.is_torn_down());
}

#[test]
fn resize_keeps_the_center_hit() {
    let mut view = mount();
    assert!(view.resize(SurfaceRect::new(100.0, 50.0, 400.0, 400.0)));
    assert_eq!(view.camera().aspect, 1.0);

    view.pointer_moved(300.0, 250.0);
    assert!(view.is_hovered());
}

#[test]
fn pixel_ratio_sizes_the_next_frame() {
    let mut view = mount();
    assert_eq!(view.renderer().latest().unwrap().physical_size, (800, 600));

    assert!(view.set_pixel_ratio(2.0));
    tick(&mut view);
    assert_eq!(view.renderer().latest().unwrap().physical_size, (1600, 1200));

    view.teardown();
    assert!(!view.set_pixel_ratio(1.0));
}
