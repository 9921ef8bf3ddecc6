//! Behaviour of the clipped sphere cluster: parameter broadcast, clip mode
//! flips, the auto-rotate loop and teardown.

use glam::Vec3;

use hoverclip::camera::SurfaceRect;
use hoverclip::clip::ClipMode;
use hoverclip::host::{ListenerKind, MountError, Surface};
use hoverclip::orbit::OrbitInput;
use hoverclip::panel::{ControlValue, PanelEvent};
use hoverclip::scene::frame::FrameSink;
use hoverclip::views::{ClusterOptions, ClusterView, ParamChange};

fn mount() -> ClusterView<FrameSink> {
    let surface = Surface::new(SurfaceRect::sized(800.0, 600.0), 1.0);
    let options = ClusterOptions { hue_seed: Some(7) };
    ClusterView::mount(Some(surface), FrameSink::default(), options).unwrap()
}

fn rendered(view: &ClusterView<FrameSink>) -> u64 {
    view.renderer().frames_rendered()
}

#[test]
fn mount_builds_fifteen_spheres_and_renders_once() {
    let view = mount();
    assert_eq!(view.sphere_ids().len(), 15);
    assert_eq!(view.plane_ids().len(), 3);
    assert_eq!(rendered(&view), 1);
    assert!(view.surface().is_attached());
    assert_eq!(view.rotate_handle(), None);
}

#[test]
fn missing_surface_skips_mount() {
    let result = ClusterView::mount(None, FrameSink::default(), ClusterOptions::default());
    assert!(matches!(result, Err(MountError::SurfaceUnavailable)));
}

#[test]
fn resize_renders_exactly_once_with_the_new_aspect() {
    let mut view = mount();
    let before = rendered(&view);

    assert!(view.resize(SurfaceRect::sized(600.0, 600.0)));
    assert_eq!(rendered(&view), before + 1);
    assert_eq!(view.camera().aspect, 1.0);
    assert_eq!(view.renderer().latest().unwrap().physical_size, (600, 600));
}

#[test]
fn resize_after_teardown_is_ignored() {
    let mut view = mount();
    view.teardown();
    let before = rendered(&view);

    assert!(!view.resize(SurfaceRect::sized(300.0, 200.0)));
    assert_eq!(rendered(&view), before);
}

#[test]
fn pixel_ratio_sizes_the_rendered_frame() {
    let surface = Surface::new(SurfaceRect::sized(400.0, 300.0), 2.0);
    let mut view =
        ClusterView::mount(Some(surface), FrameSink::default(), ClusterOptions::default()).unwrap();
    assert_eq!(view.renderer().latest().unwrap().physical_size, (800, 600));

    let before = rendered(&view);
    assert!(view.set_pixel_ratio(1.5));
    assert_eq!(rendered(&view), before + 1);
    assert_eq!(view.renderer().latest().unwrap().physical_size, (600, 450));

    assert!(!view.set_pixel_ratio(1.5));
    assert_eq!(rendered(&view), before + 1);
}

#[test]
fn same_seed_gives_the_same_colors() {
    let a = mount();
    let b = mount();
    for (ia, ib) in a.sphere_ids().iter().zip(b.sphere_ids()) {
        assert_eq!(
            a.scene().mesh(*ia).unwrap().material.color,
            b.scene().mesh(*ib).unwrap().material.color
        );
    }
}

#[test]
fn plane_constant_reaches_every_plane_and_the_next_frame() {
    let mut view = mount();
    let before = rendered(&view);

    assert!(view.apply(ParamChange::PlaneConstant(0.4)));
    assert_eq!(rendered(&view), before + 1);
    for (_, plane) in view.planes().iter() {
        assert_eq!(plane.constant, 0.4);
    }

    let frame = view.renderer().latest().unwrap();
    for packed in frame.planes.iter().take(3) {
        assert_eq!(packed[3], 0.4);
    }
}

#[test]
fn plane_constant_is_clamped_to_its_range() {
    let mut view = mount();
    view.apply(ParamChange::PlaneConstant(3.0));
    assert_eq!(view.params().plane_constant, 1.0);
    assert!(!view.apply(ParamChange::PlaneConstant(f32::NAN)));
    assert_eq!(view.params().plane_constant, 1.0);
}

#[test]
fn direct_plane_constant_is_snapped_like_the_panel() {
    let mut view = mount();
    view.apply(ParamChange::PlaneConstant(0.304));

    assert_eq!(view.params().plane_constant, 0.3);
    for (_, plane) in view.planes().iter() {
        assert_eq!(plane.constant, 0.3);
    }
    let control = view.panel().find("planeConstant").unwrap();
    assert_eq!(
        view.panel().control(control).unwrap().value(),
        ControlValue::Number(0.3)
    );
}

#[test]
fn clip_mode_reaches_every_sphere() {
    let mut view = mount();
    view.apply(ParamChange::ClipIntersection(false));

    let frame = view.renderer().latest().unwrap();
    for id in view.sphere_ids() {
        assert_eq!(view.scene().mesh(*id).unwrap().material.clip_mode(), ClipMode::Union);
        assert_eq!(frame.draw_for(*id).unwrap().compiled.clip_mode, ClipMode::Union);
    }
}

#[test]
fn clip_mode_flip_changes_visibility_of_the_octant_point() {
    let mut view = mount();
    let point = Vec3::splat(0.5);
    let outer = *view.sphere_ids().last().unwrap();

    let clipped = |view: &ClusterView<FrameSink>| {
        view.scene()
            .mesh(outer)
            .unwrap()
            .material
            .clips_point(view.planes(), point)
    };

    // Visible for the +X plane, so any-plane intersection keeps it.
    assert!(!clipped(&view));

    view.apply(ParamChange::ClipIntersection(false));
    assert!(clipped(&view));

    view.apply(ParamChange::ClipIntersection(true));
    assert!(!clipped(&view));
}

#[test]
fn antialias_toggle_recompiles_every_sphere() {
    let mut view = mount();
    let before = view.renderer().recompiles();

    view.apply(ParamChange::AntialiasEdges(false));
    assert_eq!(view.renderer().recompiles(), before + 15);

    let frame = view.renderer().latest().unwrap();
    assert!(frame.draws.iter().all(|d| !d.compiled.alpha_to_coverage));

    // The plane constant is a uniform; no recompiles.
    view.apply(ParamChange::PlaneConstant(0.2));
    assert_eq!(view.renderer().recompiles(), before + 15);
}

#[test]
fn helpers_show_up_as_lines() {
    let mut view = mount();
    assert!(view.renderer().latest().unwrap().lines.is_empty());

    view.apply(ParamChange::ShowHelpers(true));
    assert!(!view.renderer().latest().unwrap().lines.is_empty());
}

#[test]
fn panel_edits_go_through_the_bound_callback() {
    let mut view = mount();
    let control = view.panel().find("planeConstant").unwrap();
    assert!(view.panel_input(PanelEvent {
        control,
        value: ControlValue::Number(-0.5),
    }));
    assert_eq!(view.params().plane_constant, -0.5);
    assert_eq!(
        view.panel().control(control).unwrap().value(),
        ControlValue::Number(-0.5)
    );

    // Wrong value kind for the control.
    assert!(!view.panel_input(PanelEvent {
        control,
        value: ControlValue::Bool(true),
    }));
}

#[test]
fn auto_rotate_runs_only_while_enabled() {
    let mut view = mount();
    let before = rendered(&view);
    view.apply(ParamChange::AutoRotate(true));
    assert_eq!(rendered(&view), before);

    let handle = view.rotate_handle().unwrap();
    let start = view.camera().position;
    for _ in 0..10 {
        assert!(view.tick(handle));
    }
    assert_eq!(rendered(&view), before + 10);
    assert!(view.camera().position.distance(start) > 1e-4);

    view.apply(ParamChange::AutoRotate(false));
    assert_eq!(view.rotate_handle(), None);
    assert!(!view.orbit().auto_rotate);

    let stopped = rendered(&view);
    let position = view.camera().position;
    assert!(!view.tick(handle));
    assert_eq!(rendered(&view), stopped);
    assert_eq!(view.camera().position, position);
}

#[test]
fn re_enabling_auto_rotate_issues_a_fresh_handle() {
    let mut view = mount();
    view.apply(ParamChange::AutoRotate(true));
    let first = view.rotate_handle().unwrap();
    view.apply(ParamChange::AutoRotate(false));
    view.apply(ParamChange::AutoRotate(true));
    let second = view.rotate_handle().unwrap();

    assert_ne!(first, second);
    assert!(!view.tick(first));
    assert!(view.tick(second));
}

#[test]
fn orbit_drag_renders_only_when_the_camera_moves() {
    let mut view = mount();
    let before = rendered(&view);

    assert!(view.orbit_input(OrbitInput::Rotate {
        dx: 40.0,
        dy: 0.0,
        viewport_height: 600.0,
    }));
    assert_eq!(rendered(&view), before + 1);

    // Panning is disabled for this view.
    assert!(!view.orbit_input(OrbitInput::Pan {
        dx: 40.0,
        dy: 10.0,
        viewport_height: 600.0,
    }));
    assert_eq!(rendered(&view), before + 1);
}

#[test]
fn zoom_is_bounded_by_the_orbit_distance_limits() {
    let mut view = mount();
    for _ in 0..200 {
        view.orbit_input(OrbitInput::Zoom { steps: 1.0 });
    }
    assert!(view.camera().position.length() >= 1.0 - 1e-4);

    for _ in 0..200 {
        view.orbit_input(OrbitInput::Zoom { steps: -1.0 });
    }
    assert!(view.camera().position.length() <= 10.0 + 1e-4);
}

#[test]
fn teardown_with_auto_rotate_active_cancels_everything() {
    let mut view = mount();
    view.apply(ParamChange::AutoRotate(true));
    let handle = view.rotate_handle().unwrap();
    view.tick(handle);

    view.teardown();
    assert!(view.is_torn_down());
    assert_eq!(view.rotate_handle(), None);
    assert!(!view.orbit().auto_rotate);
    assert!(view.listeners().is_empty());
    assert!(!view.listeners().is_registered(ListenerKind::OrbitChange));
    assert!(view.panel().is_destroyed());
    assert!(view.renderer().is_disposed());

    let rendered_after = rendered(&view);
    assert!(!view.tick(handle));
    assert!(!view.apply(ParamChange::PlaneConstant(0.3)));
    assert!(!view.orbit_input(OrbitInput::Zoom { steps: 1.0 }));
    assert_eq!(rendered(&view), rendered_after);
}
