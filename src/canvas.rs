use std::sync::Arc;

use iced::widget::shader;
use iced::{Element, Event, Length, Point, Rectangle, mouse};

use crate::camera::SurfaceRect;
use crate::orbit::OrbitInput;
use crate::scene::frame::Frame;
use crate::scene::render::Primitive;

/// Shader widget program that shows the latest rendered frame of a view and
/// reports layout and pointer gestures back to the host.
pub struct SurfaceProgram<Message> {
    frame: Option<Arc<Frame>>,
    on_resize: fn(SurfaceRect) -> Message,
    on_orbit: Option<fn(OrbitInput) -> Message>,
}

impl<Message> SurfaceProgram<Message> {
    pub fn new(frame: Option<Arc<Frame>>, on_resize: fn(SurfaceRect) -> Message) -> Self {
        Self {
            frame,
            on_resize,
            on_orbit: None,
        }
    }

    /// Enables drag and wheel gestures.
    pub fn with_orbit(mut self, on_orbit: fn(OrbitInput) -> Message) -> Self {
        self.on_orbit = Some(on_orbit);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drag {
    Rotate,
    Pan,
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    last_bounds: Option<Rectangle>,
    /// Layout change not yet reported to the host.
    pending_resize: Option<SurfaceRect>,
    drag: Option<Drag>,
    last_cursor: Option<Point>,
}

impl SurfaceState {
    fn track_bounds(&mut self, bounds: Rectangle) {
        if self.last_bounds != Some(bounds) {
            self.last_bounds = Some(bounds);
            self.pending_resize = Some(surface_rect(bounds));
        }
    }

    fn take_resize(&mut self) -> Option<SurfaceRect> {
        self.pending_resize.take()
    }

    fn press(&mut self, drag: Drag, cursor: Option<Point>) -> bool {
        let Some(cursor) = cursor else {
            return false;
        };
        self.drag = Some(drag);
        self.last_cursor = Some(cursor);
        true
    }

    fn release(&mut self, drag: Drag) -> bool {
        if self.drag != Some(drag) {
            return false;
        }
        self.drag = None;
        self.last_cursor = None;
        true
    }

    /// Turns a cursor move during a drag into an orbit gesture.
    fn drag_to(&mut self, cursor: Point, viewport_height: f32) -> Option<OrbitInput> {
        let drag = self.drag?;
        let last = self.last_cursor.replace(cursor)?;
        let dx = cursor.x - last.x;
        let dy = cursor.y - last.y;
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        Some(match drag {
            Drag::Rotate => OrbitInput::Rotate {
                dx,
                dy,
                viewport_height,
            },
            Drag::Pan => OrbitInput::Pan {
                dx,
                dy,
                viewport_height,
            },
        })
    }
}

/// Wheel delta in line steps. Scrolling up zooms in.
pub fn scroll_steps(delta: mouse::ScrollDelta) -> f32 {
    match delta {
        mouse::ScrollDelta::Lines { y, .. } => y,
        mouse::ScrollDelta::Pixels { y, .. } => y / 120.0,
    }
}

pub fn surface_rect(bounds: Rectangle) -> SurfaceRect {
    SurfaceRect::new(bounds.x, bounds.y, bounds.width, bounds.height)
}

impl<Message> shader::Program<Message> for SurfaceProgram<Message> {
    type Primitive = Primitive;

    type State = SurfaceState;

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<shader::Action<Message>> {
        state.track_bounds(bounds);

        // A gesture wins this event; the resize goes out with the next one.
        self.gesture(state, event, bounds, cursor).or_else(|| {
            let rect = state.take_resize()?;
            Some(shader::Action::publish((self.on_resize)(rect)))
        })
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if self.on_orbit.is_none() {
            return mouse::Interaction::default();
        }
        if state.drag.is_some() {
            mouse::Interaction::Grabbing
        } else if cursor.position_in(bounds).is_some() {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }

    fn draw(&self, _state: &Self::State, _cursor: mouse::Cursor, _bounds: Rectangle) -> Self::Primitive {
        Primitive::new(self.frame.clone())
    }
}

impl<Message> SurfaceProgram<Message> {
    fn gesture(
        &self,
        state: &mut SurfaceState,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<shader::Action<Message>> {
        let on_orbit = self.on_orbit?;
        let cursor_pos = cursor.position_in(bounds);

        match event {
            Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                cursor_pos?;
                let steps = scroll_steps(*delta);
                if steps.abs() <= f32::EPSILON {
                    return None;
                }
                Some(shader::Action::publish(on_orbit(OrbitInput::Zoom { steps })).and_capture())
            }
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => state
                .press(Drag::Rotate, cursor_pos)
                .then(|| shader::Action::request_redraw().and_capture()),
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Right)) => state
                .press(Drag::Pan, cursor_pos)
                .then(|| shader::Action::request_redraw().and_capture()),
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => state
                .release(Drag::Rotate)
                .then(|| shader::Action::request_redraw().and_capture()),
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Right)) => state
                .release(Drag::Pan)
                .then(|| shader::Action::request_redraw().and_capture()),
            Event::Mouse(mouse::Event::CursorMoved { position }) => {
                // Drags keep tracking outside the widget until release.
                let input = state.drag_to(*position, bounds.height)?;
                Some(shader::Action::publish(on_orbit(input)).and_capture())
            }
            _ => None,
        }
    }
}

pub fn widget<'a, Message>(program: SurfaceProgram<Message>) -> Element<'a, Message>
where
    Message: 'a,
{
    iced::widget::shader::Shader::new(program)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_drag_becomes_rotation() {
        let mut state = SurfaceState::default();
        assert!(state.press(Drag::Rotate, Some(Point::new(10.0, 10.0))));

        let input = state.drag_to(Point::new(25.0, 4.0), 600.0);
        assert_eq!(
            input,
            Some(OrbitInput::Rotate {
                dx: 15.0,
                dy: -6.0,
                viewport_height: 600.0
            })
        );

        assert!(state.release(Drag::Rotate));
        assert_eq!(state.drag_to(Point::new(30.0, 4.0), 600.0), None);
    }

    #[test]
    fn press_outside_the_widget_is_ignored() {
        let mut state = SurfaceState::default();
        assert!(!state.press(Drag::Pan, None));
        assert!(!state.release(Drag::Pan));
    }

    #[test]
    fn releasing_the_other_button_keeps_the_drag() {
        let mut state = SurfaceState::default();
        state.press(Drag::Pan, Some(Point::ORIGIN));
        assert!(!state.release(Drag::Rotate));
        assert!(matches!(
            state.drag_to(Point::new(1.0, 0.0), 100.0),
            Some(OrbitInput::Pan { .. })
        ));
    }

    #[test]
    fn press_during_a_layout_change_still_starts_the_drag() {
        let mut state = SurfaceState::default();
        let bounds = Rectangle::new(Point::new(0.0, 40.0), iced::Size::new(640.0, 480.0));

        state.track_bounds(bounds);
        assert!(state.press(Drag::Rotate, Some(Point::new(5.0, 5.0))));
        assert_eq!(state.drag, Some(Drag::Rotate));

        // Reported once, on a later event.
        assert_eq!(state.take_resize(), Some(SurfaceRect::new(0.0, 40.0, 640.0, 480.0)));
        assert_eq!(state.take_resize(), None);

        state.track_bounds(bounds);
        assert_eq!(state.take_resize(), None);
    }

    #[test]
    fn pixel_scroll_is_scaled_to_lines() {
        assert_eq!(scroll_steps(mouse::ScrollDelta::Pixels { x: 0.0, y: 240.0 }), 2.0);
        assert_eq!(scroll_steps(mouse::ScrollDelta::Lines { x: 3.0, y: -1.0 }), -1.0);
    }
}
