use iced::widget::{button, column, container, row, slider, text};
use iced::{Element, Length};

use hoverclip::panel::{ControlKind, ControlValue, Panel, PanelEvent};
use hoverclip::views::{ClusterView, CubeView, ParamChange, Route};
use hoverclip::scene::frame::FrameSink;

// Parameter panel: one row per control, in insertion order
pub fn panel_view<'a>(panel: &Panel<ParamChange>) -> Element<'a, crate::Message> {
    let mut rows = column![text(panel.title()).size(16)].spacing(10);

    for (id, control) in panel.controls() {
        let entry: Element<'a, crate::Message> = match control.kind {
            ControlKind::Toggle { value, .. } => row![
                button(text(format!("{}: {}", control.name, if value { "On" } else { "Off" })))
                    .on_press(crate::Message::Panel(PanelEvent {
                        control: id,
                        value: ControlValue::Bool(!value),
                    }))
                    .width(Length::Fill),
            ]
            .into(),
            ControlKind::Range {
                value,
                min,
                max,
                step,
                ..
            } => row![
                text(control.name),
                slider(min..=max, value, move |v| crate::Message::Panel(PanelEvent {
                    control: id,
                    value: ControlValue::Number(v),
                }))
                .step(step)
                .width(Length::Fixed(140.0)),
                text(format!("{:.2}", value)),
            ]
            .spacing(10)
            .align_y(iced::Alignment::Center)
            .into(),
        };
        rows = rows.push(entry);
    }

    container(rows)
        .padding(12)
        .width(Length::Fixed(260.0))
        .height(Length::Fill)
        .into()
}

pub fn cube_status<'a>(cube: Option<&CubeView<FrameSink>>) -> Element<'a, crate::Message> {
    let Some(cube) = cube else {
        return text("Waiting for surface").into();
    };
    let scale = cube.cube().map(|c| c.transform.scale.x).unwrap_or(1.0);
    row![
        text(if cube.is_hovered() { "Hover: yes" } else { "Hover: no" }),
        text("|"),
        text(format!("Scale: {:.2}", scale)),
        text("|"),
        text(format!("Frames: {}", cube.renderer().frames_rendered())),
    ]
    .spacing(10)
    .align_y(iced::Alignment::Center)
    .into()
}

pub fn cluster_status<'a>(cluster: Option<&ClusterView<FrameSink>>) -> Element<'a, crate::Message> {
    let Some(cluster) = cluster else {
        return text("Waiting for surface").into();
    };
    let params = cluster.params();
    row![
        text(if params.clip_intersection { "Clip: intersection" } else { "Clip: union" }),
        text("|"),
        text(format!("Plane constant: {:.2}", params.plane_constant)),
        text("|"),
        text(if params.auto_rotate { "Auto-rotate: on" } else { "Auto-rotate: off" }),
        text("|"),
        text(format!("Frames: {}", cluster.renderer().frames_rendered())),
    ]
    .spacing(10)
    .align_y(iced::Alignment::Center)
    .into()
}

pub fn status_row<'a>(
    route: Route,
    cube: Option<&CubeView<FrameSink>>,
    cluster: Option<&ClusterView<FrameSink>>,
) -> Element<'a, crate::Message> {
    match route {
        Route::Cube => cube_status(cube),
        Route::Cluster => cluster_status(cluster),
    }
}
