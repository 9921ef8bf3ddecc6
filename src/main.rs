mod controls;
mod ui;

use clap::Parser;
use iced::widget::{column, container, row};
use iced::{Element, Event, Length, Size, Subscription, Task, event, mouse, window};

use hoverclip::camera::SurfaceRect;
use hoverclip::canvas::{self, SurfaceProgram};
use hoverclip::config::{Args, ViewerConfig};
use hoverclip::frame_loop::LoopHandle;
use hoverclip::host::{ListenerKind, MountError, Surface};
use hoverclip::logging;
use hoverclip::orbit::OrbitInput;
use hoverclip::panel::PanelEvent;
use hoverclip::scene::frame::FrameSink;
use hoverclip::views::{ClusterOptions, ClusterView, CubeView, Route};

#[derive(Debug, Clone)]
enum Message {
    RouteSelected(Route),
    SurfaceResized(SurfaceRect),
    ScaleFactorChanged(f32),
    PointerMoved(f32, f32),
    CubeFrame(LoopHandle),
    ClusterFrame(LoopHandle),
    Orbit(OrbitInput),
    Panel(PanelEvent),
}

struct App {
    config: ViewerConfig,
    route: Route,
    /// Last layout reported by the surface widget. `None` until the first
    /// layout pass, which is when a view can mount.
    bounds: Option<SurfaceRect>,
    /// Window scale factor, passed to every mounted surface.
    pixel_ratio: f32,
    cube: Option<CubeView<FrameSink>>,
    cluster: Option<ClusterView<FrameSink>>,
}

impl App {
    fn new(config: ViewerConfig) -> (Self, Task<Message>) {
        let app = Self {
            route: config.start_view,
            config,
            bounds: None,
            pixel_ratio: 1.0,
            cube: None,
            cluster: None,
        };
        let scale = window::latest()
            .and_then(window::scale_factor)
            .map(Message::ScaleFactorChanged);
        (app, scale)
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::RouteSelected(route) => {
                if route != self.route {
                    tracing::info!(from = %self.route, to = %route, "switching view");
                    self.unmount();
                    self.route = route;
                    self.mount();
                }
            }
            Message::SurfaceResized(bounds) => {
                self.bounds = Some(bounds);
                let resized = match self.route {
                    Route::Cube => self.cube.as_mut().map(|v| v.resize(bounds)),
                    Route::Cluster => self.cluster.as_mut().map(|v| v.resize(bounds)),
                };
                if resized.is_none() {
                    self.mount();
                }
            }
            Message::ScaleFactorChanged(factor) => {
                if factor.is_finite() && factor > 0.0 && factor != self.pixel_ratio {
                    tracing::debug!(factor, "window scale factor changed");
                    self.pixel_ratio = factor;
                    if let Some(cube) = self.cube.as_mut() {
                        cube.set_pixel_ratio(factor);
                    }
                    if let Some(cluster) = self.cluster.as_mut() {
                        cluster.set_pixel_ratio(factor);
                    }
                }
            }
            Message::PointerMoved(x, y) => {
                if let Some(cube) = self.cube.as_mut() {
                    cube.pointer_moved(x, y);
                }
            }
            Message::CubeFrame(handle) => {
                if let Some(cube) = self.cube.as_mut() {
                    cube.tick(handle);
                }
            }
            Message::ClusterFrame(handle) => {
                if let Some(cluster) = self.cluster.as_mut() {
                    cluster.tick(handle);
                }
            }
            Message::Orbit(input) => {
                if let Some(cluster) = self.cluster.as_mut() {
                    cluster.orbit_input(input);
                }
            }
            Message::Panel(event) => {
                if let Some(cluster) = self.cluster.as_mut() {
                    cluster.panel_input(event);
                }
            }
        }

        Task::none()
    }

    /// Mounts the current route if the surface has been laid out. Without a
    /// surface the mount is skipped and retried on the next resize.
    fn mount(&mut self) {
        let surface = self.bounds.map(|bounds| Surface::new(bounds, self.pixel_ratio));

        let result = match self.route {
            Route::Cube => CubeView::mount(surface, FrameSink::default()).map(|view| {
                self.cube = Some(view);
            }),
            Route::Cluster => {
                let options = ClusterOptions {
                    hue_seed: self.config.hue_seed,
                };
                ClusterView::mount(surface, FrameSink::default(), options).map(|view| {
                    self.cluster = Some(view);
                })
            }
        };

        if let Err(MountError::SurfaceUnavailable) = result {
            tracing::debug!(route = %self.route, "surface not laid out yet, mount deferred");
        }
    }

    fn unmount(&mut self) {
        if let Some(mut cube) = self.cube.take() {
            cube.teardown();
        }
        if let Some(mut cluster) = self.cluster.take() {
            cluster.teardown();
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![event::listen_with(rescaled)];

        if let Some(cube) = &self.cube {
            if cube.listeners().is_registered(ListenerKind::PointerMove) {
                subscriptions.push(event::listen_with(pointer_moved));
            }
            if let Some(handle) = cube.frame_handle() {
                subscriptions.push(
                    window::frames()
                        .with(handle)
                        .map(|(handle, _)| Message::CubeFrame(handle)),
                );
            }
        }

        if let Some(handle) = self.cluster.as_ref().and_then(|c| c.rotate_handle()) {
            subscriptions.push(
                window::frames()
                    .with(handle)
                    .map(|(handle, _)| Message::ClusterFrame(handle)),
            );
        }

        Subscription::batch(subscriptions)
    }

    fn view(&self) -> Element<'_, Message> {
        let ribbon = ui::ribbon(self.route, Message::RouteSelected);

        let surface: Element<'_, Message> = match self.route {
            Route::Cube => {
                let frame = self.cube.as_ref().and_then(|v| v.renderer().latest());
                canvas::widget(SurfaceProgram::new(frame, Message::SurfaceResized))
            }
            Route::Cluster => {
                let frame = self.cluster.as_ref().and_then(|v| v.renderer().latest());
                canvas::widget(
                    SurfaceProgram::new(frame, Message::SurfaceResized).with_orbit(Message::Orbit),
                )
            }
        };

        let content: Element<'_, Message> = match self.cluster.as_ref() {
            Some(cluster) if self.route == Route::Cluster => row![surface, controls::panel_view(cluster.panel())]
                .spacing(10)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            _ => surface,
        };

        let status_bar = controls::status_row(self.route, self.cube.as_ref(), self.cluster.as_ref());

        column![ribbon, content, container(status_bar).padding(8).width(Length::Fill)]
            .spacing(10)
            .padding(12)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

fn pointer_moved(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    match event {
        Event::Mouse(mouse::Event::CursorMoved { position }) => {
            Some(Message::PointerMoved(position.x, position.y))
        }
        _ => None,
    }
}

fn rescaled(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    match event {
        Event::Window(window::Event::Rescaled(factor)) => Some(Message::ScaleFactorChanged(factor)),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ViewerConfig::resolve(&args)?;
    let _log_guard = logging::init(&config.log);

    tracing::info!(view = %config.start_view, seed = ?config.hue_seed, "starting hoverclip");

    let window_size = Size::new(config.window.width, config.window.height);
    iced::application(move || App::new(config.clone()), App::update, App::view)
        .subscription(App::subscription)
        .title("hoverclip")
        .window_size(window_size)
        .run()?;

    Ok(())
}
