use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use renderer::{FrameReport, RenderContext, Viewport, WgpuBackend};
use scheduler::FrameDecision;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::app::App;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    TogglePlay,
    Share,
    Reset,
    ToggleFullscreen,
    SelectNext,
    SelectPrevious,
    Increase,
    Decrease,
    Quit,
}

fn action_for(event: &KeyEvent, modifiers: ModifiersState) -> Option<Action> {
    if event.state != ElementState::Pressed {
        return None;
    }
    let action = match &event.logical_key {
        Key::Named(NamedKey::Space) => Action::TogglePlay,
        Key::Named(NamedKey::Tab) if modifiers.shift_key() => Action::SelectPrevious,
        Key::Named(NamedKey::Tab) => Action::SelectNext,
        Key::Named(NamedKey::ArrowUp) => Action::Increase,
        Key::Named(NamedKey::ArrowDown) => Action::Decrease,
        Key::Named(NamedKey::Escape) => Action::Quit,
        Key::Character(value) => match value.to_ascii_lowercase().as_str() {
            " " => Action::TogglePlay,
            "s" => Action::Share,
            "r" => Action::Reset,
            "f" => Action::ToggleFullscreen,
            "q" => Action::Quit,
            _ => return None,
        },
        _ => return None,
    };
    // Only parameter nudges auto-repeat.
    if event.repeat && !matches!(action, Action::Increase | Action::Decrease) {
        return None;
    }
    Some(action)
}

fn viewport_of(window: &Window) -> Viewport {
    let size = window.inner_size();
    Viewport::new(size.width, size.height)
}

/// Opens the window and drives frames until it closes.
pub fn run_window(mut app: App, settings: &Settings) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(settings.window.title.clone())
        .with_inner_size(PhysicalSize::new(
            settings.window.width,
            settings.window.height,
        ))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let viewport = viewport_of(&window);
    let backend = WgpuBackend::new(&*window, viewport.width, viewport.height)
        .context("failed to initialise GPU backend")?;
    tracing::info!(
        width = viewport.width,
        height = viewport.height,
        format = ?backend.display_format(),
        "renderer ready"
    );
    let mut context = RenderContext::new(backend, viewport, app.view(), settings.render)
        .context("failed to start renderer")?;

    let mut modifiers = ModifiersState::default();
    let mut failure: Option<anyhow::Error> = None;

    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::ModifiersChanged(state) => modifiers = state.state(),
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(action) = action_for(&event, modifiers) else {
                    return;
                };
                match action {
                    Action::TogglePlay => {
                        app.toggle_play(Instant::now());
                    }
                    Action::Share => {
                        let shared = app.share();
                        tracing::info!(token = %shared.token, "shared session");
                        println!("{}", shared.url.as_deref().unwrap_or(&shared.token));
                    }
                    Action::Reset => {
                        if let Err(err) = app.reset() {
                            tracing::warn!(error = %err, "reset failed");
                        }
                    }
                    Action::ToggleFullscreen => {
                        let next = match window.fullscreen() {
                            Some(_) => None,
                            None => Some(Fullscreen::Borderless(None)),
                        };
                        window.set_fullscreen(next);
                    }
                    Action::SelectNext => app.select_next(),
                    Action::SelectPrevious => app.select_previous(),
                    Action::Increase | Action::Decrease => {
                        let direction = if action == Action::Increase { 1.0 } else { -1.0 };
                        if let Err(err) = app.nudge_selected(direction) {
                            tracing::warn!(error = %err, "could not change parameter");
                        }
                    }
                    Action::Quit => elwt.exit(),
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                app.toggle_play(Instant::now());
            }
            WindowEvent::Resized(size) => {
                tracing::debug!(width = size.width, height = size.height, "window resized");
                app.scheduler_mut().request_frame();
            }
            WindowEvent::RedrawRequested => {
                let time = app.scheduler().time();
                let (params, view) = app.groups_mut();
                match context.render_frame(params, view, viewport_of(&window), time) {
                    Ok(report) => {
                        if let FrameReport::Rendered {
                            frame, iterations, ..
                        } = report
                        {
                            tracing::trace!(frame, iterations, time, "frame presented");
                        }
                        if let Err(err) = app.frame_finished(Instant::now(), report) {
                            failure = Some(err);
                            elwt.exit();
                        }
                    }
                    Err(err) => {
                        failure = Some(anyhow::Error::new(err).context("rendering failed"));
                        elwt.exit();
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            app.flush_edits();
            let now = Instant::now();
            match app.scheduler_mut().poll(now) {
                FrameDecision::Render => {
                    window.request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                }
                FrameDecision::WaitUntil(deadline) => {
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                }
                FrameDecision::Idle => elwt.set_control_flow(ControlFlow::Wait),
            }
        }
        _ => {}
    });

    // Surfaces go before the window they present to.
    drop(context.into_backend());
    tracing::info!(frames = app.scheduler().frames(), "window closed");

    if let Some(err) = failure {
        return Err(err);
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
