mod common;

use common::{Call, RecordingBackend};
use params::ParameterGroup;
use renderer::fractal::{self, COLORMAP, ITERATIONS};
use renderer::{FrameReport, RenderContext, RenderError, RenderOptions, Viewport};

struct Harness {
    context: RenderContext<RecordingBackend>,
    params: ParameterGroup,
    view: ParameterGroup,
}

impl Harness {
    fn new(viewport: Viewport) -> Self {
        let params = fractal::simulation_group().unwrap();
        let view = fractal::view_group().unwrap();
        let context =
            RenderContext::new(RecordingBackend::new(), viewport, &view, RenderOptions::default())
                .unwrap();
        Self {
            context,
            params,
            view,
        }
    }

    fn render(&mut self, viewport: Viewport) -> FrameReport {
        self.context
            .render_frame(&mut self.params, &mut self.view, viewport, 1.25)
            .unwrap()
    }

    fn backend(&self) -> &RecordingBackend {
        self.context.backend()
    }

    fn clear(&mut self) {
        self.context.backend_mut().clear_calls();
    }
}

const VIEWPORT: Viewport = Viewport {
    width: 64,
    height: 32,
};

#[test]
fn startup_allocates_four_surfaces() {
    let harness = Harness::new(VIEWPORT);
    let backend = harness.backend();
    assert_eq!(backend.live_surfaces(), 4);
    let ids = harness.context.resources().unwrap().ids();
    for id in [ids.seed, ids.ping, ids.pong] {
        let descriptor = backend.descriptor(id).unwrap();
        assert_eq!((descriptor.width, descriptor.height), (64, 32));
        assert_eq!(descriptor.format, renderer::PixelFormat::Rgba16Float);
        assert_eq!(descriptor.filter, renderer::FilterMode::Nearest);
        assert_eq!(descriptor.address, renderer::AddressMode::MirroredRepeat);
    }
    let gradient = backend.descriptor(ids.gradient).unwrap();
    assert_eq!((gradient.width, gradient.height), (100, 1));
    assert_eq!(gradient.filter, renderer::FilterMode::Linear);
    assert_eq!(gradient.address, renderer::AddressMode::Repeat);
}

#[test]
fn iteration_passes_alternate_between_ping_and_pong() {
    for iterations in 1..=4i64 {
        let mut harness = Harness::new(VIEWPORT);
        harness
            .params
            .update(ITERATIONS, iterations, false)
            .unwrap();
        harness.clear();

        let report = harness.render(VIEWPORT);
        let ids = harness.context.resources().unwrap().ids();
        let draws = harness.backend().draws();
        assert_eq!(draws.len(), iterations as usize + 2);

        let seed = draws[0];
        assert_eq!(seed.program, "quadratic-map");
        assert_eq!(seed.sampled("u_input"), Some(ids.seed));
        assert_eq!(seed.target_surface(), Some(ids.ping));
        assert_eq!(seed.step, Some(0));

        let mut written = ids.ping;
        for (step, draw) in draws[1..=iterations as usize].iter().enumerate() {
            let read = draw.sampled("u_input").unwrap();
            assert_eq!(read, written, "step {step} must read the previous output");
            let target = draw.target_surface().unwrap();
            assert_ne!(read, target);
            assert!(target == ids.ping || target == ids.pong);
            assert_eq!(draw.step, Some(step as i32));
            written = target;
        }

        let colorize = draws.last().unwrap();
        assert_eq!(colorize.program, "color-map");
        assert_eq!(colorize.target, renderer::RenderTarget::Display);
        assert_eq!(colorize.sampled("u_input"), Some(written));
        assert_eq!(colorize.sampled("u_cmap"), Some(ids.gradient));

        let expected_final = if iterations % 2 == 1 { ids.pong } else { ids.ping };
        assert_eq!(written, expected_final);
        assert_eq!(
            report,
            FrameReport::Rendered {
                frame: 1,
                iterations: iterations as u32,
                final_surface: expected_final,
            }
        );
    }
}

#[test]
fn zero_iterations_colorize_the_seeded_surface() {
    let mut harness = Harness::new(VIEWPORT);
    harness.params.update(ITERATIONS, 0i64, false).unwrap();
    harness.clear();

    harness.render(VIEWPORT);
    let ping = harness.context.resources().unwrap().ping();
    let draws = harness.backend().draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[1].sampled("u_input"), Some(ping));
}

#[test]
fn iteration_count_changes_apply_on_the_next_frame() {
    let mut harness = Harness::new(VIEWPORT);
    harness.params.update(ITERATIONS, 3i64, false).unwrap();
    harness.clear();
    harness.render(VIEWPORT);
    assert_eq!(harness.backend().draws().len(), 5);

    harness.params.update(ITERATIONS, 6i64, false).unwrap();
    harness.clear();
    harness.render(VIEWPORT);
    assert_eq!(harness.backend().draws().len(), 8);
}

#[test]
fn frames_open_and_close_exactly_once() {
    let mut harness = Harness::new(VIEWPORT);
    harness.clear();
    harness.render(VIEWPORT);
    let calls = &harness.backend().calls;
    assert_eq!(calls.first(), Some(&Call::BeginFrame));
    assert_eq!(calls.last(), Some(&Call::EndFrame));
    assert_eq!(harness.backend().count(|call| *call == Call::BeginFrame), 1);
}

#[test]
fn colorize_pass_has_no_time_input() {
    let mut harness = Harness::new(VIEWPORT);
    harness.clear();
    harness.render(VIEWPORT);
    let draws = harness.backend().draws();
    assert!(draws[0].uniforms.iter().any(|name| name == "u_time"));
    let colorize = draws.last().unwrap();
    assert!(!colorize.uniforms.iter().any(|name| name == "u_time"));
    assert!(colorize.uniforms.iter().any(|name| name == "u_iter"));
}

#[test]
fn every_uniform_matches_the_program_contract() {
    let mut harness = Harness::new(VIEWPORT);
    harness.render(VIEWPORT);
    assert!(harness.backend().skipped.is_empty(), "{:?}", harness.backend().skipped);
}

#[test]
fn resize_reallocates_once_per_new_size() {
    let mut harness = Harness::new(VIEWPORT);
    harness.render(VIEWPORT);
    harness.clear();

    let larger = Viewport::new(128, 96);
    harness.render(larger);
    let backend = harness.backend();
    assert_eq!(backend.count(|call| matches!(call, Call::Release(_))), 4);
    assert_eq!(backend.count(|call| matches!(call, Call::Create { .. })), 4);
    assert_eq!(
        backend.count(|call| matches!(call, Call::ResizeDisplay(128, 96))),
        1
    );
    assert_eq!(backend.live_surfaces(), 4);
    assert_eq!(harness.context.resources().unwrap().size(), (128, 96));

    // Releases complete before any new surface is created.
    let first_create = backend
        .calls
        .iter()
        .position(|call| matches!(call, Call::Create { .. }))
        .unwrap();
    let last_release = backend
        .calls
        .iter()
        .rposition(|call| matches!(call, Call::Release(_)))
        .unwrap();
    assert!(last_release < first_create);

    harness.clear();
    harness.render(larger);
    let backend = harness.backend();
    assert_eq!(backend.count(|call| matches!(call, Call::Release(_))), 0);
    assert_eq!(backend.count(|call| matches!(call, Call::Create { .. })), 0);
    assert_eq!(backend.count(|call| matches!(call, Call::ResizeDisplay(..))), 0);
}

#[test]
fn view_change_rewrites_only_the_gradient() {
    let mut harness = Harness::new(VIEWPORT);
    harness.render(VIEWPORT);
    let gradient = harness.context.resources().unwrap().gradient();

    harness.view.update(COLORMAP, "red", true).unwrap();
    harness.clear();
    harness.render(VIEWPORT);
    let backend = harness.backend();
    assert_eq!(backend.count(|call| *call == Call::Write(gradient)), 1);
    assert_eq!(backend.count(|call| matches!(call, Call::Create { .. })), 0);
    assert_eq!(backend.count(|call| matches!(call, Call::Release(_))), 0);

    harness.clear();
    harness.render(VIEWPORT);
    assert_eq!(
        harness
            .backend()
            .count(|call| matches!(call, Call::Write(_))),
        0
    );
}

#[test]
fn simulation_changes_never_touch_surfaces() {
    let mut harness = Harness::new(VIEWPORT);
    harness.render(VIEWPORT);
    harness.params.nudge(fractal::ALPHA, 1.0).unwrap();
    harness.clear();
    harness.render(VIEWPORT);
    let backend = harness.backend();
    assert_eq!(
        backend.count(|call| matches!(
            call,
            Call::Write(_) | Call::Create { .. } | Call::Release(_)
        )),
        0
    );
    assert!(!harness.params.is_changed());
}

#[test]
fn empty_viewport_keeps_pending_view_change() {
    let mut harness = Harness::new(VIEWPORT);
    harness.view.update(COLORMAP, "blue", false).unwrap();

    assert_eq!(harness.render(Viewport::new(0, 0)), FrameReport::NotReady);
    assert!(harness.view.is_changed());

    harness.clear();
    assert!(matches!(
        harness.render(VIEWPORT),
        FrameReport::Rendered { .. }
    ));
    assert_eq!(
        harness
            .backend()
            .count(|call| matches!(call, Call::Write(_))),
        1
    );
}

#[test]
fn failed_allocation_blocks_frames_until_it_succeeds() {
    let mut harness = Harness::new(VIEWPORT);
    harness.context.backend_mut().fail_create_after = Some(2);

    let resized = Viewport::new(80, 40);
    assert_eq!(harness.render(resized), FrameReport::NotReady);
    assert!(!harness.context.is_ready());
    assert_eq!(harness.backend().live_surfaces(), 0);
    assert!(harness.backend().draws().is_empty());

    harness.context.backend_mut().fail_create_after = None;
    harness.clear();
    assert!(matches!(
        harness.render(resized),
        FrameReport::Rendered { frame: 1, .. }
    ));
    assert_eq!(harness.backend().live_surfaces(), 4);
}

#[test]
fn failed_draw_abandons_only_that_frame() {
    let mut harness = Harness::new(VIEWPORT);
    harness.params.update(ITERATIONS, 4i64, false).unwrap();
    let before = harness.backend().draw_count();
    harness.context.backend_mut().fail_draw_at = Some(before + 2);
    harness.clear();

    assert_eq!(harness.render(VIEWPORT), FrameReport::Abandoned);
    let backend = harness.backend();
    assert_eq!(backend.count(|call| *call == Call::CancelFrame), 1);
    assert_eq!(backend.count(|call| *call == Call::EndFrame), 0);
    assert_eq!(harness.context.frame_state().frames, 0);

    harness.clear();
    assert!(matches!(
        harness.render(VIEWPORT),
        FrameReport::Rendered { frame: 1, .. }
    ));
    assert_eq!(harness.context.frame_state().last_time, 1.25);
}

#[test]
fn failed_gradient_rebuild_retries_next_frame() {
    let mut harness = Harness::new(VIEWPORT);
    harness.view.update(COLORMAP, "green", false).unwrap();
    harness.context.backend_mut().fail_write = true;

    assert_eq!(harness.render(VIEWPORT), FrameReport::Abandoned);
    assert!(harness.view.is_changed());

    harness.context.backend_mut().fail_write = false;
    harness.clear();
    assert!(matches!(
        harness.render(VIEWPORT),
        FrameReport::Rendered { .. }
    ));
    assert_eq!(
        harness
            .backend()
            .count(|call| matches!(call, Call::Write(_))),
        1
    );
}

#[test]
fn compile_failure_is_fatal_at_startup() {
    let view = fractal::view_group().unwrap();
    let mut backend = RecordingBackend::new();
    backend.fail_compile = Some("color-map");
    let err = RenderContext::new(backend, VIEWPORT, &view, RenderOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, RenderError::Startup(_)));
}

#[test]
fn startup_with_empty_viewport_defers_allocation() {
    let mut params = fractal::simulation_group().unwrap();
    let mut view = fractal::view_group().unwrap();
    let mut context = RenderContext::new(
        RecordingBackend::new(),
        Viewport::new(0, 0),
        &view,
        RenderOptions::default(),
    )
    .unwrap();
    assert!(!context.is_ready());
    assert_eq!(context.backend().live_surfaces(), 0);

    let report = context
        .render_frame(&mut params, &mut view, VIEWPORT, 0.0)
        .unwrap();
    assert!(matches!(report, FrameReport::Rendered { .. }));
    assert!(context.is_ready());
}

#[test]
fn teardown_releases_every_surface() {
    let mut harness = Harness::new(VIEWPORT);
    harness.render(VIEWPORT);
    let backend = harness.context.into_backend();
    assert_eq!(backend.live_surfaces(), 0);
}
