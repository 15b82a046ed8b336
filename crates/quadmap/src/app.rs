use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use params::{ParamKind, ParamValue, ParameterGroup};
use renderer::fractal::{self, SIMULATION_GROUP, VIEW_GROUP};
use renderer::FrameReport;
use scheduler::{AnimationScheduler, PlayState};
use session::SessionCodec;
use tracing::{debug, info, warn};

use crate::settings::Settings;

/// A token and, when a share base is configured, the URL carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSession {
    pub token: String,
    pub url: Option<String>,
}

/// Everything the host needs besides the window and the renderer.
pub struct App {
    params: ParameterGroup,
    view: ParameterGroup,
    scheduler: AnimationScheduler,
    codec: SessionCodec,
    include_time: bool,
    share_base: Option<String>,
    selection: usize,
    edited: Rc<Cell<bool>>,
}

impl App {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut simulation = fractal::simulation_declarations();
        fractal::apply_overrides(&mut simulation, settings.simulation.iter().cloned())
            .context("failed to apply [params] overrides")?;
        let mut presentation = fractal::view_declarations();
        fractal::apply_overrides(&mut presentation, settings.view.iter().cloned())
            .context("failed to apply [view] overrides")?;

        let initial = if settings.autoplay {
            PlayState::Playing
        } else {
            PlayState::Paused
        };
        let mut app = Self {
            params: ParameterGroup::new(simulation)?,
            view: ParameterGroup::new(presentation)?,
            scheduler: AnimationScheduler::new(initial),
            codec: SessionCodec::new(settings.time_mode),
            include_time: settings.include_time,
            share_base: settings.share_base.clone(),
            selection: 0,
            edited: Rc::new(Cell::new(false)),
        };
        app.install_observers()?;
        app.scheduler.request_frame();
        Ok(app)
    }

    fn install_observers(&mut self) -> Result<()> {
        for group in [&mut self.params, &mut self.view] {
            let ids: Vec<String> = group.ids().map(str::to_string).collect();
            for id in ids {
                let edited = Rc::clone(&self.edited);
                group.observe(&id, move |_| edited.set(true))?;
            }
        }
        Ok(())
    }

    pub fn params(&self) -> &ParameterGroup {
        &self.params
    }

    pub fn view(&self) -> &ParameterGroup {
        &self.view
    }

    /// Both groups, mutably, for one call into the renderer.
    pub fn groups_mut(&mut self) -> (&mut ParameterGroup, &mut ParameterGroup) {
        (&mut self.params, &mut self.view)
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut AnimationScheduler {
        &mut self.scheduler
    }

    /// Restores a session token. Returns whether anything was loaded.
    pub fn load_session(&mut self, input: &str) -> bool {
        let Some(snapshot) = self.codec.decode(input) else {
            warn!("ignoring unreadable session token");
            return false;
        };
        let time = snapshot.apply(&mut [
            (SIMULATION_GROUP, &mut self.params),
            (VIEW_GROUP, &mut self.view),
        ]);
        if let Some(time) = time {
            if let Err(err) = self.scheduler.set_time(time) {
                warn!(error = %err, "ignoring session time");
            }
        }
        info!(time = self.scheduler.time(), "restored session");
        self.scheduler.request_frame();
        true
    }

    pub fn share(&self) -> SharedSession {
        let time = self.include_time.then(|| self.scheduler.time());
        self.share_at(time)
    }

    pub fn share_at(&self, time: Option<f64>) -> SharedSession {
        let token = self.codec.encode(
            &[(SIMULATION_GROUP, &self.params), (VIEW_GROUP, &self.view)],
            time,
        );
        let url = self
            .share_base
            .as_deref()
            .map(|base| session::share_url(base, &token));
        SharedSession { token, url }
    }

    /// Back to the defaults at time zero.
    pub fn reset(&mut self) -> Result<()> {
        self.params.reset();
        self.view.reset();
        self.params.mark_changed();
        self.view.mark_changed();
        self.install_observers()?;
        self.scheduler.reset_time();
        self.scheduler.request_frame();
        info!("reset parameters");
        Ok(())
    }

    pub fn toggle_play(&mut self, now: Instant) -> PlayState {
        let state = self.scheduler.toggle_play(now);
        info!(?state, time = self.scheduler.time(), "playback toggled");
        state
    }

    /// Parameters in edit order: simulation first, then presentation.
    fn selectable(&self) -> Vec<(&'static str, String)> {
        let simulation = self
            .params
            .ids()
            .map(|id| (SIMULATION_GROUP, id.to_string()));
        let presentation = self.view.ids().map(|id| (VIEW_GROUP, id.to_string()));
        simulation.chain(presentation).collect()
    }

    pub fn selected(&self) -> Option<(&'static str, String)> {
        self.selectable().into_iter().nth(self.selection)
    }

    pub fn select_next(&mut self) {
        let count = self.selectable().len();
        if count > 0 {
            self.selection = (self.selection + 1) % count;
        }
        self.log_selection();
    }

    pub fn select_previous(&mut self) {
        let count = self.selectable().len();
        if count > 0 {
            self.selection = (self.selection + count - 1) % count;
        }
        self.log_selection();
    }

    fn log_selection(&self) {
        let Some((group_name, id)) = self.selected() else {
            return;
        };
        let Some(group) = self.group(group_name) else {
            return;
        };
        let (Some(param), Ok(value)) = (group.parameter(&id), group.display(&id)) else {
            return;
        };
        info!(
            group = group_name,
            parameter = param.id(),
            name = param.display_name(),
            %value,
            default = ?param.default_value(),
            step = param.step(),
            "selected parameter"
        );
    }

    /// Steps the selected parameter; choices cycle through their options.
    pub fn nudge_selected(&mut self, direction: f64) -> Result<()> {
        let (group_name, id) = self
            .selected()
            .ok_or_else(|| anyhow!("no parameter selected"))?;
        let group = self.group_mut(group_name)?;
        let options = match group.parameter(&id).map(|param| param.kind()) {
            Some(ParamKind::Choice { options }) => Some(options.clone()),
            _ => None,
        };
        match options {
            Some(options) => {
                let current = group.choice(&id).unwrap_or_default();
                let position = options.iter().position(|option| option == current).unwrap_or(0);
                let len = options.len() as isize;
                let next = (position as isize + direction.signum() as isize).rem_euclid(len);
                group.update(&id, options[next as usize].clone(), true)?;
            }
            None => group.nudge(&id, direction)?,
        }
        let value = group.display(&id)?;
        debug!(group = group_name, parameter = %id, %value, "nudged parameter");
        Ok(())
    }

    /// Sets `group.id` from text typed by the user.
    pub fn apply_input(&mut self, group_name: &str, id: &str, text: &str) -> Result<()> {
        let group = self.group_mut(group_name)?;
        let value: ParamValue = group.parse_input(id, text)?;
        group.update(id, value, true)?;
        Ok(())
    }

    fn group(&self, name: &str) -> Option<&ParameterGroup> {
        match name {
            SIMULATION_GROUP => Some(&self.params),
            VIEW_GROUP => Some(&self.view),
            _ => None,
        }
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut ParameterGroup> {
        match name {
            SIMULATION_GROUP => Ok(&mut self.params),
            VIEW_GROUP => Ok(&mut self.view),
            other => bail!("unknown parameter group '{other}' (expected {SIMULATION_GROUP} or {VIEW_GROUP})"),
        }
    }

    pub fn interval(&self) -> Duration {
        scheduler::interval_from_millis(self.view.number(fractal::INTERVAL).unwrap_or(0.0))
    }

    pub fn dt(&self) -> f64 {
        self.view.number(fractal::DT).unwrap_or(0.0)
    }

    /// Turns edits made since the last call into one on-demand frame.
    pub fn flush_edits(&mut self) -> bool {
        let edited = self.edited.replace(false);
        if edited {
            self.scheduler.request_frame();
        }
        edited
    }

    /// Reports a finished `render_frame` call to the scheduler. Only
    /// presented frames count toward the clock and the frame total.
    pub fn frame_finished(&mut self, now: Instant, report: FrameReport) -> Result<()> {
        match report {
            FrameReport::Rendered { .. } => self.frame_completed(now),
            FrameReport::NotReady | FrameReport::Abandoned => {
                self.scheduler.frame_skipped(now, self.interval());
                Ok(())
            }
        }
    }

    fn frame_completed(&mut self, now: Instant) -> Result<()> {
        let (dt, interval) = (self.dt(), self.interval());
        self.scheduler.frame_completed(now, dt, interval)?;
        Ok(())
    }
}
