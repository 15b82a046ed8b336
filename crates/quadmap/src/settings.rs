use anyhow::{Context, Result};
use params::ParamValue;
use renderer::{AddressMode, RenderOptions, SurfaceOptions};
use session::TimeMode;
use viewconfig::{AddressSetting, ViewConfig};

use crate::cli::RunArgs;

#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

/// Configuration file values with command line flags applied on top.
#[derive(Debug, Clone)]
pub struct Settings {
    pub window: WindowSettings,
    pub render: RenderOptions,
    pub autoplay: bool,
    pub time_mode: TimeMode,
    pub include_time: bool,
    pub share_base: Option<String>,
    pub simulation: Vec<(String, ParamValue)>,
    pub view: Vec<(String, ParamValue)>,
    pub session: Option<String>,
}

impl Settings {
    pub fn resolve(config: &ViewConfig, args: &RunArgs) -> Result<Self> {
        let (width, height) = args
            .size
            .unwrap_or((config.window.width, config.window.height));
        let surfaces = SurfaceOptions {
            iteration_address: args
                .iteration_address
                .unwrap_or_else(|| map_address(config.render.iteration_address)),
            gradient_address: args
                .gradient_address
                .unwrap_or_else(|| map_address(config.render.gradient_address)),
        };
        Ok(Self {
            window: WindowSettings {
                width,
                height,
                title: config.window.title.clone(),
            },
            render: RenderOptions {
                surfaces,
                colormap_resolution: config.render.colormap_resolution,
            },
            autoplay: args.play || config.render.autoplay,
            time_mode: args.time_mode.unwrap_or(config.session.time),
            include_time: config.session.include_time,
            share_base: config.session.share_base.clone(),
            simulation: config
                .simulation_overrides()
                .context("invalid [params] overrides")?,
            view: config.view_overrides().context("invalid [view] overrides")?,
            session: args.session.clone(),
        })
    }
}

fn map_address(setting: AddressSetting) -> AddressMode {
    match setting {
        AddressSetting::MirroredRepeat => AddressMode::MirroredRepeat,
        AddressSetting::Repeat => AddressMode::Repeat,
        AddressSetting::Clamp => AddressMode::ClampToEdge,
    }
}
