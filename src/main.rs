use std::process::ExitCode;

use anyhow::{Context, Result};
use ash::Entry;
use tracing::{error, info};
use vk_bootstrap::{
    bootstrap, logging, BootstrapConfig, BootstrapError, NativeWindow, ShaderCode, VulkanBackend,
    WindowManager,
};

const VERTEX_SHADER: &str = "target/shaders/vert.spv";
const FRAGMENT_SHADER: &str = "target/shaders/frag.spv";

fn main() -> ExitCode {
    if let Err(err) = logging::init() {
        eprintln!("failed to initialise logging: {:?}", err);
        return ExitCode::FAILURE;
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:?}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let config = BootstrapConfig::default();
    let shaders = ShaderCode::load(VERTEX_SHADER, FRAGMENT_SHADER)?;
    let window = WindowManager::try_new(&config.window)?;

    let entry = unsafe { Entry::load() }.map_err(BootstrapError::Loading)?;
    let backend = VulkanBackend::new(entry, config, shaders);
    let mut context =
        bootstrap(&backend, window).context("failed to bootstrap the rendering context")?;
    info!("Rendering context ready");

    while let Some(window) = context.window_mut() {
        window.poll_events();
        if window.should_close() {
            break;
        }
    }

    context.teardown();
    info!("Shut down cleanly");
    Ok(())
}
