use std::marker::PhantomData;

use ash::{ext::debug_utils, Entry};
use tracing::{debug, info};
use winit::raw_window_handle::HasDisplayHandle;

use crate::{
    bootstrap::Backend, device_selector::pick_physical_device, error::Result,
    instance::window_extension_names, window::NativeWindow, BootstrapConfig, BootstrapError,
    DebugMessenger, GraphicsPipeline, ImageView, Instance, LogicalDevice, ShaderCode, Surface,
    Swapchain, WindowManager,
};

/// Runs the bootstrap stages against the Vulkan driver.
pub struct VulkanBackend<W = WindowManager> {
    entry: Entry,
    config: BootstrapConfig,
    shaders: ShaderCode,
    window: PhantomData<W>,
}

impl<W: NativeWindow> VulkanBackend<W> {
    pub fn new(entry: Entry, config: BootstrapConfig, shaders: ShaderCode) -> Self {
        Self {
            entry,
            config,
            shaders,
            window: PhantomData,
        }
    }
}

impl<W: NativeWindow> Backend for VulkanBackend<W> {
    type Window = W;
    type Instance = Instance;
    type Messenger = DebugMessenger;
    type Surface = Surface;
    type Device = LogicalDevice;
    type Swapchain = Swapchain;
    type ImageView = ImageView;
    type Pipeline = GraphicsPipeline;

    fn create_instance(&self, window: &W) -> Result<Instance> {
        let window_extensions =
            ash_window::enumerate_required_extensions(window.display_handle()?.as_raw())
                .map_err(BootstrapError::DriverQuery)?;
        Instance::new(
            self.entry.clone(),
            &self.config,
            window_extension_names(window_extensions),
        )
    }

    fn attach_messenger(&self, instance: &Instance) -> Result<Option<DebugMessenger>> {
        if !instance.has_extension(debug_utils::NAME) {
            info!("Validation disabled, skipping debug messenger");
            return Ok(None);
        }
        DebugMessenger::new(instance).map(Some)
    }

    fn bind_surface(&self, instance: &Instance, window: &W) -> Result<Surface> {
        Surface::new(instance, window)
    }

    fn create_device(&self, instance: &Instance, surface: &Surface) -> Result<LogicalDevice> {
        let physical_device =
            pick_physical_device(instance, surface, &self.config.device_extensions)?;
        let device =
            LogicalDevice::new(instance, physical_device, &self.config.device_extensions)?;
        let queues = device.queues();
        debug!(
            "Graphics queue {:?}, present queue {:?}",
            queues.graphics, queues.present
        );
        Ok(device)
    }

    fn create_swapchain(
        &self,
        instance: &Instance,
        surface: &Surface,
        device: &LogicalDevice,
        window: &W,
    ) -> Result<Swapchain> {
        Swapchain::new(instance, surface, device, &self.config.swapchain, || {
            window.framebuffer_size()
        })
    }

    fn create_image_views(
        &self,
        device: &LogicalDevice,
        swapchain: &Swapchain,
    ) -> Result<Vec<ImageView>> {
        ImageView::for_swapchain(device, swapchain)
    }

    fn assemble_pipeline(
        &self,
        device: &LogicalDevice,
        swapchain: &Swapchain,
    ) -> Result<GraphicsPipeline> {
        GraphicsPipeline::assemble(
            device,
            swapchain.get_surface_format().format,
            swapchain.get_extent(),
            &self.shaders,
        )
    }
}
