use crate::{context::RenderContext, error::Result};

/// The stage operations of the bootstrap sequence. Each associated type owns
/// one kind of handle and releases it when dropped.
pub trait Backend {
    type Window;
    type Instance;
    type Messenger;
    type Surface;
    type Device;
    type Swapchain;
    type ImageView;
    type Pipeline;

    fn create_instance(&self, window: &Self::Window) -> Result<Self::Instance>;

    /// `None` when diagnostics are turned off.
    fn attach_messenger(&self, instance: &Self::Instance) -> Result<Option<Self::Messenger>>;

    fn bind_surface(&self, instance: &Self::Instance, window: &Self::Window)
        -> Result<Self::Surface>;

    /// Selects a physical device and creates the logical device on it.
    fn create_device(&self, instance: &Self::Instance, surface: &Self::Surface)
        -> Result<Self::Device>;

    fn create_swapchain(
        &self,
        instance: &Self::Instance,
        surface: &Self::Surface,
        device: &Self::Device,
        window: &Self::Window,
    ) -> Result<Self::Swapchain>;

    fn create_image_views(
        &self,
        device: &Self::Device,
        swapchain: &Self::Swapchain,
    ) -> Result<Vec<Self::ImageView>>;

    fn assemble_pipeline(
        &self,
        device: &Self::Device,
        swapchain: &Self::Swapchain,
    ) -> Result<Self::Pipeline>;
}

/// Runs every stage in order. The first failure is returned after everything
/// created so far has been torn down.
pub fn bootstrap<B: Backend>(backend: &B, window: B::Window) -> Result<RenderContext<B>> {
    let mut context = RenderContext::<B>::empty();

    let window = &*context.window.insert(window);
    let instance = &*context.instance.insert(backend.create_instance(window)?);
    context.messenger = backend.attach_messenger(instance)?;
    let surface = &*context.surface.insert(backend.bind_surface(instance, window)?);
    let device = &*context
        .device
        .insert(backend.create_device(instance, surface)?);
    let swapchain = &*context
        .swapchain
        .insert(backend.create_swapchain(instance, surface, device, window)?);
    context.image_views = backend.create_image_views(device, swapchain)?;
    context.pipeline = Some(backend.assemble_pipeline(device, swapchain)?);

    Ok(context)
}
