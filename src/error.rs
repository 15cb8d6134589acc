use ash::vk;
use thiserror::Error;
use winit::raw_window_handle::HandleError;

/// Every way the bootstrap sequence can fail. All of them are fatal: the
/// stage that failed is a dependency of every stage after it.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("could not load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("validation layers requested, but not available: {missing_layers:?}")]
    Configuration { missing_layers: Vec<String> },

    #[error("driver query failed: {0}")]
    DriverQuery(vk::Result),

    #[error("name contains an interior nul byte: {0}")]
    InvalidName(#[from] std::ffi::NulError),

    #[error("could not get a native handle from the window: {0}")]
    WindowHandle(#[from] HandleError),

    #[error("failed to create instance: {0}")]
    ContextCreation(vk::Result),

    #[error("failed to set up debug messenger: {0}")]
    DebugMessengerCreation(vk::Result),

    #[error("failed to create window surface: {0}")]
    SurfaceCreation(vk::Result),

    #[error("failed to find a suitable GPU")]
    NoSuitableDevice,

    #[error("failed to create logical device: {0}")]
    DeviceCreation(vk::Result),

    #[error("failed to create swapchain: {0}")]
    SwapchainCreation(vk::Result),

    #[error("failed to create swapchain image view: {0}")]
    ImageViewCreation(vk::Result),

    #[error("failed to create shader module: {0}")]
    ShaderModule(vk::Result),

    #[error("failed to create graphics pipeline: {0}")]
    PipelineCreation(vk::Result),
}

pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;
