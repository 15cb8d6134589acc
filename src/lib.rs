mod bootstrap;
mod config;
mod context;
mod debug_messenger;
mod device_selector;
mod error;
mod image_view;
mod instance;
mod logical_device;
pub mod logging;
mod pipeline;
mod probe;
mod shader;
mod surface;
mod swapchain;
mod vulkan;
mod window;

pub use bootstrap::{bootstrap, Backend};
pub use config::{BootstrapConfig, WindowConfig};
pub use context::RenderContext;
pub use debug_messenger::{debug_messenger_create_info, severity_level, DebugMessenger};
pub use device_selector::{
    describable_devices, fitness_score, pick_physical_device, rank_candidates, select_device,
    PhysicalDeviceInfo, QueueFamilies, QueueFamily, QueueFamilyIndices,
};
pub use error::{BootstrapError, Result};
pub use image_view::ImageView;
pub use instance::{window_extension_names, Instance};
pub use logical_device::{LogicalDevice, QueueHandles};
pub use pipeline::{FixedFunctionState, GraphicsPipeline};
pub use probe::{missing_names, CapabilityProbe};
pub use shader::{read_spirv, ShaderCode, ShaderModule};
pub use surface::Surface;
pub use swapchain::{
    ImageSharing, Swapchain, SwapchainPreferences, SwapchainSettings, SwapchainSupport,
};
pub use vulkan::VulkanBackend;
pub use window::{fps_title, FpsCounter, NativeWindow, WindowManager};
