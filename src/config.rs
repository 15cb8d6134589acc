use std::ffi::{CStr, CString};

use ash::{
    khr::swapchain,
    vk::{ColorSpaceKHR, Format, PresentModeKHR},
};

use crate::swapchain::SwapchainPreferences;

#[cfg(feature = "enable_validations")]
const ENABLE_VALIDATIONS: bool = true;
#[cfg(not(feature = "enable_validations"))]
const ENABLE_VALIDATIONS: bool = cfg!(debug_assertions);

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
            title: "Vulkan".to_owned(),
        }
    }
}

/// Startup constants consumed by the bootstrap sequence.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub window: WindowConfig,
    /// Enables the validation layers and the debug messenger.
    pub enable_validation: bool,
    pub validation_layers: Vec<CString>,
    /// Extensions every selected physical device must support.
    pub device_extensions: Vec<CString>,
    pub swapchain: SwapchainPreferences,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            enable_validation: ENABLE_VALIDATIONS,
            validation_layers: vec![VALIDATION_LAYER.to_owned()],
            device_extensions: vec![swapchain::NAME.to_owned()],
            swapchain: SwapchainPreferences {
                format: Format::B8G8R8A8_SRGB,
                color_space: ColorSpaceKHR::SRGB_NONLINEAR,
                present_mode: PresentModeKHR::MAILBOX,
            },
        }
    }
}

impl BootstrapConfig {
    /// Layers to enable on the instance. Empty unless validation is on.
    pub fn enabled_layers(&self) -> &[CString] {
        if self.enable_validation {
            &self.validation_layers
        } else {
            &[]
        }
    }
}
