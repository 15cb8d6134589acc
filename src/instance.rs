use std::{
    ffi::{CStr, CString},
    ops::Deref,
};

use ash::{
    ext::debug_utils,
    vk::{make_api_version, ApplicationInfo, InstanceCreateInfo, API_VERSION_1_3},
    Entry,
};
use tracing::debug;

use crate::{
    debug_messenger_create_info, error::Result, probe::CapabilityProbe, BootstrapConfig,
    BootstrapError,
};

const API_VERSION: u32 = API_VERSION_1_3;

pub struct Instance {
    instance: ash::Instance,
    entry: Entry,
    enabled_extensions: Vec<CString>,
}

impl Instance {
    /// Creates an Instance to interact with the core of Vulkan. Registers the needed extensions and
    /// layers, as well as basic information about the application.
    ///
    /// `window_extensions` are the instance extensions the window system needs to create a
    /// surface.
    pub fn new(
        entry: Entry,
        config: &BootstrapConfig,
        window_extensions: Vec<CString>,
    ) -> Result<Self> {
        let probe = CapabilityProbe::new(&entry)?;
        let enabled_layers = config.enabled_layers().to_vec();
        probe.check_layers(&enabled_layers)?;

        let appname = CString::new(env!("CARGO_PKG_NAME"))?;
        let app_version = make_api_version(
            0,
            env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or_default(),
            env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or_default(),
            env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or_default(),
        );

        let app_info = ApplicationInfo::default()
            .application_name(&appname)
            .application_version(app_version)
            .api_version(API_VERSION)
            .engine_name(&appname)
            .engine_version(app_version);

        let enabled_extensions =
            Self::get_required_instance_extensions(window_extensions, config.enable_validation);
        debug!("Instance extensions to enable: {:?}", enabled_extensions);
        debug!("Layers to enable: {:?}", enabled_layers);
        let enabled_extension_ptrs = enabled_extensions
            .iter()
            .map(|extension_name| extension_name.as_ptr())
            .collect::<Vec<_>>();
        let enabled_layer_ptrs = enabled_layers
            .iter()
            .map(|layer_name| layer_name.as_ptr())
            .collect::<Vec<_>>();

        let mut debug_messenger_create_info = debug_messenger_create_info();
        let mut instance_create_info = InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&enabled_extension_ptrs)
            .enabled_layer_names(&enabled_layer_ptrs);
        // covers messages emitted while the instance itself is created and destroyed
        if config.enable_validation {
            instance_create_info = instance_create_info.push_next(&mut debug_messenger_create_info);
        }

        let instance = unsafe { entry.create_instance(&instance_create_info, None) }
            .map_err(BootstrapError::ContextCreation)?;
        debug!("Instance created");

        Ok(Self {
            instance,
            entry,
            enabled_extensions,
        })
    }

    pub fn get_entry(&self) -> &Entry {
        &self.entry
    }

    /// Whether `name` was enabled when the instance was created.
    pub fn has_extension(&self, name: &CStr) -> bool {
        self.enabled_extensions
            .iter()
            .any(|extension| extension.as_c_str() == name)
    }

    /// Returns the needed instance exensions for Vulkan to function correctly.
    /// These always require the extensions necessary to interact with the native
    /// windowing system, and include the debug utils extension if validations
    /// are enabled.
    fn get_required_instance_extensions(
        window_extensions: Vec<CString>,
        enable_validation: bool,
    ) -> Vec<CString> {
        let mut enabled_extension_names = window_extensions;
        if enable_validation {
            enabled_extension_names.push(debug_utils::NAME.to_owned());
        }
        enabled_extension_names
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe { self.instance.destroy_instance(None) }
    }
}

impl Deref for Instance {
    type Target = ash::Instance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

/// Copies the extension names handed out by `ash_window` into owned strings.
pub fn window_extension_names(raw: &[*const std::ffi::c_char]) -> Vec<CString> {
    raw.iter()
        // ash_window hands out static nul terminated names
        .map(|name| unsafe { CStr::from_ptr(*name) }.to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_utils_added_only_with_validation() {
        let window = vec![c"VK_KHR_surface".to_owned()];

        let without = Instance::get_required_instance_extensions(window.clone(), false);
        assert_eq!(without, window);

        let with = Instance::get_required_instance_extensions(window.clone(), true);
        assert_eq!(with, vec![window[0].clone(), debug_utils::NAME.to_owned()]);
    }

    #[test]
    fn window_extension_names_are_copied_in_order() {
        let raw = [c"VK_KHR_surface".as_ptr(), c"VK_KHR_xcb_surface".as_ptr()];
        assert_eq!(
            window_extension_names(&raw),
            vec![c"VK_KHR_surface".to_owned(), c"VK_KHR_xcb_surface".to_owned()]
        );
    }
}
