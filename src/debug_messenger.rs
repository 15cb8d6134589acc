use std::ffi::{c_void, CStr};

use ash::{
    ext::debug_utils,
    vk::{
        self, Bool32, DebugUtilsMessageSeverityFlagsEXT, DebugUtilsMessageTypeFlagsEXT,
        DebugUtilsMessengerCallbackDataEXT, DebugUtilsMessengerCreateInfoEXT,
        DebugUtilsMessengerEXT,
    },
};
use tracing::{debug, event, Level};

use crate::{error::Result, BootstrapError, Instance};

/// Create info shared by the standalone messenger and the one chained into
/// instance creation.
pub fn debug_messenger_create_info<'a>() -> DebugUtilsMessengerCreateInfoEXT<'a> {
    DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            DebugUtilsMessageSeverityFlagsEXT::ERROR
                | DebugUtilsMessageSeverityFlagsEXT::WARNING
                | DebugUtilsMessageSeverityFlagsEXT::INFO
                | DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
        )
        .message_type(
            DebugUtilsMessageTypeFlagsEXT::GENERAL
                | DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                | DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        )
        .pfn_user_callback(Some(vulkan_debug_utils_callback))
}

/// RAII for the debug utils messenger
pub struct DebugMessenger {
    debug_utils: debug_utils::Instance,
    messenger: DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub fn new(instance: &Instance) -> Result<Self> {
        let debug_utils = debug_utils::Instance::new(instance.get_entry(), instance);
        let create_info = debug_messenger_create_info();
        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(BootstrapError::DebugMessengerCreation)?;
        debug!("Debug messenger attached");
        Ok(Self {
            debug_utils,
            messenger,
        })
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        unsafe {
            self.debug_utils
                .destroy_debug_utils_messenger(self.messenger, None)
        }
    }
}

/// Maps a driver message severity onto a log level. Severities the driver
/// may add later are dropped rather than guessed at.
pub fn severity_level(severity: DebugUtilsMessageSeverityFlagsEXT) -> Option<Level> {
    match severity {
        DebugUtilsMessageSeverityFlagsEXT::VERBOSE => Some(Level::TRACE),
        DebugUtilsMessageSeverityFlagsEXT::INFO => Some(Level::INFO),
        DebugUtilsMessageSeverityFlagsEXT::WARNING => Some(Level::WARN),
        DebugUtilsMessageSeverityFlagsEXT::ERROR => Some(Level::ERROR),
        _ => None,
    }
}

// May be called from a driver thread. Reads the callback data and logs it,
// nothing else.
unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: DebugUtilsMessageSeverityFlagsEXT,
    message_type: DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut c_void,
) -> Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();
    let ty = format!("{:?}", message_type).to_lowercase();

    // event! needs the level at compile time
    let Some(level) = severity_level(message_severity) else {
        return vk::FALSE;
    };
    if level == Level::ERROR {
        event!(Level::ERROR, ty = %ty, "validation layer: {}", message);
    } else if level == Level::WARN {
        event!(Level::WARN, ty = %ty, "validation layer: {}", message);
    } else if level == Level::INFO {
        event!(Level::INFO, ty = %ty, "validation layer: {}", message);
    } else {
        event!(Level::TRACE, ty = %ty, "validation layer: {}", message);
    }
    // dont skip driver
    vk::FALSE
}
