use std::ffi::CString;

use ash::Entry;
use tracing::info;

use crate::{error::Result, BootstrapError};

/// Read-only view of what the loader and installed layers offer at the
/// instance level.
pub struct CapabilityProbe {
    layers: Vec<CString>,
}

impl CapabilityProbe {
    pub fn new(entry: &Entry) -> Result<Self> {
        let extensions = unsafe { entry.enumerate_instance_extension_properties(None) }
            .map_err(BootstrapError::DriverQuery)?
            .iter()
            .filter_map(|props| props.extension_name_as_c_str().ok())
            .map(|name| name.to_owned())
            .collect::<Vec<_>>();
        let layers = unsafe { entry.enumerate_instance_layer_properties() }
            .map_err(BootstrapError::DriverQuery)?
            .iter()
            .filter_map(|props| props.layer_name_as_c_str().ok())
            .map(|name| name.to_owned())
            .collect::<Vec<_>>();

        info!("available extensions:");
        for extension in &extensions {
            info!("\t{}", extension.to_string_lossy());
        }

        Ok(Self { layers })
    }

    /// Fails with a configuration error if any requested layer is missing.
    pub fn check_layers(&self, requested: &[CString]) -> Result<()> {
        let missing_layers = missing_names(&self.layers, requested);
        if missing_layers.is_empty() {
            Ok(())
        } else {
            Err(BootstrapError::Configuration { missing_layers })
        }
    }
}

/// Returns the requested names absent from `available`, in request order.
pub fn missing_names(available: &[CString], requested: &[CString]) -> Vec<String> {
    requested
        .iter()
        .filter(|name| !available.contains(name))
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}
