use std::ops::Deref;

use ash::{
    khr::surface,
    vk::{PhysicalDevice, PresentModeKHR, SurfaceCapabilitiesKHR, SurfaceFormatKHR, SurfaceKHR},
};
use tracing::debug;
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::{error::Result, BootstrapError, Instance};

pub struct Surface {
    surface_fn: surface::Instance,
    surface_ptr: SurfaceKHR,
}

impl Surface {
    /// Binds the instance to the native window. The window must outlive the surface.
    pub fn new(instance: &Instance, window: &(impl HasDisplayHandle + HasWindowHandle)) -> Result<Self> {
        let surface_fn = surface::Instance::new(instance.get_entry(), instance);
        let surface_ptr = unsafe {
            ash_window::create_surface(
                instance.get_entry(),
                instance,
                window.display_handle()?.as_raw(),
                window.window_handle()?.as_raw(),
                None,
            )
        }
        .map_err(BootstrapError::SurfaceCreation)?;
        debug!("Surface created");
        Ok(Self {
            surface_fn,
            surface_ptr,
        })
    }

    pub(crate) fn get_physical_device_surface_capabilities(
        &self,
        physical_device: PhysicalDevice,
    ) -> Result<SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_fn
                .get_physical_device_surface_capabilities(physical_device, self.surface_ptr)
        }
        .map_err(BootstrapError::DriverQuery)
    }

    pub(crate) fn get_physical_device_surface_formats(
        &self,
        physical_device: PhysicalDevice,
    ) -> Result<Vec<SurfaceFormatKHR>> {
        unsafe {
            self.surface_fn
                .get_physical_device_surface_formats(physical_device, self.surface_ptr)
        }
        .map_err(BootstrapError::DriverQuery)
    }

    pub(crate) fn get_physical_device_surface_present_modes(
        &self,
        physical_device: PhysicalDevice,
    ) -> Result<Vec<PresentModeKHR>> {
        unsafe {
            self.surface_fn
                .get_physical_device_surface_present_modes(physical_device, self.surface_ptr)
        }
        .map_err(BootstrapError::DriverQuery)
    }

    pub(crate) fn get_physical_device_surface_support(
        &self,
        physical_device: PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<bool> {
        unsafe {
            self.surface_fn.get_physical_device_surface_support(
                physical_device,
                queue_family_index,
                self.surface_ptr,
            )
        }
        .map_err(BootstrapError::DriverQuery)
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe { self.surface_fn.destroy_surface(self.surface_ptr, None) }
    }
}

impl Deref for Surface {
    type Target = SurfaceKHR;

    fn deref(&self) -> &Self::Target {
        &self.surface_ptr
    }
}
