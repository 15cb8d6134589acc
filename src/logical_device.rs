use std::{ffi::CString, ops::Deref};

use ash::{
    vk::{DeviceCreateInfo, DeviceQueueCreateInfo, PhysicalDeviceFeatures, Queue},
    Device,
};
use tracing::debug;

use crate::{error::Result, BootstrapError, Instance, PhysicalDeviceInfo, QueueFamilies};

/// Holds handles to the queues created as part of the logical
/// device initialization.
#[derive(Debug, Clone, Copy)]
pub struct QueueHandles {
    pub graphics: Queue,
    pub present: Queue,
}

/// RAII for the logical device and its queues
pub struct LogicalDevice {
    device: Device,
    queues: QueueHandles,
    queue_families: QueueFamilies,
    physical_device: PhysicalDeviceInfo,
}

impl LogicalDevice {
    /// Creates the logical device to interface with the selected physical device. Each queue family
    /// will create 1 queue instance for submitting commands to.
    pub fn new(
        instance: &Instance,
        physical_device: PhysicalDeviceInfo,
        device_extensions: &[CString],
    ) -> Result<Self> {
        // selection only hands out devices with complete queue families
        let queue_families = physical_device
            .queue_family_indices()
            .resolve()
            .ok_or(BootstrapError::NoSuitableDevice)?;
        debug!("Queue families: {:?}", queue_families);

        let queue_priorities = [1.0f32];
        let device_queue_create_infos = queue_families
            .unique()
            .into_iter()
            .map(|queue_family_index| {
                DeviceQueueCreateInfo::default()
                    .queue_family_index(queue_family_index)
                    .queue_priorities(&queue_priorities)
            })
            .collect::<Vec<_>>();

        let physical_device_features = PhysicalDeviceFeatures::default();

        let extension_names = device_extensions
            .iter()
            .map(|extension_name| extension_name.as_ptr())
            .collect::<Vec<_>>();

        // device layers are deprecated, instance layers cover the device as well
        let device_create_info = DeviceCreateInfo::default()
            .queue_create_infos(&device_queue_create_infos)
            .enabled_features(&physical_device_features)
            .enabled_extension_names(&extension_names);

        let device =
            unsafe { instance.create_device(physical_device.handle, &device_create_info, None) }
                .map_err(BootstrapError::DeviceCreation)?;

        let queues = unsafe {
            QueueHandles {
                graphics: device.get_device_queue(queue_families.graphics, 0),
                present: device.get_device_queue(queue_families.present, 0),
            }
        };
        debug!("Logical device created on {}", physical_device.name);

        Ok(Self {
            device,
            queues,
            queue_families,
            physical_device,
        })
    }

    pub fn queues(&self) -> QueueHandles {
        self.queues
    }

    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    pub fn physical_device_info(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }
}

impl Deref for LogicalDevice {
    type Target = Device;

    fn deref(&self) -> &Self::Target {
        &self.device
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe { self.device.destroy_device(None) }
    }
}
