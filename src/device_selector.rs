use std::{cmp::Reverse, collections::HashSet, ffi::CString};

use ash::vk::{PhysicalDevice, PhysicalDeviceFeatures, PhysicalDeviceType, QueueFlags};
use tracing::{debug, info};

use crate::{error::Result, BootstrapError, Instance, Surface, SwapchainSupport};

const DISCRETE_GPU_SCORE: u32 = 1000;

/// One entry of a physical device's queue family table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamily {
    pub index: u32,
    pub supports_graphics: bool,
    /// Whether this family can present to the surface the snapshot was taken against.
    pub supports_present: bool,
}

/// Holds the indexes of the relevant queue families for a given
/// physical device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// family capable of running graphics related commands
    pub graphics_family: Option<u32>,
    /// family capable of displaying results on the screen
    pub present_family: Option<u32>,
}

/// Queue family indices once both roles are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    /// The first graphics family, and for presenting that same family when it can
    /// present, otherwise the first family that can.
    pub fn find(queue_families: &[QueueFamily]) -> Self {
        let graphics = queue_families.iter().find(|family| family.supports_graphics);
        let present = graphics
            .filter(|family| family.supports_present)
            .or_else(|| queue_families.iter().find(|family| family.supports_present));
        Self {
            graphics_family: graphics.map(|family| family.index),
            present_family: present.map(|family| family.index),
        }
    }

    /// True if all queue families are available for this physical
    /// device.
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    pub fn resolve(&self) -> Option<QueueFamilies> {
        Some(QueueFamilies {
            graphics: self.graphics_family?,
            present: self.present_family?,
        })
    }
}

impl QueueFamilies {
    /// Distinct family indices, one queue gets created per entry.
    pub fn unique(&self) -> Vec<u32> {
        if self.graphics == self.present {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Snapshot of everything device selection needs to know about one physical
/// device, taken against one surface.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceInfo {
    pub handle: PhysicalDevice,
    pub name: String,
    pub device_type: PhysicalDeviceType,
    pub features: PhysicalDeviceFeatures,
    pub extensions: HashSet<CString>,
    pub queue_families: Vec<QueueFamily>,
    pub swapchain_support: SwapchainSupport,
}

impl PhysicalDeviceInfo {
    /// Queue families and extensions first. The surface is only asked for
    /// formats, capabilities and present modes when the device can present to it
    /// and supports every required extension; otherwise the support stays empty.
    pub fn query(
        instance: &Instance,
        surface: &Surface,
        handle: PhysicalDevice,
        required_extensions: &[CString],
    ) -> Result<Self> {
        let props = unsafe { instance.get_physical_device_properties(handle) };
        let features = unsafe { instance.get_physical_device_features(handle) };
        let name = props
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let queue_family_properties =
            unsafe { instance.get_physical_device_queue_family_properties(handle) };
        let queue_families = (0u32..)
            .zip(queue_family_properties.iter())
            .map(|(index, props)| QueueFamily {
                index,
                supports_graphics: props.queue_flags.contains(QueueFlags::GRAPHICS),
                // a failed query means the family cannot present
                supports_present: surface
                    .get_physical_device_surface_support(handle, index)
                    .unwrap_or(false),
            })
            .collect();

        let extensions = unsafe { instance.enumerate_device_extension_properties(handle) }
            .map_err(BootstrapError::DriverQuery)?
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok())
            .map(|ext| ext.to_owned())
            .collect();

        let mut info = Self {
            handle,
            name,
            device_type: props.device_type,
            features,
            extensions,
            queue_families,
            swapchain_support: SwapchainSupport::default(),
        };
        if info.can_query_swapchain_support(required_extensions) {
            info.swapchain_support = SwapchainSupport::query(surface, handle)?;
        }
        Ok(info)
    }

    /// True if some queue family can present to the surface.
    pub fn presents(&self) -> bool {
        self.queue_families
            .iter()
            .any(|family| family.supports_present)
    }

    /// The surface only answers format, capability and present mode queries for
    /// devices that support it.
    pub fn can_query_swapchain_support(&self, required_extensions: &[CString]) -> bool {
        self.presents() && self.supports_extensions(required_extensions)
    }

    pub fn queue_family_indices(&self) -> QueueFamilyIndices {
        QueueFamilyIndices::find(&self.queue_families)
    }

    /// Checks to see if the physical device supports all required device extensions
    pub fn supports_extensions(&self, required_extensions: &[CString]) -> bool {
        required_extensions
            .iter()
            .all(|extension| self.extensions.contains(extension))
    }

    /// Hard requirements. A device failing any of these is never selected,
    /// whatever its score.
    pub fn is_suitable(&self, required_extensions: &[CString]) -> bool {
        self.queue_family_indices().is_complete()
            && self.supports_extensions(required_extensions)
            && self.swapchain_support.is_adequate()
    }
}

/// Soft preference between devices. Devices without geometry shaders score 0
/// but stay candidates.
pub fn fitness_score(device: &PhysicalDeviceInfo) -> u32 {
    if device.features.geometry_shader == 0 {
        return 0;
    }
    match device.device_type {
        PhysicalDeviceType::DISCRETE_GPU => DISCRETE_GPU_SCORE,
        _ => 0,
    }
}

/// Highest score first. The sort is stable, so equal scores keep enumeration order.
pub fn rank_candidates(devices: Vec<PhysicalDeviceInfo>) -> Vec<(u32, PhysicalDeviceInfo)> {
    let mut candidates = devices
        .into_iter()
        .map(|device| (fitness_score(&device), device))
        .collect::<Vec<_>>();
    candidates.sort_by_key(|(score, _)| Reverse(*score));
    candidates
}

/// Picks the best scoring device that meets every hard requirement.
pub fn select_device(
    devices: Vec<PhysicalDeviceInfo>,
    required_extensions: &[CString],
) -> Result<PhysicalDeviceInfo> {
    let candidates = rank_candidates(devices);
    for (score, device) in &candidates {
        info!("Device score: {} ({})", score, device.name);
    }
    candidates
        .into_iter()
        .map(|(_, device)| device)
        .find(|device| {
            let suitable = device.is_suitable(required_extensions);
            if !suitable {
                debug!("Skipping unsuitable device {}", device.name);
            }
            suitable
        })
        .ok_or(BootstrapError::NoSuitableDevice)
}

/// Keeps the devices whose snapshot could be taken. A device the driver fails
/// to describe is unsuitable, it does not abort selection.
pub fn describable_devices(
    snapshots: impl IntoIterator<Item = (PhysicalDevice, Result<PhysicalDeviceInfo>)>,
) -> Vec<PhysicalDeviceInfo> {
    snapshots
        .into_iter()
        .filter_map(|(handle, snapshot)| match snapshot {
            Ok(info) => Some(info),
            Err(err) => {
                debug!("Skipping physical device {:?}: {}", handle, err);
                None
            }
        })
        .collect()
}

/// Queries the system for the available physical devices, and picks the most appropriate one for use.
pub fn pick_physical_device(
    instance: &Instance,
    surface: &Surface,
    required_extensions: &[CString],
) -> Result<PhysicalDeviceInfo> {
    let handles = unsafe { instance.enumerate_physical_devices() }
        .map_err(BootstrapError::DriverQuery)?;
    if handles.is_empty() {
        tracing::error!("failed to find GPUs with Vulkan support!");
    }
    let devices = describable_devices(handles.into_iter().map(|handle| {
        (
            handle,
            PhysicalDeviceInfo::query(instance, surface, handle, required_extensions),
        )
    }));
    let selected = select_device(devices, required_extensions)?;
    info!("Selected physical device: {}", selected.name);
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use ash::{
        khr::swapchain,
        vk::{self, Handle},
    };

    use super::*;

    fn family(index: u32, supports_graphics: bool, supports_present: bool) -> QueueFamily {
        QueueFamily {
            index,
            supports_graphics,
            supports_present,
        }
    }

    fn adequate_support() -> SwapchainSupport {
        SwapchainSupport {
            formats: vec![vk::SurfaceFormatKHR::default()],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            ..Default::default()
        }
    }

    fn required() -> Vec<CString> {
        vec![swapchain::NAME.to_owned()]
    }

    fn device(raw: u64, device_type: PhysicalDeviceType, geometry_shader: bool) -> PhysicalDeviceInfo {
        PhysicalDeviceInfo {
            handle: PhysicalDevice::from_raw(raw),
            name: format!("device {}", raw),
            device_type,
            features: PhysicalDeviceFeatures {
                geometry_shader: geometry_shader.into(),
                ..Default::default()
            },
            extensions: HashSet::from([swapchain::NAME.to_owned()]),
            queue_families: vec![family(0, true, true)],
            swapchain_support: adequate_support(),
        }
    }

    #[test]
    fn discrete_with_geometry_scores_highest() {
        assert_eq!(
            fitness_score(&device(1, PhysicalDeviceType::DISCRETE_GPU, true)),
            1000
        );
        assert_eq!(
            fitness_score(&device(2, PhysicalDeviceType::INTEGRATED_GPU, true)),
            0
        );
        assert_eq!(
            fitness_score(&device(3, PhysicalDeviceType::DISCRETE_GPU, false)),
            0
        );
    }

    #[test]
    fn unsuitable_top_scorer_is_skipped() {
        let mut d1 = device(1, PhysicalDeviceType::DISCRETE_GPU, true);
        d1.queue_families = vec![family(0, true, false)];
        let d2 = device(2, PhysicalDeviceType::INTEGRATED_GPU, false);

        let selected = select_device(vec![d1, d2], &required()).unwrap();
        assert_eq!(selected.handle, PhysicalDevice::from_raw(2));
    }

    #[test]
    fn higher_score_wins_regardless_of_order() {
        let integrated = device(1, PhysicalDeviceType::INTEGRATED_GPU, true);
        let discrete = device(2, PhysicalDeviceType::DISCRETE_GPU, true);
        let selected = select_device(vec![integrated, discrete], &required()).unwrap();
        assert_eq!(selected.handle, PhysicalDevice::from_raw(2));
    }

    #[test]
    fn ties_keep_enumeration_order() {
        let ranked = rank_candidates(vec![
            device(1, PhysicalDeviceType::INTEGRATED_GPU, true),
            device(2, PhysicalDeviceType::DISCRETE_GPU, true),
            device(3, PhysicalDeviceType::CPU, true),
            device(4, PhysicalDeviceType::DISCRETE_GPU, true),
        ]);
        let order = ranked
            .iter()
            .map(|(_, device)| device.handle.as_raw())
            .collect::<Vec<_>>();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[test]
    fn missing_extension_disqualifies() {
        let mut d = device(1, PhysicalDeviceType::DISCRETE_GPU, true);
        d.extensions.clear();
        assert!(!d.is_suitable(&required()));
        assert!(matches!(
            select_device(vec![d], &required()),
            Err(BootstrapError::NoSuitableDevice)
        ));
    }

    #[test]
    fn empty_present_modes_disqualify() {
        let mut d = device(1, PhysicalDeviceType::DISCRETE_GPU, true);
        d.swapchain_support.present_modes.clear();
        assert!(!d.is_suitable(&required()));
    }

    #[test]
    fn empty_formats_disqualify() {
        let mut d = device(1, PhysicalDeviceType::DISCRETE_GPU, true);
        d.swapchain_support.formats.clear();
        assert!(!d.swapchain_support.present_modes.is_empty());
        assert!(!d.is_suitable(&required()));
        assert!(matches!(
            select_device(vec![d], &required()),
            Err(BootstrapError::NoSuitableDevice)
        ));
    }

    #[test]
    fn undescribable_device_is_skipped() {
        let broken = PhysicalDevice::from_raw(1);
        let usable = device(2, PhysicalDeviceType::INTEGRATED_GPU, false);
        let devices = describable_devices(vec![
            (
                broken,
                Err(BootstrapError::DriverQuery(vk::Result::ERROR_SURFACE_LOST_KHR)),
            ),
            (usable.handle, Ok(usable)),
        ]);
        assert_eq!(devices.len(), 1);

        let selected = select_device(devices, &required()).unwrap();
        assert_eq!(selected.handle, PhysicalDevice::from_raw(2));
    }

    #[test]
    fn swapchain_support_only_queried_when_presenting_with_extensions() {
        let mut d = device(1, PhysicalDeviceType::DISCRETE_GPU, true);
        assert!(d.can_query_swapchain_support(&required()));

        d.queue_families = vec![family(0, true, false)];
        assert!(!d.presents());
        assert!(!d.can_query_swapchain_support(&required()));

        let mut d = device(2, PhysicalDeviceType::DISCRETE_GPU, true);
        d.extensions.clear();
        assert!(!d.can_query_swapchain_support(&required()));
    }

    #[test]
    fn no_devices_is_no_suitable_device() {
        assert!(matches!(
            select_device(vec![], &required()),
            Err(BootstrapError::NoSuitableDevice)
        ));
    }

    #[test]
    fn present_prefers_the_graphics_family() {
        let indices = QueueFamilyIndices::find(&[
            family(0, false, true),
            family(1, true, true),
            family(2, true, false),
        ]);
        assert_eq!(indices.graphics_family, Some(1));
        assert_eq!(indices.present_family, Some(1));
    }

    #[test]
    fn present_falls_back_to_first_capable_family() {
        let indices = QueueFamilyIndices::find(&[
            family(0, true, false),
            family(1, false, false),
            family(2, false, true),
        ]);
        let families = indices.resolve().unwrap();
        assert_eq!(families, QueueFamilies { graphics: 0, present: 2 });
        assert_eq!(families.unique(), vec![0, 2]);
    }

    #[test]
    fn incomplete_indices_do_not_resolve() {
        let indices = QueueFamilyIndices::find(&[family(0, true, false)]);
        assert!(!indices.is_complete());
        assert_eq!(indices.resolve(), None);
    }

    #[test]
    fn shared_family_is_created_once() {
        let families = QueueFamilies {
            graphics: 3,
            present: 3,
        };
        assert_eq!(families.unique(), vec![3]);
    }
}
