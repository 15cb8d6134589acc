use std::ops::Deref;

use ash::{
    khr::swapchain,
    vk::{
        self, ColorSpaceKHR, CompositeAlphaFlagsKHR, Extent2D, Format, Image, ImageUsageFlags,
        PhysicalDevice, PresentModeKHR, SharingMode, SurfaceCapabilitiesKHR, SurfaceFormatKHR,
        SwapchainCreateInfoKHR, SwapchainKHR,
    },
};
use tracing::{debug, info};

use crate::{error::Result, BootstrapError, Instance, LogicalDevice, Surface};

/// Surface capabilities report this width when the extent is left to the
/// application.
const UNDEFINED_EXTENT: u32 = u32::MAX;

/// What the application would like the swapchain to use, if available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainPreferences {
    pub format: Format,
    pub color_space: ColorSpaceKHR,
    pub present_mode: PresentModeKHR,
}

#[derive(Debug, Clone, Default)]
/// Details about what features the swap chain supports
/// for a given surface
pub struct SwapchainSupport {
    pub capabilities: SurfaceCapabilitiesKHR,
    /// The formats (color depth settings) available to use.
    pub formats: Vec<SurfaceFormatKHR>,
    pub present_modes: Vec<PresentModeKHR>,
}

/// Values picked from a `SwapchainSupport` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSettings {
    pub surface_format: SurfaceFormatKHR,
    pub present_mode: PresentModeKHR,
    pub extent: Extent2D,
    pub image_count: u32,
}

impl SwapchainSupport {
    /// Queries for the details of what the swap chain supports given
    /// the physical device and surface
    pub fn query(surface: &Surface, physical_device: PhysicalDevice) -> Result<Self> {
        Ok(Self {
            capabilities: surface.get_physical_device_surface_capabilities(physical_device)?,
            formats: surface.get_physical_device_surface_formats(physical_device)?,
            present_modes: surface.get_physical_device_surface_present_modes(physical_device)?,
        })
    }

    /// A swapchain can only be built if there is at least one format and one present mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }

    /// Exact (format, color space) match, otherwise the first supported format.
    /// Only meaningful for an adequate snapshot.
    pub fn choose_surface_format(&self, preferences: &SwapchainPreferences) -> SurfaceFormatKHR {
        self.formats
            .iter()
            .copied()
            .find(|format| {
                format.format == preferences.format && format.color_space == preferences.color_space
            })
            .or_else(|| self.formats.first().copied())
            .unwrap_or_default()
    }

    /// Picks the preferential swap mode to use based on the available
    pub fn choose_present_mode(&self, preferences: &SwapchainPreferences) -> PresentModeKHR {
        if self.present_modes.contains(&preferences.present_mode) {
            return preferences.present_mode;
        }
        // basically vertical sync. This is the only mode guaranteed to be
        // available on all systems
        PresentModeKHR::FIFO
    }

    /// Returns the "extent" of the images to draw - the resolution to use *in pixels*.
    /// `framebuffer_size` is only consulted when the surface leaves the extent to us.
    pub fn choose_extent(&self, framebuffer_size: impl FnOnce() -> Extent2D) -> Extent2D {
        let capabilities = &self.capabilities;
        if capabilities.current_extent.width != UNDEFINED_EXTENT {
            return capabilities.current_extent;
        }
        let framebuffer = framebuffer_size();
        Extent2D {
            width: framebuffer.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: framebuffer.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }

    /// One more than the minimum so we're not stuck waiting on the driver,
    /// capped by the maximum. A maximum of zero means there is no maximum.
    pub fn choose_image_count(&self) -> u32 {
        let image_count = self.capabilities.min_image_count.saturating_add(1);
        match self.capabilities.max_image_count {
            0 => image_count,
            max_image_count => image_count.min(max_image_count),
        }
    }

    /// Bundles every choice. An inadequate snapshot has nothing to choose from
    /// and fails with `SwapchainCreation`.
    pub fn negotiate(
        &self,
        preferences: &SwapchainPreferences,
        framebuffer_size: impl FnOnce() -> Extent2D,
    ) -> Result<SwapchainSettings> {
        if !self.is_adequate() {
            return Err(BootstrapError::SwapchainCreation(
                vk::Result::ERROR_FORMAT_NOT_SUPPORTED,
            ));
        }
        Ok(SwapchainSettings {
            surface_format: self.choose_surface_format(preferences),
            present_mode: self.choose_present_mode(preferences),
            extent: self.choose_extent(framebuffer_size),
            image_count: self.choose_image_count(),
        })
    }
}

/// How swapchain images are shared between the graphics and present queue families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSharing {
    pub mode: SharingMode,
    pub queue_family_indices: Vec<u32>,
}

impl ImageSharing {
    pub fn new(graphics_family: u32, present_family: u32) -> Self {
        if graphics_family == present_family {
            // one family owns the images, no ownership transfers needed
            Self {
                mode: SharingMode::EXCLUSIVE,
                queue_family_indices: vec![],
            }
        } else {
            Self {
                mode: SharingMode::CONCURRENT,
                queue_family_indices: vec![graphics_family, present_family],
            }
        }
    }
}

pub struct Swapchain {
    swapchain_fn: swapchain::Device,
    swapchain_ptr: SwapchainKHR,
    surface_format: SurfaceFormatKHR,
    extent: Extent2D,
    images: Vec<Image>,
}

impl Swapchain {
    pub fn new(
        instance: &Instance,
        surface: &Surface,
        logical_device: &LogicalDevice,
        preferences: &SwapchainPreferences,
        framebuffer_size: impl FnOnce() -> Extent2D,
    ) -> Result<Self> {
        // the snapshot device selection already checked
        let support = &logical_device.physical_device_info().swapchain_support;
        let settings = support.negotiate(preferences, framebuffer_size)?;
        info!(
            "Swapchain: {:?} {:?}, {:?}, {}x{}, {} images",
            settings.surface_format.format,
            settings.surface_format.color_space,
            settings.present_mode,
            settings.extent.width,
            settings.extent.height,
            settings.image_count
        );

        let queues = logical_device.queue_families();
        let sharing = ImageSharing::new(queues.graphics, queues.present);

        let swapchain_create_info = SwapchainCreateInfoKHR::default()
            .surface(**surface)
            .min_image_count(settings.image_count)
            .image_format(settings.surface_format.format)
            .image_color_space(settings.surface_format.color_space)
            .image_extent(settings.extent)
            .present_mode(settings.present_mode)
            // always 1 unless doing sterioscopic 3D
            .image_array_layers(1)
            // use images as color attachments for drawing color pictures to
            .image_usage(ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing.mode)
            .queue_family_indices(&sharing.queue_family_indices)
            // no transform
            .pre_transform(support.capabilities.current_transform)
            // ignore alpha channel
            .composite_alpha(CompositeAlphaFlagsKHR::OPAQUE)
            // enable clipping, to discard pixels that aren't visible
            .clipped(true)
            .old_swapchain(SwapchainKHR::null());

        let swapchain_fn = swapchain::Device::new(instance, logical_device);
        let swapchain_ptr = unsafe { swapchain_fn.create_swapchain(&swapchain_create_info, None) }
            .map_err(BootstrapError::SwapchainCreation)?;

        let images = match unsafe { swapchain_fn.get_swapchain_images(swapchain_ptr) } {
            Ok(images) => images,
            Err(err) => {
                unsafe { swapchain_fn.destroy_swapchain(swapchain_ptr, None) };
                return Err(BootstrapError::SwapchainCreation(err));
            }
        };
        debug!("Swapchain created with {} images", images.len());

        Ok(Self {
            swapchain_fn,
            swapchain_ptr,
            surface_format: settings.surface_format,
            extent: settings.extent,
            images,
        })
    }

    pub fn get_extent(&self) -> Extent2D {
        self.extent
    }

    pub fn get_surface_format(&self) -> SurfaceFormatKHR {
        self.surface_format
    }

    /// Images in acquisition order.
    pub fn get_images(&self) -> &[Image] {
        &self.images
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.swapchain_fn
                .destroy_swapchain(self.swapchain_ptr, None)
        }
    }
}

impl Deref for Swapchain {
    type Target = swapchain::Device;

    fn deref(&self) -> &Self::Target {
        &self.swapchain_fn
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn preferences() -> SwapchainPreferences {
        SwapchainPreferences {
            format: Format::B8G8R8A8_SRGB,
            color_space: ColorSpaceKHR::SRGB_NONLINEAR,
            present_mode: PresentModeKHR::MAILBOX,
        }
    }

    fn surface_format(format: Format, color_space: ColorSpaceKHR) -> SurfaceFormatKHR {
        SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn extent(width: u32, height: u32) -> Extent2D {
        Extent2D { width, height }
    }

    fn with_counts(min_image_count: u32, max_image_count: u32) -> SwapchainSupport {
        SwapchainSupport {
            capabilities: SurfaceCapabilitiesKHR {
                min_image_count,
                max_image_count,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn format_prefers_exact_match() {
        let preferred = surface_format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR);
        let support = SwapchainSupport {
            formats: vec![
                surface_format(Format::R8G8B8A8_UNORM, ColorSpaceKHR::SRGB_NONLINEAR),
                // right format, wrong color space
                surface_format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
                preferred,
            ],
            ..Default::default()
        };
        assert_eq!(support.choose_surface_format(&preferences()), preferred);
    }

    #[test]
    fn format_falls_back_to_first() {
        let first = surface_format(Format::R8G8B8A8_UNORM, ColorSpaceKHR::SRGB_NONLINEAR);
        let support = SwapchainSupport {
            formats: vec![
                first,
                surface_format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
            ],
            ..Default::default()
        };
        assert_eq!(support.choose_surface_format(&preferences()), first);
    }

    #[test]
    fn present_mode_prefers_requested() {
        let support = SwapchainSupport {
            present_modes: vec![PresentModeKHR::FIFO, PresentModeKHR::MAILBOX],
            ..Default::default()
        };
        assert_eq!(
            support.choose_present_mode(&preferences()),
            PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn present_mode_falls_back_to_fifo() {
        let support = SwapchainSupport {
            present_modes: vec![PresentModeKHR::IMMEDIATE, PresentModeKHR::FIFO_RELAXED],
            ..Default::default()
        };
        assert_eq!(
            support.choose_present_mode(&preferences()),
            PresentModeKHR::FIFO
        );
    }

    #[test]
    fn extent_uses_current_when_defined() {
        let support = SwapchainSupport {
            capabilities: SurfaceCapabilitiesKHR {
                current_extent: extent(1280, 720),
                min_image_extent: extent(1, 1),
                max_image_extent: extent(4096, 4096),
                ..Default::default()
            },
            ..Default::default()
        };
        let queried = Cell::new(false);
        let chosen = support.choose_extent(|| {
            queried.set(true);
            extent(1920, 1080)
        });
        assert_eq!(chosen, extent(1280, 720));
        assert!(!queried.get(), "framebuffer size must not be queried");
    }

    #[test]
    fn extent_clamps_framebuffer_when_undefined() {
        let support = SwapchainSupport {
            capabilities: SurfaceCapabilitiesKHR {
                current_extent: extent(u32::MAX, u32::MAX),
                min_image_extent: extent(640, 480),
                max_image_extent: extent(1920, 1080),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(support.choose_extent(|| extent(4000, 100)), extent(1920, 480));
        assert_eq!(support.choose_extent(|| extent(1200, 900)), extent(1200, 900));
    }

    #[test]
    fn image_count_within_max_is_unchanged() {
        assert_eq!(with_counts(2, 3).choose_image_count(), 3);
    }

    #[test]
    fn image_count_clamps_to_max() {
        assert_eq!(with_counts(2, 2).choose_image_count(), 2);
    }

    #[test]
    fn image_count_unbounded_when_max_is_zero() {
        assert_eq!(with_counts(3, 0).choose_image_count(), 4);
    }

    #[test]
    fn same_family_is_exclusive() {
        let sharing = ImageSharing::new(0, 0);
        assert_eq!(sharing.mode, SharingMode::EXCLUSIVE);
        assert!(sharing.queue_family_indices.is_empty());
    }

    #[test]
    fn distinct_families_are_concurrent() {
        let sharing = ImageSharing::new(0, 1);
        assert_eq!(sharing.mode, SharingMode::CONCURRENT);
        assert_eq!(sharing.queue_family_indices, vec![0, 1]);
    }

    #[test]
    fn negotiate_bundles_every_choice() {
        let support = SwapchainSupport {
            capabilities: SurfaceCapabilitiesKHR {
                current_extent: extent(800, 600),
                min_image_count: 2,
                max_image_count: 8,
                ..Default::default()
            },
            formats: vec![surface_format(
                Format::B8G8R8A8_SRGB,
                ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![PresentModeKHR::FIFO],
        };
        assert!(support.is_adequate());
        let settings = support
            .negotiate(&preferences(), || extent(1, 1))
            .unwrap();
        assert_eq!(
            settings,
            SwapchainSettings {
                surface_format: surface_format(
                    Format::B8G8R8A8_SRGB,
                    ColorSpaceKHR::SRGB_NONLINEAR
                ),
                present_mode: PresentModeKHR::FIFO,
                extent: extent(800, 600),
                image_count: 3,
            }
        );
    }

    #[test]
    fn empty_format_set_is_inadequate() {
        let support = SwapchainSupport {
            present_modes: vec![PresentModeKHR::FIFO],
            ..Default::default()
        };
        assert!(!support.is_adequate());
    }

    #[test]
    fn inadequate_support_does_not_negotiate() {
        let support = SwapchainSupport {
            present_modes: vec![PresentModeKHR::FIFO, PresentModeKHR::MAILBOX],
            ..Default::default()
        };
        assert!(matches!(
            support.negotiate(&preferences(), || extent(800, 600)),
            Err(BootstrapError::SwapchainCreation(
                vk::Result::ERROR_FORMAT_NOT_SUPPORTED
            ))
        ));
    }

    #[test]
    fn empty_sets_are_inadequate() {
        let support = SwapchainSupport {
            formats: vec![surface_format(
                Format::B8G8R8A8_SRGB,
                ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            ..Default::default()
        };
        assert!(!support.is_adequate());
    }
}
