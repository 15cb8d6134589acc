use std::ops::Deref;

use ash::{
    vk::{
        self, ComponentMapping, ComponentSwizzle, Image, ImageAspectFlags, ImageSubresourceRange,
        ImageViewCreateInfo, ImageViewType, SurfaceFormatKHR,
    },
    Device,
};

use crate::{error::Result, BootstrapError, LogicalDevice, Swapchain};

pub struct ImageView {
    device: Device,
    image_view: vk::ImageView,
}

impl ImageView {
    /// 2D colour view over the whole image: identity swizzle, one mip level, one layer.
    pub fn new(device: &Device, surface_format: SurfaceFormatKHR, image: Image) -> Result<Self> {
        let subresource_range = ImageSubresourceRange {
            aspect_mask: ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        let identity = ComponentMapping {
            r: ComponentSwizzle::IDENTITY,
            g: ComponentSwizzle::IDENTITY,
            b: ComponentSwizzle::IDENTITY,
            a: ComponentSwizzle::IDENTITY,
        };
        let create_info = ImageViewCreateInfo::default()
            .image(image)
            .view_type(ImageViewType::TYPE_2D)
            .format(surface_format.format)
            .components(identity)
            .subresource_range(subresource_range);

        let image_view = unsafe { device.create_image_view(&create_info, None) }
            .map_err(BootstrapError::ImageViewCreation)?;
        Ok(Self {
            device: device.clone(),
            image_view,
        })
    }

    /// One view per swapchain image, in the same order. Views created before a
    /// failure are destroyed on the way out.
    pub fn for_swapchain(logical_device: &LogicalDevice, swapchain: &Swapchain) -> Result<Vec<Self>> {
        swapchain
            .get_images()
            .iter()
            .map(|image| Self::new(logical_device, swapchain.get_surface_format(), *image))
            .collect()
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe { self.device.destroy_image_view(self.image_view, None) }
    }
}

impl Deref for ImageView {
    type Target = vk::ImageView;

    fn deref(&self) -> &Self::Target {
        &self.image_view
    }
}
