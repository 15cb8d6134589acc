use std::ffi::CStr;

use ash::{
    vk::{
        self, AccessFlags, AttachmentDescription, AttachmentLoadOp, AttachmentReference,
        AttachmentStoreOp, ColorComponentFlags, CompareOp, CullModeFlags, DynamicState, Extent2D,
        Format, FrontFace, GraphicsPipelineCreateInfo, ImageLayout, LogicOp, PipelineBindPoint,
        PipelineCache, PipelineColorBlendAttachmentState, PipelineColorBlendStateCreateInfo,
        PipelineDepthStencilStateCreateInfo, PipelineDynamicStateCreateInfo,
        PipelineInputAssemblyStateCreateInfo, PipelineLayoutCreateInfo,
        PipelineMultisampleStateCreateInfo, PipelineRasterizationStateCreateInfo,
        PipelineShaderStageCreateInfo, PipelineStageFlags, PipelineVertexInputStateCreateInfo,
        PipelineViewportStateCreateInfo, PolygonMode, PrimitiveTopology, Rect2D,
        RenderPassCreateInfo, SampleCountFlags, ShaderStageFlags, SubpassDependency,
        SubpassDescription, Viewport, SUBPASS_EXTERNAL,
    },
    Device,
};
use tracing::debug;

use crate::{error::Result, BootstrapError, ShaderCode, ShaderModule};

const SHADER_ENTRY_POINT: &CStr = c"main";

/// Fixed-function configuration of the pipeline. Owns the arrays the create
/// infos point into, so it has to outlive pipeline creation.
#[derive(Debug, Clone, Copy)]
pub struct FixedFunctionState {
    viewports: [Viewport; 1],
    scissors: [Rect2D; 1],
    color_blend_attachments: [PipelineColorBlendAttachmentState; 1],
}

impl FixedFunctionState {
    /// Respecified per command buffer instead of baked into the pipeline.
    pub const DYNAMIC_STATES: [DynamicState; 3] = [
        DynamicState::VIEWPORT,
        DynamicState::SCISSOR,
        DynamicState::LINE_WIDTH,
    ];

    /// Viewport and scissor cover the whole `extent`.
    pub fn new(extent: Extent2D) -> Self {
        let viewports = [Viewport::default()
            .x(0.0f32)
            .y(0.0f32)
            .width(extent.width as f32)
            .height(extent.height as f32)
            .min_depth(0.0f32)
            .max_depth(1.0f32)];
        let scissors = [Rect2D::default().extent(extent)];

        // straight overwrite, the fragment shader output passes thru unchanged
        let color_blend_attachments = [PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(ColorComponentFlags::RGBA)];

        Self {
            viewports,
            scissors,
            color_blend_attachments,
        }
    }

    /// Vertex data is hard-coded in the vertex shader, so no bindings or attributes.
    pub fn vertex_input(&self) -> PipelineVertexInputStateCreateInfo<'_> {
        PipelineVertexInputStateCreateInfo::default()
    }

    pub fn input_assembly(&self) -> PipelineInputAssemblyStateCreateInfo<'_> {
        PipelineInputAssemblyStateCreateInfo::default()
            .topology(PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false)
    }

    pub fn viewport_state(&self) -> PipelineViewportStateCreateInfo<'_> {
        PipelineViewportStateCreateInfo::default()
            .viewports(&self.viewports)
            .scissors(&self.scissors)
    }

    pub fn rasterization(&self) -> PipelineRasterizationStateCreateInfo<'_> {
        PipelineRasterizationStateCreateInfo::default()
            // discard fragments beyond the near and far planes instead of clamping them
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(PolygonMode::FILL)
            .line_width(1.0f32)
            .cull_mode(CullModeFlags::BACK)
            .front_face(FrontFace::CLOCKWISE)
            .depth_bias_enable(false)
    }

    pub fn multisample(&self) -> PipelineMultisampleStateCreateInfo<'_> {
        PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(SampleCountFlags::TYPE_1)
    }

    pub fn depth_stencil(&self) -> PipelineDepthStencilStateCreateInfo<'_> {
        PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .min_depth_bounds(0.0f32)
            .max_depth_bounds(1.0f32)
            .stencil_test_enable(false)
    }

    pub fn color_blend(&self) -> PipelineColorBlendStateCreateInfo<'_> {
        PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .logic_op(LogicOp::COPY)
            .attachments(&self.color_blend_attachments)
    }

    pub fn dynamic_state(&self) -> PipelineDynamicStateCreateInfo<'static> {
        PipelineDynamicStateCreateInfo::default().dynamic_states(&Self::DYNAMIC_STATES)
    }
}

struct PipelineLayout {
    device: Device,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    /// No descriptor sets or push constants yet.
    fn new(device: &Device) -> Result<Self> {
        let pipeline_layout_create_info = PipelineLayoutCreateInfo::default();
        let layout = unsafe { device.create_pipeline_layout(&pipeline_layout_create_info, None) }
            .map_err(BootstrapError::PipelineCreation)?;
        Ok(Self {
            device: device.clone(),
            layout,
        })
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe { self.device.destroy_pipeline_layout(self.layout, None) }
    }
}

struct RenderPass {
    device: Device,
    render_pass: vk::RenderPass,
}

impl RenderPass {
    /// Single subpass writing one color attachment in the swapchain's format.
    fn new(device: &Device, format: Format) -> Result<Self> {
        // previous contents are cleared, so the initial layout is irrelevant
        let color_attachment = [AttachmentDescription::default()
            .format(format)
            .samples(SampleCountFlags::TYPE_1)
            .load_op(AttachmentLoadOp::CLEAR)
            .store_op(AttachmentStoreOp::STORE)
            .stencil_load_op(AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(AttachmentStoreOp::DONT_CARE)
            .initial_layout(ImageLayout::UNDEFINED)
            .final_layout(ImageLayout::PRESENT_SRC_KHR)];

        let attachment_ref = [AttachmentReference::default()
            .attachment(0)
            .layout(ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

        let subpass_description = [SubpassDescription::default()
            .pipeline_bind_point(PipelineBindPoint::GRAPHICS)
            .color_attachments(&attachment_ref)];

        let subpass_dependencies = [SubpassDependency::default()
            .src_subpass(SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(AccessFlags::empty())
            .dst_stage_mask(PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(AccessFlags::COLOR_ATTACHMENT_WRITE)];

        let render_pass_create_info = RenderPassCreateInfo::default()
            .attachments(&color_attachment)
            .subpasses(&subpass_description)
            .dependencies(&subpass_dependencies);

        let render_pass = unsafe { device.create_render_pass(&render_pass_create_info, None) }
            .map_err(BootstrapError::PipelineCreation)?;
        Ok(Self {
            device: device.clone(),
            render_pass,
        })
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe { self.device.destroy_render_pass(self.render_pass, None) }
    }
}

/// The immutable graphics pipeline together with the layout and render pass
/// it was built against.
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    // dropped after the pipeline, in this order
    layout: PipelineLayout,
    render_pass: RenderPass,
}

impl GraphicsPipeline {
    /// Configures the fixed function stages and creates the graphics pipeline. Shader
    /// modules only live for the duration of this call.
    pub fn assemble(
        device: &Device,
        format: Format,
        extent: Extent2D,
        shaders: &ShaderCode,
    ) -> Result<Self> {
        debug!("Creating graphics pipeline...");
        let layout = PipelineLayout::new(device)?;
        let render_pass = RenderPass::new(device, format)?;

        let vertex_shader_module = ShaderModule::new(device, &shaders.vertex)?;
        let fragment_shader_module = ShaderModule::new(device, &shaders.fragment)?;
        let shader_stages = [
            PipelineShaderStageCreateInfo::default()
                .stage(ShaderStageFlags::VERTEX)
                .module(*vertex_shader_module)
                .name(SHADER_ENTRY_POINT),
            PipelineShaderStageCreateInfo::default()
                .stage(ShaderStageFlags::FRAGMENT)
                .module(*fragment_shader_module)
                .name(SHADER_ENTRY_POINT),
        ];

        let fixed_function = FixedFunctionState::new(extent);
        let vertex_input_state = fixed_function.vertex_input();
        let input_assembly_state = fixed_function.input_assembly();
        let viewport_state = fixed_function.viewport_state();
        let rasterization_state = fixed_function.rasterization();
        let multisample_state = fixed_function.multisample();
        let depth_stencil_state = fixed_function.depth_stencil();
        let color_blend_state = fixed_function.color_blend();
        let dynamic_state = fixed_function.dynamic_state();

        let pipeline_create_infos = [GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout.layout)
            .render_pass(render_pass.render_pass)
            .subpass(0)];

        let pipelines = unsafe {
            device.create_graphics_pipelines(PipelineCache::null(), &pipeline_create_infos, None)
        }
        .map_err(|(_, err)| BootstrapError::PipelineCreation(err))?;
        let pipeline = pipelines
            .into_iter()
            .next()
            .ok_or(BootstrapError::PipelineCreation(vk::Result::ERROR_UNKNOWN))?;

        debug!("Graphics pipeline created");
        Ok(Self {
            device: device.clone(),
            pipeline,
            layout,
            render_pass,
        })
    }

}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        debug!("Dropping GraphicsPipeline");
        unsafe { self.device.destroy_pipeline(self.pipeline, None) }
    }
}
