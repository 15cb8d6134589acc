use tracing::debug;

use crate::bootstrap::Backend;

/// Everything the bootstrap created. Slots are declared in teardown order and
/// stay empty for stages that never ran.
pub struct RenderContext<B: Backend> {
    pub(crate) messenger: Option<B::Messenger>,
    pub(crate) pipeline: Option<B::Pipeline>,
    pub(crate) image_views: Vec<B::ImageView>,
    pub(crate) swapchain: Option<B::Swapchain>,
    pub(crate) device: Option<B::Device>,
    pub(crate) surface: Option<B::Surface>,
    pub(crate) instance: Option<B::Instance>,
    pub(crate) window: Option<B::Window>,
}

impl<B: Backend> RenderContext<B> {
    pub(crate) fn empty() -> Self {
        Self {
            messenger: None,
            pipeline: None,
            image_views: Vec::new(),
            swapchain: None,
            device: None,
            surface: None,
            instance: None,
            window: None,
        }
    }

    pub fn window(&self) -> Option<&B::Window> {
        self.window.as_ref()
    }

    pub fn window_mut(&mut self) -> Option<&mut B::Window> {
        self.window.as_mut()
    }

    pub fn instance(&self) -> Option<&B::Instance> {
        self.instance.as_ref()
    }

    pub fn device(&self) -> Option<&B::Device> {
        self.device.as_ref()
    }

    pub fn swapchain(&self) -> Option<&B::Swapchain> {
        self.swapchain.as_ref()
    }

    pub fn image_views(&self) -> &[B::ImageView] {
        &self.image_views
    }

    pub fn pipeline(&self) -> Option<&B::Pipeline> {
        self.pipeline.as_ref()
    }

    /// Releases every handle still held, dependents before what they depend on.
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        if let Some(messenger) = self.messenger.take() {
            debug!("Destroying debug messenger");
            drop(messenger);
        }
        if let Some(pipeline) = self.pipeline.take() {
            debug!("Destroying graphics pipeline");
            drop(pipeline);
        }
        if !self.image_views.is_empty() {
            debug!("Destroying {} image views", self.image_views.len());
            // drain keeps the views in swapchain order
            self.image_views.drain(..).for_each(drop);
        }
        if let Some(swapchain) = self.swapchain.take() {
            debug!("Destroying swapchain");
            drop(swapchain);
        }
        if let Some(device) = self.device.take() {
            debug!("Destroying logical device");
            drop(device);
        }
        if let Some(surface) = self.surface.take() {
            debug!("Destroying surface");
            drop(surface);
        }
        if let Some(instance) = self.instance.take() {
            debug!("Destroying instance");
            drop(instance);
        }
        if let Some(window) = self.window.take() {
            debug!("Destroying window");
            drop(window);
        }
    }
}

impl<B: Backend> Drop for RenderContext<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use crate::bootstrap::{
        bootstrap,
        tests::{RecordingBackend, Stage},
    };

    #[test]
    fn full_teardown_order() {
        let backend = RecordingBackend {
            image_count: 2,
            ..RecordingBackend::new()
        };
        let mut context = bootstrap(&backend, backend.window()).unwrap();
        context.teardown();
        assert_eq!(
            backend.destroyed(),
            vec![
                "messenger",
                "pipeline",
                "image view",
                "image view",
                "swapchain",
                "device",
                "surface",
                "instance",
                "window"
            ]
        );
    }

    #[test]
    fn teardown_is_idempotent() {
        let backend = RecordingBackend::new();
        let mut context = bootstrap(&backend, backend.window()).unwrap();
        context.teardown();
        let after_first = backend.destroyed();
        context.teardown();
        drop(context);
        assert_eq!(backend.destroyed(), after_first);
        assert!(!after_first.is_empty());
    }

    #[test]
    fn drop_runs_teardown() {
        let backend = RecordingBackend::new();
        let context = bootstrap(&backend, backend.window()).unwrap();
        drop(context);
        assert_eq!(backend.destroyed().first(), Some(&"messenger"));
        assert_eq!(backend.destroyed().last(), Some(&"window"));
    }

    #[test]
    fn torn_down_context_is_empty() {
        let backend = RecordingBackend::failing_at(Stage::ImageViews);
        assert!(bootstrap(&backend, backend.window()).is_err());
        assert_eq!(
            backend.destroyed(),
            vec!["messenger", "swapchain", "device", "surface", "instance", "window"]
        );

        let backend = RecordingBackend::new();
        let mut context = bootstrap(&backend, backend.window()).unwrap();
        context.teardown();
        assert!(context.window().is_none());
        assert!(context.pipeline().is_none());
        assert!(context.image_views().is_empty());
    }
}
