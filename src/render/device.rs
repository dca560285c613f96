use crate::{
    foundation::core::Rect,
    foundation::error::{FlurryError, FlurryResult},
    graph::op::RenderOp,
    render::{
        cpu::{MAX_TARGET_DIM, rasterize_ops},
        image::RenderTarget,
    },
};

/// Opaque graphics device capability: turns operation lists into off-screen targets.
pub trait GraphicsDevice {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Largest target edge, in pixels, the device can allocate.
    fn max_target_dim(&self) -> u32;

    /// Render `ops` clipped to `bounds` into a new target placed at `bounds`.
    fn rasterize(&self, ops: &[RenderOp], bounds: Rect) -> FlurryResult<RenderTarget>;
}

/// Device that rasterizes with the `vello_cpu` canvas.
#[derive(Clone, Debug)]
pub struct CpuDevice {
    max_dim: u32,
}

impl CpuDevice {
    /// Device limiting targets to `max_dim` (at most [`MAX_TARGET_DIM`]).
    pub fn new(max_dim: u32) -> Self {
        Self {
            max_dim: max_dim.clamp(1, MAX_TARGET_DIM),
        }
    }
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new(MAX_TARGET_DIM)
    }
}

impl GraphicsDevice for CpuDevice {
    fn name(&self) -> &str {
        "cpu"
    }

    fn max_target_dim(&self) -> u32 {
        self.max_dim
    }

    fn rasterize(&self, ops: &[RenderOp], bounds: Rect) -> FlurryResult<RenderTarget> {
        rasterize_ops(ops, bounds, self.max_dim)
    }
}

enum DeviceState {
    Ready(Box<dyn GraphicsDevice>),
    Unavailable(String),
}

/// Explicitly owned graphics context, created and torn down by the top-level run loop.
///
/// A failed initialization is reported once and the context then stays unavailable for its
/// whole lifetime; callers degrade instead of retrying every frame.
pub struct GraphicsContext {
    state: DeviceState,
}

impl GraphicsContext {
    /// Context on the default CPU device.
    pub fn cpu() -> Self {
        Self::with_device(Box::new(CpuDevice::default()))
    }

    /// Context on an already created device.
    pub fn with_device(device: Box<dyn GraphicsDevice>) -> Self {
        tracing::debug!(device = device.name(), "graphics context ready");
        Self {
            state: DeviceState::Ready(device),
        }
    }

    /// Run `init` once. On failure the error is logged and the context stays unavailable.
    pub fn initialize<F>(init: F) -> Self
    where
        F: FnOnce() -> FlurryResult<Box<dyn GraphicsDevice>>,
    {
        match init() {
            Ok(device) => Self::with_device(device),
            Err(err) => {
                tracing::error!(error = %err, "graphics device initialization failed; off-screen rendering disabled");
                Self {
                    state: DeviceState::Unavailable(err.to_string()),
                }
            }
        }
    }

    /// A context with no device, e.g. for headless evaluation.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: DeviceState::Unavailable(reason.into()),
        }
    }

    /// Whether off-screen rendering is possible.
    pub fn is_available(&self) -> bool {
        matches!(self.state, DeviceState::Ready(_))
    }

    /// The device, when available.
    pub fn device(&self) -> Option<&dyn GraphicsDevice> {
        match &self.state {
            DeviceState::Ready(device) => Some(device.as_ref()),
            DeviceState::Unavailable(_) => None,
        }
    }

    /// Why there is no device.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            DeviceState::Ready(_) => None,
            DeviceState::Unavailable(reason) => Some(reason),
        }
    }

    /// Rasterize on the device, or fail with [`FlurryError::Unavailable`].
    pub fn rasterize(&self, ops: &[RenderOp], bounds: Rect) -> FlurryResult<RenderTarget> {
        match &self.state {
            DeviceState::Ready(device) => device.rasterize(ops, bounds),
            DeviceState::Unavailable(reason) => Err(FlurryError::unavailable(reason.clone())),
        }
    }

    /// Release the device. The context is unavailable afterwards.
    pub fn shutdown(&mut self) {
        if let DeviceState::Ready(device) = &self.state {
            tracing::debug!(device = device.name(), "graphics context shut down");
        }
        self.state = DeviceState::Unavailable("graphics context shut down".to_string());
    }
}

impl std::fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            DeviceState::Ready(device) => f
                .debug_struct("GraphicsContext")
                .field("device", &device.name())
                .finish(),
            DeviceState::Unavailable(reason) => f
                .debug_struct("GraphicsContext")
                .field("unavailable", reason)
                .finish(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/device.rs"]
mod tests;
