use crate::{
    foundation::ids::{ModelId, ResourceId},
    render::shader::ShaderCompiler,
};

/// Per-frame inputs for a resource update.
#[derive(Clone, Copy)]
pub struct UpdateContext<'a> {
    /// Absolute timeline time in seconds, supplied by the scene/animation system.
    pub time: f64,
    /// Compiler used by effect resources; `None` means every compile fails.
    pub shader_compiler: Option<&'a dyn ShaderCompiler>,
}

impl<'a> UpdateContext<'a> {
    /// Context at `time` without a shader compiler.
    pub fn at(time: f64) -> Self {
        Self {
            time,
            shader_compiler: None,
        }
    }

    /// Use `compiler` for filter sources.
    pub fn with_shader_compiler(mut self, compiler: &'a dyn ShaderCompiler) -> Self {
        self.shader_compiler = Some(compiler);
        self
    }
}

impl std::fmt::Debug for UpdateContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateContext")
            .field("time", &self.time)
            .field("shader_compiler", &self.shader_compiler.is_some())
            .finish()
    }
}

/// Kind tag of a registered model property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    /// Scalar number.
    Float,
    /// Whole number.
    Integer,
    /// Flag.
    Bool,
    /// Color value.
    Color,
    /// One of a fixed set of variants.
    Enum,
    /// Free text, such as shader source.
    Text,
    /// Another model mirrored by its own resource.
    Nested,
}

/// One entry of a model's explicit property registration list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Property name as serialized.
    pub name: &'static str,
    /// Value kind.
    pub kind: PropertyKind,
    /// Whether the value may be keyframed.
    pub animatable: bool,
}

impl PropertyInfo {
    /// Registration entry.
    pub const fn new(name: &'static str, kind: PropertyKind, animatable: bool) -> Self {
        Self {
            name,
            kind,
            animatable,
        }
    }
}

/// Persistent, user-editable scene object mirrored by a [`Resource`].
pub trait Model {
    /// Tracked properties, in the order the mirroring resource copies them.
    const PROPERTIES: &'static [PropertyInfo];

    /// Stable identity of the model object.
    fn id(&self) -> ModelId;
}

/// Per-render value snapshot of a [`Model`], versioned for change detection.
///
/// `version` increases by exactly one for every `update` call in which at least one copied value
/// (or a nested resource's version) changed, and never otherwise.
pub trait Resource {
    /// Model this resource mirrors.
    type Model: Model;

    /// Full build from the model's values at `ctx.time`.
    fn from_model(model: &Self::Model, ctx: &UpdateContext<'_>) -> Self
    where
        Self: Sized;

    /// Identity of this mirror.
    fn id(&self) -> ResourceId;

    /// Identity of the mirrored model.
    fn model_id(&self) -> ModelId;

    /// Change counter; see the trait docs.
    fn version(&self) -> u64;

    /// Diff-and-copy pass, called once per frame after the model's own time evaluation.
    ///
    /// `update_only` is in/out: `true` asks for a value refresh only, deferring heavy side
    /// effects; a resource may set it to `false` to force full rebuild semantics upstream.
    fn update(&mut self, model: &Self::Model, ctx: &UpdateContext<'_>, update_only: &mut bool);

    /// Release owned buffers. Idempotent.
    fn dispose(&mut self);

    /// Whether [`Resource::dispose`] has run.
    fn is_disposed(&self) -> bool;

    /// `(identity, version)` pair used as a cheap staleness key by render nodes.
    fn cache_key(&self) -> (ResourceId, u64) {
        (self.id(), self.version())
    }
}

/// Diff a nested resource slot against the model it should mirror.
///
/// Creates, replaces (model identity changed), removes (model gone) or recursively updates the
/// child, and flags `changed` when the child appeared, vanished or moved its version. A freshly
/// built child clears `update_only`.
pub fn compare_and_update_nested<R: Resource>(
    slot: &mut Option<R>,
    model: Option<&R::Model>,
    ctx: &UpdateContext<'_>,
    update_only: &mut bool,
    changed: &mut bool,
) {
    let Some(model) = model else {
        if let Some(mut old) = slot.take() {
            old.dispose();
            *changed = true;
        }
        return;
    };

    if let Some(current) = slot.as_mut()
        && current.model_id() == model.id()
    {
        let before = current.version();
        current.update(model, ctx, update_only);
        if current.version() != before {
            *changed = true;
        }
        return;
    }

    if let Some(mut old) = slot.take() {
        old.dispose();
    }
    *slot = Some(R::from_model(model, ctx));
    *changed = true;
    *update_only = false;
}

/// Bump `version` once if `changed`.
pub(crate) fn commit_version(version: &mut u64, changed: bool) {
    if changed {
        *version = version.saturating_add(1);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resource/protocol.rs"]
mod tests;
