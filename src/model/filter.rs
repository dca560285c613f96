use std::rc::Rc;

use crate::{
    foundation::ids::{ModelId, ResourceId},
    render::shader::{PixelShader, ShaderCompiler},
    resource::{
        protocol::{Model, PropertyInfo, PropertyKind, Resource, UpdateContext, commit_version},
        value::compare_and_update,
    },
};

/// A user-authored pixel effect applied to a rendered subtree.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FilterEffect {
    #[serde(skip, default = "ModelId::next")]
    id: ModelId,
    /// Shader source handed to the [`crate::ShaderCompiler`].
    pub source: String,
    /// Disabled effects pass their input through.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl FilterEffect {
    /// Enabled effect with `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            id: ModelId::next(),
            source: source.into(),
            enabled: true,
        }
    }
}

impl Model for FilterEffect {
    const PROPERTIES: &'static [PropertyInfo] = &[
        PropertyInfo::new("source", PropertyKind::Text, false),
        PropertyInfo::new("enabled", PropertyKind::Bool, false),
    ];

    fn id(&self) -> ModelId {
        self.id
    }
}

/// Compiled state of a [`FilterEffect`].
///
/// Compilation runs when the source text changes. A failure leaves the effect without a shader
/// (pass-through) and records a sticky `last_error`, logged only when its text changes.
pub struct FilterEffectResource {
    id: ResourceId,
    model_id: ModelId,
    version: u64,
    source: String,
    enabled: bool,
    shader: Option<Rc<dyn PixelShader>>,
    last_error: Option<String>,
    disposed: bool,
}

impl FilterEffectResource {
    /// Source copied at the last update.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the effect was enabled at the last update.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The effect to apply this frame, `None` for pass-through.
    pub fn shader(&self) -> Option<&Rc<dyn PixelShader>> {
        if self.disposed || !self.enabled {
            return None;
        }
        self.shader.as_ref()
    }

    /// Error of the last failed compile, kept until a compile succeeds or the source is emptied.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn compile(&mut self, compiler: Option<&dyn ShaderCompiler>) {
        if self.source.trim().is_empty() {
            self.shader = None;
            self.last_error = None;
            return;
        }
        let result = match compiler {
            Some(compiler) => compiler.compile(&self.source),
            None => Err("no shader compiler available".to_string()),
        };
        match result {
            Ok(shader) => {
                self.shader = Some(shader);
                if self.last_error.take().is_some() {
                    tracing::info!(resource = self.id.raw(), "filter effect compiles again");
                }
            }
            Err(err) => {
                self.shader = None;
                if self.last_error.as_deref() != Some(err.as_str()) {
                    tracing::warn!(resource = self.id.raw(), error = %err, "filter effect failed to compile; passing through");
                    self.last_error = Some(err);
                }
            }
        }
    }
}

impl std::fmt::Debug for FilterEffectResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEffectResource")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("enabled", &self.enabled)
            .field("compiled", &self.shader.is_some())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Resource for FilterEffectResource {
    type Model = FilterEffect;

    fn from_model(model: &FilterEffect, ctx: &UpdateContext<'_>) -> Self {
        let mut resource = Self {
            id: ResourceId::next(),
            model_id: model.id,
            version: 0,
            source: model.source.clone(),
            enabled: model.enabled,
            shader: None,
            last_error: None,
            disposed: false,
        };
        resource.compile(ctx.shader_compiler);
        resource
    }

    fn id(&self) -> ResourceId {
        self.id
    }

    fn model_id(&self) -> ModelId {
        self.model_id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn update(&mut self, model: &FilterEffect, ctx: &UpdateContext<'_>, _update_only: &mut bool) {
        let mut changed = false;
        let source_changed = compare_and_update(&mut self.source, model.source.clone(), &mut changed);
        compare_and_update(&mut self.enabled, model.enabled, &mut changed);
        if source_changed {
            self.compile(ctx.shader_compiler);
        }
        commit_version(&mut self.version, changed);
    }

    fn dispose(&mut self) {
        self.shader = None;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/filter.rs"]
mod tests;
