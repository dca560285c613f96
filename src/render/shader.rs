use std::rc::Rc;

/// A compiled per-pixel effect operating on premultiplied RGBA8 rows.
pub trait PixelShader {
    /// Transform the pixels in place.
    fn apply(&self, rgba8_premul: &mut [u8], width: u32, height: u32);
}

/// External shader compiler capability.
///
/// Returns the compiled effect or a human-readable error. The engine never retries a failed
/// source on its own; it recompiles only when the source text changes.
pub trait ShaderCompiler {
    /// Compile `source` into a shader.
    fn compile(&self, source: &str) -> Result<Rc<dyn PixelShader>, String>;
}

/// Compiler for a small set of named effects, one per source line:
/// `invert`, `grayscale`, `brightness <k>`, `opacity <k>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinShaderCompiler;

#[derive(Clone, Copy, Debug, PartialEq)]
enum BuiltinPass {
    Invert,
    Grayscale,
    Brightness(f32),
    Opacity(f32),
}

struct BuiltinShader {
    passes: Vec<BuiltinPass>,
}

impl ShaderCompiler for BuiltinShaderCompiler {
    fn compile(&self, source: &str) -> Result<Rc<dyn PixelShader>, String> {
        let mut passes = Vec::new();
        for (n, line) in source.lines().enumerate() {
            let mut words = line.split_whitespace();
            let Some(name) = words.next() else {
                continue;
            };
            let mut arg = || -> Result<f32, String> {
                words
                    .next()
                    .ok_or_else(|| format!("line {}: '{name}' needs an argument", n + 1))?
                    .parse::<f32>()
                    .map_err(|e| format!("line {}: {e}", n + 1))
                    .and_then(|v| {
                        if v.is_finite() && v >= 0.0 {
                            Ok(v)
                        } else {
                            Err(format!("line {}: argument must be finite and >= 0", n + 1))
                        }
                    })
            };
            let pass = match name {
                "invert" => BuiltinPass::Invert,
                "grayscale" => BuiltinPass::Grayscale,
                "brightness" => BuiltinPass::Brightness(arg()?),
                "opacity" => BuiltinPass::Opacity(arg()?.min(1.0)),
                other => return Err(format!("line {}: unknown effect '{other}'", n + 1)),
            };
            passes.push(pass);
        }
        if passes.is_empty() {
            return Err("shader source has no effects".to_string());
        }
        Ok(Rc::new(BuiltinShader { passes }))
    }
}

impl PixelShader for BuiltinShader {
    fn apply(&self, rgba8_premul: &mut [u8], _width: u32, _height: u32) {
        for px in rgba8_premul.chunks_exact_mut(4) {
            for pass in &self.passes {
                let a = px[3];
                match *pass {
                    BuiltinPass::Invert => {
                        // Premultiplied inverse: a - c.
                        for c in &mut px[..3] {
                            *c = a.saturating_sub(*c);
                        }
                    }
                    BuiltinPass::Grayscale => {
                        let y = (u32::from(px[0]) * 54 + u32::from(px[1]) * 183 + u32::from(px[2]) * 19
                            + 128)
                            >> 8;
                        let y = y.min(u32::from(a)) as u8;
                        px[..3].fill(y);
                    }
                    BuiltinPass::Brightness(k) => {
                        for c in &mut px[..3] {
                            *c = (f32::from(*c) * k).round().min(f32::from(a)) as u8;
                        }
                    }
                    BuiltinPass::Opacity(k) => {
                        for c in px.iter_mut() {
                            *c = (f32::from(*c) * k).round() as u8;
                        }
                    }
                }
            }
        }
    }
}
