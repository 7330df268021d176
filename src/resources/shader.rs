//! Shader and program wrappers.
//!
//! Compile and link status are checked immediately at construction. An
//! empty diagnostic log means success; a non-empty log is the only failure
//! signal (there is no separate flag). Broken programs stay usable objects
//! so the caller can decide whether to proceed or abort.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::backend::types::{ObjectKind, ShaderStage};
use crate::context::Context;
use crate::handle::GlObject;
use crate::error::Result;

/// Closed set of uniform value kinds.
///
/// One explicit variant per settable type removes any possibility of a
/// mismatched setter/argument pair at the call site; the backend dispatches
/// on the variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    I32(i32),
    U32(u32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::F32(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::I32(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::U32(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// One compiled shader stage.
pub struct Shader {
    gl: GlObject,
    stage: ShaderStage,
    log: String,
}

impl Shader {
    /// Create the device shader and compile `source`.
    ///
    /// The returned object exists even when compilation failed; inspect
    /// [`Shader::compiled`] / [`Shader::log`].
    pub fn compile(ctx: &Context, stage: ShaderStage, source: &str) -> Result<Self> {
        let gl = GlObject::create(ctx, ObjectKind::Shader(stage))?;
        let status = ctx.backend().compile_shader(gl.id(), source);
        let log = if status {
            String::new()
        } else {
            let log = ctx.backend().shader_info_log(gl.id());
            log::error!("{stage:?} shader compilation failed:\n{log}");
            log
        };
        Ok(Self { gl, stage, log })
    }

    /// True iff the diagnostic log is empty.
    pub fn compiled(&self) -> bool {
        self.log.is_empty()
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn id(&self) -> u32 {
        self.gl.id()
    }
}

/// A linked shader program.
pub struct Program {
    gl: GlObject,
    log: String,
}

impl Program {
    /// Link the given stages into a program. Shaders are attached for the
    /// duration of the link only.
    pub fn link(ctx: &Context, shaders: &[&Shader]) -> Result<Self> {
        let gl = GlObject::create(ctx, ObjectKind::Program)?;
        let backend = ctx.backend();
        for shader in shaders {
            backend.attach_shader(gl.id(), shader.id());
        }
        let status = backend.link_program(gl.id());
        let log = if status {
            String::new()
        } else {
            let log = backend.program_info_log(gl.id());
            log::error!("program link failed:\n{log}");
            log
        };
        for shader in shaders {
            backend.detach_shader(gl.id(), shader.id());
        }
        Ok(Self { gl, log })
    }

    /// True iff the diagnostic log is empty.
    pub fn linked(&self) -> bool {
        self.log.is_empty()
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn id(&self) -> u32 {
        self.gl.id()
    }

    /// Make this program current.
    pub fn activate(&self) {
        self.gl.context().backend().use_program(self.gl.id());
    }

    /// Set one uniform by name.
    ///
    /// The location is resolved on every call; a name the program does not
    /// expose is reported at debug level and otherwise ignored, matching
    /// the device's behavior for optimized-out uniforms.
    pub fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) -> &Self {
        let backend = self.gl.context().backend();
        backend.use_program(self.gl.id());
        if !backend.set_uniform(self.gl.id(), name, &value.into()) {
            log::debug!("uniform '{name}' not found in program #{}", self.gl.id());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "#version 450\nvoid main() { gl_Position = vec4(0); }";

    #[test]
    fn test_compile_success_has_empty_log() {
        let ctx = Context::headless();
        let shader = Shader::compile(&ctx, ShaderStage::Vertex, VS).unwrap();
        assert!(shader.compiled());
        assert!(shader.log().is_empty());
    }

    #[test]
    fn test_compile_failure_is_signaled_by_log_only() {
        let ctx = Context::headless();
        let shader = Shader::compile(&ctx, ShaderStage::Fragment, "   ").unwrap();
        assert!(!shader.compiled());
        assert!(!shader.log().is_empty());
    }

    #[test]
    fn test_link_and_uniforms() {
        let ctx = Context::headless();
        let vs = Shader::compile(&ctx, ShaderStage::Vertex, VS).unwrap();
        let program = Program::link(&ctx, &[&vs]).unwrap();
        assert!(program.linked());
        program
            .set_uniform("scale", 2.0f32)
            .set_uniform("offset", Vec3::ONE);
    }

    #[test]
    fn test_link_failure_with_broken_stage() {
        let ctx = Context::headless();
        let broken = Shader::compile(&ctx, ShaderStage::Vertex, "").unwrap();
        let program = Program::link(&ctx, &[&broken]).unwrap();
        assert!(!program.linked());
        assert!(!program.log().is_empty());
    }
}
