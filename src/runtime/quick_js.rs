//! Typesetting backend hosted in an embedded QuickJS runtime.
//!
//! The backend evaluates the supplied bundle once at construction and then
//! calls its [`ENTRY_FUNCTION`] per job. Markup and settings cross the
//! boundary as typed JS values; thrown JS exceptions come back as
//! [`Error::Typeset`] with the exception message as the diagnostic.

use rquickjs::{Context, Ctx, Exception, Function, Object, Runtime};

use crate::{
    error::{Error, Result},
    runtime::{RuntimeSource, TypesetSpec, Typesetter, DEFAULT_JS_STACK_SIZE, ENTRY_FUNCTION},
};

/// A QuickJS context holding an evaluated typesetting bundle.
pub struct QuickJsRuntime {
    context: Context,
}

impl std::fmt::Debug for QuickJsRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuickJsRuntime").finish_non_exhaustive()
    }
}

impl QuickJsRuntime {
    /// Construct a runtime and evaluate `source` in it.
    pub fn new(source: &RuntimeSource) -> Result<Self> {
        Self::with_stack_size(source, DEFAULT_JS_STACK_SIZE)
    }

    /// Construct a runtime with an explicit JS stack size.
    pub fn with_stack_size(source: &RuntimeSource, stack_size: usize) -> Result<Self> {
        if source.is_empty() {
            return Err(Error::RuntimeInit("empty typesetting bundle".to_owned()));
        }

        let runtime = Runtime::new()
            .map_err(|e| Error::RuntimeInit(format!("cannot allocate js runtime: {e}")))?;
        runtime.set_max_stack_size(stack_size);

        let context = Context::full(&runtime)
            .map_err(|e| Error::RuntimeInit(format!("cannot create js context: {e}")))?;

        context.with(|ctx| -> Result<()> {
            for chunk in source.chunks() {
                ctx.eval::<(), _>(chunk).map_err(|e| {
                    Error::RuntimeInit(format!(
                        "failed to evaluate typesetting bundle: {}",
                        thrown_message(&ctx, &e)
                    ))
                })?;
            }
            // Fail at construction, not on the first job, when the bundle
            // forgot its entry point.
            ctx.globals()
                .get::<_, Function>(ENTRY_FUNCTION)
                .map_err(|_| {
                    Error::RuntimeInit(format!(
                        "typesetting bundle does not define `{ENTRY_FUNCTION}`"
                    ))
                })?;
            Ok(())
        })?;

        Ok(Self { context })
    }
}

impl Typesetter for QuickJsRuntime {
    fn typeset(&self, tex: &str, spec: &TypesetSpec) -> Result<String> {
        self.context.with(|ctx| {
            let settings = Object::new(ctx.clone()).map_err(|e| marshal_error(&ctx, &e))?;
            settings
                .set("displayMode", spec.display_mode)
                .map_err(|e| marshal_error(&ctx, &e))?;
            settings
                .set("color", spec.color.as_str())
                .map_err(|e| marshal_error(&ctx, &e))?;
            settings
                .set("fontSize", spec.font_size)
                .map_err(|e| marshal_error(&ctx, &e))?;
            if let Some(width) = spec.max_width {
                settings
                    .set("maxWidthPx", width)
                    .map_err(|e| marshal_error(&ctx, &e))?;
            }

            let entry: Function = ctx
                .globals()
                .get(ENTRY_FUNCTION)
                .map_err(|e| marshal_error(&ctx, &e))?;
            entry
                .call::<_, String>((tex, settings))
                .map_err(|e| Error::Typeset(thrown_message(&ctx, &e)))
        })
    }
}

/// Prefer the message of a pending JS exception over the engine‑level error.
fn thrown_message(ctx: &Ctx<'_>, err: &rquickjs::Error) -> String {
    ctx.catch()
        .as_exception()
        .and_then(Exception::message)
        .unwrap_or_else(|| err.to_string())
}

fn marshal_error(ctx: &Ctx<'_>, err: &rquickjs::Error) -> Error {
    Error::Typeset(format!(
        "failed to marshal render settings: {}",
        thrown_message(ctx, err)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Stands in for a real math bundle: echoes the settings into a small
    // SVG and throws on a known-bad control sequence.
    const STUB_BUNDLE: &str = r#"
        function texToSvg(tex, settings) {
            if (tex.indexOf("\\bad") !== -1) {
                throw new Error("Undefined control sequence: \\bad");
            }
            var width = settings.maxWidthPx || (8 * tex.length);
            var height = settings.displayMode ? 2 * settings.fontSize : settings.fontSize;
            return '<svg xmlns="http://www.w3.org/2000/svg" width="' + width +
                '" height="' + height + '"><rect width="' + width +
                '" height="' + height + '" fill="' + settings.color + '"/></svg>';
        }
    "#;

    fn spec() -> TypesetSpec {
        TypesetSpec {
            display_mode: false,
            color: "rgba(0,0,0,1.000)".to_owned(),
            font_size: 16.0,
            max_width: None,
        }
    }

    #[test]
    fn typesets_through_the_bundle_entry() {
        let runtime = QuickJsRuntime::new(&RuntimeSource::from_static(STUB_BUNDLE)).unwrap();
        let svg = runtime.typeset("x^2", &spec()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("rgba(0,0,0,1.000)"));
    }

    #[test]
    fn settings_reach_the_bundle() {
        let runtime = QuickJsRuntime::new(&RuntimeSource::from_static(STUB_BUNDLE)).unwrap();
        let constrained = TypesetSpec {
            max_width: Some(200.0),
            ..spec()
        };
        let svg = runtime.typeset("x^2", &constrained).unwrap();
        assert!(svg.contains(r#"width="200""#));

        let display = TypesetSpec {
            display_mode: true,
            ..spec()
        };
        let svg = runtime.typeset("x^2", &display).unwrap();
        assert!(svg.contains(r#"height="32""#));
    }

    #[test]
    fn thrown_exceptions_become_typeset_diagnostics() {
        let runtime = QuickJsRuntime::new(&RuntimeSource::from_static(STUB_BUNDLE)).unwrap();
        let err = runtime.typeset("\\bad{x}", &spec()).unwrap_err();
        match err {
            Error::Typeset(message) => {
                assert!(
                    message.contains("Undefined control sequence"),
                    "unexpected diagnostic: {message}"
                );
            }
            other => panic!("expected Typeset error, got {other:?}"),
        }
    }

    #[test]
    fn bundle_without_entry_fails_construction() {
        let err = QuickJsRuntime::new(&RuntimeSource::from_static("var a = 1;")).unwrap_err();
        assert!(matches!(err, Error::RuntimeInit(_)));
    }

    #[test]
    fn empty_bundle_fails_construction() {
        let err = QuickJsRuntime::new(&RuntimeSource::new()).unwrap_err();
        assert!(matches!(err, Error::RuntimeInit(_)));
    }

    #[test]
    fn broken_bundle_fails_construction() {
        let err = QuickJsRuntime::new(&RuntimeSource::from_static("function (")).unwrap_err();
        assert!(matches!(err, Error::RuntimeInit(_)));
    }
}
