//! MathJax hosted in an embedded V8 isolate.
//!
//! The bundle under `js/out/index.js` is an ES module exporting an async
//! `init()`, which resolves to an object with an async `tex2svg(src, config)`
//! returning serialized SVG markup. Both promises are driven to completion by
//! draining the microtask queue; there is no event loop behind the isolate.

use std::sync::Once;

use serde_json::Value;
use tracing::{debug, error, info, warn};
use v8::{Context, Function, Global, Object, OwnedIsolate};

use crate::error::{Error, Result};
use crate::shim::Typesetter;

#[cfg(mathjax_bundle)]
const BUNDLE: Option<&str> = Some(include_str!("../js/out/index.js"));
#[cfg(not(mathjax_bundle))]
const BUNDLE: Option<&str> = None;

/// Whether the MathJax bundle was embedded at build time.
pub const ENGINE_EMBEDDED: bool = BUNDLE.is_some();

static PLATFORM: Once = Once::new();

fn initialize_platform() {
    PLATFORM.call_once(|| {
        let platform = v8::new_default_platform(0, false).make_shared();
        v8::V8::initialize_platform(platform);
        v8::V8::initialize();
    });
}

/// TeX to SVG converter backed by MathJax.
pub struct Converter {
    // Globals are released before the isolate that owns them.
    document: Global<Object>,
    tex2svg: Global<Function>,
    context: Global<Context>,
    isolate: OwnedIsolate,
}

impl Converter {
    /// Loads the embedded MathJax bundle and waits for its `init()`.
    pub fn new() -> Result<Self> {
        match BUNDLE {
            Some(code) => Self::from_module("mathjax.js", code),
            None => Err(Error::Engine(
                "MathJax bundle was not embedded at build time; \
                 run `npm install && npm run build` in js/ and rebuild"
                    .into(),
            )),
        }
    }

    pub(crate) fn from_module(name: &str, code: &str) -> Result<Self> {
        initialize_platform();
        debug!(module = name, bytes = code.len(), "starting MathJax isolate");

        let mut isolate = v8::Isolate::new(Default::default());
        let (context, document, tex2svg) = {
            let handle_scope = &mut v8::HandleScope::new(&mut isolate);
            let context = v8::Context::new(handle_scope);
            let scope = &mut v8::ContextScope::new(handle_scope, context);
            install_console(scope, context)?;

            let scope = &mut v8::TryCatch::new(scope);
            let namespace = load_module(scope, name, code)?;
            let init = member_function(scope, namespace, "init").map_err(Error::Engine)?;
            let pending = init
                .call(scope, namespace.into(), &[])
                .ok_or_else(|| Error::Engine(caught(scope)))?;
            let document = settle(scope, pending)
                .map_err(Error::Engine)?
                .to_object(scope)
                .ok_or_else(|| Error::Engine("MathJax init() did not resolve to an object".into()))?;
            let tex2svg = member_function(scope, document, "tex2svg").map_err(Error::Engine)?;

            (
                Global::new(scope, context),
                Global::new(scope, document),
                Global::new(scope, tex2svg),
            )
        };
        debug!("MathJax initialized");

        Ok(Self {
            document,
            tex2svg,
            context,
            isolate,
        })
    }

    /// Typesets `src` with the per-call MathJax options in `config`.
    ///
    /// Either argument may be absent, in which case MathJax receives
    /// `undefined` for it.
    pub fn tex2svg(&mut self, src: Option<&str>, config: Option<&Value>) -> Result<String> {
        let handle_scope = &mut v8::HandleScope::new(&mut self.isolate);
        let context = v8::Local::new(handle_scope, &self.context);
        let scope = &mut v8::ContextScope::new(handle_scope, context);
        let scope = &mut v8::TryCatch::new(scope);

        let src: v8::Local<v8::Value> = match src {
            Some(src) => v8::String::new(scope, src)
                .ok_or_else(|| Error::Conversion("TeX source is too long".into()))?
                .into(),
            None => v8::undefined(scope).into(),
        };
        let config: v8::Local<v8::Value> = match config {
            Some(config) => {
                let json = v8::String::new(scope, &config.to_string())
                    .ok_or_else(|| Error::Conversion("config is too long".into()))?;
                v8::json::parse(scope, json).ok_or_else(|| Error::Conversion(caught(scope)))?
            }
            None => v8::undefined(scope).into(),
        };

        let document = v8::Local::new(scope, &self.document);
        let tex2svg = v8::Local::new(scope, &self.tex2svg);
        let pending = tex2svg
            .call(scope, document.into(), &[src, config])
            .ok_or_else(|| Error::Conversion(caught(scope)))?;
        let markup = settle(scope, pending).map_err(Error::Conversion)?;
        Ok(markup.to_rust_string_lossy(scope))
    }

    /// Convert a math string to Svg
    pub fn convert_to_svg(&mut self, latex: impl AsRef<str>) -> Result<String> {
        self.tex2svg(Some(latex.as_ref()), None)
    }
}

impl Typesetter for Converter {
    fn tex2svg(&mut self, src: Option<&str>, config: Option<&Value>) -> Result<String> {
        Converter::tex2svg(self, src, config)
    }
}

fn create_origin<'s>(
    scope: &mut v8::HandleScope<'s>,
    filename: &str,
    is_module: bool,
) -> Option<v8::ScriptOrigin<'s>> {
    let name: v8::Local<'s, v8::Value> = v8::String::new(scope, filename)?.into();
    Some(v8::ScriptOrigin::new(
        scope, name, 0, 0, false, 0, name, false, false, is_module,
    ))
}

// The bundle is self-contained: any import is unresolvable.
fn module_callback<'s>(
    _context: v8::Local<'s, v8::Context>,
    _name: v8::Local<'s, v8::String>,
    _arr: v8::Local<'s, v8::FixedArray>,
    _referrer: v8::Local<'s, v8::Module>,
) -> Option<v8::Local<'s, v8::Module>> {
    None
}

fn load_module<'s>(
    scope: &mut v8::TryCatch<v8::HandleScope<'s>>,
    name: &str,
    code: &str,
) -> Result<v8::Local<'s, Object>> {
    let source = v8::String::new(scope, code)
        .ok_or_else(|| Error::Engine(format!("{name} is too large to load")))?;
    let origin = create_origin(scope, name, true)
        .ok_or_else(|| Error::Engine(format!("invalid module name {name:?}")))?;
    let source = v8::script_compiler::Source::new(source, Some(&origin));
    let module = v8::script_compiler::compile_module(scope, source)
        .ok_or_else(|| Error::Engine(caught(scope)))?;

    module
        .instantiate_module(scope, module_callback)
        .filter(|instantiated| *instantiated)
        .ok_or_else(|| Error::Engine(caught(scope)))?;
    let evaluated = module
        .evaluate(scope)
        .ok_or_else(|| Error::Engine(caught(scope)))?;
    settle(scope, evaluated).map_err(Error::Engine)?;

    module
        .get_module_namespace()
        .to_object(scope)
        .ok_or_else(|| Error::Engine(format!("{name} has no module namespace")))
}

fn member_function<'s>(
    scope: &mut v8::HandleScope<'s>,
    object: v8::Local<'s, Object>,
    name: &str,
) -> std::result::Result<v8::Local<'s, Function>, String> {
    v8::String::new(scope, name)
        .and_then(|key| object.get(scope, key.into()))
        .and_then(|value| v8::Local::<Function>::try_from(value).ok())
        .ok_or_else(|| format!("MathJax bundle does not provide a `{name}` function"))
}

/// Waits for `value` if it is a promise.
///
/// Returns the fulfilled value, or the rejection message.
fn settle<'s>(
    scope: &mut v8::HandleScope<'s>,
    value: v8::Local<'s, v8::Value>,
) -> std::result::Result<v8::Local<'s, v8::Value>, String> {
    let Ok(promise) = v8::Local::<v8::Promise>::try_from(value) else {
        return Ok(value);
    };
    if matches!(promise.state(), v8::PromiseState::Pending) {
        scope.perform_microtask_checkpoint();
    }
    match promise.state() {
        v8::PromiseState::Fulfilled => Ok(promise.result(scope)),
        v8::PromiseState::Rejected => {
            let reason = promise.result(scope);
            Err(message_of(scope, reason))
        }
        v8::PromiseState::Pending => {
            Err("MathJax is waiting on work that can never complete in this isolate".into())
        }
    }
}

/// Message of the exception currently held by `scope`.
fn caught(scope: &mut v8::TryCatch<v8::HandleScope>) -> String {
    match scope.exception() {
        Some(exception) => message_of(scope, exception),
        None => "JavaScript execution was terminated".into(),
    }
}

/// `err.message` when it is a string, otherwise `String(err)`.
fn message_of<'s>(scope: &mut v8::HandleScope<'s>, value: v8::Local<'s, v8::Value>) -> String {
    let message = v8::String::new(scope, "message")
        .zip(value.to_object(scope))
        .and_then(|(key, object)| object.get(scope, key.into()))
        .filter(|message| message.is_string());
    message.unwrap_or(value).to_rust_string_lossy(scope)
}

fn install_console(scope: &mut v8::HandleScope, context: v8::Local<Context>) -> Result<()> {
    let console = v8::Object::new(scope);
    let bound = [
        ("log", v8::Function::new(scope, console_info)),
        ("info", v8::Function::new(scope, console_info)),
        ("debug", v8::Function::new(scope, console_debug)),
        ("warn", v8::Function::new(scope, console_warn)),
        ("error", v8::Function::new(scope, console_error)),
    ];
    for (name, function) in bound {
        let key = v8::String::new(scope, name);
        key.zip(function)
            .and_then(|(key, function)| console.set(scope, key.into(), function.into()))
            .ok_or_else(|| Error::Engine(format!("could not install console.{name}")))?;
    }

    let key = v8::String::new(scope, "console")
        .ok_or_else(|| Error::Engine("could not install console".into()))?;
    context
        .global(scope)
        .set(scope, key.into(), console.into())
        .ok_or_else(|| Error::Engine("could not install console".into()))?;
    Ok(())
}

fn console_line(scope: &mut v8::HandleScope, args: &v8::FunctionCallbackArguments) -> String {
    (0..args.length())
        .map(|i| args.get(i).to_rust_string_lossy(scope))
        .collect::<Vec<_>>()
        .join(" ")
}

fn console_debug(
    scope: &mut v8::HandleScope,
    args: v8::FunctionCallbackArguments,
    _rv: v8::ReturnValue,
) {
    debug!(target: "mathjax", "{}", console_line(scope, &args));
}

fn console_info(
    scope: &mut v8::HandleScope,
    args: v8::FunctionCallbackArguments,
    _rv: v8::ReturnValue,
) {
    info!(target: "mathjax", "{}", console_line(scope, &args));
}

fn console_warn(
    scope: &mut v8::HandleScope,
    args: v8::FunctionCallbackArguments,
    _rv: v8::ReturnValue,
) {
    warn!(target: "mathjax", "{}", console_line(scope, &args));
}

fn console_error(
    scope: &mut v8::HandleScope,
    args: v8::FunctionCallbackArguments,
    _rv: v8::ReturnValue,
) {
    error!(target: "mathjax", "{}", console_line(scope, &args));
}
