//! Typeset TeX math as SVG with MathJax running in an embedded V8 isolate.
//!
//! The `tex2svg` binary reads `{"src": "...", "config": {...}}` from standard
//! input and writes the SVG markup (or the failure message) to standard output.

mod engine;
mod error;
mod request;
mod shim;
mod telemetry;

pub use engine::{Converter, ENGINE_EMBEDDED};
pub use error::{Error, Result};
pub use request::ConversionRequest;
pub use shim::{run, run_mathjax, Typesetter};
pub use telemetry::init_tracing;
