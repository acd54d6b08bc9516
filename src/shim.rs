use std::io::{self, Read, Write};

use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::Converter;
use crate::error::{Error, Result};
use crate::request::ConversionRequest;

/// Something that turns TeX into serialized SVG markup.
pub trait Typesetter {
    fn tex2svg(&mut self, src: Option<&str>, config: Option<&Value>) -> Result<String>;
}

/// Reads one request from `input` and writes exactly one response to `output`.
///
/// The typesetter is only created once the request has parsed. Parse and
/// conversion failures are answered with their message followed by a newline;
/// markup is written verbatim. Only I/O failures are returned.
pub fn run<R, W, T, F>(mut input: R, mut output: W, init: F) -> io::Result<()>
where
    R: Read,
    W: Write,
    T: Typesetter,
    F: FnOnce() -> Result<T>,
{
    let response = match respond(&mut input, init) {
        Ok(markup) => markup,
        Err(Error::Io(err)) => return Err(err),
        Err(err) => {
            warn!(error = %err, "conversion failed");
            format!("{err}\n")
        }
    };
    output.write_all(response.as_bytes())?;
    output.flush()
}

/// [`run`] backed by the embedded MathJax engine.
pub fn run_mathjax<R: Read, W: Write>(input: R, output: W) -> io::Result<()> {
    run(input, output, Converter::new)
}

fn respond<R, T, F>(input: &mut R, init: F) -> Result<String>
where
    R: Read,
    T: Typesetter,
    F: FnOnce() -> Result<T>,
{
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;
    debug!(bytes = raw.len(), "read request");

    let request = ConversionRequest::from_slice(&raw)?;
    let mut typesetter = init()?;
    let markup = typesetter.tex2svg(request.src.as_deref(), request.config.as_ref())?;
    debug!(bytes = markup.len(), "converted");
    Ok(markup)
}
