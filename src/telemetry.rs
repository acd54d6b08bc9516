use std::io;

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Logs to stderr, filtered by `RUST_LOG` (default `warn`).
///
/// Events keep their target, so MathJax `console.*` output shows up under
/// `mathjax`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing::subscriber::set_global_default(subscriber(filter, io::stderr));
}

fn subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .finish()
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::engine::Converter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(filter: &str, f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = subscriber(EnvFilter::new(filter), move || writer.clone());
        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    #[test]
    fn events_carry_their_target() {
        let text = capture("info", || {
            tracing::info!(target: "mathjax", "font cache ready");
        });
        assert!(text.contains("mathjax"), "{text}");
        assert!(text.contains("font cache ready"), "{text}");
    }

    #[test]
    fn console_output_is_logged_under_mathjax() {
        let text = capture("mathjax=warn", || {
            Converter::from_module(
                "noisy.js",
                r#"export async function init() {
                    console.warn("missing glyph", 42);
                    console.debug("too quiet");
                    return { tex2svg() { return ""; } };
                }"#,
            )
            .unwrap();
        });
        assert!(text.contains("mathjax"), "{text}");
        assert!(text.contains("missing glyph 42"), "{text}");
        assert!(!text.contains("too quiet"), "{text}");
    }
}
