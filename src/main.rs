use std::io;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    tex2svg::init_tracing();
    tex2svg::run_mathjax(io::stdin().lock(), io::stdout().lock())
        .context("tex2svg: could not exchange the request over stdio")
}
