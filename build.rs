use std::path::Path;
use std::process::Command;

const BUNDLE: &str = "js/out/index.js";

fn main() {
    println!("cargo:rerun-if-changed={BUNDLE}");
    println!("cargo:rerun-if-changed=js/src");
    println!("cargo:rerun-if-changed=js/package.json");
    println!("cargo:rustc-check-cfg=cfg(mathjax_bundle)");

    let bundle = Path::new(BUNDLE);
    if !bundle.exists() && std::env::var_os("CARGO_FEATURE_BUILD_JS").is_some() {
        build_bundle();
    }

    if bundle.exists() {
        println!("cargo:rustc-cfg=mathjax_bundle");
    } else {
        println!(
            "cargo:warning={BUNDLE} not found; tex2svg will report a missing engine at runtime \
             (run `npm install && npm run build` in js/ with network access)"
        );
    }
}

const INSTALL: &[&str] = &[
    "install",
    "--no-audit",
    "--no-fund",
    "--fetch-retries=1",
    "--fetch-timeout=60000",
];
const BUILD: &[&str] = &["run", "build"];

fn build_bundle() {
    for args in [INSTALL, BUILD] {
        match Command::new(npm()).args(args).current_dir("js").status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                println!("cargo:warning=npm {} exited with {status}", args.join(" "));
                return;
            }
            Err(err) => {
                println!("cargo:warning=could not run npm: {err}");
                return;
            }
        }
    }
}

fn npm() -> &'static str {
    if cfg!(windows) {
        "npm.cmd"
    } else {
        "npm"
    }
}
