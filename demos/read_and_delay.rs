use std::path::PathBuf;

use clap::Parser;
use deferred::diagnostics::{Diagnostics, TracingSink};
use deferred::io::{self, Encoding};
use deferred::{runtime, time};
use tracing_subscriber::EnvFilter;

/// Read a file, wait, then print it without vowels.
///
/// Every step is chained onto a deferred value; the chain only makes
/// progress while the reactor runs.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The file to read
    #[arg(default_value = file!())]
    path: PathBuf,

    /// How long to wait before printing
    #[arg(long, default_value = "2s", value_name = "DURATION")]
    delay: humantime::Duration,
}

fn strip_vowels(text: &str) -> String {
    text.chars().filter(|c| !"aeiou".contains(*c)).collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("deferred=info".parse()?))
        .init();

    let args = Args::parse();
    let delay = *args.delay;

    let sink = TracingSink;
    let _done = io::read_all(&args.path, Encoding::Utf8)
        .and_then(move |text| {
            sink.record(&format!("{} characters read", text.chars().count()));
            time::after(delay, strip_vowels(&text))
        })
        .then(move |text| {
            sink.record(&text.chars().take(200).collect::<String>());
            Ok(())
        })
        .catch(move |reason| {
            sink.record("An error occurred");
            sink.record(&reason.to_string());
            Ok(())
        })
        .finally(move || {
            sink.record("All done!");
            Ok(())
        });

    runtime::run();
    Ok(())
}
