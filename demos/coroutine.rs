use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use deferred::coroutine::{self, Computation, Step};
use deferred::diagnostics::{Diagnostics, TracingSink};
use deferred::io::{self, Encoding};
use deferred::time::{self, Duration};
use deferred::Error;
use tracing_subscriber::EnvFilter;

/// Read a file, wait, then print it without vowels, written as a
/// computation that suspends on each deferred value.
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

enum Stage {
    Reading,
    Waiting,
}

struct ReadAndDelay<D> {
    path: PathBuf,
    delay: Duration,
    stage: Stage,
    sink: D,
}

impl<D: Diagnostics> ReadAndDelay<D> {
    fn finish(&self) -> Step<String, ()> {
        self.sink.record("---All done!---");
        Step::Done(Ok(()))
    }
}

impl<D: Diagnostics + 'static> Computation for ReadAndDelay<D> {
    type Awaited = String;
    type Output = ();

    fn start(&mut self) -> Step<String, ()> {
        self.stage = Stage::Reading;
        Step::Suspend(io::read_all(&self.path, Encoding::Utf8).into())
    }

    fn resume(&mut self, text: String) -> Step<String, ()> {
        match self.stage {
            Stage::Reading => {
                self.sink.record(&format!("{} characters read", text.chars().count()));
                self.stage = Stage::Waiting;
                let stripped: String = text.chars().filter(|c| !"aeiou".contains(*c)).collect();
                Step::Suspend(time::after(self.delay, stripped).into())
            }
            Stage::Waiting => {
                self.sink.record(&text.chars().take(200).collect::<String>());
                self.finish()
            }
        }
    }

    fn resume_with_failure(&mut self, reason: Error) -> Step<String, ()> {
        self.sink.record("An error occurred!");
        self.sink.record(&reason.to_string());
        self.finish()
    }
}

#[deferred::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("deferred=info".parse()?))
        .init();

    let args = Args::parse();
    coroutine::run_with(
        |args: Args| ReadAndDelay {
            path: args.path,
            delay: *args.delay,
            stage: Stage::Reading,
            sink: TracingSink,
        },
        args,
    )
    .await?;
    Ok(())
}
