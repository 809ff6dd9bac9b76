//! tend CLI application.

use tend::cli::{self, EXIT_OK, exit_code_for, render_error};
use tend::commands;
use tend::logging::{EventOutput, LogFormat, LoggingConfig, init_logging};
use tokio_util::sync::CancellationToken;

fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    #[allow(clippy::print_stderr)]
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("tend panicked: {panic_info}");
    }));

    let exit_code = run_with_tokio();
    std::process::exit(exit_code);
}

/// Create tokio runtime and run async path
fn run_with_tokio() -> i32 {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            // NOTE: Using eprintln! here is intentional - tracing/event system
            // is not yet initialized at this point in startup.
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            }
            return 1;
        }
    };

    rt.block_on(run())
}

async fn run() -> i32 {
    let cli = cli::parse();

    let logging = LoggingConfig {
        level: cli.level,
        format: if cli.json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        events: if cli.json {
            EventOutput::Json
        } else {
            EventOutput::Cli {
                verbose: cli.verbose,
            }
        },
    };
    // Ignore error if tracing already initialized
    let _ = init_logging(&logging);

    // Ctrl-C cancels the run; the runner stops the current task and reports it
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping");
            on_interrupt.cancel();
        }
    });

    let result = commands::execute(&cli, &cancel).await;
    signal_task.abort();

    match result {
        Ok(()) => EXIT_OK,
        Err(err) => {
            let err = err.or_cancelled(cancel.is_cancelled());
            render_error(&err, cli.json);
            exit_code_for(&err)
        }
    }
}
