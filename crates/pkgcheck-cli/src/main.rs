mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_PLAN_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pkgcheck",
    version,
    about = "Build, validate, and install a Python package in throwaway environments"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the project into a wheel, validate and install it, then run probes.
    Check {
        /// Project directory containing pyproject.toml or setup.py.
        #[arg(default_value = ".")]
        project: PathBuf,
        /// Check plan file (defaults to <PROJECT>/pkgcheck.toml when present).
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Python code to run in the installed environment (repeatable).
        #[arg(long = "python", value_name = "CODE")]
        python: Vec<String>,
        /// Shell code to run with the installed environment activated (repeatable).
        #[arg(long = "shell", value_name = "CODE")]
        shell: Vec<String>,
        /// Exit code expected from each --shell snippet.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        expect_exit: i32,
        /// Require the marker file (py.typed by default) next to MODULE (repeatable).
        #[arg(long = "require-marker", value_name = "MODULE")]
        require_marker: Vec<String>,
    },
    /// Run diagnostic checks on the host.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PKGCHECK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    pkgcheck_runtime::terminal::narrate_to_stderr(json_output);

    let needs_python = matches!(cli.command, Commands::Check { .. })
        && pkgcheck_core::configured_provisioner() != "stub";
    if needs_python && std::env::var("PKGCHECK_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = pkgcheck_runtime::check_prereqs();
        if !missing.is_empty() {
            eprintln!("error: {}", pkgcheck_runtime::format_missing(&missing));
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let result = match cli.command {
        Commands::Check {
            project,
            plan,
            python,
            shell,
            expect_exit,
            require_marker,
        } => commands::check::run(&commands::check::CheckArgs {
            project: &project,
            plan: plan.as_deref(),
            python: &python,
            shell: &shell,
            expect_exit,
            require_marker: &require_marker,
            json: json_output,
        }),
        Commands::Doctor => commands::doctor::run(json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with(commands::PLAN_ERROR_PREFIX) {
                EXIT_PLAN_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
