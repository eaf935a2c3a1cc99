use clap::Parser;
use tracing::instrument;

/// Exit code for command line errors.
const INVOCATION_ERROR: i32 = 255;

#[derive(Parser, Debug)]
#[command(
    name = "ssh-exec",
    version,
    about = "Copy files to a list of remotes over SFTP, as described by a YAML config",
    long_about = "`ssh-exec` reads a YAML config listing remotes and the files to copy to them, then \
visits every remote in order: connect, log in with a password, open an SFTP channel and copy \
the files.

A remote that can not be reached or logged into is reported and skipped. A file that fails to \
copy is reported and the next file is tried.

EXAMPLE:
    # Check what would be done
    ssh-exec -c deploy.yml --dry-run

    # Deploy with progress messages and a summary
    ssh-exec -c deploy.yml -v --summary"
)]
struct Args {
    /// Config file
    #[arg(short = 'c', long = "config", value_name = "PATH", default_value = common::DEFAULT_CONFIG_PATH)]
    config: std::path::PathBuf,

    /// Compile the config and print the plan as JSON, without connecting anywhere
    #[arg(long)]
    dry_run: bool,

    // Progress & output
    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,
}

#[instrument]
fn run_main(args: Args) -> Result<ssh_exec::Summary, ssh_exec::RunError> {
    let config = common::Config::load(&args.config)?;
    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ssh_exec::Summary::default());
    }
    let transport = remote::ssh::SshTransport::new();
    let summary = ssh_exec::Engine::new(&transport).run(&config.remotes, &config.plan)?;
    Ok(summary)
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            if error.use_stderr() {
                // exiting with the usage code matters more than a failed write to stderr
                let _ = error.print();
                std::process::exit(INVOCATION_ERROR);
            }
            // --help and --version
            error.exit();
        }
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: (args.summary || args.verbose > 0) && !args.dry_run,
    };
    if let Err(error) = common::run(output, || run_main(args)) {
        std::process::exit(error.exit_code());
    }
}
