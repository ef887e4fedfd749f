use anyhow::Result;
use binboot::commands::{self, Options};
use binboot::error::exit_code_for;
use binboot::runtime::RealRuntime;
use clap::Parser;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

const BIN_NAME: &str = "binboot";

/// binboot - run a native binary published as a release artifact
///
/// The package manifest names the release repository and version. The
/// matching archive for this host is downloaded once, cached under the
/// install root, and executed with the given arguments.
///
/// Copied or linked under any other name, binboot acts as that program and
/// forwards every argument to it.
///
/// If the GITHUB_TOKEN environment variable is set, it is used for downloads
/// from github.com. BINBOOT_VERSION overrides the manifest version.
///
/// Examples:
///   binboot install              # Download the binary for this host
///   binboot run --help           # Run it; --help goes to the binary
#[derive(Parser, Debug)]
#[command(author, version = env!("BINBOOT_BUILD_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (defaults to the user cache directory)
    #[arg(long = "root", short = 'r', env = "BINBOOT_ROOT", value_name = "PATH")]
    pub install_root: Option<PathBuf>,

    /// Package manifest (defaults to package.json next to the executable)
    #[arg(long, env = "BINBOOT_MANIFEST", value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Release host overriding the manifest, e.g. a mirror
    #[arg(long, env = "BINBOOT_HOST", value_name = "URL")]
    pub host: Option<String>,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            install_root: self.install_root.clone(),
            manifest: self.manifest.clone(),
            host: self.host.clone(),
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download and unpack the binary for this host if it is missing
    Install,

    /// Run the binary, installing it first if needed
    Run(RunArgs),

    /// Print the path of the installed binary, installing it first if needed
    Path,

    /// Remove every installed version of the package
    Uninstall,
}

#[derive(clap::Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Arguments passed to the binary unchanged
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<OsString>,
}

/// Any name other than `binboot` means we stand in for the package's command.
fn is_proxy_invocation(argv0: &OsStr) -> bool {
    Path::new(argv0)
        .file_stem()
        .and_then(OsStr::to_str)
        .is_some_and(|stem| !stem.eq_ignore_ascii_case(BIN_NAME))
}

async fn dispatch(cli: Cli) -> Result<i32> {
    let runtime = RealRuntime;
    let options = cli.options();

    match cli.command {
        Commands::Install => {
            commands::install(runtime, options).await?;
            Ok(0)
        }
        Commands::Run(args) => commands::run(runtime, options, args.args).await,
        Commands::Path => {
            commands::path(runtime, options).await?;
            Ok(0)
        }
        Commands::Uninstall => {
            commands::uninstall(runtime, options)?;
            Ok(0)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args = std::env::args_os();
    let argv0 = args.next().unwrap_or_else(|| OsString::from(BIN_NAME));

    let result = if is_proxy_invocation(&argv0) {
        let runtime = RealRuntime;
        let options = Options::from_env(&runtime);
        commands::run(runtime, options, args.collect()).await
    } else {
        dispatch(Cli::parse()).await
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", BIN_NAME, e);
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
