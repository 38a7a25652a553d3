use argh::FromArgs;
use cellsh::{Config, Interpreter, logging};
use log::{LevelFilter, info};
use std::path::PathBuf;
use std::process;

#[derive(FromArgs)]
/// A small interactive shell with aliases, redirection, pipes and background jobs.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single line and exit with its status.
    command: Option<String>,

    #[argh(option)]
    /// configuration file merged over the defaults, instead of ~/.config/cellsh/config.toml.
    config: Option<PathBuf>,

    #[argh(switch, short = 'v')]
    /// log at debug level.
    verbose: bool,
}

fn main() {
    let args: Args = argh::from_env();

    let config = Config::load(args.config.as_deref());
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        config.log_level()
    };
    logging::init(level, None);

    let mut sh = Interpreter::default();
    sh.configure(&config);

    if let Some(line) = args.command {
        info!("running {line:?}");
        process::exit(sh.execute_line(&line));
    }

    info!("starting interactive session");
    if let Err(e) = sh.repl() {
        eprintln!("cellsh: {e}");
        process::exit(1);
    }
    process::exit(sh.env().last_status);
}
