// CLI modules
mod args;
mod client;
mod config;
mod op;
mod ops;
mod path;
mod progress;

use clap::{Parser, Subcommand};

use args::Args;
use op::Op;
use ops::{Delete, Get, List, Mkdir, Move, Put, Sync};

command_enum! {
    (List, List),
    (Get, Get),
    (Put, Put),
    (Delete, Delete),
    (Mkdir, Mkdir),
    (Move, Move),
    (Sync, Sync),
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.parse().expect("static directive"))
        .from_env_lossy();

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("ERROR: {}", message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let conf_path = match args.conf.clone().or_else(config::default_path) {
        Some(path) => path,
        None => fail("cannot determine home directory for the config file"),
    };
    let mut cfg = match config::Config::load(&conf_path) {
        Ok(cfg) => cfg,
        Err(e) => fail(e),
    };
    cfg.recursive = args.recursive;
    cfg.force = args.force;
    cfg.verbose = args.verbose;
    cfg.skip_same_size = args.skip_same_size;
    cfg.skip_error = args.skip_error;

    let ctx = match op::OpContext::new(cfg) {
        Ok(ctx) => ctx,
        Err(e) => fail(e),
    };

    if let Err(e) = ctx.client.login().await {
        fail(format!(
            "login failed, please verify username and password ({})",
            e
        ));
    }

    match args.command.execute(&ctx).await {
        Ok(output) => {
            let output = output.to_string();
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => fail(e),
    }
}
