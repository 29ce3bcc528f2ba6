//! motorcord - discover and renumber sensorimotor boards on the RS485 bus.
//!
//! Without `--board` the tool sweeps the whole address space and lists
//! every board that answers. With `--board` it pings that address, and
//! with `--new-id` as well it reassigns the board after checking that the
//! target address is free.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use motorcord_core::discovery::CancelToken;
use motorcord_core::protocol::{
    list_ports, BusClient, BusConfig, SerialChannel, DEFAULT_BAUD_RATE,
};
use motorcord_core::reassign::{reassign, ReassignError};

#[derive(Parser)]
#[command(name = "motorcord")]
#[command(about = "Discover and renumber sensorimotor boards on a shared RS485 bus")]
#[command(version)]
struct Cli {
    /// Serial port the bus adapter is attached to
    #[arg(short, long, default_value = "/dev/ttyUSB1")]
    port: String,

    /// Baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Board address to ping (0-127); sweeps the whole bus when omitted
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(..=127))]
    board: Option<u8>,

    /// New address to assign to the board (0-127, requires --board)
    #[arg(short, long, requires = "board", value_parser = clap::value_parser!(u8).range(..=127))]
    new_id: Option<u8>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.list_ports {
        for port in list_ports() {
            match port.product {
                Some(product) => println!("{}  ({})", port.name, product),
                None => println!("{}", port.name),
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = BusConfig {
        port_name: cli.port.clone(),
        baud_rate: cli.baud,
        ..Default::default()
    };
    let mut client =
        BusClient::open(&config).with_context(|| format!("opening bus on {}", cli.port))?;
    println!("Connected to {} at {} baud.", cli.port, cli.baud);

    match (cli.board, cli.new_id) {
        (Some(board), None) => {
            println!("Sending ping to board {board}.");
            if client.ping(board)? {
                println!("Board {board} responded.");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("No response.");
                Ok(ExitCode::FAILURE)
            }
        }
        (Some(board), Some(new_id)) => match reassign(&mut client, board, new_id) {
            Ok(()) => {
                println!("Successfully set board id from {board} to {new_id}.");
                Ok(ExitCode::SUCCESS)
            }
            Err(e @ ReassignError::Protocol(_)) => Err(e.into()),
            Err(e) => {
                println!("Setting board id failed: {e}.");
                Ok(ExitCode::FAILURE)
            }
        },
        (None, _) => sweep(&mut client),
    }
}

fn sweep(client: &mut BusClient<SerialChannel>) -> anyhow::Result<ExitCode> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("installing Ctrl-C handler")?;

    println!("Searching for connected boards (Ctrl-C to abort)...");
    let mut found = 0usize;
    let sweep = client.sweep(cancel.clone()).with_progress(|address| {
        print!("\r{address}");
        let _ = io::stdout().flush();
    });
    for result in sweep {
        let address = result?;
        println!("\rboard {address} responded.");
        found += 1;
    }
    if cancel.is_cancelled() {
        println!("\rAborted.");
    }
    println!("\r{found} board(s) detected.");
    Ok(ExitCode::SUCCESS)
}
