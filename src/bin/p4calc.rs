//! Interactive P4calc client.
//!
//! ```text
//! p4calc --iface veth0 run                 # prompt loop, `quit` exits
//! p4calc --topology cascade send 17        # single request
//! p4calc show f0f0                         # print the request without sending
//! p4calc tokenize "12 + 7"
//! ```
//!
//! Single-stage input is the `data` value in hex; cascade input is `input_data` in decimal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use p4calc::dump::{format_binary, hexdump, show, show_frame};
use p4calc::exchange::{Exchange, ExchangeConfig, ExchangeError, DEFAULT_PEER};
use p4calc::link::Link;
use p4calc::{fields, tokenize, Dispatcher, Fields, MacAddr, Topology, Value};
use std::io::{self, BufRead, Write};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "p4calc", version, about = "P4calc Ethernet calculator client")]
struct Cli {
    /// Network interface to send and receive on.
    #[arg(long, env = "P4CALC_IFACE", default_value = "eth0", global = true)]
    iface: String,

    /// Link address of the processing element.
    #[arg(long, env = "P4CALC_PEER", default_value_t = DEFAULT_PEER, global = true)]
    peer: MacAddr,

    /// Source link address; defaults to the interface's own.
    #[arg(long, global = true)]
    source: Option<MacAddr>,

    /// Reply timeout in milliseconds.
    #[arg(long, env = "P4CALC_TIMEOUT_MS", default_value_t = 1000, global = true)]
    timeout_ms: u64,

    /// Deployment topology selecting the packet schema.
    #[arg(long, default_value_t = Topology::SingleStage, global = true)]
    topology: Topology,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read values from stdin, one request per line.
    Run,
    /// Send one request.
    Send { value: String },
    /// Print the request frame for a value without sending it.
    Show { value: String },
    /// Tokenize an arithmetic expression.
    Tokenize { expr: String },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn init_logging(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level.as_filter())
        .with_target(false)
        .try_init();
}

/// Request fields for one line of user input.
fn request_values(topology: Topology, input: &str) -> Result<Fields> {
    let input = input.trim();
    match topology {
        Topology::SingleStage => {
            let hex = input.trim_start_matches("0x").trim_start_matches("0X");
            let data = u64::from_str_radix(hex, 16)
                .with_context(|| format!("invalid hex value {:?}", input))?;
            let mut values = fields([("data", data)]);
            values.insert("max_pool_index".into(), Value::U32(0));
            Ok(values)
        }
        Topology::Cascade => {
            let data: u64 = input
                .parse()
                .with_context(|| format!("invalid decimal value {:?}", input))?;
            let mut values = fields([("switch1_max_pool_index", 0x0eu32), ("switch1_replication", 3)]);
            values.insert("input_data".into(), Value::U64(data));
            Ok(values)
        }
    }
}

fn config(cli: &Cli) -> ExchangeConfig {
    ExchangeConfig {
        interface: cli.iface.clone(),
        peer: cli.peer,
        source: cli.source.unwrap_or_default(),
        timeout: Duration::from_millis(cli.timeout_ms),
    }
}

#[cfg(target_os = "linux")]
fn open(cli: &Cli) -> Result<Exchange<p4calc::link::RawSocket>> {
    Exchange::open(config(cli), Dispatcher::for_topology(cli.topology))
        .with_context(|| format!("opening raw socket on {}", cli.iface))
}

#[cfg(not(target_os = "linux"))]
fn open(_cli: &Cli) -> Result<Exchange<p4calc::Loopback>> {
    anyhow::bail!("raw ethernet access is only supported on Linux")
}

/// Run one request and print the outcome. Exchange failures are reported, not returned.
fn exchange_once<L: Link>(ex: &mut Exchange<L>, topology: Topology, input: &str) -> Result<()> {
    let values = request_values(topology, input)?;
    let schema = ex.dispatcher().schema().clone();
    if topology == Topology::Cascade {
        if let Some(v) = values.get("input_data").and_then(Value::as_u64) {
            println!("{:016x}", v);
        }
    }
    print!("{}", show(&schema, &values));
    match ex.request(&values) {
        Ok(reply) => {
            print!("{}", show_frame(&reply.frame, &schema, &reply.fields));
            match reply.res {
                Some(res) => {
                    println!("res = {:#x}", res);
                    println!("{} {}", format_binary(res), input.trim());
                }
                None => println!("reply carries no res field"),
            }
        }
        Err(ExchangeError::Timeout(_)) => println!("Didn't receive response"),
        Err(ExchangeError::NoMatch { .. }) => println!("cannot find P4calc header in the packet"),
        Err(e) => println!("e-> {}", e),
    }
    Ok(())
}

fn run_loop<L: Link>(ex: &mut Exchange<L>, topology: Topology) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let line = line.trim();
        if line == "quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        if let Err(e) = exchange_once(ex, topology, line) {
            println!("e-> {:#}", e);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match &cli.command {
        Command::Tokenize { expr } => {
            let tokens = tokenize(expr)?;
            for t in tokens {
                println!("{}", t);
            }
        }
        Command::Show { value } => {
            let dispatcher = Dispatcher::for_topology(cli.topology);
            let values = request_values(cli.topology, value)?;
            let cfg = config(&cli);
            let frame = dispatcher.wrap(cfg.peer, cfg.source, &values)?;
            print!("{}", show_frame(&frame, dispatcher.schema(), &values));
            print!("{}", hexdump(&frame.to_bytes()));
        }
        Command::Send { value } => {
            let mut ex = open(&cli)?;
            exchange_once(&mut ex, cli.topology, value)?;
        }
        Command::Run => {
            let mut ex = open(&cli)?;
            run_loop(&mut ex, cli.topology)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "p4calc",
            "send",
            "17",
            "--topology",
            "cascade",
            "--peer",
            "02:00:00:00:00:09",
        ])
        .expect("args should parse");
        assert_eq!(cli.topology, Topology::Cascade);
        assert_eq!(cli.peer, MacAddr([2, 0, 0, 0, 0, 9]));
        assert!(matches!(cli.command, Command::Send { ref value } if value == "17"));
    }

    #[test]
    fn rejects_bad_peer() {
        let err = Cli::try_parse_from(["p4calc", "--peer", "nope", "run"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn single_stage_input_is_hex() {
        let v = request_values(Topology::SingleStage, "0xff").unwrap();
        assert_eq!(v.get("data"), Some(&Value::U64(0xff)));
        assert!(request_values(Topology::SingleStage, "zz").is_err());
    }

    #[test]
    fn cascade_input_is_decimal() {
        let v = request_values(Topology::Cascade, "17").unwrap();
        assert_eq!(v.get("input_data"), Some(&Value::U64(17)));
        assert_eq!(v.get("switch1_max_pool_index"), Some(&Value::U32(0x0e)));
        assert!(request_values(Topology::Cascade, "ff").is_err());
    }

    #[test]
    fn exchange_once_reports_timeout_without_error() {
        let mut ex = Exchange::new(
            p4calc::Loopback::new(),
            ExchangeConfig::default(),
            Dispatcher::for_topology(Topology::SingleStage),
        );
        exchange_once(&mut ex, Topology::SingleStage, "11").unwrap();
        assert_eq!(ex.link().sent().len(), 1);
    }
}
