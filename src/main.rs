mod addr;
mod craft;
mod error;
mod iface;
mod inject;
mod packet;
mod sender;
mod util;

use colored::*;

use clap::{App, AppSettings, Arg, ArgMatches};

use rand::rngs::StdRng;
use rand::SeedableRng;

use std::io::{self, Write};
use std::net::IpAddr;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use addr::{Ipv4Address, MacAddress};
use craft::{Endpoints, FrameReport};
use error::{Error, Result};
use inject::{ErrorPolicy, ErrorRates};
use sender::{HexDump, RawLinkSocket, Transmit};

struct Settings {
    interface: String,
    endpoints: Endpoints,
    rates: ErrorRates,
    count: u32,
    delay: Duration,
    seed: Option<u64>,
    dry_run: bool,
}

#[derive(Default)]
struct Statistics {
    sent: u32,
    failed: u32,
    bad_fcs: u32,
    bad_ip: u32,
    bad_icmp: u32,
}

impl Statistics {
    fn record(&mut self, report: &FrameReport) {
        self.sent += 1;
        self.bad_fcs += report.bad_fcs as u32;
        self.bad_ip += report.bad_ip as u32;
        self.bad_icmp += report.bad_icmp as u32;
    }
}

fn validate_probability(v: String) -> std::result::Result<(), String> {
    match v.parse::<f64>() {
        Ok(p) if (0.0..=1.0).contains(&p) => Ok(()),
        _ => Err(format!("{} is not a probability between 0.0 and 1.0", v)),
    }
}

fn validate_delay(v: String) -> std::result::Result<(), String> {
    parse_delay(&v)
        .map(|_| ())
        .ok_or_else(|| format!("invalid delay {} (ex: 1.0, 0.25, 400ms, 2s)", v))
}

fn validate_count(v: String) -> std::result::Result<(), String> {
    v.parse::<u32>().map(|_| ()).map_err(|e| format!("{}: {}", v, e))
}

fn validate_seed(v: String) -> std::result::Result<(), String> {
    v.parse::<u64>().map(|_| ()).map_err(|e| format!("{}: {}", v, e))
}

const MAX_DELAY_SECS: f64 = 86_400.0;

/// Plain seconds (`0.5`) or a humantime duration (`500ms`).
fn parse_delay(text: &str) -> Option<Duration> {
    match text.parse::<f64>() {
        Ok(secs) if (0.0..MAX_DELAY_SECS).contains(&secs) => Some(Duration::from_secs_f64(secs)),
        Ok(_) => None,
        Err(_) => humantime::parse_duration(text).ok(),
    }
}

fn app() -> App<'static, 'static> {
    App::new("badping")
        .setting(AppSettings::ColoredHelp)
        .version("v0.1")
        .about("Generate Ethernet/IPv4/ICMP echo frames with deliberately bad checksums.\nFrame, IP and ICMP checksums are each replaced by a random value with the given probability.")
        .arg(Arg::with_name("src-mac")
            .help("Source MAC address (e.g., 01:02:03:04:05:06), defaults to the interface's")
            .long("src-mac")
            .takes_value(true))
        .arg(Arg::with_name("dst-mac")
            .help("Destination MAC address (e.g., 01:02:03:04:05:06)")
            .long("dst-mac")
            .required(true)
            .takes_value(true))
        .arg(Arg::with_name("src-ipv4")
            .help("Source IPv4 address (e.g., 192.168.1.1), defaults to the interface's")
            .long("src-ipv4")
            .takes_value(true))
        .arg(Arg::with_name("dst-ipv4")
            .help("Destination IPv4 address (e.g., 192.168.1.2)")
            .long("dst-ipv4")
            .required(true)
            .takes_value(true))
        .arg(Arg::with_name("interface")
            .help("Ethernet interface (e.g., eth0, eth1)")
            .short("i")
            .long("interface")
            .required(true)
            .takes_value(true))
        .arg(Arg::with_name("delay")
            .help("Interpacket delay in seconds or as a duration (Default 1.0)")
            .long("delay")
            .takes_value(true)
            .validator(validate_delay))
        .arg(Arg::with_name("count")
            .help("How many packets to send (Default 4)")
            .short("c")
            .long("count")
            .takes_value(true)
            .validator(validate_count))
        .arg(Arg::with_name("frame-error")
            .help("Probability of a frame checksum error (Default 0.0)")
            .long("frame-error")
            .takes_value(true)
            .validator(validate_probability))
        .arg(Arg::with_name("ip-error")
            .help("Probability of an IP checksum error (Default 0.0)")
            .long("ip-error")
            .takes_value(true)
            .validator(validate_probability))
        .arg(Arg::with_name("icmp-error")
            .help("Probability of an ICMP checksum error (Default 0.0)")
            .long("icmp-error")
            .takes_value(true)
            .validator(validate_probability))
        .arg(Arg::with_name("seed")
            .help("Seed the random generator for a reproducible run")
            .long("seed")
            .takes_value(true)
            .validator(validate_seed))
        .arg(Arg::with_name("dry-run")
            .help("Print frames as hex instead of sending them (no root needed)")
            .long("dry-run"))
        .arg(Arg::with_name("verbose")
            .help("Increase log verbosity (-v, -vv, -vvv)")
            .short("v")
            .multiple(true))
}

fn error_rate(matches: &ArgMatches, name: &str) -> Result<ErrorPolicy> {
    let p = matches.value_of(name).unwrap_or("0.0");
    ErrorPolicy::new(p.parse().map_err(|_| Error::Probability(f64::NAN))?)
}

fn settings(matches: &ArgMatches) -> Result<Settings> {
    // clap enforces presence of required args
    let interface = matches.value_of("interface").unwrap_or_default().to_string();
    let destination_mac: MacAddress = matches.value_of("dst-mac").unwrap_or_default().parse()?;
    let destination_ip: Ipv4Address = matches.value_of("dst-ipv4").unwrap_or_default().parse()?;

    let source_mac = match matches.value_of("src-mac") {
        Some(mac) => mac.parse()?,
        None => iface::mac_address(&interface)?,
    };
    let source_ip = match matches.value_of("src-ipv4") {
        Some(ip) => ip.parse()?,
        None => iface::ipv4_address(&interface)?,
    };

    let rates = ErrorRates {
        frame: error_rate(matches, "frame-error")?,
        ip: error_rate(matches, "ip-error")?,
        icmp: error_rate(matches, "icmp-error")?,
    };

    let delay = matches.value_of("delay").and_then(parse_delay).unwrap_or(Duration::from_secs(1));
    let count = matches.value_of("count").and_then(|c| c.parse().ok()).unwrap_or(4);
    let seed = matches.value_of("seed").and_then(|s| s.parse().ok());

    Ok(Settings {
        interface,
        endpoints: Endpoints { source_mac, destination_mac, source_ip, destination_ip },
        rates,
        count,
        delay,
        seed,
        dry_run: matches.is_present("dry-run"),
    })
}

fn run(settings: &Settings, running: &AtomicBool) -> Result<Statistics> {
    let mut sink: Box<dyn Transmit> = if settings.dry_run {
        Box::new(HexDump::new(io::stdout()))
    } else {
        if !iface::is_root() {
            return Err(Error::NotRoot);
        }
        let ifindex = iface::if_nametoindex(&settings.interface)?;
        debug!(interface = %settings.interface, ifindex, "binding raw link socket");
        Box::new(RawLinkSocket::bind(ifindex)?)
    };

    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let ep = &settings.endpoints;
    let hostname = dns_lookup::lookup_addr(&IpAddr::V4(ep.destination_ip.into())).ok();
    println!("{} {} ({} {}) from {} ({}) via {}",
        "BADPING".cyan(), hostname.as_deref().unwrap_or("-").bold(), ep.destination_ip, ep.destination_mac,
        ep.source_ip, ep.source_mac, settings.interface.bold());
    info!(
        count = settings.count,
        delay_ms = settings.delay.as_millis() as u64,
        frame_error = settings.rates.frame.probability(),
        ip_error = settings.rates.ip.probability(),
        icmp_error = settings.rates.icmp.probability(),
        seed = ?settings.seed,
        "starting run"
    );

    let mut stats = Statistics::default();
    for n in 0..settings.count {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        // 16-bit identifier and sequence wrap on long runs
        let sequence = n as u16;
        let frame = craft::build_probe(ep, &settings.rates, sequence, &mut rng)?;
        let report = craft::inspect_frame(&frame).unwrap_or_default();

        match sink.transmit(&frame) {
            Ok(()) => {
                stats.record(&report);
                debug!(sequence, bytes = frame.len(), corrupted = ?report.corrupted_layers(), "frame sent");
                if !settings.dry_run {
                    print!("{}", if report.is_clean() { ".".normal() } else { "!".red() });
                    io::stdout().flush()?;
                }
            }
            Err(e) => {
                stats.failed += 1;
                warn!(sequence, error = %e, "error sending frame");
            }
        }

        if n + 1 < settings.count {
            thread::sleep(settings.delay);
        }
    }

    if !settings.dry_run {
        println!(""); // Finish the dots
    }
    Ok(stats)
}

fn main() {
    let matches = app().get_matches();

    let filter = match matches.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let settings = match settings(&matches) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    let stats = match run(&settings, &running) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    println!("{} {} {}", "===".yellow(), "badping statistics".cyan(), "===".yellow());
    println!("{} frames transmitted, {} failed, corrupted checksums: {} frame, {} ip, {} icmp",
        stats.sent.to_string().bold(), stats.failed.to_string().bold(),
        stats.bad_fcs.to_string().red(), stats.bad_ip.to_string().red(), stats.bad_icmp.to_string().red());
}
