use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use clap::{App, Arg};
use crossterm::style::Stylize;

use crate::probe::{ProbeConfig, ProbeSequencer, SessionStats};
use crate::transport::IcmpSession;

// 两次探测之间固定停 1 秒
const PROBE_INTERVAL: Duration = Duration::from_secs(1);

pub struct PingApp {
    host: String,
    count: u32,
    size: usize,
    timeout: Duration,
}

impl PingApp {
    pub fn from_args() -> PingApp {
        let matches = App::new("ping")
            .arg(
                Arg::new("HOST")
                    .takes_value(true)
                    .help("Remote ipv4 address or host name"),
            )
            .arg(
                Arg::new("COUNT")
                    .takes_value(true)
                    .short('n')
                    .long("count")
                    .help("Number of echo requests to send"),
            )
            .arg(
                Arg::new("SIZE")
                    .takes_value(true)
                    .short('l')
                    .long("size")
                    .help("Number of payload bytes to send"),
            )
            .arg(
                Arg::new("TIMEOUT")
                    .takes_value(true)
                    .short('w')
                    .long("time-out")
                    .help("Time in milliseconds to wait for each reply"),
            )
            .about("Ping a remote ipv4 host.")
            .author("朕与将军解战袍, 1393323447@qq.com")
            .version("0.1.0")
            .get_matches();

        let host = matches
            .value_of("HOST")
            .expect("Please present a remote ip address or host name")
            .to_string();
        let count = matches
            .value_of("COUNT")
            .map(|cnt| cnt.parse().unwrap())
            .unwrap_or(4);
        let size = matches
            .value_of("SIZE")
            .map(|size| size.parse().unwrap())
            .unwrap_or(32);
        let timeout = matches
            .value_of("TIMEOUT")
            .map(|timeout| timeout.parse().unwrap())
            .unwrap_or(1000);

        PingApp {
            host,
            count,
            size,
            timeout: Duration::from_millis(timeout),
        }
    }

    pub fn run(&self) {
        let (host, addr) = match self.resolve() {
            Ok(resolved) => resolved,
            Err(err) => {
                println!(
                    "Ping request could not find host {}: {}",
                    self.host,
                    format!("{}", err).red()
                );
                return;
            }
        };

        let session = match IcmpSession::open(addr, self.timeout) {
            Ok(session) => session,
            Err(err) => {
                println!(
                    "Unable to reach {}: {}",
                    format!("{}", addr).blue(),
                    format!("{}", err).red()
                );
                return;
            }
        };

        let ip = format!("{}", addr).blue();
        let size = format!("{}", self.size).blue();
        match host {
            Some(ref host) => {
                let host = format!("{}", host).green();
                println!("ping {} [{}] with {} bytes of data: ", host, ip, size);
            }
            None => println!("ping {} with {} bytes of data: ", ip, size),
        }

        let config = ProbeConfig {
            count: self.count,
            payload_size: self.size,
            timeout: self.timeout,
            interval: PROBE_INTERVAL,
        };
        let stats = ProbeSequencer::new(session, config).run();

        self.report(addr, &stats);
    }

    fn resolve(&self) -> io::Result<(Option<String>, Ipv4Addr)> {
        match self.host.parse::<Ipv4Addr>() {
            Ok(addr) => Ok((None, addr)),
            Err(_) => {
                let addr = look_up_ip(&self.host)?;
                Ok((Some(self.host.clone()), addr))
            }
        }
    }

    fn report(&self, addr: Ipv4Addr, stats: &SessionStats) {
        let sent = format!("{}", stats.sent()).blue();
        let received = format!("{}", stats.received()).green();
        let lost = format!("{}", stats.lost(self.count)).red();
        let loss_percentage = {
            let percentage = stats.loss_percentage(self.count);
            let percentage_str = format!("{:.0}", percentage);

            if percentage > 40.0 {
                percentage_str.red()
            } else if percentage > 20.0 {
                percentage_str.yellow()
            } else {
                percentage_str.green()
            }
        };
        let min = format!("{}ms", stats.min_millis()).green();
        let max = format!("{}ms", stats.max_millis()).green();
        let avg = format!("{}ms", stats.avg_millis(self.count)).green();

        println!();
        println!("Ping statistics for {}: ", format!("{}", addr).blue());
        println!(
            "    Packets: Sent = {}, Received = {}, Lost = {} ({}% loss)",
            sent, received, lost, loss_percentage
        );
        println!("Approximate round trip times in milli-seconds: ");
        println!("    Minimum = {}, Maximum = {}, Average = {}", min, max, avg);
    }
}

fn look_up_ip(host: &str) -> io::Result<Ipv4Addr> {
    let resolver = trust_dns_resolver::Resolver::default()?;
    let lookup = resolver.lookup_ip(host)?;

    lookup
        .iter()
        .find_map(|addr| match addr {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no ipv4 address found for {}", host),
            )
        })
}
