use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

use crossterm::style::Stylize;
use thiserror::Error;

use crate::icmp::{self, EchoReply, EchoRequest};
use crate::ip::{self, IpV4Packet};
use crate::transport::{self, Transport};

/// 响应里固定首部的开销: 20 字节 IP 首部 + 8 字节 ICMP 首部
const REPLY_OVERHEAD: usize = ip::HEADER_SIZE + icmp::HEADER_SIZE;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid ip packet: {0}")]
    InvalidIpPacket(#[from] ip::Error),
    #[error("invalid icmp packet: {0}")]
    InvalidIcmpPacket(#[from] icmp::Error),
    #[error(transparent)]
    Transport(#[from] transport::Error),
}

/// 单次探测的结果
#[derive(Debug)]
pub enum ProbeOutcome {
    Success {
        source: Ipv4Addr,
        byte_count: usize,
        rtt_millis: u64,
        ttl: u8,
    },
    WriteFailure(ProbeError),
    ReadFailure(ProbeError),
}

pub struct ProbeConfig {
    pub count: u32,
    pub payload_size: usize,
    pub timeout: Duration,
    pub interval: Duration,
}

#[derive(Debug)]
pub struct SessionStats {
    sent: u32,
    received: u32,
    min_rtt: u64,
    max_rtt: u64,
    sum_rtt: u64,
}

impl SessionStats {
    fn new() -> SessionStats {
        SessionStats {
            sent: 0,
            received: 0,
            // 极值取反向初始化, 首个样本必然同时刷新两端
            min_rtt: u64::MAX,
            max_rtt: u64::MIN,
            sum_rtt: 0,
        }
    }

    fn apply(&mut self, outcome: &ProbeOutcome) {
        match outcome {
            ProbeOutcome::Success { rtt_millis, .. } => {
                self.sent += 1;
                self.received += 1;
                self.min_rtt = self.min_rtt.min(*rtt_millis);
                self.max_rtt = self.max_rtt.max(*rtt_millis);
                self.sum_rtt += rtt_millis;
            }
            // 读失败时写已经成功
            ProbeOutcome::ReadFailure(_) => self.sent += 1,
            ProbeOutcome::WriteFailure(_) => {}
        }
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn min_millis(&self) -> u64 {
        if self.received == 0 {
            0
        } else {
            self.min_rtt
        }
    }

    pub fn max_millis(&self) -> u64 {
        if self.received == 0 {
            0
        } else {
            self.max_rtt
        }
    }

    /// 平均值按请求的探测次数整除, 不是按收到的响应数
    pub fn avg_millis(&self, count: u32) -> u64 {
        if count == 0 {
            0
        } else {
            self.sum_rtt / u64::from(count)
        }
    }

    /// 丢包数的口径是 2*count - sent - received: 一次发送失败在两个
    /// 计数里同时缺席, 会被计两次
    pub fn lost(&self, count: u32) -> u32 {
        2 * count - self.sent - self.received
    }

    pub fn loss_percentage(&self, count: u32) -> f64 {
        if count == 0 {
            return 0.0;
        }
        f64::from(self.lost(count)) / f64::from(2 * count) * 100.0
    }
}

pub struct ProbeSequencer<T: Transport> {
    transport: T,
    config: ProbeConfig,
}

impl<T: Transport> ProbeSequencer<T> {
    pub fn new(transport: T, config: ProbeConfig) -> ProbeSequencer<T> {
        ProbeSequencer { transport, config }
    }

    /// 逐个完成全部探测, 返回累计的会话统计. 单次失败不会中断后续探测
    pub fn run(&mut self) -> SessionStats {
        let mut stats = SessionStats::new();

        for seq in 0..self.config.count {
            let outcome = self.probe_once(seq as u16);
            stats.apply(&outcome);
            report_outcome(&outcome);

            thread::sleep(self.config.interval);
        }

        stats
    }

    fn probe_once(&mut self, seq: u16) -> ProbeOutcome {
        let payload = vec![0u8; self.config.payload_size];
        let request = EchoRequest {
            ident: seq,
            seq_cnt: seq,
            payload: &payload,
        };

        let mut packet = vec![0u8; icmp::HEADER_SIZE + self.config.payload_size];
        if let Err(err) = request.encode(&mut packet) {
            return ProbeOutcome::WriteFailure(err.into());
        }

        let (reply, elapsed) = match self.transport.send_and_await(&packet, self.config.timeout) {
            Ok(reply) => reply,
            Err(err @ transport::Error::Write(_)) => {
                return ProbeOutcome::WriteFailure(err.into())
            }
            Err(err) => return ProbeOutcome::ReadFailure(err.into()),
        };

        match decode_reply(&reply) {
            Ok((source, ttl)) => ProbeOutcome::Success {
                source,
                byte_count: reply.len() - REPLY_OVERHEAD,
                rtt_millis: elapsed.as_millis() as u64,
                ttl,
            },
            Err(err) => ProbeOutcome::ReadFailure(err),
        }
    }
}

fn decode_reply(reply: &[u8]) -> Result<(Ipv4Addr, u8), ProbeError> {
    let ip_packet = IpV4Packet::decode(reply)?;
    let _reply = EchoReply::decode(ip_packet.data)?;

    Ok((ip_packet.source, ip_packet.ttl))
}

fn report_outcome(outcome: &ProbeOutcome) {
    match outcome {
        ProbeOutcome::Success {
            source,
            byte_count,
            rtt_millis,
            ttl,
        } => {
            let source = format!("{}", source).blue();
            let time = format!("{}ms", rtt_millis).green();
            let ttl = format!("{}", ttl).yellow();
            println!(
                "Reply from {}: bytes={} time={} ttl={}",
                source, byte_count, time, ttl
            );
        }
        ProbeOutcome::WriteFailure(err) => {
            println!("Send error: {}", format!("{}", err).red());
        }
        ProbeOutcome::ReadFailure(err) => {
            println!("Receive error: {}", format!("{}", err).red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::io;

    type Exchange = Result<(Vec<u8>, Duration), transport::Error>;

    struct ScriptedTransport {
        script: VecDeque<Exchange>,
    }

    impl Transport for ScriptedTransport {
        fn send_and_await(&mut self, _packet: &[u8], _timeout: Duration) -> Exchange {
            self.script.pop_front().expect("script exhausted")
        }
    }

    fn echo_reply(ttl: u8, payload_size: usize) -> Vec<u8> {
        let mut reply = vec![0u8; REPLY_OVERHEAD + payload_size];
        reply[8] = ttl;
        reply[12..16].clone_from_slice(&[192, 168, 0, 1]);
        reply
    }

    fn success(rtt_millis: u64) -> Exchange {
        Ok((echo_reply(64, 32), Duration::from_millis(rtt_millis)))
    }

    fn timed_out() -> Exchange {
        Err(transport::Error::Read(io::Error::new(
            io::ErrorKind::WouldBlock,
            "timed out",
        )))
    }

    fn write_failed() -> Exchange {
        Err(transport::Error::Write(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "send failed",
        )))
    }

    fn run(count: u32, script: Vec<Exchange>) -> SessionStats {
        let transport = ScriptedTransport {
            script: script.into(),
        };
        let config = ProbeConfig {
            count,
            payload_size: 32,
            timeout: Duration::from_millis(1000),
            interval: Duration::ZERO,
        };
        ProbeSequencer::new(transport, config).run()
    }

    #[test]
    fn all_probes_succeed() {
        let stats = run(4, vec![success(10), success(20), success(15), success(25)]);
        assert_eq!(stats.sent(), 4);
        assert_eq!(stats.received(), 4);
        assert_eq!(stats.min_millis(), 10);
        assert_eq!(stats.max_millis(), 25);
        // (10 + 20 + 15 + 25) / 4, 整除
        assert_eq!(stats.avg_millis(4), 17);
        assert_eq!(stats.lost(4), 0);
        assert_eq!(stats.loss_percentage(4), 0.0);
    }

    #[test]
    fn read_timeout_counts_as_sent_only() {
        let stats = run(3, vec![success(10), timed_out(), success(20)]);
        assert_eq!(stats.sent(), 3);
        assert_eq!(stats.received(), 2);
        // 2*3 - 3 - 2
        assert_eq!(stats.lost(3), 1);
    }

    #[test]
    fn write_failure_does_not_abort_the_run() {
        let stats = run(2, vec![write_failed(), success(5)]);
        assert_eq!(stats.sent(), 1);
        assert_eq!(stats.received(), 1);
        // 发送失败在两个计数里同时缺席, 口径把它计了两次
        assert_eq!(stats.lost(2), 2);
        assert_eq!(stats.loss_percentage(2), 50.0);
    }

    #[test]
    fn counters_stay_ordered() {
        let stats = run(
            5,
            vec![
                success(1),
                write_failed(),
                timed_out(),
                success(3),
                timed_out(),
            ],
        );
        assert_eq!(stats.sent(), 4);
        assert_eq!(stats.received(), 2);
        assert!(stats.received() <= stats.sent());
        assert!(stats.sent() <= 5);
    }

    #[test]
    fn short_reply_counts_as_read_failure() {
        let stats = run(1, vec![Ok((vec![0u8; 10], Duration::from_millis(1)))]);
        assert_eq!(stats.sent(), 1);
        assert_eq!(stats.received(), 0);
    }

    #[test]
    fn first_sample_updates_both_extremes() {
        let stats = run(1, vec![success(12)]);
        assert_eq!(stats.min_millis(), 12);
        assert_eq!(stats.max_millis(), 12);
    }

    #[test]
    fn no_samples_report_zero_times() {
        let stats = run(1, vec![timed_out()]);
        assert_eq!(stats.min_millis(), 0);
        assert_eq!(stats.max_millis(), 0);
        assert_eq!(stats.avg_millis(1), 0);
    }
}
