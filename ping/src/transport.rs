use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;

/// 接收缓冲区, 足够容纳外层 IP 首部 + ICMP 首部 + 负载
pub const RECV_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum Error {
    #[error("send failed: {0}")]
    Write(#[source] io::Error),
    #[error("receive failed: {0}")]
    Read(#[source] io::Error),
}

/// 发送一个报文并等待一次读取, 返回原始响应和从写前到读后的耗时
pub trait Transport {
    fn send_and_await(
        &mut self,
        packet: &[u8],
        timeout: Duration,
    ) -> Result<(Vec<u8>, Duration), Error>;
}

pub struct IcmpSession {
    socket: Socket,
}

impl IcmpSession {
    pub fn open(addr: Ipv4Addr, timeout: Duration) -> io::Result<IcmpSession> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        let dest = SocketAddr::new(IpAddr::V4(addr), 0);
        socket.connect_timeout(&dest.into(), timeout)?;

        Ok(IcmpSession { socket })
    }
}

impl Transport for IcmpSession {
    fn send_and_await(
        &mut self,
        packet: &[u8],
        timeout: Duration,
    ) -> Result<(Vec<u8>, Duration), Error> {
        self.socket
            .set_write_timeout(Some(timeout))
            .map_err(Error::Write)?;
        self.socket
            .set_read_timeout(Some(timeout))
            .map_err(Error::Read)?;

        let timer = Instant::now();
        self.socket.send(packet).map_err(Error::Write)?;

        // 一次读取就当作完整响应, 不做拼接
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let size = self.socket.read(&mut buffer).map_err(Error::Read)?;

        Ok((buffer[..size].to_vec(), timer.elapsed()))
    }
}
