use std::net::Ipv4Addr;

use thiserror::Error;

pub const HEADER_SIZE: usize = 20;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid size")]
    InvalidSize,
}

/// 固定 20 字节首部的 IPv4 报文视图, 不解析选项字段
pub struct IpV4Packet<'a> {
    pub source: Ipv4Addr,
    pub ttl: u8,
    pub data: &'a [u8],
}

impl<'a> IpV4Packet<'a> {
    pub fn decode(buffer: &'a [u8]) -> Result<IpV4Packet<'a>, Error> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::InvalidSize);
        }

        Ok(IpV4Packet {
            source: Ipv4Addr::new(buffer[12], buffer[13], buffer[14], buffer[15]),
            ttl: buffer[8],
            data: &buffer[HEADER_SIZE..],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_fixed_offsets() {
        let mut buffer = vec![0u8; HEADER_SIZE + 8];
        buffer[8] = 57;
        buffer[12..16].clone_from_slice(&[10, 0, 0, 42]);

        let packet = IpV4Packet::decode(&buffer).unwrap();
        assert_eq!(packet.ttl, 57);
        assert_eq!(packet.source, Ipv4Addr::new(10, 0, 0, 42));
        assert_eq!(packet.data.len(), 8);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        assert!(IpV4Packet::decode(&[0u8; 19]).is_err());
    }
}
