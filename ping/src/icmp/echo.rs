// 摘要 (RFC 792):

// Echo or Echo Reply Message
//  |       0       |       1       |       2       |       3       |
//  |0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7|
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |     Type      |      Code     |           Checksum            |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |           Identifier          |        Sequence Number        |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |   Data   ...
//  +-+-+-+-+-
//  Type
//      8 for echo message;
//      0 for echo reply message.
//  Code
//      0
//  Checksum
//      The checksum is the 16-bit ones's complement of the one's
//      complement sum of the ICMP message starting with the ICMP Type.
//      For computing the checksum, the checksum field should be zero.
//  Identifier / Sequence Number
//      May be used by the echo sender to aid in matching the replies
//      with the echo requests; the echoer returns these same values.

use super::{write_checksum, Error, HEADER_SIZE};

pub const ECHO_REQUEST_TYPE: u8 = 8;
pub const ECHO_REQUEST_CODE: u8 = 0;

pub struct EchoRequest<'a> {
    pub ident: u16,
    pub seq_cnt: u16,
    pub payload: &'a [u8],
}

impl<'a> EchoRequest<'a> {
    /// 编码进 buffer, buffer 长度必须正好是首部加负载
    pub fn encode(&self, buffer: &mut [u8]) -> Result<(), Error> {
        if buffer.len() != HEADER_SIZE + self.payload.len() {
            return Err(Error::InvalidSize);
        }

        buffer[0] = ECHO_REQUEST_TYPE;
        buffer[1] = ECHO_REQUEST_CODE;
        buffer[2] = 0;
        buffer[3] = 0;

        buffer[4..=5].clone_from_slice(&self.ident.to_be_bytes());
        buffer[6..=7].clone_from_slice(&self.seq_cnt.to_be_bytes());
        buffer[HEADER_SIZE..].clone_from_slice(self.payload);

        write_checksum(buffer);
        Ok(())
    }
}

pub struct EchoReply<'a> {
    pub icmp_type: u8,
    pub code: u8,
    pub ident: u16,
    pub seq_cnt: u16,
    pub payload: &'a [u8],
}

impl<'a> EchoReply<'a> {
    // TODO: 校验 icmp_type 是否为 0 (echo reply), 目前只要长度够就照单全收
    pub fn decode(buffer: &'a [u8]) -> Result<EchoReply<'a>, Error> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::InvalidSize);
        }

        let icmp_type = buffer[0];
        let code = buffer[1];
        let ident = (u16::from(buffer[4]) << 8) + u16::from(buffer[5]);
        let seq_cnt = (u16::from(buffer[6]) << 8) + u16::from(buffer[7]);
        let payload = &buffer[HEADER_SIZE..];

        Ok(EchoReply {
            icmp_type,
            code,
            ident,
            seq_cnt,
            payload,
        })
    }
}
