//! 패킷 코덱
//!
//! 데이터 패킷 (항상 [`PACKET_SIZE`] 바이트, big-endian):
//!
//! ```text
//! byte 0-1     시퀀스 번호 (u16)
//! byte 2       마지막 패킷 플래그 (0x01 = 마지막, 0x00 = 아님)
//! byte 3-1023  페이로드 (앞쪽부터 채움, 남는 부분은 0)
//! ```
//!
//! ACK 패킷 (항상 [`ACK_SIZE`] 바이트): big-endian 시퀀스 번호, 플래그 없음

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result, ACK_SIZE, HEADER_SIZE, PACKET_SIZE, PAYLOAD_SIZE};

/// 시퀀스 번호 (16비트)
pub type SequenceNumber = u16;

const FLAG_LAST: u8 = 0x01;
const FLAG_MORE: u8 = 0x00;

/// 프레임 (와이어 인코딩 전의 논리 단위)
///
/// 페이로드는 원본 버퍼의 슬라이스이므로 복사 없이 생성된다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    sequence: SequenceNumber,
    is_last: bool,
    payload: Bytes,
}

impl Frame {
    /// 새 프레임 생성
    pub fn new(sequence: SequenceNumber, is_last: bool, payload: Bytes) -> Result<Self> {
        if payload.len() > PAYLOAD_SIZE {
            return Err(Error::InvalidPacketLength {
                expected: PAYLOAD_SIZE,
                got: payload.len(),
            });
        }
        Ok(Self {
            sequence,
            is_last,
            payload,
        })
    }

    /// 길이 검사를 이미 마친 슬라이스로 생성 (Packetizer 전용)
    pub(crate) fn from_slice(sequence: SequenceNumber, is_last: bool, payload: Bytes) -> Self {
        debug_assert!(payload.len() <= PAYLOAD_SIZE);
        Self {
            sequence,
            is_last,
            payload,
        }
    }

    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    pub fn is_last(&self) -> bool {
        self.is_last
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// 고정 크기 패킷으로 인코딩
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PACKET_SIZE);
        buf.put_u16(self.sequence);
        buf.put_u8(if self.is_last { FLAG_LAST } else { FLAG_MORE });
        buf.put_slice(&self.payload);
        // 남는 페이로드 영역은 0으로 채움
        buf.put_bytes(0, PACKET_SIZE - HEADER_SIZE - self.payload.len());
        buf.freeze()
    }

    /// 패킷 디코딩
    ///
    /// 와이어에 실제 길이가 없으므로 페이로드는 항상 [`PAYLOAD_SIZE`] 바이트
    /// (패딩 포함). 실제 길이는 수신측이 따로 알아야 한다.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PACKET_SIZE {
            return Err(Error::InvalidPacketLength {
                expected: PACKET_SIZE,
                got: bytes.len(),
            });
        }

        let sequence = u16::from_be_bytes([bytes[0], bytes[1]]);
        let is_last = bytes[2] == FLAG_LAST;
        let payload = Bytes::copy_from_slice(&bytes[HEADER_SIZE..]);

        Ok(Self {
            sequence,
            is_last,
            payload,
        })
    }
}

/// ACK 인코딩
pub fn encode_ack(sequence: SequenceNumber) -> [u8; ACK_SIZE] {
    sequence.to_be_bytes()
}

/// ACK 디코딩 (길이가 맞지 않으면 None)
pub fn decode_ack(bytes: &[u8]) -> Option<SequenceNumber> {
    match bytes {
        [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}
