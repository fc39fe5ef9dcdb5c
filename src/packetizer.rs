//! 프레임 분할기
//!
//! 원본 버퍼를 [`PAYLOAD_SIZE`] 단위 프레임으로 하나씩 잘라낸다.
//! 빈 버퍼도 빈 마지막 프레임 하나를 만든다.

use bytes::Bytes;

use crate::packet::{Frame, SequenceNumber};
use crate::{Error, Result, MAX_SOURCE_LEN, PAYLOAD_SIZE};

/// 버퍼 길이에 대한 프레임 수
pub fn frame_count(len: usize) -> usize {
    len.max(1).div_ceil(PAYLOAD_SIZE)
}

/// 프레임 분할기 (지연 생성, 전진 전용)
#[derive(Debug, Clone)]
pub struct Packetizer {
    source: Bytes,
    offset: usize,
    next_sequence: SequenceNumber,
    done: bool,
}

impl Packetizer {
    /// 새 분할기 생성
    ///
    /// 16비트 시퀀스 공간을 넘는 버퍼는 거부한다.
    pub fn new(source: Bytes) -> Result<Self> {
        if source.len() > MAX_SOURCE_LEN {
            return Err(Error::SourceTooLarge {
                len: source.len(),
                max: MAX_SOURCE_LEN,
            });
        }

        Ok(Self {
            source,
            offset: 0,
            next_sequence: 0,
            done: false,
        })
    }

    /// 전체 프레임 수
    pub fn total_frames(&self) -> usize {
        frame_count(self.source.len())
    }
}

impl Iterator for Packetizer {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }

        let len = self.source.len();
        let is_last = self.offset + PAYLOAD_SIZE >= len;
        let end = (self.offset + PAYLOAD_SIZE).min(len);
        let frame = Frame::from_slice(
            self.next_sequence,
            is_last,
            self.source.slice(self.offset..end),
        );

        self.offset = end;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.done = is_last;

        Some(frame)
    }
}
