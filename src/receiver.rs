//! 수신자 (Stop-and-Wait 상대측)
//!
//! - 기대 시퀀스 프레임만 조립하고 ACK
//! - 그 외 프레임(중복, 지연 재전송)은 마지막으로 조립한 시퀀스를 다시 ACK
//! - 마지막 프레임 이후에도 `linger` 동안 중복 프레임에 ACK (마지막 ACK 유실 대비)
//!
//! 와이어에 길이 필드가 없으므로 출력 길이는 [`OutputLength`]로 정한다.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::packet::{encode_ack, Frame, SequenceNumber};
use crate::transport::{Received, Transport, UdpTransport};
use crate::{Config, Error, Result, PACKET_SIZE, PAYLOAD_SIZE};

/// 수신 완료된 파일
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    /// 조립된 데이터
    pub data: Bytes,

    /// 조립된 프레임 수
    pub frames: u64,

    /// 중복 수신 프레임 수
    pub duplicates: u64,

    /// 송신자 주소
    pub sender: SocketAddr,

    /// 첫 프레임부터 마지막 프레임까지 걸린 시간
    pub elapsed: Duration,
}

/// 출력 길이 결정 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLength {
    /// 마지막 프레임의 패딩까지 그대로 보존 (원본 바이트 손실 없음)
    Padded,

    /// 원본 길이를 알고 있음: 정확히 잘라냄
    Exact(usize),

    /// 마지막 프레임 끝의 0 바이트 제거
    /// 원본이 0으로 끝나면 그 부분도 사라진다
    TrimTrailingZeros,
}

/// Stop-and-Wait 수신자
pub struct Receiver<T: Transport> {
    transport: T,
    config: Config,
    output_len: OutputLength,
}

impl Receiver<UdpTransport> {
    /// UDP 주소에 바인딩한 수신자
    pub async fn bind(addr: SocketAddr, config: Config) -> Result<Self> {
        let transport = UdpTransport::bind(addr).await?;
        Ok(Self::new(transport, config))
    }

    /// 로컬 주소
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }
}

impl<T: Transport> Receiver<T> {
    /// 새 수신자 생성
    pub fn new(transport: T, config: Config) -> Self {
        Self {
            transport,
            config,
            output_len: OutputLength::Padded,
        }
    }

    /// 원본 길이 지정
    pub fn with_expected_len(mut self, len: usize) -> Self {
        self.output_len = OutputLength::Exact(len);
        self
    }

    /// 출력 길이 방식 지정
    pub fn with_output_length(mut self, output_len: OutputLength) -> Self {
        self.output_len = output_len;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 파일 한 개 수신
    pub async fn receive(&self) -> Result<ReceivedFile> {
        self.config.validate()?;

        let mut data = BytesMut::new();
        let mut expected: SequenceNumber = 0;
        let mut last_delivered: Option<SequenceNumber> = None;
        let mut frames = 0u64;
        let mut duplicates = 0u64;
        let mut sender: Option<SocketAddr> = None;
        let mut started: Option<Instant> = None;
        let mut elapsed = Duration::ZERO;
        let mut done = false;

        loop {
            let timeout = if done {
                self.config.linger()
            } else {
                self.config.idle_timeout()
            };

            let (packet, from) = match self.transport.recv_timeout(PACKET_SIZE, timeout).await? {
                Received::Datagram { data, from } => (data, from),
                Received::TimedOut if done => break,
                Received::TimedOut => {
                    return Err(Error::ReceiveIdle {
                        waited_ms: self.config.idle_timeout_ms,
                    })
                }
            };

            let frame = match Frame::decode(&packet) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("패킷 무시 ({}): {}", from, e);
                    continue;
                }
            };

            if !done && frame.sequence() == expected {
                started.get_or_insert_with(Instant::now);
                sender.get_or_insert(from);

                data.extend_from_slice(frame.payload());
                self.transport.send_to(&encode_ack(expected), from).await?;
                debug!(seq = expected, "Delivered frame");

                last_delivered = Some(expected);
                expected = expected.wrapping_add(1);
                frames += 1;

                if frame.is_last() {
                    done = true;
                    elapsed = started.map(|s| s.elapsed()).unwrap_or_default();
                    info!("Received last packet (seq {}), lingering", frame.sequence());
                }
            } else if let Some(last) = last_delivered {
                duplicates += 1;
                debug!(got = frame.sequence(), ack = last, "Re-acknowledging duplicate");
                self.transport.send_to(&encode_ack(last), from).await?;
            }
        }

        let data = self.finish(data);
        let sender = sender.ok_or(Error::ReceiveIdle {
            waited_ms: self.config.idle_timeout_ms,
        })?;

        info!(
            "Received {} bytes in {} frames from {} ({} duplicates)",
            data.len(),
            frames,
            sender,
            duplicates
        );

        Ok(ReceivedFile {
            data,
            frames,
            duplicates,
            sender,
            elapsed,
        })
    }

    /// 출력 길이 적용
    fn finish(&self, mut data: BytesMut) -> Bytes {
        match self.output_len {
            OutputLength::Padded => {}
            OutputLength::Exact(len) => {
                if len > data.len() {
                    warn!("예상 크기 {} > 수신 크기 {}", len, data.len());
                }
                data.truncate(len);
            }
            OutputLength::TrimTrailingZeros => {
                let last_frame_start = data.len().saturating_sub(PAYLOAD_SIZE);
                let end = data[last_frame_start..]
                    .iter()
                    .rposition(|&b| b != 0)
                    .map_or(last_frame_start, |i| last_frame_start + i + 1);
                if end < data.len() {
                    warn!(
                        "마지막 프레임 끝의 0 바이트 {}개 제거 (원본 끝의 0도 포함될 수 있음)",
                        data.len() - end
                    );
                }
                data.truncate(end);
            }
        }
        data.freeze()
    }
}
