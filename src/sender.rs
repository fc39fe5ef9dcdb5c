//! 송신자 (Stop-and-Wait ARQ 엔진)
//!
//! 프레임마다 다음 사이클을 끝까지 처리한 뒤 다음 프레임으로 넘어간다.
//!
//! ```text
//! AwaitingSend ──▶ AwaitingAck ──(일치 ACK)──▶ Confirmed
//!                     ▲   │
//!                     │   └─(타임아웃 / 불일치 / 손상 ACK)──▶ Retry
//!                     └────────────── 동일 패킷 재전송 ◀───────┘
//!
//! 마지막 프레임만: Retry 횟수가 한도를 넘으면 Abandoned
//! ```

use std::net::SocketAddr;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::packet::{decode_ack, Frame, SequenceNumber};
use crate::packetizer::Packetizer;
use crate::stats::{TransferOutcome, TransferStats};
use crate::transport::{Received, Transport};
use crate::{Config, Result, ACK_SIZE};

/// 프레임 전송 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// 아직 전송 전
    AwaitingSend,

    /// 전송 후 ACK 대기
    AwaitingAck,

    /// 일치하는 ACK 수신
    Confirmed,

    /// 재전송 필요
    Retry,

    /// 마지막 프레임 재전송 한도 초과 (포기)
    Abandoned,
}

/// Stop-and-Wait 송신자
///
/// 시퀀스 카운터와 통계는 한 번의 [`transfer`](Self::transfer) 호출 동안만 유효하다.
pub struct ArqSender<T: Transport> {
    /// 전송 계층
    transport: T,

    /// 설정
    config: Config,

    /// 현재 전송 중인 시퀀스 번호
    sequence: SequenceNumber,

    /// 전송 통계
    stats: TransferStats,
}

impl<T: Transport> ArqSender<T> {
    /// 새 송신자 생성
    pub fn new(transport: T, config: Config) -> Self {
        Self {
            transport,
            config,
            sequence: 0,
            stats: TransferStats::start(0, 0),
        }
    }

    /// 전체 버퍼 전송
    ///
    /// 모든 프레임이 확인(또는 마지막 프레임 포기)되면 통계를 반환한다.
    /// 타임아웃은 내부에서 재전송으로 처리되고, 그 외 전송 계층 에러는 즉시 반환된다.
    pub async fn transfer(&mut self, data: Bytes, dest: SocketAddr) -> Result<TransferStats> {
        self.config.validate()?;

        let bytes = data.len() as u64;
        let packetizer = Packetizer::new(data)?;
        let total_frames = packetizer.total_frames();

        self.sequence = 0;
        self.stats = TransferStats::start(bytes, total_frames as u64);

        info!(
            "Started sending {} bytes to {} ({} frames, timeout {}ms)",
            bytes, dest, total_frames, self.config.retry_timeout_ms
        );

        let mut outcome = TransferOutcome::Completed;

        for frame in packetizer {
            debug_assert_eq!(frame.sequence(), self.sequence);

            if self.deliver(&frame, dest).await? == FrameState::Abandoned {
                outcome = TransferOutcome::LastPacketAbandoned;
            }

            self.sequence = self.sequence.wrapping_add(1);
        }

        self.stats.finish(outcome);
        info!("Transfer finished: {}", self.stats.summary());

        Ok(self.stats.clone())
    }

    /// 프레임 한 개의 전송-확인 사이클
    async fn deliver(&mut self, frame: &Frame, dest: SocketAddr) -> Result<FrameState> {
        // 재전송은 재구성 없이 동일 바이트를 보낸다
        let packet = frame.encode();
        let seq = frame.sequence();
        let mut last_packet_attempts: u32 = 0;
        let mut state = FrameState::AwaitingSend;

        loop {
            state = match state {
                FrameState::AwaitingSend => {
                    self.transport.send_to(&packet, dest).await?;
                    self.stats.frames_sent += 1;
                    debug!(seq, last = frame.is_last(), "Sent packet");
                    FrameState::AwaitingAck
                }

                FrameState::AwaitingAck => self.await_ack(seq, dest).await?,

                FrameState::Retry => {
                    if frame.is_last() {
                        last_packet_attempts += 1;
                        if last_packet_attempts > self.config.last_packet_retry_limit {
                            warn!(
                                seq,
                                attempts = last_packet_attempts - 1,
                                "Sender has given up sending the last packet"
                            );
                            FrameState::Abandoned
                        } else {
                            self.resend(&packet, seq, dest).await?;
                            debug!(seq, attempt = last_packet_attempts, "Sending last packet");
                            FrameState::AwaitingAck
                        }
                    } else {
                        self.resend(&packet, seq, dest).await?;
                        FrameState::AwaitingAck
                    }
                }

                FrameState::Confirmed | FrameState::Abandoned => return Ok(state),
            };
        }
    }

    /// ACK 한 개 대기 후 다음 상태 결정
    ///
    /// 수신이 실제로 성공한 경우에만 ACK 번호를 비교한다.
    /// 목적지가 아닌 주소에서 온 데이터그램은 불일치로 취급한다.
    async fn await_ack(&self, seq: SequenceNumber, dest: SocketAddr) -> Result<FrameState> {
        let received = self
            .transport
            .recv_timeout(ACK_SIZE, self.config.retry_timeout())
            .await?;

        let next = match received {
            Received::TimedOut => {
                debug!(seq, "Socket timed out while waiting for acknowledgment");
                FrameState::Retry
            }
            Received::Datagram { from, .. } if from != dest => {
                warn!(seq, %from, "Ignoring datagram from unexpected peer");
                FrameState::Retry
            }
            Received::Datagram { data, .. } => match decode_ack(&data) {
                Some(ack) if ack == seq => {
                    debug!(seq, "Received acknowledgment");
                    FrameState::Confirmed
                }
                Some(ack) => {
                    debug!(expected = seq, got = ack, "Ignoring mismatched acknowledgment");
                    FrameState::Retry
                }
                None => {
                    warn!(seq, len = data.len(), "Malformed acknowledgment packet");
                    FrameState::Retry
                }
            },
        };

        Ok(next)
    }

    /// 동일 패킷 재전송
    async fn resend(&mut self, packet: &[u8], seq: SequenceNumber, dest: SocketAddr) -> Result<()> {
        self.transport.send_to(packet, dest).await?;
        self.stats.retransmissions += 1;
        debug!(seq, "Resending packet");
        Ok(())
    }

    /// 현재 시퀀스 번호
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// 통계 반환
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// 전송 계층 참조
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::{encode_ack, Error, PACKET_SIZE};

    /// 스크립트 응답
    enum Reply {
        Ack(u16),
        Raw(Vec<u8>),
        Stranger(u16),
        Timeout,
    }

    type Responder = Box<dyn FnMut(usize, &Frame) -> Reply>;

    /// 메모리 기반 전송 계층
    ///
    /// 마지막으로 보낸 패킷(전송 순번, 프레임)을 보고 응답을 정한다.
    struct ScriptedTransport {
        sent: Mutex<Vec<Bytes>>,
        responder: Mutex<Responder>,
    }

    impl ScriptedTransport {
        fn new(responder: impl FnMut(usize, &Frame) -> Reply + 'static) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                responder: Mutex::new(Box::new(responder)),
            }
        }

        fn reliable() -> Self {
            Self::new(|_, frame| Reply::Ack(frame.sequence()))
        }

        fn sent(&self) -> Vec<Bytes> {
            self.sent.lock().clone()
        }

        fn sent_sequences(&self) -> Vec<u16> {
            self.sent()
                .iter()
                .map(|p| Frame::decode(p).unwrap().sequence())
                .collect()
        }
    }

    impl Transport for ScriptedTransport {
        async fn send_to(&self, packet: &[u8], _dest: SocketAddr) -> Result<()> {
            self.sent.lock().push(Bytes::copy_from_slice(packet));
            Ok(())
        }

        async fn recv_timeout(&self, buf_size: usize, _timeout: Duration) -> Result<Received> {
            assert_eq!(buf_size, ACK_SIZE);
            let (index, frame) = {
                let sent = self.sent.lock();
                let last = sent.last().expect("recv before send");
                (sent.len() - 1, Frame::decode(last).unwrap())
            };

            let reply = {
                let mut responder = self.responder.lock();
                (&mut **responder)(index, &frame)
            };
            Ok(match reply {
                Reply::Ack(seq) => Received::Datagram {
                    data: Bytes::copy_from_slice(&encode_ack(seq)),
                    from: dest(),
                },
                Reply::Raw(data) => Received::Datagram {
                    data: Bytes::from(data),
                    from: dest(),
                },
                Reply::Stranger(seq) => Received::Datagram {
                    data: Bytes::copy_from_slice(&encode_ack(seq)),
                    from: "10.0.0.66:9000".parse().unwrap(),
                },
                Reply::Timeout => Received::TimedOut,
            })
        }
    }

    /// 송신 실패 전송 계층
    struct BrokenTransport;

    impl Transport for BrokenTransport {
        async fn send_to(&self, _packet: &[u8], _dest: SocketAddr) -> Result<()> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "send blocked",
            )))
        }

        async fn recv_timeout(&self, _buf_size: usize, _timeout: Duration) -> Result<Received> {
            Ok(Received::TimedOut)
        }
    }

    fn dest() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn source(len: usize) -> Bytes {
        Bytes::from((0..len).map(|i| (i % 253) as u8).collect::<Vec<u8>>())
    }

    fn sender(transport: ScriptedTransport) -> ArqSender<ScriptedTransport> {
        ArqSender::new(transport, Config::with_retry_timeout(10))
    }

    #[tokio::test]
    async fn test_reliable_channel_sequences_and_payload() {
        let data = source(2500);
        let mut sender = sender(ScriptedTransport::reliable());

        let stats = sender.transfer(data.clone(), dest()).await.unwrap();

        assert_eq!(stats.outcome, TransferOutcome::Completed);
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.frames_sent, 3);
        assert_eq!(stats.retransmissions, 0);
        assert_eq!(stats.bytes_transferred, 2500);
        assert_eq!(sender.transport().sent_sequences(), vec![0, 1, 2]);

        let sent = sender.transport().sent();
        assert!(sent.iter().all(|p| p.len() == PACKET_SIZE));

        let mut rebuilt = Vec::new();
        for packet in &sent {
            let frame = Frame::decode(packet).unwrap();
            rebuilt.extend_from_slice(frame.payload());
        }
        rebuilt.truncate(data.len());
        assert_eq!(rebuilt, data.to_vec());
        assert!(Frame::decode(&sent[2]).unwrap().is_last());
    }

    #[tokio::test]
    async fn test_lost_transmission_resends_identical_packet() {
        let transport = ScriptedTransport::new(|index, frame| {
            if index == 1 {
                Reply::Timeout
            } else {
                Reply::Ack(frame.sequence())
            }
        });
        let mut sender = sender(transport);

        let stats = sender.transfer(source(2500), dest()).await.unwrap();

        assert_eq!(stats.retransmissions, 1);
        assert_eq!(stats.frames_sent, 3);
        assert_eq!(sender.transport().sent_sequences(), vec![0, 1, 1, 2]);

        let sent = sender.transport().sent();
        assert_eq!(sent[1], sent[2]);
    }

    #[tokio::test]
    async fn test_last_packet_abandoned_after_limit() {
        let transport = ScriptedTransport::new(|_, frame| {
            if frame.is_last() {
                Reply::Timeout
            } else {
                Reply::Ack(frame.sequence())
            }
        });
        let mut sender = sender(transport);

        let stats = sender.transfer(source(2500), dest()).await.unwrap();

        assert_eq!(stats.outcome, TransferOutcome::LastPacketAbandoned);
        assert!(stats.abandoned());
        assert_eq!(stats.retransmissions, 100);

        let seqs = sender.transport().sent_sequences();
        assert_eq!(seqs.len(), 2 + 1 + 100);
        assert!(seqs[2..].iter().all(|&s| s == 2));
        assert_eq!(sender.sequence(), 3);
    }

    #[tokio::test]
    async fn test_non_last_frame_retries_without_limit() {
        let transport = ScriptedTransport::new(|index, frame| {
            if index < 150 {
                Reply::Timeout
            } else {
                Reply::Ack(frame.sequence())
            }
        });
        let mut sender = sender(transport);

        let stats = sender.transfer(source(1500), dest()).await.unwrap();

        assert_eq!(stats.outcome, TransferOutcome::Completed);
        assert_eq!(stats.retransmissions, 150);
        assert_eq!(sender.transport().sent_sequences().last(), Some(&1));
    }

    #[tokio::test]
    async fn test_mismatched_ack_never_advances() {
        let transport = ScriptedTransport::new(|index, frame| match index {
            // 첫 프레임에 엉뚱한 번호
            0 => Reply::Ack(5),
            // 두 번째 프레임 첫 전송에 이전 프레임의 지연 ACK
            2 => Reply::Ack(0),
            _ => Reply::Ack(frame.sequence()),
        });
        let mut sender = sender(transport);

        let stats = sender.transfer(source(1500), dest()).await.unwrap();

        assert_eq!(stats.retransmissions, 2);
        assert_eq!(sender.transport().sent_sequences(), vec![0, 0, 1, 1]);
    }

    #[tokio::test]
    async fn test_timeout_is_not_ack_zero() {
        // 빈 파일: 시퀀스 0 프레임 하나. 타임아웃이 ACK 0으로 오인되면 안 됨
        let transport = ScriptedTransport::new(|index, frame| {
            if index < 3 {
                Reply::Timeout
            } else {
                Reply::Ack(frame.sequence())
            }
        });
        let mut sender = sender(transport);

        let stats = sender.transfer(Bytes::new(), dest()).await.unwrap();

        assert_eq!(stats.outcome, TransferOutcome::Completed);
        assert_eq!(stats.retransmissions, 3);
        assert_eq!(stats.frames, 1);
        assert_eq!(sender.transport().sent_sequences(), vec![0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_malformed_ack_triggers_retry() {
        let transport = ScriptedTransport::new(|index, frame| {
            if index == 0 {
                Reply::Raw(vec![0, 0, 0])
            } else {
                Reply::Ack(frame.sequence())
            }
        });
        let mut sender = sender(transport);

        let stats = sender.transfer(source(10), dest()).await.unwrap();

        assert_eq!(stats.retransmissions, 1);
        assert_eq!(stats.outcome, TransferOutcome::Completed);
    }

    #[tokio::test]
    async fn test_ack_from_unexpected_peer_ignored() {
        let transport = ScriptedTransport::new(|index, frame| {
            if index == 0 {
                Reply::Stranger(frame.sequence())
            } else {
                Reply::Ack(frame.sequence())
            }
        });
        let mut sender = sender(transport);

        let stats = sender.transfer(source(10), dest()).await.unwrap();

        assert_eq!(stats.retransmissions, 1);
        assert_eq!(sender.transport().sent_sequences(), vec![0, 0]);
    }

    #[tokio::test]
    async fn test_custom_last_packet_limit() {
        let transport = ScriptedTransport::new(|_, _| Reply::Timeout);
        let config = Config {
            last_packet_retry_limit: 3,
            ..Config::with_retry_timeout(10)
        };
        let mut sender = ArqSender::new(transport, config);

        let stats = sender.transfer(source(10), dest()).await.unwrap();

        assert!(stats.abandoned());
        assert_eq!(stats.retransmissions, 3);
        assert_eq!(sender.transport().sent().len(), 4);
    }

    #[tokio::test]
    async fn test_zero_timeout_rejected() {
        let mut sender = ArqSender::new(ScriptedTransport::reliable(), Config::with_retry_timeout(0));

        let result = sender.transfer(source(10), dest()).await;

        assert!(matches!(result, Err(Error::InvalidRetryTimeout)));
        assert!(sender.transport().sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_fatal() {
        let mut sender = ArqSender::new(BrokenTransport, Config::with_retry_timeout(10));

        let result = sender.transfer(source(10), dest()).await;

        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_counters_reset_between_transfers() {
        let mut sender = sender(ScriptedTransport::reliable());

        sender.transfer(source(2500), dest()).await.unwrap();
        let stats = sender.transfer(source(100), dest()).await.unwrap();

        assert_eq!(stats.frames, 1);
        assert_eq!(stats.frames_sent, 1);
        assert_eq!(sender.transport().sent_sequences(), vec![0, 1, 2, 0]);
    }
}
