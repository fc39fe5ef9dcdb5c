//! # SAWP (Stop-And-Wait Protocol)
//!
//! UDP 기반 Stop-and-Wait ARQ 파일 전송 프로토콜
//!
//! ## 핵심 특징
//! - **고정 크기 패킷**: 3바이트 헤더 + 1021바이트 페이로드 = 1024바이트
//! - **Stop-and-Wait**: 항상 한 개의 패킷만 전송 중
//! - **재전송**: 타임아웃 또는 불일치 ACK 시 동일 패킷 재전송
//! - **마지막 패킷 포기**: 마지막 ACK 유실 대비, 100회 재전송 후 종료
//!
//! ```text
//!  Packetizer ──Frame──▶ ArqSender ──1024B──▶ Transport ──▶ Receiver
//!                            ▲                                  │
//!                            └──────────── 2B ACK ◀─────────────┘
//! ```

pub mod config;
pub mod error;
pub mod packet;
pub mod packetizer;
pub mod receiver;
pub mod sender;
pub mod simulator;
pub mod stats;
pub mod transport;

use std::path::Path;

use bytes::Bytes;
use tracing::info;

pub use config::Config;
pub use error::{Error, Result};
pub use packet::{decode_ack, encode_ack, Frame, SequenceNumber};
pub use packetizer::Packetizer;
pub use receiver::{OutputLength, ReceivedFile, Receiver};
pub use sender::{ArqSender, FrameState};
pub use simulator::{Simulator, SimulatorConfig};
pub use stats::{TransferOutcome, TransferStats};
pub use transport::{resolve_addr, Received, Transport, UdpTransport};

/// 헤더 크기 (시퀀스 번호 2바이트 + 마지막 플래그 1바이트)
pub const HEADER_SIZE: usize = 3;

/// 패킷당 페이로드 크기 (바이트)
pub const PAYLOAD_SIZE: usize = 1021;

/// 데이터 패킷 크기 (항상 고정)
pub const PACKET_SIZE: usize = HEADER_SIZE + PAYLOAD_SIZE;

/// ACK 패킷 크기 (big-endian 시퀀스 번호)
pub const ACK_SIZE: usize = 2;

/// 마지막 패킷 최대 재전송 횟수
pub const LAST_PACKET_RETRY_LIMIT: u32 = 100;

/// 16비트 시퀀스 공간에 들어가는 최대 프레임 수
pub const MAX_FRAMES: usize = 1 << 16;

/// 한 번에 전송 가능한 최대 바이트 수
pub const MAX_SOURCE_LEN: usize = MAX_FRAMES * PAYLOAD_SIZE;

/// 파일 전송
///
/// 주소 해석, 파일 읽기, 소켓 생성 실패는 모두 에러로 반환된다.
/// 마지막 패킷을 포기한 경우는 에러가 아니라 [`TransferOutcome::LastPacketAbandoned`].
pub async fn send_file(
    host: &str,
    port: u16,
    path: impl AsRef<Path>,
    retry_timeout_ms: u64,
) -> Result<TransferStats> {
    let config = Config {
        retry_timeout_ms,
        ..Config::default()
    };
    send_file_with_config(host, port, path, config).await
}

/// 설정을 지정한 파일 전송
pub async fn send_file_with_config(
    host: &str,
    port: u16,
    path: impl AsRef<Path>,
    config: Config,
) -> Result<TransferStats> {
    config.validate()?;

    let dest = resolve_addr(host, port).await?;
    let data = Bytes::from(tokio::fs::read(path.as_ref()).await?);
    info!(
        "Sending {:?} ({} bytes) to {}",
        path.as_ref(),
        data.len(),
        dest
    );

    let transport = UdpTransport::bind_for(dest, config.bind_addr).await?;
    let mut sender = ArqSender::new(transport, config);
    sender.transfer(data, dest).await
}
