//! 에러 타입 정의

use thiserror::Error;

/// SAWP 에러 타입
///
/// 수신 타임아웃은 에러가 아니다 (재전송 트리거, [`crate::Received::TimedOut`]).
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("주소 해석 실패: {host}: {source}")]
    AddressResolution {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("주소 없음: {host}")]
    NoAddress { host: String },

    #[error("유효하지 않은 재전송 타임아웃: 0보다 커야 함")]
    InvalidRetryTimeout,

    #[error("전송 크기 초과: {len} bytes (최대 {max} bytes)")]
    SourceTooLarge { len: usize, max: usize },

    #[error("유효하지 않은 패킷 길이: expected {expected}, got {got}")]
    InvalidPacketLength { expected: usize, got: usize },

    #[error("수신 대기 시간 초과: {waited_ms}ms 동안 데이터 없음")]
    ReceiveIdle { waited_ms: u64 },

    #[error("유효하지 않은 인자: {0}")]
    InvalidArgument(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
