//! 프로토콜 설정

use std::net::SocketAddr;
use std::time::Duration;

use crate::{Error, Result, LAST_PACKET_RETRY_LIMIT};

/// SAWP 프로토콜 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// ACK 대기 타임아웃 (밀리초)
    pub retry_timeout_ms: u64,

    /// 마지막 패킷 재전송 한도
    /// 초과 시 송신자는 마지막 ACK를 포기하고 종료
    pub last_packet_retry_limit: u32,

    /// 송신 소켓 바인드 주소 (None이면 임시 포트 자동 할당)
    pub bind_addr: Option<SocketAddr>,

    /// 수신자: 전송 완료 전 무응답 허용 시간 (밀리초)
    pub idle_timeout_ms: u64,

    /// 수신자: 마지막 패킷 수신 후 중복 패킷에 ACK를 계속 보내는 시간 (밀리초)
    pub linger_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_timeout_ms: 100,
            last_packet_retry_limit: LAST_PACKET_RETRY_LIMIT,
            bind_addr: None,
            idle_timeout_ms: 30_000, // 30초
            linger_ms: 1_000,        // 1초
        }
    }
}

impl Config {
    /// 재전송 타임아웃 지정
    pub fn with_retry_timeout(retry_timeout_ms: u64) -> Self {
        Self {
            retry_timeout_ms,
            ..Self::default()
        }
    }

    /// ACK 대기 타임아웃
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }

    /// 수신 무응답 허용 시간
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// 마지막 패킷 이후 대기 시간
    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }

    /// 설정 검증
    ///
    /// 타임아웃 0은 블로킹 의미가 정의되지 않으므로 거부한다.
    pub fn validate(&self) -> Result<()> {
        if self.retry_timeout_ms == 0 {
            return Err(Error::InvalidRetryTimeout);
        }
        if self.idle_timeout_ms == 0 {
            return Err(Error::InvalidArgument(
                "idle_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.linger_ms == 0 {
            return Err(Error::InvalidArgument(
                "linger_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// 로컬 루프백용 설정
    pub fn localhost() -> Self {
        Self {
            retry_timeout_ms: 20,
            linger_ms: 200,
            ..Self::default()
        }
    }

    /// 불안정한 네트워크용 설정
    pub fn unstable_network() -> Self {
        Self {
            retry_timeout_ms: 500,
            idle_timeout_ms: 60_000,
            linger_ms: 5_000,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.last_packet_retry_limit, 100);
        assert_eq!(config.retry_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_zero_retry_timeout_rejected() {
        let config = Config::with_retry_timeout(0);
        assert!(matches!(config.validate(), Err(Error::InvalidRetryTimeout)));
    }

    #[test]
    fn test_zero_linger_rejected() {
        let config = Config {
            linger_ms: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(Config::localhost().validate().is_ok());
        assert!(Config::unstable_network().validate().is_ok());
    }
}
