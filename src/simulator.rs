//! 네트워크 장애 시뮬레이터
//!
//! 임의의 [`Transport`]를 감싸서 송신 패킷을 확률적으로 버리거나 중복 전송한다.
//! 시드 고정 RNG를 사용하므로 테스트 결과를 재현할 수 있다.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::transport::{Received, Transport};
use crate::Result;

/// 장애 모델 설정
///
/// 확률은 모두 `[0.0, 1.0]` 범위.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// 송신 패킷 손실 확률
    pub loss_rate: f64,

    /// 송신 패킷 중복 확률
    pub duplicate_rate: f64,

    /// RNG 시드
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // 장애 없음
        Self {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            seed: 0,
        }
    }
}

impl SimulatorConfig {
    /// 손실만 있는 설정
    pub fn lossy(loss_rate: f64, seed: u64) -> Self {
        Self {
            loss_rate,
            seed,
            ..Self::default()
        }
    }
}

/// 장애 주입 전송 계층
pub struct Simulator<T: Transport> {
    inner: T,
    config: SimulatorConfig,
    rng: Mutex<StdRng>,
    dropped: AtomicU64,
    duplicated: AtomicU64,
}

impl<T: Transport> Simulator<T> {
    pub fn new(inner: T, config: SimulatorConfig) -> Self {
        Self {
            inner,
            rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
            config,
            dropped: AtomicU64::new(0),
            duplicated: AtomicU64::new(0),
        }
    }

    /// 버려진 패킷 수
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// 중복 전송된 패킷 수
    pub fn duplicated(&self) -> u64 {
        self.duplicated.load(Ordering::Relaxed)
    }

    fn roll(&self, probability: f64) -> bool {
        probability > 0.0 && self.rng.lock().gen_bool(probability.min(1.0))
    }
}

impl<T: Transport> Transport for Simulator<T> {
    async fn send_to(&self, packet: &[u8], dest: SocketAddr) -> Result<()> {
        if self.roll(self.config.loss_rate) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(len = packet.len(), "simulated loss");
            return Ok(());
        }

        self.inner.send_to(packet, dest).await?;

        if self.roll(self.config.duplicate_rate) {
            self.duplicated.fetch_add(1, Ordering::Relaxed);
            trace!(len = packet.len(), "simulated duplicate");
            self.inner.send_to(packet, dest).await?;
        }

        Ok(())
    }

    async fn recv_timeout(&self, buf_size: usize, timeout: Duration) -> Result<Received> {
        self.inner.recv_timeout(buf_size, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UdpTransport;

    async fn pair() -> (UdpTransport, UdpTransport) {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn test_pass_through_by_default() {
        let (a, b) = pair().await;
        let dest = b.local_addr().unwrap();
        let sim = Simulator::new(a, SimulatorConfig::default());

        sim.send_to(b"ping", dest).await.unwrap();

        let received = b.recv_timeout(16, Duration::from_secs(1)).await.unwrap();
        assert!(matches!(received, Received::Datagram { .. }));
        assert_eq!(sim.dropped(), 0);
    }

    #[tokio::test]
    async fn test_full_loss_drops_everything() {
        let (a, b) = pair().await;
        let dest = b.local_addr().unwrap();
        let sim = Simulator::new(a, SimulatorConfig::lossy(1.0, 7));

        for _ in 0..5 {
            sim.send_to(b"ping", dest).await.unwrap();
        }

        let received = b.recv_timeout(16, Duration::from_millis(50)).await.unwrap();
        assert_eq!(received, Received::TimedOut);
        assert_eq!(sim.dropped(), 5);
    }

    #[tokio::test]
    async fn test_full_duplication() {
        let (a, b) = pair().await;
        let dest = b.local_addr().unwrap();
        let config = SimulatorConfig {
            duplicate_rate: 1.0,
            ..SimulatorConfig::default()
        };
        let sim = Simulator::new(a, config);

        sim.send_to(b"ping", dest).await.unwrap();

        for _ in 0..2 {
            let received = b.recv_timeout(16, Duration::from_secs(1)).await.unwrap();
            assert!(matches!(received, Received::Datagram { .. }));
        }
        assert_eq!(sim.duplicated(), 1);
    }
}
