//! 전송 계층 추상화
//!
//! - 비신뢰 송신 (`send_to`)
//! - 타임아웃 있는 수신 (`recv_timeout`) → 데이터 또는 [`Received::TimedOut`]
//! - 주소 해석 ([`resolve_addr`])

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::{Error, Result};

/// 수신 결과
///
/// 타임아웃은 에러가 아닌 정상 결과다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// 데이터그램 도착
    Datagram { data: Bytes, from: SocketAddr },

    /// 타임아웃 동안 아무것도 도착하지 않음
    TimedOut,
}

/// 비신뢰 데이터그램 전송 계층
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// 패킷 한 개 전송
    async fn send_to(&self, packet: &[u8], dest: SocketAddr) -> Result<()>;

    /// 최대 `buf_size` 바이트 수신, `timeout` 동안 대기
    ///
    /// `buf_size`보다 긴 데이터그램은 잘리지 않고 실제 길이 그대로 보고되어야 한다
    /// (길이 검사는 디코더가 한다).
    async fn recv_timeout(&self, buf_size: usize, timeout: Duration) -> Result<Received>;
}

/// 호스트 이름 해석 (IPv4 우선)
pub async fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| Error::AddressResolution {
            host: host.to_string(),
            source,
        })?
        .collect();

    let addr = addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| Error::NoAddress {
            host: host.to_string(),
        })?;

    debug!("Resolved {}:{} -> {}", host, port, addr);
    Ok(addr)
}

/// tokio UDP 소켓 기반 전송 계층
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// 주소에 바인딩
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket })
    }

    /// 목적지 주소 체계에 맞춰 바인딩 (`local`이 없으면 임시 포트)
    pub async fn bind_for(dest: SocketAddr, local: Option<SocketAddr>) -> Result<Self> {
        let local = local.unwrap_or_else(|| match dest {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        });
        Self::bind(local).await
    }

    /// 로컬 주소
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    async fn send_to(&self, packet: &[u8], dest: SocketAddr) -> Result<()> {
        self.socket.send_to(packet, dest).await?;
        Ok(())
    }

    async fn recv_timeout(&self, buf_size: usize, timeout: Duration) -> Result<Received> {
        // 한 바이트 여유: 초과 길이 데이터그램이 정상 길이로 잘려 보이지 않도록
        let mut buf = vec![0u8; buf_size + 1];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, from))) => {
                buf.truncate(len);
                Ok(Received::Datagram {
                    data: Bytes::from(buf),
                    from,
                })
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Ok(Received::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addr = resolve_addr("127.0.0.1", 9000).await.unwrap();
        assert_eq!(addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_invalid_host() {
        let result = resolve_addr("no such host.invalid", 9000).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_recv_timeout_reports_timed_out() {
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let received = transport
            .recv_timeout(2, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(received, Received::TimedOut);
    }

    #[tokio::test]
    async fn test_loopback_datagram() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        a.send_to(&[0x00, 0x07], b.local_addr().unwrap())
            .await
            .unwrap();
        let received = b
            .recv_timeout(2, Duration::from_secs(1))
            .await
            .unwrap();

        match received {
            Received::Datagram { data, from } => {
                assert_eq!(data.as_ref(), &[0x00, 0x07]);
                assert_eq!(from, a.local_addr().unwrap());
            }
            Received::TimedOut => panic!("loopback datagram lost"),
        }
    }

    #[tokio::test]
    async fn test_oversize_datagram_not_truncated_to_buf_size() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        a.send_to(&[0x00, 0x00, 0xFF], b.local_addr().unwrap())
            .await
            .unwrap();
        let received = b
            .recv_timeout(crate::ACK_SIZE, Duration::from_secs(1))
            .await
            .unwrap();

        match received {
            Received::Datagram { data, .. } => {
                assert!(data.len() > crate::ACK_SIZE);
                assert_eq!(crate::decode_ack(&data), None);
            }
            Received::TimedOut => panic!("loopback datagram lost"),
        }
    }
}
