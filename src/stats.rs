//! 전송 통계

use std::fmt;
use std::time::{Duration, Instant};

/// 전송 종료 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// 모든 프레임 ACK 확인
    Completed,

    /// 마지막 프레임 ACK를 받지 못하고 재전송 한도 초과로 포기
    LastPacketAbandoned,
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Completed => write!(f, "completed"),
            TransferOutcome::LastPacketAbandoned => write!(f, "last packet abandoned"),
        }
    }
}

/// 전체 전송 통계
///
/// 전송 중에는 송신자만 기록하고, 완료 후에는 읽기 전용.
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 원본 바이트 수
    pub bytes_transferred: u64,

    /// 경과 시간 (완료 시 고정)
    pub elapsed: Duration,

    /// 총 프레임 수
    pub frames: u64,

    /// 최초 전송 횟수 (재전송 제외)
    pub frames_sent: u64,

    /// 재전송 횟수
    pub retransmissions: u64,

    /// 종료 상태
    pub outcome: TransferOutcome,
}

impl TransferStats {
    /// 전송 시작 시점의 통계
    pub fn start(bytes_transferred: u64, frames: u64) -> Self {
        Self {
            start_time: Instant::now(),
            bytes_transferred,
            elapsed: Duration::ZERO,
            frames,
            frames_sent: 0,
            retransmissions: 0,
            outcome: TransferOutcome::Completed,
        }
    }

    /// 전송 종료 기록
    pub fn finish(&mut self, outcome: TransferOutcome) {
        self.elapsed = self.start_time.elapsed();
        self.outcome = outcome;
    }

    /// 파일 크기 (KB)
    pub fn size_kb(&self) -> f64 {
        self.bytes_transferred as f64 / 1024.0
    }

    /// 처리율 (KB/s)
    ///
    /// 경과 시간이 0이면 정의되지 않으므로 None.
    pub fn throughput_kbps(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return None;
        }
        Some(self.size_kb() / secs)
    }

    /// 마지막 패킷을 포기했는지 여부
    pub fn abandoned(&self) -> bool {
        self.outcome == TransferOutcome::LastPacketAbandoned
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.3}s | Bytes: {} | Frames: {} | Throughput: {} | Retransmissions: {} | {}",
            self.elapsed.as_secs_f64(),
            self.bytes_transferred,
            self.frames,
            format_throughput(self.throughput_kbps()),
            self.retransmissions,
            self.outcome,
        )
    }
}

fn format_throughput(kbps: Option<f64>) -> String {
    match kbps {
        Some(kbps) => format!("{:.2} KBps", kbps),
        None => "unbounded (elapsed 0)".to_string(),
    }
}

impl fmt::Display for TransferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--------------------------------------")?;
        writeln!(f, "File size: {:.2} KB", self.size_kb())?;
        writeln!(f, "Transfer time: {:.3} seconds", self.elapsed.as_secs_f64())?;
        writeln!(f, "Throughput: {}", format_throughput(self.throughput_kbps()))?;
        writeln!(f)?;
        writeln!(f, "Number of re-transmissions: {}", self.retransmissions)?;
        if self.abandoned() {
            writeln!(f, "Last packet was not acknowledged (sender gave up)")?;
        }
        write!(f, "--------------------------------------")
    }
}
