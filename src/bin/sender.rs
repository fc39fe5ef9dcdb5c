//! SAWP 송신자 - Stop-And-Wait Protocol
//!
//! 파일 하나를 Stop-and-Wait ARQ로 전송하고 처리율을 출력한다.
//!
//! 사용법:
//!   cargo run --release --bin sawp-sender -- <HOST> <PORT> <FILE> <RETRY_TIMEOUT_MS>
//!
//! 예시:
//!   cargo run --release --bin sawp-sender -- localhost 9000 data.bin 50

use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sawp::{Config, Error};

const USAGE: &str = r#"SAWP Sender - Stop-And-Wait Protocol 송신자

Stop-and-Wait ARQ 기반 UDP 파일 전송
- 1024바이트 고정 패킷 (시퀀스 2B + 마지막 플래그 1B + 데이터 1021B)
- 타임아웃 또는 불일치 ACK 시 동일 패킷 재전송
- 마지막 패킷은 100회 재전송 후 포기

사용법:
  sawp-sender [OPTIONS] <HOST> <PORT> <FILE> <RETRY_TIMEOUT_MS>

옵션:
  -b, --bind <ADDR>      로컬 바인드 주소 (기본: 임시 포트 자동 할당)
  -h, --help             이 도움말 출력

로그 레벨은 RUST_LOG 환경 변수로 지정 (기본: info)

예시:
  sawp-sender localhost 9000 data.bin 50
  RUST_LOG=debug sawp-sender 192.168.1.100 9000 movie.mp4 200
"#;

/// 송신자 설정
struct SenderArgs {
    host: String,
    port: u16,
    file_path: PathBuf,
    config: Config,
}

fn parse_args() -> Result<SenderArgs, Error> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = Config::default();
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| Error::InvalidArgument("--bind 주소 필요".into()))?;
                config.bind_addr = Some(value.parse().map_err(|_| {
                    Error::InvalidArgument(format!("유효한 주소 필요: {}", value))
                })?);
                i += 1;
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let [host, port, file, timeout]: [String; 4] = positional.try_into().map_err(|_| {
        Error::InvalidArgument("<HOST> <PORT> <FILE> <RETRY_TIMEOUT_MS> 필요".into())
    })?;

    let port = port
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("유효한 포트 필요: {}", port)))?;
    config.retry_timeout_ms = timeout
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("유효한 타임아웃 필요: {}", timeout)))?;
    config.validate()?;

    Ok(SenderArgs {
        host,
        port,
        file_path: PathBuf::from(file),
        config,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    info!("SAWP Sender starting...");
    info!("Destination: {}:{}", args.host, args.port);
    info!("Retry timeout: {}ms", args.config.retry_timeout_ms);

    match sawp::send_file_with_config(&args.host, args.port, &args.file_path, args.config).await {
        Ok(stats) => {
            println!("{}", stats);
            Ok(())
        }
        Err(e) => {
            error!("Transfer failed: {}", e);
            std::process::exit(1);
        }
    }
}
