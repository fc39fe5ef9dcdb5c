//! SAWP 수신자 - Stop-And-Wait Protocol
//!
//! 파일 하나를 수신해서 저장한다. 받은 프레임마다 2바이트 ACK를 돌려준다.
//!
//! 사용법:
//!   cargo run --release --bin sawp-receiver -- <PORT> <OUTPUT> [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin sawp-receiver -- 9000 received.bin --size 104857600

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sawp::{Config, Error, OutputLength, Receiver};

const USAGE: &str = r#"SAWP Receiver - Stop-And-Wait Protocol 수신자

사용법:
  sawp-receiver [OPTIONS] <PORT> <OUTPUT>

옵션:
  --size <BYTES>         원본 크기 (이 값으로 출력 길이를 정확히 맞춤)
  --trim-padding         원본 크기를 모를 때: 마지막 패킷 끝의 0 바이트 제거
                         (원본이 0으로 끝나면 그 바이트도 잘림)
  --keep-padding         원본 크기를 모를 때: 마지막 패킷 패딩까지 그대로 저장
  --linger <MS>          마지막 패킷 이후 중복 ACK 대기 시간 (기본: 1000)
  --idle <MS>            전송 시작/진행 대기 한도 (기본: 30000)
  -h, --help             이 도움말 출력

예시:
  sawp-receiver 9000 notes.txt --trim-padding
  sawp-receiver 9000 movie.mp4 --size 104857600 --linger 3000
"#;

/// 수신자 설정
struct ReceiverArgs {
    bind_addr: SocketAddr,
    output_path: PathBuf,
    output_len: OutputLength,
    config: Config,
}

fn parse_number<N: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<N, Error> {
    let value = value.ok_or_else(|| Error::InvalidArgument(format!("{} 값 필요", flag)))?;
    value
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("{}: 유효한 숫자 필요: {}", flag, value)))
}

fn parse_args() -> Result<ReceiverArgs, Error> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = Config::default();
    let mut output_len = None;
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--size" => {
                output_len = Some(OutputLength::Exact(parse_number("--size", args.get(i + 1))?));
                i += 1;
            }
            "--trim-padding" => output_len = Some(OutputLength::TrimTrailingZeros),
            "--keep-padding" => output_len = Some(OutputLength::Padded),
            "--linger" => {
                config.linger_ms = parse_number("--linger", args.get(i + 1))?;
                i += 1;
            }
            "--idle" => {
                config.idle_timeout_ms = parse_number("--idle", args.get(i + 1))?;
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

    let [port, output]: [String; 2] = positional
        .try_into()
        .map_err(|_| Error::InvalidArgument("<PORT> <OUTPUT> 필요".into()))?;
    let port: u16 = parse_number("<PORT>", Some(&port))?;
    // 와이어에 길이 정보가 없으므로 출력 길이 방식은 명시해야 한다
    let output_len = output_len.ok_or_else(|| {
        Error::InvalidArgument("--size, --trim-padding, --keep-padding 중 하나 필요".into())
    })?;
    config.validate()?;

    Ok(ReceiverArgs {
        bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        output_path: PathBuf::from(output),
        output_len,
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

    let receiver = Receiver::bind(args.bind_addr, args.config)
        .await?
        .with_output_length(args.output_len);
    info!("SAWP Receiver listening on {}", receiver.local_addr()?);

    let file = match receiver.receive().await {
        Ok(file) => file,
        Err(e) => {
            error!("Receive failed: {}", e);
            std::process::exit(1);
        }
    };

    tokio::fs::write(&args.output_path, &file.data).await?;
    info!("Data saved to {:?}", args.output_path);
    info!("  Time: {:.2}s", file.elapsed.as_secs_f64());
    info!("  Total bytes: {}", file.data.len());
    info!("  Frames: {} (+{} duplicates)", file.frames, file.duplicates);

    Ok(())
}
