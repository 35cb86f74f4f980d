use clap::{ArgGroup, Parser};
use core::time::Duration;
use fibtree_tonic_core::proto::{
    NumberRequest, SequenceRequest, fib_service_client::FibServiceClient,
};
use tonic::{Request, codec::CompressionEncoding, transport::Channel};

/// Command-line client for the `fibtree` gRPC service.
#[derive(Parser, Debug)]
#[command(name = "fibtree-client", version, about = "Call the Fibonacci gRPC service")]
#[command(group(ArgGroup::new("call").required(true).args(["number", "sequence"])))]
struct ClientArgs {
    /// Call `Number` with this value.
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    number: Option<i32>,

    /// Call `Sequence` with this count.
    #[arg(short = 's', long, allow_negative_numbers = true)]
    sequence: Option<i32>,

    /// Server endpoint.
    ///
    /// Environment variable: `FIB_ADDR`
    #[arg(long, env = "FIB_ADDR", default_value_t = String::from("http://127.0.0.1:4000"))]
    addr: String,

    /// Optional client-side deadline, sent as `grpc-timeout`.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = ClientArgs::parse();

    let channel = Channel::from_shared(args.addr.clone())?.connect().await?;
    let mut client = FibServiceClient::new(channel)
        .send_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Zstd);
    let timeout = args.timeout_ms.map(Duration::from_millis);

    if let Some(number) = args.number {
        let res = client
            .number(with_timeout(NumberRequest { number }, timeout))
            .await?
            .into_inner();
        println!("Number({number}) = {}", res.result);
    } else if let Some(count) = args.sequence {
        let res = client
            .sequence(with_timeout(SequenceRequest { number: count }, timeout))
            .await?
            .into_inner();
        println!("Sequence({count}) = {:?}", res.result);
    }

    Ok(())
}

fn with_timeout<T>(message: T, timeout: Option<Duration>) -> Request<T> {
    let mut req = Request::new(message);
    if let Some(timeout) = timeout {
        req.set_timeout(timeout);
    }
    req
}
