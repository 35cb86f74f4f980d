use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use fibtree_tonic_core::types::MAX_INT32_INDEX;

/// Runtime configuration for the `fibtree-tonic-server` binary.
///
/// These settings control the deadline applied to each `Number` call, the
/// limits enforced on request arguments, and the runtime the service runs on.
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults suitable for local use.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fibtree-tonic-server",
    version,
    about = "A gRPC service computing Fibonacci numbers on a deadline-bounded task tree"
)]
pub struct CliArgs {
    /// Wall-clock budget for a single `Number` computation, in milliseconds.
    ///
    /// When the budget elapses the whole task tree is cancelled and the client
    /// receives `DEADLINE_EXCEEDED`.
    ///
    /// Environment variable: `DEADLINE_MS`
    #[arg(long, env = "DEADLINE_MS", default_value_t = 2_000)]
    pub deadline_ms: u64,

    /// How long a timed-out request waits for its task tree to drain before
    /// responding, in milliseconds. `0` responds immediately.
    ///
    /// Environment variable: `TEARDOWN_GRACE_MS`
    #[arg(long, env = "TEARDOWN_GRACE_MS", default_value_t = 100)]
    pub teardown_grace_ms: u64,

    /// Largest `n` accepted by `Number`. Capped at 46, the largest index
    /// whose value fits an `int32`.
    ///
    /// Environment variable: `MAX_NUMBER`
    #[arg(long, env = "MAX_NUMBER", default_value_t = MAX_INT32_INDEX)]
    pub max_number: i32,

    /// Largest `count` accepted by `Sequence`. Capped at 46 for the same
    /// reason as `max_number`.
    ///
    /// Environment variable: `MAX_SEQUENCE`
    #[arg(long, env = "MAX_SEQUENCE", default_value_t = MAX_INT32_INDEX)]
    pub max_sequence: i32,

    /// Number of tokio worker threads the task tree is scheduled on.
    ///
    /// Defaults to the number of logical CPUs.
    ///
    /// Environment variable: `WORKER_THREADS`
    #[arg(long, env = "WORKER_THREADS", default_value_t = num_cpus::get())]
    pub worker_threads: usize,

    /// Seconds to wait for in-flight computations to finish during graceful
    /// shutdown before cancelling them.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Address to listen on (TCP or Unix socket path; use --uds for Unix
    /// socket).
    ///
    /// Example: "0.0.0.0:4000" or "/tmp/fibtree.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:4000"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a
    /// file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub deadline: Duration,
    pub teardown_grace: Duration,
    pub max_number: i32,
    pub max_sequence: i32,
    pub worker_threads: usize,
    pub shutdown_timeout: Duration,
    pub server_addr: String,
    pub uds: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.deadline_ms == 0 {
            bail!("DEADLINE_MS must be greater than 0");
        }

        if !(1..=MAX_INT32_INDEX).contains(&args.max_number) {
            bail!(
                "MAX_NUMBER ({}) must be between 1 and {}",
                args.max_number,
                MAX_INT32_INDEX
            );
        }

        if !(0..=MAX_INT32_INDEX).contains(&args.max_sequence) {
            bail!(
                "MAX_SEQUENCE ({}) must be between 0 and {}",
                args.max_sequence,
                MAX_INT32_INDEX
            );
        }

        if args.worker_threads == 0 {
            bail!("WORKER_THREADS must be greater than 0");
        }

        Ok(Self {
            deadline: Duration::from_millis(args.deadline_ms),
            teardown_grace: Duration::from_millis(args.teardown_grace_ms),
            max_number: args.max_number,
            max_sequence: args.max_sequence,
            worker_threads: args.worker_threads,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            server_addr: args.server_addr,
            uds: args.uds,
        })
    }
}

#[cfg(test)]
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(2),
            teardown_grace: Duration::from_millis(100),
            max_number: MAX_INT32_INDEX,
            max_sequence: MAX_INT32_INDEX,
            worker_threads: 4,
            shutdown_timeout: Duration::from_secs(3),
            server_addr: String::from("127.0.0.1:0"),
            uds: false,
        }
    }
}
