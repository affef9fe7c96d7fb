use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use periphlink_frame::{SysexConfig, SysexDelimiter};
use periphlink_router::{CommandRouter, DispatchConfig, DispatchStats, Dispatcher};
use periphlink_transport::{StreamTransport, Transport};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{
    io_error, registry_error, router_error, transport_error, CliError, CliResult, SUCCESS,
};
use crate::output::{print_stats, OutputFormat};
use crate::sim::{simulated_router, SimBoard};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let router = simulated_router(args.board.config(), &args.board.libraries)
        .map_err(|err| registry_error("library registration failed", err))?;

    let stop = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(stop.clone())?;

    let session = Session {
        router,
        delimiter: SysexDelimiter::with_config(SysexConfig {
            max_frame_len: args.max_frame_len,
        }),
        config: DispatchConfig {
            idle_wait: Duration::from_millis(args.idle_wait_ms),
        },
    };

    match &args.device {
        Some(path) => {
            let port = OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|err| io_error(&format!("open {} failed", path.display()), err))?;
            let reader = port
                .try_clone()
                .map_err(|err| io_error("device clone failed", err))?;
            let transport = StreamTransport::spawn(reader, port)
                .map_err(|err| transport_error("device transport failed", err))?;

            info!(device = %path.display(), "serving device node");
            let stats = session.serve(transport, &stop)?;
            print_stats(&stats, format, &mut std::io::stdout());
        }
        None => {
            let transport = StreamTransport::spawn(std::io::stdin(), std::io::stdout())
                .map_err(|err| transport_error("stdio transport failed", err))?;

            info!("serving stdin/stdout");
            let stats = session.serve(transport, &stop)?;
            // stdout is the wire
            print_stats(&stats, format, &mut std::io::stderr());
        }
    }

    Ok(SUCCESS)
}

struct Session {
    router: CommandRouter<SimBoard>,
    delimiter: SysexDelimiter,
    config: DispatchConfig,
}

impl Session {
    fn serve<T: Transport>(self, transport: T, stop: &AtomicBool) -> CliResult<DispatchStats> {
        let mut dispatcher = Dispatcher::with_delimiter(transport, self.router, self.delimiter)
            .with_config(self.config);
        dispatcher
            .run(stop)
            .map_err(|err| router_error("dispatch failed", err))
    }
}

fn install_ctrlc_handler(stop: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
