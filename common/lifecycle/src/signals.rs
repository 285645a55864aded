use std::fmt;
use std::io;
use std::str::FromStr;

/// OS signals that can trigger [`wait_for_shutdown`](crate::ShutdownCoordinator::wait_for_shutdown).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
    Hangup,
    Quit,
    User1,
    User2,
}

impl ShutdownSignal {
    /// SIGINT and SIGTERM.
    pub const DEFAULT: [ShutdownSignal; 2] = [ShutdownSignal::Interrupt, ShutdownSignal::Terminate];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Hangup => "SIGHUP",
            ShutdownSignal::Quit => "SIGQUIT",
            ShutdownSignal::User1 => "SIGUSR1",
            ShutdownSignal::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            ShutdownSignal::Interrupt => SignalKind::interrupt(),
            ShutdownSignal::Terminate => SignalKind::terminate(),
            ShutdownSignal::Hangup => SignalKind::hangup(),
            ShutdownSignal::Quit => SignalKind::quit(),
            ShutdownSignal::User1 => SignalKind::user_defined1(),
            ShutdownSignal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseShutdownSignalError(pub String);

impl FromStr for ShutdownSignal {
    type Err = ParseShutdownSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_uppercase();
        match name.strip_prefix("SIG").unwrap_or(&name) {
            "INT" => Ok(ShutdownSignal::Interrupt),
            "TERM" => Ok(ShutdownSignal::Terminate),
            "HUP" => Ok(ShutdownSignal::Hangup),
            "QUIT" => Ok(ShutdownSignal::Quit),
            "USR1" => Ok(ShutdownSignal::User1),
            "USR2" => Ok(ShutdownSignal::User2),
            _ => Err(ParseShutdownSignalError(s.to_string())),
        }
    }
}

/// Installs a handler for each of `signals` and resolves with the first one received.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal(
    signals: &[ShutdownSignal],
) -> io::Result<ShutdownSignal> {
    use tokio::signal::unix::signal;

    if signals.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no shutdown signal configured",
        ));
    }

    let mut listeners = Vec::with_capacity(signals.len());
    for &sig in signals {
        let mut stream = signal(sig.kind())?;
        listeners.push(Box::pin(async move {
            stream.recv().await;
            sig
        }));
    }

    let (received, _, _) = futures::future::select_all(listeners).await;
    tracing::info!(signal = %received, "received {received}");
    Ok(received)
}

/// Only ctrl-c can be trapped outside of unix; the other signals are ignored.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal(
    signals: &[ShutdownSignal],
) -> io::Result<ShutdownSignal> {
    if !signals.contains(&ShutdownSignal::Interrupt) {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "only SIGINT can be trapped on this platform",
        ));
    }
    tokio::signal::ctrl_c().await?;
    tracing::info!("received SIGINT");
    Ok(ShutdownSignal::Interrupt)
}
