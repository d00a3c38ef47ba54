//! Transport construction from station configuration

use contracts::{Line, LineSource, TransportConfig, TransportFault, TransportKind};
use tracing::instrument;

use crate::replay::ReplayLineSource;
use crate::stream::{StreamLineSource, StreamOptions, StreamTarget};

/// Any line source the station configuration can describe
pub enum TransportSource {
    Stream(StreamLineSource),
    Replay(ReplayLineSource),
}

/// Open the line source described by `config`
#[instrument(name = "open_transport", skip(config), fields(kind = ?config.kind, endpoint = %config.endpoint()))]
pub async fn open_transport(config: &TransportConfig) -> Result<TransportSource, TransportFault> {
    let target = match config.kind {
        TransportKind::Replay => {
            let source = ReplayLineSource::open(&config.path, config.replay_speed).await?;
            return Ok(TransportSource::Replay(source));
        }
        TransportKind::Device => StreamTarget::Device(config.path.clone()),
        TransportKind::Stdin => StreamTarget::Stdin,
        TransportKind::Tcp => match &config.address {
            Some(address) => StreamTarget::Tcp(address.clone()),
            None => return Err(TransportFault::open("tcp", "no address configured")),
        },
    };

    let options = StreamOptions {
        settle: config.settle_delay(),
        read_timeout: config.read_timeout(),
        lossy_utf8: config.lossy_utf8,
    };

    StreamLineSource::open(target, options)
        .await
        .map(TransportSource::Stream)
}

impl LineSource for TransportSource {
    fn endpoint(&self) -> &str {
        match self {
            TransportSource::Stream(s) => s.endpoint(),
            TransportSource::Replay(s) => s.endpoint(),
        }
    }

    async fn next_line(&mut self) -> Result<Option<Line>, TransportFault> {
        match self {
            TransportSource::Stream(s) => s.next_line().await,
            TransportSource::Replay(s) => s.next_line().await,
        }
    }

    async fn reconnect(&mut self) -> Result<(), TransportFault> {
        match self {
            TransportSource::Stream(s) => s.reconnect().await,
            TransportSource::Replay(s) => s.reconnect().await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportFault> {
        match self {
            TransportSource::Stream(s) => s.close().await,
            TransportSource::Replay(s) => s.close().await,
        }
    }
}
