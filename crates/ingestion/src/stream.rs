//! StreamLineSource - line source over a byte stream
//!
//! Covers tty device nodes, serial-over-TCP bridges and stdin. Bytes are
//! split on `\n`, decoded as UTF-8 and trimmed of trailing whitespace
//! (including the `\r` most firmware prints).
//!
//! Device nodes and stdin are read on a dedicated thread feeding a channel.
//! A blocked read there never holds up runtime shutdown.

use std::io::{BufRead, Read};
use std::path::PathBuf;
use std::time::Duration;

use contracts::{Line, LineSource, TransportFault};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BlockingInput = Box<dyn Read + Send>;
type LineChunk = std::io::Result<Vec<u8>>;

/// Lines buffered between the reader thread and the source
const THREAD_LINE_BUFFER: usize = 64;

/// Where a stream source opens its byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// tty device node or plain file
    Device(PathBuf),
    /// `host:port` of a serial-over-TCP bridge
    Tcp(String),
    /// Standard input
    Stdin,
}

impl StreamTarget {
    /// Endpoint description for logs
    pub fn endpoint(&self) -> String {
        match self {
            StreamTarget::Device(path) => path.display().to_string(),
            StreamTarget::Tcp(address) => address.clone(),
            StreamTarget::Stdin => "stdin".to_string(),
        }
    }

    /// EOF on a device or socket means the peer went away; on stdin it is
    /// the end of the stream.
    fn eof_is_disconnect(&self) -> bool {
        matches!(self, StreamTarget::Device(_) | StreamTarget::Tcp(_))
    }

    async fn open(&self) -> Result<LineReader, TransportFault> {
        match self {
            StreamTarget::Device(path) => {
                let path = path.clone();
                spawn_line_thread(self.endpoint(), move || {
                    std::fs::File::open(path).map(|file| Box::new(file) as BlockingInput)
                })
                .await
            }
            StreamTarget::Tcp(address) => {
                let stream = tokio::net::TcpStream::connect(address.as_str())
                    .await
                    .map_err(|e| TransportFault::open(self.endpoint(), e.to_string()))?;
                let stream: BoxedReader = Box::new(stream);
                Ok(LineReader::Stream(BufReader::new(stream)))
            }
            StreamTarget::Stdin => {
                spawn_line_thread(self.endpoint(), || {
                    Ok(Box::new(std::io::stdin()) as BlockingInput)
                })
                .await
            }
        }
    }
}

/// Stream source options
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Delay after (re)opening before the first read
    pub settle: Duration,

    /// Maximum wait for one line (None = forever)
    pub read_timeout: Option<Duration>,

    /// Replace invalid UTF-8 instead of failing
    pub lossy_utf8: bool,
}

enum LineReader {
    /// Async byte stream read in place
    Stream(BufReader<BoxedReader>),
    /// Whole lines from a blocking reader thread; `None` from the channel is EOF
    Thread(mpsc::Receiver<LineChunk>),
}

impl LineReader {
    /// Append the next line (or what is left of it) to `pending`.
    ///
    /// Returns the number of bytes added; 0 is EOF. Cancel safe.
    async fn fill(&mut self, pending: &mut Vec<u8>) -> std::io::Result<usize> {
        match self {
            LineReader::Stream(reader) => reader.read_until(b'\n', pending).await,
            LineReader::Thread(lines) => match lines.recv().await {
                Some(Ok(bytes)) => {
                    pending.extend_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            },
        }
    }
}

/// Open `input` on a named thread and stream its lines back.
///
/// Waits until the open itself has succeeded or failed. Once the receiver
/// is dropped the thread exits after its current read returns.
async fn spawn_line_thread<F>(endpoint: String, open: F) -> Result<LineReader, TransportFault>
where
    F: FnOnce() -> std::io::Result<BlockingInput> + Send + 'static,
{
    let (opened_tx, opened_rx) = oneshot::channel();
    let (line_tx, line_rx) = mpsc::channel(THREAD_LINE_BUFFER);
    let thread_endpoint = endpoint.clone();

    std::thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || {
            let input = match open() {
                Ok(input) => input,
                Err(e) => {
                    // Receiver gone means the open was abandoned.
                    let _ = opened_tx.send(Err(e));
                    return;
                }
            };
            if opened_tx.send(Ok(())).is_err() {
                return;
            }
            read_lines(input, &line_tx);
            debug!(endpoint = %thread_endpoint, "reader thread finished");
        })
        .map_err(|e| TransportFault::open(&endpoint, e.to_string()))?;

    match opened_rx.await {
        Ok(Ok(())) => Ok(LineReader::Thread(line_rx)),
        Ok(Err(e)) => Err(TransportFault::open(&endpoint, e.to_string())),
        Err(_) => Err(TransportFault::open(&endpoint, "reader thread exited before opening")),
    }
}

fn read_lines(input: BlockingInput, lines: &mpsc::Sender<LineChunk>) {
    let mut reader = std::io::BufReader::new(input);
    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => return,
            Ok(_) => {
                if lines.blocking_send(Ok(line)).is_err() {
                    return;
                }
            }
            Err(e) => {
                if lines.blocking_send(Err(e)).is_err() {
                    debug!("read error after source closed");
                }
                return;
            }
        }
    }
}

/// Line source reading newline-terminated text from a byte stream
pub struct StreamLineSource {
    endpoint: String,
    target: Option<StreamTarget>,
    options: StreamOptions,
    reader: Option<LineReader>,
    pending: Vec<u8>,
    eof_is_disconnect: bool,
}

impl StreamLineSource {
    /// Open the target and wait for the settle delay
    #[instrument(name = "stream_source_open", skip(options), fields(endpoint = %target.endpoint()))]
    pub async fn open(target: StreamTarget, options: StreamOptions) -> Result<Self, TransportFault> {
        let reader = target.open().await?;
        settle(&options).await;

        info!(endpoint = %target.endpoint(), "transport opened");

        Ok(Self {
            endpoint: target.endpoint(),
            eof_is_disconnect: target.eof_is_disconnect(),
            target: Some(target),
            options,
            reader: Some(reader),
            pending: Vec::new(),
        })
    }

    /// Wrap an already-open reader.
    ///
    /// EOF is a clean end of stream and the source cannot be reopened.
    pub fn from_reader<R>(endpoint: impl Into<String>, reader: R, options: StreamOptions) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let reader: BoxedReader = Box::new(reader);
        Self {
            endpoint: endpoint.into(),
            target: None,
            options,
            reader: Some(LineReader::Stream(BufReader::new(reader))),
            pending: Vec::new(),
            eof_is_disconnect: false,
        }
    }

    fn decode(&mut self) -> Result<String, TransportFault> {
        let bytes = std::mem::take(&mut self.pending);
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(err) if self.options.lossy_utf8 => {
                observability::record_lossy_line();
                warn!(
                    endpoint = %self.endpoint,
                    error = %err.utf8_error(),
                    "invalid UTF-8 replaced"
                );
                Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
            }
            Err(err) => Err(TransportFault::malformed(
                &self.endpoint,
                err.utf8_error().to_string(),
            )),
        }
    }
}

async fn settle(options: &StreamOptions) {
    if !options.settle.is_zero() {
        debug!(settle_ms = options.settle.as_millis() as u64, "waiting for device to settle");
        tokio::time::sleep(options.settle).await;
    }
}

impl LineSource for StreamLineSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn next_line(&mut self) -> Result<Option<Line>, TransportFault> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(TransportFault::disconnected(
                &self.endpoint,
                "connection already closed",
            ));
        };

        // Partial bytes stay in `pending` if the read is cancelled.
        let read = reader.fill(&mut self.pending);
        let n = match self.options.read_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, read).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(TransportFault::ReadTimeout {
                        endpoint: self.endpoint.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    })
                }
            },
            None => read.await,
        }
        .map_err(|e| TransportFault::io(&self.endpoint, e))?;

        if n == 0 {
            return if self.eof_is_disconnect {
                Err(TransportFault::disconnected(&self.endpoint, "end of stream"))
            } else {
                debug!(endpoint = %self.endpoint, "end of stream");
                Ok(None)
            };
        }

        let text = self.decode()?;
        Ok(Some(Line::now(text.trim_end())))
    }

    #[instrument(name = "stream_source_reconnect", skip(self), fields(endpoint = %self.endpoint))]
    async fn reconnect(&mut self) -> Result<(), TransportFault> {
        let Some(target) = self.target.clone() else {
            return Err(TransportFault::open(
                &self.endpoint,
                "source was not opened from a reopenable target",
            ));
        };

        self.reader = None;
        self.pending.clear();

        let reader = target.open().await?;
        settle(&self.options).await;
        self.reader = Some(reader);

        info!(endpoint = %self.endpoint, "transport reopened");
        Ok(())
    }

    #[instrument(name = "stream_source_close", skip(self), fields(endpoint = %self.endpoint))]
    async fn close(&mut self) -> Result<(), TransportFault> {
        if self.reader.take().is_some() {
            info!(endpoint = %self.endpoint, "transport closed");
        }
        Ok(())
    }
}
