use crate::lines::LineBuffer;
use log::{debug, info, warn};
use shared::{ServerLine, READ_BUFFER_SIZE};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
};
use tokio::net::TcpStream;

pub struct ChatClient<T> {
    stream: T,
    lines: LineBuffer,
    name: Option<String>,
    rejected: bool,
    /// Whether the server's opening line has been seen
    opened: bool,
}

impl ChatClient<TcpStream> {
    pub async fn connect(server_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect(server_addr).await?;
        Ok(Self::new(stream))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> ChatClient<T> {
    pub fn new(stream: T) -> Self {
        ChatClient {
            stream,
            lines: LineBuffer::new(),
            name: None,
            rejected: false,
            opened: false,
        }
    }

    /// Name the server assigned, once the greeting has arrived
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True after the server said it is full
    pub fn was_rejected(&self) -> bool {
        self.rejected
    }

    /// Sends one line of chat, adding the newline the server relays verbatim
    pub async fn send_line(&mut self, text: &str) -> std::io::Result<()> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await
    }

    /// Tracks connection state from raw server output
    ///
    /// Only the first line the server sends says whether the client was
    /// admitted. Chat bodies are relayed verbatim, so later lines that look
    /// like a greeting or a server-full notice come from other clients.
    pub fn handle_incoming(&mut self, data: &[u8]) -> Vec<ServerLine> {
        let parsed: Vec<ServerLine> = self
            .lines
            .push(data)
            .iter()
            .map(|line| ServerLine::parse(line))
            .collect();

        for line in &parsed {
            let opening = !self.opened;
            self.opened = true;

            match line {
                ServerLine::Greeting { name } if opening => {
                    info!("Connected! Assigned name: {}", name);
                    self.name = Some(name.clone());
                }
                ServerLine::ServerFull if opening => {
                    warn!("Server is full");
                    self.rejected = true;
                }
                ServerLine::Chat { sender, .. } => debug!("Message from {}", sender),
                _ => {}
            }
        }

        parsed
    }

    /// Relays between the user and the server until the server closes
    ///
    /// Server output is copied to `output` unchanged. Lines from `input` are
    /// sent as they arrive; once `input` ends the client keeps printing until
    /// the server hangs up.
    pub async fn run<I, O>(
        &mut self,
        input: I,
        mut output: O,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut input_lines = input.lines();
        let mut input_open = true;

        loop {
            tokio::select! {
                result = self.stream.read(&mut buffer) => {
                    let len = result?;
                    if len == 0 {
                        info!("Server closed the connection");
                        break;
                    }

                    output.write_all(&buffer[..len]).await?;
                    output.flush().await?;
                    self.handle_incoming(&buffer[..len]);
                },

                line = input_lines.next_line(), if input_open => {
                    match line? {
                        Some(text) => self.send_line(&text).await?,
                        None => {
                            debug!("Input closed, waiting for the server to hang up");
                            input_open = false;
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
