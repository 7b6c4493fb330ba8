use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "location-relay",
    about = "Relays live locations from one sender to its subscribers over WebSocket"
)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "RELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "RELAY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Messages buffered per connection before further sends to it are dropped
    #[arg(long, env = "RELAY_CONNECTION_BUFFER", default_value_t = 32)]
    pub connection_buffer: usize,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
