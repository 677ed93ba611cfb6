mod config;
mod manifest_client;
mod session;
mod stream_client;
