pub mod direct_downloader;
pub mod error;
pub mod events;
pub mod filename;
pub mod gate;
pub mod http_client;
pub mod markers;
pub mod matchers;
pub mod orchestrator;
pub mod paths;
pub mod payload_decoder;
pub mod pipeline;
pub mod process;
pub mod retriever;
pub mod url_parser;
pub mod workspace;
pub mod ytdlp;

#[cfg(test)]
pub mod test_server;
