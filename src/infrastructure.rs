//! Infrastructure layer - external integrations
//!
//! HTTP fetching, page parsing, configuration and logging.

pub mod config;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod parsing_error;

pub use config::{AppConfig, LoggingConfig, ParserConfig};
pub use http_client::{HttpClient, HttpClientConfig, PageFetcher};
pub use logging::init_logging_with_config;
pub use parsing::{
    OpenGraphParser, OzonParser, ProductParser, WildberriesParser, YandexMarketParser,
};
pub use parsing_error::{ParsingError, ParsingResult};
