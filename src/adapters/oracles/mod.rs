//! Oracle adapter implementations.

pub mod anthropic_api;
pub mod claude_code;
pub mod mock;
pub mod openai_compatible;
pub mod registry;

pub use anthropic_api::{AnthropicApiConfig, AnthropicApiOracle};
pub use claude_code::{ClaudeCodeConfig, ClaudeCodeOracle};
pub use mock::{MockOracle, MockResponse};
pub use openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleOracle};
pub use registry::OracleRegistry;
