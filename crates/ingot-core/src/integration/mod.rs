//! Integration layer: narrow interfaces to the engine's external
//! collaborators (transport, configuration store, counters store).

pub mod config;
pub mod counter;
pub mod message;
pub mod transport;

pub use config::{
    AccessSettings, AttentionMode, BotSettings, ConfigProvider, DialectSettings, GroupSettings,
};
pub use counter::CounterStore;
pub use message::{ImageSource, MessageReceipt, OutSegment, OutboundMessage};
pub use transport::Transport;
