pub mod block;
pub mod config;
pub mod dispatch;
pub mod generate;
pub mod metrics;
pub mod nbt;
pub mod packet;
pub mod payload;
pub mod persistence;
pub mod registry;
pub mod session;
pub mod source;
