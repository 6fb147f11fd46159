mod config;
mod connection_state;
mod convert;
mod data_channel;
mod dispatch;
mod host;
mod registry;
mod support;
