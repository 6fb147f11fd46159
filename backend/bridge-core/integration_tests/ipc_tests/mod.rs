pub mod helpers;
mod ipc;
