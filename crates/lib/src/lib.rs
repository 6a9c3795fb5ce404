//! PersonaAgent core library: agent gateway, conversation driver and screen flow
//! shared by the CLI and desktop applications.

pub mod config;
pub mod driver;
pub mod flow;
pub mod gateway;
pub mod init;
pub mod profile;
pub mod results;
pub mod session;
