pub mod axis;
pub mod broadcast;
pub mod config;
pub mod dispatcher;
pub mod driver;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod service;
pub mod socket_server;
