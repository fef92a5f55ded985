pub mod connection;
pub mod pubsub;
pub mod server;
pub mod string;
