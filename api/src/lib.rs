//! Wire contract shared by the todo server and its clients.

pub mod resource;
pub mod routes;
pub mod v1;
