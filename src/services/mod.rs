pub mod models;
pub mod personas;
pub mod reassembler;
pub mod relay;
