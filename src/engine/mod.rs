pub mod auto_pick;
pub mod rotation;
pub mod standings;
pub mod transfer;
