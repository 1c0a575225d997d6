pub mod gossip;
pub mod peers;

pub use gossip::Gossip;
pub use peers::PeerSet;
