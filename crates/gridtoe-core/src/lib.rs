pub mod board;
pub mod error;
pub mod net;
pub mod room;
pub mod session;
pub mod win;
