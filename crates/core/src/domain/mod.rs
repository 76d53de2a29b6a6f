pub mod conversation;
pub mod placement;
pub mod session;
pub mod vertical;
