pub mod admin;
pub mod attendance;
pub mod booking;
pub mod office;
pub mod parking;
pub mod wfh;
