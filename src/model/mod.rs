pub mod attendance;
pub mod office_location;
pub mod parking_reservation;
pub mod qr_code;
pub mod role;
pub mod room_booking;
pub mod wfh_approval;
pub mod wifi_network;
