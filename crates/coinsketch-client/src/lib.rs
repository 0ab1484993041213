pub mod api;
pub mod controller;
pub mod net_client;
pub mod room_view;
pub mod session;
