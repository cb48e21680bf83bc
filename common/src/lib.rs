pub mod commission;
pub mod currency;
pub mod favorite;
pub mod identity;
pub mod listing;
pub mod message;
pub mod order;
pub mod review;
pub mod thread;
