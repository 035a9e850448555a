pub mod link;
pub mod otp;
pub mod spotify;
pub mod token;
