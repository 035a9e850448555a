pub mod otp;
pub mod spotify;
