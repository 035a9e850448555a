pub mod oauth_tokens;
pub mod otp_requests;
pub mod spotify_accounts;
pub mod users;
