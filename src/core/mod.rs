pub mod credential;
pub mod credential_format;
pub mod credential_offer;
pub mod metadata;
pub mod object;
pub mod token;
pub mod util;
