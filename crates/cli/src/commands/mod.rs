pub mod ask;
pub mod onboard;
pub mod peer;
pub mod serve;
pub mod status;
pub mod tools;
