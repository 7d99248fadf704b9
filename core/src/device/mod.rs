pub mod namco_51xx;

pub use namco_51xx::Namco51xx;
