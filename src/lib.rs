pub mod interval;
pub mod lifecycle;
pub mod timezone;

pub mod session;

pub mod catalog;
pub mod gateway;
pub mod sync;
