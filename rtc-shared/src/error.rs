use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //Packet cache errors
    /// Capacity of zero slots.
    #[error("packet cache: capacity must be at least 1")]
    ErrPacketCacheCapacityZero,
    /// Capacity whose slot indices would not fit in 16 bits.
    #[error("packet cache: capacity {0} exceeds the 16-bit slot index space")]
    ErrPacketCacheCapacityTooLarge(usize),
}
