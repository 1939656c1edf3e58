use rand::Rng;

pub mod dns;
pub mod bytes;
pub mod packet_utils;

pub fn generate_u16() -> u16 {
    let mut rng = rand::thread_rng();
    rng.gen()
}
