//! Key builders shared by the explanation cache and the keyed lock maps.

pub mod keys;
