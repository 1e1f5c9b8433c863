mod hex_dump;

pub use hex_dump::HexDump;
