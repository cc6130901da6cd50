#![crate_name = "rust_ofp11"]
#![crate_type = "lib"]

pub mod ofp_header;
pub mod ofp_message;
pub mod openflow0x02;
